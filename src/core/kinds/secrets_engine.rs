//! Secrets engines.
//!
//! Mounted under `sys/mounts/<mount>`. Type and options are fixed at mount
//! time; description and config can be tuned. A read of an unmounted path is
//! answered with 400 rather than 404.

use serde::Deserialize;
use serde_json::Value;

use super::{mount_key, validate_name, Presence};
use crate::core::client::ResourceClient;
use crate::core::compare;
use crate::core::constants::{BUILTIN_SECRET_MOUNTS, OK_OR_BAD_REQUEST};
use crate::core::reconcile::{Adapter, ChangeReport, Collection, Reconciler};
use crate::core::types::{Declarations, Params, ResourceKey};
use crate::error::Result;

const KIND: &str = "secrets engine";
const SYS_MOUNTS: &str = "/v1/sys/mounts";

/// Every mounted secrets engine, keyed by mount path.
#[derive(Debug, Clone, Copy, Default)]
pub struct SecretsEngines;

impl Adapter for SecretsEngines {
    fn kind(&self) -> &'static str {
        KIND
    }

    fn fetch(&self, client: &dyn ResourceClient, key: &str) -> Result<Option<Value>> {
        client.read_with(&format!("{}/{}", SYS_MOUNTS, key), OK_OR_BAD_REQUEST)
    }

    fn recreate_required(&self, desired: &Params, actual: &Value) -> bool {
        let type_differs = desired
            .get("type")
            .is_some_and(|wanted| actual.get("type") != Some(wanted));
        let options_differ = desired
            .get("options")
            .and_then(Value::as_object)
            .is_some_and(|options| {
                !compare::satisfies(options, actual.get("options").unwrap_or(&Value::Null))
            });
        type_differs || options_differ
    }

    /// The tune endpoint takes config fields at the top level.
    fn update_payload(&self, desired: &Params, _actual: &Value) -> Value {
        let mut payload = desired
            .get("config")
            .and_then(Value::as_object)
            .cloned()
            .unwrap_or_default();
        if let Some(description) = desired.get("description") {
            payload.insert("description".to_string(), description.clone());
        }
        Value::Object(payload)
    }

    fn create(&self, client: &dyn ResourceClient, key: &str, payload: &Value) -> Result<()> {
        client.post(&format!("{}/{}", SYS_MOUNTS, key), payload)?;
        Ok(())
    }

    fn update(&self, client: &dyn ResourceClient, key: &str, payload: &Value) -> Result<()> {
        client.post(&format!("{}/{}/tune", SYS_MOUNTS, key), payload)?;
        Ok(())
    }

    fn delete(&self, client: &dyn ResourceClient, key: &str) -> Result<()> {
        client.delete(&format!("{}/{}", SYS_MOUNTS, key))?;
        Ok(())
    }

    fn is_protected(&self, key: &str) -> bool {
        BUILTIN_SECRET_MOUNTS.contains(&key)
    }

    fn prune_first(&self) -> bool {
        true
    }
}

impl Collection for SecretsEngines {
    fn list(&self, client: &dyn ResourceClient) -> Result<Vec<ResourceKey>> {
        let body = client.get(SYS_MOUNTS)?;
        Ok(body
            .data()
            .and_then(Value::as_object)
            .map(|mounts| mounts.keys().map(|path| mount_key(path).to_string()).collect())
            .unwrap_or_default())
    }
}

/// A single secrets engine declaration.
#[derive(Debug, Clone, Deserialize)]
pub struct SecretsEngineSpec {
    pub mount: String,
    #[serde(rename = "type")]
    pub engine_type: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub config: Params,
    #[serde(default)]
    pub options: Params,
    #[serde(default)]
    pub state: Presence,
}

impl SecretsEngineSpec {
    /// A present engine of `engine_type` at `mount` with default settings.
    pub fn new(mount: impl Into<String>, engine_type: impl Into<String>) -> Self {
        Self {
            mount: mount.into(),
            engine_type: engine_type.into(),
            description: String::new(),
            config: Params::new(),
            options: Params::new(),
            state: Presence::Present,
        }
    }

    /// Parameters to mount the engine with.
    pub fn params(&self) -> Params {
        let mut params = Params::new();
        params.insert("type".to_string(), Value::String(self.engine_type.clone()));
        params.insert(
            "description".to_string(),
            Value::String(self.description.clone()),
        );
        params.insert("config".to_string(), Value::Object(self.config.clone()));
        params.insert("options".to_string(), Value::Object(self.options.clone()));
        params
    }
}

/// Converge one secrets engine.
pub fn converge_secrets_engine(
    client: &dyn ResourceClient,
    spec: &SecretsEngineSpec,
) -> Result<ChangeReport> {
    validate_name("mount", &spec.mount)?;
    let params = spec.params();
    let desired = (spec.state == Presence::Present).then_some(&params);

    let action = Reconciler::new(client).converge_one(&SecretsEngines, &spec.mount, desired)?;
    let mut report = ChangeReport::new();
    report.record(KIND, &spec.mount, action);
    Ok(report)
}

/// Converge every secrets engine. Undeclared engines are unmounted, except
/// the built-in `sys`, `identity` and `cubbyhole` mounts.
pub fn converge_secrets_engines(
    client: &dyn ResourceClient,
    desired: &Declarations<Params>,
) -> Result<ChangeReport> {
    for mount in desired.keys() {
        validate_name("mount", mount)?;
    }
    Reconciler::new(client).converge_all(&SecretsEngines, desired)
}
