//! Auth methods.
//!
//! Enabled under `sys/auth/<mount>`. The method `type` is fixed at enable
//! time, so changing it means disabling and enabling again; description and
//! config are tuned in place.

use std::collections::BTreeMap;

use serde::Deserialize;
use serde_json::Value;

use super::{mount_key, validate_name, Presence};
use crate::core::client::ResourceClient;
use crate::core::constants::BUILTIN_AUTH_MOUNTS;
use crate::core::reconcile::{Adapter, ChangeReport, Collection, Reconciler};
use crate::core::types::{Accessor, Declarations, Params, ResourceKey};
use crate::error::{Result, ValidationError};

const KIND: &str = "auth method";
const SYS_AUTH: &str = "/v1/sys/auth";

/// Every enabled auth method, keyed by mount path.
#[derive(Debug, Clone, Copy, Default)]
pub struct AuthMethods;

impl Adapter for AuthMethods {
    fn kind(&self) -> &'static str {
        KIND
    }

    fn fetch(&self, client: &dyn ResourceClient, key: &str) -> Result<Option<Value>> {
        Ok(enabled(client)?.remove(key))
    }

    fn recreate_required(&self, desired: &Params, actual: &Value) -> bool {
        desired
            .get("type")
            .is_some_and(|wanted| actual.get("type") != Some(wanted))
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
        client.post(&format!("{}/{}", SYS_AUTH, key), payload)?;
        Ok(())
    }

    fn update(&self, client: &dyn ResourceClient, key: &str, payload: &Value) -> Result<()> {
        client.post(&format!("{}/{}/tune", SYS_AUTH, key), payload)?;
        Ok(())
    }

    fn delete(&self, client: &dyn ResourceClient, key: &str) -> Result<()> {
        client.delete(&format!("{}/{}", SYS_AUTH, key))?;
        Ok(())
    }

    fn is_protected(&self, key: &str) -> bool {
        BUILTIN_AUTH_MOUNTS.contains(&key)
    }

    /// A vacated path may be re-enabled with another type in the same run.
    fn prune_first(&self) -> bool {
        true
    }
}

impl Collection for AuthMethods {
    fn list(&self, client: &dyn ResourceClient) -> Result<Vec<ResourceKey>> {
        Ok(enabled(client)?.into_keys().collect())
    }
}

/// Enabled auth methods keyed by mount path (without trailing slash).
fn enabled(client: &dyn ResourceClient) -> Result<BTreeMap<ResourceKey, Value>> {
    let body = client.get(SYS_AUTH)?;
    Ok(body
        .data()
        .and_then(Value::as_object)
        .map(|mounts| {
            mounts
                .iter()
                .map(|(path, details)| (mount_key(path).to_string(), details.clone()))
                .collect()
        })
        .unwrap_or_default())
}

/// Snapshot of mount path to accessor for every enabled auth method.
pub fn mount_accessors(client: &dyn ResourceClient) -> Result<BTreeMap<ResourceKey, Accessor>> {
    Ok(enabled(client)?
        .into_iter()
        .filter_map(|(path, details)| {
            details
                .get("accessor")
                .and_then(Value::as_str)
                .map(|accessor| (path, accessor.to_string()))
        })
        .collect())
}

/// A single auth method declaration.
///
/// `mount` and `type` default to each other.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AuthMethodSpec {
    #[serde(default)]
    pub mount: Option<String>,
    #[serde(default, rename = "type")]
    pub method_type: Option<String>,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub config: Params,
    #[serde(default)]
    pub state: Presence,
}

impl AuthMethodSpec {
    /// Resolve the mount path and the parameters to enable it with.
    ///
    /// # Errors
    ///
    /// Returns `ValidationError::MissingMountOrType` if neither is given.
    pub fn resolve(&self) -> Result<(String, Params)> {
        let mount = self.mount.as_ref().or(self.method_type.as_ref());
        let method_type = self.method_type.as_ref().or(self.mount.as_ref());
        let (Some(mount), Some(method_type)) = (mount, method_type) else {
            return Err(ValidationError::MissingMountOrType.into());
        };
        validate_name("mount", mount)?;

        let mut params = Params::new();
        params.insert("type".to_string(), Value::String(method_type.clone()));
        params.insert(
            "description".to_string(),
            Value::String(self.description.clone()),
        );
        params.insert("config".to_string(), Value::Object(self.config.clone()));
        Ok((mount.clone(), params))
    }
}

/// Converge one auth method.
///
/// When present, the report carries the mount's `accessor`.
pub fn converge_auth_method(
    client: &dyn ResourceClient,
    spec: &AuthMethodSpec,
) -> Result<ChangeReport> {
    let (mount, params) = spec.resolve()?;
    let desired = (spec.state == Presence::Present).then_some(&params);

    let action = Reconciler::new(client).converge_one(&AuthMethods, &mount, desired)?;
    let mut report = ChangeReport::new();
    report.record(KIND, &mount, action);

    if desired.is_some() {
        if let Some(accessor) = mount_accessors(client)?.remove(&mount) {
            report.set_output("accessor", Value::String(accessor));
        }
    }
    Ok(report)
}

/// Converge every auth method. Undeclared methods are disabled, except the
/// built-in token method. A declaration without `type` uses the mount path.
///
/// The report carries `accessors`: mount path to accessor.
pub fn converge_auth_methods(
    client: &dyn ResourceClient,
    desired: &Declarations<Params>,
) -> Result<ChangeReport> {
    for mount in desired.keys() {
        validate_name("mount", mount)?;
    }
    let desired: Declarations<Params> = desired
        .iter()
        .map(|(mount, params)| {
            let params = params.clone().map(|mut params| {
                params
                    .entry("type")
                    .or_insert_with(|| Value::String(mount.clone()));
                params
            });
            (mount.clone(), params)
        })
        .collect();

    let mut report = Reconciler::new(client).converge_all(&AuthMethods, &desired)?;

    let accessors: Params = mount_accessors(client)?
        .into_iter()
        .filter(|(mount, _)| matches!(desired.get(mount), Some(Some(_))))
        .map(|(mount, accessor)| (mount, Value::String(accessor)))
        .collect();
    report.set_output("accessors", Value::Object(accessors));

    Ok(report)
}
