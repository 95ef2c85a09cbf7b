//! Namespaces (Vault Enterprise / OpenBao).
//!
//! Only `custom_metadata` is managed. It is compared by exact equality and
//! updated with a JSON merge patch, in which removed keys must be sent as
//! `null`; omitting them would leave them in place.

use serde::Deserialize;
use serde_json::{json, Value};

use super::{validate_name, Presence};
use crate::core::client::ResourceClient;
use crate::core::compare::as_params;
use crate::core::reconcile::{Adapter, ChangeReport, Reconciler};
use crate::core::types::{Declarations, Metadata, Params};
use crate::error::Result;

const KIND: &str = "namespace";
const SYS_NAMESPACES: &str = "/v1/sys/namespaces";

#[derive(Debug, Clone, Copy, Default)]
pub struct Namespaces;

fn custom_metadata(value: &Value) -> Params {
    value.get("custom_metadata").map(as_params).unwrap_or_default()
}

impl Adapter for Namespaces {
    fn kind(&self) -> &'static str {
        KIND
    }

    fn fetch(&self, client: &dyn ResourceClient, key: &str) -> Result<Option<Value>> {
        client.read(&format!("{}/{}", SYS_NAMESPACES, key))
    }

    fn is_satisfied(&self, desired: &Params, actual: &Value) -> bool {
        custom_metadata(&Value::Object(desired.clone())) == custom_metadata(actual)
    }

    /// Declared metadata, with every key only the server has set to `null`.
    fn update_payload(&self, desired: &Params, actual: &Value) -> Value {
        let mut patch = desired
            .get("custom_metadata")
            .map(as_params)
            .unwrap_or_default();
        for key in custom_metadata(actual).keys() {
            if !patch.contains_key(key) {
                patch.insert(key.clone(), Value::Null);
            }
        }
        json!({ "custom_metadata": patch })
    }

    fn create(&self, client: &dyn ResourceClient, key: &str, payload: &Value) -> Result<()> {
        client.post(&format!("{}/{}", SYS_NAMESPACES, key), payload)?;
        Ok(())
    }

    fn update(&self, client: &dyn ResourceClient, key: &str, payload: &Value) -> Result<()> {
        client.patch(&format!("{}/{}", SYS_NAMESPACES, key), payload)?;
        Ok(())
    }

    fn delete(&self, client: &dyn ResourceClient, key: &str) -> Result<()> {
        client.delete(&format!("{}/{}", SYS_NAMESPACES, key))?;
        Ok(())
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct NamespaceSpec {
    pub name: String,
    #[serde(default)]
    pub custom_metadata: Metadata,
    #[serde(default)]
    pub state: Presence,
}

impl NamespaceSpec {
    pub fn params(&self) -> Params {
        let mut params = Params::new();
        params.insert("custom_metadata".to_string(), json!(self.custom_metadata));
        params
    }
}

pub fn converge_namespace(
    client: &dyn ResourceClient,
    spec: &NamespaceSpec,
) -> Result<ChangeReport> {
    validate_name(KIND, &spec.name)?;
    let params = spec.params();
    let desired = (spec.state == Presence::Present).then_some(&params);

    let action = Reconciler::new(client).converge_one(&Namespaces, &spec.name, desired)?;
    let mut report = ChangeReport::new();
    report.record(KIND, &spec.name, action);
    Ok(report)
}

/// Converge each declared namespace. Undeclared namespaces are left alone.
pub fn converge_namespaces(
    client: &dyn ResourceClient,
    desired: &Declarations<Params>,
) -> Result<ChangeReport> {
    for name in desired.keys() {
        validate_name(KIND, name)?;
    }
    Reconciler::new(client).converge_each(&Namespaces, desired)
}
