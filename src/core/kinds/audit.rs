//! Audit devices.
//!
//! Vault cannot change an audit device in place, so any difference in type,
//! description or declared options disables and re-enables the device.

use std::collections::BTreeMap;

use serde::Deserialize;
use serde_json::Value;

use super::{mount_key, validate_name, Presence};
use crate::core::client::ResourceClient;
use crate::core::compare;
use crate::core::reconcile::{Adapter, ChangeReport, Collection, Reconciler};
use crate::core::types::{Declarations, Params, ResourceKey};
use crate::error::Result;

const KIND: &str = "audit device";
const SYS_AUDIT: &str = "/v1/sys/audit";

/// Every enabled audit device, keyed by path.
#[derive(Debug, Clone, Copy, Default)]
pub struct AuditDevices;

impl Adapter for AuditDevices {
    fn kind(&self) -> &'static str {
        KIND
    }

    fn fetch(&self, client: &dyn ResourceClient, key: &str) -> Result<Option<Value>> {
        Ok(enabled(client)?.remove(key))
    }

    /// Type and description must be equal; declared options a subset.
    fn is_satisfied(&self, desired: &Params, actual: &Value) -> bool {
        let empty = Value::String(String::new());
        let same = |field: &str| {
            actual.get(field).unwrap_or(&empty) == desired.get(field).unwrap_or(&empty)
        };
        let options = desired
            .get("options")
            .and_then(Value::as_object)
            .cloned()
            .unwrap_or_default();

        same("type")
            && same("description")
            && compare::satisfies(&options, actual.get("options").unwrap_or(&Value::Null))
    }

    fn recreate_required(&self, _desired: &Params, _actual: &Value) -> bool {
        true
    }

    fn create(&self, client: &dyn ResourceClient, key: &str, payload: &Value) -> Result<()> {
        client.post(&format!("{}/{}", SYS_AUDIT, key), payload)?;
        Ok(())
    }

    fn delete(&self, client: &dyn ResourceClient, key: &str) -> Result<()> {
        client.delete(&format!("{}/{}", SYS_AUDIT, key))?;
        Ok(())
    }
}

impl Collection for AuditDevices {
    fn list(&self, client: &dyn ResourceClient) -> Result<Vec<ResourceKey>> {
        Ok(enabled(client)?.into_keys().collect())
    }
}

fn enabled(client: &dyn ResourceClient) -> Result<BTreeMap<ResourceKey, Value>> {
    let body = client.get(SYS_AUDIT)?;
    Ok(body
        .data()
        .and_then(Value::as_object)
        .map(|devices| {
            devices
                .iter()
                .map(|(path, device)| (mount_key(path).to_string(), device.clone()))
                .collect()
        })
        .unwrap_or_default())
}

/// A single audit device declaration.
#[derive(Debug, Clone, Deserialize)]
pub struct AuditDeviceSpec {
    /// Path the device is enabled at.
    pub mount: String,
    #[serde(rename = "type")]
    pub device_type: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub options: Params,
    #[serde(default)]
    pub state: Presence,
}

impl AuditDeviceSpec {
    pub fn params(&self) -> Params {
        let mut params = Params::new();
        params.insert("type".to_string(), Value::String(self.device_type.clone()));
        params.insert(
            "description".to_string(),
            Value::String(self.description.clone()),
        );
        params.insert("options".to_string(), Value::Object(self.options.clone()));
        params
    }
}

pub fn converge_audit_device(
    client: &dyn ResourceClient,
    spec: &AuditDeviceSpec,
) -> Result<ChangeReport> {
    validate_name("audit path", &spec.mount)?;
    let params = spec.params();
    let desired = (spec.state == Presence::Present).then_some(&params);

    let action = Reconciler::new(client).converge_one(&AuditDevices, &spec.mount, desired)?;
    let mut report = ChangeReport::new();
    report.record(KIND, &spec.mount, action);
    Ok(report)
}

/// Converge every audit device. Undeclared devices are disabled.
pub fn converge_audit_devices(
    client: &dyn ResourceClient,
    desired: &Declarations<Params>,
) -> Result<ChangeReport> {
    for path in desired.keys() {
        validate_name("audit path", path)?;
    }
    Reconciler::new(client).converge_all(&AuditDevices, desired)
}
