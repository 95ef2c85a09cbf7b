//! Node adapters: entities and groups, addressed by name.
//!
//! Both are compared field by field rather than by subset: maps must be
//! equal, and lists (policies, member ids) are compared as sets.

use serde_json::{json, Value};

use super::{EntitySpec, GroupSpec};
use crate::core::client::ResourceClient;
use crate::core::compare::{as_params, same_set};
use crate::core::reconcile::Adapter;
use crate::core::types::{EntityId, GroupId, Params};
use crate::error::Result;

pub(crate) const ENTITY_NAME: &str = "/v1/identity/entity/name";
pub(crate) const GROUP_NAME: &str = "/v1/identity/group/name";

fn map_field(value: &Value, field: &str) -> Params {
    value.get(field).map(as_params).unwrap_or_default()
}

fn string_field(value: &Value, field: &str) -> Vec<String> {
    value
        .get(field)
        .and_then(Value::as_array)
        .map(|items| {
            items
                .iter()
                .filter_map(Value::as_str)
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default()
}

fn same_map(desired: &Params, actual: &Value, field: &str) -> bool {
    map_field(&Value::Object(desired.clone()), field) == map_field(actual, field)
}

fn same_strings(desired: &Params, actual: &Value, field: &str) -> bool {
    same_set(
        string_field(&Value::Object(desired.clone()), field),
        string_field(actual, field),
    )
}

/// Entities keyed by name.
#[derive(Debug, Clone, Copy, Default)]
pub struct Entities;

impl Entities {
    pub(crate) const KIND: &'static str = "entity";

    /// Node parameters of a declared entity. Aliases are edges and are not
    /// part of the node.
    pub fn params(spec: &EntitySpec) -> Params {
        as_params(&json!({
            "metadata": spec.metadata,
            "policies": spec.policies,
            "disabled": spec.disabled,
        }))
    }

    /// Parameters of an entity created only to host an alias or membership.
    pub fn placeholder() -> Params {
        Self::params(&EntitySpec::default())
    }
}

impl Adapter for Entities {
    fn kind(&self) -> &'static str {
        Self::KIND
    }

    fn fetch(&self, client: &dyn ResourceClient, key: &str) -> Result<Option<Value>> {
        client.read(&format!("{}/{}", ENTITY_NAME, key))
    }

    fn is_satisfied(&self, desired: &Params, actual: &Value) -> bool {
        let disabled = |value: &Value| value.get("disabled").and_then(Value::as_bool).unwrap_or(false);
        same_map(desired, actual, "metadata")
            && same_strings(desired, actual, "policies")
            && disabled(&Value::Object(desired.clone())) == disabled(actual)
    }

    fn create(&self, client: &dyn ResourceClient, key: &str, payload: &Value) -> Result<()> {
        client.post(&format!("{}/{}", ENTITY_NAME, key), payload)?;
        Ok(())
    }

    fn delete(&self, client: &dyn ResourceClient, key: &str) -> Result<()> {
        client.delete(&format!("{}/{}", ENTITY_NAME, key))?;
        Ok(())
    }
}

/// Groups keyed by name.
#[derive(Debug, Clone, Copy, Default)]
pub struct Groups;

impl Groups {
    pub(crate) const KIND: &'static str = "group";

    /// Node parameters of a declared group, with members already resolved
    /// to ids.
    pub fn params(spec: &GroupSpec, entity_ids: &[EntityId], group_ids: &[GroupId]) -> Params {
        as_params(&json!({
            "metadata": spec.metadata,
            "policies": spec.policies,
            "member_entity_ids": entity_ids,
            "member_group_ids": group_ids,
        }))
    }
}

impl Adapter for Groups {
    fn kind(&self) -> &'static str {
        Self::KIND
    }

    fn fetch(&self, client: &dyn ResourceClient, key: &str) -> Result<Option<Value>> {
        client.read(&format!("{}/{}", GROUP_NAME, key))
    }

    fn is_satisfied(&self, desired: &Params, actual: &Value) -> bool {
        same_map(desired, actual, "metadata")
            && same_strings(desired, actual, "policies")
            && same_strings(desired, actual, "member_entity_ids")
            && same_strings(desired, actual, "member_group_ids")
    }

    fn create(&self, client: &dyn ResourceClient, key: &str, payload: &Value) -> Result<()> {
        client.post(&format!("{}/{}", GROUP_NAME, key), payload)?;
        Ok(())
    }

    fn delete(&self, client: &dyn ResourceClient, key: &str) -> Result<()> {
        client.delete(&format!("{}/{}", GROUP_NAME, key))?;
        Ok(())
    }
}
