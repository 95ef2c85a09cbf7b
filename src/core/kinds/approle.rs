//! AppRole roles.
//!
//! Roles live under `auth/<mount>/role/<name>` and are updated in place with
//! the same request that creates them.

use serde_json::Value;

use super::{validate_name, PathCollection};
use crate::core::client::{required_data, required_str, ResourceClient};
use crate::core::reconcile::{ChangeReport, Reconciler};
use crate::core::types::{Declarations, Params};
use crate::error::Result;

const KIND: &str = "approle role";

/// The role directory of the AppRole method mounted at `mount`.
pub fn roles(mount: &str) -> PathCollection {
    PathCollection::new(KIND, format!("/v1/auth/{}/role", mount))
}

/// Converge every role on `mount`. Roles not declared are deleted.
///
/// The report carries `role_ids`: declared role name to role ID.
///
/// # Errors
///
/// Returns `ValidationError` for unusable names, or the first client error.
pub fn converge_roles(
    client: &dyn ResourceClient,
    mount: &str,
    desired: &Declarations<Params>,
) -> Result<ChangeReport> {
    validate_name("mount", mount)?;
    for name in desired.keys() {
        validate_name(KIND, name)?;
    }

    let mut report = Reconciler::new(client).converge_all(&roles(mount), desired)?;

    let mut role_ids = Params::new();
    for (name, _) in desired.iter().filter(|(_, params)| params.is_some()) {
        role_ids.insert(name.clone(), Value::String(role_id(client, mount, name)?));
    }
    report.set_output("role_ids", Value::Object(role_ids));

    Ok(report)
}

/// Converge one role, leaving other roles alone. `None` deletes it.
///
/// The report carries `role_id` when the role is present.
pub fn converge_role(
    client: &dyn ResourceClient,
    mount: &str,
    name: &str,
    desired: Option<&Params>,
) -> Result<ChangeReport> {
    validate_name("mount", mount)?;
    validate_name(KIND, name)?;

    let action = Reconciler::new(client).converge_one(&roles(mount), name, desired)?;
    let mut report = ChangeReport::new();
    report.record(KIND, name, action);

    if desired.is_some() {
        report.set_output("role_id", Value::String(role_id(client, mount, name)?));
    }
    Ok(report)
}

/// Look up the role ID of an existing role.
pub fn role_id(client: &dyn ResourceClient, mount: &str, name: &str) -> Result<String> {
    let path = format!("/v1/auth/{}/role/{}/role-id", mount, name);
    let data = required_data(client.get(&path)?, &path)?;
    required_str(&data, &path, "role_id")
}
