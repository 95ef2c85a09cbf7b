//! ACL policies.
//!
//! A policy is a single HCL document compared by exact text, and rewritten in
//! place when it differs.

use serde::Deserialize;
use serde_json::{json, Value};

use super::{validate_name, Presence};
use crate::core::client::{Method, ResourceClient};
use crate::core::constants::{BUILTIN_POLICIES, OK_OR_NOT_FOUND};
use crate::core::reconcile::{Adapter, ChangeReport, Reconciler};
use crate::core::types::{Declarations, Params};
use crate::error::{Result, ValidationError};

const KIND: &str = "policy";
const SYS_POLICY: &str = "/v1/sys/policy";

/// ACL policies keyed by name. Live instances are read as `{"policy": text}`.
#[derive(Debug, Clone, Copy, Default)]
pub struct Policies;

impl Adapter for Policies {
    fn kind(&self) -> &'static str {
        KIND
    }

    fn fetch(&self, client: &dyn ResourceClient, key: &str) -> Result<Option<Value>> {
        let path = format!("{}/{}", SYS_POLICY, key);
        let body = client.request(Method::Get, &path, None, OK_OR_NOT_FOUND)?;
        let rules = body
            .data()
            .and_then(|data| data.get("rules"))
            .or_else(|| body.json().and_then(|json| json.get("rules")))
            .and_then(Value::as_str);
        Ok(rules.map(|rules| json!({ "policy": rules })))
    }

    fn create(&self, client: &dyn ResourceClient, key: &str, payload: &Value) -> Result<()> {
        client.post(&format!("{}/{}", SYS_POLICY, key), payload)?;
        Ok(())
    }

    fn delete(&self, client: &dyn ResourceClient, key: &str) -> Result<()> {
        client.delete(&format!("{}/{}", SYS_POLICY, key))?;
        Ok(())
    }

    fn is_protected(&self, key: &str) -> bool {
        BUILTIN_POLICIES.contains(&key)
    }
}

/// A single policy declaration.
#[derive(Debug, Clone, Deserialize)]
pub struct PolicySpec {
    pub name: String,
    /// Policy document. Required unless the state is `absent`.
    #[serde(default)]
    pub policy: Option<String>,
    #[serde(default)]
    pub state: Presence,
}

fn document(text: &str) -> Params {
    let mut params = Params::new();
    params.insert("policy".to_string(), Value::String(text.to_string()));
    params
}

/// Converge one policy.
///
/// # Errors
///
/// Returns `ValidationError::MissingPolicy` when a present policy has no
/// document, before any request is made.
pub fn converge_policy(client: &dyn ResourceClient, spec: &PolicySpec) -> Result<ChangeReport> {
    validate_name(KIND, &spec.name)?;
    let params = match (spec.state, &spec.policy) {
        (Presence::Absent, _) => None,
        (Presence::Present, Some(text)) => Some(document(text)),
        (Presence::Present, None) => {
            return Err(ValidationError::MissingPolicy {
                name: spec.name.clone(),
            }
            .into())
        }
    };

    let action = Reconciler::new(client).converge_one(&Policies, &spec.name, params.as_ref())?;
    let mut report = ChangeReport::new();
    report.record(KIND, &spec.name, action);
    Ok(report)
}

/// Converge each declared policy. Policies that are not declared are left
/// alone, and `root`/`default` are never deleted.
pub fn converge_policies(
    client: &dyn ResourceClient,
    desired: &Declarations<String>,
) -> Result<ChangeReport> {
    for name in desired.keys() {
        validate_name(KIND, name)?;
    }
    let documents: Declarations<Params> = desired
        .iter()
        .map(|(name, text)| (name.clone(), text.as_deref().map(document)))
        .collect();
    Reconciler::new(client).converge_each(&Policies, &documents)
}
