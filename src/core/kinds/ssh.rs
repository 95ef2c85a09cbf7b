//! SSH certificate signer.
//!
//! Manages three things at one mount: an `ssh` secrets engine (any other
//! engine type at the mount is removed), the signing CA, and the signing
//! roles.
//!
//! The CA is never diffed field by field. It is written when missing, and
//! with `state = "replaced"` rewritten when the declared public key differs.

use serde::Deserialize;
use serde_json::{json, Value};

use super::secrets_engine::SecretsEngines;
use super::{validate_name, PathCollection};
use crate::core::client::ResourceClient;
use crate::core::compare::as_params;
use crate::core::constants::{DEFAULT_SSH_MOUNT, OK_OR_BAD_REQUEST};
use crate::core::reconcile::{Adapter, ChangeReport, Reconciler};
use crate::core::types::{Declarations, Params};
use crate::error::Result;

const CA_KIND: &str = "ssh ca";
const ROLE_KIND: &str = "ssh role";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SshState {
    /// Engine, CA and roles exist; an existing CA is kept.
    #[default]
    Present,
    /// As `present`, but a CA with a different public key is replaced.
    Replaced,
    /// The engine is disabled, taking CA and roles with it.
    Absent,
}

/// The signing CA at `<mount>/config/ca`. An unconfigured CA reads as 400.
#[derive(Debug, Clone)]
pub struct SigningCa {
    mount: String,
    replace: bool,
}

impl SigningCa {
    pub fn new(mount: impl Into<String>, state: SshState) -> Self {
        Self {
            mount: mount.into(),
            replace: state == SshState::Replaced,
        }
    }

    fn path(&self) -> String {
        format!("/v1/{}/config/ca", self.mount)
    }
}

impl Adapter for SigningCa {
    fn kind(&self) -> &'static str {
        CA_KIND
    }

    fn fetch(&self, client: &dyn ResourceClient, _key: &str) -> Result<Option<Value>> {
        client.read_with(&self.path(), OK_OR_BAD_REQUEST)
    }

    fn is_satisfied(&self, desired: &Params, actual: &Value) -> bool {
        match desired.get("public_key") {
            Some(key) if self.replace => actual.get("public_key") == Some(key),
            _ => true,
        }
    }

    /// Vault refuses to overwrite configured keys.
    fn recreate_required(&self, _desired: &Params, _actual: &Value) -> bool {
        true
    }

    fn create(&self, client: &dyn ResourceClient, _key: &str, payload: &Value) -> Result<()> {
        client.post(&self.path(), payload)?;
        Ok(())
    }

    fn delete(&self, client: &dyn ResourceClient, _key: &str) -> Result<()> {
        client.delete(&self.path())?;
        Ok(())
    }
}

/// The role directory of the SSH engine mounted at `mount`.
pub fn roles(mount: &str) -> PathCollection {
    PathCollection::new(ROLE_KIND, format!("/v1/{}/roles", mount))
}

/// Turn a list of allowed extensions into the `default_extensions` mapping
/// the signer expects: each extension maps to an empty string.
pub fn default_extensions<I, S>(extensions: I) -> Params
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    extensions
        .into_iter()
        .map(|extension| (extension.into(), Value::String(String::new())))
        .collect()
}

/// Accept `default_extensions` declared as a list as well as a mapping.
fn normalize_role(params: &Params) -> Params {
    let mut params = params.clone();
    if let Some(Value::Array(list)) = params.get("default_extensions") {
        let mapping = default_extensions(list.iter().filter_map(Value::as_str));
        params.insert("default_extensions".to_string(), Value::Object(mapping));
    }
    params
}

/// A declared SSH signer.
#[derive(Debug, Clone, Deserialize)]
pub struct SshSignerSpec {
    #[serde(default = "default_mount")]
    pub mount: String,
    /// CA parameters, e.g. `generate_signing_key` or a `public_key` and
    /// `private_key` pair.
    #[serde(default)]
    pub ca: Params,
    #[serde(default, deserialize_with = "crate::core::manifest::declarations")]
    pub roles: Declarations<Params>,
    #[serde(default)]
    pub state: SshState,
}

fn default_mount() -> String {
    DEFAULT_SSH_MOUNT.to_string()
}

impl SshSignerSpec {
    pub fn new(mount: impl Into<String>, state: SshState) -> Self {
        Self {
            mount: mount.into(),
            ca: Params::new(),
            roles: Declarations::new(),
            state,
        }
    }
}

/// Converge the engine, CA and roles of one SSH signer mount.
pub fn converge_signer(client: &dyn ResourceClient, spec: &SshSignerSpec) -> Result<ChangeReport> {
    validate_name("mount", &spec.mount)?;
    for name in spec.roles.keys() {
        validate_name(ROLE_KIND, name)?;
    }

    let reconciler = Reconciler::new(client);
    let mut report = ChangeReport::new();

    let engine = as_params(&json!({ "type": "ssh" }));
    let desired = (spec.state != SshState::Absent).then_some(&engine);
    let action = reconciler.converge_one(&SecretsEngines, &spec.mount, desired)?;
    report.record(SecretsEngines.kind(), &spec.mount, action);

    if spec.state == SshState::Absent {
        return Ok(report);
    }

    let ca = SigningCa::new(&spec.mount, spec.state);
    let action = reconciler.converge_one(&ca, &spec.mount, Some(&spec.ca))?;
    report.record(CA_KIND, &spec.mount, action);

    let roles_desired: Declarations<Params> = spec
        .roles
        .iter()
        .map(|(name, params)| (name.clone(), params.as_ref().map(normalize_role)))
        .collect();
    report.merge(reconciler.converge_all(&roles(&spec.mount), &roles_desired)?);

    Ok(report)
}
