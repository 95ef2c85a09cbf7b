//! OIDC auth method configuration and roles.

use serde::Deserialize;
use serde_json::Value;

use super::{validate_name, PathCollection};
use crate::core::client::ResourceClient;
use crate::core::constants::DEFAULT_OIDC_MOUNT;
use crate::core::reconcile::{Adapter, ChangeReport, Reconciler};
use crate::core::types::{Declarations, Params};
use crate::error::{Result, ValidationError};

const CONFIG_KIND: &str = "oidc config";
const ROLE_KIND: &str = "oidc role";

/// When the mount's config is written.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OidcConfigState {
    /// Write only if the mount is not yet configured.
    #[default]
    Present,
    /// Write on every run. The client secret is never returned on read, so
    /// a rotated secret cannot be told apart from the stored one.
    Updated,
}

/// The single `auth/<mount>/config` document.
#[derive(Debug, Clone)]
pub struct OidcConfig {
    mount: String,
    state: OidcConfigState,
}

impl OidcConfig {
    pub fn new(mount: impl Into<String>, state: OidcConfigState) -> Self {
        Self {
            mount: mount.into(),
            state,
        }
    }

    fn path(&self) -> String {
        format!("/v1/auth/{}/config", self.mount)
    }
}

impl Adapter for OidcConfig {
    fn kind(&self) -> &'static str {
        CONFIG_KIND
    }

    fn fetch(&self, client: &dyn ResourceClient, _key: &str) -> Result<Option<Value>> {
        client.read(&self.path())
    }

    fn is_satisfied(&self, _desired: &Params, _actual: &Value) -> bool {
        self.state == OidcConfigState::Present
    }

    fn create(&self, client: &dyn ResourceClient, _key: &str, payload: &Value) -> Result<()> {
        client.post(&self.path(), payload)?;
        Ok(())
    }

    fn delete(&self, _client: &dyn ResourceClient, _key: &str) -> Result<()> {
        Err(ValidationError::Undeletable { kind: CONFIG_KIND }.into())
    }
}

/// A declared OIDC configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct OidcConfigSpec {
    #[serde(default = "default_mount")]
    pub mount: String,
    #[serde(default)]
    pub config: Params,
    #[serde(default)]
    pub state: OidcConfigState,
}

fn default_mount() -> String {
    DEFAULT_OIDC_MOUNT.to_string()
}

/// Write the OIDC config of a mount according to its state.
pub fn converge_config(client: &dyn ResourceClient, spec: &OidcConfigSpec) -> Result<ChangeReport> {
    validate_name("mount", &spec.mount)?;
    let adapter = OidcConfig::new(&spec.mount, spec.state);

    let action = Reconciler::new(client).converge_one(&adapter, &spec.mount, Some(&spec.config))?;
    let mut report = ChangeReport::new();
    report.record(CONFIG_KIND, &spec.mount, action);
    Ok(report)
}

/// The role directory of the OIDC method mounted at `mount`.
pub fn roles(mount: &str) -> PathCollection {
    PathCollection::new(ROLE_KIND, format!("/v1/auth/{}/role", mount))
}

/// Converge every OIDC role on `mount`. Roles not declared are deleted.
pub fn converge_roles(
    client: &dyn ResourceClient,
    mount: &str,
    desired: &Declarations<Params>,
) -> Result<ChangeReport> {
    validate_name("mount", mount)?;
    for name in desired.keys() {
        validate_name(ROLE_KIND, name)?;
    }
    Reconciler::new(client).converge_all(&roles(mount), desired)
}
