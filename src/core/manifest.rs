//! Declaration files.
//!
//! A manifest declares the desired state of a whole server in TOML or JSON
//! (chosen by file extension). Every section is optional. Sections that
//! reconcile a complete collection (auth methods, secrets engines, audit
//! devices, AppRole and OIDC roles) delete undeclared instances only when the
//! section is present, so an omitted section leaves that kind untouched.
//!
//! A collection entry is deleted by declaring it as `null` in JSON or, since
//! TOML has no null, as the string `"absent"`:
//!
//! ```toml
//! [policies]
//! ops = 'path "secret/*" { capabilities = ["read"] }'
//! legacy = "absent"
//!
//! [auth_methods.github]
//! type = "github"
//!
//! [approles.approle.web]
//! token_ttl = 600
//! ```

use std::collections::BTreeMap;
use std::fmt;
use std::fs;
use std::path::Path;

use serde::de::{self, Deserializer, Unexpected, Visitor};
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::debug;

use crate::core::client::ResourceClient;
use crate::core::constants::DEFAULT_OIDC_MOUNT;
use crate::core::identity::{self, EntitySpec, GroupSpec, MountAliasSpec};
use crate::core::kinds::approle_secret::{declared_metadata, SecretIdRequest};
use crate::core::kinds::oidc::{OidcConfigSpec, OidcConfigState};
use crate::core::kinds::ssh::SshSignerSpec;
use crate::core::kinds::{
    approle, approle_secret, audit, auth_method, namespace, oidc, policy, secrets_engine, ssh,
    validate_name,
};
use crate::core::reconcile::ChangeReport;
use crate::core::types::{Declarations, Params, ResourceKey};
use crate::error::{ConfigError, Result};

/// The TOML spelling of a deletion.
pub const ABSENT: &str = "absent";

/// Matches `null`, or the string `"absent"`.
struct Absent;

impl<'de> Deserialize<'de> for Absent {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        struct AbsentVisitor;

        impl<'de> Visitor<'de> for AbsentVisitor {
            type Value = Absent;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "null or \"{}\"", ABSENT)
            }

            fn visit_unit<E: de::Error>(self) -> std::result::Result<Absent, E> {
                Ok(Absent)
            }

            fn visit_none<E: de::Error>(self) -> std::result::Result<Absent, E> {
                Ok(Absent)
            }

            fn visit_str<E: de::Error>(self, value: &str) -> std::result::Result<Absent, E> {
                if value == ABSENT {
                    Ok(Absent)
                } else {
                    Err(E::invalid_value(Unexpected::Str(value), &self))
                }
            }
        }

        deserializer.deserialize_any(AbsentVisitor)
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum Entry<T> {
    Absent(Absent),
    Present(T),
}

impl<T> Entry<T> {
    fn into_option(self) -> Option<T> {
        match self {
            Self::Absent(_) => None,
            Self::Present(value) => Some(value),
        }
    }
}

/// Deserialize a collection declaration, mapping the deletion sentinel to
/// `None`.
pub(crate) fn declarations<'de, D, T>(deserializer: D) -> std::result::Result<Declarations<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    let entries = BTreeMap::<ResourceKey, Entry<T>>::deserialize(deserializer)?;
    Ok(entries
        .into_iter()
        .map(|(key, entry)| (key, entry.into_option()))
        .collect())
}

fn optional_declarations<'de, D, T>(
    deserializer: D,
) -> std::result::Result<Option<Declarations<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    declarations(deserializer).map(Some)
}

fn declarations_per_mount<'de, D, T>(
    deserializer: D,
) -> std::result::Result<BTreeMap<ResourceKey, Declarations<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    let mounts = BTreeMap::<ResourceKey, BTreeMap<ResourceKey, Entry<T>>>::deserialize(deserializer)?;
    Ok(mounts
        .into_iter()
        .map(|(mount, entries)| {
            let entries = entries
                .into_iter()
                .map(|(key, entry)| (key, entry.into_option()))
                .collect();
            (mount, entries)
        })
        .collect())
}

/// The `[oidc]` section.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct OidcSection {
    #[serde(default = "default_oidc_mount")]
    pub mount: String,
    /// Auth method config; left alone when omitted.
    #[serde(default)]
    pub config: Option<Params>,
    #[serde(default)]
    pub state: OidcConfigState,
    /// Complete role set; left alone when omitted.
    #[serde(default, deserialize_with = "optional_declarations")]
    pub roles: Option<Declarations<Params>>,
}

fn default_oidc_mount() -> String {
    DEFAULT_OIDC_MOUNT.to_string()
}

/// A whole-server declaration.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Manifest {
    /// Namespace name to `{custom_metadata}`.
    #[serde(default, deserialize_with = "declarations")]
    pub namespaces: Declarations<Params>,
    /// Policy name to policy document.
    #[serde(default, deserialize_with = "declarations")]
    pub policies: Declarations<String>,
    /// Mount path to `{type, description, config}`.
    #[serde(default, deserialize_with = "optional_declarations")]
    pub auth_methods: Option<Declarations<Params>>,
    /// Mount path to `{type, description, config, options}`.
    #[serde(default, deserialize_with = "optional_declarations")]
    pub secrets_engines: Option<Declarations<Params>>,
    /// Device path to `{type, description, options}`.
    #[serde(default, deserialize_with = "optional_declarations")]
    pub audit_devices: Option<Declarations<Params>>,
    /// AppRole mount to its complete role set.
    #[serde(default, deserialize_with = "declarations_per_mount")]
    pub approles: BTreeMap<ResourceKey, Declarations<Params>>,
    #[serde(default)]
    pub approle_secrets: Vec<SecretIdRequest>,
    #[serde(default)]
    pub oidc: Option<OidcSection>,
    #[serde(default)]
    pub ssh: Vec<SshSignerSpec>,
    /// Entity name to entity, including its complete alias set.
    #[serde(default, deserialize_with = "declarations")]
    pub entities: Declarations<EntitySpec>,
    /// Auth mount to its complete alias set: alias name to entity.
    #[serde(default)]
    pub entity_aliases: BTreeMap<ResourceKey, BTreeMap<String, MountAliasSpec>>,
    #[serde(default, deserialize_with = "declarations")]
    pub groups: Declarations<GroupSpec>,
}

impl Manifest {
    /// Load a manifest, choosing the format by extension.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::ReadFile` if the file cannot be read,
    /// `ConfigError::UnsupportedFormat` for an unknown extension, or a parse
    /// error.
    pub fn load(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path).map_err(|source| ConfigError::ReadFile {
            path: path.display().to_string(),
            source,
        })?;

        let extension = path
            .extension()
            .and_then(|ext| ext.to_str())
            .unwrap_or_default()
            .to_ascii_lowercase();
        let manifest = match extension.as_str() {
            "toml" => Self::from_toml(&text)?,
            "json" => Self::from_json(&text)?,
            other => return Err(ConfigError::UnsupportedFormat(other.to_string()).into()),
        };
        debug!(path = %path.display(), "loaded manifest");
        Ok(manifest)
    }

    pub fn from_toml(text: &str) -> Result<Self> {
        Ok(toml::from_str(text).map_err(ConfigError::from)?)
    }

    pub fn from_json(text: &str) -> Result<Self> {
        Ok(serde_json::from_str(text).map_err(ConfigError::from)?)
    }

    /// Check everything that can be checked without a server.
    ///
    /// # Errors
    ///
    /// Returns the first `ValidationError` found.
    pub fn validate(&self) -> Result<()> {
        for name in self.namespaces.keys() {
            validate_name("namespace", name)?;
        }
        for name in self.policies.keys() {
            validate_name("policy", name)?;
        }
        for declared in [&self.auth_methods, &self.secrets_engines, &self.audit_devices]
            .into_iter()
            .flatten()
        {
            for mount in declared.keys() {
                validate_name("mount", mount)?;
            }
        }
        for (mount, roles) in &self.approles {
            validate_name("mount", mount)?;
            for name in roles.keys() {
                validate_name("approle role", name)?;
            }
        }
        for request in &self.approle_secrets {
            validate_name("approle role", &request.approle_name)?;
            declared_metadata(&request.parameters)?;
        }
        for (name, entity) in &self.entities {
            validate_name("entity", name)?;
            for alias in entity.iter().flat_map(|entity| &entity.aliases) {
                alias.target()?;
            }
        }
        for (mount, aliases) in &self.entity_aliases {
            validate_name("mount", mount)?;
            for alias in aliases.values() {
                validate_name("entity", alias.entity_name())?;
            }
        }
        for name in self.groups.keys() {
            validate_name("group", name)?;
        }
        Ok(())
    }

    /// Converge the server to this manifest, one section at a time in
    /// dependency order.
    ///
    /// Outputs are nested by section, e.g. `auth_methods.accessors` or
    /// `approles.<mount>.role_ids`.
    ///
    /// # Errors
    ///
    /// Validation runs first. After that the first failure stops the run;
    /// sections already applied stay applied.
    pub fn apply(&self, client: &dyn ResourceClient) -> Result<ChangeReport> {
        self.validate()?;
        let mut report = ChangeReport::new();

        if !self.namespaces.is_empty() {
            report.absorb(
                "namespaces",
                namespace::converge_namespaces(client, &self.namespaces)?,
            );
        }
        if !self.policies.is_empty() {
            report.absorb("policies", policy::converge_policies(client, &self.policies)?);
        }
        if let Some(declared) = &self.auth_methods {
            report.absorb(
                "auth_methods",
                auth_method::converge_auth_methods(client, declared)?,
            );
        }
        if let Some(declared) = &self.secrets_engines {
            report.absorb(
                "secrets_engines",
                secrets_engine::converge_secrets_engines(client, declared)?,
            );
        }
        if let Some(declared) = &self.audit_devices {
            report.absorb(
                "audit_devices",
                audit::converge_audit_devices(client, declared)?,
            );
        }

        if !self.approles.is_empty() {
            let mut mounts = ChangeReport::new();
            for (mount, roles) in &self.approles {
                mounts.absorb(mount, approle::converge_roles(client, mount, roles)?);
            }
            report.absorb("approles", mounts);
        }
        if !self.approle_secrets.is_empty() {
            let mut issued = Vec::with_capacity(self.approle_secrets.len());
            for request in &self.approle_secrets {
                let mut secret = approle_secret::converge_secret_id(client, request)?;
                issued.push(json!({
                    "mount": request.mount,
                    "approle_name": request.approle_name,
                    "secret_id": secret.take_output("secret_id"),
                    "secret_id_accessor": secret.take_output("secret_id_accessor"),
                }));
                report.merge(secret);
            }
            report.set_output("approle_secrets", Value::Array(issued));
        }

        if let Some(section) = &self.oidc {
            let mut oidc_report = ChangeReport::new();
            if let Some(config) = &section.config {
                let spec = OidcConfigSpec {
                    mount: section.mount.clone(),
                    config: config.clone(),
                    state: section.state,
                };
                oidc_report.merge(oidc::converge_config(client, &spec)?);
            }
            if let Some(roles) = &section.roles {
                oidc_report.merge(oidc::converge_roles(client, &section.mount, roles)?);
            }
            report.absorb("oidc", oidc_report);
        }
        for signer in &self.ssh {
            report.merge(ssh::converge_signer(client, signer)?);
        }

        if !self.entities.is_empty() {
            report.absorb(
                "entities",
                identity::converge_entities(client, &self.entities)?,
            );
        }
        if !self.entity_aliases.is_empty() {
            let mut mounts = ChangeReport::new();
            for (mount, aliases) in &self.entity_aliases {
                mounts.absorb(
                    mount,
                    identity::converge_mount_aliases(client, mount, aliases)?,
                );
            }
            report.absorb("entity_aliases", mounts);
        }
        if !self.groups.is_empty() {
            report.absorb("groups", identity::converge_groups(client, &self.groups)?);
        }

        Ok(report)
    }
}
