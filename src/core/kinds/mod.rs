//! Resource-kind adapters.
//!
//! One module per kind of control-plane resource. Each supplies an
//! [`Adapter`](crate::core::reconcile::Adapter) and the entry points the CLI
//! calls, built on the shared [`Reconciler`](crate::core::reconcile::Reconciler).
//!
//! | Kind            | Mutable in place           | Forces recreate        |
//! |-----------------|----------------------------|------------------------|
//! | auth method     | description, tune config   | `type`                 |
//! | secrets engine  | description, tune config   | `type`, `options`      |
//! | audit device    | nothing                    | any field              |
//! | approle / OIDC  | every field                | nothing                |
//! | SSH role        | every field                | nothing                |
//! | OIDC config     | readable fields            | nothing                |
//! | SSH CA          | nothing                    | public key             |
//! | policy          | document body              | nothing                |
//! | namespace       | custom metadata            | nothing                |

pub mod approle;
pub mod approle_secret;
pub mod audit;
pub mod auth_method;
pub mod namespace;
pub mod oidc;
pub mod policy;
pub mod secrets_engine;
pub mod ssh;
pub mod token;

use serde::Deserialize;
use serde_json::Value;

use crate::core::client::ResourceClient;
use crate::core::reconcile::{Adapter, Collection};
use crate::core::types::ResourceKey;
use crate::error::Result;

/// Whether a singleton resource should exist.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Presence {
    #[default]
    Present,
    Absent,
}

/// A directory of named objects: `LIST base`, and `GET`/`POST`/`DELETE`
/// on `base/<name>`, compared by subset.
///
/// AppRole roles, OIDC roles and SSH roles all have this shape.
#[derive(Debug, Clone)]
pub struct PathCollection {
    kind: &'static str,
    base: String,
}

impl PathCollection {
    /// A collection rooted at `base` (e.g. `/v1/auth/approle/role`).
    pub fn new(kind: &'static str, base: impl Into<String>) -> Self {
        Self {
            kind,
            base: base.into(),
        }
    }

    /// Path of one member.
    pub fn path(&self, name: &str) -> String {
        format!("{}/{}", self.base, name)
    }
}

impl Adapter for PathCollection {
    fn kind(&self) -> &'static str {
        self.kind
    }

    fn fetch(&self, client: &dyn ResourceClient, key: &str) -> Result<Option<Value>> {
        client.read(&self.path(key))
    }

    fn create(&self, client: &dyn ResourceClient, key: &str, payload: &Value) -> Result<()> {
        client.post(&self.path(key), payload)?;
        Ok(())
    }

    fn delete(&self, client: &dyn ResourceClient, key: &str) -> Result<()> {
        client.delete(&self.path(key))?;
        Ok(())
    }
}

impl Collection for PathCollection {
    fn list(&self, client: &dyn ResourceClient) -> Result<Vec<ResourceKey>> {
        client.list(&self.base)
    }
}

/// Strip the trailing slash Vault puts on mount listings.
pub(crate) fn mount_key(path: &str) -> &str {
    path.trim_end_matches('/')
}

/// Reject names that would escape their path segment.
pub(crate) fn validate_name(kind: &'static str, name: &str) -> Result<()> {
    if name.is_empty() || name.split('/').any(|segment| segment == ".." || segment.is_empty()) {
        return Err(crate::error::ValidationError::InvalidName {
            kind,
            name: name.to_string(),
        }
        .into());
    }
    Ok(())
}
