//! Identity graph: entities, entity aliases and groups.
//!
//! Declarations name entities, groups and auth mounts; the server links them
//! by id and accessor. Reconciliation therefore runs in two passes:
//!
//! 1. **Nodes.** Entities (and groups) are created, updated or deleted.
//! 2. **Edges.** Aliases and group memberships are resolved to ids through a
//!    [`Directory`] and only then diffed.
//!
//! Edge records hold ids, never references into node records; anything needed
//! from a node is looked up again in the directory.

mod directory;
mod nodes;
mod resolver;

use serde::{Deserialize, Deserializer, Serialize};

use crate::core::types::{Accessor, AliasId, EntityId, GroupId, Metadata};
use crate::error::{Result, ValidationError};

pub use directory::Directory;
pub use nodes::{Entities, Groups};
pub use resolver::{
    converge_entities, converge_entity, converge_group, converge_groups, converge_mount_aliases,
};

/// Vault reports empty maps and lists as `null`.
fn null_as_default<'de, D, T>(deserializer: D) -> std::result::Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// An entity as read from `identity/entity/name/<name>`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Entity {
    pub id: EntityId,
    pub name: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub metadata: Metadata,
    #[serde(default, deserialize_with = "null_as_default")]
    pub policies: Vec<String>,
    #[serde(default)]
    pub disabled: bool,
    #[serde(default, deserialize_with = "null_as_default")]
    pub aliases: Vec<EntityAlias>,
}

/// An entity alias. Unique by `(name, mount_accessor)` across the store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntityAlias {
    /// Absent from key-info listings, where the id is the map key.
    #[serde(default)]
    pub id: AliasId,
    pub name: String,
    pub mount_accessor: Accessor,
    pub canonical_id: EntityId,
    #[serde(default, deserialize_with = "null_as_default")]
    pub custom_metadata: Metadata,
}

impl EntityAlias {
    /// The identity of the alias within the store.
    pub fn key(&self) -> AliasKey {
        AliasKey::new(&self.name, &self.mount_accessor)
    }
}

/// Store-wide alias identity: alias name plus the accessor of its auth mount.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct AliasKey {
    pub name: String,
    pub mount_accessor: Accessor,
}

impl AliasKey {
    pub fn new(name: &str, mount_accessor: &str) -> Self {
        Self {
            name: name.to_string(),
            mount_accessor: mount_accessor.to_string(),
        }
    }
}

impl std::fmt::Display for AliasKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}@{}", self.name, self.mount_accessor)
    }
}

/// A group as read from `identity/group/name/<name>`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Group {
    pub id: GroupId,
    pub name: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub metadata: Metadata,
    #[serde(default, deserialize_with = "null_as_default")]
    pub policies: Vec<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub member_entity_ids: Vec<EntityId>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub member_group_ids: Vec<GroupId>,
}

/// A declared entity.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct EntitySpec {
    #[serde(default)]
    pub metadata: Metadata,
    #[serde(default)]
    pub policies: Vec<String>,
    #[serde(default)]
    pub disabled: bool,
    /// The complete set of aliases bound to this entity.
    #[serde(default)]
    pub aliases: Vec<AliasSpec>,
}

/// A declared alias of an entity.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AliasSpec {
    pub name: String,
    /// Auth mount path, translated to its accessor.
    #[serde(default)]
    pub auth_mount: Option<String>,
    /// Accessor given directly; takes precedence over `auth_mount`.
    #[serde(default)]
    pub mount_accessor: Option<Accessor>,
    #[serde(default)]
    pub custom_metadata: Metadata,
}

impl AliasSpec {
    /// An alias on the auth method mounted at `auth_mount`.
    pub fn on_mount(name: impl Into<String>, auth_mount: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            auth_mount: Some(auth_mount.into()),
            mount_accessor: None,
            custom_metadata: Metadata::new(),
        }
    }

    /// Where the alias attaches.
    ///
    /// # Errors
    ///
    /// Returns `ValidationError::MissingAliasMount` if neither a mount nor an
    /// accessor is given.
    pub fn target(&self) -> Result<AliasTarget<'_>> {
        match (&self.mount_accessor, &self.auth_mount) {
            (Some(accessor), _) => Ok(AliasTarget::Accessor(accessor)),
            (None, Some(mount)) => Ok(AliasTarget::Mount(mount)),
            (None, None) => Err(ValidationError::MissingAliasMount {
                name: self.name.clone(),
            }
            .into()),
        }
    }
}

/// How an alias names its auth method.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AliasTarget<'a> {
    Mount(&'a str),
    Accessor(&'a str),
}

/// The entity an alias on a given mount points at: just a name, or a name
/// with alias metadata.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum MountAliasSpec {
    Entity(String),
    Detailed {
        entity_name: String,
        #[serde(default)]
        custom_metadata: Option<Metadata>,
    },
}

impl MountAliasSpec {
    pub fn entity_name(&self) -> &str {
        match self {
            Self::Entity(name) | Self::Detailed { entity_name: name, .. } => name,
        }
    }

    /// Declared alias metadata; `None` leaves whatever the server has.
    pub fn custom_metadata(&self) -> Option<&Metadata> {
        match self {
            Self::Entity(_) => None,
            Self::Detailed { custom_metadata, .. } => custom_metadata.as_ref(),
        }
    }
}

/// A declared group. Members are entity names (created when missing);
/// member groups are group names, which must already exist.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct GroupSpec {
    #[serde(default)]
    pub metadata: Metadata,
    #[serde(default)]
    pub policies: Vec<String>,
    #[serde(default)]
    pub members: Vec<String>,
    #[serde(default)]
    pub member_groups: Vec<String>,
}
