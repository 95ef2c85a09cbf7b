//! Type aliases for domain concepts.
//!
//! Provides semantic type aliases to make function signatures more descriptive.

use std::collections::BTreeMap;

/// An externally visible resource name or mount path (e.g. `approle`, `github`).
///
/// Unique within its kind and namespace. Mount paths carry no trailing slash.
pub type ResourceKey = String;

/// A declared or fetched parameter map.
pub type Params = serde_json::Map<String, serde_json::Value>;

/// A server-assigned entity identifier.
pub type EntityId = String;

/// A server-assigned group identifier.
pub type GroupId = String;

/// A server-assigned entity-alias identifier.
pub type AliasId = String;

/// The stable accessor of an enabled auth method (e.g. `auth_github_1a2b3c`).
pub type Accessor = String;

/// String-to-string metadata as stored on entities, aliases and groups.
pub type Metadata = BTreeMap<String, String>;

/// A collection declaration: key to desired parameters, or `None` to delete.
pub type Declarations<T> = BTreeMap<ResourceKey, Option<T>>;
