//! Name-to-id resolution for the identity graph.

use std::collections::BTreeMap;

use serde_json::Value;
use tracing::info;

use super::nodes::{Entities, ENTITY_NAME, GROUP_NAME};
use super::{AliasKey, AliasTarget, Entity, EntityAlias};
use crate::core::client::{Method, ResourceClient};
use crate::core::constants::OK;
use crate::core::kinds::auth_method::mount_accessors;
use crate::core::kinds::mount_key;
use crate::core::reconcile::{Action, ChangeReport};
use crate::core::types::{Accessor, AliasId, EntityId, GroupId, ResourceKey};
use crate::error::{ClientError, ResolveError, Result};

pub(crate) const ALIAS_ID: &str = "/v1/identity/entity-alias/id";

/// Arena of identity nodes for one run, keyed by server-assigned id.
///
/// Entities are looked up by name on first use and cached by id; the mount
/// accessor snapshot and alias index are loaded lazily, once.
pub struct Directory<'c> {
    client: &'c dyn ResourceClient,
    entities: BTreeMap<EntityId, Entity>,
    names: BTreeMap<String, EntityId>,
    accessors: Option<BTreeMap<ResourceKey, Accessor>>,
    aliases: Option<BTreeMap<AliasId, EntityAlias>>,
}

impl<'c> Directory<'c> {
    pub fn new(client: &'c dyn ResourceClient) -> Self {
        Self {
            client,
            entities: BTreeMap::new(),
            names: BTreeMap::new(),
            accessors: None,
            aliases: None,
        }
    }

    /// The entity called `name`, fetched on first use.
    pub fn entity(&mut self, name: &str) -> Result<Option<&Entity>> {
        if !self.names.contains_key(name) {
            return self.refresh(name);
        }
        Ok(self
            .names
            .get(name)
            .and_then(|id| self.entities.get(id)))
    }

    /// Fetch the entity called `name` again, replacing any cached copy.
    pub fn refresh(&mut self, name: &str) -> Result<Option<&Entity>> {
        if let Some(id) = self.names.remove(name) {
            self.entities.remove(&id);
        }

        let path = format!("{}/{}", ENTITY_NAME, name);
        let Some(data) = self.client.read(&path)? else {
            return Ok(None);
        };
        let entity: Entity = serde_json::from_value(data).map_err(|e| {
            ClientError::MalformedResponse {
                path: path.clone(),
                reason: e.to_string(),
            }
        })?;

        let id = entity.id.clone();
        self.names.insert(name.to_string(), id.clone());
        self.entities.insert(id.clone(), entity);
        Ok(self.entities.get(&id))
    }

    /// A cached entity by id.
    pub fn get(&self, id: &str) -> Option<&Entity> {
        self.entities.get(id)
    }

    /// The id of the entity called `name`, creating it with no metadata, no
    /// policies and `disabled = false` if it does not exist.
    pub fn ensure_entity(&mut self, name: &str, report: &mut ChangeReport) -> Result<EntityId> {
        if let Some(entity) = self.entity(name)? {
            return Ok(entity.id.clone());
        }

        let path = format!("{}/{}", ENTITY_NAME, name);
        let payload = Value::Object(Entities::placeholder());
        self.client
            .request(Method::Post, &path, Some(&payload), OK)?;
        info!(entity = %name, "created entity for reference");
        report.record(Entities::KIND, name, Action::Created);

        // The create response omits aliases and, on 204, everything else.
        match self.refresh(name)? {
            Some(entity) => Ok(entity.id.clone()),
            None => Err(ClientError::MalformedResponse {
                path,
                reason: "entity missing after create".to_string(),
            }
            .into()),
        }
    }

    /// The accessor of the auth method an alias attaches to.
    ///
    /// # Errors
    ///
    /// Returns `ResolveError::UnknownAuthMount` if no auth method is enabled
    /// at the mount.
    pub fn accessor(&mut self, target: AliasTarget<'_>) -> Result<Accessor> {
        let mount = match target {
            AliasTarget::Accessor(accessor) => return Ok(accessor.to_string()),
            AliasTarget::Mount(mount) => mount_key(mount.trim_start_matches('/')),
        };
        if self.accessors.is_none() {
            self.accessors = Some(mount_accessors(self.client)?);
        }
        self.accessors
            .as_ref()
            .and_then(|accessors| accessors.get(mount))
            .cloned()
            .ok_or_else(|| ResolveError::UnknownAuthMount(mount.to_string()).into())
    }

    /// Every alias in the store, keyed by alias id.
    pub fn aliases(&mut self) -> Result<&BTreeMap<AliasId, EntityAlias>> {
        if self.aliases.is_none() {
            let mut index = BTreeMap::new();
            for (id, info) in self.client.list_key_info(ALIAS_ID)? {
                let mut alias: EntityAlias = serde_json::from_value(info).map_err(|e| {
                    ClientError::MalformedResponse {
                        path: ALIAS_ID.to_string(),
                        reason: e.to_string(),
                    }
                })?;
                alias.id = id.clone();
                index.insert(id, alias);
            }
            self.aliases = Some(index);
        }
        Ok(self.aliases.get_or_insert_with(BTreeMap::new))
    }

    /// Every alias in the store, keyed by `(name, mount_accessor)`.
    pub fn aliases_by_key(&mut self) -> Result<BTreeMap<AliasKey, EntityAlias>> {
        Ok(self
            .aliases()?
            .values()
            .map(|alias| (alias.key(), alias.clone()))
            .collect())
    }

    /// The id of an existing group.
    ///
    /// # Errors
    ///
    /// Returns `ResolveError::UnknownGroup` if no group has that name; groups
    /// are never created implicitly.
    pub fn group_id(&self, name: &str) -> Result<GroupId> {
        let path = format!("{}/{}", GROUP_NAME, name);
        self.client
            .read(&path)?
            .as_ref()
            .and_then(|data| data.get("id"))
            .and_then(Value::as_str)
            .map(str::to_string)
            .ok_or_else(|| ResolveError::UnknownGroup(name.to_string()).into())
    }
}
