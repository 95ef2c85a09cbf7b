//! Entity, alias and group reconciliation.

use std::collections::{BTreeMap, BTreeSet};

use serde_json::{json, Value};
use tracing::{debug, info};

use super::directory::{Directory, ALIAS_ID};
use super::nodes::{Entities, Groups, ENTITY_NAME};
use super::{AliasKey, AliasTarget, EntityAlias, EntitySpec, GroupSpec, MountAliasSpec};
use crate::core::client::ResourceClient;
use crate::core::kinds::validate_name;
use crate::core::reconcile::{Action, Adapter, ChangeReport, Reconciler};
use crate::core::types::{Declarations, EntityId, Metadata, Params};
use crate::error::{ClientError, Result, ValidationError};

const ALIAS_KIND: &str = "entity alias";
const ENTITY_ALIAS: &str = "/v1/identity/entity-alias";

/// Where a declared alias should point.
#[derive(Debug, Clone)]
struct AliasBinding {
    canonical_id: EntityId,
    /// `None` leaves the live metadata alone.
    custom_metadata: Option<Metadata>,
}

/// Create the alias, re-point it, or fix its metadata.
fn sync_alias(
    client: &dyn ResourceClient,
    key: &AliasKey,
    binding: &AliasBinding,
    existing: Option<&EntityAlias>,
) -> Result<Action> {
    let mut payload = json!({
        "name": key.name,
        "mount_accessor": key.mount_accessor,
        "canonical_id": binding.canonical_id,
    });
    if let Some(metadata) = &binding.custom_metadata {
        payload["custom_metadata"] = json!(metadata);
    }

    let action = match existing {
        None => {
            client.post(ENTITY_ALIAS, &payload)?;
            Action::Created
        }
        Some(alias)
            if alias.canonical_id == binding.canonical_id
                && binding
                    .custom_metadata
                    .as_ref()
                    .map_or(true, |metadata| *metadata == alias.custom_metadata) =>
        {
            Action::Unchanged
        }
        Some(alias) => {
            if alias.canonical_id != binding.canonical_id {
                debug!(alias = %key, from = %alias.canonical_id, to = %binding.canonical_id, "re-pointing alias");
            }
            client.post(&format!("{}/{}", ALIAS_ID, alias.id), &payload)?;
            Action::Updated
        }
    };

    if action.is_change() {
        info!(alias = %key, action = %action, "converged");
    }
    Ok(action)
}

fn delete_alias(client: &dyn ResourceClient, alias: &EntityAlias) -> Result<()> {
    client.delete(&format!("{}/{}", ALIAS_ID, alias.id))?;
    info!(alias = %alias.key(), "deleted undeclared alias");
    Ok(())
}

fn missing_after_write(name: &str) -> crate::error::Error {
    ClientError::MalformedResponse {
        path: format!("{}/{}", ENTITY_NAME, name),
        reason: "entity missing after write".to_string(),
    }
    .into()
}

/// Converge entities and the complete alias set of each.
///
/// Nodes first: declared entities are created or updated, and `None` deletes
/// one (the server drops its aliases with it). Then edges: each declared
/// alias is resolved to `(name, mount_accessor)` and bound to its entity;
/// aliases of declared entities that were not declared are deleted. Aliases
/// are matched store-wide, so an alias held by another entity is re-pointed.
///
/// The report carries `entities`: name to the resulting entity record.
///
/// # Errors
///
/// Names and alias targets are validated before any request, and every alias
/// is resolved before any write. An alias on an unknown auth mount fails with
/// `ResolveError::UnknownAuthMount`; one alias declared on two entities fails
/// with `ValidationError::DuplicateAlias`.
pub fn converge_entities(
    client: &dyn ResourceClient,
    desired: &Declarations<EntitySpec>,
) -> Result<ChangeReport> {
    for (name, spec) in desired {
        validate_name(Entities::KIND, name)?;
        for alias in spec.iter().flat_map(|spec| &spec.aliases) {
            alias.target()?;
        }
    }

    let present: Vec<(&String, &EntitySpec)> = desired
        .iter()
        .filter_map(|(name, spec)| spec.as_ref().map(|spec| (name, spec)))
        .collect();

    let mut directory = Directory::new(client);
    let mut claimed: BTreeMap<AliasKey, &str> = BTreeMap::new();
    for (name, spec) in &present {
        for alias in &spec.aliases {
            let accessor = directory.accessor(alias.target()?)?;
            let key = AliasKey::new(&alias.name, &accessor);
            match claimed.get(&key) {
                Some(first) if *first != name.as_str() => {
                    return Err(ValidationError::DuplicateAlias {
                        name: key.to_string(),
                        first: first.to_string(),
                        second: name.to_string(),
                    }
                    .into());
                }
                _ => {
                    claimed.insert(key, name.as_str());
                }
            }
        }
    }

    let nodes: Declarations<Params> = desired
        .iter()
        .map(|(name, spec)| (name.clone(), spec.as_ref().map(Entities::params)))
        .collect();
    let mut report = Reconciler::new(client).converge_each(&Entities, &nodes)?;

    let mut owners: BTreeSet<EntityId> = BTreeSet::new();
    let mut wanted: BTreeMap<AliasKey, AliasBinding> = BTreeMap::new();
    for (name, spec) in &present {
        let id = directory
            .entity(name)?
            .map(|entity| entity.id.clone())
            .ok_or_else(|| missing_after_write(name))?;
        for alias in &spec.aliases {
            let accessor = directory.accessor(alias.target()?)?;
            wanted.insert(
                AliasKey::new(&alias.name, &accessor),
                AliasBinding {
                    canonical_id: id.clone(),
                    custom_metadata: Some(alias.custom_metadata.clone()),
                },
            );
        }
        owners.insert(id);
    }

    let existing = directory.aliases_by_key()?;
    for (key, alias) in &existing {
        if owners.contains(&alias.canonical_id) && !wanted.contains_key(key) {
            delete_alias(client, alias)?;
            report.record(ALIAS_KIND, &key.to_string(), Action::Deleted);
        }
    }
    for (key, binding) in &wanted {
        let action = sync_alias(client, key, binding, existing.get(key))?;
        report.record(ALIAS_KIND, &key.to_string(), action);
    }

    let mut resolved = Params::new();
    for (name, _) in &present {
        if let Some(entity) = directory.refresh(name)? {
            resolved.insert(name.to_string(), json!(entity));
        }
    }
    report.set_output("entities", Value::Object(resolved));

    Ok(report)
}

/// Converge one entity and its aliases, leaving other entities alone.
///
/// The report carries `entity`: the resulting record, when present.
pub fn converge_entity(
    client: &dyn ResourceClient,
    name: &str,
    desired: Option<&EntitySpec>,
) -> Result<ChangeReport> {
    let mut one = Declarations::new();
    one.insert(name.to_string(), desired.cloned());

    let mut report = converge_entities(client, &one)?;
    let entity = report
        .take_output("entities")
        .and_then(|mut entities| entities.get_mut(name).map(Value::take));
    if let Some(entity) = entity {
        report.set_output("entity", entity);
    }
    Ok(report)
}

/// Converge every alias on one auth mount.
///
/// `desired` maps alias name to the entity it belongs to; entities that do
/// not exist are created empty. Aliases on the mount that are not declared
/// are deleted.
///
/// The report carries `entity_ids`: alias name to the bound entity id.
pub fn converge_mount_aliases(
    client: &dyn ResourceClient,
    mount: &str,
    desired: &BTreeMap<String, MountAliasSpec>,
) -> Result<ChangeReport> {
    validate_name("mount", mount.trim_end_matches('/'))?;
    for spec in desired.values() {
        validate_name(Entities::KIND, spec.entity_name())?;
    }

    let mut report = ChangeReport::new();
    let mut directory = Directory::new(client);
    let accessor = directory.accessor(AliasTarget::Mount(mount))?;

    let existing: BTreeMap<String, EntityAlias> = directory
        .aliases()?
        .values()
        .filter(|alias| alias.mount_accessor == accessor)
        .map(|alias| (alias.name.clone(), alias.clone()))
        .collect();

    for (name, alias) in &existing {
        if !desired.contains_key(name) {
            delete_alias(client, alias)?;
            report.record(ALIAS_KIND, &alias.key().to_string(), Action::Deleted);
        }
    }

    let mut entity_ids = Params::new();
    for (name, spec) in desired {
        let canonical_id = directory.ensure_entity(spec.entity_name(), &mut report)?;
        let key = AliasKey::new(name, &accessor);
        let binding = AliasBinding {
            canonical_id: canonical_id.clone(),
            custom_metadata: spec.custom_metadata().cloned(),
        };
        let action = sync_alias(client, &key, &binding, existing.get(name))?;
        report.record(ALIAS_KIND, &key.to_string(), action);
        entity_ids.insert(name.clone(), Value::String(canonical_id));
    }
    report.set_output("entity_ids", Value::Object(entity_ids));

    Ok(report)
}

fn converge_group_in(
    directory: &mut Directory<'_>,
    client: &dyn ResourceClient,
    name: &str,
    desired: Option<&GroupSpec>,
    report: &mut ChangeReport,
) -> Result<Option<String>> {
    let Some(spec) = desired else {
        let action = Reconciler::new(client).converge_one(&Groups, name, None)?;
        report.record(Groups.kind(), name, action);
        return Ok(None);
    };

    let mut entity_ids = Vec::with_capacity(spec.members.len());
    for member in &spec.members {
        entity_ids.push(directory.ensure_entity(member, report)?);
    }
    let group_ids = spec
        .member_groups
        .iter()
        .map(|group| directory.group_id(group))
        .collect::<Result<Vec<_>>>()?;

    let params = Groups::params(spec, &entity_ids, &group_ids);
    let action = Reconciler::new(client).converge_one(&Groups, name, Some(&params))?;
    report.record(Groups.kind(), name, action);

    directory.group_id(name).map(Some)
}

/// Converge one group, resolving member names to ids.
///
/// Member entities that do not exist are created empty; member groups must
/// already exist. The report carries the group `id` when present.
///
/// # Errors
///
/// Returns `ResolveError::UnknownGroup` for a member group that does not
/// exist.
pub fn converge_group(
    client: &dyn ResourceClient,
    name: &str,
    desired: Option<&GroupSpec>,
) -> Result<ChangeReport> {
    validate_name(Groups::KIND, name)?;

    let mut report = ChangeReport::new();
    let mut directory = Directory::new(client);
    if let Some(id) = converge_group_in(&mut directory, client, name, desired, &mut report)? {
        report.set_output("id", Value::String(id));
    }
    Ok(report)
}

/// Converge each declared group, leaving undeclared groups alone.
///
/// Groups are processed so that a declared member group exists before the
/// groups that contain it. The report carries `groups`: name to id.
pub fn converge_groups(
    client: &dyn ResourceClient,
    desired: &Declarations<GroupSpec>,
) -> Result<ChangeReport> {
    for name in desired.keys() {
        validate_name(Groups::KIND, name)?;
    }

    let mut report = ChangeReport::new();
    let mut directory = Directory::new(client);
    let mut ids = Params::new();
    for name in creation_order(desired) {
        let spec = desired.get(name).and_then(Option::as_ref);
        if let Some(id) = converge_group_in(&mut directory, client, name, spec, &mut report)? {
            ids.insert(name.to_string(), Value::String(id));
        }
    }
    report.set_output("groups", Value::Object(ids));
    Ok(report)
}

/// Declared groups ordered so that member groups come first. Cycles keep
/// their declaration order; the member lookup then reports the problem.
fn creation_order(desired: &Declarations<GroupSpec>) -> Vec<&str> {
    let mut done: BTreeSet<&str> = BTreeSet::new();
    let mut order = Vec::with_capacity(desired.len());
    let mut pending: Vec<&str> = desired.keys().map(String::as_str).collect();

    while !pending.is_empty() {
        let (ready, blocked): (Vec<&str>, Vec<&str>) = pending.into_iter().partition(|name| {
            desired
                .get(*name)
                .and_then(Option::as_ref)
                .map_or(true, |spec| {
                    spec.member_groups.iter().all(|group| {
                        group.as_str() == *name || done.contains(group.as_str()) || !desired.contains_key(group)
                    })
                })
        });
        if ready.is_empty() {
            order.extend(blocked);
            break;
        }
        done.extend(ready.iter().copied());
        order.extend(ready);
        pending = blocked;
    }
    order
}
