//! In-memory control plane.
//!
//! Serves the subset of the Vault API vaultconf touches, with enough server
//! behaviour (defaults, write-only fields, cascading deletes, 400-for-absent
//! mount reads) for reconciliation to be observed end to end.

use std::cell::RefCell;
use std::collections::BTreeMap;

use serde_json::{json, Map, Value};
use vaultconf::core::client::{Body, Method, ResourceClient};
use vaultconf::error::{ClientError, Result};

/// A recorded request.
#[derive(Debug, Clone, PartialEq)]
pub struct Call {
    pub method: Method,
    pub path: String,
    pub body: Option<Value>,
}

type Reply = (u16, Value);

fn ok(data: Value) -> Reply {
    (200, json!({ "data": data }))
}

fn no_content() -> Reply {
    (204, Value::Null)
}

fn not_found() -> Reply {
    (404, json!({ "errors": [] }))
}

fn bad_request(message: &str) -> Reply {
    (400, json!({ "errors": [message] }))
}

fn keys<I: IntoIterator<Item = String>>(keys: I) -> Reply {
    let keys: Vec<String> = keys.into_iter().collect();
    if keys.is_empty() {
        not_found()
    } else {
        ok(json!({ "keys": keys }))
    }
}

fn object(value: Option<&Value>) -> Map<String, Value> {
    value.and_then(Value::as_object).cloned().unwrap_or_default()
}

fn text(value: &Value, field: &str) -> String {
    value
        .get(field)
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string()
}

/// Mount tables list paths with a trailing slash.
fn listing(entries: &BTreeMap<String, Value>) -> Value {
    Value::Object(
        entries
            .iter()
            .map(|(path, details)| (format!("{}/", path), details.clone()))
            .collect(),
    )
}

fn merge(target: &mut Map<String, Value>, fields: &Value) {
    for (key, value) in object(Some(fields)) {
        target.insert(key, value);
    }
}

const APPROLE_DEFAULTS: &[(&str, i64)] = &[
    ("token_ttl", 0),
    ("token_max_ttl", 0),
    ("secret_id_num_uses", 0),
    ("secret_id_ttl", 0),
];

const WRITE_ONLY: &[&str] = &["oidc_client_secret", "private_key"];

const ROLE_ENDPOINTS: &[&str] = &[
    "/secret-id-accessor/lookup",
    "/secret-id-accessor/destroy",
    "/custom-secret-id",
    "/secret-id",
    "/role-id",
];

#[derive(Default)]
struct State {
    auth: BTreeMap<String, Value>,
    mounts: BTreeMap<String, Value>,
    audit: BTreeMap<String, Value>,
    policies: BTreeMap<String, String>,
    namespaces: BTreeMap<String, Map<String, Value>>,
    entities: BTreeMap<String, Value>,
    aliases: BTreeMap<String, Value>,
    groups: BTreeMap<String, Value>,
    /// Role path to accessor to secret-id metadata.
    secret_ids: BTreeMap<String, BTreeMap<String, Value>>,
    /// Everything else, keyed by path without `/v1/`.
    documents: BTreeMap<String, Value>,
    serial: u32,
}

impl State {
    fn seeded() -> Self {
        let mut state = Self::default();
        state.enable_auth("token", "token");
        for (mount, kind) in [("sys", "system"), ("identity", "identity"), ("cubbyhole", "cubbyhole")] {
            state.mounts.insert(
                mount.to_string(),
                json!({"type": kind, "description": "", "config": {}, "options": null}),
            );
        }
        for name in ["root", "default"] {
            state.policies.insert(name.to_string(), String::new());
        }
        state
    }

    fn next(&mut self, prefix: &str) -> String {
        self.serial += 1;
        format!("{}_{}", prefix, self.serial)
    }

    fn enable_auth(&mut self, mount: &str, kind: &str) -> String {
        let accessor = self.next(&format!("auth_{}", kind));
        self.auth.insert(
            mount.to_string(),
            json!({
                "type": kind,
                "description": "",
                "accessor": accessor,
                "config": {"default_lease_ttl": 0, "max_lease_ttl": 0},
            }),
        );
        accessor
    }

    fn entity_id(&self, name: &str) -> Option<String> {
        self.entities
            .iter()
            .find(|(_, entity)| entity["name"] == name)
            .map(|(id, _)| id.clone())
    }

    fn group_id(&self, name: &str) -> Option<String> {
        self.groups
            .iter()
            .find(|(_, group)| group["name"] == name)
            .map(|(id, _)| id.clone())
    }

    /// An entity with its aliases, as the read endpoint returns it.
    fn entity_view(&self, id: &str) -> Option<Value> {
        let mut entity = self.entities.get(id)?.clone();
        let aliases: Vec<Value> = self
            .aliases
            .values()
            .filter(|alias| alias["canonical_id"] == id)
            .cloned()
            .collect();
        entity["aliases"] = Value::Array(aliases);
        Some(entity)
    }

    fn route(&mut self, method: Method, path: &str, body: &Value) -> Reply {
        let Some(rest) = path.strip_prefix("/v1/") else {
            return not_found();
        };

        if rest == "auth/token/lookup-self" {
            return ok(json!({"display_name": "root", "policies": ["root"], "ttl": 0}));
        }
        if let Some(rest) = rest.strip_prefix("sys/auth") {
            return self.sys_auth(method, rest, body);
        }
        if let Some(rest) = rest.strip_prefix("sys/mounts") {
            return self.sys_mounts(method, rest, body);
        }
        if let Some(rest) = rest.strip_prefix("sys/audit") {
            return self.sys_audit(method, rest, body);
        }
        if let Some(rest) = rest.strip_prefix("sys/policy") {
            return self.sys_policy(method, rest, body);
        }
        if let Some(rest) = rest.strip_prefix("sys/namespaces") {
            return self.sys_namespaces(method, rest, body);
        }
        if let Some(rest) = rest.strip_prefix("identity/entity/name") {
            return self.entity(method, rest, body);
        }
        if let Some(rest) = rest.strip_prefix("identity/entity-alias") {
            return self.alias(method, rest, body);
        }
        if let Some(rest) = rest.strip_prefix("identity/group/name") {
            return self.group(method, rest, body);
        }
        for endpoint in ROLE_ENDPOINTS {
            if let Some(role) = rest.strip_suffix(endpoint) {
                if role.starts_with("auth/") && role.contains("/role/") {
                    return self.approle(method, role, endpoint, body);
                }
            }
        }
        if let Some(mount) = rest.strip_suffix("/config/ca") {
            if !mount.starts_with("auth/") {
                return self.ssh_ca(method, rest, body);
            }
        }
        self.document(method, rest, body)
    }

    fn sys_auth(&mut self, method: Method, rest: &str, body: &Value) -> Reply {
        let Some(mount) = rest.strip_prefix('/') else {
            return match method {
                Method::Get => ok(listing(&self.auth)),
                _ => bad_request("unsupported operation"),
            };
        };
        if let Some(mount) = mount.strip_suffix("/tune") {
            return match (method, self.auth.get_mut(mount)) {
                (Method::Post, Some(details)) => {
                    tune(details, body);
                    no_content()
                }
                _ => bad_request("no auth method at path"),
            };
        }
        match method {
            Method::Post if self.auth.contains_key(mount) => bad_request("path is already in use"),
            Method::Post => {
                let kind = text(body, "type");
                self.enable_auth(mount, &kind);
                if let Some(details) = self.auth.get_mut(mount) {
                    details["description"] = json!(text(body, "description"));
                    let mut config = object(details.get("config"));
                    merge(&mut config, body.get("config").unwrap_or(&Value::Null));
                    details["config"] = Value::Object(config);
                }
                no_content()
            }
            Method::Delete => {
                if let Some(details) = self.auth.remove(mount) {
                    let accessor = text(&details, "accessor");
                    self.aliases
                        .retain(|_, alias| alias["mount_accessor"] != accessor.as_str());
                    let prefix = format!("auth/{}/", mount);
                    self.documents.retain(|path, _| !path.starts_with(&prefix));
                    self.secret_ids.retain(|path, _| !path.starts_with(&prefix));
                }
                no_content()
            }
            _ => bad_request("unsupported operation"),
        }
    }

    fn sys_mounts(&mut self, method: Method, rest: &str, body: &Value) -> Reply {
        let Some(mount) = rest.strip_prefix('/') else {
            return match method {
                Method::Get => ok(listing(&self.mounts)),
                _ => bad_request("unsupported operation"),
            };
        };
        if let Some(mount) = mount.strip_suffix("/tune") {
            return match (method, self.mounts.get_mut(mount)) {
                (Method::Post, Some(details)) => {
                    tune(details, body);
                    no_content()
                }
                _ => bad_request("no secrets engine at path"),
            };
        }
        match method {
            Method::Get => match self.mounts.get(mount) {
                Some(details) => ok(details.clone()),
                None => bad_request("no mount at path"),
            },
            Method::Post if self.mounts.contains_key(mount) => bad_request("path is already in use"),
            Method::Post => {
                let accessor = self.next(&text(body, "type"));
                let options = body.get("options").cloned().unwrap_or(Value::Null);
                self.mounts.insert(
                    mount.to_string(),
                    json!({
                        "type": text(body, "type"),
                        "description": text(body, "description"),
                        "accessor": accessor,
                        "config": object(body.get("config")),
                        "options": options,
                    }),
                );
                no_content()
            }
            Method::Delete => {
                self.mounts.remove(mount);
                let prefix = format!("{}/", mount);
                self.documents.retain(|path, _| !path.starts_with(&prefix));
                no_content()
            }
            _ => bad_request("unsupported operation"),
        }
    }

    fn sys_audit(&mut self, method: Method, rest: &str, body: &Value) -> Reply {
        let Some(path) = rest.strip_prefix('/') else {
            return match method {
                Method::Get => ok(listing(&self.audit)),
                _ => bad_request("unsupported operation"),
            };
        };
        match method {
            Method::Post if self.audit.contains_key(path) => bad_request("path already in use"),
            Method::Post => {
                self.audit.insert(
                    path.to_string(),
                    json!({
                        "type": text(body, "type"),
                        "description": text(body, "description"),
                        "options": object(body.get("options")),
                        "path": format!("{}/", path),
                    }),
                );
                no_content()
            }
            Method::Delete => {
                self.audit.remove(path);
                no_content()
            }
            _ => bad_request("unsupported operation"),
        }
    }

    fn sys_policy(&mut self, method: Method, rest: &str, body: &Value) -> Reply {
        let Some(name) = rest.strip_prefix('/') else {
            let names: Vec<&String> = self.policies.keys().collect();
            return ok(json!({ "keys": names, "policies": names }));
        };
        match method {
            Method::Get => match self.policies.get(name) {
                Some(rules) => ok(json!({ "name": name, "rules": rules })),
                None => not_found(),
            },
            Method::Post => {
                self.policies.insert(name.to_string(), text(body, "policy"));
                no_content()
            }
            Method::Delete if name == "root" || name == "default" => {
                bad_request("cannot delete built-in policy")
            }
            Method::Delete => {
                self.policies.remove(name);
                no_content()
            }
            _ => bad_request("unsupported operation"),
        }
    }

    fn sys_namespaces(&mut self, method: Method, rest: &str, body: &Value) -> Reply {
        let Some(name) = rest.strip_prefix('/') else {
            return keys(self.namespaces.keys().map(|name| format!("{}/", name)));
        };
        match method {
            Method::Get => match self.namespaces.get(name) {
                Some(metadata) => ok(json!({
                    "path": format!("{}/", name),
                    "custom_metadata": metadata,
                })),
                None => not_found(),
            },
            Method::Post => {
                self.namespaces
                    .insert(name.to_string(), object(body.get("custom_metadata")));
                no_content()
            }
            Method::Patch => match self.namespaces.get_mut(name) {
                Some(metadata) => {
                    for (key, value) in object(body.get("custom_metadata")) {
                        if value.is_null() {
                            metadata.remove(&key);
                        } else {
                            metadata.insert(key, value);
                        }
                    }
                    no_content()
                }
                None => not_found(),
            },
            Method::Delete => {
                self.namespaces.remove(name);
                no_content()
            }
            _ => bad_request("unsupported operation"),
        }
    }

    fn entity(&mut self, method: Method, rest: &str, body: &Value) -> Reply {
        let Some(name) = rest.strip_prefix('/') else {
            return keys(self.entities.values().map(|entity| text(entity, "name")));
        };
        let existing = self.entity_id(name);
        match (method, existing) {
            (Method::Get, Some(id)) => self.entity_view(&id).map_or_else(not_found, ok),
            (Method::Get, None) => not_found(),
            (Method::Post, Some(id)) => {
                if let Some(entity) = self.entities.get_mut(&id).and_then(Value::as_object_mut) {
                    merge(entity, body);
                }
                no_content()
            }
            (Method::Post, None) => {
                let id = self.next("entity");
                self.entities.insert(
                    id.clone(),
                    json!({
                        "id": id,
                        "name": name,
                        "metadata": object(body.get("metadata")),
                        "policies": body.get("policies").cloned().unwrap_or(json!([])),
                        "disabled": body.get("disabled").cloned().unwrap_or(json!(false)),
                    }),
                );
                ok(json!({ "id": id, "name": name }))
            }
            (Method::Delete, Some(id)) => {
                self.entities.remove(&id);
                self.aliases.retain(|_, alias| alias["canonical_id"] != id.as_str());
                for group in self.groups.values_mut() {
                    if let Some(members) = group["member_entity_ids"].as_array_mut() {
                        members.retain(|member| member != id.as_str());
                    }
                }
                no_content()
            }
            (Method::Delete, None) => no_content(),
            _ => bad_request("unsupported operation"),
        }
    }

    fn alias(&mut self, method: Method, rest: &str, body: &Value) -> Reply {
        match (method, rest) {
            (Method::Post, "") => {
                let canonical_id = text(body, "canonical_id");
                let accessor = text(body, "mount_accessor");
                let name = text(body, "name");
                if !self.entities.contains_key(&canonical_id) {
                    return bad_request("invalid canonical id");
                }
                if !self.auth.values().any(|mount| mount["accessor"] == accessor.as_str()) {
                    return bad_request("invalid mount accessor");
                }
                if self.aliases.values().any(|alias| {
                    alias["name"] == name.as_str() && alias["mount_accessor"] == accessor.as_str()
                }) {
                    return bad_request("combination of mount and alias name is already in use");
                }
                let id = self.next("alias");
                self.aliases.insert(
                    id.clone(),
                    json!({
                        "id": id,
                        "name": name,
                        "mount_accessor": accessor,
                        "canonical_id": canonical_id,
                        "custom_metadata": object(body.get("custom_metadata")),
                    }),
                );
                ok(json!({ "id": id, "canonical_id": canonical_id }))
            }
            (Method::List, "/id") => {
                if self.aliases.is_empty() {
                    return not_found();
                }
                let info: Map<String, Value> = self
                    .aliases
                    .iter()
                    .map(|(id, alias)| {
                        let mut alias = alias.clone();
                        if let Some(alias) = alias.as_object_mut() {
                            alias.remove("id");
                        }
                        (id.clone(), alias)
                    })
                    .collect();
                let ids: Vec<&String> = self.aliases.keys().collect();
                ok(json!({ "keys": ids, "key_info": info }))
            }
            (method, rest) => {
                let Some(id) = rest.strip_prefix("/id/") else {
                    return not_found();
                };
                match method {
                    Method::Get => self.aliases.get(id).cloned().map_or_else(not_found, ok),
                    Method::Post => match self.aliases.get_mut(id).and_then(Value::as_object_mut) {
                        Some(alias) => {
                            merge(alias, body);
                            no_content()
                        }
                        None => bad_request("alias not found"),
                    },
                    Method::Delete => {
                        self.aliases.remove(id);
                        no_content()
                    }
                    _ => bad_request("unsupported operation"),
                }
            }
        }
    }

    fn group(&mut self, method: Method, rest: &str, body: &Value) -> Reply {
        let Some(name) = rest.strip_prefix('/') else {
            return keys(self.groups.values().map(|group| text(group, "name")));
        };
        let existing = self.group_id(name);
        match (method, existing) {
            (Method::Get, Some(id)) => self.groups.get(&id).cloned().map_or_else(not_found, ok),
            (Method::Get, None) => not_found(),
            (Method::Post, Some(id)) => {
                if let Some(group) = self.groups.get_mut(&id).and_then(Value::as_object_mut) {
                    merge(group, body);
                }
                no_content()
            }
            (Method::Post, None) => {
                let id = self.next("group");
                let mut group = json!({
                    "id": id,
                    "name": name,
                    "type": "internal",
                    "metadata": {},
                    "policies": [],
                    "member_entity_ids": [],
                    "member_group_ids": [],
                });
                if let Some(group) = group.as_object_mut() {
                    merge(group, body);
                }
                self.groups.insert(id.clone(), group);
                ok(json!({ "id": id, "name": name }))
            }
            (Method::Delete, Some(id)) => {
                self.groups.remove(&id);
                no_content()
            }
            (Method::Delete, None) => no_content(),
            _ => bad_request("unsupported operation"),
        }
    }

    fn approle(&mut self, method: Method, role: &str, endpoint: &str, body: &Value) -> Reply {
        if !self.documents.contains_key(role) {
            return bad_request("role not found");
        }
        match (method, endpoint) {
            (Method::Get, "/role-id") => {
                let name = role.rsplit('/').next().unwrap_or_default();
                ok(json!({ "role_id": format!("role-id-{}", name) }))
            }
            (Method::Post, "/secret-id") | (Method::Post, "/custom-secret-id") => {
                let metadata = match body.get("metadata") {
                    Some(Value::String(encoded)) => {
                        serde_json::from_str(encoded).unwrap_or_else(|_| json!({}))
                    }
                    Some(Value::Object(map)) => Value::Object(map.clone()),
                    _ => json!({}),
                };
                let secret_id = match body.get("secret_id").and_then(Value::as_str) {
                    Some(secret_id) => secret_id.to_string(),
                    None => self.next("secret"),
                };
                let accessor = self.next("accessor");
                self.secret_ids
                    .entry(role.to_string())
                    .or_default()
                    .insert(accessor.clone(), metadata);
                ok(json!({ "secret_id": secret_id, "secret_id_accessor": accessor }))
            }
            (Method::List, "/secret-id") => keys(
                self.secret_ids
                    .get(role)
                    .map(|issued| issued.keys().cloned().collect::<Vec<_>>())
                    .unwrap_or_default(),
            ),
            (Method::Post, "/secret-id-accessor/lookup") => {
                let accessor = text(body, "secret_id_accessor");
                match self.secret_ids.get(role).and_then(|issued| issued.get(&accessor)) {
                    Some(metadata) => ok(json!({
                        "metadata": metadata,
                        "secret_id_accessor": accessor,
                    })),
                    None => not_found(),
                }
            }
            (Method::Post, "/secret-id-accessor/destroy") => {
                let accessor = text(body, "secret_id_accessor");
                if let Some(issued) = self.secret_ids.get_mut(role) {
                    issued.remove(&accessor);
                }
                no_content()
            }
            _ => bad_request("unsupported operation"),
        }
    }

    fn ssh_ca(&mut self, method: Method, path: &str, body: &Value) -> Reply {
        match method {
            Method::Get => match self.documents.get(path) {
                Some(ca) => ok(ca.clone()),
                None => bad_request("keys haven't been configured yet"),
            },
            Method::Post if self.documents.contains_key(path) => {
                bad_request("keys are already configured")
            }
            Method::Post => {
                let public_key = match body.get("public_key").and_then(Value::as_str) {
                    Some(key) => key.to_string(),
                    None => format!("ssh-ed25519 {}", self.next("generated")),
                };
                self.documents
                    .insert(path.to_string(), json!({ "public_key": public_key }));
                no_content()
            }
            Method::Delete => {
                self.documents.remove(path);
                no_content()
            }
            _ => bad_request("unsupported operation"),
        }
    }

    /// Defaults the server fills in for a document at `path`.
    fn defaults(&self, path: &str) -> Map<String, Value> {
        let mut defaults = Map::new();
        let mut segments = path.split('/');
        if let (Some("auth"), Some(mount), Some("role")) =
            (segments.next(), segments.next(), segments.next())
        {
            if self.auth.get(mount).is_some_and(|m| m["type"] == "approle") {
                for (field, value) in APPROLE_DEFAULTS {
                    defaults.insert(field.to_string(), json!(value));
                }
            }
        }
        defaults
    }

    fn document(&mut self, method: Method, path: &str, body: &Value) -> Reply {
        match method {
            Method::List => {
                let prefix = format!("{}/", path);
                keys(
                    self.documents
                        .keys()
                        .filter_map(|key| key.strip_prefix(&prefix))
                        .filter(|child| !child.contains('/'))
                        .map(str::to_string)
                        .collect::<Vec<_>>(),
                )
            }
            Method::Get => self.documents.get(path).cloned().map_or_else(not_found, ok),
            Method::Post => {
                let mut document = match self.documents.get(path) {
                    Some(existing) => object(Some(existing)),
                    None => self.defaults(path),
                };
                merge(&mut document, body);
                for field in WRITE_ONLY {
                    document.remove(*field);
                }
                self.documents
                    .insert(path.to_string(), Value::Object(document));
                no_content()
            }
            Method::Delete => {
                let prefix = format!("{}/", path);
                self.documents
                    .retain(|key, _| key != path && !key.starts_with(&prefix));
                self.secret_ids.remove(path);
                no_content()
            }
            Method::Patch => bad_request("unsupported operation"),
        }
    }
}

/// Apply a tune request: `description` at the top level, the rest into
/// `config`.
fn tune(details: &mut Value, body: &Value) {
    let mut config = object(details.get("config"));
    for (key, value) in object(Some(body)) {
        if key == "description" {
            details["description"] = value;
        } else {
            config.insert(key, value);
        }
    }
    details["config"] = Value::Object(config);
}

/// A stateful fake Vault implementing [`ResourceClient`].
///
/// Starts with the built-in token auth method, the `sys`, `identity` and
/// `cubbyhole` mounts, and the `root` and `default` policies.
pub struct FakeVault {
    state: RefCell<State>,
    calls: RefCell<Vec<Call>>,
}

impl Default for FakeVault {
    fn default() -> Self {
        Self::new()
    }
}

impl FakeVault {
    pub fn new() -> Self {
        Self {
            state: RefCell::new(State::seeded()),
            calls: RefCell::new(Vec::new()),
        }
    }

    /// All requests issued so far.
    pub fn calls(&self) -> Vec<Call> {
        self.calls.borrow().clone()
    }

    /// Mutating requests issued so far, as `METHOD path` strings.
    pub fn writes(&self) -> Vec<String> {
        self.calls
            .borrow()
            .iter()
            .filter(|call| call.method.is_mutating())
            .map(|call| format!("{} {}", call.method, call.path))
            .collect()
    }

    /// Body of the last request to `method path`.
    pub fn last_body(&self, method: Method, path: &str) -> Option<Value> {
        self.calls
            .borrow()
            .iter()
            .rev()
            .find(|call| call.method == method && call.path == path)
            .and_then(|call| call.body.clone())
    }

    /// Forget recorded requests, keeping server state.
    pub fn reset_calls(&self) {
        self.calls.borrow_mut().clear();
    }

    /// Enable an auth method directly, returning its accessor.
    pub fn enable_auth(&self, mount: &str, kind: &str) -> String {
        self.state.borrow_mut().enable_auth(mount, kind)
    }

    /// Store a document directly, e.g. an existing role.
    pub fn put(&self, path: &str, document: Value) {
        let path = path.trim_start_matches("/v1/");
        self.state
            .borrow_mut()
            .documents
            .insert(path.to_string(), document);
    }

    pub fn put_namespace(&self, name: &str, metadata: Value) {
        self.state
            .borrow_mut()
            .namespaces
            .insert(name.to_string(), object(Some(&metadata)));
    }

    /// Create an entity directly, returning its id.
    pub fn put_entity(&self, name: &str) -> String {
        let mut state = self.state.borrow_mut();
        let id = state.next("entity");
        state.entities.insert(
            id.clone(),
            json!({"id": id, "name": name, "metadata": {}, "policies": [], "disabled": false}),
        );
        id
    }

    /// Create an alias directly, returning its id.
    pub fn put_alias(&self, name: &str, accessor: &str, canonical_id: &str) -> String {
        let mut state = self.state.borrow_mut();
        let id = state.next("alias");
        state.aliases.insert(
            id.clone(),
            json!({
                "id": id,
                "name": name,
                "mount_accessor": accessor,
                "canonical_id": canonical_id,
                "custom_metadata": {},
            }),
        );
        id
    }

    /// Issue a secret-id directly, returning its accessor.
    pub fn issue_secret_id(&self, mount: &str, role: &str, metadata: Value) -> String {
        let mut state = self.state.borrow_mut();
        let accessor = state.next("accessor");
        state
            .secret_ids
            .entry(format!("auth/{}/role/{}", mount, role))
            .or_default()
            .insert(accessor.clone(), metadata);
        accessor
    }

    /// Metadata of every live secret-id of a role.
    pub fn secret_ids(&self, mount: &str, role: &str) -> Vec<Value> {
        self.state
            .borrow()
            .secret_ids
            .get(&format!("auth/{}/role/{}", mount, role))
            .map(|issued| issued.values().cloned().collect())
            .unwrap_or_default()
    }

    pub fn document(&self, path: &str) -> Option<Value> {
        let path = path.trim_start_matches("/v1/");
        self.state.borrow().documents.get(path).cloned()
    }

    pub fn auth_mount(&self, mount: &str) -> Option<Value> {
        self.state.borrow().auth.get(mount).cloned()
    }

    pub fn secrets_mount(&self, mount: &str) -> Option<Value> {
        self.state.borrow().mounts.get(mount).cloned()
    }

    pub fn audit_device(&self, path: &str) -> Option<Value> {
        self.state.borrow().audit.get(path).cloned()
    }

    pub fn policy(&self, name: &str) -> Option<String> {
        self.state.borrow().policies.get(name).cloned()
    }

    pub fn namespace(&self, name: &str) -> Option<Value> {
        self.state
            .borrow()
            .namespaces
            .get(name)
            .map(|metadata| Value::Object(metadata.clone()))
    }

    /// An entity with its aliases, by name.
    pub fn entity(&self, name: &str) -> Option<Value> {
        let state = self.state.borrow();
        state.entity_id(name).and_then(|id| state.entity_view(&id))
    }

    pub fn entity_count(&self) -> usize {
        self.state.borrow().entities.len()
    }

    /// Every alias in the store.
    pub fn aliases(&self) -> Vec<Value> {
        self.state.borrow().aliases.values().cloned().collect()
    }

    pub fn group(&self, name: &str) -> Option<Value> {
        let state = self.state.borrow();
        state
            .group_id(name)
            .and_then(|id| state.groups.get(&id).cloned())
    }
}

impl ResourceClient for FakeVault {
    fn request(
        &self,
        method: Method,
        path: &str,
        body: Option<&Value>,
        expected: &[u16],
    ) -> Result<Body> {
        self.calls.borrow_mut().push(Call {
            method,
            path: path.to_string(),
            body: body.cloned(),
        });

        let (status, response) =
            self.state
                .borrow_mut()
                .route(method, path, body.unwrap_or(&Value::Null));

        if !expected.contains(&status) {
            return Err(ClientError::UnexpectedStatus {
                method,
                path: path.to_string(),
                status,
                expected: expected.to_vec(),
                request: body.cloned(),
                response: response.to_string(),
            }
            .into());
        }

        Ok(match (status, response) {
            (204, _) | (_, Value::Null) => Body::Empty,
            (_, value) => Body::Json(value),
        })
    }
}
