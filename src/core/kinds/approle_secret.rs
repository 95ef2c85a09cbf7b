//! AppRole secret-ids.
//!
//! Secret-ids cannot be read back, so they are not diffed. Instead a mode
//! decides which existing secret-ids are destroyed and whether a new one is
//! issued:
//!
//! | State      | Destroys                                   | Creates |
//! |------------|--------------------------------------------|---------|
//! | `present`  | nothing                                    | yes     |
//! | `replaced` | secret-ids whose metadata equals declared  | yes     |
//! | `singular` | every secret-id of the role                | yes     |
//! | `absent`   | matching ones, or all if no metadata given | no      |

use serde::Deserialize;
use serde_json::{json, Value};
use tracing::{debug, info};

use super::validate_name;
use crate::core::client::{required_data, required_str, Method, ResourceClient};
use crate::core::constants::{DEFAULT_APPROLE_MOUNT, OK_OR_NOT_FOUND};
use crate::core::reconcile::{Action, ChangeReport};
use crate::core::types::Params;
use crate::error::{Result, ValidationError};

const KIND: &str = "approle secret-id";

/// How existing secret-ids are treated.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SecretIdState {
    #[default]
    Present,
    Replaced,
    Singular,
    Absent,
}

/// A declared secret-id for one AppRole role.
#[derive(Debug, Clone, Deserialize)]
pub struct SecretIdRequest {
    /// AppRole auth mount.
    #[serde(default = "default_mount")]
    pub mount: String,
    /// Role the secret-id is issued under.
    pub approle_name: String,
    /// Caller-chosen secret-id. Vault generates one when omitted.
    #[serde(default)]
    pub secret_id: Option<String>,
    /// Secret-id parameters. `metadata` may be a mapping or a JSON string.
    #[serde(default)]
    pub parameters: Params,
    #[serde(default)]
    pub state: SecretIdState,
}

fn default_mount() -> String {
    DEFAULT_APPROLE_MOUNT.to_string()
}

impl SecretIdRequest {
    /// A request for `approle_name` on the default mount.
    pub fn new(approle_name: impl Into<String>, state: SecretIdState) -> Self {
        Self {
            mount: default_mount(),
            approle_name: approle_name.into(),
            secret_id: None,
            parameters: Params::new(),
            state,
        }
    }

    /// Set the declared metadata.
    pub fn with_metadata(mut self, metadata: Value) -> Self {
        self.parameters.insert("metadata".to_string(), metadata);
        self
    }

    fn role_path(&self, suffix: &str) -> String {
        format!("/v1/auth/{}/role/{}/{}", self.mount, self.approle_name, suffix)
    }
}

/// The declared metadata as a mapping, or `None` when not declared.
///
/// # Errors
///
/// Returns `ValidationError::InvalidMetadata` if the value is neither a
/// mapping nor a JSON string encoding one.
pub fn declared_metadata(parameters: &Params) -> Result<Option<Value>> {
    let invalid = |reason: String| ValidationError::InvalidMetadata { reason };
    match parameters.get("metadata") {
        None => Ok(None),
        Some(Value::Object(map)) => Ok(Some(Value::Object(map.clone()))),
        Some(Value::String(text)) => match serde_json::from_str::<Value>(text) {
            Ok(value @ Value::Object(_)) => Ok(Some(value)),
            Ok(_) => Err(invalid("JSON string must encode an object".to_string()).into()),
            Err(e) => Err(invalid(e.to_string()).into()),
        },
        Some(_) => Err(invalid("must be a mapping or a JSON string".to_string()).into()),
    }
}

/// Whether an existing secret-id with `existing` metadata is destroyed.
pub fn should_destroy(state: SecretIdState, declared: Option<&Value>, existing: &Value) -> bool {
    let empty = json!({});
    let matches = existing == declared.unwrap_or(&empty);
    match state {
        SecretIdState::Present => false,
        SecretIdState::Singular => true,
        SecretIdState::Replaced => matches,
        SecretIdState::Absent => declared.is_none() || matches,
    }
}

/// Apply a secret-id declaration.
///
/// Unless the state is `absent`, the report carries `secret_id` and
/// `secret_id_accessor` of the newly issued secret-id.
///
/// # Errors
///
/// Metadata is validated before any request is made.
pub fn converge_secret_id(
    client: &dyn ResourceClient,
    request: &SecretIdRequest,
) -> Result<ChangeReport> {
    validate_name("mount", &request.mount)?;
    validate_name("approle role", &request.approle_name)?;
    let metadata = declared_metadata(&request.parameters)?;

    let mut report = ChangeReport::new();

    if request.state != SecretIdState::Present {
        destroy_matching(client, request, metadata.as_ref(), &mut report)?;
    }

    if request.state != SecretIdState::Absent {
        let mut payload = request.parameters.clone();
        if let Some(metadata) = &metadata {
            // The creation API takes metadata as a JSON-encoded string.
            payload.insert("metadata".to_string(), Value::String(metadata.to_string()));
        }

        let path = match &request.secret_id {
            Some(secret_id) => {
                payload.insert("secret_id".to_string(), Value::String(secret_id.clone()));
                request.role_path("custom-secret-id")
            }
            None => request.role_path("secret-id"),
        };

        let data = required_data(client.post(&path, &Value::Object(payload))?, &path)?;
        let secret_id = required_str(&data, &path, "secret_id")?;
        let accessor = required_str(&data, &path, "secret_id_accessor")?;

        info!(role = %request.approle_name, accessor = %accessor, "issued secret-id");
        report.record(KIND, &request.approle_name, Action::Created);
        report.set_output("secret_id", Value::String(secret_id));
        report.set_output("secret_id_accessor", Value::String(accessor));
    }

    Ok(report)
}

fn destroy_matching(
    client: &dyn ResourceClient,
    request: &SecretIdRequest,
    declared: Option<&Value>,
    report: &mut ChangeReport,
) -> Result<()> {
    let accessors = client.list(&request.role_path("secret-id"))?;
    let lookup = request.role_path("secret-id-accessor/lookup");
    let destroy = request.role_path("secret-id-accessor/destroy");

    for accessor in accessors {
        let body = json!({ "secret_id_accessor": accessor });
        let existing = client
            .request(Method::Post, &lookup, Some(&body), OK_OR_NOT_FOUND)?
            .into_data();
        let Some(existing) = existing else {
            debug!(accessor = %accessor, "secret-id already gone");
            continue;
        };

        let existing_metadata = existing.get("metadata").cloned().unwrap_or_else(|| json!({}));
        if should_destroy(request.state, declared, &existing_metadata) {
            client.post(&destroy, &body)?;
            info!(role = %request.approle_name, accessor = %accessor, "destroyed secret-id");
            report.record(KIND, &accessor, Action::Deleted);
        }
    }
    Ok(())
}
