//! Error types.
//!
//! Every fallible operation returns [`Result`]. Errors are grouped by the
//! concern that raised them and wrapped by the top-level [`Error`].

use thiserror::Error;

use crate::core::client::Method;

/// Top-level error.
#[derive(Error, Debug)]
pub enum Error {
    #[error(transparent)]
    Client(#[from] ClientError),

    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Resolve(#[from] ResolveError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("failed to render report: {0}")]
    Render(#[source] serde_json::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// Failures talking to the control plane.
#[derive(Error, Debug)]
pub enum ClientError {
    /// The connection could not be established or the exchange was cut short.
    #[error("{method} {path}: transport failure: {reason}")]
    Transport {
        method: Method,
        path: String,
        reason: String,
    },

    /// The response status was not one the operation accepts.
    #[error("{method} {path}: got {status} status, expected {expected:?}: {response}")]
    UnexpectedStatus {
        method: Method,
        path: String,
        status: u16,
        expected: Vec<u16>,
        request: Option<serde_json::Value>,
        response: String,
    },

    /// A response lacked a field needed to continue.
    #[error("malformed response from {path}: {reason}")]
    MalformedResponse { path: String, reason: String },

    #[error("invalid CA certificate: {0}")]
    InvalidCa(String),

    #[error("failed to build HTTP client: {0}")]
    Build(String),
}

/// Caller input that contradicts itself. Raised before any request is made.
#[derive(Error, Debug)]
pub enum ValidationError {
    #[error("either mount or type must be specified")]
    MissingMountOrType,

    #[error("'policy' must be specified when policy '{name}' is present")]
    MissingPolicy { name: String },

    #[error("invalid secret-id metadata: {reason}")]
    InvalidMetadata { reason: String },

    #[error("invalid {kind} name '{name}'")]
    InvalidName { kind: &'static str, name: String },

    #[error("alias '{name}' needs either auth_mount or mount_accessor")]
    MissingAliasMount { name: String },

    #[error("alias '{name}' is declared on both '{first}' and '{second}'")]
    DuplicateAlias {
        name: String,
        first: String,
        second: String,
    },

    #[error("{kind} cannot be deleted, only overwritten")]
    Undeletable { kind: &'static str },
}

/// Identity-graph references that could not be resolved.
#[derive(Error, Debug)]
pub enum ResolveError {
    #[error("group not found: {0}")]
    UnknownGroup(String),

    #[error("no auth method mounted at '{0}'")]
    UnknownAuthMount(String),
}

/// Boundary configuration problems.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("no vault token: set VAULT_TOKEN, pass --token or log in first")]
    MissingToken,

    #[error("failed to read {path}: {source}")]
    ReadFile {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("manifest parse error: {0}")]
    ParseToml(#[from] toml::de::Error),

    #[error("manifest parse error: {0}")]
    ParseJson(#[from] serde_json::Error),

    #[error("unsupported manifest format '{0}' (expected .toml or .json)")]
    UnsupportedFormat(String),
}

pub type Result<T> = std::result::Result<T, Error>;
