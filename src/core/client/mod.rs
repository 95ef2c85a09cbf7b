//! Control-plane request abstraction.
//!
//! Every component talks to Vault through the [`ResourceClient`] trait so the
//! reconciliation logic never depends on the transport.
//!
//! ## Implementations
//!
//! - [`HttpClient`]: blocking HTTP client (reqwest) used by the CLI.
//!
//! ## Adding a New Client
//!
//! 1. Implement `ResourceClient::request`
//! 2. Map connection problems to `ClientError::Transport`
//! 3. Reject statuses outside `expected` with `ClientError::UnexpectedStatus`

use std::collections::BTreeMap;
use std::fmt;

use serde_json::Value;

use crate::core::constants::{OK, OK_OR_NOT_FOUND};
use crate::error::{ClientError, Result};

mod http;

#[cfg(test)]
pub(crate) mod mock;

pub use http::HttpClient;

/// Request verbs understood by the control plane.
///
/// `List` is Vault's directory-style enumeration verb, distinct from `Get`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Method {
    Get,
    List,
    Post,
    Patch,
    Delete,
}

impl Method {
    /// Wire name of the verb.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Get => "GET",
            Self::List => "LIST",
            Self::Post => "POST",
            Self::Patch => "PATCH",
            Self::Delete => "DELETE",
        }
    }

    /// Whether the verb can modify server state.
    pub fn is_mutating(&self) -> bool {
        matches!(self, Self::Post | Self::Patch | Self::Delete)
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A decoded response body.
#[derive(Debug, Clone, PartialEq)]
pub enum Body {
    /// 204 or no content.
    Empty,
    /// A JSON document.
    Json(Value),
    /// Any other content, returned verbatim.
    Raw(String),
}

impl Body {
    /// The JSON document, if the body was JSON.
    pub fn json(&self) -> Option<&Value> {
        match self {
            Self::Json(value) => Some(value),
            _ => None,
        }
    }

    /// The `data` envelope of a JSON body, if present and not null.
    pub fn data(&self) -> Option<&Value> {
        self.json()?.get("data").filter(|data| !data.is_null())
    }

    /// Consume the body, returning the `data` envelope.
    pub fn into_data(self) -> Option<Value> {
        match self {
            Self::Json(Value::Object(mut map)) => map.remove("data").filter(|data| !data.is_null()),
            _ => None,
        }
    }
}

/// Request/response access to the control plane's administrative API.
///
/// Paths are rooted at `/v1/`. Implementations fail with
/// `ClientError::Transport` when the server cannot be reached and with
/// `ClientError::UnexpectedStatus` when the status is not in `expected`.
pub trait ResourceClient {
    /// Issue one request and decode its body.
    ///
    /// # Arguments
    ///
    /// * `method` - Request verb
    /// * `path` - API path, e.g. `/v1/sys/auth`
    /// * `body` - JSON payload, if any
    /// * `expected` - Statuses accepted as success
    ///
    /// # Errors
    ///
    /// Returns `ClientError` on transport failure or an unexpected status.
    fn request(
        &self,
        method: Method,
        path: &str,
        body: Option<&Value>,
        expected: &[u16],
    ) -> Result<Body>;

    /// GET a path that must exist.
    fn get(&self, path: &str) -> Result<Body> {
        self.request(Method::Get, path, None, OK)
    }

    /// GET a path whose absence is signalled by 404, returning its `data`.
    fn read(&self, path: &str) -> Result<Option<Value>> {
        self.read_with(path, OK_OR_NOT_FOUND)
    }

    /// GET a path with a custom status set, returning its `data`.
    ///
    /// Some system endpoints signal absence with 400 rather than 404.
    fn read_with(&self, path: &str, expected: &[u16]) -> Result<Option<Value>> {
        Ok(self
            .request(Method::Get, path, None, expected)?
            .into_data())
    }

    /// LIST a directory-style endpoint, returning `data.keys`.
    ///
    /// A missing directory lists as empty.
    fn list(&self, path: &str) -> Result<Vec<String>> {
        let body = self.request(Method::List, path, None, OK_OR_NOT_FOUND)?;
        Ok(body
            .data()
            .and_then(|data| data.get("keys"))
            .and_then(Value::as_array)
            .map(|keys| {
                keys.iter()
                    .filter_map(Value::as_str)
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default())
    }

    /// LIST a key-info endpoint, returning `data.key_info`.
    fn list_key_info(&self, path: &str) -> Result<BTreeMap<String, Value>> {
        let body = self.request(Method::List, path, None, OK_OR_NOT_FOUND)?;
        Ok(body
            .data()
            .and_then(|data| data.get("key_info"))
            .and_then(Value::as_object)
            .map(|info| {
                info.iter()
                    .map(|(key, value)| (key.clone(), value.clone()))
                    .collect()
            })
            .unwrap_or_default())
    }

    /// POST a JSON payload.
    fn post(&self, path: &str, body: &Value) -> Result<Body> {
        self.request(Method::Post, path, Some(body), OK)
    }

    /// PATCH a JSON merge-patch payload.
    fn patch(&self, path: &str, body: &Value) -> Result<Body> {
        self.request(Method::Patch, path, Some(body), OK)
    }

    /// DELETE a path.
    fn delete(&self, path: &str) -> Result<Body> {
        self.request(Method::Delete, path, None, OK)
    }
}

/// Extract a required string field from a response's `data`.
///
/// # Errors
///
/// Returns `ClientError::MalformedResponse` if the field is missing.
pub fn required_str(data: &Value, path: &str, field: &str) -> Result<String> {
    data.get(field)
        .and_then(Value::as_str)
        .map(str::to_string)
        .ok_or_else(|| {
            ClientError::MalformedResponse {
                path: path.to_string(),
                reason: format!("missing '{}'", field),
            }
            .into()
        })
}

/// Extract a response's `data`, failing if it is absent.
///
/// # Errors
///
/// Returns `ClientError::MalformedResponse` if there is no `data` envelope.
pub fn required_data(body: Body, path: &str) -> Result<Value> {
    body.into_data().ok_or_else(|| {
        ClientError::MalformedResponse {
            path: path.to_string(),
            reason: "missing 'data'".to_string(),
        }
        .into()
    })
}
