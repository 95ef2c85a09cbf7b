//! Scripted client for unit tests.

use std::cell::RefCell;
use std::collections::{HashMap, VecDeque};

use serde_json::{json, Value};

use super::{Body, Method, ResourceClient};
use crate::error::{ClientError, Result};

/// A recorded request.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Call {
    pub method: Method,
    pub path: String,
    pub body: Option<Value>,
}

/// Replays canned responses keyed by method and path.
///
/// Unscripted reads answer 404; unscripted writes answer 204.
#[derive(Default)]
pub(crate) struct Scripted {
    responses: RefCell<HashMap<(Method, String), VecDeque<(u16, Value)>>>,
    calls: RefCell<Vec<Call>>,
}

impl Scripted {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a response for `method path`.
    pub fn on(self, method: Method, path: &str, status: u16, body: Value) -> Self {
        self.responses
            .borrow_mut()
            .entry((method, path.to_string()))
            .or_default()
            .push_back((status, body));
        self
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
            .filter(|c| c.method.is_mutating())
            .map(|c| format!("{} {}", c.method, c.path))
            .collect()
    }
}

impl ResourceClient for Scripted {
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

        let scripted = self
            .responses
            .borrow_mut()
            .get_mut(&(method, path.to_string()))
            .and_then(VecDeque::pop_front);
        let (status, response) = scripted.unwrap_or_else(|| match method {
            Method::Get | Method::List => (404, json!({"errors": []})),
            _ => (204, Value::Null),
        });

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
