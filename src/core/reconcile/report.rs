//! Reconciliation results.

use std::fmt;

use serde::Serialize;
use serde_json::Value;

use crate::core::types::Params;

/// What reconciliation did to one resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Action {
    /// Live state already satisfied the declaration.
    Unchanged,
    /// The resource did not exist and was created.
    Created,
    /// The resource was modified in place.
    Updated,
    /// The resource was deleted and created again.
    Recreated,
    /// The resource was deleted.
    Deleted,
}

impl Action {
    /// Whether the action modified server state.
    pub fn is_change(&self) -> bool {
        !matches!(self, Self::Unchanged)
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Unchanged => "unchanged",
            Self::Created => "created",
            Self::Updated => "updated",
            Self::Recreated => "recreated",
            Self::Deleted => "deleted",
        };
        f.write_str(name)
    }
}

/// One applied change.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Change {
    pub kind: &'static str,
    pub key: String,
    pub action: Action,
}

/// Aggregated outcome of a reconciliation run.
///
/// Serializes as `{"changed": bool, "changes": [...], ...outputs}` where the
/// outputs are kind-specific values such as role IDs or mount accessors.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ChangeReport {
    pub changed: bool,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    changes: Vec<Change>,
    #[serde(flatten)]
    outputs: Params,
}

impl ChangeReport {
    /// An empty, unchanged report.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record the action taken on a resource.
    pub fn record(&mut self, kind: &'static str, key: &str, action: Action) {
        if action.is_change() {
            self.changed = true;
            self.changes.push(Change {
                kind,
                key: key.to_string(),
                action,
            });
        }
    }

    /// Set a kind-specific output value.
    pub fn set_output(&mut self, name: &str, value: Value) {
        self.outputs.insert(name.to_string(), value);
    }

    /// A kind-specific output value.
    pub fn output(&self, name: &str) -> Option<&Value> {
        self.outputs.get(name)
    }

    /// Remove and return a kind-specific output value.
    pub fn take_output(&mut self, name: &str) -> Option<Value> {
        self.outputs.remove(name)
    }

    /// All kind-specific outputs.
    pub fn outputs(&self) -> &Params {
        &self.outputs
    }

    /// Applied changes, in the order they happened.
    pub fn changes(&self) -> &[Change] {
        &self.changes
    }

    /// Fold another report into this one, flattening its outputs.
    pub fn merge(&mut self, other: ChangeReport) {
        self.changed |= other.changed;
        self.changes.extend(other.changes);
        self.outputs.extend(other.outputs);
    }

    /// Fold another report into this one, nesting its outputs under `section`.
    pub fn absorb(&mut self, section: &str, other: ChangeReport) {
        self.changed |= other.changed;
        self.changes.extend(other.changes);
        if !other.outputs.is_empty() {
            self.outputs
                .insert(section.to_string(), Value::Object(other.outputs));
        }
    }
}
