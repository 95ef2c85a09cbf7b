//! Test support utilities for vaultconf integration tests.
//!
//! Provides an in-memory control plane, an isolated environment for the
//! binary, and helpers for building declarations.

#![allow(dead_code)]

pub mod fake;

pub use env::TestEnv;
pub use fake::FakeVault;

use serde_json::Value;
use vaultconf::core::manifest::Manifest;
use vaultconf::core::types::{Declarations, Params};

/// Parameters from a JSON object literal.
pub fn params(value: Value) -> Params {
    match value {
        Value::Object(map) => map,
        other => panic!("expected a JSON object, got {}", other),
    }
}

/// A collection declaration from `(key, parameters)` pairs; `None` deletes.
pub fn declare<const N: usize>(entries: [(&str, Option<Value>); N]) -> Declarations<Params> {
    entries
        .into_iter()
        .map(|(key, value)| (key.to_string(), value.map(params)))
        .collect()
}

/// Parse a TOML manifest.
pub fn manifest(toml: &str) -> Manifest {
    Manifest::from_toml(toml).expect("manifest should parse")
}
