//! Core library components.
//!
//! Everything needed to converge a Vault or OpenBao server on a declared
//! configuration: the request abstraction, the reconciliation engine, one
//! adapter per resource kind and the identity-graph resolver.

pub mod client;
pub mod compare;
pub mod config;
pub mod constants;
pub mod identity;
pub mod kinds;
pub mod manifest;
pub mod reconcile;
pub mod types;
