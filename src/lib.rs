//! Vaultconf - Declarative configuration management for Vault and OpenBao.
//!
//! # Architecture
//!
//! ```text
//! src/
//! ├── cli/              # Command-line interface
//! │   ├── apply         # Converge a server on a manifest
//! │   ├── token         # Inspect the calling token
//! │   ├── output        # Terminal formatting
//! │   └── completions   # Shell completions
//! └── core/             # Core library components
//!     ├── client/       # Control-plane requests
//!     │   ├── mod       # ResourceClient trait
//!     │   └── http      # Blocking HTTP implementation
//!     ├── reconcile/    # Generic reconciliation engine
//!     │   ├── mod       # Adapter trait and Reconciler
//!     │   └── report    # ChangeReport
//!     ├── kinds/        # One adapter per resource kind
//!     ├── identity/     # Entities, aliases and groups
//!     ├── manifest      # Declarative input file
//!     ├── compare       # Desired-vs-live comparison
//!     └── config        # Connection settings
//! ```
//!
//! # Features
//!
//! - Idempotent reconciliation: a second run against an unchanged server
//!   makes no writes
//! - Create, update in place, recreate or delete, chosen per kind
//! - Name-based identity declarations resolved to server-assigned ids
//! - Structured change reports for scripting

pub mod cli;
pub mod core;
pub mod error;
