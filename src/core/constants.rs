//! Constants used throughout vaultconf.
//!
//! Centralizes default mounts, environment variable names and status sets.

/// Default Vault address when none is configured.
pub const DEFAULT_VAULT_URL: &str = "https://localhost:8200";

/// Environment variable holding the Vault address.
pub const ENV_VAULT_ADDR: &str = "VAULT_ADDR";

/// Environment variable holding the Vault token.
pub const ENV_VAULT_TOKEN: &str = "VAULT_TOKEN";

/// Environment variable holding the CA bundle path.
pub const ENV_VAULT_CACERT: &str = "VAULT_CACERT";

/// Environment variable holding the log filter.
pub const ENV_LOG: &str = "VAULTCONF_LOG";

/// Token file written by `vault login`, relative to HOME.
pub const TOKEN_FILE: &str = ".vault-token";

/// Header carrying the bearer token.
pub const TOKEN_HEADER: &str = "X-Vault-Token";

/// Default AppRole auth mount.
pub const DEFAULT_APPROLE_MOUNT: &str = "approle";

/// Default OIDC auth mount.
pub const DEFAULT_OIDC_MOUNT: &str = "oidc";

/// Default SSH signer mount.
pub const DEFAULT_SSH_MOUNT: &str = "ssh";

/// Statuses for a plain successful request.
pub const OK: &[u16] = &[200, 204];

/// Statuses for a read where 404 signals absence.
pub const OK_OR_NOT_FOUND: &[u16] = &[200, 404];

/// Statuses for system mount reads where 400 signals absence.
pub const OK_OR_BAD_REQUEST: &[u16] = &[200, 400];

/// Auth mounts that can never be disabled.
pub const BUILTIN_AUTH_MOUNTS: &[&str] = &["token"];

/// Secrets engine mounts that can never be disabled.
pub const BUILTIN_SECRET_MOUNTS: &[&str] = &["sys", "identity", "cubbyhole"];

/// Policies that can never be deleted.
pub const BUILTIN_POLICIES: &[&str] = &["root", "default"];
