//! Connection configuration.
//!
//! The command-line boundary resolves the address, token and CA bundle once
//! and hands a [`ClientConfig`] to the HTTP client. Nothing below the CLI reads
//! environment variables.

use std::path::PathBuf;
use std::time::Duration;

use zeroize::Zeroizing;

/// How to reach and authenticate to the control plane.
#[derive(Clone)]
pub struct ClientConfig {
    /// Base URL of the server, e.g. `https://vault.example.com:8200`.
    pub url: String,
    /// Bearer token sent with every request.
    pub token: Zeroizing<String>,
    /// PEM bundle to trust instead of the system roots.
    pub ca_path: Option<PathBuf>,
    /// Per-request timeout. `None` keeps the transport default.
    pub timeout: Option<Duration>,
}

impl std::fmt::Debug for ClientConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClientConfig")
            .field("url", &self.url)
            .field("token", &"<redacted>")
            .field("ca_path", &self.ca_path)
            .field("timeout", &self.timeout)
            .finish()
    }
}

impl ClientConfig {
    /// Create a configuration with no custom CA and the default timeout.
    pub fn new(url: impl Into<String>, token: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            token: Zeroizing::new(token.into()),
            ca_path: None,
            timeout: None,
        }
    }

    /// Trust the given PEM bundle.
    pub fn with_ca_path(mut self, ca_path: Option<PathBuf>) -> Self {
        self.ca_path = ca_path;
        self
    }

    /// Apply a per-request timeout.
    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    /// Base URL without a trailing slash, ready for `/v1/...` paths.
    pub fn base_url(&self) -> &str {
        self.url.trim_end_matches('/')
    }
}
