//! Command-line interface.
//!
//! The only place that reads the environment: connection flags are resolved
//! here into a [`ClientConfig`] and everything below receives it explicitly.

pub mod apply;
pub mod completions;
pub mod output;
pub mod token;

use std::fs;
use std::path::PathBuf;
use std::time::Duration;

use clap::{Args, Parser, Subcommand};
use tracing::debug;

use crate::core::client::HttpClient;
use crate::core::config::ClientConfig;
use crate::core::constants::{
    DEFAULT_VAULT_URL, ENV_VAULT_ADDR, ENV_VAULT_CACERT, ENV_VAULT_TOKEN, TOKEN_FILE,
};
use crate::error::{ConfigError, Result};

/// Vaultconf - Declarative configuration management for Vault and OpenBao.
#[derive(Parser)]
#[command(
    name = "vaultconf",
    about = "Declarative configuration management for Vault and OpenBao",
    version,
    after_help = "Declare it once. Converge it every time."
)]
pub struct Cli {
    #[command(flatten)]
    pub connection: Connection,

    /// Log every request and decision
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

/// How to reach the server.
#[derive(Args, Debug, Clone)]
pub struct Connection {
    /// Server address
    #[arg(long, global = true, env = ENV_VAULT_ADDR, default_value = DEFAULT_VAULT_URL)]
    pub vault_url: String,

    /// Token to authenticate with (default: ~/.vault-token)
    #[arg(long, global = true, env = ENV_VAULT_TOKEN, hide_env_values = true)]
    pub token: Option<String>,

    /// PEM bundle to trust instead of the system roots
    #[arg(long, global = true, env = ENV_VAULT_CACERT)]
    pub ca_path: Option<PathBuf>,

    /// Per-request timeout in seconds
    #[arg(long, global = true)]
    pub timeout: Option<u64>,
}

impl Connection {
    /// Resolve the flags into a connection configuration.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::MissingToken` if no token was given and none was
    /// left behind by `vault login`.
    pub fn config(&self) -> Result<ClientConfig> {
        let token = match self.token.as_deref().map(str::trim) {
            Some(token) if !token.is_empty() => token.to_string(),
            _ => token_from_file().ok_or(ConfigError::MissingToken)?,
        };

        Ok(ClientConfig::new(&self.vault_url, token)
            .with_ca_path(self.ca_path.clone())
            .with_timeout(self.timeout.map(Duration::from_secs)))
    }

    /// Build an HTTP client for this connection.
    pub fn client(&self) -> Result<HttpClient> {
        HttpClient::new(&self.config()?)
    }
}

fn token_from_file() -> Option<String> {
    let path = dirs::home_dir()?.join(TOKEN_FILE);
    let token = fs::read_to_string(&path).ok()?;
    let token = token.trim();
    if token.is_empty() {
        return None;
    }
    debug!(path = %path.display(), "using token file");
    Some(token.to_string())
}

/// Top-level commands.
#[derive(Subcommand)]
pub enum Command {
    /// Converge the server on a manifest
    Apply {
        /// Manifest file (.toml or .json)
        manifest: PathBuf,
        /// Print the change report as JSON
        #[arg(long)]
        json: bool,
    },

    /// Check a manifest without contacting the server
    Validate {
        /// Manifest file (.toml or .json)
        manifest: PathBuf,
    },

    /// Show the calling token
    Token {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

/// Supported shells for completions.
#[derive(clap::ValueEnum, Clone, Debug)]
pub enum Shell {
    Bash,
    Zsh,
    Fish,
    PowerShell,
}

/// Execute a command.
pub fn execute(command: Command, connection: &Connection) -> Result<()> {
    use Command::*;

    match command {
        Apply { manifest, json } => apply::execute(&manifest, connection, json),
        Validate { manifest } => apply::validate(&manifest),
        Token { json } => token::execute(connection, json),
        Completions { shell } => completions::execute(shell),
    }
}
