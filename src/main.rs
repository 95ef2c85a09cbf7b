//! Vaultconf - Declarative configuration management for Vault and OpenBao.

use clap::Parser;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use vaultconf::cli::output;
use vaultconf::cli::{execute, Cli};
use vaultconf::core::constants::ENV_LOG;
use vaultconf::error::{ClientError, ConfigError, Error, ResolveError};

fn main() {
    let cli = Cli::parse();

    // Initialize tracing subscriber with env-filter support
    let filter = EnvFilter::try_from_env(ENV_LOG).unwrap_or_else(|_| {
        if cli.verbose {
            EnvFilter::new("vaultconf=debug")
        } else {
            EnvFilter::new("vaultconf=warn")
        }
    });

    tracing_subscriber::registry()
        .with(filter)
        .with(
            fmt::layer()
                .with_target(false)
                .without_time()
                .with_writer(std::io::stderr),
        )
        .init();

    if let Err(e) = execute(cli.command, &cli.connection) {
        // Format error with suggestion if available
        let error_msg = e.to_string();
        let suggestion = match &e {
            Error::Config(ConfigError::MissingToken) => Some("set VAULT_TOKEN or run: vault login"),
            Error::Client(ClientError::UnexpectedStatus { status: 403, .. }) => {
                Some("check the token's policies with: vaultconf token")
            }
            Error::Client(ClientError::Transport { .. }) => {
                Some("check --vault-url or VAULT_ADDR")
            }
            Error::Resolve(ResolveError::UnknownAuthMount(_)) => {
                Some("declare the auth method under [auth_methods] first")
            }
            _ => None,
        };

        output::error(&error_msg);
        if let Some(hint) = suggestion {
            output::hint(hint);
        }
        std::process::exit(1);
    }
}
