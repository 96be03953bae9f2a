//! trove - launcher for the trove event store.
//!
//! Loads a TOML configuration, installs the tracing subscriber and runs one
//! command against a trove instance backed by the built-in plugins.

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

mod builtin;
mod commands;
mod config;
mod error;

use commands::Cli;
use config::{CliConfig, LogFormat};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = if cli.needs_config() {
        match CliConfig::load(cli.config_path()) {
            Ok(config) => config,
            Err(e) => {
                error::print_error(&e);
                std::process::exit(1);
            }
        }
    } else {
        CliConfig::default()
    };

    init_tracing(&config);

    if let Err(e) = cli.run(config).await {
        error::print_error(&e);
        std::process::exit(1);
    }

    Ok(())
}

/// Installs the global subscriber. `RUST_LOG` wins over the configured level.
fn init_tracing(config: &CliConfig) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| config.log_level.as_str().into());

    let registry = tracing_subscriber::registry().with(filter);
    match config.log_format {
        LogFormat::Json => registry
            .with(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr))
            .init(),
        LogFormat::Pretty => registry
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .init(),
    }
}
