//! CLI commands.

mod create;
mod plugins;
mod run;
mod validate;

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use serde_json::Value;
use trove_core::Trove;

use crate::builtin;
use crate::config::CliConfig;

/// trove - extensible event-record store.
#[derive(Debug, Parser)]
#[command(name = "trove")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Configuration file.
    #[arg(long, short, global = true, env = "TROVE_CONFIG", default_value = "trove.toml")]
    config: PathBuf,

    /// Output format.
    #[arg(long, global = true, value_enum, default_value_t = OutputFormat::Table)]
    format: OutputFormat,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Start trove and keep it running until Ctrl+C.
    Run,

    /// Create one event and print it.
    Create(create::CreateCommand),

    /// Validate a payload against a schema without starting trove.
    Validate(validate::ValidateCommand),

    /// List the plugins loaded from the configuration.
    Plugins,
}

/// Output format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable output.
    #[default]
    Table,
    /// JSON output.
    Json,
}

impl Cli {
    /// Whether the command needs the configuration file.
    pub fn needs_config(&self) -> bool {
        !matches!(self.command, Commands::Validate(_))
    }

    pub fn config_path(&self) -> &Path {
        &self.config
    }

    /// Run the CLI command.
    pub async fn run(self, config: CliConfig) -> Result<()> {
        match self.command {
            Commands::Run => run::run(config).await,
            Commands::Create(cmd) => cmd.run(config, self.format).await,
            Commands::Validate(cmd) => cmd.run(self.format),
            Commands::Plugins => plugins::list(config, self.format).await,
        }
    }
}

/// Builds an instance with the built-in plugin loader.
pub(crate) fn build_trove(config: CliConfig) -> Trove {
    Trove::with_loader(config.core, Arc::new(builtin::loader()))
}

/// Reads a JSON argument given either inline or as a path to a file.
pub(crate) fn read_json_arg(arg: &str) -> Result<Value> {
    let trimmed = arg.trim_start();
    if trimmed.starts_with('{') || trimmed.starts_with('[') {
        return serde_json::from_str(arg).context("Failed to parse inline JSON");
    }

    let contents =
        fs::read_to_string(arg).with_context(|| format!("Failed to read JSON from {:?}", arg))?;
    serde_json::from_str(&contents).with_context(|| format!("Failed to parse JSON from {:?}", arg))
}

/// Pretty-prints a serializable value as JSON.
pub(crate) fn print_json<T: serde::Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
