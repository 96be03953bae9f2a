//! Launcher configuration.
//!
//! Read from a TOML file. Top-level keys configure logging; the `[plugins]`
//! and `[storage]` tables are handed to the core unchanged:
//!
//! ```toml
//! log_level = "info"
//! log_format = "pretty"
//!
//! [plugins]
//! sources = ["memory-storage"]
//!
//! [storage]
//! events = { plugin = "memory-storage" }
//! files = { plugin = "memory-storage" }
//! links = "use-event-storage"
//! ```

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use trove_core::CoreConfig;

/// Environment variable overriding `log_level`.
pub const LOG_LEVEL_ENV: &str = "TROVE_LOG_LEVEL";

/// Log output format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    Json,
    #[default]
    Pretty,
}

/// Configuration file contents.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CliConfig {
    /// Default tracing filter when `RUST_LOG` is unset.
    #[serde(default = "default_log_level")]
    pub log_level: String,

    #[serde(default)]
    pub log_format: LogFormat,

    #[serde(flatten)]
    pub core: CoreConfig,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for CliConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            log_format: LogFormat::default(),
            core: CoreConfig::default(),
        }
    }
}

impl CliConfig {
    /// Loads the file at `path` and applies environment overrides.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            anyhow::bail!("Configuration file not found at: {}", path.display());
        }

        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config from {:?}", path))?;

        let mut config = Self::parse(&contents)
            .with_context(|| format!("Failed to parse config from {:?}", path))?;

        if let Ok(level) = std::env::var(LOG_LEVEL_ENV) {
            if !level.is_empty() {
                config.log_level = level;
            }
        }

        Ok(config)
    }

    pub fn parse(contents: &str) -> Result<Self> {
        Ok(toml::from_str(contents)?)
    }
}
