use anyhow::Result;
use colored::Colorize;
use tabled::{Table, Tabled};
use trove_core::PluginInfo;

use crate::config::CliConfig;

use super::{build_trove, print_json, OutputFormat};

#[derive(Tabled)]
struct PluginRow {
    #[tabled(rename = "NAME")]
    name: String,
    #[tabled(rename = "VERSION")]
    version: String,
    #[tabled(rename = "CAPABILITIES")]
    capabilities: String,
}

impl From<PluginInfo> for PluginRow {
    fn from(info: PluginInfo) -> Self {
        let capabilities = info
            .capabilities
            .iter()
            .map(|c| c.as_str())
            .collect::<Vec<_>>()
            .join(", ");
        Self {
            name: info.name,
            version: info.version,
            capabilities: if capabilities.is_empty() {
                "-".to_string()
            } else {
                capabilities
            },
        }
    }
}

/// Initializes, prints the loaded plugins, then shuts down.
pub async fn list(config: CliConfig, format: OutputFormat) -> Result<()> {
    let trove = build_trove(config);
    trove.initialize().await?;
    let plugins = trove.plugins().await;
    trove.shutdown().await;

    match format {
        OutputFormat::Json => print_json(&plugins)?,
        OutputFormat::Table if plugins.is_empty() => {
            println!("{}", "No plugins loaded.".dimmed())
        }
        OutputFormat::Table => {
            let rows: Vec<PluginRow> = plugins.into_iter().map(PluginRow::from).collect();
            println!("{}", Table::new(rows));
        }
    }
    Ok(())
}
