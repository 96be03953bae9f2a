use anyhow::{Context, Result};
use clap::Args;
use colored::Colorize;
use trove_core::EventCreationOptions;

use crate::config::CliConfig;

use super::{build_trove, print_json, read_json_arg, OutputFormat};

#[derive(Debug, Args)]
pub struct CreateCommand {
    /// JSON Schema, inline or as a file path.
    #[arg(long)]
    schema: String,

    /// Payload object, inline or as a file path.
    #[arg(long)]
    payload: String,

    /// Producer recorded on the event.
    #[arg(long)]
    producer: Option<String>,
}

impl CreateCommand {
    pub async fn run(self, config: CliConfig, format: OutputFormat) -> Result<()> {
        let schema = read_json_arg(&self.schema).context("Invalid --schema")?;
        let payload = read_json_arg(&self.payload).context("Invalid --payload")?;

        let mut options = EventCreationOptions::default();
        if let Some(producer) = self.producer {
            options = options.producer(producer);
        }

        let trove = build_trove(config);
        trove.initialize().await?;
        let result = trove.create_event(schema, payload, options).await;
        trove.shutdown().await;
        let event = result?;

        match format {
            OutputFormat::Json => print_json(&event)?,
            OutputFormat::Table => {
                println!("{} {}", "Created event".green(), event.id.to_string().bold());
                print_json(&event)?;
            }
        }
        Ok(())
    }
}
