use anyhow::{Context, Result};
use clap::Args;
use colored::Colorize;
use trove_core::Validator;

use super::{print_json, read_json_arg, OutputFormat};

#[derive(Debug, Args)]
pub struct ValidateCommand {
    /// JSON Schema, inline or as a file path.
    #[arg(long)]
    schema: String,

    /// Payload, inline or as a file path.
    #[arg(long)]
    payload: String,
}

impl ValidateCommand {
    pub fn run(self, format: OutputFormat) -> Result<()> {
        let schema = read_json_arg(&self.schema).context("Invalid --schema")?;
        let payload = read_json_arg(&self.payload).context("Invalid --payload")?;

        let outcome = Validator::new().validate(&schema, &payload);

        match format {
            OutputFormat::Json => print_json(&outcome)?,
            OutputFormat::Table if outcome.valid => println!("{}", "Payload is valid.".green()),
            OutputFormat::Table => println!("{}", Validator::format_errors(&outcome.errors)),
        }

        if !outcome.valid {
            anyhow::bail!("validation failed with {} issue(s)", outcome.errors.len());
        }
        Ok(())
    }
}
