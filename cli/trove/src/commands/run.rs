use anyhow::Result;
use tracing::info;

use crate::config::CliConfig;

use super::build_trove;

/// Initializes, waits for Ctrl+C, then shuts down.
pub async fn run(config: CliConfig) -> Result<()> {
    let trove = build_trove(config);
    trove.initialize().await?;
    info!("Trove initialized. Press Ctrl+C to stop.");

    tokio::signal::ctrl_c().await?;
    info!("Received shutdown signal");

    trove.shutdown().await;
    info!("Shutdown complete");
    Ok(())
}
