use anyhow::Result;
use colored::Colorize;
use guard_gateway::{config, server};
use tracing::info;

/// Execute the start command
///
/// Loads configuration and runs the server until shutdown.
pub async fn execute() -> Result<()> {
    println!("{}", "Starting guard gateway...".green());

    let cfg = config::load_config()?;

    info!("Starting guard gateway in foreground mode");

    // Start the server (blocks until shutdown)
    server::start_server(cfg).await?;

    Ok(())
}
