//! Watchdog server binary.

use watchdog_server::{Config, WatchdogServer};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Can't use tracing yet: the logging settings come from the config
    let config = Config::load().map_err(|e| anyhow::anyhow!("configuration error: {}", e))?;

    let level = config.logging.level.as_deref().unwrap_or("info");
    let json = config.logging.format.as_deref() == Some("json");
    common::logging::init_with(level, json);

    tracing::info!("watchdog server starting");

    let server = WatchdogServer::new(config);
    server.run().await?;

    Ok(())
}
