//! Sentinel-Mesh node entry point.

use std::path::PathBuf;

use anyhow::{Context, Result};
use tracing::info;

use node_runtime::container::{NodeConfig, SubsystemContainer};
use node_runtime::NodeRuntime;

#[tokio::main]
async fn main() -> Result<()> {
    // Optional config file path as the first argument.
    let config_path: Option<PathBuf> = std::env::args().nth(1).map(PathBuf::from);

    let config =
        NodeConfig::load(config_path.as_deref()).context("Failed to load configuration")?;

    // Initialize logging before anything else logs.
    sentinel_telemetry::init_logging(&config.node.log_level)
        .context("Failed to initialize logging")?;
    let _metrics = sentinel_telemetry::register_metrics()
        .context("Failed to register metrics")?;

    // Wire and start the node.
    let container = SubsystemContainer::new(config).context("Failed to wire subsystems")?;
    let runtime = NodeRuntime::new(container);
    runtime.start().await?;

    info!("Node is running. Press Ctrl+C to stop.");
    tokio::signal::ctrl_c().await?;

    runtime.shutdown().await;
    Ok(())
}
