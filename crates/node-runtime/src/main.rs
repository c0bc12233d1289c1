//! # Node Runtime
//!
//! ```text
//! PC_ROLE=orderer  ->  OrdererNode (creation stream, broadcast, deliver)
//! PC_ROLE=peer     ->  PeerNode    (join, sync, admin requests)
//! ```
//!
//! Startup sequence:
//! 1. Install logging (`PC_LOG`)
//! 2. Load configuration from `PC_*` variables
//! 3. Start the selected node; identity or storage errors abort here
//! 4. Run until Ctrl+C, then stop every worker

use anyhow::{Context, Result};
use node_runtime::logging::init_logging;
use node_runtime::{NodeConfig, NodeRuntime};
use tracing::info;

#[tokio::main]
async fn main() -> Result<()> {
    init_logging()?;

    let config = NodeConfig::from_env().context("reading configuration")?;
    info!(role = %config.role, "Starting node runtime v{}", env!("CARGO_PKG_VERSION"));

    let runtime = NodeRuntime::start(config).await?;

    info!("Node is running. Press Ctrl+C to stop.");
    tokio::signal::ctrl_c().await?;

    runtime.shutdown().await;
    Ok(())
}
