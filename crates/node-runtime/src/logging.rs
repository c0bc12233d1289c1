//! # Logging
//!
//! `PC_LOG` takes an `EnvFilter` directive (`info`, `pc_04_block_sync=debug`,
//! ...). Installed once by the binary; libraries only emit events.

use anyhow::{anyhow, Result};
use tracing_subscriber::EnvFilter;

pub const LOG_ENV: &str = "PC_LOG";

pub fn init_logging() -> Result<()> {
    let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_ids(true)
        .try_init()
        .map_err(|e| anyhow!("installing log subscriber: {}", e))
}
