//! # Sync Configuration

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Block synchronization configuration.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SyncConfig {
    /// Blocks requested per range call, at most `MAX_RANGE_BATCH`.
    pub batch_size: u64,

    /// Attempts per remote call before the channel's pass fails.
    pub max_attempts: u32,

    /// Delay between attempts of one call.
    pub retry_delay_ms: u64,

    /// Delay before a broken deliver stream is reopened.
    pub stream_retry_delay_ms: u64,

    /// A channel whose last block is older than this is re-checked.
    pub staleness_window_secs: u64,

    /// Period of the staleness check.
    pub check_interval_secs: u64,

    /// Deadline of each remote call.
    pub rpc_timeout_secs: u64,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            batch_size: 50,
            max_attempts: 3,
            retry_delay_ms: 500,
            stream_retry_delay_ms: 2_000,
            staleness_window_secs: 30,
            check_interval_secs: 10,
            rpc_timeout_secs: 30,
        }
    }
}

impl SyncConfig {
    /// Small batches and short delays.
    pub fn for_testing() -> Self {
        Self {
            batch_size: 3,
            max_attempts: 3,
            retry_delay_ms: 10,
            stream_retry_delay_ms: 50,
            staleness_window_secs: 1,
            check_interval_secs: 1,
            rpc_timeout_secs: 2,
        }
    }

    pub fn retry_delay(&self) -> Duration {
        Duration::from_millis(self.retry_delay_ms)
    }

    pub fn stream_retry_delay(&self) -> Duration {
        Duration::from_millis(self.stream_retry_delay_ms)
    }

    pub fn staleness_window(&self) -> Duration {
        Duration::from_secs(self.staleness_window_secs)
    }

    pub fn check_interval(&self) -> Duration {
        Duration::from_secs(self.check_interval_secs.max(1))
    }

    pub fn rpc_timeout(&self) -> Duration {
        Duration::from_secs(self.rpc_timeout_secs)
    }
}
