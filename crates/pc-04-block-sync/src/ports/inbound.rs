//! # Inbound Ports

use crate::domain::{SyncError, SyncReport};
use async_trait::async_trait;
use shared_types::Block;

/// Peer-side synchronization API.
#[async_trait]
pub trait BlockSyncApi: Send + Sync {
    /// Validate and store a genesis config block, starting to track its
    /// channel. Returns the channel id.
    async fn join_channel(&self, genesis: &Block) -> Result<String, SyncError>;

    /// One bounded catch-up pass for `channel_id`.
    async fn sync_channel(&self, channel_id: &str) -> Result<SyncReport, SyncError>;

    /// Catch up every joined channel. A failing channel does not stop the
    /// others.
    async fn initial_sync(&self) -> Vec<(String, Result<SyncReport, SyncError>)>;

    fn channel_height(&self, channel_id: &str) -> Option<u64>;

    fn channels(&self) -> Vec<String>;
}
