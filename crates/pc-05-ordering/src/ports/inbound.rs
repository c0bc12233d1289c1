//! # Inbound Ports

use crate::domain::errors::OrderingError;
use shared_types::{Block, Envelope};

/// Unary orderer operations. Deliver streams are served by
/// `OrderingService::deliver`.
pub trait OrderingApi: Send + Sync {
    /// Validate and enqueue one transaction. Returns the blocks it caused
    /// to be written, if any. A block that cannot be stored is kept on the
    /// cutter and retried; the transaction counts as accepted.
    fn broadcast(&self, envelope: &Envelope) -> Result<Vec<Block>, OrderingError>;

    fn channel_height(&self, channel_id: &str) -> Result<u64, OrderingError>;

    /// Half-open `[start, end)`, clipped to the channel height and to
    /// `MAX_RANGE_BATCH` blocks.
    fn block_range(&self, channel_id: &str, start: u64, end: u64)
        -> Result<Vec<Block>, OrderingError>;

    fn list_channels(&self) -> Vec<String>;
}
