//! # Inbound Ports (Driving Ports / API)

use crate::domain::errors::StorageError;
use crate::domain::record::StoredBlockRecord;
use shared_types::Block;

/// Append-only block log, one per channel.
///
/// Implementations must be thread-safe. Within a channel, blocks become
/// visible to readers strictly in increasing number order.
pub trait BlockStore: Send + Sync {
    /// Append `block` to `channel_id`. The block must be the next number and
    /// link to the last stored hash. Creates the channel on block 0.
    fn store_block(&self, channel_id: &str, block: &Block) -> Result<(), StorageError>;

    fn get_block(&self, channel_id: &str, number: u64) -> Result<Block, StorageError>;

    /// Half-open `[start, end)`. A missing block inside the range is
    /// `NotFound`, never skipped.
    fn get_block_range(
        &self,
        channel_id: &str,
        start: u64,
        end: u64,
    ) -> Result<Vec<Block>, StorageError>;

    fn get_record(&self, channel_id: &str, number: u64) -> Result<StoredBlockRecord, StorageError>;

    /// Set the persisted committed flag. Idempotent.
    fn mark_committed(&self, channel_id: &str, number: u64) -> Result<(), StorageError>;

    fn is_committed(&self, channel_id: &str, number: u64) -> Result<bool, StorageError>;

    /// Number of stored blocks (next block number).
    fn height(&self, channel_id: &str) -> Result<u64, StorageError>;

    /// Hash of the last stored block.
    fn last_block_hash(&self, channel_id: &str) -> Result<Vec<u8>, StorageError>;

    fn has_channel(&self, channel_id: &str) -> bool;

    /// Channels with at least one stored block, sorted.
    fn channels(&self) -> Vec<String>;
}
