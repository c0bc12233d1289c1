//! # Block Events

use shared_types::Block;
use std::sync::Arc;

/// A block that has been stored and marked committed on `channel_id`.
#[derive(Debug, Clone)]
pub struct BlockEvent {
    pub channel_id: String,
    pub block: Arc<Block>,
}

impl BlockEvent {
    pub fn new(channel_id: impl Into<String>, block: Block) -> Self {
        Self {
            channel_id: channel_id.into(),
            block: Arc::new(block),
        }
    }

    pub fn number(&self) -> u64 {
        self.block.header.number
    }
}

/// Which channels a subscriber wants to see.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EventFilter {
    /// `None` means every channel.
    pub channel_id: Option<String>,
}

impl EventFilter {
    pub fn all() -> Self {
        Self { channel_id: None }
    }

    pub fn channel(channel_id: impl Into<String>) -> Self {
        Self {
            channel_id: Some(channel_id.into()),
        }
    }

    pub fn matches(&self, event: &BlockEvent) -> bool {
        match &self.channel_id {
            None => true,
            Some(id) => *id == event.channel_id,
        }
    }
}
