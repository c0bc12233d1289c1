//! # Block Publisher
//!
//! Publishing side of the committed-block bus.

use crate::events::{BlockEvent, EventFilter};
use crate::subscriber::Subscription;
use crate::DEFAULT_CHANNEL_CAPACITY;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::broadcast;
use tracing::{debug, trace};

/// Emits committed blocks to whoever follows the channel.
pub trait BlockPublisher: Send + Sync {
    /// Publish a committed block. Returns the number of receivers.
    fn publish(&self, event: BlockEvent) -> usize;

    /// Total blocks published.
    fn events_published(&self) -> u64;
}

/// In-memory bus on top of `tokio::sync::broadcast`.
pub struct InMemoryBlockBus {
    sender: broadcast::Sender<BlockEvent>,
    events_published: AtomicU64,
    capacity: usize,
}

impl InMemoryBlockBus {
    #[must_use]
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CHANNEL_CAPACITY)
    }

    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self {
            sender,
            events_published: AtomicU64::new(0),
            capacity,
        }
    }

    /// Subscribe to blocks matching `filter`. Only blocks published after
    /// this call are seen.
    #[must_use]
    pub fn subscribe(&self, filter: EventFilter) -> Subscription {
        debug!(channel = ?filter.channel_id, "[bus] new block subscription");
        Subscription::new(self.sender.subscribe(), filter)
    }

    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }

    #[must_use]
    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

impl Default for InMemoryBlockBus {
    fn default() -> Self {
        Self::new()
    }
}

impl BlockPublisher for InMemoryBlockBus {
    fn publish(&self, event: BlockEvent) -> usize {
        self.events_published.fetch_add(1, Ordering::Relaxed);
        let channel = event.channel_id.clone();
        let number = event.number();
        match self.sender.send(event) {
            Ok(receivers) => {
                trace!(channel = %channel, number, receivers, "[bus] block published");
                receivers
            }
            // No followers is the normal idle state.
            Err(_) => 0,
        }
    }

    fn events_published(&self) -> u64 {
        self.events_published.load(Ordering::Relaxed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared_types::{Block, BlockType};

    fn event(channel: &str, number: u64) -> BlockEvent {
        BlockEvent::new(
            channel,
            Block::new(number, vec![], BlockType::Normal, vec![vec![1]]),
        )
    }

    #[test]
    fn test_publish_no_subscribers() {
        let bus = InMemoryBlockBus::new();
        assert_eq!(bus.publish(event("c1", 0)), 0);
        assert_eq!(bus.events_published(), 1);
    }

    #[test]
    fn test_publish_counts_receivers() {
        let bus = InMemoryBlockBus::with_capacity(8);
        let _a = bus.subscribe(EventFilter::all());
        let _b = bus.subscribe(EventFilter::channel("c2"));
        assert_eq!(bus.publish(event("c1", 0)), 2);
        assert_eq!(bus.subscriber_count(), 2);
        assert_eq!(bus.capacity(), 8);
    }
}
