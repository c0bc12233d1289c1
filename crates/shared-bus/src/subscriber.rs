//! # Block Subscription
//!
//! Receiving side of the committed-block bus.

use crate::events::{BlockEvent, EventFilter};
use std::pin::Pin;
use std::task::{Context, Poll};
use thiserror::Error;
use tokio::sync::broadcast;
use tokio_stream::wrappers::{errors::BroadcastStreamRecvError, BroadcastStream};
use tokio_stream::Stream;
use tracing::debug;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SubscriptionError {
    /// The bus was dropped.
    #[error("Block bus closed")]
    Closed,

    /// The subscriber fell behind and `0` events were dropped; the caller
    /// must refill from storage.
    #[error("Subscriber lagged by {0} events")]
    Lagged(u64),
}

/// A subscription handle.
pub struct Subscription {
    receiver: broadcast::Receiver<BlockEvent>,
    filter: EventFilter,
}

impl Subscription {
    pub(crate) fn new(receiver: broadcast::Receiver<BlockEvent>, filter: EventFilter) -> Self {
        Self { receiver, filter }
    }

    /// Next matching block. Lag is reported, not skipped: a follower that
    /// missed blocks cannot recover them from the bus.
    pub async fn recv(&mut self) -> Result<BlockEvent, SubscriptionError> {
        loop {
            let event = match self.receiver.recv().await {
                Ok(e) => e,
                Err(broadcast::error::RecvError::Closed) => return Err(SubscriptionError::Closed),
                Err(broadcast::error::RecvError::Lagged(count)) => {
                    debug!(lagged = count, "[bus] subscriber lagged");
                    return Err(SubscriptionError::Lagged(count));
                }
            };
            if self.filter.matches(&event) {
                return Ok(event);
            }
        }
    }

    #[must_use]
    pub fn filter(&self) -> &EventFilter {
        &self.filter
    }

    /// Convert into a `Stream`.
    #[must_use]
    pub fn into_stream(self) -> BlockStream {
        BlockStream {
            inner: BroadcastStream::new(self.receiver),
            filter: self.filter,
        }
    }
}

/// `Stream` of matching block events; yields `Err(Lagged)` on lag.
pub struct BlockStream {
    inner: BroadcastStream<BlockEvent>,
    filter: EventFilter,
}

impl Stream for BlockStream {
    type Item = Result<BlockEvent, SubscriptionError>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        loop {
            match Pin::new(&mut self.inner).poll_next(cx) {
                Poll::Ready(Some(Ok(event))) => {
                    if self.filter.matches(&event) {
                        return Poll::Ready(Some(Ok(event)));
                    }
                }
                Poll::Ready(Some(Err(BroadcastStreamRecvError::Lagged(n)))) => {
                    return Poll::Ready(Some(Err(SubscriptionError::Lagged(n))))
                }
                Poll::Ready(None) => return Poll::Ready(None),
                Poll::Pending => return Poll::Pending,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::publisher::{BlockPublisher, InMemoryBlockBus};
    use shared_types::{Block, BlockType};
    use std::time::Duration;
    use tokio::time::timeout;
    use tokio_stream::StreamExt;

    fn event(channel: &str, number: u64) -> BlockEvent {
        BlockEvent::new(
            channel,
            Block::new(number, vec![], BlockType::Normal, vec![vec![1]]),
        )
    }

    #[tokio::test]
    async fn test_recv_filters_by_channel() {
        let bus = InMemoryBlockBus::new();
        let mut sub = bus.subscribe(EventFilter::channel("c1"));

        bus.publish(event("c2", 0));
        bus.publish(event("c1", 5));

        let received = timeout(Duration::from_millis(100), sub.recv())
            .await
            .expect("timeout")
            .expect("closed");
        assert_eq!(received.channel_id, "c1");
        assert_eq!(received.number(), 5);
    }

    #[tokio::test]
    async fn test_recv_reports_lag() {
        let bus = InMemoryBlockBus::with_capacity(2);
        let mut sub = bus.subscribe(EventFilter::all());
        for n in 0..5 {
            bus.publish(event("c1", n));
        }
        assert!(matches!(sub.recv().await, Err(SubscriptionError::Lagged(_))));
        // After reporting lag the receiver resumes at the oldest retained event.
        assert!(sub.recv().await.is_ok());
    }

    #[tokio::test]
    async fn test_recv_closed_when_bus_dropped() {
        let bus = InMemoryBlockBus::new();
        let mut sub = bus.subscribe(EventFilter::all());
        drop(bus);
        assert_eq!(sub.recv().await.unwrap_err(), SubscriptionError::Closed);
    }

    #[tokio::test]
    async fn test_stream_yields_matching_events() {
        let bus = InMemoryBlockBus::new();
        let mut stream = bus.subscribe(EventFilter::channel("c1")).into_stream();
        bus.publish(event("c9", 0));
        bus.publish(event("c1", 1));
        let item = timeout(Duration::from_millis(100), stream.next())
            .await
            .expect("timeout")
            .expect("ended")
            .expect("lagged");
        assert_eq!(item.number(), 1);
    }
}
