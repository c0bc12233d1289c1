//! # Block Cutter
//!
//! Accumulates ordered transactions for one channel and decides when a
//! batch becomes a block:
//!
//! - `max_message_count` transactions are pending
//! - adding a transaction would push pending bytes past `absolute_max_bytes`
//!   (the pending batch is cut first; an oversized transaction goes alone)
//! - the oldest pending transaction has waited `batch_timeout`
//!
//! Batches whose block could not be written are requeued and go out
//! before anything cut later.

use shared_types::BatchParameters;
use std::collections::VecDeque;
use std::time::{Duration, Instant};

#[derive(Debug)]
pub struct BlockCutter {
    params: BatchParameters,
    pending: Vec<Vec<u8>>,
    pending_bytes: u64,
    oldest: Option<Instant>,
    stalled: VecDeque<Vec<Vec<u8>>>,
}

impl BlockCutter {
    pub fn new(params: BatchParameters) -> Self {
        Self {
            params,
            pending: Vec::new(),
            pending_bytes: 0,
            oldest: None,
            stalled: VecDeque::new(),
        }
    }

    pub fn params(&self) -> &BatchParameters {
        &self.params
    }

    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }

    pub fn pending_bytes(&self) -> u64 {
        self.pending_bytes
    }

    /// Enqueue `tx` received at `now`; returns zero, one or two batches
    /// ready to become blocks, oldest first.
    pub fn ordered(&mut self, tx: Vec<u8>, now: Instant) -> Vec<Vec<Vec<u8>>> {
        let size = tx.len() as u64;
        let mut batches = Vec::new();

        if size > self.params.absolute_max_bytes {
            if !self.pending.is_empty() {
                batches.push(self.cut());
            }
            batches.push(vec![tx]);
            return batches;
        }

        if self.pending_bytes + size > self.params.absolute_max_bytes && !self.pending.is_empty() {
            batches.push(self.cut());
        }

        if self.pending.is_empty() {
            self.oldest = Some(now);
        }
        self.pending.push(tx);
        self.pending_bytes += size;

        if self.pending.len() as u64 >= u64::from(self.params.max_message_count.max(1)) {
            batches.push(self.cut());
        }
        batches
    }

    /// Take whatever is pending.
    pub fn cut(&mut self) -> Vec<Vec<u8>> {
        self.pending_bytes = 0;
        self.oldest = None;
        std::mem::take(&mut self.pending)
    }

    /// Put unwritten batches back, oldest first, ahead of any still
    /// stalled from before.
    pub fn requeue(&mut self, batches: impl IntoIterator<Item = Vec<Vec<u8>>>) {
        let batches: Vec<_> = batches.into_iter().collect();
        for batch in batches.into_iter().rev() {
            self.stalled.push_front(batch);
        }
    }

    /// Requeued batches in write order.
    pub fn take_stalled(&mut self) -> Vec<Vec<Vec<u8>>> {
        self.stalled.drain(..).collect()
    }

    pub fn has_stalled(&self) -> bool {
        !self.stalled.is_empty()
    }

    pub fn batch_timeout(&self) -> Duration {
        Duration::from_millis(self.params.batch_timeout_ms)
    }

    /// True once the oldest pending transaction has waited the batch timeout.
    pub fn is_expired(&self, now: Instant) -> bool {
        self.oldest
            .is_some_and(|t| now.saturating_duration_since(t) >= self.batch_timeout())
    }
}
