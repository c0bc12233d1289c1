//! # Ordering Service
//!
//! Single-sequencer ordering: every accepted transaction of a channel goes
//! through that channel's `BlockCutter` under its mutex, so blocks are
//! numbered, linked and stored strictly in order. Cut blocks are signed by
//! the orderer, stored, marked committed and then published on the bus.
//!
//! A batch whose block cannot be stored goes back on its cutter and is
//! written first on the next broadcast or timer tick. Its transactions were
//! already accepted, so the broadcast that triggered the write still
//! succeeds.

use crate::domain::cutter::BlockCutter;
use crate::domain::errors::OrderingError;
use crate::ports::inbound::OrderingApi;
use pc_01_msp::MembershipService;
use pc_02_block_storage::BlockStore;
use pc_03_channel_creation::{ChannelRecord, ChannelTable};
use parking_lot::Mutex;
use shared_bus::{
    BlockEvent, BlockPublisher, EventFilter, InMemoryBlockBus, Subscription, SubscriptionError,
};
use shared_types::config::WRITERS_POLICY;
use shared_types::rpc::MAX_RANGE_BATCH;
use shared_types::{
    marshal, seal_block, validate_envelope, validate_payload, Block, BlockType, Envelope,
    MessageType, ValidationBitmap,
};
use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

#[cfg(test)]
mod tests;

/// How often pending batches are checked against their timeout.
pub const BATCH_TIMER_TICK: Duration = Duration::from_millis(100);

#[derive(Clone)]
pub struct OrderingDependencies {
    pub msp: Arc<dyn MembershipService>,
    pub store: Arc<dyn BlockStore>,
    pub bus: Arc<InMemoryBlockBus>,
    pub table: Arc<ChannelTable>,
}

pub struct OrderingService {
    deps: OrderingDependencies,
    cutters: Mutex<HashMap<String, Arc<Mutex<BlockCutter>>>>,
}

impl OrderingService {
    pub fn new(deps: OrderingDependencies) -> Self {
        Self {
            deps,
            cutters: Mutex::new(HashMap::new()),
        }
    }

    fn record(&self, channel_id: &str) -> Result<Arc<ChannelRecord>, OrderingError> {
        self.deps
            .table
            .get(channel_id)
            .ok_or_else(|| OrderingError::ChannelNotFound(channel_id.to_string()))
    }

    fn cutter(&self, record: &ChannelRecord) -> Arc<Mutex<BlockCutter>> {
        self.cutters
            .lock()
            .entry(record.channel_id().to_string())
            .or_insert_with(|| Arc::new(Mutex::new(BlockCutter::new(record.config.batch()))))
            .clone()
    }

    /// Sign, store, commit and publish the next block of `channel_id`.
    /// Callers hold the channel's cutter lock.
    ///
    /// Fails only if the block was not stored. A commit mark that cannot be
    /// written is logged and finished when the channel table is rebuilt.
    fn write_block(
        &self,
        channel_id: &str,
        transactions: &[Vec<u8>],
    ) -> Result<Block, OrderingError> {
        let store = &self.deps.store;
        let number = store.height(channel_id)?;
        let previous_hash = store.last_block_hash(channel_id)?;

        let count = transactions.len();
        let mut block = Block::new(
            number,
            previous_hash,
            BlockType::Normal,
            transactions.to_vec(),
        );
        block.metadata.validation_bitmap = ValidationBitmap::all_valid(count);
        seal_block(self.deps.msp.signing_identity(), &mut block)?;

        store.store_block(channel_id, &block)?;
        if let Err(e) = store.mark_committed(channel_id, number) {
            warn!(
                channel = channel_id,
                number,
                error = %e,
                "[pc-05] block stored but commit mark failed"
            );
        }
        info!(
            channel = channel_id,
            number,
            transactions = count,
            hash = %hex::encode(&block.header.hash),
            "[pc-05] block cut"
        );
        self.deps
            .bus
            .publish(BlockEvent::new(channel_id, block.clone()));
        Ok(block)
    }

    /// Write the cutter's stalled batches, then `batches`. On failure the
    /// unwritten batches go back on the cutter in order.
    fn write_batches(
        &self,
        channel_id: &str,
        cutter: &mut BlockCutter,
        batches: Vec<Vec<Vec<u8>>>,
    ) -> Result<Vec<Block>, OrderingError> {
        let mut queue: VecDeque<Vec<Vec<u8>>> = cutter.take_stalled().into();
        queue.extend(batches);
        let mut blocks = Vec::with_capacity(queue.len());
        while let Some(batch) = queue.pop_front() {
            match self.write_block(channel_id, &batch) {
                Ok(block) => blocks.push(block),
                Err(e) => {
                    error!(
                        channel = channel_id,
                        error = %e,
                        stalled = queue.len() + 1,
                        "[pc-05] failed to write block, batch kept for retry"
                    );
                    queue.push_front(batch);
                    cutter.requeue(queue);
                    return Err(e);
                }
            }
        }
        Ok(blocks)
    }

    /// Cut every batch whose oldest transaction has waited its timeout and
    /// retry batches left over from failed writes.
    pub fn cut_expired(&self, now: Instant) -> Vec<Block> {
        let cutters: Vec<(String, Arc<Mutex<BlockCutter>>)> = self
            .cutters
            .lock()
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();

        let mut blocks = Vec::new();
        for (channel_id, cutter) in cutters {
            let mut cutter = cutter.lock();
            let mut batches = Vec::new();
            if cutter.is_expired(now) {
                let batch = cutter.cut();
                debug!(channel = %channel_id, size = batch.len(), "[pc-05] batch timeout");
                batches.push(batch);
            } else if !cutter.has_stalled() {
                continue;
            }
            // Failures are logged and requeued by write_batches.
            if let Ok(mut written) = self.write_batches(&channel_id, &mut cutter, batches) {
                blocks.append(&mut written);
            }
        }
        blocks
    }

    /// Background worker driving batch timeouts until `shutdown` flips.
    pub fn spawn_batch_timer(
        self: &Arc<Self>,
        mut shutdown: watch::Receiver<bool>,
    ) -> JoinHandle<()> {
        let service = Arc::clone(self);
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(BATCH_TIMER_TICK);
            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        service.cut_expired(Instant::now());
                    }
                    changed = shutdown.changed() => {
                        if changed.is_err() || *shutdown.borrow() {
                            debug!("[pc-05] batch timer stopped");
                            return;
                        }
                    }
                }
            }
        })
    }

    /// Blocks of `channel_id` from `start`: stored ones first, then new ones
    /// as they are cut.
    pub fn deliver(&self, channel_id: &str, start: u64) -> Result<DeliverCursor, OrderingError> {
        self.record(channel_id)?;
        // Subscribe before reading the height so no block falls in between.
        let subscription = self.deps.bus.subscribe(EventFilter::channel(channel_id));
        Ok(DeliverCursor {
            channel_id: channel_id.to_string(),
            next: start,
            store: Arc::clone(&self.deps.store),
            subscription,
        })
    }
}

impl OrderingApi for OrderingService {
    fn broadcast(&self, envelope: &Envelope) -> Result<Vec<Block>, OrderingError> {
        validate_envelope(envelope).map_err(|e| OrderingError::Malformed(e.to_string()))?;
        let payload = envelope
            .open()
            .map_err(|e| OrderingError::Malformed(e.to_string()))?;
        validate_payload(&payload).map_err(|e| OrderingError::Malformed(e.to_string()))?;
        let header = &payload.header;
        if header.message_type != MessageType::EndorserTransaction {
            return Err(OrderingError::InvalidMessageType(header.message_type));
        }

        let record = self.record(&header.channel_id)?;
        let msp = self.deps.msp.as_ref();
        let creator = msp.verify_creator(&header.creator, &envelope.payload, &envelope.signature)?;
        let signer = msp.authorize(&creator, &record.members)?;
        if !record.config.evaluate_policy(WRITERS_POLICY, &[signer]) {
            warn!(
                channel = %header.channel_id,
                creator = %header.creator.msp_id,
                "[pc-05] writers policy not satisfied"
            );
            return Err(OrderingError::Forbidden(format!(
                "{} does not satisfy the {} policy of {}",
                header.creator.msp_id, WRITERS_POLICY, header.channel_id
            )));
        }

        let tx = marshal(envelope)?;
        let cutter = self.cutter(&record);
        let mut cutter = cutter.lock();
        let batches = cutter.ordered(tx, Instant::now());
        debug!(
            channel = %header.channel_id,
            tx_id = %header.tx_id,
            pending = cutter.pending_len(),
            "[pc-05] transaction enqueued"
        );
        // The transaction is queued either way; a failed write is retried.
        Ok(self
            .write_batches(&header.channel_id, &mut cutter, batches)
            .unwrap_or_default())
    }

    fn channel_height(&self, channel_id: &str) -> Result<u64, OrderingError> {
        self.record(channel_id)?;
        Ok(self.deps.store.height(channel_id)?)
    }

    fn block_range(
        &self,
        channel_id: &str,
        start: u64,
        end: u64,
    ) -> Result<Vec<Block>, OrderingError> {
        if start > end {
            return Err(OrderingError::InvalidRange { start, end });
        }
        let height = self.channel_height(channel_id)?;
        let end = end.min(height).min(start.saturating_add(MAX_RANGE_BATCH));
        if start >= end {
            return Ok(Vec::new());
        }
        Ok(self.deps.store.get_block_range(channel_id, start, end)?)
    }

    fn list_channels(&self) -> Vec<String> {
        self.deps.table.list()
    }
}

/// Position in one channel's block sequence for a deliver stream.
pub struct DeliverCursor {
    channel_id: String,
    next: u64,
    store: Arc<dyn BlockStore>,
    subscription: Subscription,
}

impl DeliverCursor {
    pub fn channel_id(&self) -> &str {
        &self.channel_id
    }

    /// Number of the block `next_block` returns next.
    pub fn position(&self) -> u64 {
        self.next
    }

    /// Wait for the next block. Stored blocks are replayed from disk; live
    /// blocks come from the bus, and any gap or lag is refilled from disk.
    pub async fn next_block(&mut self) -> Result<Block, OrderingError> {
        loop {
            if self.next < self.store.height(&self.channel_id)? {
                let block = self.store.get_block(&self.channel_id, self.next)?;
                self.next += 1;
                return Ok(block);
            }
            match self.subscription.recv().await {
                Ok(event) if event.number() == self.next => {
                    self.next += 1;
                    return Ok(event.block.as_ref().clone());
                }
                // Already sent, or ahead of us: storage has what we need.
                Ok(_) => continue,
                Err(SubscriptionError::Lagged(skipped)) => {
                    debug!(channel = %self.channel_id, skipped, "[pc-05] deliver lagged, refilling");
                    continue;
                }
                Err(SubscriptionError::Closed) => return Err(OrderingError::StreamClosed),
            }
        }
    }
}
