//! # Block Synchronizer
//!
//! ```text
//! Idle -> InitialSync (all channels) -> PeriodicCheck <-> StreamingFollow
//! ```
//!
//! Every path that applies blocks to a channel takes that channel's async
//! lock first, so catch-up passes and the follow stream never interleave
//! on one chain. Channels never wait on each other.

use crate::algorithms::next_batch;
use crate::config::SyncConfig;
use crate::domain::{ChannelManager, SyncError, SyncReport};
use crate::ports::{BlockSyncApi, OrdererConnection};
use async_trait::async_trait;
use futures::StreamExt;
use pc_02_block_storage::BlockStore;
use parking_lot::Mutex;
use shared_types::entities::now_millis;
use shared_types::Block;
use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};


pub struct BlockSynchronizer<O: OrdererConnection> {
    config: SyncConfig,
    orderer: Arc<O>,
    store: Arc<dyn BlockStore>,
    channels: Arc<ChannelManager>,
    locks: Mutex<HashMap<String, Arc<tokio::sync::Mutex<()>>>>,
}

impl<O: OrdererConnection + 'static> BlockSynchronizer<O> {
    pub fn new(
        config: SyncConfig,
        orderer: Arc<O>,
        store: Arc<dyn BlockStore>,
        channels: Arc<ChannelManager>,
    ) -> Self {
        Self {
            config,
            orderer,
            store,
            channels,
            locks: Mutex::new(HashMap::new()),
        }
    }

    pub fn channel_manager(&self) -> &Arc<ChannelManager> {
        &self.channels
    }

    pub fn config(&self) -> &SyncConfig {
        &self.config
    }

    fn channel_lock(&self, channel_id: &str) -> Arc<tokio::sync::Mutex<()>> {
        Arc::clone(
            self.locks
                .lock()
                .entry(channel_id.to_string())
                .or_default(),
        )
    }

    /// Run `call` with the RPC deadline, retrying transient failures.
    async fn with_retry<T, F, Fut>(&self, what: &str, mut call: F) -> Result<T, SyncError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, SyncError>>,
    {
        let attempts = self.config.max_attempts.max(1);
        let mut last = SyncError::Unavailable(what.to_string());
        for attempt in 1..=attempts {
            let err = match tokio::time::timeout(self.config.rpc_timeout(), call()).await {
                Ok(Ok(value)) => return Ok(value),
                Ok(Err(e)) if !e.is_transient() => return Err(e),
                Ok(Err(e)) => e,
                Err(_) => SyncError::Timeout(what.to_string()),
            };
            warn!(
                orderer = self.orderer.endpoint(),
                attempt,
                attempts,
                error = %err,
                "[pc-04] {} failed",
                what
            );
            last = err;
            if attempt < attempts {
                tokio::time::sleep(self.config.retry_delay()).await;
            }
        }
        Err(SyncError::RetriesExhausted {
            what: what.to_string(),
            attempts,
            last: Box::new(last),
        })
    }

    /// Apply blocks from a range or stream, skipping ones already held.
    fn apply_blocks(&self, channel_id: &str, blocks: &[Block]) -> Result<u64, SyncError> {
        let mut applied = 0;
        for block in blocks {
            let height = self.channels.height(channel_id).unwrap_or_default();
            if block.number() < height {
                continue;
            }
            if let Err(e) = self.channels.apply(self.store.as_ref(), channel_id, block) {
                error!(
                    channel = channel_id,
                    number = block.number(),
                    error = %e,
                    "[pc-04] block rejected"
                );
                return Err(e);
            }
            applied += 1;
        }
        Ok(applied)
    }

    async fn catch_up(&self, channel_id: &str) -> Result<SyncReport, SyncError> {
        if !self.channels.contains(channel_id) {
            return Err(SyncError::ChannelNotFound(channel_id.to_string()));
        }
        let lock = self.channel_lock(channel_id);
        let _guard = lock.lock().await;

        let from_height = self.channels.height(channel_id).unwrap_or_default();
        let remote_height = self
            .with_retry("channel height", || self.orderer.channel_height(channel_id))
            .await?;

        if remote_height > from_height {
            info!(
                channel = channel_id,
                local = from_height,
                remote = remote_height,
                "[pc-04] channel behind orderer, catching up"
            );
        }

        // Each request starts at the local height: replies may be short.
        loop {
            let height = self.channels.height(channel_id).unwrap_or_default();
            let Some(range) = next_batch(height, remote_height, self.config.batch_size) else {
                break;
            };
            let (start, end) = (range.start, range.end);
            let blocks = self
                .with_retry("block range", || {
                    self.orderer.block_range(channel_id, start, end)
                })
                .await?;
            if blocks.is_empty() {
                return Err(SyncError::Protocol(format!(
                    "orderer returned no blocks for [{}, {})",
                    start, end
                )));
            }
            if self.apply_blocks(channel_id, &blocks)? == 0 {
                return Err(SyncError::Protocol(format!(
                    "reply for [{}, {}) holds no block at or above {}",
                    start, end, height
                )));
            }
        }

        let report = SyncReport {
            channel_id: channel_id.to_string(),
            from_height,
            to_height: self.channels.height(channel_id).unwrap_or_default(),
            remote_height,
        };
        debug!(
            channel = channel_id,
            applied = report.blocks_applied(),
            height = report.to_height,
            "[pc-04] catch-up pass finished"
        );
        Ok(report)
    }

    /// Catch up every channel whose last block is older than the staleness
    /// window. Returns the channels that were checked.
    pub async fn check_stale(&self) -> Vec<String> {
        let now = now_millis();
        let window = self.config.staleness_window();
        let stale: Vec<String> = self
            .channels
            .channels()
            .into_iter()
            .filter(|c| self.channels.is_stale(c, now, window))
            .collect();
        for channel_id in &stale {
            if let Err(e) = self.catch_up(channel_id).await {
                warn!(channel = %channel_id, error = %e, "[pc-04] periodic catch-up failed");
            }
        }
        stale
    }

    /// Follow the deliver stream of `channel_id` until shutdown, reopening
    /// it from the local height after every failure.
    pub async fn follow_channel(&self, channel_id: &str, mut shutdown: watch::Receiver<bool>) {
        let retry = self.config.stream_retry_delay();
        loop {
            if *shutdown.borrow() {
                break;
            }
            let start = self.channels.height(channel_id).unwrap_or_default();
            let opened = tokio::select! {
                opened = self.orderer.open_deliver(channel_id, start) => opened,
                _ = shutdown.changed() => break,
            };
            match opened {
                Ok(mut stream) => {
                    debug!(channel = channel_id, start, "[pc-04] deliver stream opened");
                    loop {
                        let item = tokio::select! {
                            item = stream.next() => item,
                            _ = shutdown.changed() => return,
                        };
                        match item {
                            Some(Ok(block)) => {
                                let lock = self.channel_lock(channel_id);
                                let _guard = lock.lock().await;
                                let height =
                                    self.channels.height(channel_id).unwrap_or_default();
                                if block.number() > height {
                                    debug!(
                                        channel = channel_id,
                                        number = block.number(),
                                        height,
                                        "[pc-04] gap in deliver stream, reopening"
                                    );
                                    break;
                                }
                                if self.apply_blocks(channel_id, &[block]).is_err() {
                                    break;
                                }
                            }
                            Some(Err(e)) => {
                                warn!(
                                    channel = channel_id,
                                    error = %e,
                                    "[pc-04] deliver stream failed"
                                );
                                break;
                            }
                            None => {
                                debug!(channel = channel_id, "[pc-04] deliver stream ended");
                                break;
                            }
                        }
                    }
                }
                Err(e) => {
                    warn!(channel = channel_id, error = %e, "[pc-04] cannot open deliver stream");
                }
            }
            tokio::select! {
                _ = tokio::time::sleep(retry) => {}
                _ = shutdown.changed() => break,
            }
        }
        debug!(channel = channel_id, "[pc-04] follow worker stopped");
    }

    /// Spawn the follow worker of one channel.
    pub fn spawn_follow(
        self: &Arc<Self>,
        channel_id: &str,
        shutdown: watch::Receiver<bool>,
    ) -> JoinHandle<()> {
        let service = Arc::clone(self);
        let channel_id = channel_id.to_string();
        tokio::spawn(async move { service.follow_channel(&channel_id, shutdown).await })
    }

    /// Spawn the periodic staleness check.
    pub fn spawn_periodic_check(
        self: &Arc<Self>,
        mut shutdown: watch::Receiver<bool>,
    ) -> JoinHandle<()> {
        let service = Arc::clone(self);
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(service.config.check_interval());
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            // The first tick fires immediately; initial sync already covered it.
            ticker.tick().await;
            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        service.check_stale().await;
                    }
                    changed = shutdown.changed() => {
                        if changed.is_err() || *shutdown.borrow() {
                            debug!("[pc-04] periodic check stopped");
                            return;
                        }
                    }
                }
            }
        })
    }

    /// One follow worker per joined channel plus the periodic check.
    pub fn spawn_workers(
        self: &Arc<Self>,
        shutdown: watch::Receiver<bool>,
    ) -> Vec<JoinHandle<()>> {
        let mut handles: Vec<JoinHandle<()>> = self
            .channels
            .channels()
            .iter()
            .map(|c| self.spawn_follow(c, shutdown.clone()))
            .collect();
        handles.push(self.spawn_periodic_check(shutdown));
        info!(workers = handles.len(), "[pc-04] sync workers started");
        handles
    }
}

#[async_trait]
impl<O: OrdererConnection + 'static> BlockSyncApi for BlockSynchronizer<O> {
    async fn join_channel(&self, genesis: &Block) -> Result<String, SyncError> {
        self.channels.join(self.store.as_ref(), genesis)
    }

    async fn sync_channel(&self, channel_id: &str) -> Result<SyncReport, SyncError> {
        self.catch_up(channel_id).await
    }

    async fn initial_sync(&self) -> Vec<(String, Result<SyncReport, SyncError>)> {
        let channels = self.channels.channels();
        let results =
            futures::future::join_all(channels.iter().map(|c| self.catch_up(c))).await;
        channels
            .into_iter()
            .zip(results)
            .inspect(|(channel, result)| match result {
                Ok(report) => info!(
                    channel = %channel,
                    height = report.to_height,
                    applied = report.blocks_applied(),
                    "[pc-04] initial sync done"
                ),
                Err(e) => error!(channel = %channel, error = %e, "[pc-04] initial sync failed"),
            })
            .collect()
    }

    fn channel_height(&self, channel_id: &str) -> Option<u64> {
        self.channels.height(channel_id)
    }

    fn channels(&self) -> Vec<String> {
        self.channels.channels()
    }
}
