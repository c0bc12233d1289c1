//! # Channel Manager
//!
//! The peer's owned table of joined channels. Each entry tracks the local
//! chain tip and the configuration in force, folded block by block.
//!
//! Apply order for every block: validate, store, fold, mark committed. A
//! crash after the store but before the commit mark is completed by
//! `rebuild` on the next start.

use super::errors::SyncError;
use crate::algorithms::{orderer_registry, validate_genesis, validate_next};
use pc_01_msp::OrganizationRegistry;
use pc_02_block_storage::BlockStore;
use pc_03_channel_creation::config_from_block;
use parking_lot::RwLock;
use shared_types::entities::now_millis;
use shared_types::{Block, ChannelConfig, Timestamp};
use std::collections::HashMap;
use std::time::Duration;
use tracing::{debug, info};

/// Local view of one joined channel.
#[derive(Debug, Clone)]
pub struct ChannelState {
    pub channel_id: String,
    /// Number of blocks applied.
    pub height: u64,
    pub last_hash: Vec<u8>,
    /// Configuration in force after the last config block.
    pub config: ChannelConfig,
    /// Roots allowed to sign blocks of this channel.
    pub orderer_roots: OrganizationRegistry,
    pub tx_count: u64,
    pub valid_tx_count: u64,
    /// Local time (ms) the last block was applied.
    pub last_block_at: Timestamp,
}

impl ChannelState {
    fn genesis(block: &Block, config: ChannelConfig) -> Result<Self, SyncError> {
        let orderer_roots = orderer_registry(&config).map_err(|e| {
            SyncError::invalid_block(&config.channel_id, 0, format!("orderer roots: {}", e))
        })?;
        let mut state = Self {
            channel_id: config.channel_id.clone(),
            height: 0,
            last_hash: Vec::new(),
            config,
            orderer_roots,
            tx_count: 0,
            valid_tx_count: 0,
            last_block_at: 0,
        };
        state.count(block);
        Ok(state)
    }

    fn count(&mut self, block: &Block) {
        let n = block.transaction_count();
        self.height = block.number() + 1;
        self.last_hash = block.header.hash.clone();
        self.tx_count += n as u64;
        self.valid_tx_count += (0..n)
            .filter(|&i| block.metadata.validation_bitmap.is_valid(i))
            .count() as u64;
        self.last_block_at = now_millis();
    }

    /// Fold a validated successor block into the state.
    fn fold(&mut self, block: &Block) -> Result<(), SyncError> {
        if block.is_config() {
            let config = config_from_block(block).map_err(|e| {
                SyncError::invalid_block(&self.channel_id, block.number(), e.to_string())
            })?;
            self.orderer_roots = orderer_registry(&config).map_err(|e| {
                SyncError::invalid_block(&self.channel_id, block.number(), e.to_string())
            })?;
            info!(
                channel = %self.channel_id,
                number = block.number(),
                sequence = config.sequence,
                "[pc-04] channel configuration updated"
            );
            self.config = config;
        }
        self.count(block);
        Ok(())
    }

    /// True when no block has been applied within `window` of `now` (ms).
    pub fn is_stale(&self, now: Timestamp, window: Duration) -> bool {
        now.saturating_sub(self.last_block_at) >= window.as_millis() as u64
    }
}

#[derive(Debug, Default)]
pub struct ChannelManager {
    channels: RwLock<HashMap<String, ChannelState>>,
}

impl ChannelManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuild from stored blocks, finishing any interrupted commit.
    pub fn rebuild(store: &dyn BlockStore) -> Result<Self, SyncError> {
        let manager = Self::new();
        for channel_id in store.channels() {
            let height = store.height(&channel_id)?;
            let genesis = store.get_block(&channel_id, 0)?;
            let config = config_from_block(&genesis)
                .map_err(|e| SyncError::invalid_block(&channel_id, 0, e.to_string()))?;
            let mut state = ChannelState::genesis(&genesis, config)?;
            finish_commit(store, &channel_id, 0)?;
            for number in 1..height {
                let block = store.get_block(&channel_id, number)?;
                state.fold(&block)?;
                finish_commit(store, &channel_id, number)?;
            }
            info!(channel = %channel_id, height, "[pc-04] channel restored");
            manager.channels.write().insert(channel_id, state);
        }
        Ok(manager)
    }

    /// Join a channel from its genesis config block.
    pub fn join(&self, store: &dyn BlockStore, block: &Block) -> Result<String, SyncError> {
        let channel_id = config_from_block(block)
            .map_err(|e| SyncError::invalid_block("<unknown>", block.number(), e.to_string()))?
            .channel_id;
        let config = validate_genesis(&channel_id, block)?;

        let mut channels = self.channels.write();
        if channels.contains_key(&channel_id) {
            return Err(SyncError::AlreadyJoined(channel_id));
        }
        store.store_block(&channel_id, block)?;
        channels.insert(channel_id.clone(), ChannelState::genesis(block, config)?);
        drop(channels);

        store.mark_committed(&channel_id, 0)?;
        info!(channel = %channel_id, "[pc-04] channel joined");
        Ok(channel_id)
    }

    /// Validate, store, fold and commit the next block of `channel_id`.
    pub fn apply(
        &self,
        store: &dyn BlockStore,
        channel_id: &str,
        block: &Block,
    ) -> Result<(), SyncError> {
        {
            let channels = self.channels.read();
            let state = channels
                .get(channel_id)
                .ok_or_else(|| SyncError::ChannelNotFound(channel_id.to_string()))?;
            validate_next(state, block)?;
        }

        store.store_block(channel_id, block)?;
        {
            let mut channels = self.channels.write();
            let state = channels
                .get_mut(channel_id)
                .ok_or_else(|| SyncError::ChannelNotFound(channel_id.to_string()))?;
            state.fold(block)?;
        }
        store.mark_committed(channel_id, block.number())?;
        debug!(channel = channel_id, number = block.number(), "[pc-04] block applied");
        Ok(())
    }

    pub fn contains(&self, channel_id: &str) -> bool {
        self.channels.read().contains_key(channel_id)
    }

    pub fn height(&self, channel_id: &str) -> Option<u64> {
        self.channels.read().get(channel_id).map(|s| s.height)
    }

    pub fn state(&self, channel_id: &str) -> Option<ChannelState> {
        self.channels.read().get(channel_id).cloned()
    }

    /// Joined channels, sorted.
    pub fn channels(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.channels.read().keys().cloned().collect();
        ids.sort();
        ids
    }

    pub fn is_stale(&self, channel_id: &str, now: Timestamp, window: Duration) -> bool {
        self.channels
            .read()
            .get(channel_id)
            .is_some_and(|s| s.is_stale(now, window))
    }
}

fn finish_commit(store: &dyn BlockStore, channel_id: &str, number: u64) -> Result<(), SyncError> {
    if !store.is_committed(channel_id, number)? {
        info!(channel = channel_id, number, "[pc-04] completing interrupted commit");
        store.mark_committed(channel_id, number)?;
    }
    Ok(())
}
