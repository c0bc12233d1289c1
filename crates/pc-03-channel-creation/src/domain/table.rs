//! # Channel Table
//!
//! The orderer's owned registry of channels. Readers run concurrently;
//! creation holds the write lock from the existence check to the insert so
//! two proposals for one name can never both commit.

use super::config_block::config_from_block;
use super::errors::ChannelCreationError;
use pc_01_msp::{MspError, OrganizationRegistry};
use pc_02_block_storage::BlockStore;
use parking_lot::RwLock;
use shared_types::entities::now_millis;
use shared_types::{ChannelConfig, Timestamp};
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{info, warn};

/// One live channel.
#[derive(Debug, Clone)]
pub struct ChannelRecord {
    pub config: ChannelConfig,
    /// Roots of the member organizations.
    pub members: OrganizationRegistry,
    pub created_at: Timestamp,
}

impl ChannelRecord {
    pub fn new(config: ChannelConfig) -> Result<Self, MspError> {
        let members = OrganizationRegistry::from_organizations(&config.application.organizations)?;
        Ok(Self {
            config,
            members,
            created_at: now_millis(),
        })
    }

    pub fn channel_id(&self) -> &str {
        &self.config.channel_id
    }
}

#[derive(Debug, Default)]
pub struct ChannelTable {
    channels: RwLock<BTreeMap<String, Arc<ChannelRecord>>>,
}

impl ChannelTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reload every channel whose block 0 is on disk.
    ///
    /// Every stored block on the orderer is final, so commit marks that
    /// were not written before a failure or restart are finished here.
    pub fn rebuild(store: &dyn BlockStore) -> Result<Self, ChannelCreationError> {
        let table = Self::new();
        for channel_id in store.channels() {
            finish_commits(store, &channel_id)?;
            let genesis = store.get_block(&channel_id, 0)?;
            let config = config_from_block(&genesis)
                .map_err(|e| ChannelCreationError::MalformedBlock(e.to_string()))?;
            table.insert(ChannelRecord::new(config)?)?;
        }
        info!(channels = table.len(), "[pc-03] channel table rebuilt");
        Ok(table)
    }

    pub fn contains(&self, channel_id: &str) -> bool {
        self.channels.read().contains_key(channel_id)
    }

    pub fn get(&self, channel_id: &str) -> Option<Arc<ChannelRecord>> {
        self.channels.read().get(channel_id).cloned()
    }

    /// Channel names in sorted order.
    pub fn list(&self) -> Vec<String> {
        self.channels.read().keys().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.channels.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.channels.read().is_empty()
    }

    pub fn insert(&self, record: ChannelRecord) -> Result<(), ChannelCreationError> {
        let mut channels = self.channels.write();
        let channel_id = record.channel_id().to_string();
        if channels.contains_key(&channel_id) {
            return Err(ChannelCreationError::AlreadyExists(channel_id));
        }
        channels.insert(channel_id, Arc::new(record));
        Ok(())
    }

    /// Run `commit` under the write lock if `channel_id` is free, and insert
    /// the record it returns. Nothing is inserted when `commit` fails.
    pub fn try_create<T>(
        &self,
        channel_id: &str,
        commit: impl FnOnce() -> Result<(ChannelRecord, T), ChannelCreationError>,
    ) -> Result<T, ChannelCreationError> {
        let mut channels = self.channels.write();
        if channels.contains_key(channel_id) {
            return Err(ChannelCreationError::AlreadyExists(channel_id.to_string()));
        }
        let (record, output) = commit()?;
        channels.insert(channel_id.to_string(), Arc::new(record));
        Ok(output)
    }
}

fn finish_commits(store: &dyn BlockStore, channel_id: &str) -> Result<(), ChannelCreationError> {
    for number in 0..store.height(channel_id)? {
        if store.is_committed(channel_id, number)? {
            continue;
        }
        match store.mark_committed(channel_id, number) {
            Ok(()) => info!(channel = channel_id, number, "[pc-03] finished commit mark"),
            Err(e) => warn!(
                channel = channel_id,
                number,
                error = %e,
                "[pc-03] commit mark still failing"
            ),
        }
    }
    Ok(())
}
