//! # File Block Store
//!
//! `BlockStore` over one directory per channel and one file per block:
//!
//! ```text
//! <root>/LOCK
//! <root>/<channel>/00000000000000000000.block
//! <root>/<channel>/00000000000000000001.block
//! ```
//!
//! Every write goes to `<file>.tmp`, is fsynced, then renamed into place,
//! so a final name never points at a partial record. In-memory
//! bookkeeping is advanced only after the rename succeeds.

use crate::adapters::filesystem::StdFileSystem;
use crate::adapters::infra::{Crc32Checksum, SystemTimeSource};
use crate::adapters::lock::DirectoryLock;
use crate::domain::errors::StorageError;
use crate::domain::ledger::ChannelLedger;
use crate::domain::record::StoredBlockRecord;
use crate::domain::{block_file_name, parse_block_file_name, TEMP_SUFFIX};
use crate::ports::inbound::BlockStore;
use crate::ports::outbound::{BlockFileSystem, ChecksumProvider, TimeSource};
use parking_lot::RwLock;
use shared_types::{calculate_block_hash, validate_channel_id, Block};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info, warn};

#[cfg(test)]
mod tests;

/// Dependencies of `FileBlockStore`.
pub struct StorageDependencies {
    pub fs: Arc<dyn BlockFileSystem>,
    pub checksum: Arc<dyn ChecksumProvider>,
    pub time: Arc<dyn TimeSource>,
}

impl Default for StorageDependencies {
    fn default() -> Self {
        Self {
            fs: Arc::new(StdFileSystem),
            checksum: Arc::new(Crc32Checksum),
            time: Arc::new(SystemTimeSource),
        }
    }
}

pub struct FileBlockStore {
    root: PathBuf,
    deps: StorageDependencies,
    channels: RwLock<HashMap<String, ChannelLedger>>,
    _lock: DirectoryLock,
}

impl FileBlockStore {
    /// Open (and recover) the store at `root` with production adapters.
    pub fn open(root: impl AsRef<Path>) -> Result<Self, StorageError> {
        Self::open_with(root, StorageDependencies::default())
    }

    pub fn open_with(
        root: impl AsRef<Path>,
        deps: StorageDependencies,
    ) -> Result<Self, StorageError> {
        let root = root.as_ref().to_path_buf();
        let lock = DirectoryLock::acquire(&root)?;
        let store = Self {
            root,
            deps,
            channels: RwLock::new(HashMap::new()),
            _lock: lock,
        };
        store.recover()?;
        Ok(store)
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn channel_dir(&self, channel_id: &str) -> PathBuf {
        self.root.join(channel_id)
    }

    fn block_path(&self, channel_id: &str, number: u64) -> PathBuf {
        self.channel_dir(channel_id).join(block_file_name(number))
    }

    // =========================================================================
    // RECOVERY
    // =========================================================================

    /// Rebuild heights, last hashes and committed flags from disk.
    ///
    /// Temp files are removed. Each channel's height is the longest
    /// contiguous, hash-linked prefix of readable records starting at 0;
    /// anything past the first unreadable or unlinked record is logged and
    /// ignored.
    fn recover(&self) -> Result<(), StorageError> {
        let fs = &self.deps.fs;
        let mut recovered = HashMap::new();

        for entry in fs.read_dir(&self.root)? {
            if !entry.is_dir {
                continue;
            }
            if validate_channel_id(&entry.name).is_err() {
                warn!(dir = %entry.path.display(), "[pc-02] skipping non-channel directory");
                continue;
            }
            let ledger = self.recover_channel(&entry.name, &entry.path)?;
            if ledger.height > 0 {
                info!(
                    channel = %entry.name,
                    height = ledger.height,
                    "[pc-02] channel recovered"
                );
                recovered.insert(entry.name, ledger);
            }
        }

        *self.channels.write() = recovered;
        Ok(())
    }

    fn recover_channel(&self, channel_id: &str, dir: &Path) -> Result<ChannelLedger, StorageError> {
        let fs = &self.deps.fs;
        let mut numbers = Vec::new();
        for file in fs.read_dir(dir)? {
            if file.is_dir {
                continue;
            }
            if file.name.ends_with(TEMP_SUFFIX) {
                debug!(file = %file.path.display(), "[pc-02] removing leftover temp file");
                if let Err(e) = fs.remove_file(&file.path) {
                    warn!(file = %file.path.display(), error = %e, "[pc-02] temp file removal failed");
                }
                continue;
            }
            if let Some(n) = parse_block_file_name(&file.name) {
                numbers.push(n);
            }
        }
        numbers.sort_unstable();

        let mut ledger = ChannelLedger::default();
        for number in numbers {
            if number != ledger.height {
                warn!(
                    channel = channel_id,
                    expected = ledger.height,
                    found = number,
                    "[pc-02] gap in block files, ignoring the rest"
                );
                break;
            }
            let path = dir.join(block_file_name(number));
            let record = match self.read_record_at(&path) {
                Ok(r) => r,
                Err(e) => {
                    warn!(channel = channel_id, number, error = %e, "[pc-02] unreadable block skipped");
                    break;
                }
            };
            let links = if number == 0 {
                record.block.header.previous_hash.is_empty()
            } else {
                record.block.header.previous_hash == ledger.last_hash
            };
            if !links || record.block.header.number != number {
                warn!(channel = channel_id, number, "[pc-02] block does not chain, ignoring the rest");
                break;
            }
            ledger.append(record.block_hash.clone(), record.committed);
        }
        Ok(ledger)
    }

    // =========================================================================
    // FILE I/O
    // =========================================================================

    fn read_record_at(&self, path: &Path) -> Result<StoredBlockRecord, StorageError> {
        let bytes = self.deps.fs.read(path)?;
        StoredBlockRecord::decode(&bytes, self.deps.checksum.as_ref()).map_err(|reason| {
            StorageError::Corruption {
                path: path.to_path_buf(),
                reason,
            }
        })
    }

    /// Temp write, fsync, rename, directory fsync. A failure before the
    /// rename removes the temp file and leaves nothing under the final name.
    /// Once the rename succeeds the record is visible and recovery will load
    /// it, so a failed directory fsync is logged and the write counts as done.
    fn write_record(&self, path: &Path, record: &StoredBlockRecord) -> Result<(), StorageError> {
        let fs = &self.deps.fs;
        let bytes = record.encode(self.deps.checksum.as_ref())?;
        let mut tmp = path.as_os_str().to_owned();
        tmp.push(TEMP_SUFFIX);
        let tmp = PathBuf::from(tmp);

        if let Err(e) = fs.write_file(&tmp, &bytes) {
            let _ = fs.remove_file(&tmp);
            return Err(e.into());
        }
        if let Err(e) = fs.rename(&tmp, path) {
            let _ = fs.remove_file(&tmp);
            return Err(e.into());
        }
        if let Some(dir) = path.parent() {
            if let Err(e) = fs.sync_dir(dir) {
                warn!(
                    file = %path.display(),
                    error = %e,
                    "[pc-02] record renamed into place but directory sync failed"
                );
            }
        }
        Ok(())
    }

    fn channel_error(channel_id: &str) -> StorageError {
        StorageError::ChannelNotFound {
            channel: channel_id.to_string(),
        }
    }
}

impl BlockStore for FileBlockStore {
    fn store_block(&self, channel_id: &str, block: &Block) -> Result<(), StorageError> {
        validate_channel_id(channel_id).map_err(|e| StorageError::InvalidChannelId {
            reason: e.to_string(),
        })?;
        let number = block.header.number;
        let hash = calculate_block_hash(block);
        if block.header.hash != hash {
            return Err(StorageError::HashMismatch {
                channel: channel_id.to_string(),
                number,
            });
        }

        // Exclusive for the whole check-write-update section.
        let mut channels = self.channels.write();
        let (height, last_hash) = channels
            .get(channel_id)
            .map(|l| (l.height, l.last_hash.clone()))
            .unwrap_or((0, Vec::new()));

        if number < height {
            return Err(StorageError::BlockExists {
                channel: channel_id.to_string(),
                number,
            });
        }
        if number > height {
            return Err(StorageError::NonSequential {
                channel: channel_id.to_string(),
                expected: height,
                got: number,
            });
        }
        if block.header.previous_hash != last_hash {
            return Err(StorageError::PreviousHashMismatch {
                channel: channel_id.to_string(),
                number,
            });
        }

        self.deps.fs.create_dir_all(&self.channel_dir(channel_id))?;
        let record = StoredBlockRecord {
            channel_id: channel_id.to_string(),
            stored_at: self.deps.time.now(),
            committed: false,
            block_hash: hash.to_vec(),
            block: block.clone(),
        };
        self.write_record(&self.block_path(channel_id, number), &record)?;

        channels
            .entry(channel_id.to_string())
            .or_default()
            .append(hash.to_vec(), false);
        debug!(
            channel = channel_id,
            number,
            hash = %hex::encode(&hash[..8]),
            "[pc-02] block stored"
        );
        Ok(())
    }

    fn get_block(&self, channel_id: &str, number: u64) -> Result<Block, StorageError> {
        Ok(self.get_record(channel_id, number)?.block)
    }

    fn get_block_range(
        &self,
        channel_id: &str,
        start: u64,
        end: u64,
    ) -> Result<Vec<Block>, StorageError> {
        if start > end {
            return Err(StorageError::InvalidRange { start, end });
        }
        (start..end)
            .map(|number| self.get_block(channel_id, number))
            .collect()
    }

    fn get_record(&self, channel_id: &str, number: u64) -> Result<StoredBlockRecord, StorageError> {
        let height = self.height(channel_id)?;
        if number >= height {
            return Err(StorageError::NotFound {
                channel: channel_id.to_string(),
                number,
            });
        }
        let path = self.block_path(channel_id, number);
        if !self.deps.fs.exists(&path) {
            return Err(StorageError::NotFound {
                channel: channel_id.to_string(),
                number,
            });
        }
        self.read_record_at(&path)
    }

    fn mark_committed(&self, channel_id: &str, number: u64) -> Result<(), StorageError> {
        let mut channels = self.channels.write();
        let ledger = channels
            .get_mut(channel_id)
            .ok_or_else(|| Self::channel_error(channel_id))?;
        if number >= ledger.height {
            return Err(StorageError::NotFound {
                channel: channel_id.to_string(),
                number,
            });
        }
        if ledger.is_committed(number) {
            return Ok(());
        }

        let path = self.block_path(channel_id, number);
        let mut record = self.read_record_at(&path)?;
        record.committed = true;
        self.write_record(&path, &record)?;

        if let Some(flag) = usize::try_from(number)
            .ok()
            .and_then(|i| ledger.committed.get_mut(i))
        {
            *flag = true;
        }
        debug!(channel = channel_id, number, "[pc-02] block marked committed");
        Ok(())
    }

    fn is_committed(&self, channel_id: &str, number: u64) -> Result<bool, StorageError> {
        let channels = self.channels.read();
        let ledger = channels
            .get(channel_id)
            .ok_or_else(|| Self::channel_error(channel_id))?;
        if number >= ledger.height {
            return Err(StorageError::NotFound {
                channel: channel_id.to_string(),
                number,
            });
        }
        Ok(ledger.is_committed(number))
    }

    fn height(&self, channel_id: &str) -> Result<u64, StorageError> {
        self.channels
            .read()
            .get(channel_id)
            .map(|l| l.height)
            .ok_or_else(|| Self::channel_error(channel_id))
    }

    fn last_block_hash(&self, channel_id: &str) -> Result<Vec<u8>, StorageError> {
        self.channels
            .read()
            .get(channel_id)
            .map(|l| l.last_hash.clone())
            .ok_or_else(|| Self::channel_error(channel_id))
    }

    fn has_channel(&self, channel_id: &str) -> bool {
        self.channels.read().contains_key(channel_id)
    }

    fn channels(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.channels.read().keys().cloned().collect();
        ids.sort();
        ids
    }
}
