//! # Channel Ledger Bookkeeping
//!
//! In-memory view of one channel's stored prefix, rebuilt from disk at
//! startup and advanced only after a successful write.

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChannelLedger {
    /// Next block number to store.
    pub height: u64,
    /// Hash of block `height - 1`.
    pub last_hash: Vec<u8>,
    /// Committed flag per stored block, indexed by block number.
    pub committed: Vec<bool>,
}

impl ChannelLedger {
    pub fn append(&mut self, hash: Vec<u8>, committed: bool) {
        self.height += 1;
        self.last_hash = hash;
        self.committed.push(committed);
    }

    pub fn is_committed(&self, number: u64) -> bool {
        usize::try_from(number)
            .ok()
            .and_then(|i| self.committed.get(i).copied())
            .unwrap_or(false)
    }
}
