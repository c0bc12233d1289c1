//! # Sync Reports

/// Outcome of one catch-up pass over a channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncReport {
    pub channel_id: String,
    /// Local height before the pass.
    pub from_height: u64,
    /// Local height after the pass.
    pub to_height: u64,
    /// Height reported by the orderer.
    pub remote_height: u64,
}

impl SyncReport {
    pub fn blocks_applied(&self) -> u64 {
        self.to_height - self.from_height
    }

    pub fn is_caught_up(&self) -> bool {
        self.to_height >= self.remote_height
    }
}
