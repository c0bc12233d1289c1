//! # Inbound Ports

use crate::domain::errors::ChannelCreationError;
use shared_types::{Block, Envelope};

/// Orderer-side channel creation.
pub trait ChannelCreationApi: Send + Sync {
    /// Verify and commit one proposal, returning the genesis config block.
    fn handle_proposal(&self, envelope: &Envelope) -> Result<Block, ChannelCreationError>;

    fn channel_exists(&self, channel_id: &str) -> bool;

    fn list_channels(&self) -> Vec<String>;
}
