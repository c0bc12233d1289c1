//! # Outbound Ports

use crate::domain::errors::StreamError;
use async_trait::async_trait;
use shared_types::rpc::ChannelCreationResponse;
use shared_types::Envelope;

/// Bidirectional stream of proposals and their acknowledgements.
#[async_trait]
pub trait ProposalStream: Send {
    /// Next proposal, or `None` once the client has closed the stream.
    async fn next_proposal(&mut self) -> Result<Option<Envelope>, StreamError>;

    async fn respond(&mut self, response: ChannelCreationResponse) -> Result<(), StreamError>;
}
