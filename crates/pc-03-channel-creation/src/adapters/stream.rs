//! # Framed Proposal Stream
//!
//! `ProposalStream` over a framed connection: each inbound frame is an
//! `Envelope`, each outbound frame a `ChannelCreationResponse`.

use crate::domain::errors::StreamError;
use crate::ports::outbound::ProposalStream;
use async_trait::async_trait;
use shared_bus::{FramedConnection, WireError};
use shared_types::rpc::ChannelCreationResponse;
use shared_types::Envelope;
use tokio::io::{AsyncRead, AsyncWrite};

#[async_trait]
impl<S> ProposalStream for FramedConnection<S>
where
    S: AsyncRead + AsyncWrite + Unpin + Send,
{
    async fn next_proposal(&mut self) -> Result<Option<Envelope>, StreamError> {
        match self.recv::<Envelope>().await {
            Ok(next) => Ok(next),
            Err(WireError::Decode(reason)) => Err(StreamError::Malformed(reason)),
            Err(e) => Err(StreamError::Transport(e.to_string())),
        }
    }

    async fn respond(&mut self, response: ChannelCreationResponse) -> Result<(), StreamError> {
        self.send(&response)
            .await
            .map_err(|e| StreamError::Transport(e.to_string()))
    }
}

/// Client side: send one proposal on an open creation stream and wait for
/// its acknowledgement.
pub async fn submit_proposal<S>(
    conn: &mut FramedConnection<S>,
    envelope: &Envelope,
) -> Result<ChannelCreationResponse, WireError>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    conn.call(envelope).await
}
