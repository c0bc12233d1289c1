//! # RPC Client
//!
//! Outbound calls from a node or an operator. Every call runs under a
//! deadline: expiry is `Timeout`, connect and I/O failures `Unavailable`.

use crate::container::NodeError;
use pc_03_channel_creation::submit_proposal;
use serde::{de::DeserializeOwned, Serialize};
use shared_bus::FramedConnection;
use shared_types::rpc::{ChannelCreationResponse, OrdererRequest};
use shared_types::Envelope;
use std::future::Future;
use std::time::Duration;

async fn with_deadline<T, F>(what: &str, deadline: Duration, call: F) -> Result<T, NodeError>
where
    F: Future<Output = Result<T, NodeError>>,
{
    tokio::time::timeout(deadline, call)
        .await
        .map_err(|_| NodeError::Timeout(what.to_string()))?
}

/// One request, one response, on a fresh connection.
pub async fn call<Req, Resp>(addr: &str, request: &Req, deadline: Duration) -> Result<Resp, NodeError>
where
    Req: Serialize + Sync,
    Resp: DeserializeOwned,
{
    with_deadline(&format!("call to {}", addr), deadline, async {
        let mut conn = FramedConnection::connect(addr).await?;
        Ok(conn.call(request).await?)
    })
    .await
}

/// Open a channel-creation stream on the orderer and submit one proposal.
pub async fn submit_channel_proposal(
    addr: &str,
    envelope: &Envelope,
    deadline: Duration,
) -> Result<ChannelCreationResponse, NodeError> {
    with_deadline(&format!("channel creation at {}", addr), deadline, async {
        let mut conn = FramedConnection::connect(addr).await?;
        conn.send(&OrdererRequest::OpenChannelCreation).await?;
        Ok(submit_proposal(&mut conn, envelope).await?)
    })
    .await
}
