//! # TCP Orderer Client
//!
//! `OrdererConnection` over framed TCP. Each unary call uses its own
//! connection and runs under a deadline; a deliver stream keeps its
//! connection for as long as the stream lives.

use crate::domain::SyncError;
use crate::ports::{BlockStream, OrdererConnection};
use async_trait::async_trait;
use futures::StreamExt;
use shared_bus::{FramedConnection, WireError};
use shared_types::rpc::{OrdererRequest, OrdererResponse};
use shared_types::{Block, StatusCode};
use std::future::Future;
use std::time::Duration;
use tracing::debug;

pub struct TcpOrdererClient {
    address: String,
    timeout: Duration,
}

impl TcpOrdererClient {
    pub fn new(address: impl Into<String>, timeout: Duration) -> Self {
        Self {
            address: address.into(),
            timeout,
        }
    }

    async fn deadline<T, F>(&self, what: &str, call: F) -> Result<T, SyncError>
    where
        F: Future<Output = Result<T, SyncError>>,
    {
        tokio::time::timeout(self.timeout, call)
            .await
            .map_err(|_| SyncError::Timeout(format!("{} to {}", what, self.address)))?
    }

    async fn call(&self, request: OrdererRequest) -> Result<OrdererResponse, SyncError> {
        let mut conn = FramedConnection::connect(&self.address)
            .await
            .map_err(wire_error)?;
        conn.call(&request).await.map_err(wire_error)
    }
}

/// Connect/IO failures are `Unavailable`, undecodable frames `Protocol`.
pub fn wire_error(err: WireError) -> SyncError {
    match err {
        WireError::Io(e) => SyncError::Unavailable(e.to_string()),
        WireError::Closed => SyncError::Unavailable("connection closed".into()),
        WireError::Encode(e) | WireError::Decode(e) => SyncError::Protocol(e),
    }
}

fn unexpected(response: OrdererResponse) -> SyncError {
    match response {
        OrdererResponse::Error { status, message } => SyncError::Remote { status, message },
        other => SyncError::Protocol(format!("unexpected response: {:?}", other)),
    }
}

#[async_trait]
impl OrdererConnection for TcpOrdererClient {
    async fn channel_height(&self, channel_id: &str) -> Result<u64, SyncError> {
        let request = OrdererRequest::ChannelHeight {
            channel_id: channel_id.to_string(),
        };
        match self.deadline("channel height", self.call(request)).await? {
            OrdererResponse::Height {
                status: StatusCode::Ok,
                height,
            } => Ok(height),
            OrdererResponse::Height { status, .. } => Err(SyncError::Remote {
                status,
                message: format!("channel height of {}", channel_id),
            }),
            other => Err(unexpected(other)),
        }
    }

    async fn block_range(
        &self,
        channel_id: &str,
        start: u64,
        end: u64,
    ) -> Result<Vec<Block>, SyncError> {
        let request = OrdererRequest::BlockRange {
            channel_id: channel_id.to_string(),
            start,
            end,
        };
        match self.deadline("block range", self.call(request)).await? {
            OrdererResponse::Blocks {
                status: StatusCode::Ok,
                blocks,
                ..
            } => Ok(blocks),
            OrdererResponse::Blocks {
                status, message, ..
            } => Err(SyncError::Remote { status, message }),
            other => Err(unexpected(other)),
        }
    }

    async fn open_deliver(&self, channel_id: &str, start: u64) -> Result<BlockStream, SyncError> {
        let request = OrdererRequest::Deliver {
            channel_id: channel_id.to_string(),
            start,
        };
        let conn = self
            .deadline("open deliver", async {
                let mut conn = FramedConnection::connect(&self.address)
                    .await
                    .map_err(wire_error)?;
                conn.send(&request).await.map_err(wire_error)?;
                Ok(conn)
            })
            .await?;
        debug!(channel = channel_id, start, orderer = %self.address, "[pc-04] deliver requested");

        // `None` state marks a stream that already yielded its terminal item.
        let stream = futures::stream::unfold(Some(conn), |state| async move {
            let mut conn = state?;
            match conn.recv::<OrdererResponse>().await {
                Ok(Some(OrdererResponse::DeliverBlock(block))) => Some((Ok(block), Some(conn))),
                Ok(Some(OrdererResponse::DeliverStatus { status, message })) => {
                    if status.is_ok() {
                        None
                    } else {
                        Some((Err(SyncError::Remote { status, message }), None))
                    }
                }
                Ok(Some(other)) => Some((Err(unexpected(other)), None)),
                Ok(None) => None,
                Err(e) => Some((Err(wire_error(e)), None)),
            }
        });
        Ok(stream.boxed())
    }

    fn endpoint(&self) -> &str {
        &self.address
    }
}
