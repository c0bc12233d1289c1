//! # Orderer RPC Server
//!
//! One task per connection. The first frame decides the connection's
//! shape: `OpenChannelCreation` turns it into a proposal stream, `Deliver`
//! into a block stream, anything else is answered and the next request
//! read from the same connection. Unary requests run on the blocking
//! pool since they sign, verify and fsync.

use crate::container::NodeError;
use pc_03_channel_creation::{ChannelCreationApi, ChannelCreationService};
use pc_05_ordering::{OrderingApi, OrderingService};
use shared_bus::{FramedConnection, WireError};
use shared_types::rpc::{OrdererRequest, OrdererResponse};
use shared_types::StatusCode;
use std::sync::Arc;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::TcpListener;
use tokio::sync::watch;
use tracing::{debug, info, warn};

pub struct OrdererHandler {
    creation: Arc<ChannelCreationService>,
    ordering: Arc<OrderingService>,
}

impl OrdererHandler {
    pub fn new(creation: Arc<ChannelCreationService>, ordering: Arc<OrderingService>) -> Self {
        Self { creation, ordering }
    }

    pub fn creation(&self) -> &Arc<ChannelCreationService> {
        &self.creation
    }

    pub fn ordering(&self) -> &Arc<OrderingService> {
        &self.ordering
    }

    async fn unary(&self, request: OrdererRequest) -> OrdererResponse {
        let creation = Arc::clone(&self.creation);
        let ordering = Arc::clone(&self.ordering);
        tokio::task::spawn_blocking(move || answer_unary(&creation, &ordering, request))
            .await
            .unwrap_or_else(|e| OrdererResponse::Error {
                status: StatusCode::Internal,
                message: format!("request handler failed: {}", e),
            })
    }

    async fn deliver<S>(
        &self,
        conn: &mut FramedConnection<S>,
        channel_id: &str,
        start: u64,
        shutdown: &mut watch::Receiver<bool>,
    ) -> Result<(), WireError>
    where
        S: AsyncRead + AsyncWrite + Unpin + Send,
    {
        let mut cursor = match self.ordering.deliver(channel_id, start) {
            Ok(cursor) => cursor,
            Err(e) => {
                return conn
                    .send(&OrdererResponse::DeliverStatus {
                        status: e.status_code(),
                        message: e.to_string(),
                    })
                    .await;
            }
        };
        debug!(channel = channel_id, start, "[pc-05] deliver stream opened");
        loop {
            let next = tokio::select! {
                next = cursor.next_block() => next,
                _ = shutdown.changed() => {
                    return conn
                        .send(&OrdererResponse::DeliverStatus {
                            status: StatusCode::Unavailable,
                            message: "orderer shutting down".into(),
                        })
                        .await;
                }
            };
            match next {
                Ok(block) => conn.send(&OrdererResponse::DeliverBlock(block)).await?,
                Err(e) => {
                    return conn
                        .send(&OrdererResponse::DeliverStatus {
                            status: e.status_code(),
                            message: e.to_string(),
                        })
                        .await;
                }
            }
        }
    }

    /// Serve one connection until the client closes it.
    pub async fn handle_connection<S>(
        &self,
        mut conn: FramedConnection<S>,
        mut shutdown: watch::Receiver<bool>,
    ) -> Result<(), NodeError>
    where
        S: AsyncRead + AsyncWrite + Unpin + Send,
    {
        loop {
            let request = match conn.recv::<OrdererRequest>().await {
                Ok(Some(request)) => request,
                Ok(None) => return Ok(()),
                Err(WireError::Decode(reason)) => {
                    conn.send(&OrdererResponse::Error {
                        status: StatusCode::InvalidTransactionFormat,
                        message: reason,
                    })
                    .await?;
                    continue;
                }
                Err(e) => return Err(e.into()),
            };
            match request {
                OrdererRequest::OpenChannelCreation => {
                    self.creation
                        .serve_stream(&mut conn)
                        .await
                        .map_err(|e| NodeError::Unavailable(e.to_string()))?;
                    return Ok(());
                }
                OrdererRequest::Deliver { channel_id, start } => {
                    self.deliver(&mut conn, &channel_id, start, &mut shutdown)
                        .await?;
                    return Ok(());
                }
                unary => conn.send(&self.unary(unary).await).await?,
            }
        }
    }
}

fn answer_unary(
    creation: &ChannelCreationService,
    ordering: &OrderingService,
    request: OrdererRequest,
) -> OrdererResponse {
    match request {
        OrdererRequest::Broadcast(envelope) => match ordering.broadcast(&envelope) {
            Ok(_) => OrdererResponse::Broadcast {
                status: StatusCode::Ok,
                message: String::new(),
            },
            Err(e) => OrdererResponse::Broadcast {
                status: e.status_code(),
                message: e.to_string(),
            },
        },
        OrdererRequest::ChannelHeight { channel_id } => match ordering.channel_height(&channel_id) {
            Ok(height) => OrdererResponse::Height {
                status: StatusCode::Ok,
                height,
            },
            Err(e) => OrdererResponse::Height {
                status: e.status_code(),
                height: 0,
            },
        },
        OrdererRequest::BlockRange {
            channel_id,
            start,
            end,
        } => match ordering.block_range(&channel_id, start, end) {
            Ok(blocks) => OrdererResponse::Blocks {
                status: StatusCode::Ok,
                message: String::new(),
                blocks,
            },
            Err(e) => OrdererResponse::Blocks {
                status: e.status_code(),
                message: e.to_string(),
                blocks: Vec::new(),
            },
        },
        OrdererRequest::ListChannels => OrdererResponse::Channels {
            channels: creation.list_channels(),
        },
        OrdererRequest::OpenChannelCreation | OrdererRequest::Deliver { .. } => {
            OrdererResponse::Error {
                status: StatusCode::Internal,
                message: "stream request routed as unary".into(),
            }
        }
    }
}

/// Accept connections until shutdown.
pub async fn serve(
    listener: TcpListener,
    handler: Arc<OrdererHandler>,
    mut shutdown: watch::Receiver<bool>,
) {
    loop {
        tokio::select! {
            accepted = listener.accept() => match accepted {
                Ok((socket, remote)) => {
                    let _ = socket.set_nodelay(true);
                    let handler = Arc::clone(&handler);
                    let shutdown = shutdown.clone();
                    tokio::spawn(async move {
                        let conn = FramedConnection::new(socket);
                        if let Err(e) = handler.handle_connection(conn, shutdown).await {
                            debug!(%remote, error = %e, "[pc-05] connection ended with error");
                        }
                    });
                }
                Err(e) => warn!(error = %e, "[pc-05] accept failed"),
            },
            changed = shutdown.changed() => {
                if changed.is_err() || *shutdown.borrow() {
                    info!("[pc-05] orderer server stopped");
                    return;
                }
            }
        }
    }
}
