//! # Peer RPC Server
//!
//! Administrative requests from operators: create a channel, query heights
//! and blocks. Several requests may share one connection.

use crate::container::NodeError;
use crate::peer::PeerService;
use pc_02_block_storage::BlockStore;
use pc_04_block_sync::BlockSyncApi;
use shared_bus::{FramedConnection, WireError};
use shared_types::rpc::{PeerRequest, PeerResponse, MAX_RANGE_BATCH};
use shared_types::StatusCode;
use std::sync::Arc;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::TcpListener;
use tokio::sync::watch;
use tracing::{debug, info, warn};

async fn respond(peer: &PeerService, request: PeerRequest) -> PeerResponse {
    match request {
        PeerRequest::CreateChannel(config) => match peer.create_channel(&config).await {
            Ok(block) => PeerResponse::ChannelCreated {
                status: StatusCode::Ok,
                message: String::new(),
                block: Some(block),
            },
            Err(e) => PeerResponse::ChannelCreated {
                status: e.status_code(),
                message: e.to_string(),
                block: None,
            },
        },
        PeerRequest::ChannelHeight { channel_id } => {
            match peer.synchronizer().channel_height(&channel_id) {
                Some(height) => PeerResponse::Height {
                    status: StatusCode::Ok,
                    height,
                },
                None => PeerResponse::Height {
                    status: StatusCode::ChannelNotFound,
                    height: 0,
                },
            }
        }
        PeerRequest::BlockRange {
            channel_id,
            start,
            end,
        } => match block_range(peer, &channel_id, start, end) {
            Ok(blocks) => PeerResponse::Blocks {
                status: StatusCode::Ok,
                message: String::new(),
                blocks,
            },
            Err(e) => PeerResponse::Blocks {
                status: e.status_code(),
                message: e.to_string(),
                blocks: Vec::new(),
            },
        },
        PeerRequest::ListChannels => PeerResponse::Channels {
            channels: peer.synchronizer().channels(),
        },
    }
}

fn block_range(
    peer: &PeerService,
    channel_id: &str,
    start: u64,
    end: u64,
) -> Result<Vec<shared_types::Block>, NodeError> {
    let height = peer.synchronizer().channel_height(channel_id).ok_or_else(|| {
        NodeError::Rejected {
            status: StatusCode::ChannelNotFound,
            message: format!("channel {} not joined", channel_id),
        }
    })?;
    if start > end {
        return Err(NodeError::Rejected {
            status: StatusCode::InvalidArgument,
            message: format!("invalid range [{}, {})", start, end),
        });
    }
    let end = end.min(height).min(start.saturating_add(MAX_RANGE_BATCH));
    if start >= end {
        return Ok(Vec::new());
    }
    Ok(peer.store().get_block_range(channel_id, start, end)?)
}

pub async fn handle_connection<S>(
    peer: &PeerService,
    mut conn: FramedConnection<S>,
) -> Result<(), NodeError>
where
    S: AsyncRead + AsyncWrite + Unpin + Send,
{
    loop {
        let request = match conn.recv::<PeerRequest>().await {
            Ok(Some(request)) => request,
            Ok(None) => return Ok(()),
            Err(WireError::Decode(reason)) => {
                conn.send(&PeerResponse::Error {
                    status: StatusCode::InvalidTransactionFormat,
                    message: reason,
                })
                .await?;
                continue;
            }
            Err(e) => return Err(e.into()),
        };
        let response = respond(peer, request).await;
        conn.send(&response).await?;
    }
}

/// Accept connections until shutdown.
pub async fn serve(
    listener: TcpListener,
    peer: Arc<PeerService>,
    mut shutdown: watch::Receiver<bool>,
) {
    loop {
        tokio::select! {
            accepted = listener.accept() => match accepted {
                Ok((socket, remote)) => {
                    let _ = socket.set_nodelay(true);
                    let peer = Arc::clone(&peer);
                    tokio::spawn(async move {
                        let conn = FramedConnection::new(socket);
                        if let Err(e) = handle_connection(&peer, conn).await {
                            debug!(%remote, error = %e, "[pc-04] peer connection ended with error");
                        }
                    });
                }
                Err(e) => warn!(error = %e, "[pc-04] accept failed"),
            },
            changed = shutdown.changed() => {
                if changed.is_err() || *shutdown.borrow() {
                    info!("[pc-04] peer server stopped");
                    return;
                }
            }
        }
    }
}
