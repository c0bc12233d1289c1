//! # Node Errors

use pc_01_msp::MspError;
use pc_02_block_storage::StorageError;
use pc_03_channel_creation::ChannelCreationError;
use pc_04_block_sync::SyncError;
use shared_bus::WireError;
use shared_types::StatusCode;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum NodeError {
    /// The remote side answered with a non-OK status.
    #[error("Rejected with {status}: {message}")]
    Rejected { status: StatusCode, message: String },

    #[error("Timed out: {0}")]
    Timeout(String),

    #[error("Unavailable: {0}")]
    Unavailable(String),

    #[error("Protocol error: {0}")]
    Protocol(String),

    #[error("Identity error: {0}")]
    Identity(#[from] MspError),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("Channel creation error: {0}")]
    ChannelCreation(#[from] ChannelCreationError),

    #[error("Sync error: {0}")]
    Sync(#[from] SyncError),
}

impl From<WireError> for NodeError {
    fn from(err: WireError) -> Self {
        match err {
            WireError::Io(e) => NodeError::Unavailable(e.to_string()),
            WireError::Closed => NodeError::Unavailable("connection closed".into()),
            WireError::Encode(e) | WireError::Decode(e) => NodeError::Protocol(e),
        }
    }
}

impl NodeError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            NodeError::Rejected { status, .. } => *status,
            NodeError::Timeout(_) => StatusCode::Timeout,
            NodeError::Unavailable(_) => StatusCode::Unavailable,
            NodeError::Protocol(_) => StatusCode::Internal,
            NodeError::Identity(e) => e.status_code(),
            NodeError::Storage(e) => e.status_code(),
            NodeError::ChannelCreation(e) => e.status_code(),
            NodeError::Sync(e) => e.status_code(),
        }
    }
}
