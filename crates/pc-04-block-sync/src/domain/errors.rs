//! # Domain Errors

use pc_02_block_storage::StorageError;
use shared_types::{CodecError, StatusCode};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SyncError {
    /// The orderer answered with a non-OK status.
    #[error("Orderer returned {status}: {message}")]
    Remote { status: StatusCode, message: String },

    #[error("Timed out: {0}")]
    Timeout(String),

    #[error("Orderer unavailable: {0}")]
    Unavailable(String),

    /// Unexpected or undecodable response.
    #[error("Protocol error: {0}")]
    Protocol(String),

    #[error("Invalid block {number} on {channel}: {reason}")]
    InvalidBlock {
        channel: String,
        number: u64,
        reason: String,
    },

    #[error("Channel {0} not joined")]
    ChannelNotFound(String),

    #[error("Channel {0} already joined")]
    AlreadyJoined(String),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("Codec error: {0}")]
    Codec(#[from] CodecError),

    #[error("{what} failed after {attempts} attempts: {last}")]
    RetriesExhausted {
        what: String,
        attempts: u32,
        last: Box<SyncError>,
    },
}

impl SyncError {
    pub fn invalid_block(channel: &str, number: u64, reason: impl Into<String>) -> Self {
        SyncError::InvalidBlock {
            channel: channel.to_string(),
            number,
            reason: reason.into(),
        }
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            SyncError::Remote { status, .. } => *status,
            SyncError::Timeout(_) => StatusCode::Timeout,
            SyncError::Unavailable(_) => StatusCode::Unavailable,
            SyncError::Protocol(_) => StatusCode::Internal,
            SyncError::InvalidBlock { .. } => StatusCode::InvalidBlock,
            SyncError::ChannelNotFound(_) => StatusCode::ChannelNotFound,
            SyncError::AlreadyJoined(_) => StatusCode::AlreadyExists,
            SyncError::Storage(e) => e.status_code(),
            SyncError::Codec(e) => e.status_code(),
            SyncError::RetriesExhausted { last, .. } => last.status_code(),
        }
    }

    /// Network-level failures worth another attempt.
    pub fn is_transient(&self) -> bool {
        match self {
            SyncError::Timeout(_) | SyncError::Unavailable(_) => true,
            SyncError::Remote { status, .. } => {
                matches!(status, StatusCode::Unavailable | StatusCode::Timeout)
            }
            _ => false,
        }
    }
}
