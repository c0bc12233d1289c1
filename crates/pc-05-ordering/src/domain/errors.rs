//! # Error Types

use pc_01_msp::MspError;
use pc_02_block_storage::StorageError;
use shared_types::{CodecError, MessageType, StatusCode};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum OrderingError {
    #[error("Malformed envelope: {0}")]
    Malformed(String),

    #[error("Expected a transaction message, got {0:?}")]
    InvalidMessageType(MessageType),

    #[error("Channel {0} not found")]
    ChannelNotFound(String),

    /// Signature or chain-of-trust failure.
    #[error("Identity rejected: {0}")]
    Identity(#[from] MspError),

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Invalid block range [{start}, {end})")]
    InvalidRange { start: u64, end: u64 },

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("Codec error: {0}")]
    Codec(#[from] CodecError),

    /// The block bus shut down under a deliver stream.
    #[error("Delivery stream closed")]
    StreamClosed,
}

impl OrderingError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            OrderingError::Malformed(_) => StatusCode::InvalidTransactionFormat,
            OrderingError::InvalidMessageType(_) => StatusCode::InvalidMessageType,
            OrderingError::ChannelNotFound(_) => StatusCode::ChannelNotFound,
            OrderingError::Identity(e) => e.status_code(),
            OrderingError::Forbidden(_) => StatusCode::Forbidden,
            OrderingError::InvalidRange { .. } => StatusCode::InvalidArgument,
            OrderingError::Storage(e) => e.status_code(),
            OrderingError::Codec(e) => e.status_code(),
            OrderingError::StreamClosed => StatusCode::Unavailable,
        }
    }
}
