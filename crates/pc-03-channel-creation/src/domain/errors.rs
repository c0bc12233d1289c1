//! # Error Types
//!
//! Every rejection maps onto a `StatusCode` sent back on the stream.
//! Nothing here is retried by the orderer; the caller may resubmit.

use pc_01_msp::MspError;
use pc_02_block_storage::StorageError;
use shared_types::{CodecError, MessageType, StatusCode};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ChannelCreationError {
    /// Envelope or payload bytes could not be decoded.
    #[error("Malformed envelope: {0}")]
    MalformedEnvelope(String),

    /// Payload data is not a well-formed config block.
    #[error("Malformed config block: {0}")]
    MalformedBlock(String),

    #[error("Expected a config message, got {0:?}")]
    InvalidMessageType(MessageType),

    #[error("Channel {0} already exists")]
    AlreadyExists(String),

    /// Signature, certificate or chain-of-trust failure.
    #[error("Identity rejected: {0}")]
    Identity(#[from] MspError),

    /// Signer or member organizations are not allowed to found the channel.
    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Invalid channel configuration: {0}")]
    InvalidConfig(String),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("Codec error: {0}")]
    Codec(#[from] CodecError),
}

impl ChannelCreationError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            ChannelCreationError::MalformedEnvelope(_) => StatusCode::InvalidTransactionFormat,
            ChannelCreationError::MalformedBlock(_) => StatusCode::InvalidBlock,
            ChannelCreationError::InvalidMessageType(_) => StatusCode::InvalidMessageType,
            ChannelCreationError::AlreadyExists(_) => StatusCode::AlreadyExists,
            ChannelCreationError::Identity(e) => e.status_code(),
            ChannelCreationError::Forbidden(_) => StatusCode::Forbidden,
            ChannelCreationError::InvalidConfig(_) => StatusCode::InvalidArgument,
            ChannelCreationError::Storage(e) => match e.status_code() {
                // A block 0 already on disk means the name is taken.
                StatusCode::AlreadyExists => StatusCode::AlreadyExists,
                _ => StatusCode::StorageError,
            },
            ChannelCreationError::Codec(e) => e.status_code(),
        }
    }
}

/// Failures of the stream carrying proposals.
#[derive(Debug, Error)]
pub enum StreamError {
    /// One frame could not be decoded; the stream itself is intact.
    #[error("Malformed frame: {0}")]
    Malformed(String),

    #[error("Transport error: {0}")]
    Transport(String),
}
