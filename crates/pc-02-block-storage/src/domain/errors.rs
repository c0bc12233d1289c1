//! # Domain Errors
//!
//! Storage failures are fatal to the single store/read call that raised
//! them. In-memory bookkeeping is never updated when a write fails.

use shared_types::StatusCode;
use std::fmt;
use std::path::PathBuf;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StorageError {
    /// No stored block at this number.
    NotFound { channel: String, number: u64 },

    /// Channel has no blocks in this store.
    ChannelNotFound { channel: String },

    /// Block number is not the next height.
    NonSequential {
        channel: String,
        expected: u64,
        got: u64,
    },

    /// Block already stored at this number.
    BlockExists { channel: String, number: u64 },

    /// `previous_hash` does not link to the last stored block.
    PreviousHashMismatch { channel: String, number: u64 },

    /// Header hash does not match the block content.
    HashMismatch { channel: String, number: u64 },

    /// Channel id is not usable as a directory name.
    InvalidChannelId { reason: String },

    /// `start > end`.
    InvalidRange { start: u64, end: u64 },

    /// Filesystem I/O error.
    Io { message: String },

    /// Record encode/decode error.
    Serialization { message: String },

    /// Stored record failed its integrity checks.
    Corruption { path: PathBuf, reason: String },

    /// Another process holds the storage root.
    Locked { path: PathBuf, pid: Option<u32> },
}

impl fmt::Display for StorageError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StorageError::NotFound { channel, number } => {
                write!(f, "Block {} not found on channel {}", number, channel)
            }
            StorageError::ChannelNotFound { channel } => {
                write!(f, "Channel not found: {}", channel)
            }
            StorageError::NonSequential {
                channel,
                expected,
                got,
            } => write!(
                f,
                "Non-sequential block on {}: expected {}, got {}",
                channel, expected, got
            ),
            StorageError::BlockExists { channel, number } => {
                write!(f, "Block {} already stored on channel {}", number, channel)
            }
            StorageError::PreviousHashMismatch { channel, number } => write!(
                f,
                "Block {} on {} does not link to the previous block",
                number, channel
            ),
            StorageError::HashMismatch { channel, number } => write!(
                f,
                "Block {} on {} has a header hash that does not match its content",
                number, channel
            ),
            StorageError::InvalidChannelId { reason } => {
                write!(f, "Invalid channel id: {}", reason)
            }
            StorageError::InvalidRange { start, end } => {
                write!(f, "Invalid block range [{}, {})", start, end)
            }
            StorageError::Io { message } => write!(f, "Storage I/O error: {}", message),
            StorageError::Serialization { message } => {
                write!(f, "Serialization error: {}", message)
            }
            StorageError::Corruption { path, reason } => {
                write!(f, "Corrupt block file {}: {}", path.display(), reason)
            }
            StorageError::Locked { path, pid } => match pid {
                Some(p) => write!(
                    f,
                    "Storage root already in use by process {} ({})",
                    p,
                    path.display()
                ),
                None => write!(f, "Storage root already in use ({})", path.display()),
            },
        }
    }
}

impl std::error::Error for StorageError {}

impl StorageError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            StorageError::NotFound { .. } => StatusCode::NotFound,
            StorageError::ChannelNotFound { .. } => StatusCode::ChannelNotFound,
            StorageError::BlockExists { .. } => StatusCode::AlreadyExists,
            StorageError::NonSequential { .. }
            | StorageError::PreviousHashMismatch { .. }
            | StorageError::HashMismatch { .. } => StatusCode::InvalidBlock,
            StorageError::InvalidChannelId { .. } | StorageError::InvalidRange { .. } => {
                StatusCode::InvalidArgument
            }
            StorageError::Io { .. }
            | StorageError::Serialization { .. }
            | StorageError::Corruption { .. }
            | StorageError::Locked { .. } => StatusCode::StorageError,
        }
    }
}

impl From<std::io::Error> for StorageError {
    fn from(e: std::io::Error) -> Self {
        StorageError::Io {
            message: e.to_string(),
        }
    }
}
