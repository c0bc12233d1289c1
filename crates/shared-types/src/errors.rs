//! # Error Types
//!
//! Codec errors are always local and never retried.

use crate::status::StatusCode;
use thiserror::Error;

/// Errors raised while encoding, decoding or structurally checking frames.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum CodecError {
    /// Value could not be encoded.
    #[error("Marshal error: {0}")]
    Marshal(String),

    /// Bytes are not a valid encoding of the expected type.
    #[error("Unmarshal error: {0}")]
    Unmarshal(String),

    /// A required field is missing or empty.
    #[error("Structural error: {0}")]
    Structural(String),
}

impl CodecError {
    pub fn structural(reason: impl Into<String>) -> Self {
        CodecError::Structural(reason.into())
    }

    /// Status reported to a remote caller.
    pub fn status_code(&self) -> StatusCode {
        match self {
            CodecError::Marshal(_) => StatusCode::Internal,
            CodecError::Unmarshal(_) => StatusCode::InvalidTransactionFormat,
            CodecError::Structural(_) => StatusCode::InvalidArgument,
        }
    }
}
