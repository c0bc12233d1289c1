//! # Status Codes
//!
//! Numeric status enumeration shared by every response so that callers can
//! branch on domain meaning instead of transport errors.

use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u16)]
pub enum StatusCode {
    Ok = 0,
    InvalidArgument = 1,
    NotFound = 2,
    AlreadyExists = 3,
    InvalidSignature = 4,
    ChannelNotFound = 5,
    StorageError = 6,
    InvalidMessageType = 7,
    InvalidTransactionFormat = 8,
    InvalidBlock = 9,
    Forbidden = 10,
    Unavailable = 11,
    Timeout = 12,
    Internal = 13,
}

impl StatusCode {
    const ALL: [StatusCode; 14] = [
        StatusCode::Ok,
        StatusCode::InvalidArgument,
        StatusCode::NotFound,
        StatusCode::AlreadyExists,
        StatusCode::InvalidSignature,
        StatusCode::ChannelNotFound,
        StatusCode::StorageError,
        StatusCode::InvalidMessageType,
        StatusCode::InvalidTransactionFormat,
        StatusCode::InvalidBlock,
        StatusCode::Forbidden,
        StatusCode::Unavailable,
        StatusCode::Timeout,
        StatusCode::Internal,
    ];

    pub fn as_u16(self) -> u16 {
        self as u16
    }

    pub fn from_u16(value: u16) -> Option<Self> {
        Self::ALL.iter().copied().find(|c| c.as_u16() == value)
    }

    pub fn is_ok(self) -> bool {
        self == StatusCode::Ok
    }

    /// Canonical upper-case name.
    pub fn name(self) -> &'static str {
        match self {
            StatusCode::Ok => "OK",
            StatusCode::InvalidArgument => "INVALID_ARGUMENT",
            StatusCode::NotFound => "NOT_FOUND",
            StatusCode::AlreadyExists => "ALREADY_EXISTS",
            StatusCode::InvalidSignature => "INVALID_SIGNATURE",
            StatusCode::ChannelNotFound => "CHANNEL_NOT_FOUND",
            StatusCode::StorageError => "STORAGE_ERROR",
            StatusCode::InvalidMessageType => "INVALID_MESSAGE_TYPE",
            StatusCode::InvalidTransactionFormat => "INVALID_TRANSACTION_FORMAT",
            StatusCode::InvalidBlock => "INVALID_BLOCK",
            StatusCode::Forbidden => "FORBIDDEN",
            StatusCode::Unavailable => "UNAVAILABLE",
            StatusCode::Timeout => "TIMEOUT",
            StatusCode::Internal => "INTERNAL",
        }
    }
}

impl fmt::Display for StatusCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}({})", self.name(), self.as_u16())
    }
}
