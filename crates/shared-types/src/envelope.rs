//! # Envelope Framing
//!
//! `Envelope` is the outer transport/storage unit: opaque serialized
//! `Payload` bytes plus a detached signature over exactly those bytes.

use crate::codec::unmarshal;
use crate::entities::{MessageType, SerializedIdentity, Timestamp};
use crate::errors::CodecError;
use serde::{Deserialize, Serialize};

/// Routing and authorship information of a payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Header {
    /// What the payload data holds.
    pub message_type: MessageType,
    /// Target channel.
    pub channel_id: String,
    /// Who signed the enclosing envelope.
    pub creator: SerializedIdentity,
    /// Creation time (ms since epoch).
    pub timestamp: Timestamp,
    /// Random bytes making every header unique.
    pub nonce: Vec<u8>,
    /// Hex SHA-256 of `nonce || creator.id_bytes`.
    pub tx_id: String,
}

/// Header plus an opaque data blob.
///
/// For `Config` messages `data` is a serialized `Block`; for
/// `EndorserTransaction` messages it is the application proposal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Payload {
    pub header: Header,
    pub data: Vec<u8>,
}

/// Signed transport wrapper around a serialized `Payload`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct Envelope {
    /// bincode(`Payload`).
    pub payload: Vec<u8>,
    /// Signature by `payload.header.creator` over `payload`.
    pub signature: Vec<u8>,
}

impl Envelope {
    /// Decode the enclosed payload.
    pub fn open(&self) -> Result<Payload, CodecError> {
        unmarshal(&self.payload)
    }
}
