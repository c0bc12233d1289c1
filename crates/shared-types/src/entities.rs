//! # Core Entities
//!
//! Small value types referenced by every framing type.

use serde::{Deserialize, Serialize};

/// A 32-byte SHA-256 digest.
pub type Hash = [u8; 32];

/// Milliseconds since the Unix epoch.
pub type Timestamp = u64;

/// Current wall-clock time in milliseconds.
pub fn now_millis() -> Timestamp {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}

/// The signer of a message as it travels inside a `Header`.
///
/// `id_bytes` is the PEM-encoded X.509 certificate of the signer. The
/// `msp_id` is the organization the signer *claims*; it is only trusted once
/// the certificate chains to that organization's registered root.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub struct SerializedIdentity {
    /// Organization ("MSP") identifier.
    pub msp_id: String,
    /// PEM certificate bytes.
    pub id_bytes: Vec<u8>,
}

impl SerializedIdentity {
    pub fn new(msp_id: impl Into<String>, id_bytes: Vec<u8>) -> Self {
        Self {
            msp_id: msp_id.into(),
            id_bytes,
        }
    }
}

/// Kind of message carried by a `Payload`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MessageType {
    /// Full channel configuration (channel creation proposal or config block).
    Config,
    /// Incremental configuration change (reserved; not accepted yet).
    ConfigUpdate,
    /// Ordinary application transaction.
    EndorserTransaction,
}

/// Header type tag of a block.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BlockType {
    /// Single-transaction block carrying a channel configuration.
    Config,
    /// Block of ordered application transactions.
    Normal,
}

impl BlockType {
    /// Stable tag folded into the block hash.
    pub fn tag(self) -> u8 {
        match self {
            BlockType::Config => 1,
            BlockType::Normal => 2,
        }
    }
}
