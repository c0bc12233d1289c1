//! # Shared Types Crate
//!
//! Framing and configuration types shared by the orderer and the peer.
//!
//! ## Design Principles
//!
//! - **Single Source of Truth**: Header, Payload, Envelope and Block are
//!   defined once here and encoded with bincode everywhere (wire, disk,
//!   signed bytes).
//! - **Sign what you send**: the signature of an `Envelope` covers the exact
//!   serialized `Payload` bytes it carries. Signature schemes hash those bytes
//!   with SHA-256 once; callers never pre-hash.
//! - **Tamper-evident blocks**: `calculate_block_hash` covers number,
//!   previous hash, block type and the hash of every transaction.
//!
//! ## Modules
//!
//! - `entities` - hashes, identities, message/block type tags
//! - `envelope` - Header, Payload, Envelope
//! - `block` - Block, BlockHeader, BlockData, BlockMetadata, ValidationBitmap
//! - `codec` - marshal/unmarshal, constructors, hashing, structural checks
//! - `config` - channel configuration and the policy sum type
//! - `status` - numeric status codes carried in every response
//! - `rpc` - orderer and peer request/response messages
//! - `errors` - `CodecError`

pub mod block;
pub mod codec;
pub mod config;
pub mod entities;
pub mod envelope;
pub mod errors;
pub mod rpc;
pub mod status;

pub use block::{Block, BlockData, BlockHeader, BlockMetadata, ValidationBitmap};
pub use codec::{
    calculate_block_hash, compute_data_hash, create_envelope, create_header, create_payload,
    marshal, seal_block, seal_envelope, unmarshal, validate_block, validate_envelope,
    validate_payload, Signer,
};
pub use config::{
    validate_channel_id, ApplicationConfig, BatchParameters, ChannelConfig, ImplicitMetaRule,
    OrdererSection, OrganizationConfig, PolicyRule, Principal, PrincipalRole, VerifiedSigner,
};
pub use entities::{BlockType, Hash, MessageType, SerializedIdentity, Timestamp};
pub use envelope::{Envelope, Header, Payload};
pub use errors::CodecError;
pub use status::StatusCode;
