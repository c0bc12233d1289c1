//! # Codec
//!
//! Canonical bincode encoding, frame constructors, block hashing and the
//! structural pre-filters run before any signature check.
//!
//! ## Signing policy
//!
//! The signed message of an envelope is `marshal(&payload)` verbatim; the
//! signature scheme hashes it once with SHA-256. `seal_envelope` is the only
//! place that pairs payload bytes with a signature, so every call path signs
//! the same bytes the receiver verifies.

use crate::block::{Block, BlockData, ValidationBitmap};
use crate::entities::{now_millis, Hash, MessageType, SerializedIdentity};
use crate::envelope::{Envelope, Header, Payload};
use crate::errors::CodecError;
use rand::RngCore;
use serde::{de::DeserializeOwned, Serialize};
use sha2::{Digest, Sha256};

/// Domain separation tag for block hashes.
const BLOCK_HASH_DOMAIN: &[u8] = b"pc.block.v1";

/// Nonce length in bytes.
pub const NONCE_LEN: usize = 24;

/// Anything that can sign on behalf of a `SerializedIdentity`.
pub trait Signer {
    type Error: From<CodecError>;

    /// The identity placed in `Header::creator`.
    fn creator(&self) -> SerializedIdentity;

    /// Sign `message`; the scheme hashes it internally.
    fn sign(&self, message: &[u8]) -> Result<Vec<u8>, Self::Error>;
}

pub fn marshal<T: Serialize>(value: &T) -> Result<Vec<u8>, CodecError> {
    bincode::serialize(value).map_err(|e| CodecError::Marshal(e.to_string()))
}

pub fn unmarshal<T: DeserializeOwned>(bytes: &[u8]) -> Result<T, CodecError> {
    bincode::deserialize(bytes).map_err(|e| CodecError::Unmarshal(e.to_string()))
}

/// Fresh header with a random nonce and derived transaction id.
pub fn create_header(
    creator: SerializedIdentity,
    message_type: MessageType,
    channel_id: impl Into<String>,
) -> Header {
    let mut nonce = vec![0u8; NONCE_LEN];
    rand::thread_rng().fill_bytes(&mut nonce);

    let mut hasher = Sha256::new();
    hasher.update(&nonce);
    hasher.update(&creator.id_bytes);
    let tx_id = hex::encode(hasher.finalize());

    Header {
        message_type,
        channel_id: channel_id.into(),
        creator,
        timestamp: now_millis(),
        nonce,
        tx_id,
    }
}

pub fn create_payload(header: Header, data: Vec<u8>) -> Payload {
    Payload { header, data }
}

/// Pair already-serialized payload bytes with the caller's signature.
pub fn create_envelope(payload: Vec<u8>, signature: Vec<u8>) -> Envelope {
    Envelope { payload, signature }
}

/// Serialize `payload`, sign the bytes and wrap both in an envelope.
pub fn seal_envelope<S: Signer>(signer: &S, payload: &Payload) -> Result<Envelope, S::Error> {
    let bytes = marshal(payload)?;
    let signature = signer.sign(&bytes)?;
    Ok(create_envelope(bytes, signature))
}

/// Hash `block`, then attach the signer's certificate and its signature
/// over the 32-byte hash. Returns the hash.
pub fn seal_block<S: Signer>(signer: &S, block: &mut Block) -> Result<Hash, S::Error> {
    let hash = block.seal_hash();
    block.metadata.creator_cert = signer.creator().id_bytes;
    block.metadata.creator_signature = signer.sign(&hash)?;
    Ok(hash)
}

/// SHA-256 over every transaction, each prefixed with its u64 BE length.
pub fn compute_data_hash(data: &BlockData) -> Hash {
    let mut hasher = Sha256::new();
    hasher.update((data.transactions.len() as u64).to_be_bytes());
    for tx in &data.transactions {
        hasher.update((tx.len() as u64).to_be_bytes());
        hasher.update(tx);
    }
    hasher.finalize().into()
}

/// Hash covering number, previous hash, block type and the data section.
///
/// The data hash is recomputed from `block.data` rather than read from the
/// header, so a block whose header was left stale still hashes correctly.
/// Metadata is excluded: it carries the signature over this value.
pub fn calculate_block_hash(block: &Block) -> Hash {
    let data_hash = compute_data_hash(&block.data);
    let mut hasher = Sha256::new();
    hasher.update(BLOCK_HASH_DOMAIN);
    hasher.update(block.header.number.to_be_bytes());
    hasher.update((block.header.previous_hash.len() as u64).to_be_bytes());
    hasher.update(&block.header.previous_hash);
    hasher.update([block.header.block_type.tag()]);
    hasher.update(data_hash);
    hasher.finalize().into()
}

/// Non-empty payload and signature.
pub fn validate_envelope(envelope: &Envelope) -> Result<(), CodecError> {
    if envelope.payload.is_empty() {
        return Err(CodecError::structural("envelope payload is empty"));
    }
    if envelope.signature.is_empty() {
        return Err(CodecError::structural("envelope signature is empty"));
    }
    Ok(())
}

/// Header carries a channel, a creator certificate and a transaction id.
pub fn validate_payload(payload: &Payload) -> Result<(), CodecError> {
    let header = &payload.header;
    if header.channel_id.is_empty() {
        return Err(CodecError::structural("header channel id is empty"));
    }
    if header.creator.msp_id.is_empty() {
        return Err(CodecError::structural("header creator msp id is empty"));
    }
    if header.creator.id_bytes.is_empty() {
        return Err(CodecError::structural("header creator certificate is empty"));
    }
    if header.tx_id.is_empty() {
        return Err(CodecError::structural("header tx id is empty"));
    }
    Ok(())
}

/// Shape checks only: no hash recomputation, no signature check.
pub fn validate_block(block: &Block) -> Result<(), CodecError> {
    if block.data.transactions.is_empty() {
        return Err(CodecError::structural("block has no transactions"));
    }
    if block.data.transactions.iter().any(|tx| tx.is_empty()) {
        return Err(CodecError::structural("block contains an empty transaction"));
    }
    match (block.header.number, block.header.previous_hash.len()) {
        (0, 0) => {}
        (0, _) => {
            return Err(CodecError::structural(
                "block 0 must not carry a previous hash",
            ))
        }
        (_, 32) => {}
        (n, len) => {
            return Err(CodecError::Structural(format!(
                "block {} previous hash has length {}",
                n, len
            )))
        }
    }
    if block.header.hash.len() != 32 {
        return Err(CodecError::structural("block hash is not set"));
    }
    let needed = ValidationBitmap::expected_len(block.data.transactions.len());
    if block.metadata.validation_bitmap.0.len() > needed {
        return Err(CodecError::structural(
            "validation bitmap longer than transaction count",
        ));
    }
    Ok(())
}
