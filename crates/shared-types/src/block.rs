//! # Block
//!
//! The atomic ledger unit: header, ordered transactions, metadata.
//!
//! A block is built once by the node that originates it, hashed, signed and
//! then treated as immutable. Only the storage layer's committed flag ever
//! changes after that, and it lives outside the block.

use crate::entities::{BlockType, Hash};
use serde::{Deserialize, Serialize};

/// Block header.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockHeader {
    /// Position in the channel log; 0 is the channel's first config block.
    pub number: u64,
    /// Hash of block `number - 1`; empty for block 0.
    pub previous_hash: Vec<u8>,
    /// SHA-256 over the data section.
    pub data_hash: Vec<u8>,
    /// This block's own hash, set at commit time.
    pub hash: Vec<u8>,
    /// CONFIG or NORMAL.
    pub block_type: BlockType,
}

/// Ordered transaction bytes (serialized envelopes).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct BlockData {
    pub transactions: Vec<Vec<u8>>,
}

/// Per-transaction validity flags, one bit per transaction (LSB first).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct ValidationBitmap(pub Vec<u8>);

impl ValidationBitmap {
    /// Bitmap of `count` transactions, all marked valid.
    pub fn all_valid(count: usize) -> Self {
        let mut bitmap = Self::with_len(count);
        for i in 0..count {
            bitmap.set(i, true);
        }
        bitmap
    }

    /// Bitmap of `count` transactions, all marked invalid.
    pub fn with_len(count: usize) -> Self {
        Self(vec![0u8; count.div_ceil(8)])
    }

    pub fn set(&mut self, index: usize, valid: bool) {
        let byte = index / 8;
        if byte >= self.0.len() {
            self.0.resize(byte + 1, 0);
        }
        let mask = 1u8 << (index % 8);
        if valid {
            self.0[byte] |= mask;
        } else {
            self.0[byte] &= !mask;
        }
    }

    pub fn is_valid(&self, index: usize) -> bool {
        self.0
            .get(index / 8)
            .map(|b| b & (1u8 << (index % 8)) != 0)
            .unwrap_or(false)
    }

    /// Number of bytes the bitmap must have for `count` transactions.
    pub fn expected_len(count: usize) -> usize {
        count.div_ceil(8)
    }
}

/// Creator signature and validation results.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct BlockMetadata {
    /// PEM certificate of the node that built the block.
    pub creator_cert: Vec<u8>,
    /// Creator signature over `header.hash`.
    pub creator_signature: Vec<u8>,
    /// One bit per transaction.
    pub validation_bitmap: ValidationBitmap,
    /// Reserved for cross-block chaining.
    pub accumulated_hash: Vec<u8>,
}

/// A ledger block.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Block {
    pub header: BlockHeader,
    pub data: BlockData,
    pub metadata: BlockMetadata,
}

impl Block {
    /// Unhashed, unsigned block. Call `seal_hash` once the content is final.
    pub fn new(
        number: u64,
        previous_hash: Vec<u8>,
        block_type: BlockType,
        transactions: Vec<Vec<u8>>,
    ) -> Self {
        Self {
            header: BlockHeader {
                number,
                previous_hash,
                data_hash: Vec::new(),
                hash: Vec::new(),
                block_type,
            },
            data: BlockData { transactions },
            metadata: BlockMetadata::default(),
        }
    }

    /// Compute and store `data_hash` and `hash`; returns the block hash.
    pub fn seal_hash(&mut self) -> Hash {
        self.header.data_hash = crate::codec::compute_data_hash(&self.data).to_vec();
        let hash = crate::codec::calculate_block_hash(self);
        self.header.hash = hash.to_vec();
        hash
    }

    pub fn number(&self) -> u64 {
        self.header.number
    }

    pub fn is_config(&self) -> bool {
        self.header.block_type == BlockType::Config
    }

    pub fn transaction_count(&self) -> usize {
        self.data.transactions.len()
    }
}
