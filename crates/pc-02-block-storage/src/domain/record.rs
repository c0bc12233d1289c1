//! # Stored Block Record
//!
//! On-disk unit: `MAGIC ‖ crc32(body) (u32 BE) ‖ body`, where body is the
//! bincode encoding of `StoredBlockRecord`.

use super::errors::StorageError;
use crate::ports::outbound::ChecksumProvider;
use serde::{Deserialize, Serialize};
use shared_types::{Block, Timestamp};

pub const RECORD_MAGIC: [u8; 4] = *b"PCBK";
const HEADER_LEN: usize = 8;

/// Persistence wrapper around a block.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredBlockRecord {
    pub channel_id: String,
    /// When the record was first written (ms since epoch).
    pub stored_at: Timestamp,
    /// Second durability phase; set by `mark_committed`.
    pub committed: bool,
    pub block_hash: Vec<u8>,
    pub block: Block,
}

impl StoredBlockRecord {
    pub fn encode(&self, checksum: &dyn ChecksumProvider) -> Result<Vec<u8>, StorageError> {
        let body = bincode::serialize(self).map_err(|e| StorageError::Serialization {
            message: e.to_string(),
        })?;
        let mut bytes = Vec::with_capacity(HEADER_LEN + body.len());
        bytes.extend_from_slice(&RECORD_MAGIC);
        bytes.extend_from_slice(&checksum.compute_crc32(&body).to_be_bytes());
        bytes.extend_from_slice(&body);
        Ok(bytes)
    }

    /// Decode, reporting integrity failures as reasons for `Corruption`.
    pub fn decode(bytes: &[u8], checksum: &dyn ChecksumProvider) -> Result<Self, String> {
        if bytes.len() < HEADER_LEN {
            return Err(format!("record truncated to {} bytes", bytes.len()));
        }
        if bytes[..4] != RECORD_MAGIC {
            return Err("bad magic".into());
        }
        let mut crc = [0u8; 4];
        crc.copy_from_slice(&bytes[4..8]);
        let expected = u32::from_be_bytes(crc);
        let body = &bytes[HEADER_LEN..];
        if !checksum.verify_crc32(body, expected) {
            return Err(format!(
                "checksum mismatch: expected {:08x}, got {:08x}",
                expected,
                checksum.compute_crc32(body)
            ));
        }
        bincode::deserialize(body).map_err(|e| format!("undecodable record: {}", e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::infra::Crc32Checksum;
    use shared_types::BlockType;

    fn record() -> StoredBlockRecord {
        let mut block = Block::new(0, vec![], BlockType::Config, vec![b"cfg".to_vec()]);
        let hash = block.seal_hash();
        StoredBlockRecord {
            channel_id: "c1".into(),
            stored_at: 1,
            committed: false,
            block_hash: hash.to_vec(),
            block,
        }
    }

    #[test]
    fn test_decode_detects_bit_flip() {
        let mut bytes = record().encode(&Crc32Checksum).unwrap();
        let last = bytes.len() - 1;
        bytes[last] ^= 0x01;
        assert!(StoredBlockRecord::decode(&bytes, &Crc32Checksum)
            .unwrap_err()
            .contains("checksum"));
    }

    #[test]
    fn test_decode_detects_truncation_and_magic() {
        let bytes = record().encode(&Crc32Checksum).unwrap();
        assert!(StoredBlockRecord::decode(&bytes[..5], &Crc32Checksum).is_err());
        let mut bad = bytes.clone();
        bad[0] = b'X';
        assert_eq!(
            StoredBlockRecord::decode(&bad, &Crc32Checksum).unwrap_err(),
            "bad magic"
        );
        assert_eq!(
            StoredBlockRecord::decode(&bytes, &Crc32Checksum).unwrap(),
            record()
        );
    }
}
