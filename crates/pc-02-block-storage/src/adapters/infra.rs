use crate::ports::outbound::{ChecksumProvider, TimeSource};
use shared_types::Timestamp;

/// CRC-32 via crc32fast.
#[derive(Debug, Default, Clone, Copy)]
pub struct Crc32Checksum;

impl ChecksumProvider for Crc32Checksum {
    fn compute_crc32(&self, data: &[u8]) -> u32 {
        crc32fast::hash(data)
    }
}

#[derive(Debug, Default, Clone, Copy)]
pub struct SystemTimeSource;

impl TimeSource for SystemTimeSource {
    fn now(&self) -> Timestamp {
        shared_types::entities::now_millis()
    }
}
