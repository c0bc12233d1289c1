//! # Block Storage (PC-02)
//!
//! Append-only, crash-consistent storage of blocks keyed by
//! `(channel, block number)`, shared by the orderer and the peer.
//!
//! ## Guarantees
//!
//! | Guarantee | How |
//! |-----------|-----|
//! | Sequential | `number == height` and `previous_hash == last hash` under the write lock |
//! | Atomic writes | temp file + fsync + rename; failures leave memory untouched |
//! | Integrity | magic + CRC-32 per record, checked on every read |
//! | Two-phase durability | stored first, `mark_committed` flips a persisted flag |
//! | Recovery | startup scan rebuilds heights, last hashes and committed flags |
//! | Exclusive root | `fs2` lock file held for the store's lifetime |
//!
//! ## Crate Structure
//!
//! - `domain/` - records, channel bookkeeping, errors
//! - `ports/` - `BlockStore` (inbound), filesystem/checksum/clock (outbound)
//! - `adapters/` - std filesystem, fault injection, lock, checksum, clock
//! - `service.rs` - `FileBlockStore`

#![cfg_attr(test, allow(clippy::unwrap_used))]

pub mod adapters;
pub mod domain;
pub mod ports;
pub mod service;

pub use adapters::filesystem::StdFileSystem;
pub use adapters::infra::{Crc32Checksum, SystemTimeSource};
pub use adapters::lock::DirectoryLock;
pub use domain::errors::StorageError;
pub use domain::record::StoredBlockRecord;
pub use ports::inbound::BlockStore;
pub use ports::outbound::{BlockFileSystem, ChecksumProvider, DirEntry, TimeSource};
pub use service::{FileBlockStore, StorageDependencies};

#[cfg(any(test, feature = "test-utils"))]
pub use adapters::fault::{Fault, FaultyFileSystem};
