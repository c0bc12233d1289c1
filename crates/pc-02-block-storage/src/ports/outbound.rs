//! # Outbound Ports (Driven Ports)
//!
//! What the block store needs from its host: a filesystem, a checksum and
//! a clock. Each is swappable so tests can inject faults.

use shared_types::Timestamp;
use std::io;
use std::path::{Path, PathBuf};

/// One directory entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirEntry {
    pub path: PathBuf,
    pub name: String,
    pub is_dir: bool,
}

/// Filesystem operations used by the store.
pub trait BlockFileSystem: Send + Sync {
    fn create_dir_all(&self, path: &Path) -> io::Result<()>;

    /// Create/truncate `path`, write all of `bytes` and fsync the file.
    fn write_file(&self, path: &Path, bytes: &[u8]) -> io::Result<()>;

    /// Atomic replace of `to` by `from`.
    fn rename(&self, from: &Path, to: &Path) -> io::Result<()>;

    /// fsync a directory so a completed rename survives power loss.
    fn sync_dir(&self, path: &Path) -> io::Result<()>;

    fn read(&self, path: &Path) -> io::Result<Vec<u8>>;

    fn remove_file(&self, path: &Path) -> io::Result<()>;

    fn read_dir(&self, path: &Path) -> io::Result<Vec<DirEntry>>;

    fn exists(&self, path: &Path) -> bool;
}

/// Checksum over stored record bodies.
pub trait ChecksumProvider: Send + Sync {
    fn compute_crc32(&self, data: &[u8]) -> u32;

    fn verify_crc32(&self, data: &[u8], expected: u32) -> bool {
        self.compute_crc32(data) == expected
    }
}

pub trait TimeSource: Send + Sync {
    /// Milliseconds since the Unix epoch.
    fn now(&self) -> Timestamp;
}
