//! # Fault-Injecting Filesystem
//!
//! Wraps `StdFileSystem` and fails chosen operations. `Fault::Crash`
//! models the process dying after the temp write: the rename fails and
//! later cleanup is suppressed, so the temp file stays on disk exactly as
//! a killed process would leave it.

use super::filesystem::StdFileSystem;
use crate::ports::outbound::{BlockFileSystem, DirEntry};
use parking_lot::Mutex;
use std::io;
use std::path::Path;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Fault {
    None,
    /// `rename` returns an error; cleanup still runs.
    FailRename,
    /// Temp file written, then the "process" dies before rename.
    Crash,
    /// Only the first half of the bytes reach the temp file.
    TornWrite,
    /// `rename` onto an existing file fails, so first writes succeed and
    /// rewrites (commit marks) do not.
    FailOverwrite,
    /// The directory fsync after a rename fails.
    FailSyncDir,
}

pub struct FaultyFileSystem {
    inner: StdFileSystem,
    fault: Mutex<Fault>,
}

impl FaultyFileSystem {
    pub fn new(fault: Fault) -> Self {
        Self {
            inner: StdFileSystem,
            fault: Mutex::new(fault),
        }
    }

    pub fn set_fault(&self, fault: Fault) {
        *self.fault.lock() = fault;
    }

    fn fault(&self) -> Fault {
        *self.fault.lock()
    }
}

fn injected(what: &str) -> io::Error {
    io::Error::new(io::ErrorKind::Other, format!("injected fault: {}", what))
}

impl BlockFileSystem for FaultyFileSystem {
    fn create_dir_all(&self, path: &Path) -> io::Result<()> {
        self.inner.create_dir_all(path)
    }

    fn write_file(&self, path: &Path, bytes: &[u8]) -> io::Result<()> {
        match self.fault() {
            Fault::TornWrite => {
                self.inner.write_file(path, &bytes[..bytes.len() / 2])?;
                Err(injected("torn write"))
            }
            _ => self.inner.write_file(path, bytes),
        }
    }

    fn rename(&self, from: &Path, to: &Path) -> io::Result<()> {
        match self.fault() {
            Fault::FailRename | Fault::Crash => Err(injected("rename")),
            Fault::FailOverwrite if self.inner.exists(to) => Err(injected("overwrite")),
            _ => self.inner.rename(from, to),
        }
    }

    fn sync_dir(&self, path: &Path) -> io::Result<()> {
        match self.fault() {
            Fault::FailSyncDir => Err(injected("directory sync")),
            _ => self.inner.sync_dir(path),
        }
    }

    fn read(&self, path: &Path) -> io::Result<Vec<u8>> {
        self.inner.read(path)
    }

    fn remove_file(&self, path: &Path) -> io::Result<()> {
        match self.fault() {
            Fault::Crash | Fault::TornWrite => Ok(()),
            _ => self.inner.remove_file(path),
        }
    }

    fn read_dir(&self, path: &Path) -> io::Result<Vec<DirEntry>> {
        self.inner.read_dir(path)
    }

    fn exists(&self, path: &Path) -> bool {
        self.inner.exists(path)
    }
}
