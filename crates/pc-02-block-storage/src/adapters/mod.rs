//! Adapters: real filesystem, fault-injecting filesystem, directory lock,
//! checksum and clock.

pub mod filesystem;
pub mod infra;
pub mod lock;

#[cfg(any(test, feature = "test-utils"))]
pub mod fault;
