//! # Block Synchronization (PC-04)
//!
//! Keeps a peer's local ledger consistent with the orderer's.
//!
//! ## Lifecycle
//!
//! ```text
//! Idle -> InitialSync -> PeriodicCheck <-> StreamingFollow
//! ```
//!
//! | Phase | Trigger | Work |
//! |-------|---------|------|
//! | InitialSync | node start | catch up every joined channel in bounded batches |
//! | StreamingFollow | per channel worker | apply blocks from a deliver stream, reopen on failure |
//! | PeriodicCheck | timer | catch up channels whose last block is stale |
//!
//! Every block is validated against the channel's orderer roots before it
//! is stored; see `algorithms::validation`.
//!
//! ## Module Structure
//!
//! ```text
//! pc-04-block-sync/
//! ├── domain/          # ChannelManager, ChannelState, SyncReport, errors
//! ├── algorithms/      # block validation, batch planning
//! ├── ports/           # BlockSyncApi (inbound) + OrdererConnection (outbound)
//! ├── application/     # BlockSynchronizer
//! ├── adapters/        # TCP orderer client
//! └── config.rs        # SyncConfig
//! ```

#![cfg_attr(test, allow(clippy::unwrap_used))]

pub mod adapters;
pub mod algorithms;
pub mod application;
pub mod config;
pub mod domain;
pub mod ports;

pub use adapters::TcpOrdererClient;
pub use algorithms::{next_batch, orderer_registry, validate_genesis, validate_next};
pub use application::BlockSynchronizer;
pub use config::SyncConfig;
pub use domain::{ChannelManager, ChannelState, SyncError, SyncReport};
pub use ports::{BlockStream, BlockSyncApi, OrdererConnection};

#[cfg(any(test, feature = "test-utils"))]
pub use ports::MockOrderer;
