//! # Ordering (PC-05)
//!
//! Single-sequencer ordering service for application transactions.
//!
//! ## Flow
//!
//! ```text
//! Broadcast(envelope)
//!   -> structural check, type == EndorserTransaction
//!   -> channel exists, creator signature, creator chains to a member root
//!   -> channel Writers policy
//!   -> BlockCutter (count / bytes / timeout)
//!   -> sign block, store, mark committed, publish on the bus
//! ```
//!
//! Delivery replays stored blocks and then follows the bus.

#![cfg_attr(test, allow(clippy::unwrap_used))]

pub mod domain;
pub mod ports;
pub mod service;

pub use domain::cutter::BlockCutter;
pub use domain::errors::OrderingError;
pub use ports::inbound::OrderingApi;
pub use service::{DeliverCursor, OrderingDependencies, OrderingService, BATCH_TIMER_TICK};
