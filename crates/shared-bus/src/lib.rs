//! # Shared Bus - Block Events and Node Transport
//!
//! Two pieces of plumbing shared by the orderer and the peer:
//!
//! - an in-process broadcast bus of committed blocks. The orderer publishes
//!   every block it commits; `Deliver` streams subscribe to it to follow a
//!   channel live.
//! - a framed TCP transport: length-delimited frames, each one a bincode
//!   value. Requests, responses and stream items all travel this way.
//!
//! ```text
//! ┌──────────────┐  publish()  ┌──────────────┐  recv()  ┌──────────────┐
//! │ BlockCutter  │ ──────────▶ │ BlockBus     │ ───────▶ │ Deliver      │
//! │ / creation   │             │ (broadcast)  │          │ stream task  │
//! └──────────────┘             └──────────────┘          └──────────────┘
//! ```

#![allow(clippy::missing_const_for_fn)]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

pub mod events;
pub mod publisher;
pub mod subscriber;
pub mod wire;

pub use events::{BlockEvent, EventFilter};
pub use publisher::{BlockPublisher, InMemoryBlockBus};
pub use subscriber::{BlockStream, Subscription, SubscriptionError};
pub use wire::{FramedConnection, WireError, MAX_FRAME_LEN};

/// Maximum events buffered per subscriber before it lags.
pub const DEFAULT_CHANNEL_CAPACITY: usize = 1000;
