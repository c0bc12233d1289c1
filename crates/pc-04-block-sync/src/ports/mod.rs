//! # Ports Module

pub mod inbound;
pub mod outbound;

pub use inbound::BlockSyncApi;
pub use outbound::{BlockStream, OrdererConnection};

#[cfg(any(test, feature = "test-utils"))]
pub use outbound::MockOrderer;
