//! # Adapters
//!
//! - `client` - deadline-bound outbound RPC calls
//! - `orderer_server` - orderer request dispatch
//! - `peer_server` - peer administrative request dispatch

pub mod client;
pub mod orderer_server;
pub mod peer_server;

pub use orderer_server::OrdererHandler;
