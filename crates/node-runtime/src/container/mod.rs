//! # Container
//!
//! Configuration and the error type shared by both node roles.

pub mod config;
pub mod errors;

pub use config::{
    ConfigError, ConsortiumMember, MspConfig, NodeConfig, NodeRole, OrdererConfig, PeerConfig,
    StorageConfig,
};
pub use errors::NodeError;
