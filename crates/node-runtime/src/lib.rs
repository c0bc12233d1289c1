//! # Node Runtime Library
//!
//! Wires the subsystems into the two node roles. The `node-runtime` binary
//! is a thin wrapper selecting the role from the environment; tests start
//! nodes through this library directly.
//!
//! ## Modules
//!
//! - `container/` - configuration and node errors
//! - `adapters/` - RPC servers and clients
//! - `orderer` - `OrdererNode`: channel creation, ordering, deliver
//! - `peer` - `PeerNode`: channel join, block sync, admin requests
//! - `logging` - subscriber setup

pub mod adapters;
pub mod container;
pub mod logging;
pub mod orderer;
pub mod peer;

pub use container::{NodeConfig, NodeError, NodeRole};
pub use orderer::OrdererNode;
pub use peer::{PeerNode, PeerService};

use anyhow::Result;

/// A running node of either role.
pub enum NodeRuntime {
    Orderer(OrdererNode),
    Peer(PeerNode),
}

impl NodeRuntime {
    pub async fn start(config: NodeConfig) -> Result<Self> {
        match config.role {
            NodeRole::Orderer => Ok(NodeRuntime::Orderer(OrdererNode::start(&config).await?)),
            NodeRole::Peer => Ok(NodeRuntime::Peer(PeerNode::start(&config).await?)),
        }
    }

    pub fn role(&self) -> NodeRole {
        match self {
            NodeRuntime::Orderer(_) => NodeRole::Orderer,
            NodeRuntime::Peer(_) => NodeRole::Peer,
        }
    }

    pub async fn shutdown(self) {
        match self {
            NodeRuntime::Orderer(node) => node.shutdown().await,
            NodeRuntime::Peer(node) => node.shutdown().await,
        }
    }
}
