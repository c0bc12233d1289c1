//! # Integration Flows
//!
//! Full nodes on loopback, driven through their RPC surfaces.
//!
//! - `channel_lifecycle` - create, join, broadcast, follow, rejections
//! - `creation_race` - concurrent proposals for one channel name
//! - `sync_convergence` - late and restarted peers converge on the orderer's chain

pub mod channel_lifecycle;
pub mod creation_race;
pub mod sync_convergence;
