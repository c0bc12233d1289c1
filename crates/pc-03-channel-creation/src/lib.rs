//! # Channel Creation (PC-03)
//!
//! Founding a channel is one signed proposal answered by one
//! acknowledgement on a long-lived stream:
//!
//! ```text
//! peer                                   orderer
//!  |  Envelope{Config, block 0 proposal}  |
//!  | -----------------------------------> |  decode, type, name free,
//!  |                                      |  signature, consortium chain,
//!  |                                      |  merge config, store + commit
//!  |  ChannelCreationResponse{status, b0} |
//!  | <----------------------------------- |
//! ```
//!
//! At most one channel of a given name is ever committed: the name check
//! and the commit share one critical section on the `ChannelTable`.

#![cfg_attr(test, allow(clippy::unwrap_used))]

pub mod adapters;
pub mod domain;
pub mod ports;
pub mod service;

pub use adapters::stream::submit_proposal;
pub use domain::config_block::{build_genesis_block, config_from_block};
pub use domain::consortium::ConsortiumConfig;
pub use domain::errors::{ChannelCreationError, StreamError};
pub use domain::proposal::ChannelProposal;
pub use domain::table::{ChannelRecord, ChannelTable};
pub use ports::inbound::ChannelCreationApi;
pub use ports::outbound::ProposalStream;
pub use service::{ChannelCreationDependencies, ChannelCreationService};
