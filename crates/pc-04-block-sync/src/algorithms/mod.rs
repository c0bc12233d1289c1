//! # Algorithms
//!
//! - `validation` - genesis and successor block checks
//! - `batching` - range planning for catch-up passes

pub mod batching;
pub mod validation;

pub use batching::next_batch;
pub use validation::{orderer_registry, validate_genesis, validate_next};
