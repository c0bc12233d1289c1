//! # Domain Layer

pub mod channel;
pub mod errors;
pub mod report;

pub use channel::{ChannelManager, ChannelState};
pub use errors::SyncError;
pub use report::SyncReport;
