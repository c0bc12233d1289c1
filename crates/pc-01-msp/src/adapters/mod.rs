//! Adapters: on-disk MSP directories and the system clock.

pub mod filesystem;
pub mod time;
