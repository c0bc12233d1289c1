//! # Permissioned-Chain Test Suite
//!
//! ## Structure
//!
//! ```text
//! tests/src/
//! ├── fixtures.rs       # Loopback network: orgs, MSP dirs, node configs
//! └── integration/      # Cross-crate flows over real TCP
//! ```
//!
//! ## Running Tests
//!
//! ```bash
//! cargo test -p pc-tests
//! cargo test -p pc-tests integration::sync_convergence
//! ```

pub mod fixtures;
pub mod integration;
