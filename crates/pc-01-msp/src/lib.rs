//! # Membership Service Provider (PC-01)
//!
//! Identity and trust for orderer and peer nodes.
//!
//! ## Architecture
//!
//! - **Domain** (`domain/`): key parsing, signing and verification,
//!   X.509 certificates, chain-of-trust checks, organization registries
//! - **Ports** (`ports/`): `MembershipService` (inbound), `TimeSource`
//!   (outbound)
//! - **Adapters** (`adapters/`): MSP directory loader, system clock
//! - **Service** (`service.rs`): `MspService`
//!
//! ## Trust model
//!
//! A signer is trusted for an organization only when its certificate
//! verifies under a self-signed CA root registered for that organization.
//! Identity failures are hard rejections; nothing is retried.

#![cfg_attr(test, allow(clippy::unwrap_used))]

pub mod adapters;
pub mod domain;
pub mod ports;
pub mod service;

#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;

pub use adapters::filesystem::{load, Msp};
pub use adapters::time::{FixedTimeSource, SystemTimeSource};
pub use domain::certificate::{verify_certificate_chain, Certificate};
pub use domain::errors::MspError;
pub use domain::identity::{Identity, SigningIdentity};
pub use domain::keys::{verify_signature, PrivateKey, PublicKey};
pub use domain::registry::OrganizationRegistry;
pub use ports::inbound::MembershipService;
pub use ports::outbound::TimeSource;
pub use service::MspService;
