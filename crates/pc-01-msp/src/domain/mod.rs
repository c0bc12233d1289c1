//! Domain layer: keys, certificates, identities and trust roots.

pub mod certificate;
pub mod errors;
pub mod identity;
pub mod keys;
pub mod registry;
