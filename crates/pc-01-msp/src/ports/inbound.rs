//! # Inbound Ports
//!
//! What the orderer and peer ask of their membership service.

use crate::domain::errors::MspError;
use crate::domain::identity::{Identity, SigningIdentity};
use crate::domain::registry::OrganizationRegistry;
use shared_types::{SerializedIdentity, VerifiedSigner};

pub trait MembershipService: Send + Sync {
    /// This node's organization.
    fn msp_id(&self) -> &str;

    /// This node's signer.
    fn signing_identity(&self) -> &SigningIdentity;

    /// Decode a header creator and check it is currently valid.
    fn deserialize_identity(&self, serialized: &SerializedIdentity) -> Result<Identity, MspError>;

    /// Decode `creator` and verify its signature over `message`.
    fn verify_creator(
        &self,
        creator: &SerializedIdentity,
        message: &[u8],
        signature: &[u8],
    ) -> Result<Identity, MspError>;

    /// Chain `identity` to its organization's root in `registry`.
    fn authorize(
        &self,
        identity: &Identity,
        registry: &OrganizationRegistry,
    ) -> Result<VerifiedSigner, MspError>;
}
