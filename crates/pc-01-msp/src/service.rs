//! # Membership Service
//!
//! Implements `MembershipService` over a loaded local MSP.

use crate::adapters::filesystem::Msp;
use crate::adapters::time::SystemTimeSource;
use crate::domain::errors::MspError;
use crate::domain::identity::{Identity, SigningIdentity};
use crate::domain::registry::OrganizationRegistry;
use crate::ports::inbound::MembershipService;
use crate::ports::outbound::TimeSource;
use shared_types::{SerializedIdentity, VerifiedSigner};
use std::sync::Arc;
use tracing::warn;

pub struct MspService {
    msp: Msp,
    time: Arc<dyn TimeSource>,
}

impl MspService {
    pub fn new(msp: Msp) -> Self {
        Self::with_time(msp, Arc::new(SystemTimeSource))
    }

    pub fn with_time(msp: Msp, time: Arc<dyn TimeSource>) -> Self {
        Self { msp, time }
    }

    pub fn msp(&self) -> &Msp {
        &self.msp
    }
}

impl MembershipService for MspService {
    fn msp_id(&self) -> &str {
        &self.msp.msp_id
    }

    fn signing_identity(&self) -> &SigningIdentity {
        &self.msp.signing_identity
    }

    fn deserialize_identity(&self, serialized: &SerializedIdentity) -> Result<Identity, MspError> {
        let identity = Identity::from_serialized(serialized)?;
        identity
            .certificate()
            .check_validity(self.time.now_secs())?;
        Ok(identity)
    }

    fn verify_creator(
        &self,
        creator: &SerializedIdentity,
        message: &[u8],
        signature: &[u8],
    ) -> Result<Identity, MspError> {
        let identity = self.deserialize_identity(creator)?;
        identity.verify(message, signature).inspect_err(|_| {
            warn!(msp_id = %creator.msp_id, "[pc-01] signature rejected");
        })?;
        Ok(identity)
    }

    fn authorize(
        &self,
        identity: &Identity,
        registry: &OrganizationRegistry,
    ) -> Result<VerifiedSigner, MspError> {
        registry.authorize(identity)
    }
}
