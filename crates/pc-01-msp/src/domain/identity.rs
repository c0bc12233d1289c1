//! # Identities
//!
//! `Identity` is a verified-shape certificate bound to an MSP id.
//! `SigningIdentity` adds the private key and implements the envelope
//! `Signer` seam.

use super::certificate::Certificate;
use super::errors::MspError;
use super::keys::{verify_signature, PrivateKey, PublicKey};
use crate::ports::outbound::TimeSource;
use shared_types::{SerializedIdentity, Signer};
use std::sync::Arc;

/// A cryptographic actor: MSP id plus certificate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    msp_id: String,
    certificate: Certificate,
    public_key: PublicKey,
}

impl Identity {
    pub fn new(msp_id: impl Into<String>, certificate: Certificate) -> Result<Self, MspError> {
        let public_key = certificate.public_key()?;
        Ok(Self {
            msp_id: msp_id.into(),
            certificate,
            public_key,
        })
    }

    /// Decode the creator field of a header. Only parses; trust is
    /// established separately by chain verification.
    pub fn from_serialized(serialized: &SerializedIdentity) -> Result<Self, MspError> {
        if serialized.msp_id.is_empty() {
            return Err(MspError::Parse("identity has empty msp id".into()));
        }
        let certificate = Certificate::from_pem(&serialized.id_bytes)?;
        Self::new(serialized.msp_id.clone(), certificate)
    }

    pub fn serialize(&self) -> SerializedIdentity {
        SerializedIdentity::new(self.msp_id.clone(), self.certificate.pem().to_vec())
    }

    /// Unique identifier: certificate fingerprint.
    pub fn id(&self) -> String {
        self.certificate.fingerprint()
    }

    pub fn msp_id(&self) -> &str {
        &self.msp_id
    }

    pub fn certificate(&self) -> &Certificate {
        &self.certificate
    }

    pub fn public_key(&self) -> &PublicKey {
        &self.public_key
    }

    /// `Ok(())` iff `signature` is a valid signature over `message`.
    pub fn verify(&self, message: &[u8], signature: &[u8]) -> Result<(), MspError> {
        if verify_signature(&self.public_key, message, signature)? {
            Ok(())
        } else {
            Err(MspError::SignatureMismatch)
        }
    }
}

/// An identity holding its private key.
#[derive(Clone)]
pub struct SigningIdentity {
    identity: Identity,
    key: PrivateKey,
    time: Arc<dyn TimeSource>,
}

impl std::fmt::Debug for SigningIdentity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SigningIdentity")
            .field("msp_id", &self.identity.msp_id)
            .field("id", &self.identity.id())
            .finish()
    }
}

impl SigningIdentity {
    /// Bind `key` to `identity`; the certificate must carry the key's
    /// public half and be valid now.
    pub fn new(
        identity: Identity,
        key: PrivateKey,
        time: Arc<dyn TimeSource>,
    ) -> Result<Self, MspError> {
        if key.public_key() != *identity.public_key() {
            return Err(MspError::KeyMismatch);
        }
        identity.certificate().check_validity(time.now_secs())?;
        Ok(Self {
            identity,
            key,
            time,
        })
    }

    pub fn identity(&self) -> &Identity {
        &self.identity
    }

    pub fn msp_id(&self) -> &str {
        self.identity.msp_id()
    }

    pub fn serialize(&self) -> SerializedIdentity {
        self.identity.serialize()
    }

    /// Sign `message`. Refuses once the certificate has expired.
    pub fn sign_message(&self, message: &[u8]) -> Result<Vec<u8>, MspError> {
        self.identity
            .certificate()
            .check_validity(self.time.now_secs())?;
        self.key.sign(message)
    }

    pub fn verify(&self, message: &[u8], signature: &[u8]) -> Result<(), MspError> {
        self.identity.verify(message, signature)
    }
}

impl Signer for SigningIdentity {
    type Error = MspError;

    fn creator(&self) -> SerializedIdentity {
        self.serialize()
    }

    fn sign(&self, message: &[u8]) -> Result<Vec<u8>, MspError> {
        self.sign_message(message)
    }
}
