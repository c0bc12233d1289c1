//! # MSP Errors
//!
//! Identity failures are never transient: nothing here is retried.

use shared_types::{CodecError, StatusCode};
use thiserror::Error;

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum MspError {
    /// A required MSP sub-directory is missing, empty or over-full.
    #[error("MSP structure error: {0}")]
    Structure(String),

    /// PEM, DER, certificate or key decoding failed.
    #[error("Parse error: {0}")]
    Parse(String),

    /// Public key algorithm is neither ECDSA (P-256, secp256k1) nor RSA.
    #[error("Unsupported key type: {0}")]
    UnsupportedKeyType(String),

    #[error("Signature verification failed")]
    SignatureMismatch,

    /// Leaf certificate was not issued by the candidate root.
    #[error("Certificate chain mismatch: {0}")]
    ChainMismatch(String),

    #[error("Certificate expired or not yet valid: {0}")]
    CertificateExpired(String),

    /// Certificate public key does not belong to the private key.
    #[error("Certificate does not match private key")]
    KeyMismatch,

    #[error("Candidate root is not a CA certificate")]
    NotCa,

    #[error("Candidate root is not self-signed")]
    NotSelfSigned,

    #[error("Unknown organization: {0}")]
    UnknownOrganization(String),

    #[error("I/O error: {0}")]
    Io(String),

    #[error(transparent)]
    Codec(#[from] CodecError),
}

impl MspError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            MspError::Parse(_) | MspError::UnsupportedKeyType(_) | MspError::SignatureMismatch => {
                StatusCode::InvalidSignature
            }
            MspError::ChainMismatch(_)
            | MspError::CertificateExpired(_)
            | MspError::NotCa
            | MspError::NotSelfSigned
            | MspError::UnknownOrganization(_) => StatusCode::Forbidden,
            MspError::Structure(_) | MspError::KeyMismatch | MspError::Io(_) => {
                StatusCode::Internal
            }
            MspError::Codec(e) => e.status_code(),
        }
    }
}

impl From<std::io::Error> for MspError {
    fn from(e: std::io::Error) -> Self {
        MspError::Io(e.to_string())
    }
}
