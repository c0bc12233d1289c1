//! # Certificates
//!
//! X.509 certificates kept as DER and parsed on demand, plus the
//! chain-of-trust check used to authorize a signer against an
//! organization's registered root.

use super::errors::MspError;
use super::keys::{verify_signature, PublicKey};
use sha2::{Digest, Sha256};
use x509_parser::certificate::X509Certificate;
use x509_parser::oid_registry::OID_SIG_ECDSA_WITH_SHA256;
use x509_parser::prelude::FromDer;
use x509_parser::x509::SubjectPublicKeyInfo;

/// An X.509 certificate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Certificate {
    der: Vec<u8>,
    pem: Vec<u8>,
}

impl Certificate {
    /// Parse a single PEM certificate.
    pub fn from_pem(bytes: &[u8]) -> Result<Self, MspError> {
        let block = pem::parse(bytes).map_err(|e| MspError::Parse(format!("PEM: {}", e)))?;
        if block.tag() != "CERTIFICATE" {
            return Err(MspError::Parse(format!(
                "expected CERTIFICATE PEM block, found {}",
                block.tag()
            )));
        }
        Self::from_der(block.into_contents())
    }

    /// Parse every certificate in a PEM bundle.
    pub fn bundle_from_pem(bytes: &[u8]) -> Result<Vec<Self>, MspError> {
        let blocks = pem::parse_many(bytes).map_err(|e| MspError::Parse(format!("PEM: {}", e)))?;
        let certs = blocks
            .into_iter()
            .filter(|b| b.tag() == "CERTIFICATE")
            .map(|b| Self::from_der(b.into_contents()))
            .collect::<Result<Vec<_>, _>>()?;
        if certs.is_empty() {
            return Err(MspError::Parse("no CERTIFICATE block found".into()));
        }
        Ok(certs)
    }

    pub fn from_der(der: Vec<u8>) -> Result<Self, MspError> {
        X509Certificate::from_der(&der)
            .map_err(|e| MspError::Parse(format!("X.509: {}", e)))?;
        let pem = pem::encode(&pem::Pem::new("CERTIFICATE", der.clone())).into_bytes();
        Ok(Self { der, pem })
    }

    pub fn der(&self) -> &[u8] {
        &self.der
    }

    /// Canonical PEM encoding (what travels in `SerializedIdentity`).
    pub fn pem(&self) -> &[u8] {
        &self.pem
    }

    pub(crate) fn parsed(&self) -> Result<X509Certificate<'_>, MspError> {
        X509Certificate::from_der(&self.der)
            .map(|(_, cert)| cert)
            .map_err(|e| MspError::Parse(format!("X.509: {}", e)))
    }

    pub fn public_key(&self) -> Result<PublicKey, MspError> {
        let cert = self.parsed()?;
        PublicKey::from_spki_der(cert.public_key().raw)
    }

    pub fn subject(&self) -> Result<String, MspError> {
        Ok(self.parsed()?.subject().to_string())
    }

    /// Hex SHA-256 of the DER encoding.
    pub fn fingerprint(&self) -> String {
        hex::encode(Sha256::digest(&self.der))
    }

    /// Fails unless `not_before <= now_secs <= not_after`.
    pub fn check_validity(&self, now_secs: i64) -> Result<(), MspError> {
        let cert = self.parsed()?;
        let validity = cert.validity();
        if now_secs < validity.not_before.timestamp() || now_secs > validity.not_after.timestamp()
        {
            return Err(MspError::CertificateExpired(format!(
                "{} valid {} .. {}",
                cert.subject(),
                validity.not_before,
                validity.not_after
            )));
        }
        Ok(())
    }
}

/// Check that `leaf` was issued by the root CA `candidate`.
///
/// The candidate must be a self-signed CA certificate; the leaf's issuer
/// must name the candidate and its signature must verify under the
/// candidate's public key.
pub fn verify_certificate_chain(leaf: &Certificate, candidate: &Certificate) -> Result<(), MspError> {
    let root = candidate.parsed()?;
    if !root.is_ca() {
        return Err(MspError::NotCa);
    }
    if root.subject().as_raw() != root.issuer().as_raw()
        || verify_issued_by(&root, root.public_key()).is_err()
    {
        return Err(MspError::NotSelfSigned);
    }

    let leaf_cert = leaf.parsed()?;
    if leaf_cert.issuer().as_raw() != root.subject().as_raw() {
        return Err(MspError::ChainMismatch(format!(
            "issuer '{}' is not '{}'",
            leaf_cert.issuer(),
            root.subject()
        )));
    }
    verify_issued_by(&leaf_cert, root.public_key())
}

/// Check `cert`'s signature under `issuer`. x509-parser cannot verify
/// secp256k1 signatures, so those go through k256.
fn verify_issued_by(
    cert: &X509Certificate<'_>,
    issuer: &SubjectPublicKeyInfo<'_>,
) -> Result<(), MspError> {
    let key = match PublicKey::from_spki_der(issuer.raw) {
        Ok(key @ PublicKey::Secp256k1(_)) => key,
        _ => {
            return cert.verify_signature(Some(issuer)).map_err(|e| {
                MspError::ChainMismatch(format!("signature by root rejected: {}", e))
            })
        }
    };
    let algorithm = &cert.signature_algorithm.algorithm;
    if *algorithm != OID_SIG_ECDSA_WITH_SHA256 {
        return Err(MspError::ChainMismatch(format!(
            "signature algorithm {} not usable with a secp256k1 root",
            algorithm
        )));
    }
    let signature: &[u8] = &cert.signature_value.data;
    if verify_signature(&key, cert.tbs_certificate.as_ref(), signature)? {
        Ok(())
    } else {
        Err(MspError::ChainMismatch("signature by root rejected".into()))
    }
}
