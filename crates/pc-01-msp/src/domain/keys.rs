//! # Keys
//!
//! Public/private key handling for the three supported algorithms.
//!
//! Every scheme hashes the message with SHA-256 exactly once:
//! ECDSA-with-SHA256 (ASN.1 DER `{r, s}` signatures) for P-256 and
//! secp256k1, RSASSA-PKCS1-v1_5 with SHA-256 for RSA.

use super::errors::MspError;
use p256::ecdsa::signature::{Signer as _, Verifier as _};
use p256::pkcs8::{DecodePrivateKey as _, DecodePublicKey as _};
use rsa::pkcs1::DecodeRsaPrivateKey as _;
use rsa::pkcs8::{DecodePrivateKey as _, DecodePublicKey as _};
use rsa::signature::{SignatureEncoding, Signer as _, Verifier as _};
use sha2::Sha256;

/// A verification key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PublicKey {
    P256(p256::PublicKey),
    Secp256k1(k256::PublicKey),
    Rsa(rsa::RsaPublicKey),
}

impl PublicKey {
    /// Decode a DER `SubjectPublicKeyInfo`. The algorithm identifier inside
    /// the structure selects the curve or RSA.
    pub fn from_spki_der(der: &[u8]) -> Result<Self, MspError> {
        if let Ok(key) = p256::PublicKey::from_public_key_der(der) {
            return Ok(PublicKey::P256(key));
        }
        if let Ok(key) = k256::PublicKey::from_public_key_der(der) {
            return Ok(PublicKey::Secp256k1(key));
        }
        if let Ok(key) = rsa::RsaPublicKey::from_public_key_der(der) {
            return Ok(PublicKey::Rsa(key));
        }
        Err(MspError::UnsupportedKeyType(
            "public key is not ECDSA P-256, secp256k1 or RSA".into(),
        ))
    }

    pub fn algorithm(&self) -> &'static str {
        match self {
            PublicKey::P256(_) => "ECDSA-P256",
            PublicKey::Secp256k1(_) => "ECDSA-secp256k1",
            PublicKey::Rsa(_) => "RSA",
        }
    }
}

/// A signing key loaded from a keystore.
#[derive(Clone)]
pub enum PrivateKey {
    P256(p256::SecretKey),
    Secp256k1(k256::SecretKey),
    Rsa(rsa::RsaPrivateKey),
}

impl std::fmt::Debug for PrivateKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "PrivateKey({})", self.public_key().algorithm())
    }
}

impl PrivateKey {
    /// Parse a keystore file: PEM (any label) or raw DER.
    ///
    /// Encodings are tried in order PKCS#1 (RSA), PKCS#8 (P-256,
    /// secp256k1, RSA), SEC1 (P-256, secp256k1); first success wins.
    pub fn from_pem_or_der(bytes: &[u8]) -> Result<Self, MspError> {
        let der = match pem::parse(bytes) {
            Ok(block) => block.into_contents(),
            Err(_) => bytes.to_vec(),
        };

        if let Ok(key) = rsa::RsaPrivateKey::from_pkcs1_der(&der) {
            return Ok(PrivateKey::Rsa(key));
        }
        if let Ok(key) = p256::SecretKey::from_pkcs8_der(&der) {
            return Ok(PrivateKey::P256(key));
        }
        if let Ok(key) = k256::SecretKey::from_pkcs8_der(&der) {
            return Ok(PrivateKey::Secp256k1(key));
        }
        if let Ok(key) = rsa::RsaPrivateKey::from_pkcs8_der(&der) {
            return Ok(PrivateKey::Rsa(key));
        }
        if let Ok(key) = p256::SecretKey::from_sec1_der(&der) {
            return Ok(PrivateKey::P256(key));
        }
        if let Ok(key) = k256::SecretKey::from_sec1_der(&der) {
            return Ok(PrivateKey::Secp256k1(key));
        }
        Err(MspError::Parse(
            "private key is not PKCS#1, PKCS#8 or SEC1 encoded".into(),
        ))
    }

    pub fn public_key(&self) -> PublicKey {
        match self {
            PrivateKey::P256(k) => PublicKey::P256(k.public_key()),
            PrivateKey::Secp256k1(k) => PublicKey::Secp256k1(k.public_key()),
            PrivateKey::Rsa(k) => PublicKey::Rsa(k.to_public_key()),
        }
    }

    /// Sign `message` (hashed internally with SHA-256).
    pub fn sign(&self, message: &[u8]) -> Result<Vec<u8>, MspError> {
        match self {
            PrivateKey::P256(k) => {
                let signer = p256::ecdsa::SigningKey::from(k);
                let sig: p256::ecdsa::Signature = signer.sign(message);
                Ok(sig.to_der().as_bytes().to_vec())
            }
            PrivateKey::Secp256k1(k) => {
                let signer = k256::ecdsa::SigningKey::from(k);
                let sig: k256::ecdsa::Signature = signer.sign(message);
                Ok(sig.to_der().as_bytes().to_vec())
            }
            PrivateKey::Rsa(k) => {
                let signer = rsa::pkcs1v15::SigningKey::<Sha256>::new(k.clone());
                let sig = signer
                    .try_sign(message)
                    .map_err(|e| MspError::Parse(format!("RSA signing failed: {}", e)))?;
                Ok(sig.to_vec())
            }
        }
    }
}

/// Verify `signature` over `message` with `public_key`.
///
/// `Ok(false)` means a well-formed signature that does not verify; a
/// signature that cannot even be decoded is a `Parse` error.
pub fn verify_signature(
    public_key: &PublicKey,
    message: &[u8],
    signature: &[u8],
) -> Result<bool, MspError> {
    match public_key {
        PublicKey::P256(key) => {
            let sig = p256::ecdsa::Signature::from_der(signature)
                .map_err(|e| MspError::Parse(format!("ECDSA signature: {}", e)))?;
            let verifier = p256::ecdsa::VerifyingKey::from(key);
            Ok(verifier.verify(message, &sig).is_ok())
        }
        PublicKey::Secp256k1(key) => {
            let sig = k256::ecdsa::Signature::from_der(signature)
                .map_err(|e| MspError::Parse(format!("ECDSA signature: {}", e)))?;
            let verifier = k256::ecdsa::VerifyingKey::from(key);
            Ok(verifier.verify(message, &sig).is_ok())
        }
        PublicKey::Rsa(key) => {
            let sig = rsa::pkcs1v15::Signature::try_from(signature)
                .map_err(|e| MspError::Parse(format!("RSA signature: {}", e)))?;
            let verifier = rsa::pkcs1v15::VerifyingKey::<Sha256>::new(key.clone());
            Ok(verifier.verify(message, &sig).is_ok())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use p256::pkcs8::EncodePrivateKey;
    use rsa::pkcs1::EncodeRsaPrivateKey;

    #[test]
    fn test_p256_sign_verify_and_tamper() {
        let key = PrivateKey::P256(p256::SecretKey::random(&mut rand::thread_rng()));
        let sig = key.sign(b"payload").unwrap();
        let public = key.public_key();
        assert!(verify_signature(&public, b"payload", &sig).unwrap());
        assert!(!verify_signature(&public, b"payloaD", &sig).unwrap());
    }

    #[test]
    fn test_secp256k1_sign_verify() {
        let key = PrivateKey::Secp256k1(k256::SecretKey::random(&mut rand::thread_rng()));
        let sig = key.sign(b"m").unwrap();
        assert!(verify_signature(&key.public_key(), b"m", &sig).unwrap());
    }

    #[test]
    fn test_rsa_pkcs1_key_parses_first() {
        let rsa_key = rsa::RsaPrivateKey::new(&mut rand::thread_rng(), 1024).unwrap();
        let pem = rsa_key.to_pkcs1_pem(Default::default()).unwrap();
        let key = PrivateKey::from_pem_or_der(pem.as_bytes()).unwrap();
        assert!(matches!(key, PrivateKey::Rsa(_)));

        let sig = key.sign(b"hello").unwrap();
        assert!(verify_signature(&key.public_key(), b"hello", &sig).unwrap());
        assert!(!verify_signature(&key.public_key(), b"hellp", &sig).unwrap());
    }

    #[test]
    fn test_pkcs8_and_sec1_ec_keys_parse() {
        let secret = p256::SecretKey::random(&mut rand::thread_rng());
        let pkcs8 = secret.to_pkcs8_der().unwrap();
        let parsed = PrivateKey::from_pem_or_der(pkcs8.as_bytes()).unwrap();
        assert_eq!(parsed.public_key(), PublicKey::P256(secret.public_key()));

        let sec1 = secret.to_sec1_der().unwrap();
        let parsed = PrivateKey::from_pem_or_der(&sec1).unwrap();
        assert_eq!(parsed.public_key(), PublicKey::P256(secret.public_key()));
    }

    #[test]
    fn test_garbage_key_is_parse_error() {
        assert!(matches!(
            PrivateKey::from_pem_or_der(b"not a key"),
            Err(MspError::Parse(_))
        ));
    }

    #[test]
    fn test_malformed_signature_is_parse_error() {
        let key = PrivateKey::P256(p256::SecretKey::random(&mut rand::thread_rng()));
        assert!(matches!(
            verify_signature(&key.public_key(), b"m", &[1, 2, 3]),
            Err(MspError::Parse(_))
        ));
    }
}
