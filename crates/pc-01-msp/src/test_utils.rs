//! # Test Fixtures
//!
//! rcgen-minted organizations: a self-signed root CA per organization and
//! member certificates issued by it, written out in MSP directory layout
//! under a temporary directory that lives as long as the fixture.

#![allow(clippy::expect_used)]

use crate::adapters::filesystem::{Msp, CACERTS_DIR, KEYSTORE_DIR, SIGNCERTS_DIR};
use crate::domain::identity::SigningIdentity;
use rcgen::{
    BasicConstraints, CertificateParams, DnType, IsCa, KeyPair, KeyUsagePurpose,
};
use shared_types::OrganizationConfig;
use std::fs;
use std::path::PathBuf;
use tempfile::TempDir;

/// Certificate and PKCS#8 key of one member.
#[derive(Debug, Clone)]
pub struct IssuedIdentity {
    pub cert_pem: String,
    pub key_pem: String,
}

/// One organization with its own root CA.
pub struct OrgFixture {
    pub msp_id: String,
    pub ca_pem: String,
    ca_cert: rcgen::Certificate,
    ca_key: KeyPair,
    dir: TempDir,
}

impl OrgFixture {
    pub fn new(msp_id: &str) -> Self {
        let ca_key = KeyPair::generate().expect("CA key");
        let mut params = CertificateParams::new(Vec::<String>::new()).expect("CA params");
        params
            .distinguished_name
            .push(DnType::CommonName, format!("ca.{}", msp_id.to_lowercase()));
        params
            .distinguished_name
            .push(DnType::OrganizationName, msp_id);
        params.is_ca = IsCa::Ca(BasicConstraints::Unconstrained);
        params.key_usages = vec![
            KeyUsagePurpose::KeyCertSign,
            KeyUsagePurpose::CrlSign,
            KeyUsagePurpose::DigitalSignature,
        ];
        let ca_cert = params.self_signed(&ca_key).expect("CA cert");

        Self {
            msp_id: msp_id.to_string(),
            ca_pem: ca_cert.pem(),
            ca_cert,
            ca_key,
            dir: TempDir::new().expect("tempdir"),
        }
    }

    /// Issue a member certificate signed by this organization's CA.
    pub fn issue(&self, common_name: &str) -> IssuedIdentity {
        let key = KeyPair::generate().expect("member key");
        let mut params =
            CertificateParams::new(vec![common_name.to_string()]).expect("member params");
        params
            .distinguished_name
            .push(DnType::CommonName, common_name);
        params
            .distinguished_name
            .push(DnType::OrganizationName, self.msp_id.as_str());
        let cert = params
            .signed_by(&key, &self.ca_cert, &self.ca_key)
            .expect("member cert");
        IssuedIdentity {
            cert_pem: cert.pem(),
            key_pem: key.serialize_pem(),
        }
    }

    /// Write an MSP directory for `member` and return its path.
    pub fn write_msp(&self, member: &IssuedIdentity, name: &str) -> PathBuf {
        let root = self.dir.path().join(name);
        for sub in [SIGNCERTS_DIR, KEYSTORE_DIR, CACERTS_DIR] {
            fs::create_dir_all(root.join(sub)).expect("msp dir");
        }
        fs::write(root.join(SIGNCERTS_DIR).join("cert.pem"), &member.cert_pem).expect("cert");
        fs::write(root.join(KEYSTORE_DIR).join("priv_sk"), &member.key_pem).expect("key");
        fs::write(root.join(CACERTS_DIR).join("ca.pem"), &self.ca_pem).expect("ca");
        root
    }

    /// Issue, write and load a full local MSP.
    pub fn msp(&self, common_name: &str) -> Msp {
        let member = self.issue(common_name);
        let dir = self.write_msp(&member, common_name);
        Msp::load(dir, &self.msp_id).expect("load msp")
    }

    pub fn signing_identity(&self, common_name: &str) -> SigningIdentity {
        self.msp(common_name).signing_identity
    }

    /// Channel membership entry with default policies.
    pub fn organization_config(&self) -> OrganizationConfig {
        OrganizationConfig::new(self.msp_id.clone(), vec![self.ca_pem.as_bytes().to_vec()])
    }
}
