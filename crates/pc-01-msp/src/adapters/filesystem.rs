//! # MSP Directory Loader
//!
//! Layout consumed (never produced) by the node:
//!
//! ```text
//! <msp>/signcerts/   exactly one certificate
//! <msp>/keystore/    exactly one private key
//! <msp>/cacerts/     one or more root CA certificates
//! <msp>/tlscacerts/  optional TLS root certificates
//! ```

use crate::adapters::time::SystemTimeSource;
use crate::domain::certificate::{verify_certificate_chain, Certificate};
use crate::domain::errors::MspError;
use crate::domain::identity::{Identity, SigningIdentity};
use crate::domain::keys::PrivateKey;
use crate::ports::outbound::TimeSource;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info};

pub const SIGNCERTS_DIR: &str = "signcerts";
pub const KEYSTORE_DIR: &str = "keystore";
pub const CACERTS_DIR: &str = "cacerts";
pub const TLSCACERTS_DIR: &str = "tlscacerts";

/// A node's local MSP.
#[derive(Debug, Clone)]
pub struct Msp {
    pub msp_id: String,
    pub signing_identity: SigningIdentity,
    pub ca_certs: Vec<Certificate>,
    pub tls_ca_certs: Vec<Certificate>,
}

impl Msp {
    /// Load with the system clock.
    pub fn load(path: impl AsRef<Path>, msp_id: &str) -> Result<Self, MspError> {
        Self::load_with_time(path, msp_id, Arc::new(SystemTimeSource))
    }

    pub fn load_with_time(
        path: impl AsRef<Path>,
        msp_id: &str,
        time: Arc<dyn TimeSource>,
    ) -> Result<Self, MspError> {
        let path = path.as_ref();
        if !path.is_dir() {
            return Err(MspError::Structure(format!(
                "{} is not a directory",
                path.display()
            )));
        }

        let cert_file = single_file(&path.join(SIGNCERTS_DIR))?;
        let key_file = single_file(&path.join(KEYSTORE_DIR))?;
        let ca_files = list_files(&path.join(CACERTS_DIR))?;
        if ca_files.is_empty() {
            return Err(MspError::Structure(format!("{} is empty", CACERTS_DIR)));
        }

        let certificate = Certificate::from_pem(&fs::read(&cert_file)?)?;
        let key = PrivateKey::from_pem_or_der(&fs::read(&key_file)?)?;
        let ca_certs = read_bundles(&ca_files)?;

        let tls_dir = path.join(TLSCACERTS_DIR);
        let tls_ca_certs = if tls_dir.is_dir() {
            read_bundles(&list_files(&tls_dir)?)?
        } else {
            Vec::new()
        };

        let identity = Identity::new(msp_id, certificate)?;
        let signing_identity = SigningIdentity::new(identity, key, time)?;

        // The node's own certificate must come from one of its roots.
        let chained = ca_certs
            .iter()
            .any(|ca| verify_certificate_chain(signing_identity.identity().certificate(), ca).is_ok());
        if !chained {
            return Err(MspError::ChainMismatch(format!(
                "signing certificate of {} does not chain to any cacert",
                msp_id
            )));
        }

        info!(
            msp_id,
            id = %signing_identity.identity().id(),
            roots = ca_certs.len(),
            "[pc-01] MSP loaded"
        );

        Ok(Self {
            msp_id: msp_id.to_string(),
            signing_identity,
            ca_certs,
            tls_ca_certs,
        })
    }

    /// PEM encodings of the CA roots, as placed in channel configs.
    pub fn root_certs_pem(&self) -> Vec<Vec<u8>> {
        self.ca_certs.iter().map(|c| c.pem().to_vec()).collect()
    }
}

/// Load the signing identity of the MSP at `path`.
pub fn load(path: impl AsRef<Path>, msp_id: &str) -> Result<SigningIdentity, MspError> {
    Ok(Msp::load(path, msp_id)?.signing_identity)
}

fn list_files(dir: &Path) -> Result<Vec<PathBuf>, MspError> {
    if !dir.is_dir() {
        return Err(MspError::Structure(format!(
            "missing directory {}",
            dir.display()
        )));
    }
    let mut files = Vec::new();
    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        if entry.file_type()?.is_file() {
            files.push(entry.path());
        }
    }
    files.sort();
    debug!(dir = %dir.display(), count = files.len(), "[pc-01] scanned MSP directory");
    Ok(files)
}

fn single_file(dir: &Path) -> Result<PathBuf, MspError> {
    let mut files = list_files(dir)?;
    match files.len() {
        1 => Ok(files.remove(0)),
        0 => Err(MspError::Structure(format!("{} is empty", dir.display()))),
        n => Err(MspError::Structure(format!(
            "{} holds {} files, expected exactly one",
            dir.display(),
            n
        ))),
    }
}

fn read_bundles(files: &[PathBuf]) -> Result<Vec<Certificate>, MspError> {
    let mut certs = Vec::new();
    for file in files {
        certs.extend(Certificate::bundle_from_pem(&fs::read(file)?)?);
    }
    Ok(certs)
}
