//! # Organization Registry
//!
//! Maps MSP ids to root CA certificates (and admin certificates). The
//! orderer keeps one for the consortium; every channel has one for its
//! members.

use super::certificate::{verify_certificate_chain, Certificate};
use super::errors::MspError;
use super::identity::Identity;
use shared_types::{OrganizationConfig, VerifiedSigner};
use std::collections::HashMap;
use tracing::debug;

#[derive(Debug, Clone, Default)]
struct OrganizationEntry {
    roots: Vec<Certificate>,
    admins: Vec<Certificate>,
}

#[derive(Debug, Clone, Default)]
pub struct OrganizationRegistry {
    organizations: HashMap<String, OrganizationEntry>,
}

impl OrganizationRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from channel organization configs (PEM roots and admins).
    pub fn from_organizations(organizations: &[OrganizationConfig]) -> Result<Self, MspError> {
        let mut registry = Self::new();
        for org in organizations {
            let roots = org
                .root_certs
                .iter()
                .map(|pem| Certificate::bundle_from_pem(pem))
                .collect::<Result<Vec<_>, _>>()?
                .into_iter()
                .flatten()
                .collect();
            let admins = org
                .admin_certs
                .iter()
                .map(|pem| Certificate::from_pem(pem))
                .collect::<Result<Vec<_>, _>>()?;
            registry.organizations.insert(
                org.msp_id.clone(),
                OrganizationEntry { roots, admins },
            );
        }
        Ok(registry)
    }

    pub fn insert(&mut self, msp_id: impl Into<String>, roots: Vec<Certificate>) {
        self.organizations.entry(msp_id.into()).or_default().roots = roots;
    }

    pub fn contains(&self, msp_id: &str) -> bool {
        self.organizations.contains_key(msp_id)
    }

    pub fn msp_ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.organizations.keys().cloned().collect();
        ids.sort();
        ids
    }

    pub fn roots(&self, msp_id: &str) -> Option<&[Certificate]> {
        self.organizations.get(msp_id).map(|e| e.roots.as_slice())
    }

    /// Resolve the identity's declared organization and require its
    /// certificate to chain to one of that organization's roots.
    pub fn authorize(&self, identity: &Identity) -> Result<VerifiedSigner, MspError> {
        let entry = self
            .organizations
            .get(identity.msp_id())
            .ok_or_else(|| MspError::UnknownOrganization(identity.msp_id().to_string()))?;

        let mut last_error = MspError::ChainMismatch(format!(
            "organization {} has no root certificates",
            identity.msp_id()
        ));
        for root in &entry.roots {
            match verify_certificate_chain(identity.certificate(), root) {
                Ok(()) => {
                    let is_admin = entry
                        .admins
                        .iter()
                        .any(|admin| admin.der() == identity.certificate().der());
                    return Ok(VerifiedSigner {
                        msp_id: identity.msp_id().to_string(),
                        is_admin,
                    });
                }
                Err(e) => {
                    debug!(msp_id = identity.msp_id(), error = %e, "[pc-01] root rejected identity");
                    last_error = e;
                }
            }
        }
        Err(last_error)
    }
}
