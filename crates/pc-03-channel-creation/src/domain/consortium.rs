//! # Consortium
//!
//! The orderer-side list of organizations allowed to found channels.

use pc_01_msp::{MspError, OrganizationRegistry};
use serde::{Deserialize, Serialize};
use shared_types::OrganizationConfig;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConsortiumConfig {
    pub name: String,
    pub organizations: Vec<OrganizationConfig>,
}

impl ConsortiumConfig {
    pub fn new(name: impl Into<String>, organizations: Vec<OrganizationConfig>) -> Self {
        Self {
            name: name.into(),
            organizations,
        }
    }

    pub fn organization(&self, msp_id: &str) -> Option<&OrganizationConfig> {
        self.organizations.iter().find(|o| o.msp_id == msp_id)
    }

    /// Root registry used for the chain-of-trust check.
    pub fn registry(&self) -> Result<OrganizationRegistry, MspError> {
        OrganizationRegistry::from_organizations(&self.organizations)
    }
}
