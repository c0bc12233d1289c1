//! # Node Configuration
//!
//! Plain structs with defaults, overridable from `PC_*` environment
//! variables. Network profiles and YAML files are handled outside the node.
//!
//! | Variable | Field |
//! |----------|-------|
//! | `PC_ROLE` | `role` (`orderer` or `peer`) |
//! | `PC_MSP_DIR`, `PC_MSP_ID` | local MSP |
//! | `PC_DATA_DIR` | block storage root |
//! | `PC_LISTEN_ADDR` | listen address of the selected role |
//! | `PC_ORDERER_ADDR` | orderer address used by a peer |
//! | `PC_CONSORTIUM` | consortium name |
//! | `PC_CONSORTIUM_ORGS` | `MSPID=/path/ca.pem` entries separated by `;` |
//! | `PC_BATCH_MAX_MESSAGES`, `PC_BATCH_TIMEOUT_MS`, `PC_BATCH_MAX_BYTES` | batch parameters |
//! | `PC_SYNC_BATCH_SIZE`, `PC_RPC_TIMEOUT_SECS` | peer sync |

use pc_04_block_sync::SyncConfig;
use serde::{Deserialize, Serialize};
use shared_types::BatchParameters;
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Invalid value {value:?} for {key}")]
    InvalidValue { key: String, value: String },

    #[error("Unknown role {0:?}: expected orderer or peer")]
    UnknownRole(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeRole {
    Orderer,
    Peer,
}

impl FromStr for NodeRole {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "orderer" => Ok(NodeRole::Orderer),
            "peer" => Ok(NodeRole::Peer),
            _ => Err(ConfigError::UnknownRole(s.to_string())),
        }
    }
}

impl fmt::Display for NodeRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NodeRole::Orderer => write!(f, "orderer"),
            NodeRole::Peer => write!(f, "peer"),
        }
    }
}

/// Complete node configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NodeConfig {
    pub role: NodeRole,
    pub msp: MspConfig,
    pub storage: StorageConfig,
    pub orderer: OrdererConfig,
    pub peer: PeerConfig,
}

impl Default for NodeConfig {
    fn default() -> Self {
        Self {
            role: NodeRole::Peer,
            msp: MspConfig::default(),
            storage: StorageConfig::default(),
            orderer: OrdererConfig::default(),
            peer: PeerConfig::default(),
        }
    }
}

/// Local MSP directory.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MspConfig {
    pub dir: PathBuf,
    pub msp_id: String,
}

impl Default for MspConfig {
    fn default() -> Self {
        Self {
            dir: PathBuf::from("./msp"),
            msp_id: "Org1MSP".into(),
        }
    }
}

/// Storage configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Root directory of the block store.
    pub data_dir: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("./data"),
        }
    }
}

/// A consortium organization and the file holding its root CA.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConsortiumMember {
    pub msp_id: String,
    pub ca_cert_path: PathBuf,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OrdererConfig {
    pub listen_addr: String,
    pub consortium: String,
    pub organizations: Vec<ConsortiumMember>,
    /// Default batch parameters written into new channel configs.
    pub batch: BatchParameters,
    /// Advertised endpoints; the listen address when empty.
    pub endpoints: Vec<String>,
}

impl Default for OrdererConfig {
    fn default() -> Self {
        Self {
            listen_addr: "127.0.0.1:7050".into(),
            consortium: "SampleConsortium".into(),
            organizations: Vec::new(),
            batch: BatchParameters::default(),
            endpoints: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PeerConfig {
    pub listen_addr: String,
    pub orderer_addr: String,
    pub sync: SyncConfig,
}

impl Default for PeerConfig {
    fn default() -> Self {
        Self {
            listen_addr: "127.0.0.1:7051".into(),
            orderer_addr: "127.0.0.1:7050".into(),
            sync: SyncConfig::default(),
        }
    }
}

impl PeerConfig {
    pub fn rpc_timeout(&self) -> Duration {
        self.sync.rpc_timeout()
    }
}

fn parse<T: FromStr>(key: &str, value: &str) -> Result<T, ConfigError> {
    value.trim().parse().map_err(|_| ConfigError::InvalidValue {
        key: key.to_string(),
        value: value.to_string(),
    })
}

fn parse_members(value: &str) -> Result<Vec<ConsortiumMember>, ConfigError> {
    value
        .split(';')
        .map(str::trim)
        .filter(|entry| !entry.is_empty())
        .map(|entry| match entry.split_once('=') {
            Some((msp_id, path)) if !msp_id.trim().is_empty() && !path.trim().is_empty() => {
                Ok(ConsortiumMember {
                    msp_id: msp_id.trim().to_string(),
                    ca_cert_path: PathBuf::from(path.trim()),
                })
            }
            _ => Err(ConfigError::InvalidValue {
                key: "PC_CONSORTIUM_ORGS".into(),
                value: entry.to_string(),
            }),
        })
        .collect()
}

impl NodeConfig {
    /// Defaults overridden by the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Defaults overridden by `lookup`.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(role) = lookup("PC_ROLE") {
            config.role = role.parse()?;
        }
        if let Some(dir) = lookup("PC_MSP_DIR") {
            config.msp.dir = PathBuf::from(dir);
        }
        if let Some(msp_id) = lookup("PC_MSP_ID") {
            config.msp.msp_id = msp_id;
        }
        if let Some(dir) = lookup("PC_DATA_DIR") {
            config.storage.data_dir = PathBuf::from(dir);
        }
        if let Some(addr) = lookup("PC_LISTEN_ADDR") {
            match config.role {
                NodeRole::Orderer => config.orderer.listen_addr = addr,
                NodeRole::Peer => config.peer.listen_addr = addr,
            }
        }
        if let Some(addr) = lookup("PC_ORDERER_ADDR") {
            config.peer.orderer_addr = addr;
        }
        if let Some(name) = lookup("PC_CONSORTIUM") {
            config.orderer.consortium = name;
        }
        if let Some(orgs) = lookup("PC_CONSORTIUM_ORGS") {
            config.orderer.organizations = parse_members(&orgs)?;
        }
        if let Some(v) = lookup("PC_BATCH_MAX_MESSAGES") {
            config.orderer.batch.max_message_count = parse("PC_BATCH_MAX_MESSAGES", &v)?;
        }
        if let Some(v) = lookup("PC_BATCH_TIMEOUT_MS") {
            config.orderer.batch.batch_timeout_ms = parse("PC_BATCH_TIMEOUT_MS", &v)?;
        }
        if let Some(v) = lookup("PC_BATCH_MAX_BYTES") {
            config.orderer.batch.absolute_max_bytes = parse("PC_BATCH_MAX_BYTES", &v)?;
        }
        if let Some(v) = lookup("PC_SYNC_BATCH_SIZE") {
            config.peer.sync.batch_size = parse("PC_SYNC_BATCH_SIZE", &v)?;
        }
        if let Some(v) = lookup("PC_RPC_TIMEOUT_SECS") {
            config.peer.sync.rpc_timeout_secs = parse("PC_RPC_TIMEOUT_SECS", &v)?;
        }

        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| vars.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = NodeConfig::from_lookup(|_| None).unwrap();
        assert_eq!(config.role, NodeRole::Peer);
        assert_eq!(config.peer.orderer_addr, "127.0.0.1:7050");
        assert_eq!(config.peer.sync.batch_size, 50);
        assert_eq!(config.orderer.batch, BatchParameters::default());
    }

    #[test]
    fn test_orderer_overrides() {
        let config = NodeConfig::from_lookup(lookup(&[
            ("PC_ROLE", "Orderer"),
            ("PC_LISTEN_ADDR", "0.0.0.0:7050"),
            ("PC_CONSORTIUM_ORGS", "Org1MSP=/ca/org1.pem; Org2MSP=/ca/org2.pem;"),
            ("PC_BATCH_MAX_MESSAGES", "25"),
        ]))
        .unwrap();
        assert_eq!(config.role, NodeRole::Orderer);
        assert_eq!(config.orderer.listen_addr, "0.0.0.0:7050");
        assert_eq!(config.peer.listen_addr, "127.0.0.1:7051");
        assert_eq!(config.orderer.batch.max_message_count, 25);
        assert_eq!(
            config.orderer.organizations,
            vec![
                ConsortiumMember {
                    msp_id: "Org1MSP".into(),
                    ca_cert_path: "/ca/org1.pem".into()
                },
                ConsortiumMember {
                    msp_id: "Org2MSP".into(),
                    ca_cert_path: "/ca/org2.pem".into()
                },
            ]
        );
    }

    #[test]
    fn test_invalid_values() {
        assert_eq!(
            NodeConfig::from_lookup(lookup(&[("PC_ROLE", "validator")])).unwrap_err(),
            ConfigError::UnknownRole("validator".into())
        );
        assert!(matches!(
            NodeConfig::from_lookup(lookup(&[("PC_SYNC_BATCH_SIZE", "many")])),
            Err(ConfigError::InvalidValue { .. })
        ));
        assert!(NodeConfig::from_lookup(lookup(&[("PC_CONSORTIUM_ORGS", "Org1MSP")])).is_err());
    }
}
