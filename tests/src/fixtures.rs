//! # Network Fixtures
//!
//! A throwaway network on loopback: one orderer organization, two
//! application organizations, MSP directories and ledgers under one
//! temporary directory.

use node_runtime::adapters::client;
use node_runtime::container::{ConsortiumMember, NodeConfig, NodeRole};
use node_runtime::{OrdererNode, PeerNode};
use pc_01_msp::test_utils::OrgFixture;
use pc_01_msp::SigningIdentity;
use pc_04_block_sync::SyncConfig;
use shared_types::rpc::{OrdererRequest, OrdererResponse};
use shared_types::{
    create_header, create_payload, seal_envelope, ApplicationConfig, BatchParameters, Envelope,
    MessageType, StatusCode,
};
use std::path::PathBuf;
use std::time::Duration;
use tempfile::TempDir;

pub const CONSORTIUM: &str = "SampleConsortium";
pub const RPC_DEADLINE: Duration = Duration::from_secs(5);

pub struct Network {
    pub orderer_org: OrgFixture,
    pub org1: OrgFixture,
    pub org2: OrgFixture,
    pub batch: BatchParameters,
    pub dir: TempDir,
}

impl Network {
    /// Blocks are cut after every transaction.
    pub fn new() -> Self {
        Self::with_batch(BatchParameters {
            max_message_count: 1,
            batch_timeout_ms: 200,
            absolute_max_bytes: 1 << 20,
        })
    }

    pub fn with_batch(batch: BatchParameters) -> Self {
        Self {
            orderer_org: OrgFixture::new("OrdererMSP"),
            org1: OrgFixture::new("Org1MSP"),
            org2: OrgFixture::new("Org2MSP"),
            batch,
            dir: TempDir::new().unwrap(),
        }
    }

    fn path(&self, name: &str) -> PathBuf {
        self.dir.path().join(name)
    }

    fn ca_file(&self, org: &OrgFixture) -> PathBuf {
        let path = self.path(&format!("{}-ca.pem", org.msp_id));
        std::fs::write(&path, &org.ca_pem).unwrap();
        path
    }

    pub fn orderer_config(&self) -> NodeConfig {
        let member = self.orderer_org.issue("orderer0");
        let mut config = NodeConfig {
            role: NodeRole::Orderer,
            ..NodeConfig::default()
        };
        config.msp.dir = self.orderer_org.write_msp(&member, "orderer0");
        config.msp.msp_id = self.orderer_org.msp_id.clone();
        config.storage.data_dir = self.path("orderer-ledger");
        config.orderer.listen_addr = "127.0.0.1:0".into();
        config.orderer.consortium = CONSORTIUM.into();
        config.orderer.batch = self.batch;
        config.orderer.organizations = [&self.org1, &self.org2]
            .into_iter()
            .map(|org| ConsortiumMember {
                msp_id: org.msp_id.clone(),
                ca_cert_path: self.ca_file(org),
            })
            .collect();
        config
    }

    /// Peer `name` of `org`, reusing its ledger directory across restarts.
    pub fn peer_config(&self, org: &OrgFixture, name: &str, orderer: &OrdererNode) -> NodeConfig {
        let member = org.issue(name);
        let mut config = NodeConfig::default();
        config.msp.dir = org.write_msp(&member, name);
        config.msp.msp_id = org.msp_id.clone();
        config.storage.data_dir = self.path(&format!("{}-ledger", name));
        config.peer.listen_addr = "127.0.0.1:0".into();
        config.peer.orderer_addr = orderer.local_addr().to_string();
        config.peer.sync = SyncConfig::for_testing();
        config
    }

    pub async fn start_orderer(&self) -> OrdererNode {
        OrdererNode::start(&self.orderer_config()).await.unwrap()
    }

    pub async fn start_peer(
        &self,
        org: &OrgFixture,
        name: &str,
        orderer: &OrdererNode,
    ) -> PeerNode {
        PeerNode::start(&self.peer_config(org, name, orderer))
            .await
            .unwrap()
    }

    pub fn channel(&self, channel_id: &str, orgs: &[&OrgFixture]) -> ApplicationConfig {
        ApplicationConfig::new(
            channel_id,
            CONSORTIUM,
            orgs.iter().map(|o| o.organization_config()).collect(),
        )
    }
}

/// A signed application transaction.
pub fn transaction(signer: &SigningIdentity, channel_id: &str, body: &[u8]) -> Envelope {
    let header = create_header(signer.serialize(), MessageType::EndorserTransaction, channel_id);
    seal_envelope(signer, &create_payload(header, body.to_vec())).unwrap()
}

/// Broadcast through the orderer's RPC server and return the status.
pub async fn broadcast(orderer: &OrdererNode, envelope: Envelope) -> StatusCode {
    let response: OrdererResponse = client::call(
        &orderer.local_addr().to_string(),
        &OrdererRequest::Broadcast(envelope),
        RPC_DEADLINE,
    )
    .await
    .unwrap();
    match response {
        OrdererResponse::Broadcast { status, .. } => status,
        other => panic!("unexpected response {:?}", other),
    }
}

/// Poll `condition` until it holds or five seconds pass.
pub async fn eventually<F: Fn() -> bool>(condition: F) {
    tokio::time::timeout(Duration::from_secs(5), async {
        while !condition() {
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
    })
    .await
    .expect("condition not reached in time");
}
