//! # Peer Node
//!
//! Startup: load MSP, open storage, rebuild channel state from stored
//! blocks, catch up every channel, then start one follow worker per
//! channel plus the periodic staleness check and the admin server.

use crate::adapters::client::submit_channel_proposal;
use crate::adapters::peer_server;
use crate::container::{NodeConfig, NodeError, PeerConfig};
use anyhow::{Context, Result};
use pc_01_msp::{Msp, SigningIdentity};
use pc_02_block_storage::FileBlockStore;
use pc_03_channel_creation::ChannelProposal;
use pc_04_block_sync::{BlockSyncApi, BlockSynchronizer, ChannelManager, TcpOrdererClient};
use parking_lot::Mutex;
use shared_types::{ApplicationConfig, Block};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{info, warn};

/// How long shutdown waits for each background task.
const SHUTDOWN_GRACE: Duration = Duration::from_secs(5);

pub type PeerSynchronizer = BlockSynchronizer<TcpOrdererClient>;

pub struct PeerService {
    config: PeerConfig,
    signer: SigningIdentity,
    store: Arc<FileBlockStore>,
    sync: Arc<PeerSynchronizer>,
    shutdown: watch::Receiver<bool>,
    workers: Mutex<Vec<JoinHandle<()>>>,
}

impl PeerService {
    pub fn synchronizer(&self) -> &Arc<PeerSynchronizer> {
        &self.sync
    }

    pub fn store(&self) -> &Arc<FileBlockStore> {
        &self.store
    }

    pub fn signer(&self) -> &SigningIdentity {
        &self.signer
    }

    /// Sign a channel proposal, submit it on a creation stream and join the
    /// genesis block the orderer returns.
    pub async fn create_channel(&self, config: &ApplicationConfig) -> Result<Block, NodeError> {
        let envelope = ChannelProposal::build(&self.signer, config)?;
        info!(
            channel = %config.channel_id,
            orderer = %self.config.orderer_addr,
            "[pc-03] submitting channel proposal"
        );
        let response = submit_channel_proposal(
            &self.config.orderer_addr,
            &envelope,
            self.config.rpc_timeout(),
        )
        .await?;
        if !response.status.is_ok() {
            warn!(
                channel = %config.channel_id,
                status = %response.status,
                message = %response.message,
                "[pc-03] channel proposal rejected"
            );
            return Err(NodeError::Rejected {
                status: response.status,
                message: response.message,
            });
        }
        let block = response
            .block
            .ok_or_else(|| NodeError::Protocol("acknowledgement carries no block".into()))?;

        let channel_id = self.sync.join_channel(&block).await?;
        let worker = self.sync.spawn_follow(&channel_id, self.shutdown.clone());
        self.workers.lock().push(worker);
        Ok(block)
    }
}

pub struct PeerNode {
    service: Arc<PeerService>,
    local_addr: SocketAddr,
    shutdown_tx: watch::Sender<bool>,
    server: JoinHandle<()>,
}

impl PeerNode {
    pub async fn start(config: &NodeConfig) -> Result<Self> {
        let msp = Msp::load(&config.msp.dir, &config.msp.msp_id)
            .with_context(|| format!("loading MSP from {}", config.msp.dir.display()))?;
        let store = Arc::new(
            FileBlockStore::open(&config.storage.data_dir).with_context(|| {
                format!("opening block store {}", config.storage.data_dir.display())
            })?,
        );
        let channels = Arc::new(
            ChannelManager::rebuild(store.as_ref()).context("rebuilding channel state")?,
        );

        let peer = &config.peer;
        let orderer = Arc::new(TcpOrdererClient::new(
            peer.orderer_addr.clone(),
            peer.rpc_timeout(),
        ));
        let sync = Arc::new(BlockSynchronizer::new(
            peer.sync.clone(),
            orderer,
            store.clone(),
            channels,
        ));

        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        sync.initial_sync().await;
        let workers = sync.spawn_workers(shutdown_rx.clone());

        let listener = TcpListener::bind(&peer.listen_addr)
            .await
            .with_context(|| format!("binding {}", peer.listen_addr))?;
        let local_addr = listener.local_addr()?;

        let service = Arc::new(PeerService {
            config: peer.clone(),
            signer: msp.signing_identity,
            store,
            sync,
            shutdown: shutdown_rx.clone(),
            workers: Mutex::new(workers),
        });
        let server = tokio::spawn(peer_server::serve(
            listener,
            Arc::clone(&service),
            shutdown_rx,
        ));

        info!(
            msp_id = %config.msp.msp_id,
            addr = %local_addr,
            orderer = %peer.orderer_addr,
            channels = ?service.sync.channels(),
            "Peer node started"
        );
        Ok(Self {
            service,
            local_addr,
            shutdown_tx,
            server,
        })
    }

    pub fn service(&self) -> &Arc<PeerService> {
        &self.service
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Signal every worker and wait for them to stop.
    pub async fn shutdown(self) {
        info!("Peer node shutting down");
        let _ = self.shutdown_tx.send(true);
        let mut tasks = vec![self.server];
        tasks.extend(self.service.workers.lock().drain(..));
        for task in tasks {
            if tokio::time::timeout(SHUTDOWN_GRACE, task).await.is_err() {
                warn!("Peer task did not stop in time");
            }
        }
        info!("Peer node stopped");
    }
}
