//! # Orderer Node
//!
//! Startup aborts on any identity or storage error. The channel table is
//! rebuilt from the config blocks on disk before the server accepts
//! connections.

use crate::adapters::orderer_server::{self, OrdererHandler};
use crate::container::{NodeConfig, OrdererConfig};
use anyhow::{Context, Result};
use pc_01_msp::{MembershipService, Msp, MspService};
use pc_02_block_storage::FileBlockStore;
use pc_03_channel_creation::{
    ChannelCreationDependencies, ChannelCreationService, ChannelTable, ConsortiumConfig,
};
use pc_05_ordering::{OrderingDependencies, OrderingService};
use shared_bus::InMemoryBlockBus;
use shared_types::{OrdererSection, OrganizationConfig};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{info, warn};

const SHUTDOWN_GRACE: Duration = Duration::from_secs(5);

/// Consortium organizations with roots read from their CA files.
pub fn load_consortium(config: &OrdererConfig) -> Result<ConsortiumConfig> {
    let organizations = config
        .organizations
        .iter()
        .map(|member| {
            let pem = std::fs::read(&member.ca_cert_path).with_context(|| {
                format!(
                    "reading root CA of {} from {}",
                    member.msp_id,
                    member.ca_cert_path.display()
                )
            })?;
            Ok(OrganizationConfig::new(member.msp_id.clone(), vec![pem]))
        })
        .collect::<Result<Vec<_>>>()?;
    Ok(ConsortiumConfig::new(config.consortium.clone(), organizations))
}

pub struct OrdererNode {
    handler: Arc<OrdererHandler>,
    store: Arc<FileBlockStore>,
    local_addr: SocketAddr,
    shutdown_tx: watch::Sender<bool>,
    tasks: Vec<JoinHandle<()>>,
}

impl OrdererNode {
    pub async fn start(config: &NodeConfig) -> Result<Self> {
        let msp = Msp::load(&config.msp.dir, &config.msp.msp_id)
            .with_context(|| format!("loading MSP from {}", config.msp.dir.display()))?;
        let store = Arc::new(
            FileBlockStore::open(&config.storage.data_dir).with_context(|| {
                format!("opening block store {}", config.storage.data_dir.display())
            })?,
        );
        let table = Arc::new(
            ChannelTable::rebuild(store.as_ref()).context("rebuilding channel table")?,
        );
        let consortium = load_consortium(&config.orderer)?;

        let listener = TcpListener::bind(&config.orderer.listen_addr)
            .await
            .with_context(|| format!("binding {}", config.orderer.listen_addr))?;
        let local_addr = listener.local_addr()?;
        let endpoints = if config.orderer.endpoints.is_empty() {
            vec![local_addr.to_string()]
        } else {
            config.orderer.endpoints.clone()
        };
        let section = OrdererSection {
            msp_id: msp.msp_id.clone(),
            root_certs: msp.root_certs_pem(),
            endpoints,
            batch: config.orderer.batch,
        };

        let bus = Arc::new(InMemoryBlockBus::new());
        let membership: Arc<dyn MembershipService> = Arc::new(MspService::new(msp));
        let creation = ChannelCreationService::new(
            ChannelCreationDependencies {
                msp: membership.clone(),
                store: store.clone(),
                publisher: bus.clone(),
                table: table.clone(),
            },
            consortium,
            section,
        )?;
        let ordering = Arc::new(OrderingService::new(OrderingDependencies {
            msp: membership,
            store: store.clone(),
            bus,
            table: table.clone(),
        }));

        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let timer = ordering.spawn_batch_timer(shutdown_rx.clone());
        let handler = Arc::new(OrdererHandler::new(Arc::new(creation), ordering));
        let server = tokio::spawn(orderer_server::serve(
            listener,
            Arc::clone(&handler),
            shutdown_rx,
        ));

        info!(
            msp_id = %config.msp.msp_id,
            addr = %local_addr,
            channels = table.len(),
            "Orderer node started"
        );
        Ok(Self {
            handler,
            store,
            local_addr,
            shutdown_tx,
            tasks: vec![server, timer],
        })
    }

    pub fn handler(&self) -> &Arc<OrdererHandler> {
        &self.handler
    }

    pub fn store(&self) -> &Arc<FileBlockStore> {
        &self.store
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    pub async fn shutdown(self) {
        info!("Orderer node shutting down");
        let _ = self.shutdown_tx.send(true);
        for task in self.tasks {
            if tokio::time::timeout(SHUTDOWN_GRACE, task).await.is_err() {
                warn!("Orderer task did not stop in time");
            }
        }
        info!("Orderer node stopped");
    }
}
