//! # Channel Creation Service
//!
//! Orderer side of the channel creation protocol. Each proposal goes
//! through:
//!
//! ```text
//! AwaitingMessage -> Verifying -> Rejected | Committing -> Acknowledged
//! ```
//!
//! Verification order: decode, message type, name not taken, creator
//! signature, creator chains to a consortium root, configuration content.
//! The name check and the commit run under the channel table's write lock.
//! A channel enters the table as soon as its genesis block is stored.

use crate::domain::config_block::build_genesis_block;
use crate::domain::consortium::ConsortiumConfig;
use crate::domain::errors::{ChannelCreationError, StreamError};
use crate::domain::proposal::ChannelProposal;
use crate::domain::table::{ChannelRecord, ChannelTable};
use crate::ports::inbound::ChannelCreationApi;
use crate::ports::outbound::ProposalStream;
use pc_01_msp::{MembershipService, OrganizationRegistry};
use pc_02_block_storage::BlockStore;
use shared_bus::{BlockEvent, BlockPublisher};
use shared_types::rpc::ChannelCreationResponse;
use shared_types::{ApplicationConfig, Block, ChannelConfig, Envelope, OrdererSection};
use std::sync::Arc;
use tracing::{debug, info, warn};


/// Collaborators of `ChannelCreationService`.
#[derive(Clone)]
pub struct ChannelCreationDependencies {
    pub msp: Arc<dyn MembershipService>,
    pub store: Arc<dyn BlockStore>,
    pub publisher: Arc<dyn BlockPublisher>,
    pub table: Arc<ChannelTable>,
}

pub struct ChannelCreationService {
    deps: ChannelCreationDependencies,
    consortium: ConsortiumConfig,
    consortium_roots: OrganizationRegistry,
    orderer: OrdererSection,
}

impl ChannelCreationService {
    pub fn new(
        deps: ChannelCreationDependencies,
        consortium: ConsortiumConfig,
        orderer: OrdererSection,
    ) -> Result<Self, ChannelCreationError> {
        let consortium_roots = consortium.registry()?;
        info!(
            consortium = %consortium.name,
            organizations = ?consortium_roots.msp_ids(),
            "[pc-03] channel creation service ready"
        );
        Ok(Self {
            deps,
            consortium,
            consortium_roots,
            orderer,
        })
    }

    pub fn table(&self) -> &Arc<ChannelTable> {
        &self.deps.table
    }

    /// Serve one creation stream until the client closes it. Every proposal
    /// gets exactly one response; only transport failures end the loop
    /// early. Proposals are verified and committed on the blocking pool.
    pub async fn serve_stream<S: ProposalStream>(
        self: &Arc<Self>,
        stream: &mut S,
    ) -> Result<(), StreamError> {
        let mut handled = 0u64;
        loop {
            let response = match stream.next_proposal().await {
                Ok(None) => {
                    debug!(handled, "[pc-03] creation stream closed");
                    return Ok(());
                }
                Ok(Some(envelope)) => {
                    let service = Arc::clone(self);
                    tokio::task::spawn_blocking(move || service.respond_to(&envelope))
                        .await
                        .unwrap_or_else(|e| {
                            ChannelCreationResponse::rejected(
                                shared_types::StatusCode::Internal,
                                format!("proposal handler failed: {}", e),
                            )
                        })
                }
                Err(StreamError::Malformed(reason)) => {
                    warn!(%reason, "[pc-03] undecodable proposal frame");
                    ChannelCreationResponse::rejected(
                        shared_types::StatusCode::InvalidTransactionFormat,
                        format!("Malformed envelope: {}", reason),
                    )
                }
                Err(e) => {
                    warn!(error = %e, "[pc-03] creation stream aborted");
                    return Err(e);
                }
            };
            stream.respond(response).await?;
            handled += 1;
        }
    }

    fn respond_to(&self, envelope: &Envelope) -> ChannelCreationResponse {
        match self.handle_proposal(envelope) {
            Ok(block) => ChannelCreationResponse::ok(block),
            Err(e) => ChannelCreationResponse::rejected(e.status_code(), e.to_string()),
        }
    }

    /// Merge the proposed application section with the orderer section.
    /// Member organizations must belong to the consortium; their roots are
    /// taken from the consortium, not from the proposal.
    fn merge_config(&self, app: &ApplicationConfig) -> Result<ChannelConfig, ChannelCreationError> {
        app.validate()
            .map_err(|e| ChannelCreationError::InvalidConfig(e.to_string()))?;
        if app.consortium != self.consortium.name {
            return Err(ChannelCreationError::Forbidden(format!(
                "unknown consortium {}",
                app.consortium
            )));
        }

        let mut application = app.clone();
        for org in &mut application.organizations {
            let registered = self.consortium.organization(&org.msp_id).ok_or_else(|| {
                ChannelCreationError::Forbidden(format!(
                    "organization {} is not a member of consortium {}",
                    org.msp_id, self.consortium.name
                ))
            })?;
            org.root_certs = registered.root_certs.clone();
        }

        Ok(ChannelConfig {
            channel_id: app.channel_id.clone(),
            sequence: 0,
            consortium: self.consortium.name.clone(),
            orderer: self.orderer.clone(),
            application,
        })
    }

    /// Everything after the name check: runs under the table's write lock.
    fn verify_and_commit(
        &self,
        proposal: &ChannelProposal,
        envelope: &Envelope,
    ) -> Result<(ChannelRecord, Block), ChannelCreationError> {
        let header = &proposal.payload.header;
        let msp = self.deps.msp.as_ref();

        let creator = msp.verify_creator(&header.creator, &envelope.payload, &envelope.signature)?;
        let signer = msp.authorize(&creator, &self.consortium_roots)?;

        if proposal.application.channel_id != header.channel_id {
            return Err(ChannelCreationError::InvalidConfig(format!(
                "header targets {} but configuration names {}",
                header.channel_id, proposal.application.channel_id
            )));
        }
        let config = self.merge_config(&proposal.application)?;
        if config.member(&signer.msp_id).is_none() {
            return Err(ChannelCreationError::Forbidden(format!(
                "creator organization {} is not a member of the channel",
                signer.msp_id
            )));
        }

        let record = ChannelRecord::new(config)?;
        let block = build_genesis_block(&record.config, msp.signing_identity())?;
        let channel_id = record.channel_id().to_string();
        self.deps.store.store_block(&channel_id, &block)?;
        // Once block 0 is stored the channel exists; the mark is finished
        // by the next table rebuild if it cannot be written now.
        if let Err(e) = self.deps.store.mark_committed(&channel_id, 0) {
            warn!(
                channel = %channel_id,
                error = %e,
                "[pc-03] genesis block stored but commit mark failed"
            );
        }
        Ok((record, block))
    }
}

impl ChannelCreationApi for ChannelCreationService {
    fn handle_proposal(&self, envelope: &Envelope) -> Result<Block, ChannelCreationError> {
        let proposal = ChannelProposal::open(envelope).inspect_err(|e| {
            warn!(error = %e, "[pc-03] proposal rejected before verification");
        })?;
        let channel_id = proposal.channel_id().to_string();

        let block = self
            .deps
            .table
            .try_create(&channel_id, || self.verify_and_commit(&proposal, envelope))
            .inspect_err(|e| {
                warn!(
                    channel = %channel_id,
                    tx_id = %proposal.payload.header.tx_id,
                    status = %e.status_code(),
                    error = %e,
                    "[pc-03] channel creation rejected"
                );
            })?;

        info!(
            channel = %channel_id,
            creator = %proposal.payload.header.creator.msp_id,
            hash = %hex::encode(&block.header.hash),
            "[pc-03] channel created"
        );
        self.deps
            .publisher
            .publish(BlockEvent::new(channel_id, block.clone()));
        Ok(block)
    }

    fn channel_exists(&self, channel_id: &str) -> bool {
        self.deps.table.contains(channel_id)
    }

    fn list_channels(&self) -> Vec<String> {
        self.deps.table.list()
    }
}
