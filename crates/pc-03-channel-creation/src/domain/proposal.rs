//! # Channel Proposals
//!
//! A proposal is an `Envelope` whose payload header has type `Config` and
//! whose data is an unsigned config block (number 0) carrying the proposed
//! `ApplicationConfig` as its single transaction.

use super::errors::ChannelCreationError;
use pc_01_msp::SigningIdentity;
use shared_types::{
    calculate_block_hash, create_header, create_payload, marshal, seal_envelope, unmarshal,
    validate_envelope, validate_payload, ApplicationConfig, Block, BlockType, Envelope,
    MessageType, Payload,
};

/// A decoded, not yet authorized proposal.
#[derive(Debug, Clone)]
pub struct ChannelProposal {
    pub payload: Payload,
    pub block: Block,
    pub application: ApplicationConfig,
}

impl ChannelProposal {
    /// Peer side: wrap `config` in a config block and sign it.
    pub fn build(
        signer: &SigningIdentity,
        config: &ApplicationConfig,
    ) -> Result<Envelope, ChannelCreationError> {
        config
            .validate()
            .map_err(|e| ChannelCreationError::InvalidConfig(e.to_string()))?;

        let mut block = Block::new(0, Vec::new(), BlockType::Config, vec![marshal(config)?]);
        block.seal_hash();

        let header = create_header(signer.serialize(), MessageType::Config, &config.channel_id);
        let payload = create_payload(header, marshal(&block)?);
        Ok(seal_envelope(signer, &payload)?)
    }

    /// Orderer side: decode envelope, payload, block and configuration.
    /// Message type is checked before the data is decoded.
    pub fn open(envelope: &Envelope) -> Result<Self, ChannelCreationError> {
        validate_envelope(envelope)
            .map_err(|e| ChannelCreationError::MalformedEnvelope(e.to_string()))?;
        let payload = envelope
            .open()
            .map_err(|e| ChannelCreationError::MalformedEnvelope(e.to_string()))?;
        validate_payload(&payload)
            .map_err(|e| ChannelCreationError::MalformedEnvelope(e.to_string()))?;

        if payload.header.message_type != MessageType::Config {
            return Err(ChannelCreationError::InvalidMessageType(
                payload.header.message_type,
            ));
        }

        let block: Block = unmarshal(&payload.data)
            .map_err(|e| ChannelCreationError::MalformedBlock(e.to_string()))?;
        if !block.is_config() || block.number() != 0 {
            return Err(ChannelCreationError::MalformedBlock(
                "proposal must be a config block numbered 0".to_string(),
            ));
        }
        if block.transaction_count() != 1 {
            return Err(ChannelCreationError::MalformedBlock(format!(
                "proposal block carries {} transactions",
                block.transaction_count()
            )));
        }
        if block.header.hash != calculate_block_hash(&block).to_vec() {
            return Err(ChannelCreationError::MalformedBlock(
                "proposal block hash does not match its content".to_string(),
            ));
        }
        let application: ApplicationConfig = unmarshal(&block.data.transactions[0])
            .map_err(|e| ChannelCreationError::MalformedBlock(e.to_string()))?;

        Ok(Self {
            payload,
            block,
            application,
        })
    }

    /// Channel named by the payload header.
    pub fn channel_id(&self) -> &str {
        &self.payload.header.channel_id
    }
}
