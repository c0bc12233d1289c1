//! # Block Validation
//!
//! Checks run on every block before it is stored:
//! 1. Structure (`validate_block`)
//! 2. Data hash and block hash recomputed from content
//! 3. Number and previous hash continue the local chain
//! 4. Creator signature over the block hash
//! 5. Creator certificate chains to an orderer root of the channel
//!
//! For block 0 the orderer roots come from the configuration inside the
//! block itself; afterwards from the channel's current configuration.

use crate::domain::channel::ChannelState;
use crate::domain::errors::SyncError;
use pc_01_msp::{Certificate, Identity, MspError, OrganizationRegistry};
use pc_03_channel_creation::config_from_block;
use shared_types::{
    calculate_block_hash, compute_data_hash, validate_block, Block, ChannelConfig,
    SerializedIdentity,
};

/// Validate a genesis config block and return the configuration it carries.
pub fn validate_genesis(channel_id: &str, block: &Block) -> Result<ChannelConfig, SyncError> {
    let invalid = |reason: String| SyncError::invalid_block(channel_id, block.number(), reason);

    if block.number() != 0 || !block.is_config() {
        return Err(invalid("first block of a channel must be config block 0".into()));
    }
    check_content(channel_id, block)?;
    let config = config_from_block(block).map_err(|e| invalid(e.to_string()))?;
    if config.channel_id != channel_id {
        return Err(invalid(format!(
            "config block belongs to channel {}",
            config.channel_id
        )));
    }
    let roots = orderer_registry(&config).map_err(|e| invalid(e.to_string()))?;
    check_creator(channel_id, block, &config, &roots)?;
    Ok(config)
}

/// Validate `block` as the successor of `state`.
pub fn validate_next(state: &ChannelState, block: &Block) -> Result<(), SyncError> {
    let channel_id = state.channel_id.as_str();
    let invalid = |reason: String| SyncError::invalid_block(channel_id, block.number(), reason);

    if block.number() != state.height {
        return Err(invalid(format!("expected block {}", state.height)));
    }
    check_content(channel_id, block)?;
    if block.header.previous_hash != state.last_hash {
        return Err(invalid("previous hash does not match the local chain".into()));
    }
    check_creator(channel_id, block, &state.config, &state.orderer_roots)
}

/// Registry holding the orderer organization's roots.
pub fn orderer_registry(config: &ChannelConfig) -> Result<OrganizationRegistry, MspError> {
    let mut roots = Vec::new();
    for pem in &config.orderer.root_certs {
        roots.extend(Certificate::bundle_from_pem(pem)?);
    }
    let mut registry = OrganizationRegistry::new();
    registry.insert(config.orderer.msp_id.clone(), roots);
    Ok(registry)
}

fn check_content(channel_id: &str, block: &Block) -> Result<(), SyncError> {
    let invalid = |reason: String| SyncError::invalid_block(channel_id, block.number(), reason);

    validate_block(block).map_err(|e| invalid(e.to_string()))?;
    if block.header.data_hash != compute_data_hash(&block.data).to_vec() {
        return Err(invalid("data hash does not match transactions".into()));
    }
    if block.header.hash != calculate_block_hash(block).to_vec() {
        return Err(invalid("block hash does not match content".into()));
    }
    Ok(())
}

fn check_creator(
    channel_id: &str,
    block: &Block,
    config: &ChannelConfig,
    roots: &OrganizationRegistry,
) -> Result<(), SyncError> {
    let invalid = |reason: String| SyncError::invalid_block(channel_id, block.number(), reason);

    let creator = Identity::from_serialized(&SerializedIdentity::new(
        config.orderer.msp_id.clone(),
        block.metadata.creator_cert.clone(),
    ))
    .map_err(|e| invalid(format!("creator certificate: {}", e)))?;
    creator
        .verify(&block.header.hash, &block.metadata.creator_signature)
        .map_err(|e| invalid(format!("creator signature: {}", e)))?;
    roots
        .authorize(&creator)
        .map_err(|e| invalid(format!("creator not an orderer of the channel: {}", e)))?;
    Ok(())
}
