//! # Config Blocks
//!
//! A config block carries exactly one transaction: the bincode encoding of
//! the merged `ChannelConfig`. The genesis block of a channel is number 0
//! with no previous hash, signed by the orderer over its hash.

use super::errors::ChannelCreationError;
use pc_01_msp::SigningIdentity;
use shared_types::{
    marshal, seal_block, unmarshal, Block, BlockType, ChannelConfig, CodecError, ValidationBitmap,
};

/// Build and sign block 0 of `config.channel_id`.
pub fn build_genesis_block(
    config: &ChannelConfig,
    signer: &SigningIdentity,
) -> Result<Block, ChannelCreationError> {
    let mut block = Block::new(0, Vec::new(), BlockType::Config, vec![marshal(config)?]);
    block.metadata.validation_bitmap = ValidationBitmap::all_valid(1);
    seal_block(signer, &mut block)?;
    Ok(block)
}

/// Decode the channel configuration carried by a config block.
pub fn config_from_block(block: &Block) -> Result<ChannelConfig, CodecError> {
    if !block.is_config() {
        return Err(CodecError::Structural(format!(
            "block {} is not a config block",
            block.number()
        )));
    }
    match block.data.transactions.as_slice() {
        [tx] => unmarshal(tx),
        txs => Err(CodecError::Structural(format!(
            "config block carries {} transactions",
            txs.len()
        ))),
    }
}
