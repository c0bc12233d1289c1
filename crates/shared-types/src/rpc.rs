//! # RPC Messages
//!
//! Request/response types carried over framed TCP between peer and orderer
//! (and between an operator and a peer). The first frame on a connection is
//! a request; it decides whether the connection becomes a unary exchange,
//! a server stream (`Deliver`) or a bidirectional stream
//! (`OpenChannelCreation`).

use crate::block::Block;
use crate::config::ApplicationConfig;
use crate::envelope::Envelope;
use crate::status::StatusCode;
use serde::{Deserialize, Serialize};

/// Maximum number of blocks returned by one range request.
pub const MAX_RANGE_BATCH: u64 = 500;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum OrdererRequest {
    /// Switch the connection to a channel-creation stream: every following
    /// frame is an `Envelope`, answered by a `ChannelCreationResponse`.
    OpenChannelCreation,
    /// Submit a signed application transaction.
    Broadcast(Envelope),
    ChannelHeight { channel_id: String },
    /// Half-open range `[start, end)`.
    BlockRange {
        channel_id: String,
        start: u64,
        end: u64,
    },
    /// Stream blocks from `start` onwards, following new blocks.
    Deliver { channel_id: String, start: u64 },
    ListChannels,
}

/// Item sent back for every proposal on a channel-creation stream.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChannelCreationResponse {
    pub status: StatusCode,
    pub message: String,
    /// The committed config block on success.
    pub block: Option<Block>,
}

impl ChannelCreationResponse {
    pub fn ok(block: Block) -> Self {
        Self {
            status: StatusCode::Ok,
            message: String::new(),
            block: Some(block),
        }
    }

    pub fn rejected(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
            block: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum OrdererResponse {
    Broadcast { status: StatusCode, message: String },
    Height { status: StatusCode, height: u64 },
    Blocks {
        status: StatusCode,
        message: String,
        blocks: Vec<Block>,
    },
    /// One item of a `Deliver` stream.
    DeliverBlock(Block),
    /// Terminal item of a `Deliver` stream.
    DeliverStatus { status: StatusCode, message: String },
    Channels { channels: Vec<String> },
    /// The request could not be decoded or routed.
    Error { status: StatusCode, message: String },
}

/// Administrative requests served by a peer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum PeerRequest {
    CreateChannel(ApplicationConfig),
    ChannelHeight { channel_id: String },
    BlockRange {
        channel_id: String,
        start: u64,
        end: u64,
    },
    ListChannels,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum PeerResponse {
    ChannelCreated {
        status: StatusCode,
        message: String,
        block: Option<Block>,
    },
    Height { status: StatusCode, height: u64 },
    Blocks {
        status: StatusCode,
        message: String,
        blocks: Vec<Block>,
    },
    Channels { channels: Vec<String> },
    Error { status: StatusCode, message: String },
}
