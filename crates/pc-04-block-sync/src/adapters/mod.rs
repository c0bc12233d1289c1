//! # Adapters

pub mod orderer_client;

pub use orderer_client::TcpOrdererClient;
