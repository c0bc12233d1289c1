pub mod config_block;
pub mod consortium;
pub mod errors;
pub mod proposal;
pub mod table;
