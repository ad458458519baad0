pub mod config;
pub mod errors;
pub mod metadata;
pub mod rpc_manager;
pub mod structured_logging;
pub mod token_creator;
pub mod tx_builder;
pub mod wallet;
