use std::time::Duration;

use solana_client::client_error::{ClientError, ClientErrorKind};
use solana_client::rpc_request::{RpcError, RpcRequest, RpcResponseErrorData};
use solana_sdk::commitment_config::CommitmentConfig;

use spl_token_launcher::config::{TokenConfig, DEVNET_RPC_URL};
use spl_token_launcher::rpc_manager::{classify_rpc_error, RpcErrorType, RpcManager};

fn response_error(message: &str) -> ClientError {
    let rpc_error = RpcError::RpcResponseError {
        code: -32002,
        message: message.to_string(),
        data: RpcResponseErrorData::Empty,
    };
    ClientError::new_with_request(ClientErrorKind::RpcError(rpc_error), RpcRequest::SendTransaction)
}

#[tokio::test]
async fn test_classify_insufficient_funds_error() {
    let error = response_error("Transaction simulation failed: Attempt to debit an account but found no record of a prior credit. insufficient funds");
    assert_eq!(classify_rpc_error(&error), RpcErrorType::InsufficientFunds);
}

#[tokio::test]
async fn test_classify_already_processed_error() {
    let error = response_error("Transaction was already processed");
    assert_eq!(classify_rpc_error(&error), RpcErrorType::AlreadyProcessed);
}

#[tokio::test]
async fn test_classify_blockhash_not_found_error() {
    let error = response_error("Blockhash not found");
    assert_eq!(classify_rpc_error(&error), RpcErrorType::BlockhashNotFound);
}

#[tokio::test]
async fn test_classify_rate_limited_error() {
    let error = response_error("429 Too Many Requests");
    assert_eq!(classify_rpc_error(&error), RpcErrorType::RateLimited);
}

#[tokio::test]
async fn test_classify_generic_error() {
    let error = response_error("Some unknown error");
    assert_eq!(classify_rpc_error(&error), RpcErrorType::Other("Some unknown error".to_string()));
}

#[tokio::test]
async fn test_rpc_manager_construction() {
    let manager = RpcManager::new(
        "http://127.0.0.1:8899".to_string(),
        CommitmentConfig::confirmed(),
        Duration::from_secs(5),
    );
    assert_eq!(manager.endpoint, "http://127.0.0.1:8899");

    let cfg = TokenConfig {
        rpc_url: "devnet".to_string(),
        ..TokenConfig::default()
    };
    let from_cfg = RpcManager::from_config(&cfg);
    assert_eq!(from_cfg.endpoint, DEVNET_RPC_URL);
}
