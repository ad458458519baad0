use anyhow::{anyhow, Result};
use async_trait::async_trait;
use solana_client::{
    client_error::{ClientError, ClientErrorKind},
    nonblocking::rpc_client::RpcClient,
    rpc_request::RpcError,
};
use solana_sdk::{
    commitment_config::CommitmentConfig,
    hash::Hash,
    pubkey::Pubkey,
    signature::Signature,
    transaction::Transaction,
};

use std::{sync::Arc, time::{Duration, Instant}};

use tracing::{debug, info, warn};

use crate::config::TokenConfig;

/// Classification of RPC errors for log readability
#[derive(Debug, PartialEq, Eq)]
pub enum RpcErrorType {
    InsufficientFunds,
    AlreadyProcessed,
    BlockhashNotFound,
    RateLimited,
    Other(String),
}

/// Classify a ClientError into an RpcErrorType
pub fn classify_rpc_error(error: &ClientError) -> RpcErrorType {
    match error.kind() {
        ClientErrorKind::RpcError(rpc_error) => match rpc_error {
            RpcError::RpcResponseError { message, .. } => classify_message(message),
            _ => RpcErrorType::Other("Unknown RPC error".to_string()),
        },
        _ => classify_message(&error.to_string()),
    }
}

fn classify_message(message: &str) -> RpcErrorType {
    let msg = message.to_lowercase();
    if msg.contains("insufficient funds") || msg.contains("insufficient lamports") {
        RpcErrorType::InsufficientFunds
    } else if msg.contains("already processed") {
        RpcErrorType::AlreadyProcessed
    } else if msg.contains("blockhash not found") {
        RpcErrorType::BlockhashNotFound
    } else if msg.contains("rate limit") || msg.contains("too many requests") {
        RpcErrorType::RateLimited
    } else {
        RpcErrorType::Other(message.to_string())
    }
}

/// The RPC surface the launch needs. Allows injecting mock implementations for tests.
#[async_trait]
pub trait ChainRpc: Send + Sync + std::fmt::Debug {
    /// Lamports needed for an account of `data_len` bytes to be rent exempt.
    async fn minimum_balance_for_rent_exemption(&self, data_len: usize) -> Result<u64>;

    async fn latest_blockhash(&self) -> Result<Hash>;

    async fn account_exists(&self, address: &Pubkey) -> Result<bool>;

    /// Submit a signed transaction and wait until it reaches the configured commitment.
    async fn send_and_confirm(&self, transaction: &Transaction) -> Result<Signature>;
}

/// Production ChainRpc backed by a single nonblocking RPC client.
pub struct RpcManager {
    pub endpoint: String,
    client: Arc<RpcClient>,
    commitment: CommitmentConfig,
}

impl std::fmt::Debug for RpcManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RpcManager")
            .field("endpoint", &self.endpoint)
            .field("commitment", &self.commitment.commitment)
            .finish()
    }
}

impl RpcManager {
    pub fn new(endpoint: String, commitment: CommitmentConfig, timeout: Duration) -> Self {
        let client = Arc::new(RpcClient::new_with_timeout_and_commitment(
            endpoint.clone(),
            timeout,
            commitment,
        ));
        Self {
            endpoint,
            client,
            commitment,
        }
    }

    pub fn from_config(config: &TokenConfig) -> Self {
        Self::new(
            config.rpc_endpoint(),
            config.commitment_config(),
            Duration::from_secs(config.rpc_timeout_sec),
        )
    }

    fn wrap(&self, method: &str, e: ClientError) -> anyhow::Error {
        let kind = classify_rpc_error(&e);
        warn!(endpoint = %self.endpoint, method, ?kind, "RPC call failed");
        anyhow!(e).context(format!("{} failed on {}", method, self.endpoint))
    }
}

#[async_trait]
impl ChainRpc for RpcManager {
    async fn minimum_balance_for_rent_exemption(&self, data_len: usize) -> Result<u64> {
        debug!("RpcManager: getMinimumBalanceForRentExemption({})", data_len);
        self.client
            .get_minimum_balance_for_rent_exemption(data_len)
            .await
            .map_err(|e| self.wrap("getMinimumBalanceForRentExemption", e))
    }

    async fn latest_blockhash(&self) -> Result<Hash> {
        self.client
            .get_latest_blockhash()
            .await
            .map_err(|e| self.wrap("getLatestBlockhash", e))
    }

    async fn account_exists(&self, address: &Pubkey) -> Result<bool> {
        let response = self
            .client
            .get_account_with_commitment(address, self.commitment)
            .await
            .map_err(|e| self.wrap("getAccountInfo", e))?;
        Ok(response.value.is_some())
    }

    async fn send_and_confirm(&self, transaction: &Transaction) -> Result<Signature> {
        let start_time = Instant::now();
        let signature = self
            .client
            .send_and_confirm_transaction(transaction)
            .await
            .map_err(|e| self.wrap("sendTransaction", e))?;
        info!(
            "RpcManager: confirmed {} on {} ({}ms)",
            signature,
            self.endpoint,
            start_time.elapsed().as_millis()
        );
        Ok(signature)
    }
}
