use serde::{Deserialize, Serialize};
use solana_sdk::commitment_config::{CommitmentConfig, CommitmentLevel};
use std::fs;
use std::path::{Path, PathBuf};

use crate::errors::LaunchError;

pub const DEVNET_RPC_URL: &str = "https://api.devnet.solana.com";
pub const MAINNET_RPC_URL: &str = "https://api.mainnet-beta.solana.com";
pub const DEFAULT_CONFIG_PATH: &str = "launch.toml";

/// Which storage provider a run talks to. Devnet uploads are throwaway,
/// mainnet uploads are paid and permanent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NetworkTier {
    Devnet,
    Mainnet,
}

impl NetworkTier {
    /// Anything that is not recognisably devnet is treated as mainnet.
    pub fn from_rpc_url(rpc_url: &str) -> Self {
        let url = rpc_url.trim();
        if url == "devnet" || url == DEVNET_RPC_URL {
            NetworkTier::Devnet
        } else {
            NetworkTier::Mainnet
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            NetworkTier::Devnet => "devnet",
            NetworkTier::Mainnet => "mainnet",
        }
    }
}

/// A JSON pinning endpoint speaking Pinata's `pinJSONToIPFS` API.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PinningProvider {
    #[serde(default = "default_pin_url")]
    pub pin_url: String,
    /// Base URL the returned IPFS hash is appended to.
    #[serde(default = "default_gateway_url")]
    pub gateway_url: String,
    /// Environment variable holding the provider JWT.
    #[serde(default = "default_jwt_env")]
    pub jwt_env: String,
    /// Pinata group uploads are filed under.
    #[serde(default)]
    pub group_id: Option<String>,
}

impl Default for PinningProvider {
    fn default() -> Self {
        Self {
            pin_url: default_pin_url(),
            gateway_url: default_gateway_url(),
            jwt_env: default_jwt_env(),
            group_id: None,
        }
    }
}

impl PinningProvider {
    pub fn jwt(&self) -> Option<String> {
        std::env::var(&self.jwt_env)
            .ok()
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
    }
}

/// One pinning provider per network tier.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StorageConfig {
    #[serde(default)]
    pub devnet: PinningProvider,
    #[serde(default)]
    pub mainnet: PinningProvider,
}

impl StorageConfig {
    pub fn provider(&self, tier: NetworkTier) -> &PinningProvider {
        match tier {
            NetworkTier::Devnet => &self.devnet,
            NetworkTier::Mainnet => &self.mainnet,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenConfig {
    // Token
    #[serde(default = "default_decimals")]
    pub decimals: u8,
    #[serde(default)]
    pub disable_freeze: bool,
    #[serde(default = "default_total_supply")]
    pub total_supply: u64,
    #[serde(default)]
    pub is_mutable: bool,
    #[serde(default)]
    pub seller_fee_basis_points: u16,

    // Network
    #[serde(default = "default_rpc_url")]
    pub rpc_url: String,
    #[serde(default = "default_commitment")]
    pub commitment: String,
    #[serde(default = "default_rpc_timeout_sec")]
    pub rpc_timeout_sec: u64,

    // Metadata
    #[serde(default = "default_assets_dir")]
    pub assets_dir: PathBuf,
    #[serde(default = "default_metadata_file")]
    pub metadata_file: String,
    /// Already-uploaded metadata URI. When set the upload step is skipped.
    #[serde(default)]
    pub metadata_uri: Option<String>,
    /// Re-fetch the uploaded JSON and take name/symbol from it.
    #[serde(default = "default_verify_upload")]
    pub verify_upload: bool,
    #[serde(default = "default_storage_timeout_sec")]
    pub storage_timeout_sec: u64,
    #[serde(default)]
    pub storage: StorageConfig,

    // Keys
    #[serde(default = "default_secret_key_env")]
    pub secret_key_env: String,
}

impl Default for TokenConfig {
    fn default() -> Self {
        Self {
            decimals: default_decimals(),
            disable_freeze: false,
            total_supply: default_total_supply(),
            is_mutable: false,
            seller_fee_basis_points: 0,
            rpc_url: default_rpc_url(),
            commitment: default_commitment(),
            rpc_timeout_sec: default_rpc_timeout_sec(),
            assets_dir: default_assets_dir(),
            metadata_file: default_metadata_file(),
            metadata_uri: None,
            verify_upload: default_verify_upload(),
            storage_timeout_sec: default_storage_timeout_sec(),
            storage: StorageConfig::default(),
            secret_key_env: default_secret_key_env(),
        }
    }
}

fn default_decimals() -> u8 {
    9
}
fn default_total_supply() -> u64 {
    1_000_000
}
fn default_rpc_url() -> String {
    DEVNET_RPC_URL.to_string()
}
fn default_commitment() -> String {
    "confirmed".to_string()
}
fn default_rpc_timeout_sec() -> u64 {
    60
}
fn default_assets_dir() -> PathBuf {
    PathBuf::from("assets")
}
fn default_metadata_file() -> String {
    "metadata.json".to_string()
}
fn default_verify_upload() -> bool {
    true
}
fn default_storage_timeout_sec() -> u64 {
    60
}
fn default_secret_key_env() -> String {
    "PRIVATE_KEY".to_string()
}

// Storage defaults
fn default_pin_url() -> String {
    "https://api.pinata.cloud/pinning/pinJSONToIPFS".to_string()
}
fn default_gateway_url() -> String {
    "https://gateway.pinata.cloud/ipfs".to_string()
}
fn default_jwt_env() -> String {
    "PINATA_JWT".to_string()
}

impl TokenConfig {
    /// Load configuration from `path`. A missing file yields defaults, a
    /// malformed one is an error.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, LaunchError> {
        let path = path.as_ref();
        match fs::read_to_string(path) {
            Ok(s) => toml::from_str::<TokenConfig>(&s).map_err(|e| {
                LaunchError::config(format!("failed to parse {}: {}", path.display(), e))
            }),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(TokenConfig::default()),
            Err(e) => Err(LaunchError::config(format!(
                "failed to read {}: {}",
                path.display(),
                e
            ))),
        }
    }

    pub fn network_tier(&self) -> NetworkTier {
        NetworkTier::from_rpc_url(&self.rpc_url)
    }

    /// Resolves the `devnet` shorthand to a real endpoint.
    pub fn rpc_endpoint(&self) -> String {
        match self.rpc_url.trim() {
            "devnet" => DEVNET_RPC_URL.to_string(),
            "mainnet" | "mainnet-beta" => MAINNET_RPC_URL.to_string(),
            other => other.to_string(),
        }
    }

    pub fn metadata_path(&self) -> PathBuf {
        self.assets_dir.join(&self.metadata_file)
    }

    pub fn commitment_config(&self) -> CommitmentConfig {
        let level = match self.commitment.to_ascii_lowercase().as_str() {
            "processed" => CommitmentLevel::Processed,
            "finalized" => CommitmentLevel::Finalized,
            _ => CommitmentLevel::Confirmed,
        };
        CommitmentConfig { commitment: level }
    }

    /// `total_supply * 10^decimals`, or `None` when it does not fit in u64.
    pub fn base_units(&self) -> Option<u64> {
        crate::tx_builder::base_units(self.total_supply, self.decimals)
    }

    /// Validate configuration consistency and constraints
    pub fn validate(&self) -> Result<(), LaunchError> {
        if self.rpc_url.trim().is_empty() {
            return Err(LaunchError::config("rpc_url must not be empty"));
        }

        if self.metadata_uri.is_none() && self.metadata_file.trim().is_empty() {
            return Err(LaunchError::config(
                "metadata_file must be set when metadata_uri is not provided",
            ));
        }

        if self.base_units().is_none() {
            return Err(LaunchError::config(format!(
                "total_supply {} with {} decimals overflows a u64 amount",
                self.total_supply, self.decimals
            )));
        }

        if self.seller_fee_basis_points > 10_000 {
            return Err(LaunchError::config(
                "seller_fee_basis_points must be <= 10000",
            ));
        }

        if self.rpc_timeout_sec == 0 {
            return Err(LaunchError::config("rpc_timeout_sec must be greater than 0"));
        }

        if self.storage_timeout_sec == 0 {
            return Err(LaunchError::config(
                "storage_timeout_sec must be greater than 0",
            ));
        }

        if self.secret_key_env.trim().is_empty() {
            return Err(LaunchError::config("secret_key_env must not be empty"));
        }

        for tier in [NetworkTier::Devnet, NetworkTier::Mainnet] {
            let provider = self.storage.provider(tier);
            if provider.pin_url.trim().is_empty() || provider.gateway_url.trim().is_empty() {
                return Err(LaunchError::config(format!(
                    "storage.{} needs both pin_url and gateway_url",
                    tier.label()
                )));
            }
        }

        Ok(())
    }

    /// The pinning JWT for this run's tier must be present unless a
    /// pre-uploaded `metadata_uri` makes the upload unnecessary.
    pub fn check_storage_credentials(&self) -> Result<(), LaunchError> {
        if self.metadata_uri.is_some() {
            return Ok(());
        }
        let tier = self.network_tier();
        let provider = self.storage.provider(tier);
        if provider.jwt().is_none() {
            return Err(LaunchError::config(format!(
                "{} is not set; a pinning JWT is required to upload metadata to {} storage",
                provider.jwt_env,
                tier.label()
            )));
        }
        Ok(())
    }
}
