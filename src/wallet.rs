//! Authority keypair loading.

use anyhow::{anyhow, Result};
use solana_sdk::{pubkey::Pubkey, signature::{Keypair, Signer}};
use std::{fs, path::Path};
use tracing::info;

use crate::errors::LaunchError;

/// Holds the keypair that pays for the launch and acts as mint/update authority.
#[derive(Debug)]
pub struct WalletManager {
    keypair: Keypair,
}

impl WalletManager {
    /// Load the authority from an environment variable holding the secret key.
    ///
    /// Fails before anything touches the network when the variable is unset.
    pub fn from_env(var: &str) -> Result<Self, LaunchError> {
        let secret = std::env::var(var)
            .map_err(|_| LaunchError::wallet(format!("{} is not set in the environment or .env file", var)))?;

        let wallet = Self::from_secret(&secret)
            .map_err(|e| LaunchError::wallet(format!("{} does not hold a valid secret key: {}", var, e)))?;

        info!("Loaded authority from ${}, pubkey: {}", var, wallet.pubkey());
        Ok(wallet)
    }

    /// Parse a secret given either as base58 or as a JSON byte array.
    pub fn from_secret(secret: &str) -> Result<Self> {
        let keypair = Self::parse_keypair(secret)?;
        Ok(Self { keypair })
    }

    /// Load keypair from a Solana CLI keypair file
    pub fn from_file<P: AsRef<Path>>(keypair_path: P) -> Result<Self> {
        let path = keypair_path.as_ref();
        let keypair_data = fs::read_to_string(path)
            .map_err(|e| anyhow!("Failed to read keypair file {}: {}", path.display(), e))?;

        let keypair = Self::parse_keypair(&keypair_data)?;

        info!("Loaded keypair from {}, pubkey: {}", path.display(), keypair.pubkey());

        Ok(Self { keypair })
    }

    pub fn from_keypair(keypair: Keypair) -> Self {
        Self { keypair }
    }

    pub fn pubkey(&self) -> Pubkey {
        self.keypair.pubkey()
    }

    pub fn keypair(&self) -> &Keypair {
        &self.keypair
    }

    fn parse_keypair(data: &str) -> Result<Keypair> {
        let data = data.trim();

        // Solana CLI format
        if data.starts_with('[') && data.ends_with(']') {
            let bytes: Vec<u8> = serde_json::from_str(data)
                .map_err(|e| anyhow!("Failed to parse keypair JSON array: {}", e))?;

            return Self::keypair_from_bytes(&bytes);
        }

        let bytes = bs58::decode(data)
            .into_vec()
            .map_err(|e| anyhow!("Invalid base58 secret key: {}", e))?;

        Self::keypair_from_bytes(&bytes)
    }

    fn keypair_from_bytes(bytes: &[u8]) -> Result<Keypair> {
        if bytes.len() != 64 {
            return Err(anyhow!("Invalid keypair: expected 64 bytes, got {}", bytes.len()));
        }
        Keypair::try_from(bytes).map_err(|e| anyhow!("Failed to create keypair from bytes: {}", e))
    }
}
