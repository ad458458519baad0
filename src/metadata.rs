//! Off-chain token metadata: the local descriptor, the storage backends it is
//! uploaded to, and the HTTP fetch used to read it back.

use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use reqwest::{Client, Url};
use serde::{Deserialize, Serialize};
use solana_sdk::signature::{Keypair, Signature, Signer};
use tracing::{debug, error, info};

use crate::config::{NetworkTier, PinningProvider, TokenConfig};

/// Metaplex on-chain limits for name and symbol, in bytes.
pub const MAX_NAME_LEN: usize = 32;
pub const MAX_SYMBOL_LEN: usize = 10;

/// The JSON document describing the token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetadataDescriptor {
    pub name: String,
    pub symbol: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub image: String,
}

impl MetadataDescriptor {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let raw = fs::read_to_string(path)
            .with_context(|| format!("failed to read metadata file {}", path.display()))?;
        let descriptor: MetadataDescriptor = serde_json::from_str(&raw)
            .with_context(|| format!("failed to parse metadata file {}", path.display()))?;
        descriptor.validate()?;
        Ok(descriptor)
    }

    pub fn validate(&self) -> Result<()> {
        if self.name.trim().is_empty() {
            return Err(anyhow!("metadata name must not be empty"));
        }
        if self.symbol.trim().is_empty() {
            return Err(anyhow!("metadata symbol must not be empty"));
        }
        if self.name.len() > MAX_NAME_LEN {
            return Err(anyhow!(
                "metadata name is {} bytes, max is {}",
                self.name.len(),
                MAX_NAME_LEN
            ));
        }
        if self.symbol.len() > MAX_SYMBOL_LEN {
            return Err(anyhow!(
                "metadata symbol is {} bytes, max is {}",
                self.symbol.len(),
                MAX_SYMBOL_LEN
            ));
        }
        Ok(())
    }
}

/// Only absolute http(s) URLs are accepted as content URIs.
pub fn validate_uri(uri: &str) -> Result<()> {
    let url = Url::parse(uri).with_context(|| format!("invalid metadata uri {:?}", uri))?;
    match url.scheme() {
        "http" | "https" => Ok(()),
        other => Err(anyhow!("unsupported metadata uri scheme {:?}", other)),
    }
}

/// A decentralized storage provider that accepts a descriptor and returns a durable URI.
/// The authority keypair is handed over so providers can sign what they publish.
#[async_trait]
pub trait MetadataStorage: Send + Sync + std::fmt::Debug {
    async fn upload(&self, descriptor: &MetadataDescriptor, authority: &Keypair) -> Result<String>;
}

/// Reads an uploaded descriptor back from its URI.
#[async_trait]
pub trait MetadataFetcher: Send + Sync + std::fmt::Debug {
    async fn fetch(&self, uri: &str) -> Result<MetadataDescriptor>;
}

/// Authority signature over the exact JSON bytes that get pinned.
pub fn content_signature(descriptor: &MetadataDescriptor, authority: &Keypair) -> Result<Signature> {
    let bytes = serde_json::to_vec(descriptor).context("failed to serialize metadata descriptor")?;
    Ok(authority.sign_message(&bytes))
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct PinRequest<'a> {
    pinata_options: PinOptions,
    pinata_metadata: PinMetadata,
    pinata_content: &'a MetadataDescriptor,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct PinOptions {
    cid_version: u8,
    #[serde(skip_serializing_if = "Option::is_none")]
    group_id: Option<String>,
}

#[derive(Debug, Serialize)]
struct PinMetadata {
    name: String,
    keyvalues: BTreeMap<String, String>,
}

#[derive(Debug, Deserialize)]
struct PinResponse {
    #[serde(rename = "IpfsHash")]
    ipfs_hash: String,
}

/// Pins the descriptor through Pinata's `pinJSONToIPFS` endpoint and
/// resolves the returned IPFS hash against a gateway.
#[derive(Debug, Clone)]
pub struct HttpMetadataStorage {
    client: Client,
    pin_url: String,
    gateway_url: String,
    jwt: Option<String>,
    group_id: Option<String>,
}

impl HttpMetadataStorage {
    pub fn new(
        pin_url: impl Into<String>,
        gateway_url: impl Into<String>,
        jwt: Option<String>,
        group_id: Option<String>,
        timeout: Duration,
    ) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .context("failed to build storage HTTP client")?;
        Ok(Self {
            client,
            pin_url: pin_url.into(),
            gateway_url: gateway_url.into(),
            jwt,
            group_id,
        })
    }

    pub fn from_provider(provider: &PinningProvider, timeout: Duration) -> Result<Self> {
        Self::new(
            provider.pin_url.clone(),
            provider.gateway_url.clone(),
            provider.jwt(),
            provider.group_id.clone(),
            timeout,
        )
    }

    fn pin_request<'a>(
        &self,
        descriptor: &'a MetadataDescriptor,
        authority: &Keypair,
    ) -> Result<PinRequest<'a>> {
        let signature = content_signature(descriptor, authority)?;
        // keyvalues let anyone check the pinned JSON against the mint authority
        let mut keyvalues = BTreeMap::new();
        keyvalues.insert("authority".to_string(), authority.pubkey().to_string());
        keyvalues.insert("signature".to_string(), signature.to_string());

        Ok(PinRequest {
            pinata_options: PinOptions {
                cid_version: 1,
                group_id: self.group_id.clone(),
            },
            pinata_metadata: PinMetadata {
                name: format!("{}-metadata.json", descriptor.symbol),
                keyvalues,
            },
            pinata_content: descriptor,
        })
    }

    fn resolve(&self, response: PinResponse) -> Result<String> {
        let hash = response.ipfs_hash.trim();
        if hash.is_empty() {
            return Err(anyhow!("pinning provider {} returned an empty IpfsHash", self.pin_url));
        }
        Ok(format!("{}/{}", self.gateway_url.trim_end_matches('/'), hash))
    }
}

#[async_trait]
impl MetadataStorage for HttpMetadataStorage {
    async fn upload(&self, descriptor: &MetadataDescriptor, authority: &Keypair) -> Result<String> {
        let jwt = self
            .jwt
            .as_deref()
            .ok_or_else(|| anyhow!("no JWT configured for pinning provider {}", self.pin_url))?;
        debug!("Pinning metadata for {} at {}", descriptor.symbol, self.pin_url);

        let body = self.pin_request(descriptor, authority)?;
        let response = self
            .client
            .post(&self.pin_url)
            .bearer_auth(jwt)
            .json(&body)
            .send()
            .await
            .with_context(|| format!("pin request to {} failed", self.pin_url))?;

        let status = response.status();
        if !status.is_success() {
            let reason = response.text().await.unwrap_or_default();
            return Err(anyhow!(
                "pinning provider {} rejected upload ({}): {}",
                self.pin_url,
                status,
                reason.trim()
            ));
        }

        let pinned: PinResponse = response
            .json()
            .await
            .context("pinning provider returned an unreadable response")?;

        self.resolve(pinned)
    }
}

#[derive(Debug, Clone)]
pub struct HttpMetadataFetcher {
    client: Client,
}

impl HttpMetadataFetcher {
    pub fn new(timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .context("failed to build metadata fetch HTTP client")?;
        Ok(Self { client })
    }
}

#[async_trait]
impl MetadataFetcher for HttpMetadataFetcher {
    async fn fetch(&self, uri: &str) -> Result<MetadataDescriptor> {
        let response = self
            .client
            .get(uri)
            .send()
            .await
            .with_context(|| format!("GET {} failed", uri))?
            .error_for_status()
            .with_context(|| format!("GET {} returned an error status", uri))?;

        response
            .json::<MetadataDescriptor>()
            .await
            .with_context(|| format!("{} is not a metadata document", uri))
    }
}

/// A successful upload: the URI plus the descriptor that was sent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadedMetadata {
    pub uri: String,
    pub descriptor: MetadataDescriptor,
}

/// Reads descriptors from the assets directory and uploads them to the
/// storage backend registered for the network tier.
#[derive(Debug)]
pub struct MetadataUploader {
    assets_dir: PathBuf,
    backends: HashMap<NetworkTier, Arc<dyn MetadataStorage>>,
}

impl MetadataUploader {
    pub fn new(assets_dir: impl Into<PathBuf>) -> Self {
        Self {
            assets_dir: assets_dir.into(),
            backends: HashMap::new(),
        }
    }

    pub fn with_backend(mut self, tier: NetworkTier, storage: Arc<dyn MetadataStorage>) -> Self {
        self.backends.insert(tier, storage);
        self
    }

    /// Devnet and mainnet pinning backends from the storage section of the config.
    pub fn from_config(config: &TokenConfig) -> Result<Self> {
        let timeout = Duration::from_secs(config.storage_timeout_sec);
        let mut uploader = Self::new(config.assets_dir.clone());
        for tier in [NetworkTier::Devnet, NetworkTier::Mainnet] {
            let storage = HttpMetadataStorage::from_provider(config.storage.provider(tier), timeout)?;
            uploader = uploader.with_backend(tier, Arc::new(storage));
        }
        Ok(uploader)
    }

    /// Upload `<assets_dir>/<metadata_file>`. Every failure is logged and
    /// reported as `None`; nothing is returned as an error.
    pub async fn upload(
        &self,
        metadata_file: &str,
        authority: &Keypair,
        tier: NetworkTier,
    ) -> Option<UploadedMetadata> {
        info!("Uploading metadata to {} storage...", tier.label());
        match self.try_upload(metadata_file, authority, tier).await {
            Ok(uploaded) => Some(uploaded),
            Err(e) => {
                error!(file = metadata_file, tier = tier.label(), "Metadata upload failed: {:#}", e);
                None
            }
        }
    }

    async fn try_upload(
        &self,
        metadata_file: &str,
        authority: &Keypair,
        tier: NetworkTier,
    ) -> Result<UploadedMetadata> {
        let descriptor = MetadataDescriptor::from_file(self.assets_dir.join(metadata_file))?;

        let storage = self
            .backends
            .get(&tier)
            .ok_or_else(|| anyhow!("no storage backend configured for {}", tier.label()))?;

        let uri = storage.upload(&descriptor, authority).await?;
        validate_uri(&uri)?;

        Ok(UploadedMetadata { uri, descriptor })
    }
}
