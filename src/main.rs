//! Application entry: loads config and the authority key, wires the RPC
//! client and storage backends into the token creator, and runs one launch.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use spl_token_launcher::config::{TokenConfig, DEFAULT_CONFIG_PATH};
use spl_token_launcher::errors::LaunchOutcome;
use spl_token_launcher::metadata::{HttpMetadataFetcher, MetadataUploader};
use spl_token_launcher::rpc_manager::{ChainRpc, RpcManager};
use spl_token_launcher::token_creator::{LaunchParams, TokenCreator};
use spl_token_launcher::wallet::WalletManager;

#[derive(Parser, Debug)]
#[command(name = "spl_token_launcher", about = "Create an SPL token with Metaplex metadata and mint its supply")]
struct Args {
    /// TOML configuration file
    #[arg(long, default_value = DEFAULT_CONFIG_PATH)]
    config: PathBuf,

    /// RPC endpoint, or `devnet`
    #[arg(long)]
    rpc_url: Option<String>,

    /// Metadata JSON file inside the assets directory
    #[arg(long)]
    metadata_file: Option<String>,

    /// Use an already uploaded metadata URI instead of uploading
    #[arg(long)]
    metadata_uri: Option<String>,

    #[arg(long)]
    decimals: Option<u8>,

    /// Whole tokens to mint
    #[arg(long)]
    total_supply: Option<u64>,

    #[arg(long)]
    disable_freeze: bool,

    /// Read the authority from a keypair file instead of the environment
    #[arg(long)]
    keypair: Option<PathBuf>,
}

impl Args {
    fn apply(&self, cfg: &mut TokenConfig) {
        if let Some(v) = &self.rpc_url {
            cfg.rpc_url = v.clone();
        }
        if let Some(v) = &self.metadata_file {
            cfg.metadata_file = v.clone();
        }
        if let Some(v) = &self.metadata_uri {
            cfg.metadata_uri = Some(v.clone());
        }
        if let Some(v) = self.decimals {
            cfg.decimals = v;
        }
        if let Some(v) = self.total_supply {
            cfg.total_supply = v;
        }
        if self.disable_freeze {
            cfg.disable_freeze = true;
        }
    }
}

#[tokio::main(flavor = "multi_thread")]
async fn main() -> anyhow::Result<()> {
    dotenv::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_target(false)
        .init();

    let args = Args::parse();

    let mut cfg = TokenConfig::load(&args.config)?;
    args.apply(&mut cfg);
    cfg.validate()?;
    cfg.check_storage_credentials()?;
    info!(
        "Loaded config: rpc={} tier={} decimals={} supply={} metadata={}",
        cfg.rpc_endpoint(),
        cfg.network_tier().label(),
        cfg.decimals,
        cfg.total_supply,
        cfg.metadata_uri.as_deref().unwrap_or(&cfg.metadata_file)
    );

    // The key is loaded before any client exists, so a missing secret never reaches the network.
    let wallet = match &args.keypair {
        Some(path) => WalletManager::from_file(path)?,
        None => WalletManager::from_env(&cfg.secret_key_env)?,
    };

    let rpc: Arc<dyn ChainRpc> = Arc::new(RpcManager::from_config(&cfg));
    let uploader = MetadataUploader::from_config(&cfg)?;
    let fetcher = Arc::new(HttpMetadataFetcher::new(Duration::from_secs(cfg.storage_timeout_sec))?);

    let creator = TokenCreator::new(rpc, Arc::new(wallet), uploader, fetcher);
    let outcome = creator.launch(&LaunchParams::from_config(&cfg)).await;

    match &outcome {
        LaunchOutcome::Completed(report) => {
            info!("Token {} launched ({} {})", report.mint, report.name, report.symbol);
            info!("Metadata: {}", report.metadata_uri);
            if let Some(ata) = report.token_account {
                info!("Supply of {} base units held in {}", report.base_units, ata);
            }
        }
        LaunchOutcome::PartiallyCompleted(report) => {
            warn!("Token {} launched with {} failed step(s)", report.mint, report.failures.len());
            for failure in &report.failures {
                warn!("  {}: {}", failure.step.label(), failure.error.detail());
            }
        }
        LaunchOutcome::PreconditionFailed(e) => {
            error!("Launch aborted [{}]: {}", e.category().label(), e.detail());
        }
    }

    let code = outcome.exit_code();
    if code != 0 {
        std::process::exit(code);
    }
    Ok(())
}
