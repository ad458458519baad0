//! TokenCreator - the launch workflow
//!
//! Creates the mint and its Metaplex metadata account in one atomic
//! transaction, then mints the initial supply into the authority's
//! associated token account. The metadata upload is a hard precondition;
//! the two on-chain steps after it are best effort and independent.

use std::sync::Arc;
use std::time::Instant;

use solana_sdk::{
    instruction::Instruction,
    pubkey::Pubkey,
    signature::{Keypair, Signature, Signer},
};
use tracing::{debug, error, info, warn};

use crate::config::{NetworkTier, TokenConfig};
use crate::errors::{ErrorContext, LaunchError, LaunchOutcome, LaunchStep, StepFailure};
use crate::metadata::{validate_uri, MetadataDescriptor, MetadataFetcher, MetadataUploader};
use crate::rpc_manager::ChainRpc;
use crate::structured_logging::StructuredLogger;
use crate::tx_builder::{self, OnChainMetadata, MINT_ACCOUNT_LEN};
use crate::wallet::WalletManager;

/// Per-run launch parameters
#[derive(Debug, Clone)]
pub struct LaunchParams {
    pub decimals: u8,
    pub disable_freeze: bool,
    pub metadata_file: String,
    pub total_supply: u64,
    pub tier: NetworkTier,
    /// Skip the upload and use this URI
    pub metadata_uri: Option<String>,
    pub verify_upload: bool,
    pub is_mutable: bool,
    pub seller_fee_basis_points: u16,
}

impl LaunchParams {
    pub fn from_config(config: &TokenConfig) -> Self {
        Self {
            decimals: config.decimals,
            disable_freeze: config.disable_freeze,
            metadata_file: config.metadata_file.clone(),
            total_supply: config.total_supply,
            tier: config.network_tier(),
            metadata_uri: config.metadata_uri.clone(),
            verify_upload: config.verify_upload,
            is_mutable: config.is_mutable,
            seller_fee_basis_points: config.seller_fee_basis_points,
        }
    }
}

/// What a launch did on chain
#[derive(Debug)]
pub struct LaunchReport {
    pub mint: Pubkey,
    pub authority: Pubkey,
    pub metadata_pda: Pubkey,
    pub metadata_uri: String,
    pub name: String,
    pub symbol: String,
    /// Signature of the create-mint/metadata transaction
    pub create_signature: Option<Signature>,
    pub token_account: Option<Pubkey>,
    pub mint_signature: Option<Signature>,
    /// Amount requested for the mint, in base units
    pub base_units: u64,
    pub failures: Vec<StepFailure>,
}

impl LaunchReport {
    pub fn failed(&self, step: LaunchStep) -> bool {
        self.failures.iter().any(|f| f.step == step)
    }
}

/// Main TokenCreator struct
pub struct TokenCreator {
    rpc: Arc<dyn ChainRpc>,
    wallet: Arc<WalletManager>,
    uploader: MetadataUploader,
    fetcher: Arc<dyn MetadataFetcher>,
    logger: StructuredLogger,
}

impl TokenCreator {
    pub fn new(
        rpc: Arc<dyn ChainRpc>,
        wallet: Arc<WalletManager>,
        uploader: MetadataUploader,
        fetcher: Arc<dyn MetadataFetcher>,
    ) -> Self {
        Self {
            rpc,
            wallet,
            uploader,
            fetcher,
            logger: StructuredLogger::new("token_creator"),
        }
    }

    /// Run the whole launch.
    pub async fn launch(&self, params: &LaunchParams) -> LaunchOutcome {
        let authority = self.wallet.pubkey();

        let base_units = match tx_builder::base_units(params.total_supply, params.decimals) {
            Some(amount) => amount,
            None => {
                return self.abort(LaunchError::config(format!(
                    "total_supply {} with {} decimals overflows a u64 amount",
                    params.total_supply, params.decimals
                )))
            }
        };

        // 1. Fresh mint keypair
        let mint_keypair = Keypair::new();
        let mint = mint_keypair.pubkey();
        self.logger
            .log_launch_started(&mint.to_string(), &authority.to_string(), params.tier.label());
        debug!("Generated mint keypair: {}", mint);

        // 2. Rent for the mint account
        let rent_lamports = match self.rpc.minimum_balance_for_rent_exemption(MINT_ACCOUNT_LEN).await {
            Ok(lamports) => lamports,
            Err(e) => return self.abort(e.rpc_context("failed to query mint rent exemption")),
        };
        debug!("Mint account rent: {} lamports", rent_lamports);

        // 3. Metadata PDA
        let metadata_pda = tx_builder::metadata_pda(&mint);
        debug!("Metadata PDA: {}", metadata_pda);

        // 4 + 5. Upload and read back
        let metadata = match self.prepare_metadata(params).await {
            Ok(m) => m,
            Err(e) => return self.abort(e),
        };

        let mut report = LaunchReport {
            mint,
            authority,
            metadata_pda,
            metadata_uri: metadata.uri.clone(),
            name: metadata.name.clone(),
            symbol: metadata.symbol.clone(),
            create_signature: None,
            token_account: None,
            mint_signature: None,
            base_units,
            failures: Vec::new(),
        };

        // 6. create-mint + initialize-mint + create-metadata
        info!("Creating token...");
        match self
            .create_token(&mint_keypair, rent_lamports, params, &metadata)
            .await
        {
            Ok(signature) => {
                info!("Transaction succeeded: {}", signature);
                info!("Token address: {}", mint);
                report.create_signature = Some(signature);
            }
            Err(e) => {
                error!("Token creation failed: {}", e.detail());
                self.record_failure(&mut report, LaunchStep::CreateToken, e);
            }
        }

        // 7. Token account + supply
        self.mint_supply(&mut report, params.total_supply).await;

        self.logger
            .log_launch_finished(&mint.to_string(), base_units, report.failures.len());
        LaunchOutcome::from_report(report)
    }

    fn abort(&self, error: LaunchError) -> LaunchOutcome {
        error!("Launch aborted before any on-chain change: {}", error.detail());
        self.logger.log_precondition_failed(&error.detail());
        LaunchOutcome::PreconditionFailed(error)
    }

    fn record_failure(&self, report: &mut LaunchReport, step: LaunchStep, error: LaunchError) {
        self.logger.log_step_failure(step.label(), &error.detail());
        report.failures.push(StepFailure { step, error });
    }

    /// Resolve the metadata URI and the name/symbol that go on chain.
    async fn prepare_metadata(&self, params: &LaunchParams) -> Result<OnChainMetadata, LaunchError> {
        let (uri, local) = match &params.metadata_uri {
            Some(uri) => {
                validate_uri(uri).map_err(|e| e.metadata_context("configured metadata_uri is invalid"))?;
                info!("Using pre-uploaded metadata: {}", uri);
                (uri.clone(), None)
            }
            None => {
                let uploaded = self
                    .uploader
                    .upload(&params.metadata_file, self.wallet.keypair(), params.tier)
                    .await
                    .ok_or_else(|| {
                        LaunchError::metadata(format!(
                            "uploading {} failed; check the metadata file and storage provider and retry",
                            params.metadata_file
                        ))
                    })?;
                info!("Metadata uploaded: {}", uploaded.uri);
                (uploaded.uri, Some(uploaded.descriptor))
            }
        };

        let verified = params.verify_upload || local.is_none();
        let descriptor = if verified {
            let fetched = self.fetch_uploaded(&uri).await?;
            if let Some(local) = &local {
                if local.name != fetched.name || local.symbol != fetched.symbol {
                    warn!(
                        "Uploaded metadata differs from {}: local {}/{} vs stored {}/{}",
                        params.metadata_file, local.name, local.symbol, fetched.name, fetched.symbol
                    );
                }
            }
            fetched
        } else {
            // `local` is always Some when not verifying
            local.ok_or_else(|| LaunchError::metadata("no metadata descriptor available"))?
        };

        self.logger.log_metadata_uploaded(&uri, verified);

        Ok(OnChainMetadata {
            name: descriptor.name,
            symbol: descriptor.symbol,
            uri,
            seller_fee_basis_points: params.seller_fee_basis_points,
            is_mutable: params.is_mutable,
        })
    }

    async fn fetch_uploaded(&self, uri: &str) -> Result<MetadataDescriptor, LaunchError> {
        let fetched = self
            .fetcher
            .fetch(uri)
            .await
            .map_err(|e| e.metadata_context(format!("failed to read back uploaded metadata from {}", uri)))?;
        fetched
            .validate()
            .map_err(|e| e.metadata_context(format!("metadata at {} is not usable on chain", uri)))?;
        Ok(fetched)
    }

    async fn create_token(
        &self,
        mint_keypair: &Keypair,
        rent_lamports: u64,
        params: &LaunchParams,
        metadata: &OnChainMetadata,
    ) -> Result<Signature, LaunchError> {
        let instructions = tx_builder::create_token_instructions(
            &self.wallet.pubkey(),
            &mint_keypair.pubkey(),
            rent_lamports,
            params.decimals,
            params.disable_freeze,
            metadata,
        )
        .map_err(|e| LaunchError::transaction(e.to_string()))?;

        self.submit(LaunchStep::CreateToken, &instructions, &[mint_keypair]).await
    }

    /// Get or create the authority's token account, then mint into it.
    /// A failed account step skips the mint.
    async fn mint_supply(&self, report: &mut LaunchReport, total_supply: u64) {
        let authority = report.authority;
        let mint = report.mint;

        let token_account = match self.ensure_token_account(&authority, &mint).await {
            Ok(address) => address,
            Err(e) => {
                error!("Token account setup failed: {}", e.detail());
                self.record_failure(report, LaunchStep::TokenAccount, e);
                return;
            }
        };
        report.token_account = Some(token_account);

        info!("Minting {} tokens...", total_supply);
        let result = match tx_builder::mint_supply_instruction(&authority, &mint, &token_account, report.base_units) {
            Ok(ix) => self.submit(LaunchStep::MintSupply, &[ix], &[]).await,
            Err(e) => Err(LaunchError::transaction(e.to_string())),
        };

        match result {
            Ok(signature) => {
                info!("Mint succeeded: {}", signature);
                report.mint_signature = Some(signature);
            }
            Err(e) => {
                error!("Mint failed: {}", e.detail());
                self.record_failure(report, LaunchStep::MintSupply, e);
            }
        }
    }

    async fn ensure_token_account(&self, authority: &Pubkey, mint: &Pubkey) -> Result<Pubkey, LaunchError> {
        let address = tx_builder::token_account_address(authority, mint);

        let exists = self
            .rpc
            .account_exists(&address)
            .await
            .map_err(|e| e.rpc_context(format!("failed to look up token account {}", address)))?;

        if exists {
            debug!("Reusing token account {}", address);
        } else {
            info!("Creating token account {}", address);
            let ix = tx_builder::create_token_account_instruction(authority, mint);
            self.submit(LaunchStep::TokenAccount, &[ix], &[]).await?;
        }
        Ok(address)
    }

    async fn submit(
        &self,
        step: LaunchStep,
        instructions: &[Instruction],
        co_signers: &[&Keypair],
    ) -> Result<Signature, LaunchError> {
        let start_time = Instant::now();

        let blockhash = self
            .rpc
            .latest_blockhash()
            .await
            .map_err(|e| e.rpc_context(format!("{}: failed to fetch blockhash", step.label())))?;

        let transaction =
            tx_builder::signed_transaction(instructions, self.wallet.keypair(), co_signers, blockhash);

        let signature = self
            .rpc
            .send_and_confirm(&transaction)
            .await
            .map_err(|e| e.transaction_context(format!("{} transaction failed", step.label())))?;

        self.logger.log_step_success(
            step.label(),
            &signature.to_string(),
            start_time.elapsed().as_millis() as u64,
        );
        Ok(signature)
    }
}
