/*!
Startup checks: configuration and authority loading fail before any client is built
*/

use std::fs;
use std::path::PathBuf;

use solana_sdk::signature::{Keypair, Signer};
use tempfile::TempDir;

use spl_token_launcher::config::{NetworkTier, TokenConfig};
use spl_token_launcher::errors::ErrorCategory;
use spl_token_launcher::metadata::MetadataUploader;
use spl_token_launcher::token_creator::LaunchParams;
use spl_token_launcher::wallet::WalletManager;

#[test]
fn missing_secret_is_a_wallet_error() {
    let cfg = TokenConfig {
        secret_key_env: "SPL_LAUNCHER_STARTUP_TEST_UNSET".to_string(),
        ..TokenConfig::default()
    };
    let err = WalletManager::from_env(&cfg.secret_key_env).unwrap_err();
    assert_eq!(err.category(), ErrorCategory::Wallet);
    assert!(err.to_string().contains("SPL_LAUNCHER_STARTUP_TEST_UNSET"));
}

#[test]
fn base58_secret_round_trips_to_authority() {
    let keypair = Keypair::new();
    let secret = bs58::encode(keypair.to_bytes()).into_string();
    let wallet = WalletManager::from_secret(&secret).unwrap();
    assert_eq!(wallet.pubkey(), keypair.pubkey());
}

#[test]
fn config_file_drives_launch_params() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("launch.toml");
    fs::write(
        &path,
        r#"
decimals = 6
disable_freeze = true
total_supply = 21000000
rpc_url = "https://api.mainnet-beta.solana.com"
metadata_file = "coin.json"
verify_upload = false
"#,
    )
    .unwrap();

    let cfg = TokenConfig::load(&path).unwrap();
    cfg.validate().unwrap();
    assert_eq!(cfg.metadata_path(), PathBuf::from("assets").join("coin.json"));

    let params = LaunchParams::from_config(&cfg);
    assert_eq!(params.decimals, 6);
    assert!(params.disable_freeze);
    assert_eq!(params.total_supply, 21_000_000);
    assert_eq!(params.tier, NetworkTier::Mainnet);
    assert!(!params.verify_upload);
    assert_eq!(cfg.base_units(), Some(21_000_000_000_000));
}

#[test]
fn invalid_config_is_rejected() {
    let cfg = TokenConfig {
        seller_fee_basis_points: 10_001,
        ..TokenConfig::default()
    };
    let err = cfg.validate().unwrap_err();
    assert_eq!(err.category(), ErrorCategory::Configuration);
}

#[test]
fn missing_pinning_jwt_fails_startup_for_the_run_tier() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("launch.toml");
    fs::write(
        &path,
        r#"
rpc_url = "https://api.mainnet-beta.solana.com"

[storage.mainnet]
jwt_env = "SPL_LAUNCHER_STARTUP_TEST_UNSET_JWT"
"#,
    )
    .unwrap();

    let cfg = TokenConfig::load(&path).unwrap();
    cfg.validate().unwrap();
    let err = cfg.check_storage_credentials().unwrap_err();
    assert_eq!(err.category(), ErrorCategory::Configuration);
    assert!(err.to_string().contains("SPL_LAUNCHER_STARTUP_TEST_UNSET_JWT"));
    assert!(err.to_string().contains("mainnet"));
}

#[test]
fn uploader_builds_from_default_config() {
    assert!(MetadataUploader::from_config(&TokenConfig::default()).is_ok());
}
