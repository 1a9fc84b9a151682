//! Storefront engine configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! ## Required
//! - `STORE_WALLET_ADDRESS` - the store-owned destination wallet
//! - `PRINTIFY_SHOP_ID` - print-provider shop id
//!
//! ## Optional
//! - `SOLANA_RPC_URL` - RPC endpoint (default: devnet)
//! - `PRICE_API_URL` - price API base URL (default: CoinGecko v3)
//! - `PROVIDER_PROXY_URL` - gateway provider proxy (default: `http://localhost:3005`)
//! - `MAIL_BRIDGE_URL` - gateway mail bridge (default: `http://localhost:3001`)
//! - `STORE_DATA_DIR` - directory for the local JSON store (default: `.`)
//! - `RECEIPT_FROM_NAME` - display name on receipt emails

use std::path::PathBuf;

use dinero_store_core::WalletAddress;
use thiserror::Error;

/// Configuration errors that can occur during loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(String),
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
}

/// Storefront engine configuration.
#[derive(Debug, Clone)]
pub struct StorefrontConfig {
    /// Solana RPC endpoint.
    pub rpc_url: String,
    /// Price API base URL.
    pub price_api_url: String,
    /// Store-owned destination wallet for payments.
    pub store_wallet: WalletAddress,
    /// Print-provider shop id.
    pub shop_id: String,
    /// Gateway provider-proxy base URL.
    pub provider_proxy_url: String,
    /// Gateway mail-bridge base URL.
    pub mail_bridge_url: String,
    /// Directory holding the local JSON store.
    pub data_dir: PathBuf,
    /// Display name on receipt emails.
    pub receipt_from: String,
}

impl StorefrontConfig {
    /// Load configuration from environment variables.
    ///
    /// Calls `dotenvy::dotenv()` to load from `.env` file if present.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if required variables are missing.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        Ok(Self {
            rpc_url: get_env_or_default("SOLANA_RPC_URL", "https://api.devnet.solana.com"),
            price_api_url: get_env_or_default("PRICE_API_URL", "https://api.coingecko.com/api/v3"),
            store_wallet: WalletAddress::new(get_required_env("STORE_WALLET_ADDRESS")?),
            shop_id: get_required_env("PRINTIFY_SHOP_ID")?,
            provider_proxy_url: get_env_or_default("PROVIDER_PROXY_URL", "http://localhost:3005"),
            mail_bridge_url: get_env_or_default("MAIL_BRIDGE_URL", "http://localhost:3001"),
            data_dir: PathBuf::from(get_env_or_default("STORE_DATA_DIR", ".")),
            receipt_from: get_env_or_default("RECEIPT_FROM_NAME", "Dinero Store"),
        })
    }
}

/// Get a required environment variable.
fn get_required_env(key: &str) -> Result<String, ConfigError> {
    std::env::var(key).map_err(|_| ConfigError::MissingEnvVar(key.to_string()))
}

/// Get an environment variable with a default value.
fn get_env_or_default(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}
