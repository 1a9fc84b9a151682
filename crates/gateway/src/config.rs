//! Gateway configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! ## Provider proxy
//! - `PRINTIFY_API_KEY` (required) - bearer credential for the provider API
//! - `PRINTIFY_BASE_URL` - provider API base (default: `https://api.printify.com/v1`)
//! - `PROVIDER_PROXY_PORT` - listen port (default: 3005)
//!
//! ## Mail bridge
//! - `SMTP_USER` / `SMTP_PASS` (required) - relay credentials
//! - `SMTP_HOST` - relay host (default: `smtp.gmail.com`)
//! - `SMTP_PORT` - relay port (default: 587)
//! - `SOLANA_RPC_URL` - RPC endpoint for payment verification (default: devnet)
//! - `EMAIL_COST_SOL` - advertised per-mail cost (default: 0.001)
//! - `MAIL_BRIDGE_PORT` - listen port (default: 3001)
//!
//! ## Shared
//! - `GATEWAY_HOST` - bind address (default: 127.0.0.1)
//! - `SENTRY_DSN` - error tracking DSN (optional)

use std::net::{IpAddr, SocketAddr};

use secrecy::SecretString;
use thiserror::Error;

/// Configuration errors that can occur during loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(String),
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
}

/// Provider-proxy configuration.
///
/// Implements `Debug` manually to redact the bearer credential.
#[derive(Clone)]
pub struct ProxyConfig {
    pub host: IpAddr,
    pub port: u16,
    /// Server-held provider bearer credential.
    pub api_key: SecretString,
    /// Provider API base URL.
    pub base_url: String,
    pub sentry_dsn: Option<String>,
}

impl std::fmt::Debug for ProxyConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProxyConfig")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("api_key", &"[REDACTED]")
            .field("base_url", &self.base_url)
            .field("sentry_dsn", &self.sentry_dsn)
            .finish()
    }
}

impl ProxyConfig {
    /// Load from environment variables (reads `.env` when present).
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if required variables are missing or invalid.
    pub fn from_env() -> Result<Self, ConfigError> {
        let _ = dotenvy::dotenv();

        Ok(Self {
            host: parse_host()?,
            port: parse_port("PROVIDER_PROXY_PORT", 3005)?,
            api_key: SecretString::from(get_required_env("PRINTIFY_API_KEY")?),
            base_url: get_env_or_default("PRINTIFY_BASE_URL", "https://api.printify.com/v1"),
            sentry_dsn: std::env::var("SENTRY_DSN").ok(),
        })
    }

    /// Returns the socket address for binding the server.
    #[must_use]
    pub const fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }
}

/// SMTP relay settings.
///
/// Implements `Debug` manually to redact the password.
#[derive(Clone)]
pub struct SmtpConfig {
    pub host: String,
    pub port: u16,
    pub user: String,
    pub pass: SecretString,
}

impl std::fmt::Debug for SmtpConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SmtpConfig")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("user", &self.user)
            .field("pass", &"[REDACTED]")
            .finish()
    }
}

/// Mail-bridge configuration.
#[derive(Debug, Clone)]
pub struct MailBridgeConfig {
    pub host: IpAddr,
    pub port: u16,
    pub smtp: SmtpConfig,
    /// RPC endpoint used to verify referenced payment transactions.
    pub rpc_url: String,
    /// Advertised per-mail cost in SOL.
    pub email_cost_sol: f64,
    pub sentry_dsn: Option<String>,
}

impl MailBridgeConfig {
    /// Load from environment variables (reads `.env` when present).
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if required variables are missing or invalid.
    pub fn from_env() -> Result<Self, ConfigError> {
        let _ = dotenvy::dotenv();

        let email_cost_sol = get_env_or_default("EMAIL_COST_SOL", "0.001")
            .parse::<f64>()
            .map_err(|e| ConfigError::InvalidEnvVar("EMAIL_COST_SOL".into(), e.to_string()))?;

        Ok(Self {
            host: parse_host()?,
            port: parse_port("MAIL_BRIDGE_PORT", 3001)?,
            smtp: SmtpConfig {
                host: get_env_or_default("SMTP_HOST", "smtp.gmail.com"),
                port: parse_port("SMTP_PORT", 587)?,
                user: get_required_env("SMTP_USER")?,
                pass: SecretString::from(get_required_env("SMTP_PASS")?),
            },
            rpc_url: get_env_or_default("SOLANA_RPC_URL", "https://api.devnet.solana.com"),
            email_cost_sol,
            sentry_dsn: std::env::var("SENTRY_DSN").ok(),
        })
    }

    /// Returns the socket address for binding the server.
    #[must_use]
    pub const fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }
}

fn parse_host() -> Result<IpAddr, ConfigError> {
    get_env_or_default("GATEWAY_HOST", "127.0.0.1")
        .parse::<IpAddr>()
        .map_err(|e| ConfigError::InvalidEnvVar("GATEWAY_HOST".into(), e.to_string()))
}

fn parse_port(key: &str, default: u16) -> Result<u16, ConfigError> {
    get_env_or_default(key, &default.to_string())
        .parse::<u16>()
        .map_err(|e| ConfigError::InvalidEnvVar(key.to_string(), e.to_string()))
}

/// Get a required environment variable.
fn get_required_env(key: &str) -> Result<String, ConfigError> {
    std::env::var(key).map_err(|_| ConfigError::MissingEnvVar(key.to_string()))
}

/// Get an environment variable with a default value.
fn get_env_or_default(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}
