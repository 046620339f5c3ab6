//! Configuration management for the provider key store.
//!
//! Configuration is read once at startup from environment variables:
//! - `SECRETBOX_KEY` - Required. Base64-encoded 32-byte encryption key.
//! - `ADMIN_TOKEN` - Required. Bearer token for the admin API.
//! - `KEYS_STORE_PATH` - Optional. Encrypted store file. Defaults to `data/keys.enc`.
//! - `HOST` - Optional. Server host. Defaults to `127.0.0.1`.
//! - `PORT` - Optional. Server port. Defaults to `3000`.

use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

use crate::secrets::SecretboxKey;

pub const SECRETBOX_KEY_ENV: &str = "SECRETBOX_KEY";
pub const ADMIN_TOKEN_ENV: &str = "ADMIN_TOKEN";
pub const KEYS_STORE_PATH_ENV: &str = "KEYS_STORE_PATH";

const DEFAULT_KEYS_STORE_PATH: &str = "data/keys.enc";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingEnvVar(String),

    #[error("Invalid value for {0}: {1}")]
    InvalidValue(String, String),
}

/// Validated service configuration.
#[derive(Clone)]
pub struct Config {
    /// Key used to seal the store file
    pub secretbox_key: SecretboxKey,

    /// Shared bearer credential for `/admin` routes
    pub admin_token: String,

    /// Path to the encrypted store file
    pub keys_store_path: PathBuf,

    /// Server host
    pub host: String,

    /// Server port
    pub port: u16,
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if `SECRETBOX_KEY` or `ADMIN_TOKEN` is missing or invalid.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Build configuration from an arbitrary variable source.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let encoded_key = lookup(SECRETBOX_KEY_ENV)
            .filter(|v| !v.trim().is_empty())
            .ok_or_else(|| ConfigError::MissingEnvVar(SECRETBOX_KEY_ENV.to_string()))?;
        let secretbox_key = SecretboxKey::from_base64(&encoded_key)
            .map_err(|e| ConfigError::InvalidValue(SECRETBOX_KEY_ENV.to_string(), e.to_string()))?;

        let admin_token = lookup(ADMIN_TOKEN_ENV)
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
            .ok_or_else(|| ConfigError::MissingEnvVar(ADMIN_TOKEN_ENV.to_string()))?;

        let keys_store_path = lookup(KEYS_STORE_PATH_ENV)
            .filter(|v| !v.trim().is_empty())
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_KEYS_STORE_PATH));

        let host = lookup("HOST").unwrap_or_else(|| "127.0.0.1".to_string());

        let port = lookup("PORT")
            .unwrap_or_else(|| "3000".to_string())
            .parse()
            .map_err(|e| ConfigError::InvalidValue("PORT".to_string(), format!("{}", e)))?;

        Ok(Self {
            secretbox_key,
            admin_token,
            keys_store_path,
            host,
            port,
        })
    }

    /// Create a config with custom values (useful for testing).
    pub fn new(secretbox_key: SecretboxKey, admin_token: String, keys_store_path: PathBuf) -> Self {
        Self {
            secretbox_key,
            admin_token,
            keys_store_path,
            host: "127.0.0.1".to_string(),
            port: 3000,
        }
    }
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("secretbox_key", &self.secretbox_key)
            .field("admin_token", &"<redacted>")
            .field("keys_store_path", &self.keys_store_path)
            .field("host", &self.host)
            .field("port", &self.port)
            .finish()
    }
}
