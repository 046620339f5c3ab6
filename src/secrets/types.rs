//! Types for the provider credential store.

use chrono::{DateTime, Utc};
use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

use super::codec::CodecError;
use super::crypto::CryptoError;

/// A single provider credential.
#[derive(Clone, PartialEq, Eq)]
pub struct Credential {
    /// Provider identifier (case-sensitive, non-empty)
    pub provider: String,
    /// Opaque secret value
    pub secret: String,
    /// When the secret was last written
    pub updated_at: DateTime<Utc>,
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credential")
            .field("provider", &self.provider)
            .field("secret", &"<redacted>")
            .field("updated_at", &self.updated_at)
            .finish()
    }
}

/// Provider name to credential. Sorted, so serialization is canonical.
pub type CredentialMapping = BTreeMap<String, Credential>;

/// Check a provider name before it is accepted into the store.
pub fn is_valid_provider(provider: &str) -> bool {
    !provider.trim().is_empty()
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Provider name must be a non-empty string")]
    InvalidProvider,

    #[error(transparent)]
    Crypto(#[from] CryptoError),

    #[error(transparent)]
    Codec(#[from] CodecError),

    #[error("Key store I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// The store file exists but cannot be trusted. Fatal at startup.
#[derive(Debug, Error)]
#[error("Failed to load key store from {}: {source}", .path.display())]
pub struct StoreInitError {
    pub path: PathBuf,
    #[source]
    pub source: StoreError,
}
