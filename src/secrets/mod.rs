//! Secrets management module.
//!
//! Provides encrypted storage for third-party provider credentials.
//!
//! ## Architecture
//!
//! ```text
//! KeyStore (in-memory mapping, serialized writers)
//!    │ encode / decode
//!    ▼
//! codec (canonical mapping JSON + versioned envelope)
//!    │ seal / open
//!    ▼
//! SecretsCrypto (AES-256-GCM, key from SECRETBOX_KEY)
//!    │
//!    ▼
//! $KEYS_STORE_PATH   (written as <file>.tmp, then renamed)
//! ```
//!
//! ## Usage
//!
//! ```ignore
//! let crypto = SecretsCrypto::new(&SecretboxKey::from_base64(&encoded)?);
//! let store = KeyStore::load("data/keys.enc", crypto).await?;
//!
//! store.set("gnews", "abc").await?;
//! let secret = store.get_secret("gnews").await;
//! let removed = store.delete("gnews").await?;
//! ```

pub mod codec;
mod crypto;
mod store;
pub mod types;

pub use codec::CodecError;
pub use crypto::{generate_key, CryptoError, SealedPayload, SecretboxKey, SecretsCrypto};
pub use store::{KeyStore, SecretSource};
pub use types::*;
