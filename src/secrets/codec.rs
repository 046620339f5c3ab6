//! On-disk format for the key store.
//!
//! The file is a small JSON envelope:
//!
//! ```text
//! {"version":1,"nonce":"<base64, 12 bytes>","ciphertext":"<base64>"}
//! ```
//!
//! The ciphertext opens to the canonical JSON encoding of the credential
//! mapping. The envelope version is authenticated as associated data.

use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use thiserror::Error;
use zeroize::Zeroizing;

use super::crypto::{SecretsCrypto, NONCE_LENGTH};
use super::types::{is_valid_provider, Credential, CredentialMapping, StoreError};

/// Current envelope format version
pub const ENVELOPE_VERSION: u32 = 1;

#[derive(Debug, Error)]
pub enum CodecError {
    /// Details describe structure only, never payload contents.
    #[error("Key store is corrupt: {0}")]
    Corrupt(String),
}

impl CodecError {
    fn from_json(context: &str, err: &serde_json::Error) -> Self {
        CodecError::Corrupt(format!(
            "{} ({:?} error at line {} column {})",
            context,
            err.classify(),
            err.line(),
            err.column()
        ))
    }
}

#[derive(Serialize, Deserialize)]
struct StoredCredential {
    secret: String,
    updated_at: DateTime<Utc>,
}

#[derive(Serialize, Deserialize)]
struct StoredMapping {
    credentials: BTreeMap<String, StoredCredential>,
}

/// Canonical serialization of a mapping. Equal mappings encode to equal bytes.
pub fn encode(mapping: &CredentialMapping) -> Result<Vec<u8>, CodecError> {
    let stored = StoredMapping {
        credentials: mapping
            .iter()
            .map(|(provider, credential)| {
                (
                    provider.clone(),
                    StoredCredential {
                        secret: credential.secret.clone(),
                        updated_at: credential.updated_at,
                    },
                )
            })
            .collect(),
    };

    serde_json::to_vec(&stored).map_err(|e| CodecError::from_json("failed to encode mapping", &e))
}

/// Parse and validate a decrypted mapping.
pub fn decode(bytes: &[u8]) -> Result<CredentialMapping, CodecError> {
    let stored: StoredMapping = serde_json::from_slice(bytes)
        .map_err(|e| CodecError::from_json("malformed credential mapping", &e))?;

    let mut mapping = CredentialMapping::new();
    for (provider, entry) in stored.credentials {
        if !is_valid_provider(&provider) {
            return Err(CodecError::Corrupt(
                "credential mapping contains an empty provider name".to_string(),
            ));
        }
        mapping.insert(
            provider.clone(),
            Credential {
                provider,
                secret: entry.secret,
                updated_at: entry.updated_at,
            },
        );
    }

    Ok(mapping)
}

#[derive(Serialize, Deserialize)]
struct EnvelopeRepr {
    version: u32,
    nonce: String,
    ciphertext: String,
}

/// Sealed store file contents.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Envelope {
    pub version: u32,
    pub nonce: [u8; NONCE_LENGTH],
    pub ciphertext: Vec<u8>,
}

impl Envelope {
    pub fn to_bytes(&self) -> Result<Vec<u8>, CodecError> {
        let repr = EnvelopeRepr {
            version: self.version,
            nonce: BASE64.encode(self.nonce),
            ciphertext: BASE64.encode(&self.ciphertext),
        };
        serde_json::to_vec_pretty(&repr)
            .map_err(|e| CodecError::from_json("failed to encode envelope", &e))
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self, CodecError> {
        let repr: EnvelopeRepr = serde_json::from_slice(bytes)
            .map_err(|e| CodecError::from_json("malformed envelope", &e))?;

        if repr.version != ENVELOPE_VERSION {
            return Err(CodecError::Corrupt(format!(
                "unsupported envelope version {} (expected {})",
                repr.version, ENVELOPE_VERSION
            )));
        }

        let nonce_bytes = BASE64
            .decode(repr.nonce.as_bytes())
            .map_err(|_| CodecError::Corrupt("nonce is not valid base64".to_string()))?;
        let nonce: [u8; NONCE_LENGTH] = nonce_bytes.as_slice().try_into().map_err(|_| {
            CodecError::Corrupt(format!(
                "nonce must be {} bytes, got {}",
                NONCE_LENGTH,
                nonce_bytes.len()
            ))
        })?;

        let ciphertext = BASE64
            .decode(repr.ciphertext.as_bytes())
            .map_err(|_| CodecError::Corrupt("ciphertext is not valid base64".to_string()))?;

        Ok(Self {
            version: repr.version,
            nonce,
            ciphertext,
        })
    }
}

fn envelope_aad(version: u32) -> Vec<u8> {
    format!("provider_keystore:v{}", version).into_bytes()
}

/// Encode, seal and wrap a mapping into file bytes.
pub fn seal_mapping(crypto: &SecretsCrypto, mapping: &CredentialMapping) -> Result<Vec<u8>, StoreError> {
    let plaintext = Zeroizing::new(encode(mapping)?);
    let sealed = crypto.seal(&plaintext, &envelope_aad(ENVELOPE_VERSION))?;
    let envelope = Envelope {
        version: ENVELOPE_VERSION,
        nonce: sealed.nonce,
        ciphertext: sealed.ciphertext,
    };
    Ok(envelope.to_bytes()?)
}

/// Unwrap, open and decode file bytes into a mapping.
pub fn open_mapping(crypto: &SecretsCrypto, bytes: &[u8]) -> Result<CredentialMapping, StoreError> {
    let envelope = Envelope::from_bytes(bytes)?;
    let plaintext = Zeroizing::new(crypto.open(
        &envelope.nonce,
        &envelope.ciphertext,
        &envelope_aad(envelope.version),
    )?);
    Ok(decode(&plaintext)?)
}
