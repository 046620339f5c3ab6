//! Authenticated encryption for the key store file.
//!
//! Uses AES-256-GCM with a static key provisioned through `SECRETBOX_KEY`.
//! Every seal draws a fresh 96-bit nonce from the thread-local CSPRNG.

use aes_gcm::{
    aead::{Aead, KeyInit, Payload},
    Aes256Gcm, Key, Nonce,
};
use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use rand::RngCore;
use std::fmt;
use thiserror::Error;
use zeroize::Zeroizing;

/// Key length in bytes (256 bits for AES-256)
pub const KEY_LENGTH: usize = 32;

/// Nonce length in bytes (96 bits for AES-GCM)
pub const NONCE_LENGTH: usize = 12;

#[derive(Debug, Error)]
pub enum CryptoError {
    #[error("Key must be 32 bytes, got {0} bytes")]
    InvalidKeyLength(usize),

    #[error("Key is not valid base64")]
    InvalidKeyEncoding,

    #[error("Encryption failed")]
    Encryption,

    /// Tag mismatch, wrong key, truncated input and bad nonce all land here.
    #[error("Decryption failed: invalid key or corrupted data")]
    Decryption,
}

/// 32 bytes of key material, wiped on drop.
#[derive(Clone)]
pub struct SecretboxKey(Zeroizing<[u8; KEY_LENGTH]>);

impl SecretboxKey {
    pub fn from_slice(bytes: &[u8]) -> Result<Self, CryptoError> {
        if bytes.len() != KEY_LENGTH {
            return Err(CryptoError::InvalidKeyLength(bytes.len()));
        }
        let mut key = Zeroizing::new([0u8; KEY_LENGTH]);
        key.copy_from_slice(bytes);
        Ok(Self(key))
    }

    /// Decode a base64 key as found in the environment.
    pub fn from_base64(value: &str) -> Result<Self, CryptoError> {
        let bytes = Zeroizing::new(
            BASE64
                .decode(value.trim())
                .map_err(|_| CryptoError::InvalidKeyEncoding)?,
        );
        Self::from_slice(&bytes)
    }

    fn as_bytes(&self) -> &[u8; KEY_LENGTH] {
        &self.0
    }
}

impl fmt::Debug for SecretboxKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("SecretboxKey(<redacted>)")
    }
}

/// Generate a new random encryption key.
pub fn generate_key() -> SecretboxKey {
    let mut key = Zeroizing::new([0u8; KEY_LENGTH]);
    rand::thread_rng().fill_bytes(&mut key[..]);
    SecretboxKey(key)
}

/// Output of a single seal: the nonce it used and the tagged ciphertext.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SealedPayload {
    pub nonce: [u8; NONCE_LENGTH],
    pub ciphertext: Vec<u8>,
}

/// Cipher bound to the configured key.
#[derive(Clone)]
pub struct SecretsCrypto {
    cipher: Aes256Gcm,
}

impl SecretsCrypto {
    pub fn new(key: &SecretboxKey) -> Self {
        Self {
            cipher: Aes256Gcm::new(Key::<Aes256Gcm>::from_slice(key.as_bytes())),
        }
    }

    pub fn from_slice(bytes: &[u8]) -> Result<Self, CryptoError> {
        SecretboxKey::from_slice(bytes).map(|key| Self::new(&key))
    }

    /// Encrypt `plaintext`, authenticating `aad` alongside it.
    pub fn seal(&self, plaintext: &[u8], aad: &[u8]) -> Result<SealedPayload, CryptoError> {
        let mut nonce = [0u8; NONCE_LENGTH];
        rand::thread_rng().fill_bytes(&mut nonce);

        let ciphertext = self
            .cipher
            .encrypt(
                Nonce::from_slice(&nonce),
                Payload {
                    msg: plaintext,
                    aad,
                },
            )
            .map_err(|_| CryptoError::Encryption)?;

        Ok(SealedPayload { nonce, ciphertext })
    }

    /// Verify and decrypt. Never returns unauthenticated plaintext.
    pub fn open(&self, nonce: &[u8], ciphertext: &[u8], aad: &[u8]) -> Result<Vec<u8>, CryptoError> {
        if nonce.len() != NONCE_LENGTH {
            return Err(CryptoError::Decryption);
        }

        self.cipher
            .decrypt(
                Nonce::from_slice(nonce),
                Payload {
                    msg: ciphertext,
                    aad,
                },
            )
            .map_err(|_| CryptoError::Decryption)
    }
}

impl fmt::Debug for SecretsCrypto {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("SecretsCrypto { .. }")
    }
}
