//! # provider_keystore
//!
//! Encrypted, admin-gated store for third-party provider credentials.
//!
//! This library provides:
//! - An AES-256-GCM sealed credential file with atomic, serialized writes
//! - An HTTP admin API for creating, listing and deleting provider secrets
//! - A read-only [`SecretSource`] for backend code that calls providers
//!
//! ## Request Flow
//! 1. Admin request arrives with `Authorization: Bearer <ADMIN_TOKEN>`
//! 2. Body is validated
//! 3. `KeyStore` applies the change to a copy, seals it and renames it into place
//! 4. The committed mapping becomes visible to readers
//!
//! ## Modules
//! - `secrets`: cipher, on-disk codec and the credential store
//! - `api`: axum router, auth middleware and admin handlers
//! - `config`: environment configuration

pub mod api;
pub mod config;
pub mod secrets;

pub use config::Config;
pub use secrets::{KeyStore, SecretSource};
