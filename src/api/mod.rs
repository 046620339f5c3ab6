//! HTTP API for the provider key store.
//!
//! ## Endpoints
//!
//! - `GET /health` - Health check (public)
//! - `GET /admin/keys` - List stored provider names
//! - `POST /admin/keys` - Create or replace a provider secret
//! - `DELETE /admin/keys/{provider}` - Remove a provider secret
//!
//! All `/admin` routes require `Authorization: Bearer <ADMIN_TOKEN>`.

mod auth;
mod keys;
mod routes;
pub mod types;

pub use routes::{router, serve, AppState};
pub use types::*;
