//! Bearer-token gate for the admin API (single shared token).
//!
//! - Every `/admin` route requires `Authorization: Bearer <ADMIN_TOKEN>`
//! - Missing, malformed and wrong tokens all get the same 401 body

use std::sync::Arc;

use axum::{
    body::Body,
    extract::State,
    http::{header::AUTHORIZATION, Request},
    middleware::Next,
    response::{IntoResponse, Response},
};

use super::routes::AppState;
use super::types::ApiError;

fn constant_time_eq(a: &str, b: &str) -> bool {
    let a_bytes = a.as_bytes();
    let b_bytes = b.as_bytes();
    if a_bytes.len() != b_bytes.len() {
        return false;
    }
    let mut diff: u8 = 0;
    for i in 0..a_bytes.len() {
        diff |= a_bytes[i] ^ b_bytes[i];
    }
    diff == 0
}

fn bearer_token(header: &str) -> Option<&str> {
    header
        .strip_prefix("Bearer ")
        .or_else(|| header.strip_prefix("bearer "))
        .map(str::trim)
        .filter(|t| !t.is_empty())
}

/// Check a presented token against the configured admin token.
pub fn is_admin_token(token: &str, expected: &str) -> bool {
    !expected.is_empty() && constant_time_eq(token, expected)
}

pub async fn require_admin(
    State(state): State<Arc<AppState>>,
    req: Request<Body>,
    next: Next,
) -> Response {
    let authorized = req
        .headers()
        .get(AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .and_then(bearer_token)
        .map(|token| is_admin_token(token, &state.config.admin_token))
        .unwrap_or(false);

    if !authorized {
        tracing::warn!(
            "Rejected unauthenticated {} {}",
            req.method(),
            req.uri().path()
        );
        return ApiError::Unauthorized.into_response();
    }

    next.run(req).await
}
