//! Admin endpoints for provider credentials.
//!
//! Secrets go in, provider names come out. Nothing here ever serializes a
//! secret value.

use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, Path, State},
    routing::{delete, get},
    Json, Router,
};

use super::routes::AppState;
use super::types::{
    ApiError, ApiResponse, DeleteKeyResponse, ListKeysResponse, SetKeyRequest, SetKeyResponse,
};
use crate::secrets::is_valid_provider;

/// Create the admin key routes.
pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/", get(list_keys).post(set_key))
        .route("/:provider", delete(delete_key))
}

/// Store mutations run on their own task so a dropped connection cannot
/// cancel a write halfway through.
async fn run_detached<T, F>(fut: F) -> Result<T, ApiError>
where
    T: Send + 'static,
    F: std::future::Future<Output = Result<T, crate::secrets::StoreError>> + Send + 'static,
{
    match tokio::spawn(fut).await {
        Ok(result) => result.map_err(ApiError::from),
        Err(e) => {
            tracing::error!("Key store task failed: {}", e);
            Err(ApiError::Internal)
        }
    }
}

/// GET /admin/keys
/// List provider names (never secrets).
async fn list_keys(State(state): State<Arc<AppState>>) -> ApiResponse<ListKeysResponse> {
    ApiResponse::ok(ListKeysResponse {
        providers: state.keys.list().await,
    })
}

/// POST /admin/keys
/// Create or replace the secret for a provider.
async fn set_key(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<SetKeyRequest>, JsonRejection>,
) -> Result<ApiResponse<SetKeyResponse>, ApiError> {
    let Json(req) = payload.map_err(|rejection| {
        tracing::debug!("Rejected admin key body: status {}", rejection.status());
        ApiError::Validation("Request body must be a JSON object".to_string())
    })?;

    let provider = req
        .provider
        .filter(|p| is_valid_provider(p))
        .ok_or_else(|| ApiError::Validation("provider must be a non-empty string".to_string()))?;
    let secret = req
        .secret
        .filter(|s| !s.is_empty())
        .ok_or_else(|| ApiError::Validation("secret must be a non-empty string".to_string()))?;

    let keys = Arc::clone(&state.keys);
    let credential = run_detached(async move { keys.set(&provider, &secret).await }).await?;

    Ok(ApiResponse::ok(SetKeyResponse {
        provider: credential.provider,
    }))
}

/// DELETE /admin/keys/:provider
/// Remove a provider's secret. Unknown providers report `deleted: false`.
async fn delete_key(
    State(state): State<Arc<AppState>>,
    Path(provider): Path<String>,
) -> Result<ApiResponse<DeleteKeyResponse>, ApiError> {
    let keys = Arc::clone(&state.keys);
    let deleted = run_detached(async move { keys.delete(&provider).await }).await?;

    Ok(ApiResponse::ok(DeleteKeyResponse { deleted }))
}
