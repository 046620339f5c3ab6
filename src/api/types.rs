//! API request and response types.
//!
//! Every response body is either `{status, data}` or `{status, message}`.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};

use crate::secrets::StoreError;

/// Successful response envelope.
#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
    pub status: u16,
    pub data: T,
}

impl<T: Serialize> ApiResponse<T> {
    pub fn ok(data: T) -> Self {
        Self {
            status: StatusCode::OK.as_u16(),
            data,
        }
    }
}

impl<T: Serialize> IntoResponse for ApiResponse<T> {
    fn into_response(self) -> Response {
        let status = StatusCode::from_u16(self.status).unwrap_or(StatusCode::OK);
        (status, Json(self)).into_response()
    }
}

/// Error response envelope.
#[derive(Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct ErrorBody {
    pub status: u16,
    pub message: String,
}

/// Request-boundary errors, rendered as [`ErrorBody`].
#[derive(Debug)]
pub enum ApiError {
    /// Missing or wrong admin token. Both render identically.
    Unauthorized,
    /// Malformed request body.
    Validation(String),
    /// Anything else. Details go to the server log only.
    Internal,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::Unauthorized => (StatusCode::UNAUTHORIZED, "Unauthorized".to_string()),
            ApiError::Validation(message) => (StatusCode::BAD_REQUEST, message),
            ApiError::Internal => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Internal server error".to_string(),
            ),
        };
        (
            status,
            Json(ErrorBody {
                status: status.as_u16(),
                message,
            }),
        )
            .into_response()
    }
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::InvalidProvider => ApiError::Validation(err.to_string()),
            other => {
                tracing::error!("Key store operation failed: {}", other);
                ApiError::Internal
            }
        }
    }
}

/// Body of `POST /admin/keys`. Fields are optional so presence is validated by hand.
#[derive(Deserialize)]
pub struct SetKeyRequest {
    pub provider: Option<String>,
    pub secret: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct SetKeyResponse {
    pub provider: String,
}

#[derive(Debug, Serialize)]
pub struct ListKeysResponse {
    pub providers: Vec<String>,
}

#[derive(Debug, Serialize)]
pub struct DeleteKeyResponse {
    pub deleted: bool,
}

/// Health check response.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub providers: usize,
}
