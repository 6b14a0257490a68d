//! Shared HTTP plumbing: error envelope and validated JSON extractor

pub mod validated_json;

pub use validated_json::ValidatedJson;

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use tracing::{error, warn};

use crate::domain::DomainError;

/// Handler result: success bodies are plain JSON, failures render as
/// `{"error": "<code>"}` with the taxonomy status.
pub type ApiResult<T> = Result<T, ApiError>;

/// Wire-level error: HTTP status plus the stable code string.
#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub message: String,
}

impl ApiError {
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, message)
    }
}

impl From<DomainError> for ApiError {
    fn from(e: DomainError) -> Self {
        let status = match &e {
            DomainError::Validation(_) | DomainError::Precondition(_) => StatusCode::BAD_REQUEST,
            DomainError::Unauthenticated(_) => StatusCode::UNAUTHORIZED,
            DomainError::Forbidden(_) => StatusCode::FORBIDDEN,
            DomainError::NotFound { .. } => StatusCode::NOT_FOUND,
            DomainError::Conflict(_) => StatusCode::CONFLICT,
            DomainError::RateLimited(_) => StatusCode::TOO_MANY_REQUESTS,
            DomainError::Dependency {
                provider,
                upstream_status,
                ..
            } => {
                warn!(
                    "upstream dependency {} failed (status {:?})",
                    provider, upstream_status
                );
                StatusCode::BAD_GATEWAY
            }
            DomainError::Unavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            DomainError::Internal(detail) => {
                // Details stay server-side.
                error!("internal error: {}", detail);
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };
        Self {
            status,
            message: e.code(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = Json(json!({ "error": self.message }));
        (self.status, body).into_response()
    }
}

// ── Tests ──────────────────────────────────────────────────────
