//! Authentication middleware for Axum

use std::sync::Arc;

use axum::{
    body::Body,
    extract::State,
    http::{header, Request, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;

use crate::application::ports::TokenRevocationStore;
use crate::infrastructure::crypto::jwt::{verify_token, Claims, JwtConfig};

/// Authentication state shared by every protected route.
#[derive(Clone)]
pub struct AuthState {
    pub jwt_config: JwtConfig,
    pub revocation: Arc<dyn TokenRevocationStore>,
}

/// Authenticated caller, inserted as a request extension.
#[derive(Clone, Debug)]
pub struct AuthenticatedUser {
    pub user_id: String,
    pub email: String,
    /// The presented bearer token, kept so logout can revoke it.
    pub token: String,
    /// Token expiry (Unix seconds), forwarded to the revocation store.
    pub exp: i64,
}

impl AuthenticatedUser {
    fn from_claims(claims: Claims, token: &str) -> Self {
        Self {
            user_id: claims.sub,
            email: claims.email,
            token: token.to_string(),
            exp: claims.exp,
        }
    }
}

fn extract_token(auth_header: &str) -> Option<&str> {
    auth_header.strip_prefix("Bearer ")
}

/// Bearer-token authentication middleware. Rejects missing, malformed,
/// expired and revoked tokens with 401.
pub async fn auth_middleware(
    State(auth_state): State<AuthState>,
    mut request: Request<Body>,
    next: Next,
) -> Response {
    let auth_header = request
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .map(String::from);
    let Some(auth_header) = auth_header else {
        return auth_error_response("MISSING_TOKEN");
    };
    let Some(token) = extract_token(&auth_header) else {
        return auth_error_response("INVALID_TOKEN");
    };

    match verify_token(token, &auth_state.jwt_config) {
        Ok(claims) => {
            if claims.is_expired() {
                return auth_error_response("TOKEN_EXPIRED");
            }
            if auth_state.revocation.is_revoked(token) {
                return auth_error_response("TOKEN_REVOKED");
            }
            let user = AuthenticatedUser::from_claims(claims, token);
            request.extensions_mut().insert(user);
            next.run(request).await
        }
        Err(_) => auth_error_response("INVALID_TOKEN"),
    }
}

fn auth_error_response(code: &str) -> Response {
    let body = Json(json!({ "error": code }));
    (StatusCode::UNAUTHORIZED, body).into_response()
}

// ── Tests ──────────────────────────────────────────────────────
