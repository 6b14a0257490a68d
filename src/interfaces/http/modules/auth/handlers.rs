//! Authentication API handlers

use std::sync::Arc;

use axum::{extract::State, http::StatusCode, Extension, Json};
use serde_json::{json, Value};

use super::dto::{
    ForgotPasswordRequest, LoginRequest, LoginResponse, RegisterRequest, ResetPasswordRequest,
    SwitchRoleRequest, UpdateProfileRequest, UserDto,
};
use crate::application::identity::IdentityService;
use crate::interfaces::http::common::{ApiResult, ValidatedJson};
use crate::interfaces::http::middleware::AuthenticatedUser;

/// Auth state
#[derive(Clone)]
pub struct AuthHandlerState {
    pub identity: Arc<IdentityService>,
}

/// `POST /auth/register`.
pub async fn register(
    State(state): State<AuthHandlerState>,
    ValidatedJson(request): ValidatedJson<RegisterRequest>,
) -> ApiResult<(StatusCode, Json<UserDto>)> {
    let user = state.identity.register(request.into()).await?;
    Ok((StatusCode::CREATED, Json(user.into())))
}

/// `POST /auth/login`.
pub async fn login(
    State(state): State<AuthHandlerState>,
    ValidatedJson(request): ValidatedJson<LoginRequest>,
) -> ApiResult<Json<LoginResponse>> {
    let session = state
        .identity
        .login(&request.email, &request.password)
        .await?;
    Ok(Json(LoginResponse {
        token: session.token,
        token_type: "Bearer".to_string(),
        expires_in: session.expires_in_seconds,
        user: session.user.into(),
    }))
}

/// `GET /auth/me`.
pub async fn get_current_user(
    State(state): State<AuthHandlerState>,
    Extension(user): Extension<AuthenticatedUser>,
) -> ApiResult<Json<UserDto>> {
    let user = state.identity.current_user(&user.user_id).await?;
    Ok(Json(user.into()))
}

/// `PUT /auth/me`.
pub async fn update_profile(
    State(state): State<AuthHandlerState>,
    Extension(user): Extension<AuthenticatedUser>,
    ValidatedJson(request): ValidatedJson<UpdateProfileRequest>,
) -> ApiResult<Json<UserDto>> {
    let user = state
        .identity
        .update_profile(&user.user_id, request.into())
        .await?;
    Ok(Json(user.into()))
}

/// `POST /auth/logout`: revokes the presented token server-side.
pub async fn logout(
    State(state): State<AuthHandlerState>,
    Extension(user): Extension<AuthenticatedUser>,
) -> Json<Value> {
    state.identity.logout(&user.token, user.exp);
    Json(json!({ "ok": true }))
}

/// `PUT /auth/role`.
pub async fn switch_role(
    State(state): State<AuthHandlerState>,
    Extension(user): Extension<AuthenticatedUser>,
    ValidatedJson(request): ValidatedJson<SwitchRoleRequest>,
) -> ApiResult<Json<UserDto>> {
    let user = state
        .identity
        .switch_role(&user.user_id, &request.role)
        .await?;
    Ok(Json(user.into()))
}

/// `POST /auth/forgot-password` answers 200 regardless of account existence.
pub async fn forgot_password(
    State(state): State<AuthHandlerState>,
    ValidatedJson(request): ValidatedJson<ForgotPasswordRequest>,
) -> ApiResult<Json<Value>> {
    state.identity.forgot_password(&request.email).await?;
    Ok(Json(json!({ "ok": true })))
}

/// `POST /auth/reset-password`.
pub async fn reset_password(
    State(state): State<AuthHandlerState>,
    ValidatedJson(request): ValidatedJson<ResetPasswordRequest>,
) -> ApiResult<Json<Value>> {
    state
        .identity
        .reset_password(&request.token, &request.new_password)
        .await?;
    Ok(Json(json!({ "ok": true })))
}
