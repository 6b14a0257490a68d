//! Authentication DTOs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::application::identity::{RegisterInput, UpdateProfileInput};
use crate::domain::user::User;
use crate::interfaces::http::modules::vehicles::dto::VehiclePayload;

fn default_role() -> String {
    "passenger".to_string()
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct RegisterRequest {
    #[validate(email)]
    pub email: String,
    #[validate(length(min = 1))]
    pub password: String,
    #[validate(length(min = 1, max = 80))]
    pub first_name: String,
    #[validate(length(min = 1, max = 80))]
    pub last_name: String,
    #[validate(length(min = 1, max = 40))]
    pub university_id: String,
    #[validate(length(min = 7, max = 20))]
    pub phone: String,
    pub photo_url: Option<String>,
    #[serde(default = "default_role")]
    pub role: String,
    /// Required when role is `driver`.
    pub vehicle: Option<VehiclePayload>,
}

impl From<RegisterRequest> for RegisterInput {
    fn from(r: RegisterRequest) -> Self {
        RegisterInput {
            email: r.email,
            password: r.password,
            first_name: r.first_name,
            last_name: r.last_name,
            university_id: r.university_id,
            phone: r.phone,
            photo_url: r.photo_url,
            role: r.role,
            vehicle: r.vehicle.map(Into::into),
        }
    }
}

#[derive(Debug, Deserialize, Validate)]
pub struct LoginRequest {
    #[validate(email)]
    pub email: String,
    #[validate(length(min = 1))]
    pub password: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginResponse {
    pub token: String,
    pub token_type: String,
    pub expires_in: i64,
    pub user: UserDto,
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdateProfileRequest {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub phone: Option<String>,
    pub photo_url: Option<String>,
    pub emergency_contact: Option<String>,
    pub preferred_payment_method: Option<String>,
}

impl From<UpdateProfileRequest> for UpdateProfileInput {
    fn from(r: UpdateProfileRequest) -> Self {
        UpdateProfileInput {
            first_name: r.first_name,
            last_name: r.last_name,
            phone: r.phone,
            photo_url: r.photo_url,
            emergency_contact: r.emergency_contact,
            preferred_payment_method: r.preferred_payment_method,
        }
    }
}

#[derive(Debug, Deserialize, Validate)]
pub struct SwitchRoleRequest {
    #[validate(length(min = 1))]
    pub role: String,
}

#[derive(Debug, Deserialize, Validate)]
pub struct ForgotPasswordRequest {
    #[validate(email)]
    pub email: String,
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct ResetPasswordRequest {
    #[validate(length(min = 1))]
    #[serde(alias = "rawToken")]
    pub token: String,
    #[validate(length(min = 1))]
    pub new_password: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserDto {
    pub id: String,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub university_id: String,
    pub phone: String,
    pub photo_url: Option<String>,
    pub roles: Vec<String>,
    pub active_role: String,
    pub active_vehicle: Option<String>,
    pub emergency_contact: Option<String>,
    pub preferred_payment_method: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<User> for UserDto {
    fn from(u: User) -> Self {
        Self {
            id: u.id,
            email: u.email,
            first_name: u.first_name,
            last_name: u.last_name,
            university_id: u.university_id,
            phone: u.phone,
            photo_url: u.photo_url,
            roles: u.roles.iter().map(|r| r.as_str().to_string()).collect(),
            active_role: u.active_role.as_str().to_string(),
            active_vehicle: u.active_vehicle_id,
            emergency_contact: u.emergency_contact,
            preferred_payment_method: u.preferred_payment_method.as_str().to_string(),
            created_at: u.created_at,
            updated_at: u.updated_at,
        }
    }
}
