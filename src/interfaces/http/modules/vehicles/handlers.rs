//! Vehicle REST API handlers

use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Extension, Json,
};
use chrono::Utc;
use serde_json::{json, Value};

use super::dto::{PickupPointRequest, VehicleDto};
use super::payload::{CreateVehicleBody, UpdateVehicleBody};
use crate::application::fleet::FleetService;
use crate::interfaces::http::common::{ApiResult, ValidatedJson};
use crate::interfaces::http::middleware::AuthenticatedUser;

/// Vehicle handler state
#[derive(Clone)]
pub struct VehicleHandlerState {
    pub fleet: Arc<FleetService>,
}

/// `GET /vehicles` lists the caller fleet, decorated.
pub async fn list_vehicles(
    State(state): State<VehicleHandlerState>,
    Extension(user): Extension<AuthenticatedUser>,
) -> ApiResult<Json<Vec<VehicleDto>>> {
    let now = Utc::now();
    let vehicles = state.fleet.list_vehicles(&user.user_id).await?;
    Ok(Json(
        vehicles
            .into_iter()
            .map(|v| VehicleDto::from_vehicle(v, now))
            .collect(),
    ))
}

/// `POST /vehicles` (JSON or multipart).
pub async fn create_vehicle(
    State(state): State<VehicleHandlerState>,
    Extension(user): Extension<AuthenticatedUser>,
    CreateVehicleBody(input): CreateVehicleBody,
) -> ApiResult<(StatusCode, Json<VehicleDto>)> {
    let vehicle = state.fleet.create_vehicle(&user.user_id, input).await?;
    Ok((
        StatusCode::CREATED,
        Json(VehicleDto::from_vehicle(vehicle, Utc::now())),
    ))
}

/// `POST /vehicles/validate`: dry-run payload check, nothing persisted.
pub async fn validate_vehicle(
    State(state): State<VehicleHandlerState>,
    Extension(_user): Extension<AuthenticatedUser>,
    CreateVehicleBody(input): CreateVehicleBody,
) -> ApiResult<Json<Value>> {
    state.fleet.validate_new(&input, Utc::now())?;
    Ok(Json(json!({ "ok": true })))
}

/// `PUT /vehicles/:id`: partial update; material edits reset verification.
pub async fn update_vehicle(
    State(state): State<VehicleHandlerState>,
    Extension(user): Extension<AuthenticatedUser>,
    Path(vehicle_id): Path<String>,
    UpdateVehicleBody(input): UpdateVehicleBody,
) -> ApiResult<Json<VehicleDto>> {
    let vehicle = state
        .fleet
        .update_vehicle(&user.user_id, &vehicle_id, input)
        .await?;
    Ok(Json(VehicleDto::from_vehicle(vehicle, Utc::now())))
}

/// `DELETE /vehicles/:id`.
pub async fn delete_vehicle(
    State(state): State<VehicleHandlerState>,
    Extension(user): Extension<AuthenticatedUser>,
    Path(vehicle_id): Path<String>,
) -> ApiResult<Json<Value>> {
    state.fleet.delete_vehicle(&user.user_id, &vehicle_id).await?;
    Ok(Json(json!({ "ok": true })))
}

/// `PUT /vehicles/:id/activate`.
pub async fn activate_vehicle(
    State(state): State<VehicleHandlerState>,
    Extension(user): Extension<AuthenticatedUser>,
    Path(vehicle_id): Path<String>,
) -> ApiResult<Json<VehicleDto>> {
    let vehicle = state
        .fleet
        .activate_vehicle(&user.user_id, &vehicle_id)
        .await?;
    Ok(Json(VehicleDto::from_vehicle(vehicle, Utc::now())))
}

/// `POST /vehicles/:id/request-review`.
pub async fn request_review(
    State(state): State<VehicleHandlerState>,
    Extension(user): Extension<AuthenticatedUser>,
    Path(vehicle_id): Path<String>,
) -> ApiResult<Json<VehicleDto>> {
    let vehicle = state
        .fleet
        .request_review(&user.user_id, &vehicle_id)
        .await?;
    Ok(Json(VehicleDto::from_vehicle(vehicle, Utc::now())))
}

// ── Pickup points ──────────────────────────────────────────────

/// `POST /vehicles/:id/pickup-points`.
pub async fn add_pickup_point(
    State(state): State<VehicleHandlerState>,
    Extension(user): Extension<AuthenticatedUser>,
    Path(vehicle_id): Path<String>,
    ValidatedJson(body): ValidatedJson<PickupPointRequest>,
) -> ApiResult<(StatusCode, Json<VehicleDto>)> {
    let vehicle = state
        .fleet
        .add_pickup_point(&user.user_id, &vehicle_id, body.into())
        .await?;
    Ok((
        StatusCode::CREATED,
        Json(VehicleDto::from_vehicle(vehicle, Utc::now())),
    ))
}

/// `PUT /vehicles/:id/pickup-points/:pointId`.
pub async fn update_pickup_point(
    State(state): State<VehicleHandlerState>,
    Extension(user): Extension<AuthenticatedUser>,
    Path((vehicle_id, point_id)): Path<(String, String)>,
    ValidatedJson(body): ValidatedJson<PickupPointRequest>,
) -> ApiResult<Json<VehicleDto>> {
    let vehicle = state
        .fleet
        .update_pickup_point(&user.user_id, &vehicle_id, &point_id, body.into())
        .await?;
    Ok(Json(VehicleDto::from_vehicle(vehicle, Utc::now())))
}

/// `DELETE /vehicles/:id/pickup-points/:pointId`.
pub async fn delete_pickup_point(
    State(state): State<VehicleHandlerState>,
    Extension(user): Extension<AuthenticatedUser>,
    Path((vehicle_id, point_id)): Path<(String, String)>,
) -> ApiResult<Json<VehicleDto>> {
    let vehicle = state
        .fleet
        .delete_pickup_point(&user.user_id, &vehicle_id, &point_id)
        .await?;
    Ok(Json(VehicleDto::from_vehicle(vehicle, Utc::now())))
}
