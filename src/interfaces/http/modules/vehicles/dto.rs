//! Vehicle DTOs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::application::fleet::{NewPickupPointInput, NewVehicleInput, UpdateVehicleInput};
use crate::domain::vehicle::{Vehicle, VehicleMeta};

/// Vehicle payload accepted by registration and `POST /vehicles` (JSON
/// shape; the multipart shape is assembled field-by-field).
#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct VehiclePayload {
    #[validate(length(min = 1))]
    pub plate: String,
    #[validate(length(min = 1))]
    pub brand: String,
    #[validate(length(min = 1))]
    pub model: String,
    pub capacity: i32,
    pub year: Option<i32>,
    pub color: Option<String>,
    pub soat_expiration: Option<DateTime<Utc>>,
    pub license_number: Option<String>,
    pub license_expiration: Option<DateTime<Utc>>,
    pub vehicle_photo_url: Option<String>,
    pub soat_photo_url: Option<String>,
    pub license_photo_url: Option<String>,
}

impl From<VehiclePayload> for NewVehicleInput {
    fn from(p: VehiclePayload) -> Self {
        NewVehicleInput {
            plate: p.plate,
            brand: p.brand,
            model: p.model,
            capacity: p.capacity,
            year: p.year,
            color: p.color,
            soat_expiration: p.soat_expiration,
            license_number: p.license_number.unwrap_or_default(),
            license_expiration: p.license_expiration,
            vehicle_photo_url: p.vehicle_photo_url,
            soat_photo_url: p.soat_photo_url,
            license_photo_url: p.license_photo_url,
            uploads: Vec::new(),
        }
    }
}

/// JSON shape of `PUT /vehicles/:id`.
#[derive(Debug, Clone, Default, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdateVehicleRequest {
    pub plate: Option<String>,
    pub brand: Option<String>,
    pub model: Option<String>,
    pub capacity: Option<i32>,
    pub year: Option<i32>,
    pub color: Option<String>,
    pub soat_expiration: Option<DateTime<Utc>>,
    pub license_number: Option<String>,
    pub license_expiration: Option<DateTime<Utc>>,
    pub vehicle_photo_url: Option<String>,
    pub soat_photo_url: Option<String>,
    pub license_photo_url: Option<String>,
    pub pickup_points: Option<Vec<PickupPointRequest>>,
}

impl From<UpdateVehicleRequest> for UpdateVehicleInput {
    fn from(r: UpdateVehicleRequest) -> Self {
        UpdateVehicleInput {
            plate: r.plate,
            brand: r.brand,
            model: r.model,
            capacity: r.capacity,
            year: r.year,
            color: r.color,
            soat_expiration: r.soat_expiration,
            license_number: r.license_number,
            license_expiration: r.license_expiration,
            vehicle_photo_url: r.vehicle_photo_url,
            soat_photo_url: r.soat_photo_url,
            license_photo_url: r.license_photo_url,
            pickup_points: r
                .pickup_points
                .map(|points| points.into_iter().map(Into::into).collect()),
            uploads: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct PickupPointRequest {
    #[validate(length(min = 1, max = 120))]
    pub name: String,
    pub description: Option<String>,
    pub lat: f64,
    pub lng: f64,
}

impl From<PickupPointRequest> for NewPickupPointInput {
    fn from(r: PickupPointRequest) -> Self {
        NewPickupPointInput {
            name: r.name,
            description: r.description,
            lat: r.lat,
            lng: r.lng,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PickupPointDto {
    pub id: String,
    pub name: String,
    pub description: Option<String>,
    pub lat: f64,
    pub lng: f64,
}

/// Computed decoration block on every vehicle read.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VehicleMetaDto {
    pub soat_status: String,
    pub license_status: String,
    pub warnings: Vec<String>,
    pub documents_ok: bool,
    pub can_request_review: bool,
    pub can_activate: bool,
    pub status_label: String,
    pub severity: String,
}

impl From<VehicleMeta> for VehicleMetaDto {
    fn from(m: VehicleMeta) -> Self {
        Self {
            soat_status: m.soat.as_str().to_string(),
            license_status: m.license.as_str().to_string(),
            warnings: m.warnings,
            documents_ok: m.documents_ok,
            can_request_review: m.can_request_review,
            can_activate: m.can_activate,
            status_label: m.status_label.to_string(),
            severity: m.severity.to_string(),
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VehicleDto {
    pub id: String,
    pub plate: String,
    pub brand: String,
    pub model: String,
    pub capacity: i32,
    pub year: Option<i32>,
    pub color: Option<String>,
    pub vehicle_photo_url: Option<String>,
    pub soat_photo_url: Option<String>,
    pub soat_expiration: DateTime<Utc>,
    pub license_number: String,
    pub license_expiration: DateTime<Utc>,
    pub license_photo_url: Option<String>,
    pub status: String,
    pub status_updated_at: DateTime<Utc>,
    pub requested_review_at: Option<DateTime<Utc>>,
    pub reviewed_at: Option<DateTime<Utc>>,
    pub verification_notes: Option<String>,
    pub pickup_points: Vec<PickupPointDto>,
    pub meta: VehicleMetaDto,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl VehicleDto {
    /// Decorate with `meta` computed at `now`.
    pub fn from_vehicle(v: Vehicle, now: DateTime<Utc>) -> Self {
        let meta = v.meta(now).into();
        Self {
            id: v.id,
            plate: v.plate,
            brand: v.brand,
            model: v.model,
            capacity: v.capacity,
            year: v.year,
            color: v.color,
            vehicle_photo_url: v.vehicle_photo_url,
            soat_photo_url: v.soat_photo_url,
            soat_expiration: v.soat_expiration,
            license_number: v.license_number,
            license_expiration: v.license_expiration,
            license_photo_url: v.license_photo_url,
            status: v.status.as_str().to_string(),
            status_updated_at: v.status_updated_at,
            requested_review_at: v.requested_review_at,
            reviewed_at: v.reviewed_at,
            verification_notes: v.verification_notes,
            pickup_points: v
                .pickup_points
                .into_iter()
                .map(|p| PickupPointDto {
                    id: p.id,
                    name: p.name,
                    description: p.description,
                    lat: p.lat,
                    lng: p.lng,
                })
                .collect(),
            meta,
            created_at: v.created_at,
            updated_at: v.updated_at,
        }
    }
}
