//! JSON-or-multipart extractors for vehicle create/update
//!
//! `POST /vehicles` and `PUT /vehicles/:id` accept both a JSON body and a
//! `multipart/form-data` body carrying document photos. Multipart text
//! fields use the same camelCase names as the JSON shape; file fields are
//! `vehiclePhoto`, `soatPhoto` and `licensePhoto`.

use axum::extract::{FromRequest, Multipart, Request};
use axum::http::header::CONTENT_TYPE;
use axum::response::{IntoResponse, Response};
use chrono::{DateTime, Utc};

use crate::application::fleet::{
    NewVehicleInput, UpdateVehicleInput, UploadKind, UploadedFile,
};
use crate::interfaces::http::common::{ApiError, ValidatedJson};

use super::dto::{PickupPointRequest, UpdateVehicleRequest, VehiclePayload};

pub struct CreateVehicleBody(pub NewVehicleInput);

pub struct UpdateVehicleBody(pub UpdateVehicleInput);

fn is_multipart(req: &Request) -> bool {
    req.headers()
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(|ct| ct.starts_with("multipart/form-data"))
        .unwrap_or(false)
}

fn parse_datetime(field: &str, value: &str) -> Result<DateTime<Utc>, ApiError> {
    DateTime::parse_from_rfc3339(value.trim())
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|_| ApiError::bad_request(format!("invalid datetime in {}", field)))
}

fn parse_int(field: &str, value: &str) -> Result<i32, ApiError> {
    value
        .trim()
        .parse()
        .map_err(|_| ApiError::bad_request(format!("invalid integer in {}", field)))
}

fn upload_kind(field: &str) -> Option<UploadKind> {
    match field {
        "vehiclePhoto" => Some(UploadKind::VehiclePhoto),
        "soatPhoto" => Some(UploadKind::SoatPhoto),
        "licensePhoto" => Some(UploadKind::LicensePhoto),
        _ => None,
    }
}

async fn read_upload(
    kind: UploadKind,
    field: axum::extract::multipart::Field<'_>,
) -> Result<UploadedFile, ApiError> {
    let filename = field.file_name().unwrap_or("upload").to_string();
    let content_type = field
        .content_type()
        .unwrap_or("application/octet-stream")
        .to_string();
    let bytes = field
        .bytes()
        .await
        .map_err(|e| ApiError::bad_request(format!("upload read failed: {}", e)))?;
    Ok(UploadedFile {
        kind,
        filename,
        content_type,
        bytes: bytes.to_vec(),
    })
}

async fn field_text(field: axum::extract::multipart::Field<'_>) -> Result<String, ApiError> {
    field
        .text()
        .await
        .map_err(|e| ApiError::bad_request(format!("field read failed: {}", e)))
}

impl<S> FromRequest<S> for CreateVehicleBody
where
    S: Send + Sync,
{
    type Rejection = Response;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        if !is_multipart(&req) {
            let ValidatedJson(payload) = ValidatedJson::<VehiclePayload>::from_request(req, state)
                .await
                .map_err(IntoResponse::into_response)?;
            return Ok(Self(payload.into()));
        }

        let mut multipart = Multipart::from_request(req, state)
            .await
            .map_err(|e| ApiError::bad_request(format!("invalid multipart: {}", e)).into_response())?;

        let mut input = NewVehicleInput::default();
        while let Some(field) = multipart
            .next_field()
            .await
            .map_err(|e| ApiError::bad_request(format!("invalid multipart: {}", e)).into_response())?
        {
            let name = field.name().unwrap_or("").to_string();
            if let Some(kind) = upload_kind(&name) {
                input
                    .uploads
                    .push(read_upload(kind, field).await.map_err(IntoResponse::into_response)?);
                continue;
            }
            let value = field_text(field).await.map_err(IntoResponse::into_response)?;
            apply_create_field(&mut input, &name, &value).map_err(IntoResponse::into_response)?;
        }
        Ok(Self(input))
    }
}

fn apply_create_field(
    input: &mut NewVehicleInput,
    name: &str,
    value: &str,
) -> Result<(), ApiError> {
    match name {
        "plate" => input.plate = value.to_string(),
        "brand" => input.brand = value.to_string(),
        "model" => input.model = value.to_string(),
        "capacity" => input.capacity = parse_int(name, value)?,
        "year" => input.year = Some(parse_int(name, value)?),
        "color" => input.color = Some(value.to_string()),
        "soatExpiration" => input.soat_expiration = Some(parse_datetime(name, value)?),
        "licenseNumber" => input.license_number = value.to_string(),
        "licenseExpiration" => input.license_expiration = Some(parse_datetime(name, value)?),
        "vehiclePhotoUrl" => input.vehicle_photo_url = Some(value.to_string()),
        "soatPhotoUrl" => input.soat_photo_url = Some(value.to_string()),
        "licensePhotoUrl" => input.license_photo_url = Some(value.to_string()),
        // Unknown fields are ignored, like serde does for JSON bodies.
        _ => {}
    }
    Ok(())
}

impl<S> FromRequest<S> for UpdateVehicleBody
where
    S: Send + Sync,
{
    type Rejection = Response;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        if !is_multipart(&req) {
            let ValidatedJson(payload) =
                ValidatedJson::<UpdateVehicleRequest>::from_request(req, state)
                    .await
                    .map_err(IntoResponse::into_response)?;
            return Ok(Self(payload.into()));
        }

        let mut multipart = Multipart::from_request(req, state)
            .await
            .map_err(|e| ApiError::bad_request(format!("invalid multipart: {}", e)).into_response())?;

        let mut input = UpdateVehicleInput::default();
        while let Some(field) = multipart
            .next_field()
            .await
            .map_err(|e| ApiError::bad_request(format!("invalid multipart: {}", e)).into_response())?
        {
            let name = field.name().unwrap_or("").to_string();
            if let Some(kind) = upload_kind(&name) {
                input
                    .uploads
                    .push(read_upload(kind, field).await.map_err(IntoResponse::into_response)?);
                continue;
            }
            let value = field_text(field).await.map_err(IntoResponse::into_response)?;
            apply_update_field(&mut input, &name, &value).map_err(IntoResponse::into_response)?;
        }
        Ok(Self(input))
    }
}

fn apply_update_field(
    input: &mut UpdateVehicleInput,
    name: &str,
    value: &str,
) -> Result<(), ApiError> {
    match name {
        "plate" => input.plate = Some(value.to_string()),
        "brand" => input.brand = Some(value.to_string()),
        "model" => input.model = Some(value.to_string()),
        "capacity" => input.capacity = Some(parse_int(name, value)?),
        "year" => input.year = Some(parse_int(name, value)?),
        "color" => input.color = Some(value.to_string()),
        "soatExpiration" => input.soat_expiration = Some(parse_datetime(name, value)?),
        "licenseNumber" => input.license_number = Some(value.to_string()),
        "licenseExpiration" => input.license_expiration = Some(parse_datetime(name, value)?),
        "vehiclePhotoUrl" => input.vehicle_photo_url = Some(value.to_string()),
        "soatPhotoUrl" => input.soat_photo_url = Some(value.to_string()),
        "licensePhotoUrl" => input.license_photo_url = Some(value.to_string()),
        "pickupPoints" => {
            let points: Vec<PickupPointRequest> = serde_json::from_str(value)
                .map_err(|_| ApiError::bad_request("invalid pickupPoints JSON"))?;
            input.pickup_points = Some(points.into_iter().map(Into::into).collect());
        }
        _ => {}
    }
    Ok(())
}

// ── Tests ──────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn datetime_parsing_accepts_rfc3339() {
        let dt = parse_datetime("soatExpiration", "2027-06-01T00:00:00Z").unwrap();
        assert_eq!(dt.timezone(), Utc);
        assert!(parse_datetime("soatExpiration", "01/06/2027").is_err());
    }

    #[test]
    fn upload_kinds_match_field_names() {
        assert_eq!(upload_kind("soatPhoto"), Some(UploadKind::SoatPhoto));
        assert_eq!(upload_kind("licensePhoto"), Some(UploadKind::LicensePhoto));
        assert_eq!(upload_kind("vehiclePhoto"), Some(UploadKind::VehiclePhoto));
        assert_eq!(upload_kind("plate"), None);
    }

    #[test]
    fn create_fields_accumulate() {
        let mut input = NewVehicleInput::default();
        apply_create_field(&mut input, "plate", "abc123").unwrap();
        apply_create_field(&mut input, "capacity", "4").unwrap();
        apply_create_field(&mut input, "licenseNumber", "LIC-1").unwrap();
        assert_eq!(input.plate, "abc123");
        assert_eq!(input.capacity, 4);
        assert_eq!(input.license_number, "LIC-1");
    }

    #[test]
    fn update_pickup_points_parse_from_json_text() {
        let mut input = UpdateVehicleInput::default();
        apply_update_field(
            &mut input,
            "pickupPoints",
            r#"[{"name":"Portal Norte","lat":4.75,"lng":-74.04}]"#,
        )
        .unwrap();
        let points = input.pickup_points.unwrap();
        assert_eq!(points.len(), 1);
        assert_eq!(points[0].name, "Portal Norte");
    }
}
