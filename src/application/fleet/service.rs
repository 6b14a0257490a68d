//! Vehicle lifecycle use-cases

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::warn;
use uuid::Uuid;

use crate::application::ports::BlobStore;
use crate::domain::vehicle::{
    normalize_plate, plate_is_valid, PickupPoint, Vehicle, VehicleStatus,
};
use crate::domain::user::Role;
use crate::domain::{DomainError, DomainResult, RepositoryProvider};

/// MIME types accepted for document uploads.
pub const ALLOWED_UPLOAD_TYPES: &[&str] = &[
    "application/pdf",
    "image/jpeg",
    "image/png",
    "image/webp",
    "image/heic",
    "image/heif",
];

/// Configured vehicle bounds and upload cap.
#[derive(Debug, Clone)]
pub struct VehicleLimits {
    pub min_capacity: i32,
    pub max_capacity: i32,
    pub max_upload_bytes: usize,
}

impl Default for VehicleLimits {
    fn default() -> Self {
        Self {
            min_capacity: 1,
            max_capacity: 8,
            max_upload_bytes: 5 * 1024 * 1024,
        }
    }
}

/// Which document an uploaded file belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UploadKind {
    VehiclePhoto,
    SoatPhoto,
    LicensePhoto,
}

/// One multipart file as received by the handler.
#[derive(Debug, Clone)]
pub struct UploadedFile {
    pub kind: UploadKind,
    pub filename: String,
    pub content_type: String,
    pub bytes: Vec<u8>,
}

/// Payload of vehicle creation (registration and `POST /vehicles` share it).
#[derive(Debug, Clone, Default)]
pub struct NewVehicleInput {
    pub plate: String,
    pub brand: String,
    pub model: String,
    pub capacity: i32,
    pub year: Option<i32>,
    pub color: Option<String>,
    pub soat_expiration: Option<DateTime<Utc>>,
    pub license_number: String,
    pub license_expiration: Option<DateTime<Utc>>,
    pub vehicle_photo_url: Option<String>,
    pub soat_photo_url: Option<String>,
    pub license_photo_url: Option<String>,
    pub uploads: Vec<UploadedFile>,
}

/// Field-wise partial update of `PUT /vehicles/:id`.
#[derive(Debug, Clone, Default)]
pub struct UpdateVehicleInput {
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
    pub pickup_points: Option<Vec<NewPickupPointInput>>,
    pub uploads: Vec<UploadedFile>,
}

#[derive(Debug, Clone)]
pub struct NewPickupPointInput {
    pub name: String,
    pub description: Option<String>,
    pub lat: f64,
    pub lng: f64,
}

pub struct FleetService {
    repos: Arc<dyn RepositoryProvider>,
    blobs: Arc<dyn BlobStore>,
    limits: VehicleLimits,
}

impl FleetService {
    pub fn new(
        repos: Arc<dyn RepositoryProvider>,
        blobs: Arc<dyn BlobStore>,
        limits: VehicleLimits,
    ) -> Self {
        Self {
            repos,
            blobs,
            limits,
        }
    }

    pub fn limits(&self) -> &VehicleLimits {
        &self.limits
    }

    /// Shape-check a creation payload without persisting anything.
    /// Used by `POST /vehicles/validate` and by registration pre-checks.
    pub fn validate_new(&self, input: &NewVehicleInput, now: DateTime<Utc>) -> DomainResult<()> {
        self.check_payload(input, now).map(|_| ())
    }

    fn check_payload(
        &self,
        input: &NewVehicleInput,
        now: DateTime<Utc>,
    ) -> DomainResult<(String, DateTime<Utc>, DateTime<Utc>)> {
        let plate = normalize_plate(&input.plate);
        if !plate_is_valid(&plate) {
            return Err(DomainError::validation("INVALID_PLATE"));
        }
        if input.brand.trim().is_empty() || input.model.trim().is_empty() {
            return Err(DomainError::validation("INVALID_VEHICLE_DATA"));
        }
        if input.capacity < self.limits.min_capacity || input.capacity > self.limits.max_capacity {
            return Err(DomainError::validation("INVALID_CAPACITY"));
        }
        let soat_expiration = input
            .soat_expiration
            .ok_or_else(|| DomainError::validation("MISSING_SOAT_EXPIRATION"))?;
        let license_expiration = input
            .license_expiration
            .ok_or_else(|| DomainError::validation("MISSING_LICENSE_EXPIRATION"))?;
        if input.license_number.trim().is_empty() {
            return Err(DomainError::validation("MISSING_LICENSE_NUMBER"));
        }
        if soat_expiration < now || license_expiration < now {
            return Err(DomainError::precondition("EXPIRED_DOCUMENT"));
        }
        let has_soat_photo = input.soat_photo_url.is_some()
            || input.uploads.iter().any(|u| u.kind == UploadKind::SoatPhoto);
        let has_license_photo = input.license_photo_url.is_some()
            || input
                .uploads
                .iter()
                .any(|u| u.kind == UploadKind::LicensePhoto);
        if !has_soat_photo || !has_license_photo {
            return Err(DomainError::validation("MISSING_DOCUMENT_PHOTO"));
        }
        self.check_uploads(&input.uploads)?;
        Ok((plate, soat_expiration, license_expiration))
    }

    fn check_uploads(&self, uploads: &[UploadedFile]) -> DomainResult<()> {
        for upload in uploads {
            if !ALLOWED_UPLOAD_TYPES.contains(&upload.content_type.as_str()) {
                return Err(DomainError::validation("UNSUPPORTED_FILE_TYPE"));
            }
            if upload.bytes.len() > self.limits.max_upload_bytes {
                return Err(DomainError::validation("FILE_TOO_LARGE"));
            }
        }
        Ok(())
    }

    /// Store uploads, returning `(kind, path)` pairs. Already-saved blobs are
    /// removed when a later one fails.
    async fn store_uploads(
        &self,
        uploads: &[UploadedFile],
    ) -> DomainResult<Vec<(UploadKind, String)>> {
        let mut saved = Vec::new();
        for upload in uploads {
            match self
                .blobs
                .save(&upload.filename, &upload.content_type, &upload.bytes)
                .await
            {
                Ok(path) => saved.push((upload.kind, path)),
                Err(e) => {
                    self.rollback_blobs(&saved).await;
                    return Err(e);
                }
            }
        }
        Ok(saved)
    }

    async fn rollback_blobs(&self, saved: &[(UploadKind, String)]) {
        for (_, path) in saved {
            if let Err(e) = self.blobs.delete(path).await {
                warn!("failed to roll back blob {}: {}", path, e);
            }
        }
    }

    /// Create a vehicle for `owner_id`, granting the driver role and an
    /// active vehicle when missing.
    pub async fn create_vehicle(
        &self,
        owner_id: &str,
        input: NewVehicleInput,
    ) -> DomainResult<Vehicle> {
        let now = Utc::now();
        let (plate, soat_expiration, license_expiration) = self.check_payload(&input, now)?;

        if self.repos.vehicles().find_by_plate(&plate).await?.is_some() {
            return Err(DomainError::conflict("DUPLICATE_PLATE"));
        }

        let saved = self.store_uploads(&input.uploads).await?;
        let photo_of = |kind: UploadKind| {
            saved
                .iter()
                .find(|(k, _)| *k == kind)
                .map(|(_, path)| path.clone())
        };

        let vehicle = Vehicle {
            id: Uuid::new_v4().to_string(),
            owner_id: owner_id.to_string(),
            plate,
            brand: input.brand.trim().to_string(),
            model: input.model.trim().to_string(),
            capacity: input.capacity,
            year: input.year,
            color: input.color,
            vehicle_photo_url: photo_of(UploadKind::VehiclePhoto).or(input.vehicle_photo_url),
            soat_photo_url: photo_of(UploadKind::SoatPhoto).or(input.soat_photo_url),
            soat_expiration,
            license_number: input.license_number.trim().to_string(),
            license_expiration,
            license_photo_url: photo_of(UploadKind::LicensePhoto).or(input.license_photo_url),
            status: VehicleStatus::Pending,
            status_updated_at: now,
            requested_review_at: None,
            reviewed_at: None,
            reviewed_by: None,
            verification_notes: None,
            pickup_points: Vec::new(),
            created_at: now,
            updated_at: now,
        };

        if let Err(e) = self.repos.vehicles().insert(vehicle.clone()).await {
            self.rollback_blobs(&saved).await;
            return Err(e);
        }

        self.grant_driver_capability(owner_id, &vehicle.id).await?;

        Ok(vehicle)
    }

    async fn grant_driver_capability(&self, owner_id: &str, vehicle_id: &str) -> DomainResult<()> {
        let mut owner = self
            .repos
            .users()
            .find_by_id(owner_id)
            .await?
            .ok_or_else(|| DomainError::not_found("User", "id", owner_id))?;
        owner.roles.insert(Role::Driver);
        if owner.active_vehicle_id.is_none() {
            owner.active_vehicle_id = Some(vehicle_id.to_string());
        }
        owner.updated_at = Utc::now();
        self.repos.users().update(owner).await
    }

    pub async fn list_vehicles(&self, owner_id: &str) -> DomainResult<Vec<Vehicle>> {
        self.repos.vehicles().find_by_owner(owner_id).await
    }

    async fn owned_vehicle(&self, owner_id: &str, vehicle_id: &str) -> DomainResult<Vehicle> {
        let vehicle = self
            .repos
            .vehicles()
            .find_by_id(vehicle_id)
            .await?
            .ok_or_else(|| DomainError::not_found("Vehicle", "id", vehicle_id))?;
        if vehicle.owner_id != owner_id {
            return Err(DomainError::forbidden("NOT_VEHICLE_OWNER"));
        }
        Ok(vehicle)
    }

    /// Field-wise partial update. Material edits reset verification.
    pub async fn update_vehicle(
        &self,
        owner_id: &str,
        vehicle_id: &str,
        input: UpdateVehicleInput,
    ) -> DomainResult<Vehicle> {
        let now = Utc::now();
        let mut vehicle = self.owned_vehicle(owner_id, vehicle_id).await?;
        self.check_uploads(&input.uploads)?;

        let mut material = false;

        if let Some(raw) = &input.plate {
            let plate = normalize_plate(raw);
            if !plate_is_valid(&plate) {
                return Err(DomainError::validation("INVALID_PLATE"));
            }
            if plate != vehicle.plate {
                if self.repos.vehicles().find_by_plate(&plate).await?.is_some() {
                    return Err(DomainError::conflict("DUPLICATE_PLATE"));
                }
                vehicle.plate = plate;
                material = true;
            }
        }
        if let Some(brand) = input.brand {
            if brand.trim().is_empty() {
                return Err(DomainError::validation("INVALID_VEHICLE_DATA"));
            }
            if brand.trim() != vehicle.brand {
                vehicle.brand = brand.trim().to_string();
                material = true;
            }
        }
        if let Some(model) = input.model {
            if model.trim().is_empty() {
                return Err(DomainError::validation("INVALID_VEHICLE_DATA"));
            }
            if model.trim() != vehicle.model {
                vehicle.model = model.trim().to_string();
                material = true;
            }
        }
        if let Some(capacity) = input.capacity {
            if capacity < self.limits.min_capacity || capacity > self.limits.max_capacity {
                return Err(DomainError::validation("INVALID_CAPACITY"));
            }
            if capacity != vehicle.capacity {
                vehicle.capacity = capacity;
                material = true;
            }
        }
        if let Some(year) = input.year {
            vehicle.year = Some(year);
        }
        if let Some(color) = input.color {
            vehicle.color = Some(color);
        }
        if let Some(soat_expiration) = input.soat_expiration {
            if soat_expiration < now {
                return Err(DomainError::precondition("EXPIRED_DOCUMENT"));
            }
            if soat_expiration != vehicle.soat_expiration {
                vehicle.soat_expiration = soat_expiration;
                material = true;
            }
        }
        if let Some(license_number) = input.license_number {
            if license_number.trim().is_empty() {
                return Err(DomainError::validation("MISSING_LICENSE_NUMBER"));
            }
            if license_number.trim() != vehicle.license_number {
                vehicle.license_number = license_number.trim().to_string();
                material = true;
            }
        }
        if let Some(license_expiration) = input.license_expiration {
            if license_expiration < now {
                return Err(DomainError::precondition("EXPIRED_DOCUMENT"));
            }
            if license_expiration != vehicle.license_expiration {
                vehicle.license_expiration = license_expiration;
                material = true;
            }
        }
        if let Some(points) = input.pickup_points {
            vehicle.pickup_points = build_pickup_points(points)?;
        }

        let saved = self.store_uploads(&input.uploads).await?;
        for (kind, path) in &saved {
            match kind {
                UploadKind::VehiclePhoto => vehicle.vehicle_photo_url = Some(path.clone()),
                UploadKind::SoatPhoto => {
                    vehicle.soat_photo_url = Some(path.clone());
                    material = true;
                }
                UploadKind::LicensePhoto => {
                    vehicle.license_photo_url = Some(path.clone());
                    material = true;
                }
            }
        }
        if let Some(url) = input.soat_photo_url {
            vehicle.soat_photo_url = Some(url);
            material = true;
        }
        if let Some(url) = input.license_photo_url {
            vehicle.license_photo_url = Some(url);
            material = true;
        }
        if let Some(url) = input.vehicle_photo_url {
            vehicle.vehicle_photo_url = Some(url);
        }

        if material {
            vehicle.reset_verification(now);
        }
        vehicle.updated_at = now;

        if let Err(e) = self.repos.vehicles().update(vehicle.clone()).await {
            self.rollback_blobs(&saved).await;
            return Err(e);
        }
        Ok(vehicle)
    }

    /// `PUT /vehicles/:id/activate`.
    pub async fn activate_vehicle(&self, owner_id: &str, vehicle_id: &str) -> DomainResult<Vehicle> {
        let now = Utc::now();
        let vehicle = self.owned_vehicle(owner_id, vehicle_id).await?;
        if !vehicle.is_activatable(now) {
            return Err(DomainError::precondition("DOCUMENTS_INVALID"));
        }

        let mut owner = self
            .repos
            .users()
            .find_by_id(owner_id)
            .await?
            .ok_or_else(|| DomainError::not_found("User", "id", owner_id))?;
        owner.active_vehicle_id = Some(vehicle.id.clone());
        owner.updated_at = now;
        self.repos.users().update(owner).await?;
        Ok(vehicle)
    }

    /// `DELETE /vehicles/:id`: refused while open future trips reference the
    /// vehicle; afterwards the owner's driver capability is recomputed.
    pub async fn delete_vehicle(&self, owner_id: &str, vehicle_id: &str) -> DomainResult<()> {
        let now = Utc::now();
        let vehicle = self.owned_vehicle(owner_id, vehicle_id).await?;

        if self
            .repos
            .trips()
            .has_blocking_trips(&vehicle.id, now)
            .await?
        {
            return Err(DomainError::precondition("BLOCKED_BY_ACTIVE_TRIPS"));
        }

        self.repos.vehicles().delete(&vehicle.id).await?;

        let mut owner = self
            .repos
            .users()
            .find_by_id(owner_id)
            .await?
            .ok_or_else(|| DomainError::not_found("User", "id", owner_id))?;
        let remaining = self.repos.vehicles().find_by_owner(owner_id).await?;

        if remaining.is_empty() {
            owner.roles.remove(Role::Driver);
            owner.active_role = Role::Passenger;
            owner.active_vehicle_id = None;
        } else {
            let fallback = remaining
                .iter()
                .find(|v| v.documents_valid(now))
                .or_else(|| remaining.first());
            owner.active_vehicle_id = fallback.map(|v| v.id.clone());
        }
        owner.updated_at = now;
        self.repos.users().update(owner).await
    }

    /// `POST /vehicles/:id/request-review`.
    pub async fn request_review(&self, owner_id: &str, vehicle_id: &str) -> DomainResult<Vehicle> {
        let now = Utc::now();
        let mut vehicle = self.owned_vehicle(owner_id, vehicle_id).await?;
        if !vehicle.documents_valid(now) {
            return Err(DomainError::precondition("EXPIRED_DOCUMENT"));
        }
        vehicle.transition(VehicleStatus::UnderReview, now)?;
        vehicle.requested_review_at = Some(now);
        vehicle.updated_at = now;
        self.repos.vehicles().update(vehicle.clone()).await?;
        Ok(vehicle)
    }

    /// Admin decision on a vehicle under review. The admin surface itself is
    /// out of this core; the transition contract is enforced here.
    pub async fn apply_review_decision(
        &self,
        vehicle_id: &str,
        decision: VehicleStatus,
        reviewer: &str,
        notes: Option<String>,
    ) -> DomainResult<Vehicle> {
        let now = Utc::now();
        let mut vehicle = self
            .repos
            .vehicles()
            .find_by_id(vehicle_id)
            .await?
            .ok_or_else(|| DomainError::not_found("Vehicle", "id", vehicle_id))?;
        if !matches!(
            decision,
            VehicleStatus::Verified | VehicleStatus::Rejected | VehicleStatus::NeedsUpdate
        ) {
            return Err(DomainError::precondition("INVALID_STATUS_TRANSITION"));
        }
        vehicle.transition(decision, now)?;
        vehicle.reviewed_at = Some(now);
        vehicle.reviewed_by = Some(reviewer.to_string());
        vehicle.verification_notes = notes;
        vehicle.updated_at = now;
        self.repos.vehicles().update(vehicle.clone()).await?;
        Ok(vehicle)
    }

    // ── Pickup points ──────────────────────────────────────────

    pub async fn add_pickup_point(
        &self,
        owner_id: &str,
        vehicle_id: &str,
        input: NewPickupPointInput,
    ) -> DomainResult<Vehicle> {
        let mut vehicle = self.owned_vehicle(owner_id, vehicle_id).await?;
        let point = build_pickup_point(input)?;
        vehicle.pickup_points.push(point);
        vehicle.updated_at = Utc::now();
        self.repos.vehicles().update(vehicle.clone()).await?;
        Ok(vehicle)
    }

    pub async fn update_pickup_point(
        &self,
        owner_id: &str,
        vehicle_id: &str,
        point_id: &str,
        input: NewPickupPointInput,
    ) -> DomainResult<Vehicle> {
        let mut vehicle = self.owned_vehicle(owner_id, vehicle_id).await?;
        let replacement = build_pickup_point(input)?;
        let slot = vehicle
            .pickup_points
            .iter_mut()
            .find(|p| p.id == point_id)
            .ok_or_else(|| DomainError::not_found("PickupPoint", "id", point_id))?;
        slot.name = replacement.name;
        slot.description = replacement.description;
        slot.lat = replacement.lat;
        slot.lng = replacement.lng;
        vehicle.updated_at = Utc::now();
        self.repos.vehicles().update(vehicle.clone()).await?;
        Ok(vehicle)
    }

    pub async fn delete_pickup_point(
        &self,
        owner_id: &str,
        vehicle_id: &str,
        point_id: &str,
    ) -> DomainResult<Vehicle> {
        let mut vehicle = self.owned_vehicle(owner_id, vehicle_id).await?;
        let before = vehicle.pickup_points.len();
        vehicle.pickup_points.retain(|p| p.id != point_id);
        if vehicle.pickup_points.len() == before {
            return Err(DomainError::not_found("PickupPoint", "id", point_id));
        }
        vehicle.updated_at = Utc::now();
        self.repos.vehicles().update(vehicle.clone()).await?;
        Ok(vehicle)
    }
}

fn build_pickup_point(input: NewPickupPointInput) -> DomainResult<PickupPoint> {
    let name = input.name.trim().to_string();
    if name.is_empty() {
        return Err(DomainError::validation("INVALID_PICKUP_POINT"));
    }
    PickupPoint::validate_coordinates(input.lat, input.lng)?;
    Ok(PickupPoint {
        id: Uuid::new_v4().to_string(),
        name,
        description: input.description.map(|d| d.trim().to_string()),
        lat: input.lat,
        lng: input.lng,
    })
}

fn build_pickup_points(inputs: Vec<NewPickupPointInput>) -> DomainResult<Vec<PickupPoint>> {
    inputs.into_iter().map(build_pickup_point).collect()
}

// ── Tests ──────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use chrono::Duration;
    use uuid::Uuid;

    use super::*;
    use crate::domain::trip::{Trip, TripStatus};
    use crate::domain::user::{PaymentMethod, Role, RoleSet, User};
    use crate::infrastructure::database::test_support::connect_test_db;
    use crate::infrastructure::database::SeaOrmRepositoryProvider;
    use crate::infrastructure::storage::MemoryBlobStore;

    struct Harness {
        fleet: FleetService,
        repos: Arc<dyn RepositoryProvider>,
        blobs: Arc<MemoryBlobStore>,
        owner: User,
    }

    async fn harness_with_blobs(blobs: MemoryBlobStore) -> Harness {
        let db = connect_test_db().await;
        let repos: Arc<dyn RepositoryProvider> = Arc::new(SeaOrmRepositoryProvider::new(db));
        let blobs = Arc::new(blobs);
        let fleet = FleetService::new(repos.clone(), blobs.clone(), VehicleLimits::default());

        let now = Utc::now();
        let owner = User {
            id: Uuid::new_v4().to_string(),
            email: "owner@unisabana.edu.co".into(),
            password_hash: "hash".into(),
            first_name: "Ana".into(),
            last_name: "Prieto".into(),
            university_id: "A00099999".into(),
            phone: "3000000000".into(),
            photo_url: None,
            roles: RoleSet::passenger_only(),
            active_role: Role::Passenger,
            active_vehicle_id: None,
            emergency_contact: None,
            preferred_payment_method: PaymentMethod::Cash,
            created_at: now,
            updated_at: now,
        };
        repos.users().insert(owner.clone()).await.unwrap();

        Harness {
            fleet,
            repos,
            blobs,
            owner,
        }
    }

    async fn harness() -> Harness {
        harness_with_blobs(MemoryBlobStore::new()).await
    }

    fn input(plate: &str) -> NewVehicleInput {
        let now = Utc::now();
        NewVehicleInput {
            plate: plate.to_string(),
            brand: "Mazda".into(),
            model: "3".into(),
            capacity: 4,
            year: Some(2022),
            color: Some("rojo".into()),
            soat_expiration: Some(now + Duration::days(60)),
            license_number: "LIC-9".into(),
            license_expiration: Some(now + Duration::days(300)),
            vehicle_photo_url: None,
            soat_photo_url: Some("soat.pdf".into()),
            license_photo_url: Some("lic.pdf".into()),
            uploads: Vec::new(),
        }
    }

    fn upload(kind: UploadKind) -> UploadedFile {
        UploadedFile {
            kind,
            filename: "doc.pdf".into(),
            content_type: "application/pdf".into(),
            bytes: vec![1, 2, 3],
        }
    }

    async fn owner(h: &Harness) -> User {
        h.repos
            .users()
            .find_by_id(&h.owner.id)
            .await
            .unwrap()
            .unwrap()
    }

    #[tokio::test]
    async fn create_grants_driver_role_and_active_vehicle() {
        let h = harness().await;
        let vehicle = h
            .fleet
            .create_vehicle(&h.owner.id, input("abc 123"))
            .await
            .unwrap();

        assert_eq!(vehicle.plate, "ABC123");
        assert_eq!(vehicle.status, VehicleStatus::Pending);

        let owner = owner(&h).await;
        assert!(owner.roles.contains(Role::Driver));
        assert_eq!(owner.active_vehicle_id.as_deref(), Some(vehicle.id.as_str()));
    }

    #[tokio::test]
    async fn create_rejects_bad_payloads() {
        let h = harness().await;

        let mut bad_plate = input("AB1234");
        bad_plate.plate = "AB1234".into();
        assert_eq!(
            h.fleet
                .create_vehicle(&h.owner.id, bad_plate)
                .await
                .unwrap_err()
                .code(),
            "INVALID_PLATE"
        );

        let mut bad_capacity = input("ABC124");
        bad_capacity.capacity = 9;
        assert_eq!(
            h.fleet
                .create_vehicle(&h.owner.id, bad_capacity)
                .await
                .unwrap_err()
                .code(),
            "INVALID_CAPACITY"
        );

        let mut expired = input("ABC125");
        expired.license_expiration = Some(Utc::now() - Duration::days(1));
        assert_eq!(
            h.fleet
                .create_vehicle(&h.owner.id, expired)
                .await
                .unwrap_err()
                .code(),
            "EXPIRED_DOCUMENT"
        );

        let mut no_photo = input("ABC126");
        no_photo.soat_photo_url = None;
        assert_eq!(
            h.fleet
                .create_vehicle(&h.owner.id, no_photo)
                .await
                .unwrap_err()
                .code(),
            "MISSING_DOCUMENT_PHOTO"
        );
    }

    #[tokio::test]
    async fn duplicate_plate_conflicts() {
        let h = harness().await;
        h.fleet
            .create_vehicle(&h.owner.id, input("ABC123"))
            .await
            .unwrap();
        let err = h
            .fleet
            .create_vehicle(&h.owner.id, input("abc123"))
            .await
            .unwrap_err();
        assert_eq!(err.code(), "DUPLICATE_PLATE");
    }

    #[tokio::test]
    async fn uploads_reject_wrong_type_and_oversize() {
        let h = harness().await;

        let mut wrong_type = input("ABC127");
        wrong_type.uploads = vec![UploadedFile {
            content_type: "text/html".into(),
            ..upload(UploadKind::SoatPhoto)
        }];
        assert_eq!(
            h.fleet
                .create_vehicle(&h.owner.id, wrong_type)
                .await
                .unwrap_err()
                .code(),
            "UNSUPPORTED_FILE_TYPE"
        );

        let mut oversize = input("ABC128");
        oversize.uploads = vec![UploadedFile {
            bytes: vec![0; 6 * 1024 * 1024],
            ..upload(UploadKind::SoatPhoto)
        }];
        assert_eq!(
            h.fleet
                .create_vehicle(&h.owner.id, oversize)
                .await
                .unwrap_err()
                .code(),
            "FILE_TOO_LARGE"
        );
    }

    #[tokio::test]
    async fn failed_save_rolls_back_stored_blobs() {
        let h = harness_with_blobs(MemoryBlobStore::failing()).await;
        let mut with_upload = input("ABC129");
        with_upload.uploads = vec![upload(UploadKind::SoatPhoto)];

        assert!(h
            .fleet
            .create_vehicle(&h.owner.id, with_upload)
            .await
            .is_err());
        assert!(h.blobs.is_empty());
        assert!(h
            .repos
            .vehicles()
            .find_by_plate("ABC129")
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn material_update_resets_verification() {
        let h = harness().await;
        let vehicle = h
            .fleet
            .create_vehicle(&h.owner.id, input("ABC123"))
            .await
            .unwrap();
        h.fleet.request_review(&h.owner.id, &vehicle.id).await.unwrap();
        h.fleet
            .apply_review_decision(&vehicle.id, VehicleStatus::Verified, "admin", None)
            .await
            .unwrap();

        // Cosmetic change keeps the verification.
        let updated = h
            .fleet
            .update_vehicle(
                &h.owner.id,
                &vehicle.id,
                UpdateVehicleInput {
                    color: Some("azul".into()),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(updated.status, VehicleStatus::Verified);

        // Capacity change is material.
        let updated = h
            .fleet
            .update_vehicle(
                &h.owner.id,
                &vehicle.id,
                UpdateVehicleInput {
                    capacity: Some(3),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(updated.status, VehicleStatus::Pending);
        assert!(updated.reviewed_at.is_none());
        assert!(updated.requested_review_at.is_none());
    }

    #[tokio::test]
    async fn activation_requires_verified_and_valid_documents() {
        let h = harness().await;
        let vehicle = h
            .fleet
            .create_vehicle(&h.owner.id, input("ABC123"))
            .await
            .unwrap();

        let err = h
            .fleet
            .activate_vehicle(&h.owner.id, &vehicle.id)
            .await
            .unwrap_err();
        assert_eq!(err.code(), "DOCUMENTS_INVALID");

        h.fleet.request_review(&h.owner.id, &vehicle.id).await.unwrap();
        h.fleet
            .apply_review_decision(&vehicle.id, VehicleStatus::Verified, "admin", None)
            .await
            .unwrap();
        h.fleet
            .activate_vehicle(&h.owner.id, &vehicle.id)
            .await
            .unwrap();
        assert_eq!(
            owner(&h).await.active_vehicle_id.as_deref(),
            Some(vehicle.id.as_str())
        );
    }

    #[tokio::test]
    async fn review_decisions_respect_the_state_machine() {
        let h = harness().await;
        let vehicle = h
            .fleet
            .create_vehicle(&h.owner.id, input("ABC123"))
            .await
            .unwrap();

        // Cannot verify a vehicle that was never submitted.
        let err = h
            .fleet
            .apply_review_decision(&vehicle.id, VehicleStatus::Verified, "admin", None)
            .await
            .unwrap_err();
        assert_eq!(err.code(), "INVALID_STATUS_TRANSITION");

        h.fleet.request_review(&h.owner.id, &vehicle.id).await.unwrap();
        let reviewed = h
            .fleet
            .apply_review_decision(
                &vehicle.id,
                VehicleStatus::NeedsUpdate,
                "admin",
                Some("foto ilegible".into()),
            )
            .await
            .unwrap();
        assert_eq!(reviewed.status, VehicleStatus::NeedsUpdate);
        assert_eq!(reviewed.verification_notes.as_deref(), Some("foto ilegible"));

        // Owner may resubmit after corrections.
        let resubmitted = h.fleet.request_review(&h.owner.id, &vehicle.id).await.unwrap();
        assert_eq!(resubmitted.status, VehicleStatus::UnderReview);
    }

    #[tokio::test]
    async fn delete_is_blocked_by_open_future_trips() {
        let h = harness().await;
        let vehicle = h
            .fleet
            .create_vehicle(&h.owner.id, input("ABC123"))
            .await
            .unwrap();

        let now = Utc::now();
        let trip = Trip {
            id: Uuid::new_v4().to_string(),
            driver_id: h.owner.id.clone(),
            vehicle_id: vehicle.id.clone(),
            origin: "Campus".into(),
            destination: "Portal Norte".into(),
            route_description: None,
            departure_at: now + Duration::hours(4),
            seats_total: 3,
            seats_available: 3,
            price_per_seat: 5000,
            distance_km: None,
            duration_minutes: None,
            status: TripStatus::Scheduled,
            pickup_points: vec![],
            pickup_suggestions: vec![],
            reservations: vec![],
            created_at: now,
            updated_at: now,
        };
        h.repos.trips().insert(trip.clone()).await.unwrap();

        let err = h
            .fleet
            .delete_vehicle(&h.owner.id, &vehicle.id)
            .await
            .unwrap_err();
        assert_eq!(err.code(), "BLOCKED_BY_ACTIVE_TRIPS");

        h.repos.trips().cancel_trip(&trip.id).await.unwrap();
        h.fleet.delete_vehicle(&h.owner.id, &vehicle.id).await.unwrap();

        // Last vehicle gone: the driver capability is revoked.
        let owner = owner(&h).await;
        assert!(!owner.roles.contains(Role::Driver));
        assert_eq!(owner.active_role, Role::Passenger);
        assert!(owner.active_vehicle_id.is_none());
    }

    #[tokio::test]
    async fn delete_falls_back_to_a_remaining_vehicle() {
        let h = harness().await;
        let first = h
            .fleet
            .create_vehicle(&h.owner.id, input("ABC123"))
            .await
            .unwrap();
        let second = h
            .fleet
            .create_vehicle(&h.owner.id, input("XYZ789"))
            .await
            .unwrap();
        assert_eq!(
            owner(&h).await.active_vehicle_id.as_deref(),
            Some(first.id.as_str())
        );

        h.fleet.delete_vehicle(&h.owner.id, &first.id).await.unwrap();
        let owner = owner(&h).await;
        assert!(owner.roles.contains(Role::Driver));
        assert_eq!(owner.active_vehicle_id.as_deref(), Some(second.id.as_str()));
    }

    #[tokio::test]
    async fn foreign_vehicles_are_not_touchable() {
        let h = harness().await;
        let vehicle = h
            .fleet
            .create_vehicle(&h.owner.id, input("ABC123"))
            .await
            .unwrap();

        let err = h
            .fleet
            .delete_vehicle("someone-else", &vehicle.id)
            .await
            .unwrap_err();
        assert_eq!(err.code(), "NOT_VEHICLE_OWNER");
    }

    #[tokio::test]
    async fn pickup_point_crud_round_trip() {
        let h = harness().await;
        let vehicle = h
            .fleet
            .create_vehicle(&h.owner.id, input("ABC123"))
            .await
            .unwrap();

        let with_point = h
            .fleet
            .add_pickup_point(
                &h.owner.id,
                &vehicle.id,
                NewPickupPointInput {
                    name: "  Entrada Principal ".into(),
                    description: None,
                    lat: 4.861,
                    lng: -74.033,
                },
            )
            .await
            .unwrap();
        assert_eq!(with_point.pickup_points.len(), 1);
        assert_eq!(with_point.pickup_points[0].name, "Entrada Principal");
        let point_id = with_point.pickup_points[0].id.clone();

        let renamed = h
            .fleet
            .update_pickup_point(
                &h.owner.id,
                &vehicle.id,
                &point_id,
                NewPickupPointInput {
                    name: "Portería Sur".into(),
                    description: Some("junto al CAI".into()),
                    lat: 4.860,
                    lng: -74.034,
                },
            )
            .await
            .unwrap();
        assert_eq!(renamed.pickup_points[0].name, "Portería Sur");

        let emptied = h
            .fleet
            .delete_pickup_point(&h.owner.id, &vehicle.id, &point_id)
            .await
            .unwrap();
        assert!(emptied.pickup_points.is_empty());

        let err = h
            .fleet
            .add_pickup_point(
                &h.owner.id,
                &vehicle.id,
                NewPickupPointInput {
                    name: "Fuera del mapa".into(),
                    description: None,
                    lat: 95.0,
                    lng: 0.0,
                },
            )
            .await
            .unwrap_err();
        assert_eq!(err.code(), "INVALID_COORDINATES");
    }
}
