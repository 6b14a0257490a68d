//! Vehicle domain entity, document checks and verification state machine

use chrono::{DateTime, Duration, Utc};

use crate::domain::{DomainError, DomainResult};

/// Days before expiration at which a document is flagged as expiring.
pub const EXPIRING_WINDOW_DAYS: i64 = 30;

/// Verification status of a vehicle's paperwork.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VehicleStatus {
    /// Freshly created or materially edited; not yet submitted.
    Pending,
    /// Submitted by the owner, waiting for an admin decision.
    UnderReview,
    Verified,
    Rejected,
    /// Admin asked for corrections.
    NeedsUpdate,
}

impl VehicleStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::UnderReview => "under_review",
            Self::Verified => "verified",
            Self::Rejected => "rejected",
            Self::NeedsUpdate => "needs_update",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(Self::Pending),
            "under_review" => Some(Self::UnderReview),
            "verified" => Some(Self::Verified),
            "rejected" => Some(Self::Rejected),
            "needs_update" => Some(Self::NeedsUpdate),
            _ => None,
        }
    }

    /// Whether the owner may submit this vehicle for review.
    pub fn can_request_review(&self) -> bool {
        matches!(self, Self::Pending | Self::Rejected | Self::NeedsUpdate)
    }

    /// Valid transitions of the externally driven review machine.
    pub fn can_transition_to(&self, next: VehicleStatus) -> bool {
        use VehicleStatus::*;
        match (self, next) {
            (Pending | Rejected | NeedsUpdate, UnderReview) => true,
            (UnderReview, Verified | Rejected | NeedsUpdate) => true,
            // Material edits reset any state back to pending.
            (_, Pending) => true,
            _ => false,
        }
    }

    /// Spanish-facing label shown by clients.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Pending => "Documentos pendientes de revisión",
            Self::UnderReview => "En revisión",
            Self::Verified => "Verificado",
            Self::Rejected => "Rechazado",
            Self::NeedsUpdate => "Requiere actualización",
        }
    }

    pub fn severity(&self) -> &'static str {
        match self {
            Self::Verified => "success",
            Self::Pending | Self::UnderReview => "info",
            Self::NeedsUpdate => "warning",
            Self::Rejected => "error",
        }
    }
}

impl std::fmt::Display for VehicleStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Named boarding coordinate offered by the driver for a vehicle.
#[derive(Debug, Clone)]
pub struct PickupPoint {
    pub id: String,
    pub name: String,
    pub description: Option<String>,
    pub lat: f64,
    pub lng: f64,
}

impl PickupPoint {
    /// Bounds-check both coordinates.
    pub fn validate_coordinates(lat: f64, lng: f64) -> DomainResult<()> {
        if !(-90.0..=90.0).contains(&lat) || !(-180.0..=180.0).contains(&lng) {
            return Err(DomainError::validation("INVALID_COORDINATES"));
        }
        Ok(())
    }
}

/// A vehicle registered by a driver.
#[derive(Debug, Clone)]
pub struct Vehicle {
    pub id: String,
    pub owner_id: String,
    /// Uppercased Colombian plate, unique.
    pub plate: String,
    pub brand: String,
    pub model: String,
    /// Passenger seats offered, within the configured bounds.
    pub capacity: i32,
    pub year: Option<i32>,
    pub color: Option<String>,
    pub vehicle_photo_url: Option<String>,
    pub soat_photo_url: Option<String>,
    pub soat_expiration: DateTime<Utc>,
    pub license_number: String,
    pub license_expiration: DateTime<Utc>,
    pub license_photo_url: Option<String>,
    pub status: VehicleStatus,
    pub status_updated_at: DateTime<Utc>,
    pub requested_review_at: Option<DateTime<Utc>>,
    pub reviewed_at: Option<DateTime<Utc>>,
    pub reviewed_by: Option<String>,
    pub verification_notes: Option<String>,
    pub pickup_points: Vec<PickupPoint>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Vehicle {
    /// Both documents carry a future expiration date.
    pub fn documents_valid(&self, now: DateTime<Utc>) -> bool {
        self.soat_expiration >= now && self.license_expiration >= now
    }

    /// Eligible as a driver's default vehicle.
    pub fn is_activatable(&self, now: DateTime<Utc>) -> bool {
        self.status == VehicleStatus::Verified && self.documents_valid(now)
    }

    /// Apply a review-machine transition, validating it first.
    pub fn transition(&mut self, next: VehicleStatus, now: DateTime<Utc>) -> DomainResult<()> {
        if !self.status.can_transition_to(next) {
            return Err(DomainError::precondition("INVALID_STATUS_TRANSITION"));
        }
        self.status = next;
        self.status_updated_at = now;
        Ok(())
    }

    /// Material edit: back to `pending`, review metadata cleared.
    pub fn reset_verification(&mut self, now: DateTime<Utc>) {
        self.status = VehicleStatus::Pending;
        self.status_updated_at = now;
        self.requested_review_at = None;
        self.reviewed_at = None;
        self.reviewed_by = None;
        self.verification_notes = None;
    }

    /// Computed, read-only decoration for API responses.
    pub fn meta(&self, now: DateTime<Utc>) -> VehicleMeta {
        let soat = document_status(self.soat_photo_url.as_deref(), self.soat_expiration, now);
        let license = document_status(
            self.license_photo_url.as_deref(),
            self.license_expiration,
            now,
        );

        let mut warnings = Vec::new();
        push_warning(&mut warnings, "SOAT", soat);
        push_warning(&mut warnings, "Licencia", license);

        let documents_ok = soat == DocumentStatus::Valid || soat == DocumentStatus::Expiring;
        let documents_ok =
            documents_ok && matches!(license, DocumentStatus::Valid | DocumentStatus::Expiring);

        VehicleMeta {
            soat,
            license,
            warnings,
            documents_ok,
            can_request_review: self.status.can_request_review() && self.documents_valid(now),
            can_activate: self.is_activatable(now),
            status_label: self.status.label(),
            severity: self.status.severity(),
        }
    }
}

/// Health of a single document at a point in time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentStatus {
    Valid,
    /// Expires within [`EXPIRING_WINDOW_DAYS`].
    Expiring,
    Expired,
    /// No photo on file.
    Missing,
}

impl DocumentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Valid => "valid",
            Self::Expiring => "expiring",
            Self::Expired => "expired",
            Self::Missing => "missing",
        }
    }
}

fn document_status(
    photo_url: Option<&str>,
    expiration: DateTime<Utc>,
    now: DateTime<Utc>,
) -> DocumentStatus {
    if photo_url.map(str::trim).filter(|p| !p.is_empty()).is_none() {
        return DocumentStatus::Missing;
    }
    if expiration < now {
        DocumentStatus::Expired
    } else if expiration <= now + Duration::days(EXPIRING_WINDOW_DAYS) {
        DocumentStatus::Expiring
    } else {
        DocumentStatus::Valid
    }
}

fn push_warning(warnings: &mut Vec<String>, label: &str, status: DocumentStatus) {
    match status {
        DocumentStatus::Expired => warnings.push(format!("{} vencido", label)),
        DocumentStatus::Expiring => warnings.push(format!("{} vence pronto", label)),
        DocumentStatus::Missing => warnings.push(format!("{} sin documento adjunto", label)),
        DocumentStatus::Valid => {}
    }
}

/// Vehicle read-model decoration, pure and deterministic.
#[derive(Debug, Clone)]
pub struct VehicleMeta {
    pub soat: DocumentStatus,
    pub license: DocumentStatus,
    pub warnings: Vec<String>,
    pub documents_ok: bool,
    pub can_request_review: bool,
    pub can_activate: bool,
    pub status_label: &'static str,
    pub severity: &'static str,
}

/// Uppercase and strip whitespace; callers validate afterwards.
pub fn normalize_plate(raw: &str) -> String {
    raw.chars()
        .filter(|c| !c.is_whitespace())
        .collect::<String>()
        .to_uppercase()
}

/// Colombian plate formats: `AAA123` (cars) or `AAA12B` (motorcycles).
pub fn plate_is_valid(plate: &str) -> bool {
    let bytes = plate.as_bytes();
    if bytes.len() != 6 {
        return false;
    }
    let letters = bytes[..3].iter().all(u8::is_ascii_uppercase);
    let mid_digits = bytes[3..5].iter().all(u8::is_ascii_digit);
    let tail_ok = bytes[5].is_ascii_digit() || bytes[5].is_ascii_uppercase();
    letters && mid_digits && tail_ok
}

// ── Tests ──────────────────────────────────────────────────────
