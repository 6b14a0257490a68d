//! Outbound ports: narrow interfaces behind which the external world lives
//!
//! Everything here is injected into the services, so the core runs and tests
//! without network, disk or SMTP.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::domain::geo::GeoPoint;
use crate::domain::DomainResult;

/// Transport mode understood by the route providers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TravelMode {
    Driving,
    Walking,
    Cycling,
}

impl TravelMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Driving => "driving",
            Self::Walking => "walking",
            Self::Cycling => "cycling",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "driving" | "driving-car" => Some(Self::Driving),
            "walking" | "foot" => Some(Self::Walking),
            "cycling" | "bike" => Some(Self::Cycling),
            _ => None,
        }
    }
}

impl Default for TravelMode {
    fn default() -> Self {
        Self::Driving
    }
}

/// What a route provider answers for one origin/destination pair.
#[derive(Debug, Clone)]
pub struct RouteSummary {
    pub distance_meters: f64,
    pub duration_seconds: f64,
    /// Encoded polyline when the provider returns one; format varies by
    /// provider and is passed through untouched.
    pub encoded_polyline: Option<String>,
    pub provider: &'static str,
}

/// Pluggable directions backend (OSRM, OpenRouteService, Google).
#[async_trait]
pub trait RouteProvider: Send + Sync {
    fn name(&self) -> &'static str;

    /// Resolve one route. Failures surface as
    /// `DomainError::Dependency { code: "ROUTE_PROVIDER_ERROR", .. }`.
    async fn lookup(
        &self,
        origin: GeoPoint,
        destination: GeoPoint,
        mode: TravelMode,
    ) -> DomainResult<RouteSummary>;
}

/// Outbound email. Callers decide whether a failure is fatal.
#[async_trait]
pub trait EmailSender: Send + Sync {
    async fn send_welcome(&self, to: &str, first_name: &str) -> DomainResult<()>;

    /// Carries the raw reset token; the only place it leaves the process.
    async fn send_password_reset(
        &self,
        to: &str,
        raw_token: &str,
        expires_at: DateTime<Utc>,
    ) -> DomainResult<()>;

    async fn send_trip_cancelled(
        &self,
        to: &str,
        passenger_name: &str,
        origin: &str,
        destination: &str,
        departure_at: DateTime<Utc>,
    ) -> DomainResult<()>;
}

/// Vehicle-document blob storage. The database keeps only the returned
/// relative path.
#[async_trait]
pub trait BlobStore: Send + Sync {
    /// Persist one uploaded file and return its opaque relative path.
    async fn save(
        &self,
        filename_hint: &str,
        content_type: &str,
        bytes: &[u8],
    ) -> DomainResult<String>;

    /// Best-effort removal, used for rollback of partially saved uploads.
    async fn delete(&self, relative_path: &str) -> DomainResult<()>;
}

/// Server-side JWT invalidation.
///
/// Process-local by design; a multi-replica deployment swaps in a shared
/// TTL store behind the same interface.
pub trait TokenRevocationStore: Send + Sync {
    /// Remember a token as revoked until `exp` (Unix seconds).
    fn revoke(&self, token: &str, exp: i64);

    /// Whether the token was revoked and has not yet expired.
    fn is_revoked(&self, token: &str) -> bool;
}
