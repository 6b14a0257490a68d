//! Trip repository interface

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use super::model::{PickupSuggestion, Reservation, ReservationStatus, Trip, TripPickupPoint};
use crate::domain::DomainResult;

/// Filters of `GET /trips`.
#[derive(Debug, Clone, Default)]
pub struct TripFilter {
    /// Substring match on the origin.
    pub departure_point: Option<String>,
    pub min_seats: Option<i32>,
    pub max_price: Option<i64>,
    pub start_time: Option<DateTime<Utc>>,
    pub end_time: Option<DateTime<Utc>>,
}

#[async_trait]
pub trait TripRepository: Send + Sync {
    /// Insert a trip together with its initial pickup-point snapshot.
    async fn insert(&self, trip: Trip) -> DomainResult<()>;

    /// Hydrated trip: reservations, pickup points and suggestions included.
    async fn find_by_id(&self, id: &str) -> DomainResult<Option<Trip>>;

    /// Open trips (`scheduled`/`full`) ordered by departure ascending.
    async fn list_open(&self, filter: &TripFilter) -> DomainResult<Vec<Trip>>;

    /// Whether a vehicle is referenced by any open trip departing at or
    /// after `now`. Gates vehicle deletion.
    async fn has_blocking_trips(
        &self,
        vehicle_id: &str,
        now: DateTime<Utc>,
    ) -> DomainResult<bool>;

    /// The seat-booking compare-and-swap.
    ///
    /// In one transaction: a conditional update that decrements
    /// `seats_available` only while the trip is open, has enough seats, is
    /// not the caller's own, and the caller holds no active reservation;
    /// then the reservation insert; then `scheduled → full` normalization.
    /// On a failed swap the trip is re-read and the root cause is mapped to
    /// `TRIP_NOT_FOUND`, `OWN_TRIP`, `TRIP_NOT_AVAILABLE`,
    /// `INSUFFICIENT_SEATS` or `DUPLICATE_RESERVATION`.
    async fn try_reserve(&self, trip_id: &str, reservation: Reservation) -> DomainResult<Trip>;

    /// Apply a reservation transition atomically: conditional status update
    /// (guarded by `expected`), optional seat return capped at
    /// `seats_total`, trip status normalization. Returns the updated trip.
    async fn apply_reservation_transition(
        &self,
        trip_id: &str,
        reservation_id: &str,
        expected: ReservationStatus,
        next: ReservationStatus,
        returns_seats: bool,
        decision_at: DateTime<Utc>,
    ) -> DomainResult<Trip>;

    /// Cancel a trip: status `cancelled`, zero seats, every active
    /// reservation cancelled. Returns the updated trip plus the
    /// reservations this call transitioned (the notification fan-out
    /// targets exactly those passengers).
    async fn cancel_trip(&self, trip_id: &str) -> DomainResult<(Trip, Vec<Reservation>)>;

    /// Append a pickup point to the trip snapshot.
    async fn add_pickup_point(&self, trip_id: &str, point: TripPickupPoint) -> DomainResult<()>;

    /// Queue a passenger suggestion and its mirrored active pickup point in
    /// one transaction.
    async fn add_suggestion(
        &self,
        trip_id: &str,
        suggestion: PickupSuggestion,
        mirrored_point: TripPickupPoint,
    ) -> DomainResult<()>;

    /// Resolve a pending suggestion. Accepting keeps the mirrored point
    /// active; rejecting marks both the suggestion and the point rejected.
    async fn resolve_suggestion(
        &self,
        trip_id: &str,
        suggestion_id: &str,
        accept: bool,
    ) -> DomainResult<Trip>;
}
