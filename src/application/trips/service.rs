//! Trip engine use-cases

use std::sync::Arc;

use chrono::{DateTime, Utc};
use futures_util::future::join_all;
use tracing::{info, warn};
use uuid::Uuid;

use crate::application::fleet::NewPickupPointInput;
use crate::application::ports::EmailSender;
use crate::application::tariff::{self, TariffInput, TariffRates};
use crate::domain::geo::GeoPoint;
use crate::domain::rating::RatingSummary;
use crate::domain::stop::{find_stop, snap_route_to_stops, STOPS};
use crate::domain::trip::{
    PickupPointStatus, PickupSource, PickupSuggestion, Reservation, ReservationAction,
    ReservationStatus, SuggestionStatus, TransitionOutcome, Trip, TripFilter, TripPickupPoint,
    TripStatus, MAX_PENDING_SUGGESTIONS,
};
use crate::domain::user::{PaymentMethod, Role, User};
use crate::domain::vehicle::PickupPoint as VehiclePickupPoint;
use crate::domain::{DomainError, DomainResult, RepositoryProvider};

/// Payload of `POST /trips`. Supports the legacy free-text shape and the
/// stops-plus-route shape; exactly one must be present.
#[derive(Debug, Clone)]
pub struct CreateTripInput {
    /// Defaults to the caller's active vehicle.
    pub vehicle_id: Option<String>,
    pub origin: Option<String>,
    pub destination: Option<String>,
    pub origin_stop_id: Option<String>,
    pub destination_stop_id: Option<String>,
    pub route: Vec<GeoPoint>,
    pub route_description: Option<String>,
    pub departure_at: DateTime<Utc>,
    pub seats_total: i32,
    pub price_per_seat: i64,
    pub distance_km: Option<f64>,
    pub duration_minutes: Option<f64>,
    pub pickup_points: Vec<NewPickupPointInput>,
    /// When the client attaches the tariff suggestion it showed, the price
    /// must fall inside the suggestion's tolerance band.
    pub suggested_tariff: Option<i64>,
}

#[derive(Debug, Clone)]
pub struct ReserveInput {
    pub seats: i32,
    /// One boarding point per seat.
    pub pickup_points: Vec<String>,
    pub payment_method: String,
}

#[derive(Debug, Clone)]
pub struct SuggestPickupInput {
    pub name: String,
    pub description: Option<String>,
    pub lat: f64,
    pub lng: f64,
}

/// Listing row: trip plus the driver's aggregate rating.
#[derive(Debug, Clone)]
pub struct TripWithRating {
    pub trip: Trip,
    pub driver_rating: RatingSummary,
}

/// One row of the driver-only passenger manifest.
#[derive(Debug, Clone)]
pub struct ManifestEntry {
    pub reservation: Reservation,
    pub passenger_name: String,
    pub passenger_phone: String,
    pub passenger_email: String,
}

pub struct TripService {
    repos: Arc<dyn RepositoryProvider>,
    mailer: Arc<dyn EmailSender>,
    rates: TariffRates,
}

impl TripService {
    pub fn new(
        repos: Arc<dyn RepositoryProvider>,
        mailer: Arc<dyn EmailSender>,
        rates: TariffRates,
    ) -> Self {
        Self {
            repos,
            mailer,
            rates,
        }
    }

    pub fn tariff_rates(&self) -> &TariffRates {
        &self.rates
    }

    /// Publish a trip.
    pub async fn create_trip(&self, driver: &User, input: CreateTripInput) -> DomainResult<Trip> {
        let now = Utc::now();

        if !driver.roles.contains(Role::Driver) {
            return Err(DomainError::forbidden("DRIVER_ROLE_REQUIRED"));
        }

        let vehicle_id = input
            .vehicle_id
            .clone()
            .or_else(|| driver.active_vehicle_id.clone())
            .ok_or_else(|| DomainError::validation("VEHICLE_REQUIRED"))?;
        let vehicle = self
            .repos
            .vehicles()
            .find_by_id(&vehicle_id)
            .await?
            .ok_or_else(|| DomainError::not_found("Vehicle", "id", vehicle_id.clone()))?;
        if vehicle.owner_id != driver.id {
            return Err(DomainError::forbidden("NOT_VEHICLE_OWNER"));
        }
        if !vehicle.documents_valid(now) {
            return Err(DomainError::precondition("EXPIRED_DOCUMENT"));
        }

        if input.departure_at <= now {
            return Err(DomainError::validation("DEPARTURE_IN_PAST"));
        }
        if input.seats_total < 1 || input.seats_total > vehicle.capacity {
            return Err(DomainError::validation("INVALID_SEATS"));
        }
        if input.price_per_seat < 0 {
            return Err(DomainError::validation("INVALID_PRICE"));
        }
        if input.suggested_tariff.is_some() {
            self.check_price_band(&input)?;
        }

        // Resolve the request shape.
        let mut pickup_points: Vec<TripPickupPoint> = Vec::new();
        let (origin, destination) = if let (Some(origin_stop_id), Some(destination_stop_id)) = (
            input.origin_stop_id.as_deref(),
            input.destination_stop_id.as_deref(),
        ) {
            if input.route.len() < 2 {
                return Err(DomainError::validation("INVALID_ROUTE"));
            }
            for point in &input.route {
                if !point.in_bounds() {
                    return Err(DomainError::validation("INVALID_COORDINATES"));
                }
            }
            let origin_stop = find_stop(origin_stop_id)
                .ok_or_else(|| DomainError::not_found("Stop", "id", origin_stop_id))?;
            let destination_stop = find_stop(destination_stop_id)
                .ok_or_else(|| DomainError::not_found("Stop", "id", destination_stop_id))?;

            for stop in snap_route_to_stops(&input.route, STOPS) {
                pickup_points.push(TripPickupPoint {
                    id: Uuid::new_v4().to_string(),
                    name: stop.name.to_string(),
                    description: None,
                    lat: stop.lat,
                    lng: stop.lng,
                    source: PickupSource::System,
                    status: PickupPointStatus::Active,
                });
            }
            (
                origin_stop.name.to_string(),
                destination_stop.name.to_string(),
            )
        } else {
            let origin = input
                .origin
                .as_deref()
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .ok_or_else(|| DomainError::validation("MISSING_ORIGIN"))?;
            let destination = input
                .destination
                .as_deref()
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .ok_or_else(|| DomainError::validation("MISSING_DESTINATION"))?;
            (origin.to_string(), destination.to_string())
        };

        for point in input.pickup_points {
            VehiclePickupPoint::validate_coordinates(point.lat, point.lng)?;
            let name = point.name.trim().to_string();
            if name.is_empty() {
                return Err(DomainError::validation("INVALID_PICKUP_POINT"));
            }
            pickup_points.push(TripPickupPoint {
                id: Uuid::new_v4().to_string(),
                name,
                description: point.description,
                lat: point.lat,
                lng: point.lng,
                source: PickupSource::Driver,
                status: PickupPointStatus::Active,
            });
        }

        if let Some(d) = input.distance_km {
            if !(d.is_finite() && d >= 0.0) {
                return Err(DomainError::validation("INVALID_DISTANCE"));
            }
        }
        if let Some(d) = input.duration_minutes {
            if !(d.is_finite() && d >= 0.0) {
                return Err(DomainError::validation("INVALID_DURATION"));
            }
        }

        let trip = Trip {
            id: Uuid::new_v4().to_string(),
            driver_id: driver.id.clone(),
            vehicle_id: vehicle.id.clone(),
            origin,
            destination,
            route_description: input.route_description,
            departure_at: input.departure_at,
            seats_total: input.seats_total,
            seats_available: input.seats_total,
            price_per_seat: input.price_per_seat,
            distance_km: input.distance_km,
            duration_minutes: input.duration_minutes,
            status: TripStatus::Scheduled,
            pickup_points,
            pickup_suggestions: Vec::new(),
            reservations: Vec::new(),
            created_at: now,
            updated_at: now,
        };
        self.repos.trips().insert(trip.clone()).await?;
        info!("trip {} published by driver {}", trip.id, driver.id);
        Ok(trip)
    }

    fn check_price_band(&self, input: &CreateTripInput) -> DomainResult<()> {
        let (Some(distance_km), Some(duration_minutes)) =
            (input.distance_km, input.duration_minutes)
        else {
            return Err(DomainError::validation("TARIFF_INVALID_INPUT"));
        };
        let suggestion = tariff::suggest(
            &self.rates,
            TariffInput {
                distance_km,
                duration_minutes,
                demand_factor: None,
                occupancy: None,
            },
        )?;
        if !suggestion.range.contains(input.price_per_seat) {
            return Err(DomainError::validation("PRICE_OUT_OF_RANGE"));
        }
        Ok(())
    }

    /// `GET /trips` with rating enrichment.
    pub async fn list_trips(&self, filter: &TripFilter) -> DomainResult<Vec<TripWithRating>> {
        let trips = self.repos.trips().list_open(filter).await?;
        let driver_ids: Vec<String> = trips.iter().map(|t| t.driver_id.clone()).collect();
        let ratings = self.repos.ratings().summaries_for_drivers(&driver_ids).await?;
        Ok(trips
            .into_iter()
            .map(|trip| {
                let driver_rating = ratings
                    .get(&trip.driver_id)
                    .copied()
                    .unwrap_or_else(RatingSummary::empty);
                TripWithRating {
                    trip,
                    driver_rating,
                }
            })
            .collect())
    }

    pub async fn get_trip(&self, trip_id: &str) -> DomainResult<Trip> {
        self.repos
            .trips()
            .find_by_id(trip_id)
            .await?
            .ok_or_else(|| DomainError::not_found("Trip", "id", trip_id))
    }

    /// `POST /trips/:id/reservations`: delegates to the conditional update
    /// that is the seat-accounting correctness core.
    pub async fn reserve(
        &self,
        trip_id: &str,
        passenger: &User,
        input: ReserveInput,
    ) -> DomainResult<Trip> {
        if input.seats < 1 {
            return Err(DomainError::validation("INVALID_SEATS"));
        }
        if input.pickup_points.len() != input.seats as usize {
            return Err(DomainError::validation("PICKUP_POINTS_MISMATCH"));
        }
        let payment_method = PaymentMethod::parse(&input.payment_method)
            .ok_or_else(|| DomainError::validation("INVALID_PAYMENT_METHOD"))?;

        let reservation = Reservation {
            id: Uuid::new_v4().to_string(),
            trip_id: trip_id.to_string(),
            passenger_id: passenger.id.clone(),
            seats: input.seats,
            pickup_points: input.pickup_points,
            payment_method,
            status: ReservationStatus::Pending,
            created_at: Utc::now(),
            decision_at: None,
        };
        self.repos.trips().try_reserve(trip_id, reservation).await
    }

    /// Confirm / reject / cancel one reservation.
    pub async fn transition_reservation(
        &self,
        trip_id: &str,
        reservation_id: &str,
        action: ReservationAction,
        caller: &User,
    ) -> DomainResult<(Trip, Reservation)> {
        let trip = self.get_trip(trip_id).await?;
        let reservation = trip
            .reservation(reservation_id)
            .ok_or_else(|| DomainError::not_found("Reservation", "id", reservation_id))?
            .clone();

        let caller_is_driver = caller.id == trip.driver_id;
        let caller_is_passenger = caller.id == reservation.passenger_id;
        match action {
            ReservationAction::Confirm | ReservationAction::Reject => {
                if !caller_is_driver {
                    return Err(DomainError::forbidden("NOT_TRIP_DRIVER"));
                }
            }
            ReservationAction::Cancel => {
                if !caller_is_driver && !caller_is_passenger {
                    return Err(DomainError::forbidden("NOT_RESERVATION_PARTY"));
                }
            }
        }

        match reservation.status.apply(action)? {
            TransitionOutcome::AlreadyFinal => Ok((trip, reservation)),
            TransitionOutcome::Applied {
                next,
                returns_seats,
            } => {
                let decision_at = Utc::now();
                let updated = self
                    .repos
                    .trips()
                    .apply_reservation_transition(
                        trip_id,
                        reservation_id,
                        reservation.status,
                        next,
                        returns_seats,
                        decision_at,
                    )
                    .await?;
                let reservation = updated
                    .reservation(reservation_id)
                    .ok_or_else(|| DomainError::internal("reservation vanished mid-transition"))?
                    .clone();
                Ok((updated, reservation))
            }
        }
    }

    /// `PUT /trips/:id/cancel` with concurrent passenger notification.
    pub async fn cancel_trip(&self, trip_id: &str, caller: &User) -> DomainResult<Trip> {
        let trip = self.get_trip(trip_id).await?;
        if trip.driver_id != caller.id {
            return Err(DomainError::forbidden("NOT_TRIP_DRIVER"));
        }
        match trip.status {
            TripStatus::Cancelled => return Ok(trip),
            TripStatus::Completed => {
                return Err(DomainError::precondition("TRIP_NOT_CANCELLABLE"))
            }
            TripStatus::Scheduled | TripStatus::Full => {}
        }

        let (cancelled, affected) = self.repos.trips().cancel_trip(trip_id).await?;
        self.notify_cancellation(&cancelled, &affected).await;
        Ok(cancelled)
    }

    /// One email per affected passenger, concurrently; failures logged.
    async fn notify_cancellation(&self, trip: &Trip, affected: &[Reservation]) {
        if affected.is_empty() {
            return;
        }
        let passenger_ids: Vec<String> =
            affected.iter().map(|r| r.passenger_id.clone()).collect();
        let passengers = match self.repos.users().find_by_ids(&passenger_ids).await {
            Ok(users) => users,
            Err(e) => {
                warn!("trip {}: could not load passengers to notify: {}", trip.id, e);
                return;
            }
        };

        let sends = passengers.iter().map(|p| {
            let mailer = self.mailer.clone();
            async move {
                let result = mailer
                    .send_trip_cancelled(
                        &p.email,
                        &p.full_name(),
                        &trip.origin,
                        &trip.destination,
                        trip.departure_at,
                    )
                    .await;
                (p.email.clone(), result)
            }
        });
        for (email, result) in join_all(sends).await {
            if let Err(e) = result {
                warn!("trip {}: cancellation email to {} failed: {}", trip.id, email, e);
            }
        }
    }

    /// `POST /trips/:id/pickup-suggestions`.
    pub async fn suggest_pickup(
        &self,
        trip_id: &str,
        passenger: &User,
        input: SuggestPickupInput,
    ) -> DomainResult<PickupSuggestion> {
        let trip = self.get_trip(trip_id).await?;
        if trip.driver_id == passenger.id {
            return Err(DomainError::forbidden("OWN_TRIP"));
        }
        if !trip.status.is_open() {
            return Err(DomainError::precondition("TRIP_NOT_AVAILABLE"));
        }
        if trip.pending_suggestions_by(&passenger.id) >= MAX_PENDING_SUGGESTIONS {
            return Err(DomainError::RateLimited(
                "TOO_MANY_PENDING_SUGGESTIONS".into(),
            ));
        }
        let name = input.name.trim().to_string();
        if name.is_empty() {
            return Err(DomainError::validation("INVALID_PICKUP_POINT"));
        }
        VehiclePickupPoint::validate_coordinates(input.lat, input.lng)?;

        let suggestion = PickupSuggestion {
            id: Uuid::new_v4().to_string(),
            trip_id: trip_id.to_string(),
            passenger_id: passenger.id.clone(),
            name: name.clone(),
            description: input.description.clone(),
            lat: input.lat,
            lng: input.lng,
            status: SuggestionStatus::Pending,
            created_at: Utc::now(),
        };
        let mirrored_point = TripPickupPoint {
            // Shares the suggestion id so resolution can find its mirror.
            id: suggestion.id.clone(),
            name,
            description: input.description,
            lat: input.lat,
            lng: input.lng,
            source: PickupSource::Passenger,
            status: PickupPointStatus::Active,
        };
        self.repos
            .trips()
            .add_suggestion(trip_id, suggestion.clone(), mirrored_point)
            .await?;
        Ok(suggestion)
    }

    /// `PUT /trips/:id/pickup-suggestions/:sid/{accept,reject}`.
    pub async fn resolve_suggestion(
        &self,
        trip_id: &str,
        suggestion_id: &str,
        accept: bool,
        caller: &User,
    ) -> DomainResult<Trip> {
        let trip = self.get_trip(trip_id).await?;
        if trip.driver_id != caller.id {
            return Err(DomainError::forbidden("NOT_TRIP_DRIVER"));
        }
        let suggestion = trip
            .pickup_suggestions
            .iter()
            .find(|s| s.id == suggestion_id)
            .ok_or_else(|| DomainError::not_found("Suggestion", "id", suggestion_id))?;
        if suggestion.status != SuggestionStatus::Pending {
            // Resolved suggestions behave like terminal reservations.
            return Ok(trip);
        }
        self.repos
            .trips()
            .resolve_suggestion(trip_id, suggestion_id, accept)
            .await
    }

    /// Driver-only passenger manifest.
    pub async fn passenger_manifest(
        &self,
        trip_id: &str,
        caller: &User,
    ) -> DomainResult<Vec<ManifestEntry>> {
        let trip = self.get_trip(trip_id).await?;
        if trip.driver_id != caller.id {
            return Err(DomainError::forbidden("NOT_TRIP_DRIVER"));
        }

        let passenger_ids: Vec<String> = trip
            .reservations
            .iter()
            .map(|r| r.passenger_id.clone())
            .collect();
        let passengers = self.repos.users().find_by_ids(&passenger_ids).await?;

        Ok(trip
            .reservations
            .iter()
            .map(|reservation| {
                let passenger = passengers
                    .iter()
                    .find(|p| p.id == reservation.passenger_id);
                ManifestEntry {
                    reservation: reservation.clone(),
                    passenger_name: passenger.map(User::full_name).unwrap_or_default(),
                    passenger_phone: passenger.map(|p| p.phone.clone()).unwrap_or_default(),
                    passenger_email: passenger.map(|p| p.email.clone()).unwrap_or_default(),
                }
            })
            .collect())
    }
}

// ── Tests ──────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use async_trait::async_trait;
    use chrono::Duration;

    use super::*;
    use crate::domain::user::RoleSet;
    use crate::domain::vehicle::{Vehicle, VehicleStatus};
    use crate::domain::DomainError;
    use crate::infrastructure::database::test_support::connect_test_db;
    use crate::infrastructure::database::SeaOrmRepositoryProvider;

    /// Records cancellation emails instead of sending them.
    #[derive(Default)]
    struct RecordingMailer {
        cancellations: Mutex<Vec<String>>,
        fail: bool,
    }

    #[async_trait]
    impl EmailSender for RecordingMailer {
        async fn send_welcome(&self, _to: &str, _first_name: &str) -> DomainResult<()> {
            Ok(())
        }

        async fn send_password_reset(
            &self,
            _to: &str,
            _raw_token: &str,
            _expires_at: DateTime<Utc>,
        ) -> DomainResult<()> {
            Ok(())
        }

        async fn send_trip_cancelled(
            &self,
            to: &str,
            _passenger_name: &str,
            _origin: &str,
            _destination: &str,
            _departure_at: DateTime<Utc>,
        ) -> DomainResult<()> {
            self.cancellations.lock().unwrap().push(to.to_string());
            if self.fail {
                return Err(DomainError::Dependency {
                    code: "EMAIL_DELIVERY_FAILED".into(),
                    provider: "smtp",
                    upstream_status: None,
                });
            }
            Ok(())
        }
    }

    struct Harness {
        service: TripService,
        repos: Arc<dyn RepositoryProvider>,
        mailer: Arc<RecordingMailer>,
        driver: User,
        vehicle: Vehicle,
    }

    fn user(email: &str, driver: bool) -> User {
        let now = Utc::now();
        User {
            id: Uuid::new_v4().to_string(),
            email: email.to_string(),
            password_hash: "hash".into(),
            first_name: "Test".into(),
            last_name: "User".into(),
            university_id: Uuid::new_v4().to_string(),
            phone: "3001112233".into(),
            photo_url: None,
            roles: if driver {
                RoleSet::with_driver()
            } else {
                RoleSet::passenger_only()
            },
            active_role: Role::Passenger,
            active_vehicle_id: None,
            emergency_contact: None,
            preferred_payment_method: PaymentMethod::Cash,
            created_at: now,
            updated_at: now,
        }
    }

    async fn harness_with_mailer(mailer: RecordingMailer) -> Harness {
        let db = connect_test_db().await;
        let repos: Arc<dyn RepositoryProvider> = Arc::new(SeaOrmRepositoryProvider::new(db));
        let mailer = Arc::new(mailer);
        let service = TripService::new(repos.clone(), mailer.clone(), TariffRates::default());

        let now = Utc::now();
        let mut driver = user("driver@unisabana.edu.co", true);
        let vehicle = Vehicle {
            id: Uuid::new_v4().to_string(),
            owner_id: driver.id.clone(),
            plate: "DRV001".into(),
            brand: "Renault".into(),
            model: "Logan".into(),
            capacity: 4,
            year: None,
            color: None,
            vehicle_photo_url: None,
            soat_photo_url: Some("soat.pdf".into()),
            soat_expiration: now + Duration::days(90),
            license_number: "LIC-7".into(),
            license_expiration: now + Duration::days(180),
            license_photo_url: Some("lic.pdf".into()),
            status: VehicleStatus::Verified,
            status_updated_at: now,
            requested_review_at: None,
            reviewed_at: None,
            reviewed_by: None,
            verification_notes: None,
            pickup_points: vec![],
            created_at: now,
            updated_at: now,
        };
        driver.active_vehicle_id = Some(vehicle.id.clone());
        repos.users().insert(driver.clone()).await.unwrap();
        repos.vehicles().insert(vehicle.clone()).await.unwrap();

        Harness {
            service,
            repos,
            mailer,
            driver,
            vehicle,
        }
    }

    async fn harness() -> Harness {
        harness_with_mailer(RecordingMailer::default()).await
    }

    async fn add_passenger(h: &Harness, email: &str) -> User {
        let p = user(email, false);
        h.repos.users().insert(p.clone()).await.unwrap();
        p
    }

    fn legacy_input() -> CreateTripInput {
        CreateTripInput {
            vehicle_id: None,
            origin: Some("Campus Puente del Común".into()),
            destination: Some("Portal Norte".into()),
            origin_stop_id: None,
            destination_stop_id: None,
            route: vec![],
            route_description: None,
            departure_at: Utc::now() + Duration::hours(3),
            seats_total: 3,
            price_per_seat: 5000,
            distance_km: Some(12.0),
            duration_minutes: Some(35.0),
            pickup_points: vec![],
            suggested_tariff: None,
        }
    }

    fn reserve_input(seats: i32) -> ReserveInput {
        ReserveInput {
            seats,
            pickup_points: vec!["Campus".into(); seats as usize],
            payment_method: "cash".into(),
        }
    }

    #[tokio::test]
    async fn create_trip_uses_the_active_vehicle() {
        let h = harness().await;
        let trip = h.service.create_trip(&h.driver, legacy_input()).await.unwrap();
        assert_eq!(trip.vehicle_id, h.vehicle.id);
        assert_eq!(trip.status, TripStatus::Scheduled);
        assert_eq!(trip.seats_available, 3);
    }

    #[tokio::test]
    async fn create_trip_requires_the_driver_role() {
        let h = harness().await;
        let passenger = add_passenger(&h, "p@unisabana.edu.co").await;
        let err = h
            .service
            .create_trip(&passenger, legacy_input())
            .await
            .unwrap_err();
        assert_eq!(err.code(), "DRIVER_ROLE_REQUIRED");
    }

    #[tokio::test]
    async fn create_trip_gates_on_documents_and_bounds() {
        let h = harness().await;

        let mut expired = h.vehicle.clone();
        expired.soat_expiration = Utc::now() - Duration::days(1);
        h.repos.vehicles().update(expired).await.unwrap();
        assert_eq!(
            h.service
                .create_trip(&h.driver, legacy_input())
                .await
                .unwrap_err()
                .code(),
            "EXPIRED_DOCUMENT"
        );

        let mut valid = h.vehicle.clone();
        valid.soat_expiration = Utc::now() + Duration::days(30);
        h.repos.vehicles().update(valid).await.unwrap();

        let mut past = legacy_input();
        past.departure_at = Utc::now() - Duration::minutes(5);
        assert_eq!(
            h.service
                .create_trip(&h.driver, past)
                .await
                .unwrap_err()
                .code(),
            "DEPARTURE_IN_PAST"
        );

        let mut too_many_seats = legacy_input();
        too_many_seats.seats_total = 5; // capacity is 4
        assert_eq!(
            h.service
                .create_trip(&h.driver, too_many_seats)
                .await
                .unwrap_err()
                .code(),
            "INVALID_SEATS"
        );

        let mut negative_price = legacy_input();
        negative_price.price_per_seat = -100;
        assert_eq!(
            h.service
                .create_trip(&h.driver, negative_price)
                .await
                .unwrap_err()
                .code(),
            "INVALID_PRICE"
        );
    }

    #[tokio::test]
    async fn attached_suggestion_enforces_the_price_band() {
        let h = harness().await;

        // 1500 + 350*12 + 80*35 = 8500; ±25% → [6375, 10625].
        let mut in_band = legacy_input();
        in_band.suggested_tariff = Some(8500);
        in_band.price_per_seat = 7000;
        h.service.create_trip(&h.driver, in_band).await.unwrap();

        let mut out_of_band = legacy_input();
        out_of_band.suggested_tariff = Some(8500);
        out_of_band.price_per_seat = 2000;
        assert_eq!(
            h.service
                .create_trip(&h.driver, out_of_band)
                .await
                .unwrap_err()
                .code(),
            "PRICE_OUT_OF_RANGE"
        );
    }

    #[tokio::test]
    async fn stops_shape_snaps_route_onto_known_stops() {
        let h = harness().await;
        let input = CreateTripInput {
            origin: None,
            destination: None,
            origin_stop_id: Some("stop-portal-norte-a".into()),
            destination_stop_id: Some("stop-calle-100".into()),
            route: vec![
                GeoPoint::new(4.7548, -74.0463), // Portal Norte A
                GeoPoint::new(4.7451, -74.0449), // Toberín
                GeoPoint::new(4.6829, -74.0553), // Calle 100
            ],
            ..legacy_input()
        };

        let trip = h.service.create_trip(&h.driver, input).await.unwrap();
        assert_eq!(trip.origin, "Portal Norte - Vagón A");
        assert_eq!(trip.destination, "Calle 100");
        let names: Vec<&str> = trip.pickup_points.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, ["Portal Norte - Vagón A", "Toberín", "Calle 100"]);
        assert!(trip
            .pickup_points
            .iter()
            .all(|p| p.source == PickupSource::System));
    }

    #[tokio::test]
    async fn stops_shape_requires_two_route_points_and_known_stops() {
        let h = harness().await;
        let mut short_route = CreateTripInput {
            origin_stop_id: Some("stop-portal-norte-a".into()),
            destination_stop_id: Some("stop-calle-100".into()),
            route: vec![GeoPoint::new(4.75, -74.04)],
            ..legacy_input()
        };
        short_route.origin = None;
        short_route.destination = None;
        assert_eq!(
            h.service
                .create_trip(&h.driver, short_route)
                .await
                .unwrap_err()
                .code(),
            "INVALID_ROUTE"
        );

        let mut unknown_stop = CreateTripInput {
            origin_stop_id: Some("stop-nowhere".into()),
            destination_stop_id: Some("stop-calle-100".into()),
            route: vec![GeoPoint::new(4.75, -74.04), GeoPoint::new(4.68, -74.05)],
            ..legacy_input()
        };
        unknown_stop.origin = None;
        unknown_stop.destination = None;
        assert_eq!(
            h.service
                .create_trip(&h.driver, unknown_stop)
                .await
                .unwrap_err()
                .code(),
            "STOP_NOT_FOUND"
        );
    }

    #[tokio::test]
    async fn reservation_shape_is_validated_before_the_swap() {
        let h = harness().await;
        let trip = h.service.create_trip(&h.driver, legacy_input()).await.unwrap();
        let p = add_passenger(&h, "p@unisabana.edu.co").await;

        let mut mismatched = reserve_input(2);
        mismatched.pickup_points.pop();
        assert_eq!(
            h.service
                .reserve(&trip.id, &p, mismatched)
                .await
                .unwrap_err()
                .code(),
            "PICKUP_POINTS_MISMATCH"
        );

        let mut bad_payment = reserve_input(1);
        bad_payment.payment_method = "card".into();
        assert_eq!(
            h.service
                .reserve(&trip.id, &p, bad_payment)
                .await
                .unwrap_err()
                .code(),
            "INVALID_PAYMENT_METHOD"
        );
    }

    #[tokio::test]
    async fn reservation_confirm_and_cancel_permissions() {
        let h = harness().await;
        let trip = h.service.create_trip(&h.driver, legacy_input()).await.unwrap();
        let p = add_passenger(&h, "p@unisabana.edu.co").await;
        let other = add_passenger(&h, "other@unisabana.edu.co").await;

        let booked = h.service.reserve(&trip.id, &p, reserve_input(2)).await.unwrap();
        let reservation = booked.active_reservation_for(&p.id).unwrap().clone();

        // Only the driver confirms.
        assert_eq!(
            h.service
                .transition_reservation(
                    &trip.id,
                    &reservation.id,
                    ReservationAction::Confirm,
                    &p
                )
                .await
                .unwrap_err()
                .code(),
            "NOT_TRIP_DRIVER"
        );
        let (_, confirmed) = h
            .service
            .transition_reservation(
                &trip.id,
                &reservation.id,
                ReservationAction::Confirm,
                &h.driver,
            )
            .await
            .unwrap();
        assert_eq!(confirmed.status, ReservationStatus::Confirmed);

        // A third party cannot cancel someone else's reservation.
        assert_eq!(
            h.service
                .transition_reservation(
                    &trip.id,
                    &reservation.id,
                    ReservationAction::Cancel,
                    &other
                )
                .await
                .unwrap_err()
                .code(),
            "NOT_RESERVATION_PARTY"
        );

        // The passenger cancels; seats come back.
        let (after, cancelled) = h
            .service
            .transition_reservation(
                &trip.id,
                &reservation.id,
                ReservationAction::Cancel,
                &p,
            )
            .await
            .unwrap();
        assert_eq!(cancelled.status, ReservationStatus::Cancelled);
        assert_eq!(after.seats_available, 3);

        // Terminal states answer idempotently.
        let (_, repeated) = h
            .service
            .transition_reservation(
                &trip.id,
                &reservation.id,
                ReservationAction::Cancel,
                &p,
            )
            .await
            .unwrap();
        assert_eq!(repeated.status, ReservationStatus::Cancelled);
    }

    #[tokio::test]
    async fn cancel_trip_notifies_every_active_passenger() {
        let h = harness().await;
        let trip = h.service.create_trip(&h.driver, legacy_input()).await.unwrap();
        let p1 = add_passenger(&h, "p1@unisabana.edu.co").await;
        let p2 = add_passenger(&h, "p2@unisabana.edu.co").await;
        h.service.reserve(&trip.id, &p1, reserve_input(1)).await.unwrap();
        h.service.reserve(&trip.id, &p2, reserve_input(1)).await.unwrap();

        let cancelled = h.service.cancel_trip(&trip.id, &h.driver).await.unwrap();
        assert_eq!(cancelled.status, TripStatus::Cancelled);
        assert_eq!(cancelled.seats_available, 0);

        let mut sent = h.mailer.cancellations.lock().unwrap().clone();
        sent.sort();
        assert_eq!(sent, ["p1@unisabana.edu.co", "p2@unisabana.edu.co"]);
    }

    #[tokio::test]
    async fn cancel_trip_survives_email_failures_and_is_idempotent() {
        let h = harness_with_mailer(RecordingMailer {
            cancellations: Mutex::new(Vec::new()),
            fail: true,
        })
        .await;
        let trip = h.service.create_trip(&h.driver, legacy_input()).await.unwrap();
        let p = add_passenger(&h, "p@unisabana.edu.co").await;
        h.service.reserve(&trip.id, &p, reserve_input(1)).await.unwrap();

        // Mail failures are logged, not surfaced.
        let cancelled = h.service.cancel_trip(&trip.id, &h.driver).await.unwrap();
        assert_eq!(cancelled.status, TripStatus::Cancelled);

        // Second cancel: no new notifications, same answer.
        let again = h.service.cancel_trip(&trip.id, &h.driver).await.unwrap();
        assert_eq!(again.status, TripStatus::Cancelled);
        assert_eq!(h.mailer.cancellations.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn only_the_driver_cancels_a_trip() {
        let h = harness().await;
        let trip = h.service.create_trip(&h.driver, legacy_input()).await.unwrap();
        let p = add_passenger(&h, "p@unisabana.edu.co").await;
        assert_eq!(
            h.service.cancel_trip(&trip.id, &p).await.unwrap_err().code(),
            "NOT_TRIP_DRIVER"
        );
    }

    #[tokio::test]
    async fn pickup_suggestions_are_limited_to_three_pending() {
        let h = harness().await;
        let trip = h.service.create_trip(&h.driver, legacy_input()).await.unwrap();
        let p = add_passenger(&h, "p@unisabana.edu.co").await;

        for i in 0..3 {
            h.service
                .suggest_pickup(
                    &trip.id,
                    &p,
                    SuggestPickupInput {
                        name: format!("Punto {}", i),
                        description: None,
                        lat: 4.75,
                        lng: -74.04,
                    },
                )
                .await
                .unwrap();
        }
        let err = h
            .service
            .suggest_pickup(
                &trip.id,
                &p,
                SuggestPickupInput {
                    name: "Punto 4".into(),
                    description: None,
                    lat: 4.75,
                    lng: -74.04,
                },
            )
            .await
            .unwrap_err();
        assert_eq!(err.code(), "TOO_MANY_PENDING_SUGGESTIONS");
        assert!(matches!(err, DomainError::RateLimited(_)));

        // Resolving one frees a slot.
        let t = h.service.get_trip(&trip.id).await.unwrap();
        let sid = t.pickup_suggestions[0].id.clone();
        h.service
            .resolve_suggestion(&trip.id, &sid, true, &h.driver)
            .await
            .unwrap();
        h.service
            .suggest_pickup(
                &trip.id,
                &p,
                SuggestPickupInput {
                    name: "Punto 5".into(),
                    description: None,
                    lat: 4.75,
                    lng: -74.04,
                },
            )
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn drivers_cannot_suggest_on_their_own_trip() {
        let h = harness().await;
        let trip = h.service.create_trip(&h.driver, legacy_input()).await.unwrap();
        let err = h
            .service
            .suggest_pickup(
                &trip.id,
                &h.driver,
                SuggestPickupInput {
                    name: "Mi casa".into(),
                    description: None,
                    lat: 4.75,
                    lng: -74.04,
                },
            )
            .await
            .unwrap_err();
        assert_eq!(err.code(), "OWN_TRIP");
    }

    #[tokio::test]
    async fn suggestion_appends_an_active_passenger_point() {
        let h = harness().await;
        let trip = h.service.create_trip(&h.driver, legacy_input()).await.unwrap();
        let p = add_passenger(&h, "p@unisabana.edu.co").await;

        let suggestion = h
            .service
            .suggest_pickup(
                &trip.id,
                &p,
                SuggestPickupInput {
                    name: "Éxito Calle 170".into(),
                    description: Some("entrada norte".into()),
                    lat: 4.75,
                    lng: -74.04,
                },
            )
            .await
            .unwrap();
        assert_eq!(suggestion.status, SuggestionStatus::Pending);

        let t = h.service.get_trip(&trip.id).await.unwrap();
        let mirrored = t
            .pickup_points
            .iter()
            .find(|pp| pp.id == suggestion.id)
            .unwrap();
        assert_eq!(mirrored.source, PickupSource::Passenger);
        assert_eq!(mirrored.status, PickupPointStatus::Active);
    }

    #[tokio::test]
    async fn manifest_is_driver_only_and_carries_passenger_pii() {
        let h = harness().await;
        let trip = h.service.create_trip(&h.driver, legacy_input()).await.unwrap();
        let p = add_passenger(&h, "p@unisabana.edu.co").await;
        h.service.reserve(&trip.id, &p, reserve_input(2)).await.unwrap();

        assert_eq!(
            h.service
                .passenger_manifest(&trip.id, &p)
                .await
                .unwrap_err()
                .code(),
            "NOT_TRIP_DRIVER"
        );

        let manifest = h.service.passenger_manifest(&trip.id, &h.driver).await.unwrap();
        assert_eq!(manifest.len(), 1);
        assert_eq!(manifest[0].passenger_email, "p@unisabana.edu.co");
        assert_eq!(manifest[0].passenger_name, "Test User");
        assert_eq!(manifest[0].reservation.seats, 2);
    }

    #[tokio::test]
    async fn listing_enriches_with_driver_ratings() {
        let h = harness().await;
        h.service.create_trip(&h.driver, legacy_input()).await.unwrap();

        let rows = h.service.list_trips(&TripFilter::default()).await.unwrap();
        assert_eq!(rows.len(), 1);
        // No ratings written in this core: the aggregate is empty.
        assert_eq!(rows[0].driver_rating.count, 0);
        assert_eq!(rows[0].driver_rating.average, 0.0);
    }
}
