//! SeaORM implementation of TripRepository
//!
//! Seat accounting never uses read-then-write: the reservation path is one
//! conditional multi-row update inside a transaction, so concurrent booking
//! attempts serialize on the database and cannot oversell.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use log::debug;
use sea_orm::sea_query::Expr;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, DatabaseTransaction, EntityTrait,
    PaginatorTrait, QueryFilter, QueryOrder, Set, TransactionTrait,
};

use crate::domain::trip::{
    PickupPointStatus, PickupSource, PickupSuggestion, Reservation, ReservationStatus,
    SuggestionStatus, Trip, TripFilter, TripPickupPoint, TripRepository, TripStatus,
};
use crate::domain::user::PaymentMethod;
use crate::domain::{DomainError, DomainResult};
use crate::infrastructure::database::entities::{
    pickup_suggestion, reservation, trip, trip_pickup_point,
};

use super::user_repository::db_err;

const OPEN_STATUSES: [&str; 2] = ["scheduled", "full"];

pub struct SeaOrmTripRepository {
    db: DatabaseConnection,
}

impl SeaOrmTripRepository {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }
}

// ── Conversion helpers ──────────────────────────────────────────

fn reservation_to_domain(m: reservation::Model) -> Reservation {
    Reservation {
        id: m.id,
        trip_id: m.trip_id,
        passenger_id: m.passenger_id,
        seats: m.seats,
        pickup_points: serde_json::from_str(&m.pickup_points).unwrap_or_default(),
        payment_method: PaymentMethod::parse(&m.payment_method).unwrap_or(PaymentMethod::Cash),
        status: ReservationStatus::parse(&m.status).unwrap_or(ReservationStatus::Cancelled),
        created_at: m.created_at,
        decision_at: m.decision_at,
    }
}

fn point_to_domain(m: trip_pickup_point::Model) -> TripPickupPoint {
    TripPickupPoint {
        id: m.id,
        name: m.name,
        description: m.description,
        lat: m.lat,
        lng: m.lng,
        source: PickupSource::parse(&m.source).unwrap_or(PickupSource::Driver),
        status: PickupPointStatus::parse(&m.status).unwrap_or(PickupPointStatus::Active),
    }
}

fn suggestion_to_domain(m: pickup_suggestion::Model) -> PickupSuggestion {
    PickupSuggestion {
        id: m.id,
        trip_id: m.trip_id,
        passenger_id: m.passenger_id,
        name: m.name,
        description: m.description,
        lat: m.lat,
        lng: m.lng,
        status: SuggestionStatus::parse(&m.status).unwrap_or(SuggestionStatus::Rejected),
        created_at: m.created_at,
    }
}

fn model_to_domain(
    m: trip::Model,
    pickup_points: Vec<TripPickupPoint>,
    pickup_suggestions: Vec<PickupSuggestion>,
    reservations: Vec<Reservation>,
) -> Trip {
    Trip {
        id: m.id,
        driver_id: m.driver_id,
        vehicle_id: m.vehicle_id,
        origin: m.origin,
        destination: m.destination,
        route_description: m.route_description,
        departure_at: m.departure_at,
        seats_total: m.seats_total,
        seats_available: m.seats_available,
        price_per_seat: m.price_per_seat,
        distance_km: m.distance_km,
        duration_minutes: m.duration_minutes,
        status: TripStatus::parse(&m.status).unwrap_or(TripStatus::Cancelled),
        pickup_points,
        pickup_suggestions,
        reservations,
        created_at: m.created_at,
        updated_at: m.updated_at,
    }
}

fn reservation_to_active(r: &Reservation) -> reservation::ActiveModel {
    reservation::ActiveModel {
        id: Set(r.id.clone()),
        trip_id: Set(r.trip_id.clone()),
        passenger_id: Set(r.passenger_id.clone()),
        seats: Set(r.seats),
        pickup_points: Set(serde_json::to_string(&r.pickup_points).unwrap_or_else(|_| "[]".into())),
        payment_method: Set(r.payment_method.as_str().to_string()),
        status: Set(r.status.as_str().to_string()),
        created_at: Set(r.created_at),
        decision_at: Set(r.decision_at),
    }
}

fn point_to_active(trip_id: &str, position: i32, p: &TripPickupPoint) -> trip_pickup_point::ActiveModel {
    trip_pickup_point::ActiveModel {
        id: Set(p.id.clone()),
        trip_id: Set(trip_id.to_string()),
        name: Set(p.name.clone()),
        description: Set(p.description.clone()),
        lat: Set(p.lat),
        lng: Set(p.lng),
        source: Set(p.source.as_str().to_string()),
        status: Set(p.status.as_str().to_string()),
        position: Set(position),
    }
}

fn suggestion_to_active(s: &PickupSuggestion) -> pickup_suggestion::ActiveModel {
    pickup_suggestion::ActiveModel {
        id: Set(s.id.clone()),
        trip_id: Set(s.trip_id.clone()),
        passenger_id: Set(s.passenger_id.clone()),
        name: Set(s.name.clone()),
        description: Set(s.description.clone()),
        lat: Set(s.lat),
        lng: Set(s.lng),
        status: Set(s.status.as_str().to_string()),
        created_at: Set(s.created_at),
    }
}

impl SeaOrmTripRepository {
    async fn hydrate(&self, models: Vec<trip::Model>) -> DomainResult<Vec<Trip>> {
        if models.is_empty() {
            return Ok(Vec::new());
        }
        let ids: Vec<String> = models.iter().map(|m| m.id.clone()).collect();

        let mut points: HashMap<String, Vec<TripPickupPoint>> = HashMap::new();
        for m in trip_pickup_point::Entity::find()
            .filter(trip_pickup_point::Column::TripId.is_in(ids.clone()))
            .order_by_asc(trip_pickup_point::Column::Position)
            .all(&self.db)
            .await
            .map_err(db_err)?
        {
            points
                .entry(m.trip_id.clone())
                .or_default()
                .push(point_to_domain(m));
        }

        let mut suggestions: HashMap<String, Vec<PickupSuggestion>> = HashMap::new();
        for m in pickup_suggestion::Entity::find()
            .filter(pickup_suggestion::Column::TripId.is_in(ids.clone()))
            .order_by_asc(pickup_suggestion::Column::CreatedAt)
            .all(&self.db)
            .await
            .map_err(db_err)?
        {
            suggestions
                .entry(m.trip_id.clone())
                .or_default()
                .push(suggestion_to_domain(m));
        }

        let mut reservations: HashMap<String, Vec<Reservation>> = HashMap::new();
        for m in reservation::Entity::find()
            .filter(reservation::Column::TripId.is_in(ids))
            .order_by_asc(reservation::Column::CreatedAt)
            .all(&self.db)
            .await
            .map_err(db_err)?
        {
            reservations
                .entry(m.trip_id.clone())
                .or_default()
                .push(reservation_to_domain(m));
        }

        Ok(models
            .into_iter()
            .map(|m| {
                let id = m.id.clone();
                model_to_domain(
                    m,
                    points.remove(&id).unwrap_or_default(),
                    suggestions.remove(&id).unwrap_or_default(),
                    reservations.remove(&id).unwrap_or_default(),
                )
            })
            .collect())
    }

    async fn require(&self, trip_id: &str) -> DomainResult<Trip> {
        self.find_by_id(trip_id)
            .await?
            .ok_or_else(|| DomainError::not_found("Trip", "id", trip_id))
    }

    /// Re-read after a failed swap and name the precondition that broke.
    async fn diagnose_reserve_failure(
        &self,
        trip_id: &str,
        r: &Reservation,
    ) -> DomainResult<DomainError> {
        let Some(trip) = self.find_by_id(trip_id).await? else {
            return Ok(DomainError::not_found("Trip", "id", trip_id));
        };
        if trip.driver_id == r.passenger_id {
            return Ok(DomainError::precondition("OWN_TRIP"));
        }
        if !trip.status.is_open() {
            return Ok(DomainError::precondition("TRIP_NOT_AVAILABLE"));
        }
        if trip.active_reservation_for(&r.passenger_id).is_some() {
            return Ok(DomainError::conflict("DUPLICATE_RESERVATION"));
        }
        if trip.seats_available < r.seats {
            return Ok(DomainError::precondition("INSUFFICIENT_SEATS"));
        }
        // The swap failed but the re-read looks bookable: a competing write
        // landed in between. The client may simply retry.
        Ok(DomainError::conflict("CONCURRENT_UPDATE"))
    }

    /// `scheduled → full` and back, from the seat counter, inside `txn`.
    async fn normalize_status(txn: &DatabaseTransaction, trip_id: &str) -> DomainResult<()> {
        trip::Entity::update_many()
            .col_expr(trip::Column::Status, Expr::value("full"))
            .filter(trip::Column::Id.eq(trip_id))
            .filter(trip::Column::Status.eq("scheduled"))
            .filter(trip::Column::SeatsAvailable.lte(0))
            .exec(txn)
            .await
            .map_err(db_err)?;
        trip::Entity::update_many()
            .col_expr(trip::Column::Status, Expr::value("scheduled"))
            .filter(trip::Column::Id.eq(trip_id))
            .filter(trip::Column::Status.eq("full"))
            .filter(trip::Column::SeatsAvailable.gt(0))
            .exec(txn)
            .await
            .map_err(db_err)?;
        Ok(())
    }
}

// ── TripRepository impl ─────────────────────────────────────────

#[async_trait]
impl TripRepository for SeaOrmTripRepository {
    async fn insert(&self, t: Trip) -> DomainResult<()> {
        debug!("Inserting trip: {}", t.id);
        let txn = self.db.begin().await.map_err(db_err)?;
        trip::ActiveModel {
            id: Set(t.id.clone()),
            driver_id: Set(t.driver_id.clone()),
            vehicle_id: Set(t.vehicle_id.clone()),
            origin: Set(t.origin.clone()),
            destination: Set(t.destination.clone()),
            route_description: Set(t.route_description.clone()),
            departure_at: Set(t.departure_at),
            seats_total: Set(t.seats_total),
            seats_available: Set(t.seats_available),
            price_per_seat: Set(t.price_per_seat),
            distance_km: Set(t.distance_km),
            duration_minutes: Set(t.duration_minutes),
            status: Set(t.status.as_str().to_string()),
            created_at: Set(t.created_at),
            updated_at: Set(t.updated_at),
        }
        .insert(&txn)
        .await
        .map_err(db_err)?;

        for (i, point) in t.pickup_points.iter().enumerate() {
            point_to_active(&t.id, i as i32, point)
                .insert(&txn)
                .await
                .map_err(db_err)?;
        }
        txn.commit().await.map_err(db_err)?;
        Ok(())
    }

    async fn find_by_id(&self, id: &str) -> DomainResult<Option<Trip>> {
        let model = trip::Entity::find_by_id(id)
            .one(&self.db)
            .await
            .map_err(db_err)?;
        match model {
            Some(model) => Ok(self.hydrate(vec![model]).await?.pop()),
            None => Ok(None),
        }
    }

    async fn list_open(&self, filter: &TripFilter) -> DomainResult<Vec<Trip>> {
        let mut query = trip::Entity::find()
            .filter(trip::Column::Status.is_in(OPEN_STATUSES))
            .order_by_asc(trip::Column::DepartureAt);

        if let Some(fragment) = &filter.departure_point {
            query = query.filter(trip::Column::Origin.contains(fragment));
        }
        if let Some(min_seats) = filter.min_seats {
            query = query.filter(trip::Column::SeatsAvailable.gte(min_seats));
        }
        if let Some(max_price) = filter.max_price {
            query = query.filter(trip::Column::PricePerSeat.lte(max_price));
        }
        if let Some(start) = filter.start_time {
            query = query.filter(trip::Column::DepartureAt.gte(start));
        }
        if let Some(end) = filter.end_time {
            query = query.filter(trip::Column::DepartureAt.lte(end));
        }

        let models = query.all(&self.db).await.map_err(db_err)?;
        self.hydrate(models).await
    }

    async fn has_blocking_trips(
        &self,
        vehicle_id: &str,
        now: DateTime<Utc>,
    ) -> DomainResult<bool> {
        let count = trip::Entity::find()
            .filter(trip::Column::VehicleId.eq(vehicle_id))
            .filter(trip::Column::Status.is_in(OPEN_STATUSES))
            .filter(trip::Column::DepartureAt.gte(now))
            .count(&self.db)
            .await
            .map_err(db_err)?;
        Ok(count > 0)
    }

    async fn try_reserve(&self, trip_id: &str, r: Reservation) -> DomainResult<Trip> {
        let txn = self.db.begin().await.map_err(db_err)?;

        // The compare-and-swap: decrement is applied only while every
        // booking precondition still holds, in one statement.
        let swap = trip::Entity::update_many()
            .col_expr(
                trip::Column::SeatsAvailable,
                Expr::col(trip::Column::SeatsAvailable).sub(r.seats),
            )
            .col_expr(trip::Column::UpdatedAt, Expr::value(Utc::now()))
            .filter(trip::Column::Id.eq(trip_id))
            .filter(trip::Column::SeatsAvailable.gte(r.seats))
            .filter(trip::Column::Status.is_in(OPEN_STATUSES))
            .filter(trip::Column::DriverId.ne(r.passenger_id.as_str()))
            .filter(Expr::cust_with_values(
                "NOT EXISTS (SELECT 1 FROM reservations \
                 WHERE trip_id = ? AND passenger_id = ? \
                 AND status IN ('pending', 'confirmed'))",
                [trip_id, r.passenger_id.as_str()],
            ))
            .exec(&txn)
            .await
            .map_err(db_err)?;

        if swap.rows_affected == 0 {
            txn.rollback().await.map_err(db_err)?;
            return Err(self.diagnose_reserve_failure(trip_id, &r).await?);
        }

        reservation_to_active(&r).insert(&txn).await.map_err(db_err)?;
        Self::normalize_status(&txn, trip_id).await?;
        txn.commit().await.map_err(db_err)?;

        debug!(
            "Reservation {} for {} seats on trip {}",
            r.id, r.seats, trip_id
        );
        self.require(trip_id).await
    }

    async fn apply_reservation_transition(
        &self,
        trip_id: &str,
        reservation_id: &str,
        expected: ReservationStatus,
        next: ReservationStatus,
        returns_seats: bool,
        decision_at: DateTime<Utc>,
    ) -> DomainResult<Trip> {
        let txn = self.db.begin().await.map_err(db_err)?;

        let row = reservation::Entity::find_by_id(reservation_id)
            .filter(reservation::Column::TripId.eq(trip_id))
            .one(&txn)
            .await
            .map_err(db_err)?
            .ok_or_else(|| DomainError::not_found("Reservation", "id", reservation_id))?;
        let seats = row.seats;

        // Guarded by the expected status so two racing transitions cannot
        // both apply (and return seats twice).
        let moved = reservation::Entity::update_many()
            .col_expr(reservation::Column::Status, Expr::value(next.as_str()))
            .col_expr(reservation::Column::DecisionAt, Expr::value(decision_at))
            .filter(reservation::Column::Id.eq(reservation_id))
            .filter(reservation::Column::TripId.eq(trip_id))
            .filter(reservation::Column::Status.eq(expected.as_str()))
            .exec(&txn)
            .await
            .map_err(db_err)?;
        if moved.rows_affected == 0 {
            txn.rollback().await.map_err(db_err)?;
            return Err(DomainError::conflict("RESERVATION_STATE_CHANGED"));
        }

        if returns_seats {
            trip::Entity::update_many()
                .col_expr(
                    trip::Column::SeatsAvailable,
                    Expr::cust_with_values("MIN(seats_total, seats_available + ?)", [seats]),
                )
                .col_expr(trip::Column::UpdatedAt, Expr::value(Utc::now()))
                .filter(trip::Column::Id.eq(trip_id))
                .exec(&txn)
                .await
                .map_err(db_err)?;
        }
        Self::normalize_status(&txn, trip_id).await?;
        txn.commit().await.map_err(db_err)?;

        self.require(trip_id).await
    }

    async fn cancel_trip(&self, trip_id: &str) -> DomainResult<(Trip, Vec<Reservation>)> {
        let txn = self.db.begin().await.map_err(db_err)?;
        let now = Utc::now();

        let active: Vec<Reservation> = reservation::Entity::find()
            .filter(reservation::Column::TripId.eq(trip_id))
            .filter(reservation::Column::Status.is_in(["pending", "confirmed"]))
            .all(&txn)
            .await
            .map_err(db_err)?
            .into_iter()
            .map(reservation_to_domain)
            .collect();

        reservation::Entity::update_many()
            .col_expr(reservation::Column::Status, Expr::value("cancelled"))
            .col_expr(reservation::Column::DecisionAt, Expr::value(now))
            .filter(reservation::Column::TripId.eq(trip_id))
            .filter(reservation::Column::Status.is_in(["pending", "confirmed"]))
            .exec(&txn)
            .await
            .map_err(db_err)?;

        let updated = trip::Entity::update_many()
            .col_expr(trip::Column::Status, Expr::value("cancelled"))
            .col_expr(trip::Column::SeatsAvailable, Expr::value(0))
            .col_expr(trip::Column::UpdatedAt, Expr::value(now))
            .filter(trip::Column::Id.eq(trip_id))
            .exec(&txn)
            .await
            .map_err(db_err)?;
        if updated.rows_affected == 0 {
            txn.rollback().await.map_err(db_err)?;
            return Err(DomainError::not_found("Trip", "id", trip_id));
        }
        txn.commit().await.map_err(db_err)?;

        let trip = self.require(trip_id).await?;
        Ok((trip, active))
    }

    async fn add_pickup_point(&self, trip_id: &str, point: TripPickupPoint) -> DomainResult<()> {
        let position = trip_pickup_point::Entity::find()
            .filter(trip_pickup_point::Column::TripId.eq(trip_id))
            .count(&self.db)
            .await
            .map_err(db_err)? as i32;
        point_to_active(trip_id, position, &point)
            .insert(&self.db)
            .await
            .map_err(db_err)?;
        Ok(())
    }

    async fn add_suggestion(
        &self,
        trip_id: &str,
        suggestion: PickupSuggestion,
        mirrored_point: TripPickupPoint,
    ) -> DomainResult<()> {
        let txn = self.db.begin().await.map_err(db_err)?;
        suggestion_to_active(&suggestion)
            .insert(&txn)
            .await
            .map_err(db_err)?;
        let position = trip_pickup_point::Entity::find()
            .filter(trip_pickup_point::Column::TripId.eq(trip_id))
            .count(&txn)
            .await
            .map_err(db_err)? as i32;
        point_to_active(trip_id, position, &mirrored_point)
            .insert(&txn)
            .await
            .map_err(db_err)?;
        txn.commit().await.map_err(db_err)?;
        Ok(())
    }

    async fn resolve_suggestion(
        &self,
        trip_id: &str,
        suggestion_id: &str,
        accept: bool,
    ) -> DomainResult<Trip> {
        let verdict = if accept { "accepted" } else { "rejected" };
        let txn = self.db.begin().await.map_err(db_err)?;

        let moved = pickup_suggestion::Entity::update_many()
            .col_expr(pickup_suggestion::Column::Status, Expr::value(verdict))
            .filter(pickup_suggestion::Column::Id.eq(suggestion_id))
            .filter(pickup_suggestion::Column::TripId.eq(trip_id))
            .filter(pickup_suggestion::Column::Status.eq("pending"))
            .exec(&txn)
            .await
            .map_err(db_err)?;
        if moved.rows_affected == 0 {
            txn.rollback().await.map_err(db_err)?;
            return Err(DomainError::not_found("Suggestion", "id", suggestion_id));
        }

        if !accept {
            // The mirrored pickup point shares the suggestion id.
            trip_pickup_point::Entity::update_many()
                .col_expr(trip_pickup_point::Column::Status, Expr::value("rejected"))
                .filter(trip_pickup_point::Column::Id.eq(suggestion_id))
                .filter(trip_pickup_point::Column::TripId.eq(trip_id))
                .exec(&txn)
                .await
                .map_err(db_err)?;
        }
        txn.commit().await.map_err(db_err)?;

        self.require(trip_id).await
    }
}

// ── Tests ──────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use chrono::Duration;
    use uuid::Uuid;

    use super::*;
    use crate::domain::user::{PaymentMethod, Role, RoleSet, User};
    use crate::domain::user::UserRepository;
    use crate::domain::vehicle::{Vehicle, VehicleRepository, VehicleStatus};
    use crate::infrastructure::database::repositories::user_repository::SeaOrmUserRepository;
    use crate::infrastructure::database::repositories::vehicle_repository::SeaOrmVehicleRepository;
    use crate::infrastructure::database::test_support::connect_test_db;

    struct Fixture {
        trips: Arc<SeaOrmTripRepository>,
        driver: User,
        vehicle: Vehicle,
    }

    fn user(email: &str) -> User {
        let now = Utc::now();
        User {
            id: Uuid::new_v4().to_string(),
            email: email.to_string(),
            password_hash: "hash".into(),
            first_name: "Test".into(),
            last_name: "User".into(),
            university_id: Uuid::new_v4().to_string(),
            phone: "3001234567".into(),
            photo_url: None,
            roles: RoleSet::with_driver(),
            active_role: Role::Passenger,
            active_vehicle_id: None,
            emergency_contact: None,
            preferred_payment_method: PaymentMethod::Cash,
            created_at: now,
            updated_at: now,
        }
    }

    fn vehicle(owner_id: &str) -> Vehicle {
        let now = Utc::now();
        Vehicle {
            id: Uuid::new_v4().to_string(),
            owner_id: owner_id.to_string(),
            plate: plate(),
            brand: "Toyota".into(),
            model: "Corolla".into(),
            capacity: 4,
            year: Some(2021),
            color: None,
            vehicle_photo_url: None,
            soat_photo_url: Some("soat.pdf".into()),
            soat_expiration: now + Duration::days(90),
            license_number: "LIC-1".into(),
            license_expiration: now + Duration::days(200),
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
        }
    }

    fn plate() -> String {
        // Unique pseudo-plate per call, shaped like AAA123.
        let n = Uuid::new_v4().as_u128() % 1000;
        format!("XYZ{:03}", n)
    }

    fn trip(driver_id: &str, vehicle_id: &str, seats: i32) -> Trip {
        let now = Utc::now();
        Trip {
            id: Uuid::new_v4().to_string(),
            driver_id: driver_id.to_string(),
            vehicle_id: vehicle_id.to_string(),
            origin: "Campus".into(),
            destination: "Portal Norte".into(),
            route_description: None,
            departure_at: now + Duration::hours(3),
            seats_total: seats,
            seats_available: seats,
            price_per_seat: 5000,
            distance_km: Some(12.0),
            duration_minutes: Some(35.0),
            status: TripStatus::Scheduled,
            pickup_points: vec![],
            pickup_suggestions: vec![],
            reservations: vec![],
            created_at: now,
            updated_at: now,
        }
    }

    fn reservation(trip_id: &str, passenger_id: &str, seats: i32) -> Reservation {
        Reservation {
            id: Uuid::new_v4().to_string(),
            trip_id: trip_id.to_string(),
            passenger_id: passenger_id.to_string(),
            seats,
            pickup_points: vec!["Campus".into(); seats as usize],
            payment_method: PaymentMethod::Cash,
            status: ReservationStatus::Pending,
            created_at: Utc::now(),
            decision_at: None,
        }
    }

    async fn fixture() -> Fixture {
        let db = connect_test_db().await;
        let users = SeaOrmUserRepository::new(db.clone());
        let vehicles = SeaOrmVehicleRepository::new(db.clone());

        let driver = user("driver@unisabana.edu.co");
        users.insert(driver.clone()).await.unwrap();
        let vehicle = vehicle(&driver.id);
        vehicles.insert(vehicle.clone()).await.unwrap();

        Fixture {
            trips: Arc::new(SeaOrmTripRepository::new(db.clone())),
            driver,
            vehicle,
        }
    }

    async fn passenger(fx: &Fixture, email: &str) -> User {
        // Fixture keeps one users repo internally is overkill; open a fresh
        // handle on the same pool.
        let p = user(email);
        SeaOrmUserRepository::new(fx.db())
            .insert(p.clone())
            .await
            .unwrap();
        p
    }

    impl Fixture {
        fn db(&self) -> sea_orm::DatabaseConnection {
            self.trips.db.clone()
        }
    }

    #[tokio::test]
    async fn concurrent_reservations_cannot_oversell() {
        let fx = fixture().await;
        let t = trip(&fx.driver.id, &fx.vehicle.id, 3);
        fx.trips.insert(t.clone()).await.unwrap();

        let p1 = passenger(&fx, "p1@unisabana.edu.co").await;
        let p2 = passenger(&fx, "p2@unisabana.edu.co").await;
        let p3 = passenger(&fx, "p3@unisabana.edu.co").await;

        let tasks: Vec<_> = [&p1, &p2, &p3]
            .into_iter()
            .map(|p| {
                let trips = fx.trips.clone();
                let r = reservation(&t.id, &p.id, 2);
                let trip_id = t.id.clone();
                tokio::spawn(async move { trips.try_reserve(&trip_id, r).await })
            })
            .collect();

        let mut successes = 0;
        let mut insufficient = 0;
        for task in tasks {
            match task.await.unwrap() {
                Ok(_) => successes += 1,
                Err(e) => {
                    assert_eq!(e.code(), "INSUFFICIENT_SEATS");
                    insufficient += 1;
                }
            }
        }
        assert_eq!(successes, 1);
        assert_eq!(insufficient, 2);

        let after = fx.trips.find_by_id(&t.id).await.unwrap().unwrap();
        assert_eq!(after.seats_available, 1);
        assert_eq!(after.status, TripStatus::Scheduled);
        assert!(after.seats_conserved());

        // Last seat fills the trip.
        let p4 = passenger(&fx, "p4@unisabana.edu.co").await;
        let full = fx
            .trips
            .try_reserve(&t.id, reservation(&t.id, &p4.id, 1))
            .await
            .unwrap();
        assert_eq!(full.seats_available, 0);
        assert_eq!(full.status, TripStatus::Full);
        assert!(full.seats_conserved());
    }

    #[tokio::test]
    async fn second_active_reservation_is_rejected() {
        let fx = fixture().await;
        let t = trip(&fx.driver.id, &fx.vehicle.id, 4);
        fx.trips.insert(t.clone()).await.unwrap();
        let p = passenger(&fx, "p@unisabana.edu.co").await;

        fx.trips
            .try_reserve(&t.id, reservation(&t.id, &p.id, 1))
            .await
            .unwrap();
        let err = fx
            .trips
            .try_reserve(&t.id, reservation(&t.id, &p.id, 1))
            .await
            .unwrap_err();
        assert_eq!(err.code(), "DUPLICATE_RESERVATION");
    }

    #[tokio::test]
    async fn rebooking_after_rejection_is_allowed() {
        let fx = fixture().await;
        let t = trip(&fx.driver.id, &fx.vehicle.id, 4);
        fx.trips.insert(t.clone()).await.unwrap();
        let p = passenger(&fx, "p@unisabana.edu.co").await;

        let booked = fx
            .trips
            .try_reserve(&t.id, reservation(&t.id, &p.id, 2))
            .await
            .unwrap();
        let first = booked.active_reservation_for(&p.id).unwrap().clone();

        fx.trips
            .apply_reservation_transition(
                &t.id,
                &first.id,
                ReservationStatus::Pending,
                ReservationStatus::Rejected,
                true,
                Utc::now(),
            )
            .await
            .unwrap();

        // The duplicate guard only counts pending/confirmed.
        let again = fx
            .trips
            .try_reserve(&t.id, reservation(&t.id, &p.id, 1))
            .await
            .unwrap();
        assert!(again.active_reservation_for(&p.id).is_some());
        assert!(again.seats_conserved());
    }

    #[tokio::test]
    async fn driver_cannot_book_own_trip() {
        let fx = fixture().await;
        let t = trip(&fx.driver.id, &fx.vehicle.id, 3);
        fx.trips.insert(t.clone()).await.unwrap();

        let err = fx
            .trips
            .try_reserve(&t.id, reservation(&t.id, &fx.driver.id, 1))
            .await
            .unwrap_err();
        assert_eq!(err.code(), "OWN_TRIP");
    }

    #[tokio::test]
    async fn missing_trip_maps_to_not_found() {
        let fx = fixture().await;
        let err = fx
            .trips
            .try_reserve("nope", reservation("nope", "someone", 1))
            .await
            .unwrap_err();
        assert_eq!(err.code(), "TRIP_NOT_FOUND");
    }

    #[tokio::test]
    async fn cancelled_trip_is_not_bookable() {
        let fx = fixture().await;
        let t = trip(&fx.driver.id, &fx.vehicle.id, 3);
        fx.trips.insert(t.clone()).await.unwrap();
        fx.trips.cancel_trip(&t.id).await.unwrap();
        let p = passenger(&fx, "p@unisabana.edu.co").await;

        let err = fx
            .trips
            .try_reserve(&t.id, reservation(&t.id, &p.id, 1))
            .await
            .unwrap_err();
        assert_eq!(err.code(), "TRIP_NOT_AVAILABLE");
    }

    #[tokio::test]
    async fn reject_returns_seats_and_reopens_trip() {
        let fx = fixture().await;
        let t = trip(&fx.driver.id, &fx.vehicle.id, 2);
        fx.trips.insert(t.clone()).await.unwrap();
        let p = passenger(&fx, "p@unisabana.edu.co").await;

        let booked = fx
            .trips
            .try_reserve(&t.id, reservation(&t.id, &p.id, 2))
            .await
            .unwrap();
        assert_eq!(booked.status, TripStatus::Full);
        let r = booked.active_reservation_for(&p.id).unwrap().clone();

        let after = fx
            .trips
            .apply_reservation_transition(
                &t.id,
                &r.id,
                ReservationStatus::Pending,
                ReservationStatus::Rejected,
                true,
                Utc::now(),
            )
            .await
            .unwrap();

        assert_eq!(after.seats_available, 2);
        assert_eq!(after.status, TripStatus::Scheduled);
        let rejected = after.reservation(&r.id).unwrap();
        assert_eq!(rejected.status, ReservationStatus::Rejected);
        assert!(rejected.decision_at.is_some());
        assert!(after.seats_conserved());
    }

    #[tokio::test]
    async fn racing_transitions_apply_once() {
        let fx = fixture().await;
        let t = trip(&fx.driver.id, &fx.vehicle.id, 3);
        fx.trips.insert(t.clone()).await.unwrap();
        let p = passenger(&fx, "p@unisabana.edu.co").await;
        let booked = fx
            .trips
            .try_reserve(&t.id, reservation(&t.id, &p.id, 2))
            .await
            .unwrap();
        let r = booked.active_reservation_for(&p.id).unwrap().clone();

        fx.trips
            .apply_reservation_transition(
                &t.id,
                &r.id,
                ReservationStatus::Pending,
                ReservationStatus::Cancelled,
                true,
                Utc::now(),
            )
            .await
            .unwrap();
        // Second writer loses the guard; seats are not returned twice.
        let err = fx
            .trips
            .apply_reservation_transition(
                &t.id,
                &r.id,
                ReservationStatus::Pending,
                ReservationStatus::Rejected,
                true,
                Utc::now(),
            )
            .await
            .unwrap_err();
        assert_eq!(err.code(), "RESERVATION_STATE_CHANGED");

        let after = fx.trips.find_by_id(&t.id).await.unwrap().unwrap();
        assert_eq!(after.seats_available, 3);
        assert!(after.seats_conserved());
    }

    #[tokio::test]
    async fn cancel_trip_zeroes_seats_and_reports_affected() {
        let fx = fixture().await;
        let t = trip(&fx.driver.id, &fx.vehicle.id, 4);
        fx.trips.insert(t.clone()).await.unwrap();
        let p1 = passenger(&fx, "p1@unisabana.edu.co").await;
        let p2 = passenger(&fx, "p2@unisabana.edu.co").await;
        fx.trips
            .try_reserve(&t.id, reservation(&t.id, &p1.id, 1))
            .await
            .unwrap();
        fx.trips
            .try_reserve(&t.id, reservation(&t.id, &p2.id, 2))
            .await
            .unwrap();

        let (cancelled, affected) = fx.trips.cancel_trip(&t.id).await.unwrap();
        assert_eq!(cancelled.status, TripStatus::Cancelled);
        assert_eq!(cancelled.seats_available, 0);
        assert!(cancelled
            .reservations
            .iter()
            .all(|r| r.status == ReservationStatus::Cancelled));
        let mut names: Vec<&str> = affected.iter().map(|r| r.passenger_id.as_str()).collect();
        names.sort();
        let mut expected = [p1.id.as_str(), p2.id.as_str()];
        expected.sort();
        assert_eq!(names, expected);
    }

    #[tokio::test]
    async fn blocking_trips_gate_vehicle_deletion() {
        let fx = fixture().await;
        let now = Utc::now();
        let t = trip(&fx.driver.id, &fx.vehicle.id, 3);
        fx.trips.insert(t.clone()).await.unwrap();

        assert!(fx
            .trips
            .has_blocking_trips(&fx.vehicle.id, now)
            .await
            .unwrap());
        fx.trips.cancel_trip(&t.id).await.unwrap();
        assert!(!fx
            .trips
            .has_blocking_trips(&fx.vehicle.id, now)
            .await
            .unwrap());
    }

    #[tokio::test]
    async fn list_open_applies_filters_and_order() {
        let fx = fixture().await;
        let mut early = trip(&fx.driver.id, &fx.vehicle.id, 3);
        early.origin = "Campus Puente del Común".into();
        early.departure_at = Utc::now() + Duration::hours(1);
        let mut late = trip(&fx.driver.id, &fx.vehicle.id, 3);
        late.origin = "Chía Centro".into();
        late.departure_at = Utc::now() + Duration::hours(5);
        late.price_per_seat = 9000;
        fx.trips.insert(late.clone()).await.unwrap();
        fx.trips.insert(early.clone()).await.unwrap();

        let all = fx.trips.list_open(&TripFilter::default()).await.unwrap();
        let ids: Vec<&str> = all.iter().map(|t| t.id.as_str()).collect();
        assert_eq!(ids, [early.id.as_str(), late.id.as_str()]);

        let filtered = fx
            .trips
            .list_open(&TripFilter {
                departure_point: Some("Campus".into()),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(filtered.len(), 1);
        assert_eq!(filtered[0].id, early.id);

        let cheap = fx
            .trips
            .list_open(&TripFilter {
                max_price: Some(6000),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(cheap.len(), 1);
        assert_eq!(cheap[0].id, early.id);
    }

    #[tokio::test]
    async fn suggestion_mirror_follows_the_verdict() {
        let fx = fixture().await;
        let t = trip(&fx.driver.id, &fx.vehicle.id, 3);
        fx.trips.insert(t.clone()).await.unwrap();
        let p = passenger(&fx, "p@unisabana.edu.co").await;

        let suggestion = PickupSuggestion {
            id: Uuid::new_v4().to_string(),
            trip_id: t.id.clone(),
            passenger_id: p.id.clone(),
            name: "Éxito Calle 170".into(),
            description: None,
            lat: 4.75,
            lng: -74.04,
            status: SuggestionStatus::Pending,
            created_at: Utc::now(),
        };
        let mirror = TripPickupPoint {
            id: suggestion.id.clone(),
            name: suggestion.name.clone(),
            description: None,
            lat: suggestion.lat,
            lng: suggestion.lng,
            source: PickupSource::Passenger,
            status: PickupPointStatus::Active,
        };
        fx.trips
            .add_suggestion(&t.id, suggestion.clone(), mirror)
            .await
            .unwrap();

        let rejected = fx
            .trips
            .resolve_suggestion(&t.id, &suggestion.id, false)
            .await
            .unwrap();
        assert_eq!(
            rejected.pickup_suggestions[0].status,
            SuggestionStatus::Rejected
        );
        let point = rejected
            .pickup_points
            .iter()
            .find(|pp| pp.id == suggestion.id)
            .unwrap();
        assert_eq!(point.status, PickupPointStatus::Rejected);

        // Already resolved: second verdict finds nothing pending.
        let err = fx
            .trips
            .resolve_suggestion(&t.id, &suggestion.id, true)
            .await
            .unwrap_err();
        assert_eq!(err.code(), "SUGGESTION_NOT_FOUND");
    }
}
