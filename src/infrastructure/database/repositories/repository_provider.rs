//! SeaORM implementation of RepositoryProvider

use sea_orm::DatabaseConnection;

use crate::domain::password_reset::PasswordResetRepository;
use crate::domain::rating::RatingRepository;
use crate::domain::repositories::RepositoryProvider;
use crate::domain::trip::TripRepository;
use crate::domain::user::UserRepository;
use crate::domain::vehicle::VehicleRepository;

use super::password_reset_repository::SeaOrmPasswordResetRepository;
use super::rating_repository::SeaOrmRatingRepository;
use super::trip_repository::SeaOrmTripRepository;
use super::user_repository::SeaOrmUserRepository;
use super::vehicle_repository::SeaOrmVehicleRepository;

/// Unified repository provider backed by SeaORM.
///
/// Holds one connection pool and exposes per-aggregate repository accessors.
pub struct SeaOrmRepositoryProvider {
    users: SeaOrmUserRepository,
    vehicles: SeaOrmVehicleRepository,
    trips: SeaOrmTripRepository,
    password_resets: SeaOrmPasswordResetRepository,
    ratings: SeaOrmRatingRepository,
}

impl SeaOrmRepositoryProvider {
    pub fn new(db: DatabaseConnection) -> Self {
        Self {
            users: SeaOrmUserRepository::new(db.clone()),
            vehicles: SeaOrmVehicleRepository::new(db.clone()),
            trips: SeaOrmTripRepository::new(db.clone()),
            password_resets: SeaOrmPasswordResetRepository::new(db.clone()),
            ratings: SeaOrmRatingRepository::new(db),
        }
    }
}

impl RepositoryProvider for SeaOrmRepositoryProvider {
    fn users(&self) -> &dyn UserRepository {
        &self.users
    }

    fn vehicles(&self) -> &dyn VehicleRepository {
        &self.vehicles
    }

    fn trips(&self) -> &dyn TripRepository {
        &self.trips
    }

    fn password_resets(&self) -> &dyn PasswordResetRepository {
        &self.password_resets
    }

    fn ratings(&self) -> &dyn RatingRepository {
        &self.ratings
    }
}
