//! Database migrations module

pub use sea_orm_migration::prelude::*;

mod m20240101_000001_create_users;
mod m20240101_000002_create_vehicles;
mod m20240101_000003_create_vehicle_pickup_points;
mod m20240101_000004_create_trips;
mod m20240101_000005_create_trip_pickup_points;
mod m20240101_000006_create_reservations;
mod m20240101_000007_create_pickup_suggestions;
mod m20240101_000008_create_password_resets;
mod m20240101_000009_create_ratings;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20240101_000001_create_users::Migration),
            Box::new(m20240101_000002_create_vehicles::Migration),
            Box::new(m20240101_000003_create_vehicle_pickup_points::Migration),
            Box::new(m20240101_000004_create_trips::Migration),
            Box::new(m20240101_000005_create_trip_pickup_points::Migration),
            Box::new(m20240101_000006_create_reservations::Migration),
            Box::new(m20240101_000007_create_pickup_suggestions::Migration),
            Box::new(m20240101_000008_create_password_resets::Migration),
            Box::new(m20240101_000009_create_ratings::Migration),
        ]
    }
}
