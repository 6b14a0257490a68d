//! SeaORM entities

pub mod password_reset;
pub mod pickup_suggestion;
pub mod rating;
pub mod reservation;
pub mod trip;
pub mod trip_pickup_point;
pub mod user;
pub mod vehicle;
pub mod vehicle_pickup_point;
