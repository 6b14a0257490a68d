//! SeaORM repository implementations

pub mod password_reset_repository;
pub mod rating_repository;
pub mod repository_provider;
pub mod trip_repository;
pub mod user_repository;
pub mod vehicle_repository;

pub use repository_provider::SeaOrmRepositoryProvider;
