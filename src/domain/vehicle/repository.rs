//! Vehicle repository interface

use async_trait::async_trait;

use super::model::Vehicle;
use crate::domain::DomainResult;

#[async_trait]
pub trait VehicleRepository: Send + Sync {
    /// Insert a new vehicle. Fails with `Conflict` on a duplicate plate.
    async fn insert(&self, vehicle: Vehicle) -> DomainResult<()>;

    async fn find_by_id(&self, id: &str) -> DomainResult<Option<Vehicle>>;

    async fn find_by_plate(&self, plate: &str) -> DomainResult<Option<Vehicle>>;

    /// All vehicles of one owner, oldest first.
    async fn find_by_owner(&self, owner_id: &str) -> DomainResult<Vec<Vehicle>>;

    /// Persist every mutable field, including the pickup-point list, which
    /// replaces the stored one wholesale.
    async fn update(&self, vehicle: Vehicle) -> DomainResult<()>;

    async fn delete(&self, id: &str) -> DomainResult<()>;
}
