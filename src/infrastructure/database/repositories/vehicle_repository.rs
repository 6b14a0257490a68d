//! SeaORM implementation of VehicleRepository
//!
//! Pickup points are children of the vehicle row and are replaced wholesale
//! on update, matching the API contract.

use async_trait::async_trait;
use log::debug;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, DbErr, EntityTrait, QueryFilter,
    QueryOrder, Set, TransactionTrait,
};

use crate::domain::vehicle::{PickupPoint, Vehicle, VehicleRepository, VehicleStatus};
use crate::domain::{DomainError, DomainResult};
use crate::infrastructure::database::entities::{vehicle, vehicle_pickup_point};

use super::user_repository::db_err;

pub struct SeaOrmVehicleRepository {
    db: DatabaseConnection,
}

impl SeaOrmVehicleRepository {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    async fn load_points(&self, vehicle_id: &str) -> DomainResult<Vec<PickupPoint>> {
        let models = vehicle_pickup_point::Entity::find()
            .filter(vehicle_pickup_point::Column::VehicleId.eq(vehicle_id))
            .order_by_asc(vehicle_pickup_point::Column::Position)
            .all(&self.db)
            .await
            .map_err(db_err)?;
        Ok(models.into_iter().map(point_to_domain).collect())
    }
}

// ── Conversion helpers ──────────────────────────────────────────

fn point_to_domain(m: vehicle_pickup_point::Model) -> PickupPoint {
    PickupPoint {
        id: m.id,
        name: m.name,
        description: m.description,
        lat: m.lat,
        lng: m.lng,
    }
}

fn model_to_domain(m: vehicle::Model, pickup_points: Vec<PickupPoint>) -> Vehicle {
    Vehicle {
        id: m.id,
        owner_id: m.owner_id,
        plate: m.plate,
        brand: m.brand,
        model: m.model,
        capacity: m.capacity,
        year: m.year,
        color: m.color,
        vehicle_photo_url: m.vehicle_photo_url,
        soat_photo_url: m.soat_photo_url,
        soat_expiration: m.soat_expiration,
        license_number: m.license_number,
        license_expiration: m.license_expiration,
        license_photo_url: m.license_photo_url,
        status: VehicleStatus::parse(&m.status).unwrap_or(VehicleStatus::Pending),
        status_updated_at: m.status_updated_at,
        requested_review_at: m.requested_review_at,
        reviewed_at: m.reviewed_at,
        reviewed_by: m.reviewed_by,
        verification_notes: m.verification_notes,
        pickup_points,
        created_at: m.created_at,
        updated_at: m.updated_at,
    }
}

fn domain_to_active(v: &Vehicle) -> vehicle::ActiveModel {
    vehicle::ActiveModel {
        id: Set(v.id.clone()),
        owner_id: Set(v.owner_id.clone()),
        plate: Set(v.plate.clone()),
        brand: Set(v.brand.clone()),
        model: Set(v.model.clone()),
        capacity: Set(v.capacity),
        year: Set(v.year),
        color: Set(v.color.clone()),
        vehicle_photo_url: Set(v.vehicle_photo_url.clone()),
        soat_photo_url: Set(v.soat_photo_url.clone()),
        soat_expiration: Set(v.soat_expiration),
        license_number: Set(v.license_number.clone()),
        license_expiration: Set(v.license_expiration),
        license_photo_url: Set(v.license_photo_url.clone()),
        status: Set(v.status.as_str().to_string()),
        status_updated_at: Set(v.status_updated_at),
        requested_review_at: Set(v.requested_review_at),
        reviewed_at: Set(v.reviewed_at),
        reviewed_by: Set(v.reviewed_by.clone()),
        verification_notes: Set(v.verification_notes.clone()),
        created_at: Set(v.created_at),
        updated_at: Set(v.updated_at),
    }
}

fn point_to_active(
    vehicle_id: &str,
    position: i32,
    p: &PickupPoint,
) -> vehicle_pickup_point::ActiveModel {
    vehicle_pickup_point::ActiveModel {
        id: Set(p.id.clone()),
        vehicle_id: Set(vehicle_id.to_string()),
        name: Set(p.name.clone()),
        description: Set(p.description.clone()),
        lat: Set(p.lat),
        lng: Set(p.lng),
        position: Set(position),
    }
}

fn insert_err(e: DbErr) -> DomainError {
    if e.to_string().contains("vehicles.plate") {
        DomainError::conflict("DUPLICATE_PLATE")
    } else {
        db_err(e)
    }
}

// ── VehicleRepository impl ──────────────────────────────────────

#[async_trait]
impl VehicleRepository for SeaOrmVehicleRepository {
    async fn insert(&self, v: Vehicle) -> DomainResult<()> {
        debug!("Inserting vehicle: {}", v.plate);
        let txn = self.db.begin().await.map_err(db_err)?;
        domain_to_active(&v).insert(&txn).await.map_err(insert_err)?;
        for (i, point) in v.pickup_points.iter().enumerate() {
            point_to_active(&v.id, i as i32, point)
                .insert(&txn)
                .await
                .map_err(db_err)?;
        }
        txn.commit().await.map_err(db_err)?;
        Ok(())
    }

    async fn find_by_id(&self, id: &str) -> DomainResult<Option<Vehicle>> {
        let model = vehicle::Entity::find_by_id(id)
            .one(&self.db)
            .await
            .map_err(db_err)?;
        match model {
            Some(model) => {
                let points = self.load_points(&model.id).await?;
                Ok(Some(model_to_domain(model, points)))
            }
            None => Ok(None),
        }
    }

    async fn find_by_plate(&self, plate: &str) -> DomainResult<Option<Vehicle>> {
        let model = vehicle::Entity::find()
            .filter(vehicle::Column::Plate.eq(plate))
            .one(&self.db)
            .await
            .map_err(db_err)?;
        match model {
            Some(model) => {
                let points = self.load_points(&model.id).await?;
                Ok(Some(model_to_domain(model, points)))
            }
            None => Ok(None),
        }
    }

    async fn find_by_owner(&self, owner_id: &str) -> DomainResult<Vec<Vehicle>> {
        let models = vehicle::Entity::find()
            .filter(vehicle::Column::OwnerId.eq(owner_id))
            .order_by_asc(vehicle::Column::CreatedAt)
            .all(&self.db)
            .await
            .map_err(db_err)?;
        let mut vehicles = Vec::with_capacity(models.len());
        for model in models {
            let points = self.load_points(&model.id).await?;
            vehicles.push(model_to_domain(model, points));
        }
        Ok(vehicles)
    }

    async fn update(&self, v: Vehicle) -> DomainResult<()> {
        debug!("Updating vehicle: {}", v.id);
        let existing = vehicle::Entity::find_by_id(&v.id)
            .one(&self.db)
            .await
            .map_err(db_err)?;
        if existing.is_none() {
            return Err(DomainError::not_found("Vehicle", "id", v.id));
        }

        let txn = self.db.begin().await.map_err(db_err)?;
        domain_to_active(&v).update(&txn).await.map_err(insert_err)?;
        vehicle_pickup_point::Entity::delete_many()
            .filter(vehicle_pickup_point::Column::VehicleId.eq(&v.id))
            .exec(&txn)
            .await
            .map_err(db_err)?;
        for (i, point) in v.pickup_points.iter().enumerate() {
            point_to_active(&v.id, i as i32, point)
                .insert(&txn)
                .await
                .map_err(db_err)?;
        }
        txn.commit().await.map_err(db_err)?;
        Ok(())
    }

    async fn delete(&self, id: &str) -> DomainResult<()> {
        let result = vehicle::Entity::delete_by_id(id)
            .exec(&self.db)
            .await
            .map_err(db_err)?;
        if result.rows_affected == 0 {
            return Err(DomainError::not_found("Vehicle", "id", id));
        }
        Ok(())
    }
}
