//! Trip entity

use chrono::{DateTime, Utc};
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "trips")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    pub driver_id: String,
    pub vehicle_id: String,
    pub origin: String,
    pub destination: String,
    #[sea_orm(nullable)]
    pub route_description: Option<String>,
    pub departure_at: DateTime<Utc>,
    pub seats_total: i32,
    /// Kept consistent with active reservations by conditional updates only
    pub seats_available: i32,
    /// COP per seat
    pub price_per_seat: i64,
    #[sea_orm(nullable)]
    pub distance_km: Option<f64>,
    #[sea_orm(nullable)]
    pub duration_minutes: Option<f64>,
    /// scheduled, full, cancelled, completed
    pub status: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::user::Entity",
        from = "Column::DriverId",
        to = "super::user::Column::Id"
    )]
    Driver,
    #[sea_orm(
        belongs_to = "super::vehicle::Entity",
        from = "Column::VehicleId",
        to = "super::vehicle::Column::Id"
    )]
    Vehicle,
    #[sea_orm(has_many = "super::reservation::Entity")]
    Reservations,
}

impl Related<super::reservation::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Reservations.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
