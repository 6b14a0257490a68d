//! Reservation entity

use chrono::{DateTime, Utc};
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "reservations")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    pub trip_id: String,
    pub passenger_id: String,
    pub seats: i32,
    /// JSON array of boarding point names, one per seat
    pub pickup_points: String,
    /// cash or nequi
    pub payment_method: String,
    /// pending, confirmed, rejected, cancelled
    pub status: String,
    pub created_at: DateTime<Utc>,
    #[sea_orm(nullable)]
    pub decision_at: Option<DateTime<Utc>>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::trip::Entity",
        from = "Column::TripId",
        to = "super::trip::Column::Id"
    )]
    Trip,
    #[sea_orm(
        belongs_to = "super::user::Entity",
        from = "Column::PassengerId",
        to = "super::user::Column::Id"
    )]
    Passenger,
}

impl Related<super::trip::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Trip.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
