//! Vehicle entity

use chrono::{DateTime, Utc};
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "vehicles")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    pub owner_id: String,
    #[sea_orm(unique)]
    pub plate: String,
    pub brand: String,
    pub model: String,
    pub capacity: i32,
    #[sea_orm(nullable)]
    pub year: Option<i32>,
    #[sea_orm(nullable)]
    pub color: Option<String>,
    #[sea_orm(nullable)]
    pub vehicle_photo_url: Option<String>,
    #[sea_orm(nullable)]
    pub soat_photo_url: Option<String>,
    pub soat_expiration: DateTime<Utc>,
    pub license_number: String,
    pub license_expiration: DateTime<Utc>,
    #[sea_orm(nullable)]
    pub license_photo_url: Option<String>,

    /// Review status: pending, under_review, verified, rejected, needs_update
    pub status: String,
    pub status_updated_at: DateTime<Utc>,
    #[sea_orm(nullable)]
    pub requested_review_at: Option<DateTime<Utc>>,
    #[sea_orm(nullable)]
    pub reviewed_at: Option<DateTime<Utc>>,
    #[sea_orm(nullable)]
    pub reviewed_by: Option<String>,
    #[sea_orm(nullable)]
    pub verification_notes: Option<String>,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::user::Entity",
        from = "Column::OwnerId",
        to = "super::user::Column::Id"
    )]
    Owner,
    #[sea_orm(has_many = "super::vehicle_pickup_point::Entity")]
    PickupPoints,
}

impl Related<super::user::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Owner.def()
    }
}

impl Related<super::vehicle_pickup_point::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::PickupPoints.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
