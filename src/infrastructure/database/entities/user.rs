//! User entity for database

use chrono::{DateTime, Utc};
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// User model
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "users")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    #[sea_orm(unique)]
    pub email: String,
    pub password_hash: String,
    pub first_name: String,
    pub last_name: String,
    #[sea_orm(unique)]
    pub university_id: String,
    pub phone: String,
    #[sea_orm(nullable)]
    pub photo_url: Option<String>,
    /// Comma-separated role set, e.g. "passenger,driver"
    pub roles: String,
    pub active_role: String,
    #[sea_orm(nullable)]
    pub active_vehicle_id: Option<String>,
    #[sea_orm(nullable)]
    pub emergency_contact: Option<String>,
    pub preferred_payment_method: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::vehicle::Entity")]
    Vehicles,
}

impl Related<super::vehicle::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Vehicles.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
