//! Create pickup_suggestions table

use sea_orm_migration::prelude::*;

use super::m20240101_000001_create_users::Users;
use super::m20240101_000004_create_trips::Trips;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(PickupSuggestions::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(PickupSuggestions::Id)
                            .string()
                            .not_null()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(PickupSuggestions::TripId)
                            .string()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(PickupSuggestions::PassengerId)
                            .string()
                            .not_null(),
                    )
                    .col(ColumnDef::new(PickupSuggestions::Name).string().not_null())
                    .col(ColumnDef::new(PickupSuggestions::Description).string())
                    .col(ColumnDef::new(PickupSuggestions::Lat).double().not_null())
                    .col(ColumnDef::new(PickupSuggestions::Lng).double().not_null())
                    .col(
                        ColumnDef::new(PickupSuggestions::Status)
                            .string()
                            .not_null()
                            .default("pending"),
                    )
                    .col(
                        ColumnDef::new(PickupSuggestions::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_pickup_suggestions_trip")
                            .from(PickupSuggestions::Table, PickupSuggestions::TripId)
                            .to(Trips::Table, Trips::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_pickup_suggestions_passenger")
                            .from(PickupSuggestions::Table, PickupSuggestions::PassengerId)
                            .to(Users::Table, Users::Id),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_pickup_suggestions_trip_passenger")
                    .table(PickupSuggestions::Table)
                    .col(PickupSuggestions::TripId)
                    .col(PickupSuggestions::PassengerId)
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(PickupSuggestions::Table).to_owned())
            .await
    }
}

#[derive(Iden)]
pub enum PickupSuggestions {
    Table,
    Id,
    TripId,
    PassengerId,
    Name,
    Description,
    Lat,
    Lng,
    Status,
    CreatedAt,
}
