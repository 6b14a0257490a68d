//! Create trip_pickup_points table

use sea_orm_migration::prelude::*;

use super::m20240101_000004_create_trips::Trips;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(TripPickupPoints::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(TripPickupPoints::Id)
                            .string()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(TripPickupPoints::TripId).string().not_null())
                    .col(ColumnDef::new(TripPickupPoints::Name).string().not_null())
                    .col(ColumnDef::new(TripPickupPoints::Description).string())
                    .col(ColumnDef::new(TripPickupPoints::Lat).double().not_null())
                    .col(ColumnDef::new(TripPickupPoints::Lng).double().not_null())
                    .col(ColumnDef::new(TripPickupPoints::Source).string().not_null())
                    .col(
                        ColumnDef::new(TripPickupPoints::Status)
                            .string()
                            .not_null()
                            .default("active"),
                    )
                    .col(
                        ColumnDef::new(TripPickupPoints::Position)
                            .integer()
                            .not_null()
                            .default(0),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_trip_pickup_points_trip")
                            .from(TripPickupPoints::Table, TripPickupPoints::TripId)
                            .to(Trips::Table, Trips::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_trip_pickup_points_trip")
                    .table(TripPickupPoints::Table)
                    .col(TripPickupPoints::TripId)
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(TripPickupPoints::Table).to_owned())
            .await
    }
}

#[derive(Iden)]
pub enum TripPickupPoints {
    Table,
    Id,
    TripId,
    Name,
    Description,
    Lat,
    Lng,
    Source,
    Status,
    Position,
}
