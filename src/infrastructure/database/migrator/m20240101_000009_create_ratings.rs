//! Create ratings table
//!
//! Populated outside this core; queried for driver aggregates.

use sea_orm_migration::prelude::*;

use super::m20240101_000001_create_users::Users;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Ratings::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Ratings::Id)
                            .string()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Ratings::DriverId).string().not_null())
                    .col(ColumnDef::new(Ratings::PassengerId).string().not_null())
                    .col(ColumnDef::new(Ratings::Score).integer().not_null())
                    .col(ColumnDef::new(Ratings::Comment).string())
                    .col(
                        ColumnDef::new(Ratings::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_ratings_driver")
                            .from(Ratings::Table, Ratings::DriverId)
                            .to(Users::Table, Users::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_ratings_driver")
                    .table(Ratings::Table)
                    .col(Ratings::DriverId)
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Ratings::Table).to_owned())
            .await
    }
}

#[derive(Iden)]
pub enum Ratings {
    Table,
    Id,
    DriverId,
    PassengerId,
    Score,
    Comment,
    CreatedAt,
}
