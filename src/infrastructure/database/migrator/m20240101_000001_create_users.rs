//! Create users table

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Users::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Users::Id).string().not_null().primary_key())
                    .col(
                        ColumnDef::new(Users::Email)
                            .string()
                            .not_null()
                            .unique_key(),
                    )
                    .col(ColumnDef::new(Users::PasswordHash).string().not_null())
                    .col(ColumnDef::new(Users::FirstName).string().not_null())
                    .col(ColumnDef::new(Users::LastName).string().not_null())
                    .col(
                        ColumnDef::new(Users::UniversityId)
                            .string()
                            .not_null()
                            .unique_key(),
                    )
                    .col(ColumnDef::new(Users::Phone).string().not_null())
                    .col(ColumnDef::new(Users::PhotoUrl).string())
                    .col(
                        ColumnDef::new(Users::Roles)
                            .string()
                            .not_null()
                            .default("passenger"),
                    )
                    .col(
                        ColumnDef::new(Users::ActiveRole)
                            .string()
                            .not_null()
                            .default("passenger"),
                    )
                    .col(ColumnDef::new(Users::ActiveVehicleId).string())
                    .col(ColumnDef::new(Users::EmergencyContact).string())
                    .col(
                        ColumnDef::new(Users::PreferredPaymentMethod)
                            .string()
                            .not_null()
                            .default("cash"),
                    )
                    .col(
                        ColumnDef::new(Users::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Users::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Users::Table).to_owned())
            .await
    }
}

#[derive(Iden)]
pub enum Users {
    Table,
    Id,
    Email,
    PasswordHash,
    FirstName,
    LastName,
    UniversityId,
    Phone,
    PhotoUrl,
    Roles,
    ActiveRole,
    ActiveVehicleId,
    EmergencyContact,
    PreferredPaymentMethod,
    CreatedAt,
    UpdatedAt,
}
