//! Create `canonical_user` table.
//!
//! One row per canonical identity. Email is indexed but deliberately not
//! unique: uniqueness comes from lookup-before-create in the resolver.
use sea_orm_migration::{prelude::*, schema::*};

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(CanonicalUser::Table)
                    .if_not_exists()
                    .col(string_len(CanonicalUser::Id, 128).primary_key())
                    .col(string_len(CanonicalUser::Email, 255).not_null())
                    .col(
                        ColumnDef::new(CanonicalUser::DisplayName)
                            .string_len(128)
                            .null(),
                    )
                    .col(
                        ColumnDef::new(CanonicalUser::PhoneNumber)
                            .string_len(32)
                            .null(),
                    )
                    .col(timestamp_with_time_zone(CanonicalUser::CreatedAt).not_null())
                    .col(timestamp_with_time_zone(CanonicalUser::UpdatedAt).not_null())
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager.drop_table(Table::drop().table(CanonicalUser::Table).to_owned()).await
    }
}

#[derive(DeriveIden)]
enum CanonicalUser { Table, Id, Email, DisplayName, PhoneNumber, CreatedAt, UpdatedAt }
