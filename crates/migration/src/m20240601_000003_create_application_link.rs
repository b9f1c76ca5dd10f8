//! Create `application_link` table recording which applications a canonical
//! user registered under.
use sea_orm_migration::{prelude::*, schema::*};

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(ApplicationLink::Table)
                    .if_not_exists()
                    .col(uuid(ApplicationLink::Id).primary_key())
                    .col(string_len(ApplicationLink::UserId, 128).not_null())
                    .col(string_len(ApplicationLink::ApplicationId, 128).not_null())
                    .col(timestamp_with_time_zone(ApplicationLink::CreatedAt).not_null())
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_application_link_user")
                            .from(ApplicationLink::Table, ApplicationLink::UserId)
                            .to(CanonicalUser::Table, CanonicalUser::Id)
                            .on_delete(ForeignKeyAction::Cascade)
                            .on_update(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(ApplicationLink::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum ApplicationLink { Table, Id, UserId, ApplicationId, CreatedAt }

#[derive(DeriveIden)]
enum CanonicalUser { Table, Id }
