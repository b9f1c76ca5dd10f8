//! Create `linked_provider` table: federated identities attached to a
//! canonical user. One row per (user, provider, subject) triple.
use sea_orm_migration::{prelude::*, schema::*};

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(LinkedProvider::Table)
                    .if_not_exists()
                    .col(uuid(LinkedProvider::Id).primary_key())
                    .col(string_len(LinkedProvider::UserId, 128).not_null())
                    .col(string_len(LinkedProvider::ProviderName, 64).not_null())
                    .col(string_len(LinkedProvider::ProviderSubjectId, 255).not_null())
                    .col(timestamp_with_time_zone(LinkedProvider::LinkedAt).not_null())
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_linked_provider_user")
                            .from(LinkedProvider::Table, LinkedProvider::UserId)
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
            .drop_table(Table::drop().table(LinkedProvider::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum LinkedProvider {
    Table,
    Id,
    UserId,
    ProviderName,
    ProviderSubjectId,
    LinkedAt,
}

#[derive(DeriveIden)]
enum CanonicalUser { Table, Id }
