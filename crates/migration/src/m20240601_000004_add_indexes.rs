use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        // CanonicalUser: lookup by email
        manager
            .create_index(
                Index::create()
                    .name("idx_canonical_user_email")
                    .table(CanonicalUser::Table)
                    .col(CanonicalUser::Email)
                    .to_owned(),
            )
            .await?;

        // LinkedProvider: composite unique (user_id, provider_name, provider_subject_id)
        manager
            .create_index(
                Index::create()
                    .name("uniq_linked_provider_user_provider_subject")
                    .table(LinkedProvider::Table)
                    .col(LinkedProvider::UserId)
                    .col(LinkedProvider::ProviderName)
                    .col(LinkedProvider::ProviderSubjectId)
                    .unique()
                    .to_owned(),
            )
            .await?;

        // ApplicationLink: composite unique (user_id, application_id)
        manager
            .create_index(
                Index::create()
                    .name("uniq_application_link_user_application")
                    .table(ApplicationLink::Table)
                    .col(ApplicationLink::UserId)
                    .col(ApplicationLink::ApplicationId)
                    .unique()
                    .to_owned(),
            )
            .await?;
        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_index(Index::drop().name("uniq_application_link_user_application").table(ApplicationLink::Table).to_owned())
            .await?;
        manager
            .drop_index(Index::drop().name("uniq_linked_provider_user_provider_subject").table(LinkedProvider::Table).to_owned())
            .await?;
        manager
            .drop_index(Index::drop().name("idx_canonical_user_email").table(CanonicalUser::Table).to_owned())
            .await?;
        Ok(())
    }
}

#[derive(DeriveIden)]
enum CanonicalUser { Table, Email }

#[derive(DeriveIden)]
enum LinkedProvider { Table, UserId, ProviderName, ProviderSubjectId }

#[derive(DeriveIden)]
enum ApplicationLink { Table, UserId, ApplicationId }
