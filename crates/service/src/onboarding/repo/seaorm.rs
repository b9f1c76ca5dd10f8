use std::collections::BTreeSet;

use sea_orm::DatabaseConnection;
use tracing::debug;

use crate::onboarding::domain::{CanonicalUser, LinkedProvider, NewRegistration};
use crate::onboarding::errors::OnboardingError;
use crate::onboarding::repository::{CredentialStore, UserLookup};
use models::{application_link, canonical_user, linked_provider};

/// Postgres-backed store over the `canonical_user`, `linked_provider` and
/// `application_link` tables.
pub struct SeaOrmCredentialStore {
    pub db: DatabaseConnection,
}

impl SeaOrmCredentialStore {
    pub fn new(db: DatabaseConnection) -> Self { Self { db } }

    async fn hydrate(&self, row: canonical_user::Model) -> Result<CanonicalUser, OnboardingError> {
        let linked_providers: BTreeSet<LinkedProvider> = linked_provider::list_for_user(&self.db, &row.id)
            .await?
            .into_iter()
            .map(|p| LinkedProvider::new(p.provider_name, p.provider_subject_id))
            .collect();
        let application_links: BTreeSet<String> = application_link::list_for_user(&self.db, &row.id)
            .await?
            .into_iter()
            .map(|a| a.application_id)
            .collect();
        Ok(CanonicalUser {
            user_id: row.id,
            email: row.email,
            display_name: row.display_name,
            phone_number: row.phone_number,
            linked_providers,
            application_links,
        })
    }
}

#[async_trait::async_trait]
impl UserLookup for SeaOrmCredentialStore {
    async fn find_by_email(&self, email: &str) -> Result<Option<CanonicalUser>, OnboardingError> {
        match canonical_user::find_by_email(&self.db, email).await? {
            Some(row) => Ok(Some(self.hydrate(row).await?)),
            None => Ok(None),
        }
    }
}

#[async_trait::async_trait]
impl CredentialStore for SeaOrmCredentialStore {
    async fn link_provider(&self, user_id: &str, provider: &LinkedProvider) -> Result<bool, OnboardingError> {
        // NotFound surfaces as UserNotFound
        canonical_user::get_by_id(&self.db, user_id).await?;
        let linked = linked_provider::link(&self.db, user_id, &provider.provider_name, &provider.provider_subject_id).await?;
        Ok(linked)
    }

    async fn create_or_get_user(&self, registration: &NewRegistration, application_id: &str) -> Result<CanonicalUser, OnboardingError> {
        let row = match canonical_user::find_by_id(&self.db, &registration.user_id).await? {
            Some(existing) => {
                debug!(user_id = %existing.id, "canonical user already materialised");
                existing
            }
            None => {
                canonical_user::create(
                    &self.db,
                    &registration.user_id,
                    &registration.email,
                    registration.display_name.as_deref(),
                    registration.phone_number.as_deref(),
                )
                .await?
            }
        };
        if let Some(provider) = &registration.provider {
            linked_provider::link(&self.db, &row.id, &provider.provider_name, &provider.provider_subject_id).await?;
        }
        application_link::ensure(&self.db, &row.id, application_id).await?;
        self.hydrate(row).await
    }
}
