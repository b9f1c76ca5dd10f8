use async_trait::async_trait;

use super::domain::{CanonicalUser, LinkedProvider, NewRegistration};
use super::errors::OnboardingError;

/// Read side used by the resolver: email to canonical user.
#[async_trait]
pub trait UserLookup: Send + Sync {
    async fn find_by_email(&self, email: &str) -> Result<Option<CanonicalUser>, OnboardingError>;
}

/// Persistence abstraction over canonical users.
///
/// Implementations own every `CanonicalUser`; callers only hold copies for
/// the duration of one invocation.
#[async_trait]
pub trait CredentialStore: UserLookup {
    /// Attach a provider identity to `user_id`. Returns `true` when a new
    /// link was recorded and `false` when the pair was already linked.
    async fn link_provider(&self, user_id: &str, provider: &LinkedProvider) -> Result<bool, OnboardingError>;

    /// Materialise the canonical record for a confirmed credential, or return
    /// the existing one for `registration.user_id`. Also records
    /// `application_id` and the creating provider. Safe to repeat.
    async fn create_or_get_user(&self, registration: &NewRegistration, application_id: &str) -> Result<CanonicalUser, OnboardingError>;
}

/// Simple in-memory stores for tests, doc examples and `store = "memory"`
pub mod mock {
    use super::*;
    use std::collections::{BTreeSet, HashMap};
    use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
    use tokio::sync::RwLock;

    /// A user plus its creation sequence, standing in for `created_at`.
    struct Stored {
        seq: u64,
        user: CanonicalUser,
    }

    #[derive(Default)]
    pub struct InMemoryCredentialStore {
        users: RwLock<HashMap<String, Stored>>, // key: user_id
        next_seq: AtomicU64,
        writes: AtomicUsize,
    }

    impl InMemoryCredentialStore {
        /// Seed a record directly, bypassing the write counter.
        pub async fn insert(&self, user: CanonicalUser) {
            let seq = self.next_seq.fetch_add(1, Ordering::SeqCst);
            self.users.write().await.insert(user.user_id.clone(), Stored { seq, user });
        }

        pub async fn get(&self, user_id: &str) -> Option<CanonicalUser> {
            self.users.read().await.get(user_id).map(|s| s.user.clone())
        }

        pub async fn len(&self) -> usize {
            self.users.read().await.len()
        }

        pub async fn is_empty(&self) -> bool {
            self.users.read().await.is_empty()
        }

        /// Number of `link_provider` / `create_or_get_user` calls served.
        pub fn write_count(&self) -> usize {
            self.writes.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl UserLookup for InMemoryCredentialStore {
        async fn find_by_email(&self, email: &str) -> Result<Option<CanonicalUser>, OnboardingError> {
            let users = self.users.read().await;
            // Oldest record wins when a first-touch race left duplicates behind
            Ok(users
                .values()
                .filter(|s| s.user.email == email)
                .min_by_key(|s| s.seq)
                .map(|s| s.user.clone()))
        }
    }

    #[async_trait]
    impl CredentialStore for InMemoryCredentialStore {
        async fn link_provider(&self, user_id: &str, provider: &LinkedProvider) -> Result<bool, OnboardingError> {
            self.writes.fetch_add(1, Ordering::SeqCst);
            let mut users = self.users.write().await;
            let stored = users
                .get_mut(user_id)
                .ok_or_else(|| OnboardingError::UserNotFound(user_id.to_string()))?;
            Ok(stored.user.linked_providers.insert(provider.clone()))
        }

        async fn create_or_get_user(&self, registration: &NewRegistration, application_id: &str) -> Result<CanonicalUser, OnboardingError> {
            self.writes.fetch_add(1, Ordering::SeqCst);
            let mut users = self.users.write().await;
            let stored = users.entry(registration.user_id.clone()).or_insert_with(|| Stored {
                seq: self.next_seq.fetch_add(1, Ordering::SeqCst),
                user: CanonicalUser {
                    user_id: registration.user_id.clone(),
                    email: registration.email.clone(),
                    display_name: registration.display_name.clone(),
                    phone_number: registration.phone_number.clone(),
                    linked_providers: BTreeSet::new(),
                    application_links: BTreeSet::new(),
                },
            });
            let user = &mut stored.user;
            if let Some(provider) = &registration.provider {
                user.linked_providers.insert(provider.clone());
            }
            user.application_links.insert(application_id.to_string());
            Ok(user.clone())
        }
    }

    /// Store whose every call fails with `StoreUnavailable`.
    #[derive(Default)]
    pub struct UnavailableCredentialStore;

    #[async_trait]
    impl UserLookup for UnavailableCredentialStore {
        async fn find_by_email(&self, _email: &str) -> Result<Option<CanonicalUser>, OnboardingError> {
            Err(OnboardingError::StoreUnavailable("store offline".into()))
        }
    }

    #[async_trait]
    impl CredentialStore for UnavailableCredentialStore {
        async fn link_provider(&self, _user_id: &str, _provider: &LinkedProvider) -> Result<bool, OnboardingError> {
            Err(OnboardingError::StoreUnavailable("store offline".into()))
        }

        async fn create_or_get_user(&self, _registration: &NewRegistration, _application_id: &str) -> Result<CanonicalUser, OnboardingError> {
            Err(OnboardingError::StoreUnavailable("store offline".into()))
        }
    }
}
