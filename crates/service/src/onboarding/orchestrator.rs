use std::sync::Arc;

use tracing::{debug, error, info, instrument, warn};

use super::attributes::{ProfileAttributeMapper, IS_LINKED_ACCOUNT, USER_NAME};
use super::domain::{CanonicalUser, LinkedProvider, ResolutionOutcome};
use super::envelope::LifecycleEnvelope;
use super::errors::OnboardingError;
use super::metrics;
use super::repository::CredentialStore;
use super::resolver::{IdentityResolver, DEFAULT_USERNAME_SEPARATOR};
use super::usernames::{RandomUsernameGenerator, UsernameGenerator};

/// Onboarding service configuration
#[derive(Clone, Debug)]
pub struct OnboardingConfig {
    /// Recorded as the application link when the client sent none.
    pub default_application_id: String,
    pub username_separator: char,
}

impl Default for OnboardingConfig {
    fn default() -> Self {
        Self { default_application_id: "default_app".into(), username_separator: DEFAULT_USERNAME_SEPARATOR }
    }
}

/// Runs the two signup lifecycle calls against a credential store.
///
/// Pre-registration decides and may block the signup; post-confirmation
/// materialises the canonical user and never blocks.
pub struct OnboardingOrchestrator<S: CredentialStore + ?Sized> {
    store: Arc<S>,
    resolver: IdentityResolver,
    cfg: OnboardingConfig,
}

impl<S: CredentialStore + ?Sized> OnboardingOrchestrator<S> {
    pub fn new(store: Arc<S>, cfg: OnboardingConfig) -> Self {
        Self::with_username_generator(store, cfg, Arc::new(RandomUsernameGenerator))
    }

    pub fn with_username_generator(store: Arc<S>, cfg: OnboardingConfig, usernames: Arc<dyn UsernameGenerator>) -> Self {
        let resolver = IdentityResolver::new(cfg.username_separator, usernames);
        Self { store, resolver, cfg }
    }

    pub fn store(&self) -> &Arc<S> { &self.store }

    /// Pre-registration lifecycle call.
    ///
    /// # Examples
    /// ```
    /// use std::sync::Arc;
    /// use service::onboarding::envelope::LifecycleEnvelope;
    /// use service::onboarding::orchestrator::{OnboardingConfig, OnboardingOrchestrator};
    /// use service::onboarding::repository::mock::InMemoryCredentialStore;
    /// let store = Arc::new(InMemoryCredentialStore::default());
    /// let orch = OnboardingOrchestrator::new(store, OnboardingConfig::default());
    /// let envelope = LifecycleEnvelope::new("PreSignUp_ExternalProvider", "google_77")
    ///     .with_attribute("email", "a@x.com")
    ///     .with_attribute("phone_number", "+15550100");
    /// let out = tokio_test::block_on(orch.handle_pre_registration(envelope)).unwrap();
    /// assert_eq!(out.response.auto_confirm_user, Some(true));
    /// assert!(out.response.attributes["user_name"].starts_with("user-"));
    /// assert!(!out.request.user_attributes.contains_key("phone_number"));
    /// ```
    #[instrument(skip(self, envelope), fields(trigger = %envelope.trigger_source, user_name = %envelope.user_name))]
    pub async fn handle_pre_registration(&self, mut envelope: LifecycleEnvelope) -> Result<LifecycleEnvelope, OnboardingError> {
        match self.pre_registration(&mut envelope).await {
            Ok(()) => Ok(envelope),
            Err(e) => {
                let code = e.code().to_string();
                metrics::PRE_REGISTRATION_ERRORS_TOTAL.with_label_values(&[code.as_str()]).inc();
                warn!(error = %e, code = e.code(), event = "pre_registration_rejected", "signup blocked");
                Err(e)
            }
        }
    }

    async fn pre_registration(&self, envelope: &mut LifecycleEnvelope) -> Result<(), OnboardingError> {
        let event = envelope.signup_event()?;
        let resolution = self.resolver.resolve(&event, self.store.as_ref()).await?;
        debug!(outcome = resolution.primary_label(), "resolved signup");
        metrics::PRE_REGISTRATION_TOTAL
            .with_label_values(&[event.trigger_kind.as_str(), resolution.primary_label()])
            .inc();

        // Removals first so that no later step can reintroduce the attribute
        for name in &resolution.remove_attributes {
            if envelope.remove_attribute(name) {
                debug!(attribute = %name, "removed attribute from federated signup");
            }
        }
        for outcome in resolution.outcomes {
            self.apply(envelope, outcome).await?;
        }
        Ok(())
    }

    async fn apply(&self, envelope: &mut LifecycleEnvelope, outcome: ResolutionOutcome) -> Result<(), OnboardingError> {
        match outcome {
            ResolutionOutcome::AutoConfirm { verify_email } => {
                envelope.response.auto_confirm_user = Some(true);
                envelope.response.auto_verify_email = Some(verify_email);
            }
            ResolutionOutcome::RejectDuplicate { email } => {
                return Err(OnboardingError::DuplicateIdentity { email });
            }
            ResolutionOutcome::LinkToExisting { user_id, provider_name, provider_subject_id, mark_linked_account } => {
                let provider = LinkedProvider::new(provider_name, provider_subject_id);
                let newly_linked = self.store.link_provider(&user_id, &provider).await?;
                if newly_linked {
                    metrics::PROVIDERS_LINKED_TOTAL.inc();
                }
                info!(
                    user_id = %user_id,
                    provider = %provider.provider_name,
                    newly_linked,
                    event = "provider_linked",
                    "federated identity linked to existing user"
                );
                envelope.user_name = user_id;
                if mark_linked_account {
                    envelope
                        .response
                        .attributes
                        .entry(IS_LINKED_ACCOUNT.to_string())
                        .or_insert_with(|| "true".to_string());
                }
            }
            ResolutionOutcome::PrepareNewAccount { assigned_username } => {
                info!(assigned_username = %assigned_username, event = "username_reserved", "new federated account deferred to confirmation");
                envelope.response.attributes.insert(USER_NAME.to_string(), assigned_username);
            }
            ResolutionOutcome::PassThrough => {}
        }
        Ok(())
    }

    /// Post-confirmation lifecycle call. Always returns the envelope it was
    /// given, untouched; failures are logged and counted only.
    #[instrument(skip(self, envelope), fields(trigger = %envelope.trigger_source, user_name = %envelope.user_name))]
    pub async fn handle_post_confirmation(&self, envelope: LifecycleEnvelope) -> LifecycleEnvelope {
        match self.materialize(&envelope).await {
            Ok(user) => {
                metrics::ACCOUNTS_MATERIALIZED_TOTAL.inc();
                info!(user_id = %user.user_id, applications = user.application_links.len(), event = "account_materialized", "canonical user recorded");
            }
            Err(e) => {
                metrics::POST_CONFIRMATION_FAILURES_TOTAL.inc();
                error!(error = %e, code = e.code(), event = "post_confirmation_failed", "canonical user not recorded; confirmation left unblocked");
            }
        }
        envelope
    }

    /// Post-confirmation over a raw request body. A body that does not decode
    /// as an envelope is logged and counted like any other failure; the
    /// caller echoes the body back either way.
    pub async fn handle_post_confirmation_body(&self, body: &[u8]) {
        match serde_json::from_slice::<LifecycleEnvelope>(body) {
            Ok(envelope) => {
                self.handle_post_confirmation(envelope).await;
            }
            Err(e) => {
                metrics::POST_CONFIRMATION_FAILURES_TOTAL.inc();
                error!(error = %e, event = "post_confirmation_undecodable", "envelope did not decode; confirmation left unblocked");
            }
        }
    }

    async fn materialize(&self, envelope: &LifecycleEnvelope) -> Result<CanonicalUser, OnboardingError> {
        let event = envelope.signup_event()?;
        let context = &event.application_context;
        let application_id = context
            .application_id
            .as_deref()
            .unwrap_or(&self.cfg.default_application_id);
        info!(
            application_id,
            channel_id = context.channel_id.as_deref().unwrap_or(""),
            "registration context"
        );
        let registration = ProfileAttributeMapper::registration(&event)?;
        self.store.create_or_get_user(&registration, application_id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::onboarding::repository::mock::{InMemoryCredentialStore, UnavailableCredentialStore};
    use crate::onboarding::repository::UserLookup;
    use crate::onboarding::usernames::mock::{FixedUsernameGenerator, SequentialUsernameGenerator};
    use std::collections::BTreeSet;

    fn orchestrator(store: Arc<InMemoryCredentialStore>) -> OnboardingOrchestrator<InMemoryCredentialStore> {
        OnboardingOrchestrator::with_username_generator(
            store,
            OnboardingConfig::default(),
            Arc::new(FixedUsernameGenerator("user-0000beef".into())),
        )
    }

    async fn seeded(user_id: &str, email: &str, providers: &[(&str, &str)]) -> Arc<InMemoryCredentialStore> {
        let store = Arc::new(InMemoryCredentialStore::default());
        store
            .insert(CanonicalUser {
                user_id: user_id.into(),
                email: email.into(),
                display_name: None,
                phone_number: None,
                linked_providers: providers.iter().map(|(p, s)| LinkedProvider::new(*p, *s)).collect(),
                application_links: BTreeSet::new(),
            })
            .await;
        store
    }

    fn federated(username: &str, email: &str) -> LifecycleEnvelope {
        LifecycleEnvelope::new("PreSignUp_ExternalProvider", username).with_attribute("email", email)
    }

    #[tokio::test]
    async fn admin_created_response_is_unmodified() {
        let store = Arc::new(InMemoryCredentialStore::default());
        let input = LifecycleEnvelope::new("PreSignUp_AdminCreateUser", "made-by-admin")
            .with_attribute("email", "a@x.com")
            .with_attribute("phone_number", "+15550100");
        let out = orchestrator(store.clone()).handle_pre_registration(input.clone()).await.unwrap();
        assert_eq!(out, input);
        assert_eq!(store.write_count(), 0);
    }

    #[tokio::test]
    async fn federated_first_touch_reserves_username() {
        let store = Arc::new(InMemoryCredentialStore::default());
        let out = orchestrator(store.clone())
            .handle_pre_registration(federated("google_77", "a@x.com"))
            .await
            .unwrap();
        assert_eq!(out.response.attributes.get("user_name").map(String::as_str), Some("user-0000beef"));
        assert_eq!(out.response.auto_confirm_user, Some(true));
        assert_eq!(out.response.auto_verify_email, Some(true));
        assert_eq!(out.user_name, "google_77");
        // creation is deferred to post-confirmation
        assert!(store.is_empty().await);
        assert_eq!(store.write_count(), 0);
    }

    #[tokio::test]
    async fn federated_collision_links_and_rewrites_username() {
        let store = seeded("user-42", "a@x.com", &[]).await;
        let out = orchestrator(store.clone())
            .handle_pre_registration(federated("google_77", "a@x.com"))
            .await
            .unwrap();
        assert_eq!(out.user_name, "user-42");
        assert_eq!(out.response.attributes.get("is_linked_account").map(String::as_str), Some("true"));
        assert_eq!(out.response.auto_confirm_user, Some(true));
        assert!(!out.response.attributes.contains_key("user_name"));
        let user = store.get("user-42").await.unwrap();
        assert!(user.linked_providers.contains(&LinkedProvider::new("Google", "77")));
    }

    #[tokio::test]
    async fn linking_twice_keeps_a_single_entry() {
        let store = seeded("user-42", "a@x.com", &[]).await;
        let orch = orchestrator(store.clone());
        orch.handle_pre_registration(federated("google_77", "a@x.com")).await.unwrap();
        let second = orch.handle_pre_registration(federated("google_77", "a@x.com")).await.unwrap();

        let user = store.get("user-42").await.unwrap();
        assert_eq!(user.linked_providers.len(), 1);
        assert_eq!(second.user_name, "user-42");
        // already linked, so the marker is not set again
        assert!(!second.response.attributes.contains_key("is_linked_account"));
    }

    #[tokio::test]
    async fn existing_linked_marker_is_not_overwritten() {
        let store = seeded("user-42", "a@x.com", &[]).await;
        let mut input = federated("facebook_9", "a@x.com");
        input.response.attributes.insert("is_linked_account".into(), "legacy".into());
        let out = orchestrator(store).handle_pre_registration(input).await.unwrap();
        assert_eq!(out.response.attributes["is_linked_account"], "legacy");
    }

    #[tokio::test]
    async fn federated_phone_number_is_always_stripped() {
        for existing in [false, true] {
            let store = if existing { seeded("user-42", "a@x.com", &[]).await } else { Arc::new(InMemoryCredentialStore::default()) };
            let mut input = federated("google_77", "a@x.com").with_attribute("phone_number", "+15550100");
            input.response.attributes.insert("phone_number".into(), "+15550100".into());
            let out = orchestrator(store).handle_pre_registration(input).await.unwrap();
            assert!(!out.request.user_attributes.contains_key("phone_number"));
            assert!(!out.response.attributes.contains_key("phone_number"));
        }
    }

    #[tokio::test]
    async fn password_collision_aborts_without_writes() {
        let store = seeded("user-42", "a@x.com", &[]).await;
        let input = LifecycleEnvelope::new("PreSignUp_SignUp", "c0ffee").with_attribute("email", "a@x.com");
        let err = orchestrator(store.clone()).handle_pre_registration(input).await.unwrap_err();
        assert!(matches!(err, OnboardingError::DuplicateIdentity { ref email } if email == "a@x.com"));
        assert_eq!(store.write_count(), 0);
        assert_eq!(store.len().await, 1);
    }

    #[tokio::test]
    async fn password_signup_without_collision_passes_through() {
        let store = Arc::new(InMemoryCredentialStore::default());
        let input = LifecycleEnvelope::new("PreSignUp_SignUp", "c0ffee")
            .with_attribute("email", "new@x.com")
            .with_attribute("phone_number", "+15550100");
        let out = orchestrator(store).handle_pre_registration(input.clone()).await.unwrap();
        assert_eq!(out, input);
    }

    #[tokio::test]
    async fn empty_subject_is_a_configuration_error() {
        let store = Arc::new(InMemoryCredentialStore::default());
        let err = orchestrator(store).handle_pre_registration(federated("google_", "a@x.com")).await.unwrap_err();
        assert!(matches!(err, OnboardingError::ConfigurationError(_)));
    }

    #[tokio::test]
    async fn pre_registration_store_failure_is_surfaced() {
        let orch = OnboardingOrchestrator::new(Arc::new(UnavailableCredentialStore), OnboardingConfig::default());
        let err = orch.handle_pre_registration(federated("google_77", "a@x.com")).await.unwrap_err();
        assert!(matches!(err, OnboardingError::StoreUnavailable(_)));
    }

    #[tokio::test]
    async fn post_confirmation_failure_returns_envelope_unchanged() {
        let orch = OnboardingOrchestrator::new(Arc::new(UnavailableCredentialStore), OnboardingConfig::default());
        let input = LifecycleEnvelope::new("PostConfirmation_ConfirmSignUp", "c0ffee")
            .with_attribute("email", "a@x.com")
            .with_client_metadata("application_name", "storefront");
        let out = orch.handle_post_confirmation(input.clone()).await;
        assert_eq!(out, input);
    }

    #[tokio::test]
    async fn post_confirmation_with_malformed_envelope_is_swallowed() {
        let store = Arc::new(InMemoryCredentialStore::default());
        let input = LifecycleEnvelope::new("PostConfirmation_ConfirmSignUp", "c0ffee");
        let out = orchestrator(store.clone()).handle_post_confirmation(input.clone()).await;
        assert_eq!(out, input);
        assert!(store.is_empty().await);
    }

    #[tokio::test]
    async fn undecodable_post_confirmation_body_is_counted_not_raised() {
        let store = Arc::new(InMemoryCredentialStore::default());
        let before = metrics::POST_CONFIRMATION_FAILURES_TOTAL.get();
        let body = br#"{"triggerSource":"PostConfirmation_ConfirmSignUp","request":{"userAttributes":{"email":"a@x.com"}}}"#;
        orchestrator(store.clone()).handle_post_confirmation_body(body).await;
        assert!(metrics::POST_CONFIRMATION_FAILURES_TOTAL.get() > before);
        assert!(store.is_empty().await);
    }

    #[tokio::test]
    async fn decodable_post_confirmation_body_records_user() {
        let store = Arc::new(InMemoryCredentialStore::default());
        let body = br#"{"triggerSource":"PostConfirmation_ConfirmSignUp","userName":"c0ffee","request":{"userAttributes":{"email":"a@x.com"}}}"#;
        orchestrator(store.clone()).handle_post_confirmation_body(body).await;
        assert!(store.get("c0ffee").await.is_some());
    }

    #[tokio::test]
    async fn first_touch_signups_reserve_distinct_usernames() {
        let store = Arc::new(InMemoryCredentialStore::default());
        let orch = OnboardingOrchestrator::with_username_generator(
            store.clone(),
            OnboardingConfig::default(),
            Arc::new(SequentialUsernameGenerator::default()),
        );
        let first = orch.handle_pre_registration(federated("google_77", "a@x.com")).await.unwrap();
        let second = orch.handle_pre_registration(federated("facebook_88", "b@x.com")).await.unwrap();
        let first_name = &first.response.attributes["user_name"];
        let second_name = &second.response.attributes["user_name"];
        assert_eq!(first_name, "user-00000001");
        assert_eq!(second_name, "user-00000002");
        assert_ne!(first_name, second_name);
        assert!(store.is_empty().await);
    }

    #[tokio::test]
    async fn post_confirmation_falls_back_to_default_application() {
        let store = Arc::new(InMemoryCredentialStore::default());
        let input = LifecycleEnvelope::new("PostConfirmation_ConfirmSignUp", "c0ffee").with_attribute("email", "a@x.com");
        orchestrator(store.clone()).handle_post_confirmation(input).await;
        let user = store.get("c0ffee").await.unwrap();
        assert!(user.application_links.contains("default_app"));
    }

    #[tokio::test]
    async fn post_confirmation_is_idempotent() {
        let store = Arc::new(InMemoryCredentialStore::default());
        let orch = orchestrator(store.clone());
        let input = LifecycleEnvelope::new("PostConfirmation_ConfirmSignUp", "c0ffee")
            .with_attribute("email", "a@x.com")
            .with_client_metadata("application_name", "storefront");
        orch.handle_post_confirmation(input.clone()).await;
        orch.handle_post_confirmation(input).await;
        assert_eq!(store.len().await, 1);
        let user = store.get("c0ffee").await.unwrap();
        assert_eq!(user.application_links, BTreeSet::from(["storefront".to_string()]));
    }

    #[tokio::test]
    async fn federated_lifecycle_ends_in_one_canonical_account() {
        let store = Arc::new(InMemoryCredentialStore::default());
        let orch = orchestrator(store.clone());

        // NoAccount -> PendingFederatedAccount
        let pre = orch.handle_pre_registration(federated("google_77", "a@x.com")).await.unwrap();
        let reserved = pre.response.attributes["user_name"].clone();

        // PendingFederatedAccount -> CanonicalAccount
        let identities = r#"[{"userId":"77","providerName":"Google"}]"#;
        let confirm = LifecycleEnvelope::new("PostConfirmation_ConfirmSignUp", "google_77")
            .with_attribute("email", "a@x.com")
            .with_attribute("user_name", &reserved)
            .with_attribute("identities", identities);
        orch.handle_post_confirmation(confirm).await;
        let user = store.find_by_email("a@x.com").await.unwrap().unwrap();
        assert_eq!(user.user_id, reserved);
        assert!(user.linked_providers.contains(&LinkedProvider::new("Google", "77")));

        // CanonicalAccount + second provider -> one more linked provider
        let fb = orch.handle_pre_registration(federated("facebook_x_y", "a@x.com")).await.unwrap();
        assert_eq!(fb.user_name, reserved);
        assert_eq!(store.get(&reserved).await.unwrap().linked_providers.len(), 2);

        // CanonicalAccount + password signup -> Rejected
        let pw = LifecycleEnvelope::new("PreSignUp_SignUp", "c0ffee").with_attribute("email", "a@x.com");
        assert!(matches!(orch.handle_pre_registration(pw).await, Err(OnboardingError::DuplicateIdentity { .. })));
        assert_eq!(store.len().await, 1);
    }
}
