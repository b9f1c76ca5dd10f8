//! Identity resolution: decides what a signup invocation must do.
//!
//! The resolver only reads through a [`UserLookup`]; every mutation is
//! described by the returned [`Resolution`] and carried out by the
//! orchestrator.

use std::sync::Arc;

use tracing::debug;

use super::attributes::{ProfileAttributeMapper, PHONE_NUMBER};
use super::domain::{LinkedProvider, Resolution, ResolutionOutcome, SignupEvent, TriggerKind};
use super::errors::OnboardingError;
use super::repository::UserLookup;
use super::usernames::{RandomUsernameGenerator, UsernameGenerator};

/// Default separator between provider name and subject id.
pub const DEFAULT_USERNAME_SEPARATOR: char = '_';

pub struct IdentityResolver {
    separator: char,
    usernames: Arc<dyn UsernameGenerator>,
}

impl Default for IdentityResolver {
    fn default() -> Self {
        Self::new(DEFAULT_USERNAME_SEPARATOR, Arc::new(RandomUsernameGenerator))
    }
}

impl IdentityResolver {
    pub fn new(separator: char, usernames: Arc<dyn UsernameGenerator>) -> Self {
        Self { separator, usernames }
    }

    /// Decide the outcome for one lifecycle invocation.
    ///
    /// # Examples
    /// ```
    /// use std::sync::Arc;
    /// use service::onboarding::domain::{ApplicationContext, ResolutionOutcome, SignupEvent, TriggerKind};
    /// use service::onboarding::repository::mock::InMemoryCredentialStore;
    /// use service::onboarding::resolver::IdentityResolver;
    /// use service::onboarding::usernames::mock::FixedUsernameGenerator;
    /// let resolver = IdentityResolver::new('_', Arc::new(FixedUsernameGenerator("user-0000beef".into())));
    /// let event = SignupEvent {
    ///     trigger_kind: TriggerKind::ExternalProviderPreRegistration,
    ///     candidate_username: "google_77".into(),
    ///     attributes: [("email".to_string(), "a@x.com".to_string())].into_iter().collect(),
    ///     application_context: ApplicationContext::default(),
    /// };
    /// let store = InMemoryCredentialStore::default();
    /// let resolution = tokio_test::block_on(resolver.resolve(&event, &store)).unwrap();
    /// assert_eq!(resolution.outcomes[1], ResolutionOutcome::PrepareNewAccount { assigned_username: "user-0000beef".into() });
    /// ```
    pub async fn resolve<L>(&self, event: &SignupEvent, lookup: &L) -> Result<Resolution, OnboardingError>
    where
        L: UserLookup + ?Sized,
    {
        match event.trigger_kind {
            TriggerKind::AdminCreatedPreRegistration => Ok(Resolution::pass_through()),
            TriggerKind::PasswordPreRegistration => {
                let email = ProfileAttributeMapper::require_email(event)?;
                match lookup.find_by_email(email).await? {
                    Some(existing) => {
                        debug!(user_id = %existing.user_id, "password signup collides with existing email");
                        Ok(Resolution::single(ResolutionOutcome::RejectDuplicate { email: email.to_string() }))
                    }
                    None => Ok(Resolution::pass_through()),
                }
            }
            TriggerKind::ExternalProviderPreRegistration => {
                let provider = self.split_provider_username(&event.candidate_username)?;
                let email = ProfileAttributeMapper::require_email(event)?;
                let existing = lookup.find_by_email(email).await?;
                let decision = match existing {
                    Some(found) => ResolutionOutcome::LinkToExisting {
                        mark_linked_account: !found.is_linked_to(&provider),
                        user_id: found.user_id,
                        provider_name: provider.provider_name,
                        provider_subject_id: provider.provider_subject_id,
                    },
                    None => ResolutionOutcome::PrepareNewAccount { assigned_username: self.usernames.generate() },
                };
                Ok(Resolution {
                    remove_attributes: vec![PHONE_NUMBER.to_string()],
                    outcomes: vec![ResolutionOutcome::AutoConfirm { verify_email: true }, decision],
                })
            }
            // Linking was settled at pre-registration
            TriggerKind::PostConfirmation => Ok(Resolution::pass_through()),
        }
    }

    /// Split `provider_subject` on the first separator only and normalise the
    /// provider name.
    pub fn split_provider_username(&self, username: &str) -> Result<LinkedProvider, OnboardingError> {
        let (raw_provider, subject) = username.split_once(self.separator).ok_or_else(|| {
            OnboardingError::MalformedEvent(format!("federated username `{username}` has no `{}` separator", self.separator))
        })?;
        if raw_provider.is_empty() {
            return Err(OnboardingError::MalformedEvent(format!("federated username `{username}` has no provider name")));
        }
        if subject.is_empty() {
            return Err(OnboardingError::ConfigurationError(format!("federated username `{username}` has an empty subject id")));
        }
        Ok(LinkedProvider::new(normalize_provider_name(raw_provider), subject))
    }
}

/// Display form of a provider name: well-known providers get their brand
/// spelling, anything else is title-cased.
pub fn normalize_provider_name(raw: &str) -> String {
    match raw.to_ascii_lowercase().as_str() {
        "google" => "Google".to_string(),
        "facebook" => "Facebook".to_string(),
        _ => title_case(raw),
    }
}

/// Upper-case the first letter of each alphabetic run, lower-case the rest.
fn title_case(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut at_word_start = true;
    for c in raw.chars() {
        if c.is_alphabetic() {
            if at_word_start {
                out.extend(c.to_uppercase());
            } else {
                out.extend(c.to_lowercase());
            }
            at_word_start = false;
        } else {
            out.push(c);
            at_word_start = true;
        }
    }
    out
}
