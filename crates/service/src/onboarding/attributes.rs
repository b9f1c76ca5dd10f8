//! Translation between the provider's raw attribute bag and typed fields.

use std::collections::BTreeMap;

use serde::Deserialize;
use tracing::warn;

use super::domain::{LinkedProvider, NewRegistration, SignupEvent};
use super::errors::OnboardingError;

pub const EMAIL: &str = "email";
pub const PHONE_NUMBER: &str = "phone_number";
pub const NAME: &str = "name";
/// Synthetic username reserved at federated pre-registration.
pub const USER_NAME: &str = "user_name";
pub const IS_LINKED_ACCOUNT: &str = "is_linked_account";
/// JSON array describing the federated identities behind a credential.
pub const IDENTITIES: &str = "identities";

/// Typed profile fields pulled out of an attribute bag.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProfileAttributes {
    pub email: Option<String>,
    pub phone_number: Option<String>,
    pub display_name: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct IdentityEntry {
    user_id: String,
    provider_name: String,
}

pub struct ProfileAttributeMapper;

impl ProfileAttributeMapper {
    pub fn profile(attributes: &BTreeMap<String, String>) -> ProfileAttributes {
        let get = |k: &str| {
            attributes
                .get(k)
                .map(|v| v.trim())
                .filter(|v| !v.is_empty())
                .map(str::to_string)
        };
        ProfileAttributes { email: get(EMAIL), phone_number: get(PHONE_NUMBER), display_name: get(NAME) }
    }

    pub fn require_email(event: &SignupEvent) -> Result<&str, OnboardingError> {
        event
            .attribute(EMAIL)
            .map(str::trim)
            .filter(|e| !e.is_empty())
            .ok_or_else(|| OnboardingError::missing(EMAIL))
    }

    /// First entry of the `identities` attribute. Unparseable JSON is logged
    /// and treated as absent.
    pub fn creating_provider(attributes: &BTreeMap<String, String>) -> Option<LinkedProvider> {
        let raw = attributes.get(IDENTITIES)?;
        match serde_json::from_str::<Vec<IdentityEntry>>(raw) {
            Ok(entries) => entries
                .into_iter()
                .find(|e| !e.user_id.is_empty() && !e.provider_name.is_empty())
                .map(|e| LinkedProvider::new(e.provider_name, e.user_id)),
            Err(e) => {
                warn!(error = %e, "ignoring unparseable identities attribute");
                None
            }
        }
    }

    /// Build the store input for a confirmed credential.
    ///
    /// The canonical id is the username reserved at pre-registration when
    /// present, otherwise the credential's own username; both are stable for
    /// a given credential, which makes repeated confirmation idempotent.
    pub fn registration(event: &SignupEvent) -> Result<NewRegistration, OnboardingError> {
        let profile = Self::profile(&event.attributes);
        let email = profile.email.ok_or_else(|| OnboardingError::missing(EMAIL))?;
        let user_id = event
            .attribute(USER_NAME)
            .map(str::trim)
            .filter(|u| !u.is_empty())
            .unwrap_or(event.candidate_username.as_str())
            .to_string();
        Ok(NewRegistration {
            user_id,
            credential_username: event.candidate_username.clone(),
            email,
            phone_number: profile.phone_number,
            display_name: profile.display_name,
            provider: Self::creating_provider(&event.attributes),
        })
    }
}
