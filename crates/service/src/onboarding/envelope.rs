//! Serde model of the identity provider's trigger event.
//!
//! Fields the handlers do not interpret (`version`, `region`, `userPoolId`,
//! `callerContext`, ...) are captured in `extra` and written back verbatim.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::domain::{ApplicationContext, SignupEvent, TriggerKind};
use super::errors::OnboardingError;

/// `clientMetadata` key carrying the application id.
pub const APPLICATION_NAME_KEY: &str = "application_name";
/// `clientMetadata` key carrying the acquisition channel.
pub const CHANNEL_ID_KEY: &str = "channel_id";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LifecycleEnvelope {
    pub trigger_source: String,
    pub user_name: String,
    #[serde(default)]
    pub request: EnvelopeRequest,
    #[serde(default)]
    pub response: EnvelopeResponse,
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EnvelopeRequest {
    #[serde(default)]
    pub user_attributes: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub client_metadata: Option<BTreeMap<String, String>>,
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EnvelopeResponse {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub auto_confirm_user: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub auto_verify_email: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub auto_verify_phone: Option<bool>,
    /// Echoed-back string attributes (`user_name`, `is_linked_account`, ...)
    #[serde(flatten)]
    pub attributes: BTreeMap<String, String>,
}

impl LifecycleEnvelope {
    pub fn new(trigger_source: impl Into<String>, user_name: impl Into<String>) -> Self {
        Self {
            trigger_source: trigger_source.into(),
            user_name: user_name.into(),
            request: EnvelopeRequest::default(),
            response: EnvelopeResponse::default(),
            extra: BTreeMap::new(),
        }
    }

    pub fn with_attribute(mut self, name: &str, value: &str) -> Self {
        self.request.user_attributes.insert(name.to_string(), value.to_string());
        self
    }

    pub fn with_client_metadata(mut self, key: &str, value: &str) -> Self {
        self.request
            .client_metadata
            .get_or_insert_with(BTreeMap::new)
            .insert(key.to_string(), value.to_string());
        self
    }

    pub fn trigger_kind(&self) -> Result<TriggerKind, OnboardingError> {
        TriggerKind::from_source(&self.trigger_source)
            .ok_or_else(|| OnboardingError::MalformedEvent(format!("unknown trigger source `{}`", self.trigger_source)))
    }

    fn client_metadata(&self, key: &str) -> Option<String> {
        self.request
            .client_metadata
            .as_ref()
            .and_then(|m| m.get(key))
            .filter(|v| !v.trim().is_empty())
            .cloned()
    }

    /// Read-only view of this invocation for the resolver.
    pub fn signup_event(&self) -> Result<SignupEvent, OnboardingError> {
        let trigger_kind = self.trigger_kind()?;
        if self.user_name.trim().is_empty() {
            return Err(OnboardingError::MalformedEvent("empty userName".into()));
        }
        Ok(SignupEvent {
            trigger_kind,
            candidate_username: self.user_name.clone(),
            attributes: self.request.user_attributes.clone(),
            application_context: ApplicationContext {
                application_id: self.client_metadata(APPLICATION_NAME_KEY),
                channel_id: self.client_metadata(CHANNEL_ID_KEY),
            },
        })
    }

    /// Drop an attribute from both the request bag and the echoed response.
    pub fn remove_attribute(&mut self, name: &str) -> bool {
        let from_request = self.request.user_attributes.remove(name).is_some();
        let from_response = self.response.attributes.remove(name).is_some();
        from_request || from_response
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn deserializes_provider_event_and_keeps_unknown_fields() {
        let raw = json!({
            "version": "1",
            "region": "eu-west-1",
            "triggerSource": "PreSignUp_ExternalProvider",
            "userName": "google_77",
            "callerContext": {"clientId": "abc"},
            "request": {
                "userAttributes": {"email": "a@x.com", "phone_number": "+15550100"},
                "clientMetadata": {"application_name": "storefront", "channel_id": ""},
                "validationData": null
            },
            "response": {"autoConfirmUser": false, "autoVerifyEmail": false}
        });
        let env: LifecycleEnvelope = serde_json::from_value(raw.clone()).unwrap();
        assert_eq!(env.trigger_kind().unwrap(), TriggerKind::ExternalProviderPreRegistration);
        assert_eq!(env.response.auto_confirm_user, Some(false));
        assert!(env.extra.contains_key("callerContext"));

        let event = env.signup_event().unwrap();
        assert_eq!(event.application_context.application_id.as_deref(), Some("storefront"));
        // blank metadata counts as absent
        assert_eq!(event.application_context.channel_id, None);

        assert_eq!(serde_json::to_value(&env).unwrap(), raw);
    }

    #[test]
    fn missing_request_and_response_default_to_empty() {
        let env: LifecycleEnvelope = serde_json::from_value(json!({
            "triggerSource": "PreSignUp_AdminCreateUser",
            "userName": "admin-made"
        }))
        .unwrap();
        assert!(env.request.user_attributes.is_empty());
        assert_eq!(env.response, EnvelopeResponse::default());
    }

    #[test]
    fn unknown_trigger_source_is_malformed() {
        let env = LifecycleEnvelope::new("TokenGeneration_HostedAuth", "u");
        assert!(matches!(env.signup_event(), Err(OnboardingError::MalformedEvent(_))));
    }

    #[test]
    fn remove_attribute_clears_request_and_response() {
        let mut env = LifecycleEnvelope::new("PreSignUp_SignUp", "u").with_attribute("phone_number", "+1");
        env.response.attributes.insert("phone_number".into(), "+1".into());
        assert!(env.remove_attribute("phone_number"));
        assert!(!env.remove_attribute("phone_number"));
        assert!(!env.request.user_attributes.contains_key("phone_number"));
        assert!(!env.response.attributes.contains_key("phone_number"));
    }
}
