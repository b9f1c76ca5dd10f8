use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

/// Which lifecycle hook the identity provider is invoking.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TriggerKind {
    ExternalProviderPreRegistration,
    AdminCreatedPreRegistration,
    PasswordPreRegistration,
    PostConfirmation,
}

impl TriggerKind {
    /// Map the provider's `triggerSource` string. Unknown sources yield `None`.
    pub fn from_source(source: &str) -> Option<Self> {
        match source {
            "PreSignUp_ExternalProvider" => Some(Self::ExternalProviderPreRegistration),
            "PreSignUp_AdminCreateUser" => Some(Self::AdminCreatedPreRegistration),
            "PreSignUp_SignUp" => Some(Self::PasswordPreRegistration),
            "PostConfirmation_ConfirmSignUp" | "PostConfirmation_ConfirmForgotPassword" => Some(Self::PostConfirmation),
            _ => None,
        }
    }

    pub fn is_pre_registration(self) -> bool {
        !matches!(self, Self::PostConfirmation)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::ExternalProviderPreRegistration => "external_provider",
            Self::AdminCreatedPreRegistration => "admin_created",
            Self::PasswordPreRegistration => "password",
            Self::PostConfirmation => "post_confirmation",
        }
    }
}

/// Out-of-band client context sent alongside the signup.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApplicationContext {
    pub application_id: Option<String>,
    pub channel_id: Option<String>,
}

/// One lifecycle invocation, decoupled from the envelope's wire shape.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignupEvent {
    pub trigger_kind: TriggerKind,
    pub candidate_username: String,
    pub attributes: BTreeMap<String, String>,
    pub application_context: ApplicationContext,
}

impl SignupEvent {
    pub fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes.get(name).map(String::as_str)
    }
}

/// A federated credential attached to a canonical user.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct LinkedProvider {
    pub provider_name: String,
    pub provider_subject_id: String,
}

impl LinkedProvider {
    pub fn new(provider_name: impl Into<String>, provider_subject_id: impl Into<String>) -> Self {
        Self { provider_name: provider_name.into(), provider_subject_id: provider_subject_id.into() }
    }
}

/// Durable identity record; owned by the credential store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CanonicalUser {
    pub user_id: String,
    pub email: String,
    pub display_name: Option<String>,
    pub phone_number: Option<String>,
    pub linked_providers: BTreeSet<LinkedProvider>,
    pub application_links: BTreeSet<String>,
}

impl CanonicalUser {
    pub fn is_linked_to(&self, provider: &LinkedProvider) -> bool {
        self.linked_providers.contains(provider)
    }
}

/// Typed input for materialising a confirmed credential.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewRegistration {
    /// Idempotency key: the same confirmed credential always maps to this id.
    pub user_id: String,
    pub credential_username: String,
    pub email: String,
    pub phone_number: Option<String>,
    pub display_name: Option<String>,
    /// Creating provider, for federated signups.
    pub provider: Option<LinkedProvider>,
}

/// A single decision the resolver hands to the orchestrator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ResolutionOutcome {
    AutoConfirm { verify_email: bool },
    LinkToExisting {
        user_id: String,
        provider_name: String,
        provider_subject_id: String,
        mark_linked_account: bool,
    },
    PrepareNewAccount { assigned_username: String },
    RejectDuplicate { email: String },
    PassThrough,
}

impl ResolutionOutcome {
    pub fn label(&self) -> &'static str {
        match self {
            Self::AutoConfirm { .. } => "auto_confirm",
            Self::LinkToExisting { .. } => "link_to_existing",
            Self::PrepareNewAccount { .. } => "prepare_new_account",
            Self::RejectDuplicate { .. } => "reject_duplicate",
            Self::PassThrough => "pass_through",
        }
    }
}

/// Everything the resolver decided for one invocation.
///
/// `remove_attributes` is applied before any outcome so that no later
/// mutation can reintroduce a stripped attribute. `outcomes` are applied in
/// order; federated signups carry `AutoConfirm` followed by the linking
/// decision.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Resolution {
    pub remove_attributes: Vec<String>,
    pub outcomes: Vec<ResolutionOutcome>,
}

impl Resolution {
    pub fn single(outcome: ResolutionOutcome) -> Self {
        Self { remove_attributes: Vec::new(), outcomes: vec![outcome] }
    }

    pub fn pass_through() -> Self {
        Self::single(ResolutionOutcome::PassThrough)
    }

    /// Label of the decision that is not the bundled auto-confirm.
    pub fn primary_label(&self) -> &'static str {
        self.outcomes
            .iter()
            .find(|o| !matches!(o, ResolutionOutcome::AutoConfirm { .. }))
            .or_else(|| self.outcomes.first())
            .map_or("pass_through", ResolutionOutcome::label)
    }
}
