use thiserror::Error;

/// Failures of a signup lifecycle invocation.
///
/// Everything except `StoreUnavailable` is fatal for a pre-registration call.
/// Post-confirmation never surfaces any of these to the provider.
#[derive(Debug, Error)]
pub enum OnboardingError {
    #[error("malformed event: {0}")]
    MalformedEvent(String),
    #[error("a user with email {email} already exists")]
    DuplicateIdentity { email: String },
    #[error("configuration error: {0}")]
    ConfigurationError(String),
    #[error("user not found: {0}")]
    UserNotFound(String),
    #[error("credential store unavailable: {0}")]
    StoreUnavailable(String),
}

impl OnboardingError {
    /// Stable numeric code for external mapping/logging
    pub fn code(&self) -> u16 {
        match self {
            OnboardingError::MalformedEvent(_) => 2001,
            OnboardingError::DuplicateIdentity { .. } => 2002,
            OnboardingError::ConfigurationError(_) => 2003,
            OnboardingError::UserNotFound(_) => 2004,
            OnboardingError::StoreUnavailable(_) => 2100,
        }
    }

    pub fn missing(field: &str) -> Self {
        Self::MalformedEvent(format!("missing required attribute `{field}`"))
    }
}

impl From<models::errors::ModelError> for OnboardingError {
    fn from(e: models::errors::ModelError) -> Self {
        match e {
            models::errors::ModelError::NotFound(what) => OnboardingError::UserNotFound(what),
            other => OnboardingError::StoreUnavailable(other.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use models::errors::ModelError;

    #[test]
    fn missing_model_row_becomes_user_not_found() {
        let err = OnboardingError::from(ModelError::NotFound("canonical user user-9".into()));
        assert!(matches!(err, OnboardingError::UserNotFound(_)));
        assert_eq!(err.code(), 2004);
    }

    #[test]
    fn other_model_errors_become_store_unavailable() {
        let err = OnboardingError::from(ModelError::Db("connection reset".into()));
        assert!(matches!(err, OnboardingError::StoreUnavailable(_)));
        assert_eq!(err.code(), 2100);
    }
}
