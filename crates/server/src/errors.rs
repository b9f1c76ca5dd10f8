use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use thiserror::Error;

use service::onboarding::OnboardingError;

/// HTTP face of a failed pre-registration call.
#[derive(Debug)]
pub struct ApiError(pub OnboardingError);

impl From<OnboardingError> for ApiError {
    fn from(e: OnboardingError) -> Self { ApiError(e) }
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match &self.0 {
            OnboardingError::MalformedEvent(_) => StatusCode::BAD_REQUEST,
            OnboardingError::DuplicateIdentity { .. } => StatusCode::CONFLICT,
            OnboardingError::ConfigurationError(_) => StatusCode::UNPROCESSABLE_ENTITY,
            OnboardingError::UserNotFound(_) => StatusCode::NOT_FOUND,
            OnboardingError::StoreUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = serde_json::json!({"error": self.0.to_string(), "code": self.0.code()});
        (status, Json(body)).into_response()
    }
}

/// Failures while assembling the app, before the listener is bound.
#[derive(Debug, Error)]
pub enum StartupError {
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
    #[error("credential store unavailable: {0}")]
    Store(String),
}
