//! Lifecycle trigger endpoints. The identity provider posts its event
//! envelope and receives the (possibly mutated) envelope back.

use axum::body::Bytes;
use axum::http::header;
use axum::response::IntoResponse;
use axum::{extract::State, Json};

use service::onboarding::envelope::LifecycleEnvelope;

use crate::errors::ApiError;
use crate::routes::AppState;

/// Pre-registration: may mutate the envelope or block the signup.
#[utoipa::path(
    post,
    path = "/triggers/pre-sign-up",
    tag = "triggers",
    request_body = crate::openapi::LifecycleEnvelopeDoc,
    responses(
        (status = 200, description = "Envelope with resolution applied", body = crate::openapi::LifecycleEnvelopeDoc),
        (status = 400, description = "Malformed event"),
        (status = 409, description = "Email already registered to another account"),
        (status = 422, description = "Federated username has no subject id"),
        (status = 503, description = "Credential store unavailable")
    )
)]
pub async fn pre_sign_up(
    State(state): State<AppState>,
    Json(envelope): Json<LifecycleEnvelope>,
) -> Result<Json<LifecycleEnvelope>, ApiError> {
    let out = state.orchestrator.handle_pre_registration(envelope).await?;
    Ok(Json(out))
}

/// Post-confirmation: records the canonical user and always echoes the
/// request body back with 200, even when it does not decode as an envelope.
#[utoipa::path(
    post,
    path = "/triggers/post-confirmation",
    tag = "triggers",
    request_body = crate::openapi::LifecycleEnvelopeDoc,
    responses((status = 200, description = "Envelope, unchanged", body = crate::openapi::LifecycleEnvelopeDoc))
)]
pub async fn post_confirmation(State(state): State<AppState>, body: Bytes) -> impl IntoResponse {
    state.orchestrator.handle_post_confirmation_body(&body).await;
    ([(header::CONTENT_TYPE, "application/json")], body)
}
