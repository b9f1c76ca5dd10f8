use std::sync::Arc;

use axum::{
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use tower_http::trace::{TraceLayer, DefaultMakeSpan, DefaultOnRequest, DefaultOnResponse, DefaultOnFailure};
use tracing::Level;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use common::types::Health;
use service::onboarding::{CredentialStore, OnboardingOrchestrator};

use crate::observability::encode_metrics;
use crate::openapi::ApiDoc;

pub mod triggers;

/// Shared handler state: one orchestrator over a type-erased store.
#[derive(Clone)]
pub struct AppState {
    pub orchestrator: Arc<OnboardingOrchestrator<dyn CredentialStore>>,
}

#[utoipa::path(get, path = "/health", tag = "health", responses((status = 200, description = "OK", body = crate::openapi::HealthResponse)))]
pub async fn health() -> Json<Health> {
    Json(Health { status: "ok" })
}

async fn metrics() -> impl IntoResponse {
    encode_metrics()
}

/// Build the full application router: lifecycle triggers, health, metrics, docs
pub fn build_router(state: AppState) -> Router {
    let triggers = Router::new()
        .route("/triggers/pre-sign-up", post(triggers::pre_sign_up))
        .route("/triggers/post-confirmation", post(triggers::post_confirmation))
        .with_state(state);

    Router::new()
        .route("/health", get(health))
        .route("/metrics", get(metrics))
        .merge(triggers)
        .merge(SwaggerUi::new("/docs").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .layer(
            TraceLayer::new_for_http()
                // One INFO span per trigger call, without headers
                .make_span_with(
                    DefaultMakeSpan::new()
                        .level(Level::INFO)
                        .include_headers(false),
                )
                .on_request(
                    DefaultOnRequest::new()
                        .level(Level::INFO),
                )
                // status code and latency
                .on_response(
                    DefaultOnResponse::new()
                        .level(Level::INFO)
                        .include_headers(false),
                )
                .on_failure(
                    DefaultOnFailure::new()
                        .level(Level::ERROR),
                )
        )
}
