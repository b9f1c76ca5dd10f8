use std::collections::HashMap;

use serde::Serialize;
use utoipa::OpenApi;
use utoipa::ToSchema;

#[derive(ToSchema)]
pub struct HealthResponse { pub status: String }

#[derive(Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct EnvelopeRequestDoc {
    pub user_attributes: HashMap<String, String>,
    pub client_metadata: Option<HashMap<String, String>>,
}

#[derive(Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct EnvelopeResponseDoc {
    pub auto_confirm_user: Option<bool>,
    pub auto_verify_email: Option<bool>,
    pub auto_verify_phone: Option<bool>,
}

/// Identity provider trigger event; extra top-level fields are passed through.
#[derive(Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct LifecycleEnvelopeDoc {
    pub trigger_source: String,
    pub user_name: String,
    pub request: EnvelopeRequestDoc,
    pub response: EnvelopeResponseDoc,
}

#[derive(OpenApi)]
#[openapi(
    paths(
        crate::routes::health,
        crate::routes::triggers::pre_sign_up,
        crate::routes::triggers::post_confirmation,
    ),
    components(
        schemas(
            HealthResponse,
            EnvelopeRequestDoc,
            EnvelopeResponseDoc,
            LifecycleEnvelopeDoc,
        )
    ),
    tags(
        (name = "health"),
        (name = "triggers")
    )
)]
pub struct ApiDoc;
