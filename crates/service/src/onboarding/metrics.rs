use once_cell::sync::Lazy;
use prometheus::{register_int_counter, register_int_counter_vec, IntCounter, IntCounterVec};

// Prometheus metrics (default registry)
pub static PRE_REGISTRATION_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    register_int_counter_vec!(
        "idlink_pre_registration_total",
        "Pre-registration invocations by trigger and decision",
        &["trigger", "outcome"]
    )
    .expect("register pre_registration_total")
});

pub static PRE_REGISTRATION_ERRORS_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    register_int_counter_vec!(
        "idlink_pre_registration_errors_total",
        "Pre-registration invocations aborted, by error code",
        &["code"]
    )
    .expect("register pre_registration_errors_total")
});

pub static PROVIDERS_LINKED_TOTAL: Lazy<IntCounter> = Lazy::new(|| {
    register_int_counter!(
        "idlink_providers_linked_total",
        "Federated identities newly linked to an existing canonical user"
    )
    .expect("register providers_linked_total")
});

pub static ACCOUNTS_MATERIALIZED_TOTAL: Lazy<IntCounter> = Lazy::new(|| {
    register_int_counter!(
        "idlink_accounts_materialized_total",
        "Post-confirmation calls that created or found the canonical user"
    )
    .expect("register accounts_materialized_total")
});

pub static POST_CONFIRMATION_FAILURES_TOTAL: Lazy<IntCounter> = Lazy::new(|| {
    register_int_counter!(
        "idlink_post_confirmation_failures_total",
        "Post-confirmation persistence failures swallowed to keep confirmation unblocked"
    )
    .expect("register post_confirmation_failures_total")
});
