//! Onboarding module: identity resolution and account linking for the
//! signup lifecycle.
//!
//! Layers follow the usual split:
//! - `domain`, `envelope`, `errors`: data types
//! - `resolver`: pure decision logic over a read-only lookup
//! - `orchestrator`: applies decisions to the envelope and the store
//! - `repository`, `repo`: the `CredentialStore` seam and its implementations

pub mod attributes;
pub mod domain;
pub mod envelope;
pub mod errors;
pub mod metrics;
pub mod orchestrator;
pub mod repo;
pub mod repository;
pub mod resolver;
pub mod usernames;

pub use errors::OnboardingError;
pub use orchestrator::{OnboardingConfig, OnboardingOrchestrator};
pub use repository::CredentialStore;
