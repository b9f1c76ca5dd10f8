//! Shared building blocks for the onboarding workspace: the health payload
//! served by the host and the tracing subscriber setup used by binaries.

pub mod types;
pub mod utils;
