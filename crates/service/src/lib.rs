//! Service layer for the signup lifecycle.
//! - Keeps identity decisions independent of the HTTP host.
//! - Reuses entity definitions and CRUD helpers from the `models` crate.
//! - Provides clear error types and documented interfaces.

pub mod onboarding;
#[cfg(test)]
pub mod test_support;
