//! Persistent `CredentialStore` implementations.

pub mod seaorm;
