//! SeaORM entities backing the persistent credential store.
//!
//! - `canonical_user`: one row per canonical identity
//! - `linked_provider`: federated credentials attached to a user
//! - `application_link`: applications a user registered under

pub mod errors;
pub mod db;
pub mod canonical_user;
pub mod linked_provider;
pub mod application_link;
