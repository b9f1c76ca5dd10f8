//! Migrator registering the credential store tables in dependency order.
//! Indexes are applied last.
pub use sea_orm_migration::prelude::*;

mod m20240601_000001_create_canonical_user;
mod m20240601_000002_create_linked_provider;
mod m20240601_000003_create_application_link;
mod m20240601_000004_add_indexes;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20240601_000001_create_canonical_user::Migration),
            Box::new(m20240601_000002_create_linked_provider::Migration),
            Box::new(m20240601_000003_create_application_link::Migration),
            // Indexes should always be applied last
            Box::new(m20240601_000004_add_indexes::Migration),
        ]
    }
}
