//! Development schema bootstrap.
//!
//! Production tables are owned by the platform control plane; this
//! migrator only backs `model-registry migrate` and the test suite.

pub use sea_orm_migration::prelude::*;

mod m001_create_registry_tables;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![Box::new(m001_create_registry_tables::Migration)]
    }
}
