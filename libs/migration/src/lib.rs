pub use sea_orm_migration::prelude::*;

mod m20250601_000000_create_tenancy;
mod m20250601_000001_create_applications;
mod m20250601_000002_create_functions;
mod m20250601_000003_create_nodes;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20250601_000000_create_tenancy::Migration),
            Box::new(m20250601_000001_create_applications::Migration),
            Box::new(m20250601_000002_create_functions::Migration),
            Box::new(m20250601_000003_create_nodes::Migration),
        ]
    }
}
