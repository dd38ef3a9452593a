pub use sea_orm_migration::prelude::*;

mod m001_initial_schema;
mod m002_slas_optimistic_version;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m001_initial_schema::Migration),
            Box::new(m002_slas_optimistic_version::Migration),
        ]
    }
}
