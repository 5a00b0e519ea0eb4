use sea_orm_migration::prelude::*;

mod m001_create_schedule_tables;
mod m002_add_user_role;
mod m003_create_sessions;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m001_create_schedule_tables::Migration),
            Box::new(m002_add_user_role::Migration),
            Box::new(m003_create_sessions::Migration),
        ]
    }
}

#[derive(DeriveIden)]
pub(crate) enum Users {
    Table,
    Id,
    Name,
    Email,
    PasswordHash,
    Role,
    CreatedAt,
}
