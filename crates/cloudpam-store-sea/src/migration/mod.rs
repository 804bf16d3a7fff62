mod m20240101_000001_initial;

use sea_orm::{ConnectionTrait, DatabaseConnection, DbErr, Statement};
use sea_orm_migration::prelude::*;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![Box::new(m20240101_000001_initial::Migration)]
    }

    fn migration_table_name() -> sea_orm::DynIden {
        Alias::new("schema_migrations").into_iden()
    }
}

/// Runs all pending migrations and stamps the `schema_info` row with the
/// current schema version and the running application version.
pub async fn run(db: &DatabaseConnection, app_version: &str) -> Result<(), DbErr> {
    Migrator::up(db, None).await?;

    let version = Migrator::migrations()
        .last()
        .map(|m| m.name().to_string())
        .unwrap_or_default();

    let backend = db.get_database_backend();
    db.execute(Statement::from_sql_and_values(
        backend,
        match backend {
            sea_orm::DatabaseBackend::Postgres => {
                r#"INSERT INTO schema_info (id, current_version, app_version) VALUES (1, $1, $2)
                   ON CONFLICT (id) DO UPDATE SET current_version = excluded.current_version, app_version = excluded.app_version"#
            }
            _ => {
                r#"INSERT INTO schema_info (id, current_version, app_version) VALUES (1, ?, ?)
                   ON CONFLICT (id) DO UPDATE SET current_version = excluded.current_version, app_version = excluded.app_version"#
            }
        },
        [version.into(), app_version.into()],
    ))
    .await?;

    Ok(())
}
