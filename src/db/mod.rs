//! Database connection pool and migration utilities.

use std::path::Path;

use sqlx::migrate::{MigrateError, Migrator};
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;

use crate::config::PersistConfig;

/// Subdirectory of the plugin data directory holding SQL migrations.
pub const MIGRATIONS_DIR: &str = "migrations";

/// Create a PostgreSQL connection pool.
pub async fn create_pool(database_url: &str, max_connections: u32) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(max_connections)
        .connect(database_url)
        .await
}

/// Create the pool described by the plugin configuration.
pub async fn create_pool_from_config(config: &PersistConfig) -> Result<PgPool, sqlx::Error> {
    create_pool(&config.database_url, config.database_max_connections).await
}

/// Load the migrations found under `<data_dir>/migrations`.
pub async fn load_migrator(data_dir: &Path) -> Result<Migrator, MigrateError> {
    Migrator::new(data_dir.join(MIGRATIONS_DIR)).await
}

/// Apply every pending migration from the data directory.
pub async fn run_migrations(pool: &PgPool, data_dir: &Path) -> Result<(), MigrateError> {
    let migrator = load_migrator(data_dir).await?;
    tracing::info!(
        dir = %data_dir.join(MIGRATIONS_DIR).display(),
        count = migrator.iter().count(),
        "Running database migrations"
    );
    migrator.run(pool).await
}
