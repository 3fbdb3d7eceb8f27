//! Database repositories for the data access layer.
//!
//! Each repository owns one table; `directory` composes them into the
//! collaborator facade consumed by the storage engine.

use arkiva_core::AppError;
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;

pub mod attachment;
pub mod config_param;
pub mod directory;

/// Connect a Postgres pool.
pub async fn connect_pool(database_url: &str, max_connections: u32) -> Result<PgPool, AppError> {
    let pool = PgPoolOptions::new()
        .max_connections(max_connections)
        .connect(database_url)
        .await?;
    Ok(pool)
}

/// Apply the embedded schema migrations.
pub async fn run_migrations(pool: &PgPool) -> Result<(), AppError> {
    sqlx::migrate!("./migrations")
        .run(pool)
        .await
        .map_err(|e| AppError::Internal(format!("Migration failed: {e}")))?;
    Ok(())
}
