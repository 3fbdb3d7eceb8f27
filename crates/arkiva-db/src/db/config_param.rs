//! Configuration-parameter repository: key/value settings owned by the
//! document-metadata layer (storage location, migration marker).

use arkiva_core::AppError;
use sqlx::PgPool;

/// Repository for the config_params table.
#[derive(Clone)]
pub struct ConfigParamRepository {
    pool: PgPool,
}

impl ConfigParamRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    #[tracing::instrument(skip(self), fields(db.table = "config_params"))]
    pub async fn get(&self, key: &str) -> Result<Option<String>, AppError> {
        let row: Option<(String,)> =
            sqlx::query_as("SELECT value FROM config_params WHERE key = $1")
                .bind(key)
                .fetch_optional(&self.pool)
                .await?;
        Ok(row.map(|(value,)| value))
    }

    #[tracing::instrument(skip(self), fields(db.table = "config_params"))]
    pub async fn set(&self, key: &str, value: &str) -> Result<(), AppError> {
        sqlx::query(
            r#"
            INSERT INTO config_params (key, value)
            VALUES ($1, $2)
            ON CONFLICT (key) DO UPDATE SET value = EXCLUDED.value, updated_at = now()
            "#,
        )
        .bind(key)
        .bind(value)
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}
