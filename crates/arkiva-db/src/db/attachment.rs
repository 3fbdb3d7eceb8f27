//! Attachment repository: queries over the attachments table.

use std::collections::HashSet;

use arkiva_core::models::AttachmentRecord;
use arkiva_core::AppError;
use chrono::{DateTime, Utc};
use sqlx::postgres::PgConnection;
use sqlx::{PgPool, Postgres};
use uuid::Uuid;

/// Upper bound on array parameters per whitelist query.
const WHITELIST_CHUNK: usize = 1000;

/// Row type for the attachments table (for FromRow).
#[derive(Debug, sqlx::FromRow)]
pub struct AttachmentRow {
    pub id: Uuid,
    pub name: String,
    pub res_model: Option<String>,
    pub res_id: Option<i64>,
    pub description: Option<String>,
    pub store_fname: Option<String>,
    pub checksum: Option<String>,
    pub remote_url: Option<String>,
    pub lost: bool,
    pub created_at: DateTime<Utc>,
}

impl AttachmentRow {
    pub fn to_record(self) -> AttachmentRecord {
        AttachmentRecord {
            id: self.id,
            name: self.name,
            res_model: self.res_model,
            res_id: self.res_id,
            description: self.description,
            store_fname: self.store_fname,
            checksum: self.checksum,
            remote_url: self.remote_url,
            lost: self.lost,
            created_at: self.created_at,
        }
    }
}

const SELECT_COLUMNS: &str = "id, name, res_model, res_id, description, store_fname, checksum, \
                              remote_url, lost, created_at";

/// Repository for the attachments table.
#[derive(Clone)]
pub struct AttachmentRepository {
    pool: PgPool,
}

impl AttachmentRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Insert a new attachment record and return it.
    #[tracing::instrument(skip(self), fields(db.table = "attachments"))]
    pub async fn create(
        &self,
        name: &str,
        res_model: Option<&str>,
        res_id: Option<i64>,
        description: Option<&str>,
        store_fname: Option<&str>,
        checksum: Option<&str>,
        remote_url: Option<&str>,
    ) -> Result<AttachmentRecord, AppError> {
        let row: AttachmentRow = sqlx::query_as::<Postgres, AttachmentRow>(&format!(
            r#"
            INSERT INTO attachments (name, res_model, res_id, description, store_fname, checksum, remote_url)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING {SELECT_COLUMNS}
            "#,
        ))
        .bind(name)
        .bind(res_model)
        .bind(res_id)
        .bind(description)
        .bind(store_fname)
        .bind(checksum)
        .bind(remote_url)
        .fetch_one(&self.pool)
        .await?;
        Ok(row.to_record())
    }

    /// Fetch records by id in one query.
    #[tracing::instrument(skip(self, ids), fields(db.table = "attachments", count = ids.len()))]
    pub async fn get_by_ids(&self, ids: &[Uuid]) -> Result<Vec<AttachmentRecord>, AppError> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let rows: Vec<AttachmentRow> = sqlx::query_as::<Postgres, AttachmentRow>(&format!(
            "SELECT {SELECT_COLUMNS} FROM attachments WHERE id = ANY($1)",
        ))
        .bind(ids)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(|r| r.to_record()).collect())
    }

    /// Update the storage back-reference of a record after a write.
    #[tracing::instrument(skip(self), fields(db.table = "attachments", db.record_id = %id))]
    pub async fn update_stored(
        &self,
        id: Uuid,
        store_fname: &str,
        checksum: &str,
        remote_url: Option<&str>,
    ) -> Result<(), AppError> {
        sqlx::query(
            "UPDATE attachments SET store_fname = $2, checksum = $3, remote_url = $4, lost = FALSE \
             WHERE id = $1",
        )
        .bind(id)
        .bind(store_fname)
        .bind(checksum)
        .bind(remote_url)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// Flag every record pointing at a stored filename as lost.
    #[tracing::instrument(skip(self), fields(db.table = "attachments"))]
    pub async fn mark_lost(&self, store_fname: &str) -> Result<u64, AppError> {
        let result = sqlx::query("UPDATE attachments SET lost = TRUE WHERE store_fname = $1")
            .bind(store_fname)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }

    /// Of the given candidates, return the filenames still referenced.
    #[tracing::instrument(skip(self, candidates), fields(db.table = "attachments", count = candidates.len()))]
    pub async fn referenced_filenames(
        &self,
        candidates: &[String],
    ) -> Result<HashSet<String>, AppError> {
        let mut conn = self.pool.acquire().await?;
        referenced_in(&mut conn, candidates).await
    }
}

/// Whitelist query against any connection (pool or locked transaction),
/// chunked to respect query parameter limits.
pub(crate) async fn referenced_in(
    conn: &mut PgConnection,
    candidates: &[String],
) -> Result<HashSet<String>, AppError> {
    let mut referenced = HashSet::new();
    for chunk in candidates.chunks(WHITELIST_CHUNK) {
        let rows: Vec<(String,)> = sqlx::query_as(
            "SELECT DISTINCT store_fname FROM attachments \
             WHERE store_fname = ANY($1) AND store_fname IS NOT NULL",
        )
        .bind(chunk)
        .fetch_all(&mut *conn)
        .await?;
        referenced.extend(rows.into_iter().map(|(fname,)| fname));
    }
    Ok(referenced)
}
