//! Postgres implementation of the `AttachmentDirectory` collaborator.

use std::collections::HashSet;

use arkiva_core::constants::PARAM_STORAGE_LOCATION;
use arkiva_core::{AppError, AttachmentDirectory, AttachmentRecord, GcSession};
use async_trait::async_trait;
use sqlx::{PgPool, Postgres, Transaction};
use uuid::Uuid;

use crate::db::attachment::{referenced_in, AttachmentRepository};
use crate::db::config_param::ConfigParamRepository;

/// Storage location used when the config parameter is unset.
const DEFAULT_LOCATION: &str = "file";

/// The document-metadata layer, backed by Postgres.
#[derive(Clone)]
pub struct PgAttachmentDirectory {
    pool: PgPool,
    attachments: AttachmentRepository,
    params: ConfigParamRepository,
}

impl PgAttachmentDirectory {
    pub fn new(pool: PgPool) -> Self {
        Self {
            attachments: AttachmentRepository::new(pool.clone()),
            params: ConfigParamRepository::new(pool.clone()),
            pool,
        }
    }

    pub fn attachments(&self) -> &AttachmentRepository {
        &self.attachments
    }
}

#[async_trait]
impl AttachmentDirectory for PgAttachmentDirectory {
    async fn storage_location(&self) -> Result<String, AppError> {
        let value = self.params.get(PARAM_STORAGE_LOCATION).await?;
        Ok(value.unwrap_or_else(|| DEFAULT_LOCATION.to_string()))
    }

    async fn get_param(&self, key: &str) -> Result<Option<String>, AppError> {
        self.params.get(key).await
    }

    async fn set_param(&self, key: &str, value: &str) -> Result<(), AppError> {
        self.params.set(key, value).await
    }

    async fn referenced_filenames(
        &self,
        candidates: &[String],
    ) -> Result<HashSet<String>, AppError> {
        self.attachments.referenced_filenames(candidates).await
    }

    async fn mark_lost(&self, store_fname: &str) -> Result<u64, AppError> {
        self.attachments.mark_lost(store_fname).await
    }

    async fn records_by_ids(&self, ids: &[Uuid]) -> Result<Vec<AttachmentRecord>, AppError> {
        self.attachments.get_by_ids(ids).await
    }

    async fn begin_gc_session(&self) -> Result<Box<dyn GcSession>, AppError> {
        let mut tx = self.pool.begin().await?;

        // The share-mode lock must be the first statement of this fresh
        // transaction; taken any later, the snapshot could miss records
        // created while the sweep decides. It blocks record creation for the
        // duration of the scan without blocking readers.
        sqlx::query("LOCK TABLE attachments IN SHARE MODE")
            .execute(&mut *tx)
            .await?;

        tracing::debug!("GC session opened, attachments locked in share mode");

        Ok(Box::new(PgGcSession { tx }))
    }
}

/// A locked GC scan; dropping without commit rolls the transaction back.
pub struct PgGcSession {
    tx: Transaction<'static, Postgres>,
}

#[async_trait]
impl GcSession for PgGcSession {
    async fn referenced_filenames(
        &mut self,
        candidates: &[String],
    ) -> Result<HashSet<String>, AppError> {
        referenced_in(&mut self.tx, candidates).await
    }

    async fn commit(self: Box<Self>) -> Result<(), AppError> {
        self.tx.commit().await?;
        Ok(())
    }
}
