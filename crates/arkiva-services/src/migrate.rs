//! Bulk migrator: one-shot upload of the local filestore to the remote
//! store.
//!
//! Idempotent through the migration marker: runs only when the location is
//! remote-eligible and the marker is absent, and sets the marker on
//! completion so no later maintenance cycle repeats the walk. Never opens a
//! GC session; it is long-running and must not block writes.

use std::sync::Arc;

use arkiva_core::constants::PARAM_MIGRATION_COMPLETE;
use arkiva_core::AttachmentDirectory;
use arkiva_storage::{RemoteDecision, StorageEngine};
use bytes::Bytes;
use serde::Serialize;

/// Counts reported by one migration run.
#[derive(Debug, Clone, Copy, Default, Serialize)]
pub struct MigrationReport {
    /// Files uploaded this run.
    pub uploaded: usize,
    /// True when the run did nothing (marker present or not remote-eligible).
    pub skipped: bool,
}

pub struct BulkMigrator {
    engine: Arc<StorageEngine>,
    directory: Arc<dyn AttachmentDirectory>,
}

impl BulkMigrator {
    pub fn new(engine: Arc<StorageEngine>, directory: Arc<dyn AttachmentDirectory>) -> Self {
        Self { engine, directory }
    }

    /// Walk the local tree and upload everything, once.
    #[tracing::instrument(skip(self), fields(migration.operation = "bulk_copy"))]
    pub async fn run_once(&self) -> Result<MigrationReport, anyhow::Error> {
        if self.directory.migration_complete().await? {
            tracing::debug!("Bulk migration already completed, skipping");
            return Ok(MigrationReport {
                uploaded: 0,
                skipped: true,
            });
        }

        let store = match self.engine.remote_decision().await? {
            RemoteDecision::Use(store) => store,
            RemoteDecision::Fallback(reason) => {
                tracing::info!(reason = %reason, "Bulk migration not run");
                return Ok(MigrationReport {
                    uploaded: 0,
                    skipped: true,
                });
            }
        };

        let addresser = self.engine.addresser();
        let fnames = self.engine.local().walk().await?;
        let total = fnames.len();
        let mut uploaded = 0usize;

        for fname in fnames {
            let key = match addresser.key_for_filename(&fname) {
                Ok(key) => key,
                Err(err) => {
                    tracing::warn!(error = %err, fname = %fname, "Skipping unmigratable file");
                    continue;
                }
            };
            let storage_key = key.storage_key();

            // Content addressing: skip what the remote already holds.
            match store.head(&storage_key).await {
                Ok(_) => continue,
                Err(err) if err.is_not_found() => {}
                // Abort without setting the marker; the next cycle retries.
                Err(err) => return Err(err.into()),
            }

            let data = self.engine.local().read(&fname).await?;
            store.put(&storage_key, Bytes::from(data), &[]).await?;
            uploaded += 1;
        }

        self.directory
            .set_param(PARAM_MIGRATION_COMPLETE, "true")
            .await?;

        tracing::info!(uploaded, total, "Bulk migration completed");

        Ok(MigrationReport {
            uploaded,
            skipped: false,
        })
    }
}
