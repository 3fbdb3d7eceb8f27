//! Periodic maintenance hook for the host scheduler.
//!
//! One cycle is a garbage-collection pass followed by (at most once ever)
//! bulk migration. Either step failing is logged and does not stop the
//! other, nor the next cycle.

use std::sync::Arc;
use std::time::Duration;

use arkiva_core::AttachmentDirectory;
use arkiva_storage::StorageEngine;
use serde::Serialize;
use tokio::time::interval;

use crate::gc::{GarbageCollector, GcReport};
use crate::migrate::{BulkMigrator, MigrationReport};

/// Combined counts of one maintenance cycle.
#[derive(Debug, Clone, Copy, Default, Serialize)]
pub struct MaintenanceReport {
    pub gc: GcReport,
    pub migration: MigrationReport,
}

pub struct MaintenanceService {
    gc: GarbageCollector,
    migrator: BulkMigrator,
    interval_secs: u64,
}

impl MaintenanceService {
    pub fn new(
        engine: Arc<StorageEngine>,
        directory: Arc<dyn AttachmentDirectory>,
        interval_secs: u64,
    ) -> Self {
        Self {
            gc: GarbageCollector::new(engine.clone(), directory.clone()),
            migrator: BulkMigrator::new(engine, directory),
            interval_secs,
        }
    }

    /// Run one maintenance cycle.
    #[tracing::instrument(skip(self))]
    pub async fn run_cycle(&self) -> MaintenanceReport {
        let gc = match self.gc.collect().await {
            Ok(report) => report,
            Err(err) => {
                tracing::error!(error = %err, "Garbage collection failed");
                GcReport::default()
            }
        };

        let migration = match self.migrator.run_once().await {
            Ok(report) => report,
            Err(err) => {
                tracing::error!(error = %err, "Bulk migration failed");
                MigrationReport::default()
            }
        };

        MaintenanceReport { gc, migration }
    }

    /// Start the periodic maintenance task.
    /// Returns a JoinHandle for graceful shutdown.
    pub fn start(self: Arc<Self>) -> tokio::task::JoinHandle<()> {
        tokio::spawn(async move {
            let mut cycle_interval = interval(Duration::from_secs(self.interval_secs));

            loop {
                cycle_interval.tick().await;

                tracing::info!("Starting maintenance cycle");
                let report = self.run_cycle().await;
                tracing::info!(
                    gc_checked = report.gc.checked,
                    gc_removed = report.gc.removed,
                    migration_uploaded = report.migration.uploaded,
                    "Maintenance cycle completed"
                );
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{checksum_of, remote_fixture, MemoryDirectory, REMOTE_LOCATION};
    use arkiva_core::constants::PARAM_MIGRATION_COMPLETE;
    use arkiva_core::ObjectMetadata;
    use bytes::Bytes;

    #[tokio::test]
    async fn cycle_collects_then_migrates_once() {
        let directory = MemoryDirectory::new(REMOTE_LOCATION);
        let (engine, store, _dir) = remote_fixture(directory.clone()).await;
        let engine = Arc::new(engine);

        // An unreferenced marked object for the collector, and a local-only
        // file for the migrator.
        let checksum = checksum_of(b"orphan");
        let outcome = engine
            .write(Bytes::from_static(b"orphan"), &checksum, &ObjectMetadata::default())
            .await
            .unwrap();
        engine.mark_for_gc(&outcome.filename).await.unwrap();
        engine.local().write("ab/abc123", b"local-only").await.unwrap();

        let service = MaintenanceService::new(engine.clone(), directory.clone(), 3600);

        let first = service.run_cycle().await;
        assert_eq!(first.gc.removed, 1);
        assert_eq!(first.migration.uploaded, 1);
        assert!(store.contains("maindb/ab/abc123"));
        assert_eq!(
            directory.param(PARAM_MIGRATION_COMPLETE).as_deref(),
            Some("true")
        );

        let second = service.run_cycle().await;
        assert_eq!(second.gc.checked, 0);
        assert_eq!(second.migration.uploaded, 0);
        assert!(second.migration.skipped);
    }
}
