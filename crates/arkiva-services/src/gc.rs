//! Garbage collector: lock, scan, sweep.
//!
//! One atomic pass per maintenance cycle. The record set is locked in share
//! mode for the scan+decide phase; reclaimed objects are copied to the trash
//! tier before their live copy and checklist entry are deleted, so a live
//! object is never lost before a trash copy exists. A remote error aborts
//! only the current candidate; the lock is always released.

use std::sync::Arc;

use arkiva_core::{AttachmentDirectory, GcSession};
use arkiva_storage::keys::ObjectKey;
use arkiva_storage::{
    FallbackReason, RemoteDecision, RemoteStore, StorageEngine, StorageResult,
};
use serde::Serialize;

/// Counts reported by one collection pass.
#[derive(Debug, Clone, Copy, Default, Serialize)]
pub struct GcReport {
    /// Checklist candidates examined.
    pub checked: usize,
    /// Objects moved to the trash tier.
    pub removed: usize,
}

pub struct GarbageCollector {
    engine: Arc<StorageEngine>,
    directory: Arc<dyn AttachmentDirectory>,
}

impl GarbageCollector {
    pub fn new(engine: Arc<StorageEngine>, directory: Arc<dyn AttachmentDirectory>) -> Self {
        Self { engine, directory }
    }

    /// Run one collection pass.
    #[tracing::instrument(skip(self), fields(gc.operation = "collect"))]
    pub async fn collect(&self) -> Result<GcReport, anyhow::Error> {
        let store = match self.engine.remote_decision().await? {
            RemoteDecision::Use(store) => store,
            RemoteDecision::Fallback(
                FallbackReason::LocalLocation | FallbackReason::InvalidLocation(_),
            ) => {
                tracing::debug!("Remote store not configured, nothing to collect");
                return Ok(GcReport::default());
            }
            RemoteDecision::Fallback(reason) => {
                anyhow::bail!("Garbage collection pass aborted: {reason}");
            }
        };

        let mut session = self.directory.begin_gc_session().await?;

        let result = self.sweep(&store, session.as_mut()).await;
        if let Err(ref err) = result {
            tracing::error!(error = %err, "Garbage collection sweep failed");
        }

        // The lock is released whether or not the sweep succeeded.
        session.commit().await?;

        let report = result?;
        tracing::info!(
            checked = report.checked,
            removed = report.removed,
            "Garbage collection completed"
        );
        Ok(report)
    }

    async fn sweep(
        &self,
        store: &Arc<dyn RemoteStore>,
        session: &mut dyn GcSession,
    ) -> Result<GcReport, anyhow::Error> {
        let addresser = self.engine.addresser();

        let listed = store.list(&addresser.checklist_prefix()).await?;
        let candidates: Vec<(String, String)> = listed
            .into_iter()
            .filter_map(|checklist_key| {
                addresser
                    .filename_from_checklist_key(&checklist_key)
                    .map(|fname| (checklist_key, fname))
            })
            .collect();

        let fnames: Vec<String> = candidates.iter().map(|(_, fname)| fname.clone()).collect();
        let whitelist = session.referenced_filenames(&fnames).await?;

        let mut removed = 0usize;
        for (checklist_key, fname) in &candidates {
            let key = match addresser.key_for_filename(fname) {
                Ok(key) => key,
                Err(err) => {
                    tracing::warn!(error = %err, checklist_key = %checklist_key, "Skipping malformed checklist entry");
                    continue;
                }
            };

            if whitelist.contains(fname) {
                // Referenced again after being marked: the object survives,
                // only the marker goes away.
                if let Err(err) = store.delete(checklist_key).await {
                    tracing::error!(error = %err, checklist_key = %checklist_key, "Failed to delete checklist entry");
                }
                continue;
            }

            match self.reclaim(store, &key, checklist_key).await {
                Ok(true) => removed += 1,
                Ok(false) => {}
                Err(err) => {
                    tracing::error!(
                        error = %err,
                        key = %key,
                        checklist_key = %checklist_key,
                        "Failed to reclaim object, will retry next cycle"
                    );
                }
            }
        }

        Ok(GcReport {
            checked: candidates.len(),
            removed,
        })
    }

    /// Move one unreferenced object to trash. Returns whether a live object
    /// was actually reclaimed.
    async fn reclaim(
        &self,
        store: &Arc<dyn RemoteStore>,
        key: &ObjectKey,
        checklist_key: &str,
    ) -> StorageResult<bool> {
        let live_key = key.storage_key();
        let trash_key = key.to_trash().storage_key();

        // Copy before delete: the live object must never disappear without a
        // trash copy in place.
        match store.copy(&live_key, &trash_key).await {
            Ok(()) => {
                store.delete(&live_key).await?;
                store.delete(checklist_key).await?;
                tracing::info!(key = %live_key, trash_key = %trash_key, "Object moved to trash");
                Ok(true)
            }
            Err(err) if err.is_not_found() => {
                // No live object behind the marker; drop the stale entry.
                store.delete(checklist_key).await?;
                Ok(false)
            }
            Err(err) => Err(err),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{checksum_of, remote_fixture, MemoryDirectory, REMOTE_LOCATION};
    use arkiva_core::ObjectMetadata;
    use bytes::Bytes;

    #[tokio::test]
    async fn unreferenced_candidate_is_moved_to_trash() {
        let directory = MemoryDirectory::new(REMOTE_LOCATION);
        let (engine, store, _dir) = remote_fixture(directory.clone()).await;
        let engine = Arc::new(engine);

        let checksum = checksum_of(b"orphan");
        let outcome = engine
            .write(Bytes::from_static(b"orphan"), &checksum, &ObjectMetadata::default())
            .await
            .unwrap();
        engine.mark_for_gc(&outcome.filename).await.unwrap();

        let collector = GarbageCollector::new(engine.clone(), directory);
        let report = collector.collect().await.unwrap();

        assert_eq!(report.checked, 1);
        assert_eq!(report.removed, 1);

        let key = engine
            .addresser()
            .key_for_filename(&outcome.filename)
            .unwrap();
        assert!(!store.contains(&key.storage_key()));
        assert!(store.contains(&key.to_trash().storage_key()));
        assert!(!store.contains(&key.to_checklist().storage_key()));
    }

    #[tokio::test]
    async fn whitelisted_candidate_survives() {
        let directory = MemoryDirectory::new(REMOTE_LOCATION);
        let (engine, store, _dir) = remote_fixture(directory.clone()).await;
        let engine = Arc::new(engine);

        let checksum = checksum_of(b"still wanted");
        let outcome = engine
            .write(
                Bytes::from_static(b"still wanted"),
                &checksum,
                &ObjectMetadata::default(),
            )
            .await
            .unwrap();
        engine.mark_for_gc(&outcome.filename).await.unwrap();

        // A record still references the filename at scan time.
        directory.insert_record("kept.pdf", Some(&outcome.filename));

        let collector = GarbageCollector::new(engine.clone(), directory);
        let report = collector.collect().await.unwrap();

        assert_eq!(report.checked, 1);
        assert_eq!(report.removed, 0);

        let key = engine
            .addresser()
            .key_for_filename(&outcome.filename)
            .unwrap();
        assert!(store.contains(&key.storage_key()));
        assert!(!store.contains(&key.to_trash().storage_key()));
        // marker is consumed either way
        assert!(!store.contains(&key.to_checklist().storage_key()));
    }

    #[tokio::test]
    async fn local_location_collects_nothing() {
        let directory = MemoryDirectory::new("file");
        let (engine, _store, _dir) = remote_fixture(directory.clone()).await;

        let collector = GarbageCollector::new(Arc::new(engine), directory);
        let report = collector.collect().await.unwrap();

        assert_eq!(report.checked, 0);
        assert_eq!(report.removed, 0);
    }

    #[tokio::test]
    async fn restored_object_reads_back_identical_bytes() {
        let directory = MemoryDirectory::new(REMOTE_LOCATION);
        let (engine, store, _dir) = remote_fixture(directory.clone()).await;
        let engine = Arc::new(engine);

        let payload = Bytes::from_static(b"collect me, then bring me back");
        let checksum = checksum_of(&payload);
        let outcome = engine
            .write(payload.clone(), &checksum, &ObjectMetadata::default())
            .await
            .unwrap();
        engine.mark_for_gc(&outcome.filename).await.unwrap();

        let collector = GarbageCollector::new(engine.clone(), directory);
        collector.collect().await.unwrap();

        // The read path restores from trash and heals the live key.
        let read = engine.read(&outcome.filename, false).await.unwrap();
        assert_eq!(read.bytes, payload);

        let key = engine
            .addresser()
            .key_for_filename(&outcome.filename)
            .unwrap();
        assert!(store.contains(&key.storage_key()));
        assert!(!store.contains(&key.to_trash().storage_key()));
    }
}
