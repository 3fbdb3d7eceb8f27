//! Storage engine: the remote/local routing layer.
//!
//! Every call re-reads the storage location from the metadata directory and
//! decides remote vs local for that call only; there is no persistent
//! demotion. The remote connection handle is owned by the engine, lazily
//! established, keyed by the raw descriptor and invalidated on
//! connection-class failures so the next call reconnects transparently.
//!
//! The catch-and-fallback discipline is expressed as data: every outcome
//! carries a [`Placement`] so callers (and tests) can see whether bytes went
//! remote or why they fell back. Once bulk migration has completed the local
//! filestore no longer holds authoritative history, so remote failures are
//! surfaced instead of silently masked.

use std::fmt::{Display, Formatter, Result as FmtResult};
use std::sync::Arc;

use arkiva_core::{AppError, AttachmentDirectory, ObjectMetadata, StorageLocation};
use bytes::Bytes;
use tokio::sync::RwLock;

use crate::keys::{ContentAddresser, ObjectKey};
use crate::local::LocalFilestore;
use crate::traits::{RemoteConnector, RemoteStore, StorageError, StorageResult};

/// Why a call was served by the local filestore.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FallbackReason {
    /// The configured location is local-only; no remote call was attempted.
    LocalLocation,
    /// The location descriptor was malformed; failing closed to local.
    InvalidLocation(String),
    /// Connecting to the remote store failed.
    Connect(String),
    /// A remote operation failed after a successful connect.
    Remote(String),
}

impl Display for FallbackReason {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        match self {
            FallbackReason::LocalLocation => write!(f, "location is local-only"),
            FallbackReason::InvalidLocation(detail) => {
                write!(f, "malformed storage location: {detail}")
            }
            FallbackReason::Connect(detail) => write!(f, "remote connect failed: {detail}"),
            FallbackReason::Remote(detail) => write!(f, "remote operation failed: {detail}"),
        }
    }
}

/// Where the bytes of a call landed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Placement {
    Remote,
    Local(FallbackReason),
}

/// Result of a write.
#[derive(Debug, Clone)]
pub struct WriteOutcome {
    /// Canonical stored filename for the metadata layer, regardless of where
    /// the bytes landed.
    pub filename: String,
    pub placement: Placement,
    /// Remote object key, when the write landed remotely.
    pub remote_key: Option<String>,
}

/// Which tier served a read.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReadSource {
    Remote,
    /// Served from the trash tier; the object was copied back to its live
    /// key and the trash copy removed.
    RemoteRestored,
    Local(FallbackReason),
}

/// Result of a read.
#[derive(Debug, Clone)]
pub struct ReadOutcome {
    pub size: u64,
    /// Empty when the read was size-only.
    pub bytes: Bytes,
    pub source: ReadSource,
}

/// Result of a mark-for-gc call. Both stores are tracked independently.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MarkOutcome {
    pub remote_marked: bool,
    pub local_marked: bool,
}

/// Engine policy knobs.
#[derive(Debug, Clone)]
pub struct EnginePolicy {
    /// After migration completes, still write the local GC marker when the
    /// remote mark fails.
    pub gc_mark_local_after_remote_failure: bool,
}

impl Default for EnginePolicy {
    fn default() -> Self {
        Self {
            gc_mark_local_after_remote_failure: true,
        }
    }
}

/// Per-call routing decision.
pub enum RemoteDecision {
    Use(Arc<dyn RemoteStore>),
    Fallback(FallbackReason),
}

struct CachedRemote {
    descriptor: String,
    store: Arc<dyn RemoteStore>,
}

/// The storage engine.
pub struct StorageEngine {
    addresser: ContentAddresser,
    local: LocalFilestore,
    directory: Arc<dyn AttachmentDirectory>,
    connector: Arc<dyn RemoteConnector>,
    policy: EnginePolicy,
    remote: RwLock<Option<CachedRemote>>,
}

impl StorageEngine {
    pub fn new(
        addresser: ContentAddresser,
        local: LocalFilestore,
        directory: Arc<dyn AttachmentDirectory>,
        connector: Arc<dyn RemoteConnector>,
        policy: EnginePolicy,
    ) -> Self {
        Self {
            addresser,
            local,
            directory,
            connector,
            policy,
            remote: RwLock::new(None),
        }
    }

    pub fn addresser(&self) -> &ContentAddresser {
        &self.addresser
    }

    pub fn local(&self) -> &LocalFilestore {
        &self.local
    }

    /// Resolve the current location and hand out a connected remote store,
    /// or the reason this call is local.
    pub async fn remote_decision(&self) -> StorageResult<RemoteDecision> {
        let raw = self
            .directory
            .storage_location()
            .await
            .map_err(directory_err)?;

        let location = match StorageLocation::parse(&raw) {
            Ok(StorageLocation::Remote(location)) => location,
            Ok(StorageLocation::Local) => {
                return Ok(RemoteDecision::Fallback(FallbackReason::LocalLocation))
            }
            Err(err) => {
                tracing::warn!(error = %err, "Storage location is malformed, failing closed to local");
                return Ok(RemoteDecision::Fallback(FallbackReason::InvalidLocation(
                    err.to_string(),
                )));
            }
        };

        {
            let cached = self.remote.read().await;
            if let Some(entry) = cached.as_ref() {
                if entry.descriptor == raw {
                    return Ok(RemoteDecision::Use(entry.store.clone()));
                }
            }
        }

        match self.connector.connect(&location).await {
            Ok(store) => {
                *self.remote.write().await = Some(CachedRemote {
                    descriptor: raw,
                    store: store.clone(),
                });
                Ok(RemoteDecision::Use(store))
            }
            Err(err) => {
                tracing::error!(
                    error = %err,
                    location = %StorageLocation::Remote(location),
                    "Remote store connection failed, falling back to local filestore"
                );
                Ok(RemoteDecision::Fallback(FallbackReason::Connect(
                    err.to_string(),
                )))
            }
        }
    }

    /// Drop the cached handle after a connection-class failure.
    async fn invalidate_on(&self, err: &StorageError) {
        if err.is_connection() {
            *self.remote.write().await = None;
        }
    }

    /// Store a byte buffer under its content hash.
    ///
    /// Returns the canonical stored filename whichever tier holds the bytes.
    pub async fn write(
        &self,
        data: Bytes,
        checksum: &str,
        metadata: &ObjectMetadata,
    ) -> StorageResult<WriteOutcome> {
        let fname = self.addresser.filename_for(checksum)?;
        let migrated = self
            .directory
            .migration_complete()
            .await
            .map_err(directory_err)?;

        match self.remote_decision().await? {
            RemoteDecision::Fallback(FallbackReason::Connect(detail)) if migrated => {
                Err(StorageError::Connection(detail))
            }
            RemoteDecision::Fallback(reason) => self.write_local(fname, &data, reason).await,
            RemoteDecision::Use(store) => {
                let key = self.addresser.key_for_filename(&fname)?;
                match self.put_remote(&store, &key, &data, metadata).await {
                    Ok(remote_key) => Ok(WriteOutcome {
                        filename: fname,
                        placement: Placement::Remote,
                        remote_key: Some(remote_key),
                    }),
                    Err(err) if migrated => {
                        self.invalidate_on(&err).await;
                        tracing::error!(
                            error = %err,
                            key = %key,
                            "Remote write failed after migration completed, surfacing"
                        );
                        Err(err)
                    }
                    Err(err) => {
                        self.invalidate_on(&err).await;
                        tracing::error!(
                            error = %err,
                            key = %key,
                            "Remote write failed, falling back to local filestore"
                        );
                        self.write_local(fname, &data, FallbackReason::Remote(err.to_string()))
                            .await
                    }
                }
            }
        }
    }

    async fn write_local(
        &self,
        fname: String,
        data: &Bytes,
        reason: FallbackReason,
    ) -> StorageResult<WriteOutcome> {
        self.local.write(&fname, data).await?;
        Ok(WriteOutcome {
            filename: fname,
            placement: Placement::Local(reason),
            remote_key: None,
        })
    }

    async fn put_remote(
        &self,
        store: &Arc<dyn RemoteStore>,
        key: &ObjectKey,
        data: &Bytes,
        metadata: &ObjectMetadata,
    ) -> StorageResult<String> {
        let storage_key = key.storage_key();

        // Content addressing: an existing object already holds these bytes.
        match store.head(&storage_key).await {
            Ok(_) => {
                tracing::debug!(key = %storage_key, "Content already stored remotely, skipping upload");
                return Ok(storage_key);
            }
            Err(err) if err.is_not_found() => {}
            Err(err) => return Err(err),
        }

        store
            .put(&storage_key, data.clone(), &metadata.to_pairs())
            .await?;
        Ok(storage_key)
    }

    /// Fetch a stored file. `size_only` skips the body transfer where the
    /// backing store allows it.
    pub async fn read(&self, fname: &str, size_only: bool) -> StorageResult<ReadOutcome> {
        let key = self.addresser.key_for_filename(fname)?;
        let migrated = self
            .directory
            .migration_complete()
            .await
            .map_err(directory_err)?;

        match self.remote_decision().await? {
            RemoteDecision::Fallback(FallbackReason::Connect(detail)) if migrated => {
                Err(StorageError::Connection(detail))
            }
            RemoteDecision::Fallback(reason) => self.read_local(fname, size_only, reason).await,
            RemoteDecision::Use(store) => {
                match self.fetch_remote(&store, &key, size_only).await {
                    Ok(outcome) => Ok(outcome),
                    Err(err) if err.is_not_found() => {
                        // Missing from both the live and trash tiers.
                        match self.directory.mark_lost(fname).await {
                            Ok(flagged) if flagged > 0 => tracing::warn!(
                                key = %key,
                                records = flagged,
                                "Stored object missing from remote store, records flagged as lost"
                            ),
                            Ok(_) => {}
                            Err(e) => {
                                tracing::error!(error = %e, key = %key, "Failed to flag records as lost")
                            }
                        }
                        if migrated {
                            Err(StorageError::NotFound(fname.to_string()))
                        } else {
                            self.read_local(
                                fname,
                                size_only,
                                FallbackReason::Remote(format!("object missing: {key}")),
                            )
                            .await
                        }
                    }
                    Err(err) if migrated => {
                        self.invalidate_on(&err).await;
                        Err(err)
                    }
                    Err(err) => {
                        self.invalidate_on(&err).await;
                        tracing::error!(
                            error = %err,
                            key = %key,
                            "Remote read failed, falling back to local filestore"
                        );
                        self.read_local(fname, size_only, FallbackReason::Remote(err.to_string()))
                            .await
                    }
                }
            }
        }
    }

    async fn read_local(
        &self,
        fname: &str,
        size_only: bool,
        reason: FallbackReason,
    ) -> StorageResult<ReadOutcome> {
        if size_only {
            let size = self.local.content_length(fname).await?;
            return Ok(ReadOutcome {
                size,
                bytes: Bytes::new(),
                source: ReadSource::Local(reason),
            });
        }
        let data = self.local.read(fname).await?;
        Ok(ReadOutcome {
            size: data.len() as u64,
            bytes: Bytes::from(data),
            source: ReadSource::Local(reason),
        })
    }

    /// Live tier first, then the trash tier with self-healing restore.
    async fn fetch_remote(
        &self,
        store: &Arc<dyn RemoteStore>,
        key: &ObjectKey,
        size_only: bool,
    ) -> StorageResult<ReadOutcome> {
        let live_key = key.storage_key();

        if size_only {
            match store.head(&live_key).await {
                Ok(size) => {
                    return Ok(ReadOutcome {
                        size,
                        bytes: Bytes::new(),
                        source: ReadSource::Remote,
                    })
                }
                Err(err) if err.is_not_found() => {}
                Err(err) => return Err(err),
            }
        } else {
            match store.get(&live_key).await {
                Ok(bytes) => {
                    return Ok(ReadOutcome {
                        size: bytes.len() as u64,
                        bytes,
                        source: ReadSource::Remote,
                    })
                }
                Err(err) if err.is_not_found() => {}
                Err(err) => return Err(err),
            }
        }

        let trash_key = key.to_trash().storage_key();
        let bytes = store.get(&trash_key).await.map_err(|err| {
            if err.is_not_found() {
                StorageError::NotFound(live_key.clone())
            } else {
                err
            }
        })?;

        // Copy back before removing the tombstone; if the restore copy fails
        // the trash entry survives and the next read retries.
        match store.copy(&trash_key, &live_key).await {
            Ok(()) => {
                if let Err(err) = store.delete(&trash_key).await {
                    tracing::warn!(error = %err, trash_key = %trash_key, "Restored object but failed to remove trash copy");
                }
                tracing::info!(key = %live_key, "Restored object from trash");
            }
            Err(err) => {
                tracing::error!(error = %err, key = %live_key, "Failed to restore object from trash, serving trash copy");
            }
        }

        Ok(ReadOutcome {
            size: bytes.len() as u64,
            bytes: if size_only { Bytes::new() } else { bytes },
            source: ReadSource::RemoteRestored,
        })
    }

    /// Mark a stored file as a garbage-collection candidate in both tiers.
    pub async fn mark_for_gc(&self, fname: &str) -> StorageResult<MarkOutcome> {
        let key = self.addresser.key_for_filename(fname)?;
        let migrated = self
            .directory
            .migration_complete()
            .await
            .map_err(directory_err)?;

        let mut remote_marked = false;
        let mut remote_failed = false;

        match self.remote_decision().await? {
            RemoteDecision::Fallback(reason) => {
                if matches!(
                    reason,
                    FallbackReason::Connect(_) | FallbackReason::InvalidLocation(_)
                ) {
                    remote_failed = true;
                }
                tracing::debug!(fname = %fname, reason = %reason, "Remote GC mark skipped");
            }
            RemoteDecision::Use(store) => {
                let checklist_key = key.to_checklist().storage_key();
                match store.put(&checklist_key, Bytes::new(), &[]).await {
                    Ok(()) => {
                        remote_marked = true;
                        tracing::debug!(checklist_key = %checklist_key, "Marked for garbage collection");
                    }
                    Err(err) => {
                        remote_failed = true;
                        self.invalidate_on(&err).await;
                        tracing::error!(
                            error = %err,
                            checklist_key = %checklist_key,
                            "Failed to write checklist entry"
                        );
                    }
                }
            }
        }

        // Both stores are tracked independently, so the local marker is
        // written as well; after migration a remote failure suppresses it
        // only when policy says so.
        let suppress_local =
            migrated && remote_failed && !self.policy.gc_mark_local_after_remote_failure;
        let mut local_marked = false;
        if suppress_local {
            tracing::warn!(fname = %fname, "Local GC mark suppressed by policy after remote failure");
        } else {
            self.local.mark_for_gc(fname).await?;
            local_marked = true;
        }

        Ok(MarkOutcome {
            remote_marked,
            local_marked,
        })
    }
}

fn directory_err(err: AppError) -> StorageError {
    StorageError::Directory(err.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::{MemoryConnector, MemoryRemoteStore, UnreachableConnector};
    use arkiva_core::constants::PARAM_MIGRATION_COMPLETE;
    use arkiva_core::{AttachmentRecord, GcSession};
    use async_trait::async_trait;
    use sha2::{Digest, Sha256};
    use std::collections::{HashMap, HashSet};
    use std::sync::Mutex;
    use tempfile::tempdir;
    use uuid::Uuid;

    struct StubDirectory {
        location: Mutex<String>,
        params: Mutex<HashMap<String, String>>,
        lost: Mutex<Vec<String>>,
    }

    impl StubDirectory {
        fn new(location: &str) -> Arc<Self> {
            Arc::new(Self {
                location: Mutex::new(location.to_string()),
                params: Mutex::new(HashMap::new()),
                lost: Mutex::new(Vec::new()),
            })
        }

        fn set_migrated(&self) {
            self.params.lock().unwrap().insert(
                PARAM_MIGRATION_COMPLETE.to_string(),
                "true".to_string(),
            );
        }

        fn lost_filenames(&self) -> Vec<String> {
            self.lost.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl AttachmentDirectory for StubDirectory {
        async fn storage_location(&self) -> Result<String, AppError> {
            Ok(self.location.lock().unwrap().clone())
        }

        async fn get_param(&self, key: &str) -> Result<Option<String>, AppError> {
            Ok(self.params.lock().unwrap().get(key).cloned())
        }

        async fn set_param(&self, key: &str, value: &str) -> Result<(), AppError> {
            self.params
                .lock()
                .unwrap()
                .insert(key.to_string(), value.to_string());
            Ok(())
        }

        async fn referenced_filenames(
            &self,
            _candidates: &[String],
        ) -> Result<HashSet<String>, AppError> {
            Ok(HashSet::new())
        }

        async fn mark_lost(&self, store_fname: &str) -> Result<u64, AppError> {
            self.lost.lock().unwrap().push(store_fname.to_string());
            Ok(1)
        }

        async fn records_by_ids(&self, _ids: &[Uuid]) -> Result<Vec<AttachmentRecord>, AppError> {
            Ok(Vec::new())
        }

        async fn begin_gc_session(&self) -> Result<Box<dyn GcSession>, AppError> {
            Err(AppError::Internal("not supported in this stub".to_string()))
        }
    }

    const REMOTE_LOCATION: &str = "s3://profile:default@testbucket";

    fn checksum_of(data: &[u8]) -> String {
        hex::encode(Sha256::digest(data))
    }

    async fn remote_engine(
        directory: Arc<StubDirectory>,
    ) -> (StorageEngine, Arc<MemoryRemoteStore>, tempfile::TempDir) {
        let dir = tempdir().unwrap();
        let local = LocalFilestore::new(dir.path()).await.unwrap();
        let store = Arc::new(MemoryRemoteStore::new("testbucket"));
        let engine = StorageEngine::new(
            ContentAddresser::new("maindb"),
            local,
            directory,
            Arc::new(MemoryConnector::new(store.clone())),
            EnginePolicy::default(),
        );
        (engine, store, dir)
    }

    #[tokio::test]
    async fn remote_write_read_round_trip() {
        let directory = StubDirectory::new(REMOTE_LOCATION);
        let (engine, store, _dir) = remote_engine(directory).await;

        let data = Bytes::from_static(b"blob1");
        let checksum = checksum_of(b"blob1");
        let outcome = engine
            .write(data.clone(), &checksum, &ObjectMetadata::default())
            .await
            .unwrap();

        assert_eq!(outcome.placement, Placement::Remote);
        assert_eq!(store.object_count(), 1);
        // nothing fell through to the local tier
        assert!(!engine.local().exists(&outcome.filename).await.unwrap());

        let read = engine.read(&outcome.filename, false).await.unwrap();
        assert_eq!(read.bytes, data);
        assert_eq!(read.source, ReadSource::Remote);

        let sized = engine.read(&outcome.filename, true).await.unwrap();
        assert_eq!(sized.size, data.len() as u64);
        assert!(sized.bytes.is_empty());
    }

    #[tokio::test]
    async fn writing_same_content_twice_stores_one_object() {
        let directory = StubDirectory::new(REMOTE_LOCATION);
        let (engine, store, _dir) = remote_engine(directory).await;

        let checksum = checksum_of(b"blob1");
        let first = engine
            .write(Bytes::from_static(b"blob1"), &checksum, &ObjectMetadata::default())
            .await
            .unwrap();
        let second = engine
            .write(Bytes::from_static(b"blob1"), &checksum, &ObjectMetadata::default())
            .await
            .unwrap();

        assert_eq!(first.filename, second.filename);
        assert_eq!(store.object_count(), 1);
    }

    #[tokio::test]
    async fn local_location_writes_locally_without_remote_calls() {
        let directory = StubDirectory::new("file");
        let (engine, store, _dir) = remote_engine(directory).await;

        let checksum = checksum_of(b"blob1");
        let outcome = engine
            .write(Bytes::from_static(b"blob1"), &checksum, &ObjectMetadata::default())
            .await
            .unwrap();

        assert_eq!(
            outcome.placement,
            Placement::Local(FallbackReason::LocalLocation)
        );
        assert_eq!(store.object_count(), 0);

        let read = engine.read(&outcome.filename, false).await.unwrap();
        assert_eq!(read.bytes, Bytes::from_static(b"blob1"));
        assert_eq!(read.source, ReadSource::Local(FallbackReason::LocalLocation));
    }

    #[tokio::test]
    async fn unreachable_remote_falls_back_to_local() {
        let directory = StubDirectory::new(REMOTE_LOCATION);
        let dir = tempdir().unwrap();
        let local = LocalFilestore::new(dir.path()).await.unwrap();
        let engine = StorageEngine::new(
            ContentAddresser::new("maindb"),
            local,
            directory,
            Arc::new(UnreachableConnector),
            EnginePolicy::default(),
        );

        let checksum = checksum_of(b"blob2");
        let outcome = engine
            .write(Bytes::from_static(b"blob2"), &checksum, &ObjectMetadata::default())
            .await
            .unwrap();

        match &outcome.placement {
            Placement::Local(FallbackReason::Connect(_)) => {}
            other => panic!("expected connect fallback, got {other:?}"),
        }
        assert!(engine.local().exists(&outcome.filename).await.unwrap());
    }

    #[tokio::test]
    async fn connect_failure_after_migration_is_surfaced() {
        let directory = StubDirectory::new(REMOTE_LOCATION);
        directory.set_migrated();
        let dir = tempdir().unwrap();
        let local = LocalFilestore::new(dir.path()).await.unwrap();
        let engine = StorageEngine::new(
            ContentAddresser::new("maindb"),
            local,
            directory,
            Arc::new(UnreachableConnector),
            EnginePolicy::default(),
        );

        let checksum = checksum_of(b"blob2");
        let result = engine
            .write(Bytes::from_static(b"blob2"), &checksum, &ObjectMetadata::default())
            .await;

        assert!(matches!(result, Err(StorageError::Connection(_))));
    }

    #[tokio::test]
    async fn read_restores_object_from_trash() {
        let directory = StubDirectory::new(REMOTE_LOCATION);
        let (engine, store, _dir) = remote_engine(directory).await;

        let checksum = checksum_of(b"recoverable");
        let fname = engine.addresser().filename_for(&checksum).unwrap();
        let key = engine.addresser().key_for_filename(&fname).unwrap();

        // Simulate a collected object: bytes live only under trash/.
        store
            .put(
                &key.to_trash().storage_key(),
                Bytes::from_static(b"recoverable"),
                &[],
            )
            .await
            .unwrap();

        let read = engine.read(&fname, false).await.unwrap();
        assert_eq!(read.bytes, Bytes::from_static(b"recoverable"));
        assert_eq!(read.source, ReadSource::RemoteRestored);

        // Self-healed: live key back, tombstone gone.
        assert!(store.contains(&key.storage_key()));
        assert!(!store.contains(&key.to_trash().storage_key()));

        // The next read is a plain remote hit.
        let again = engine.read(&fname, false).await.unwrap();
        assert_eq!(again.source, ReadSource::Remote);
    }

    #[tokio::test]
    async fn missing_object_flags_records_as_lost() {
        let directory = StubDirectory::new(REMOTE_LOCATION);
        let (engine, _store, _dir) = remote_engine(directory.clone()).await;

        let result = engine.read("ab/abc123", false).await;

        // Not in remote, trash or the local filestore.
        assert!(matches!(result, Err(StorageError::NotFound(_))));
        assert_eq!(directory.lost_filenames(), vec!["ab/abc123"]);
    }

    #[tokio::test]
    async fn mark_for_gc_marks_both_tiers() {
        let directory = StubDirectory::new(REMOTE_LOCATION);
        let (engine, store, _dir) = remote_engine(directory).await;

        let checksum = checksum_of(b"doomed");
        let outcome = engine
            .write(Bytes::from_static(b"doomed"), &checksum, &ObjectMetadata::default())
            .await
            .unwrap();

        let mark = engine.mark_for_gc(&outcome.filename).await.unwrap();
        assert!(mark.remote_marked);
        assert!(mark.local_marked);

        let key = engine
            .addresser()
            .key_for_filename(&outcome.filename)
            .unwrap();
        let checklist_key = key.to_checklist().storage_key();
        assert!(store.contains(&checklist_key));
        assert_eq!(store.object(&checklist_key).unwrap().len(), 0);
    }

    #[tokio::test]
    async fn post_migration_mark_failure_honors_local_policy() {
        // Policy off: suppress the local marker.
        let directory = StubDirectory::new(REMOTE_LOCATION);
        directory.set_migrated();
        let dir = tempdir().unwrap();
        let local = LocalFilestore::new(dir.path()).await.unwrap();
        let engine = StorageEngine::new(
            ContentAddresser::new("maindb"),
            local,
            directory,
            Arc::new(UnreachableConnector),
            EnginePolicy {
                gc_mark_local_after_remote_failure: false,
            },
        );

        let mark = engine.mark_for_gc("ab/abc123").await.unwrap();
        assert!(!mark.remote_marked);
        assert!(!mark.local_marked);

        // Default policy: still mark locally.
        let directory = StubDirectory::new(REMOTE_LOCATION);
        directory.set_migrated();
        let dir = tempdir().unwrap();
        let local = LocalFilestore::new(dir.path()).await.unwrap();
        let engine = StorageEngine::new(
            ContentAddresser::new("maindb"),
            local,
            directory,
            Arc::new(UnreachableConnector),
            EnginePolicy::default(),
        );

        let mark = engine.mark_for_gc("ab/abc123").await.unwrap();
        assert!(!mark.remote_marked);
        assert!(mark.local_marked);
    }
}
