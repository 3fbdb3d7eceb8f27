//! In-memory remote store.
//!
//! Implements [`RemoteStore`] over a mutex-guarded map. Used by the test
//! suites across the workspace and handy for local development without a
//! bucket.

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};

use arkiva_core::RemoteLocation;
use async_trait::async_trait;
use bytes::Bytes;

use crate::traits::{RemoteConnector, RemoteStore, StorageError, StorageResult};

#[derive(Debug, Clone)]
struct StoredEntry {
    data: Bytes,
    metadata: Vec<(String, String)>,
}

/// In-memory implementation of [`RemoteStore`].
pub struct MemoryRemoteStore {
    bucket: String,
    objects: Mutex<BTreeMap<String, StoredEntry>>,
}

impl MemoryRemoteStore {
    pub fn new(bucket: impl Into<String>) -> Self {
        Self {
            bucket: bucket.into(),
            objects: Mutex::new(BTreeMap::new()),
        }
    }

    pub fn contains(&self, key: &str) -> bool {
        self.objects.lock().unwrap().contains_key(key)
    }

    pub fn object(&self, key: &str) -> Option<Bytes> {
        self.objects
            .lock()
            .unwrap()
            .get(key)
            .map(|entry| entry.data.clone())
    }

    pub fn metadata_of(&self, key: &str) -> Option<Vec<(String, String)>> {
        self.objects
            .lock()
            .unwrap()
            .get(key)
            .map(|entry| entry.metadata.clone())
    }

    pub fn object_count(&self) -> usize {
        self.objects.lock().unwrap().len()
    }

    pub fn keys(&self) -> Vec<String> {
        self.objects.lock().unwrap().keys().cloned().collect()
    }
}

#[async_trait]
impl RemoteStore for MemoryRemoteStore {
    async fn get(&self, key: &str) -> StorageResult<Bytes> {
        self.objects
            .lock()
            .unwrap()
            .get(key)
            .map(|entry| entry.data.clone())
            .ok_or_else(|| StorageError::NotFound(key.to_string()))
    }

    async fn head(&self, key: &str) -> StorageResult<u64> {
        self.objects
            .lock()
            .unwrap()
            .get(key)
            .map(|entry| entry.data.len() as u64)
            .ok_or_else(|| StorageError::NotFound(key.to_string()))
    }

    async fn put(
        &self,
        key: &str,
        data: Bytes,
        metadata: &[(String, String)],
    ) -> StorageResult<()> {
        self.objects.lock().unwrap().insert(
            key.to_string(),
            StoredEntry {
                data,
                metadata: metadata.to_vec(),
            },
        );
        Ok(())
    }

    async fn copy(&self, src_key: &str, dst_key: &str) -> StorageResult<()> {
        let mut objects = self.objects.lock().unwrap();
        let entry = objects
            .get(src_key)
            .cloned()
            .ok_or_else(|| StorageError::NotFound(src_key.to_string()))?;
        objects.insert(dst_key.to_string(), entry);
        Ok(())
    }

    async fn delete(&self, key: &str) -> StorageResult<()> {
        self.objects.lock().unwrap().remove(key);
        Ok(())
    }

    async fn list(&self, prefix: &str) -> StorageResult<Vec<String>> {
        Ok(self
            .objects
            .lock()
            .unwrap()
            .keys()
            .filter(|key| key.starts_with(prefix))
            .cloned()
            .collect())
    }

    fn bucket(&self) -> &str {
        &self.bucket
    }
}

/// Connector handing out a shared [`MemoryRemoteStore`].
pub struct MemoryConnector {
    store: Arc<MemoryRemoteStore>,
}

impl MemoryConnector {
    pub fn new(store: Arc<MemoryRemoteStore>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl RemoteConnector for MemoryConnector {
    async fn connect(&self, _location: &RemoteLocation) -> StorageResult<Arc<dyn RemoteStore>> {
        Ok(self.store.clone())
    }
}

/// Connector that always fails, for exercising fallback paths.
pub struct UnreachableConnector;

#[async_trait]
impl RemoteConnector for UnreachableConnector {
    async fn connect(&self, location: &RemoteLocation) -> StorageResult<Arc<dyn RemoteStore>> {
        Err(StorageError::Connection(format!(
            "Connection refused: {}",
            location.bucket
        )))
    }
}
