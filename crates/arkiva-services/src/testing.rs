//! Shared in-memory fixtures for the service tests.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};

use arkiva_core::{AppError, AttachmentDirectory, AttachmentRecord, GcSession};
use arkiva_storage::{
    ContentAddresser, EnginePolicy, LocalFilestore, MemoryConnector, MemoryRemoteStore,
    StorageEngine,
};
use async_trait::async_trait;
use chrono::Utc;
use sha2::{Digest, Sha256};
use uuid::Uuid;

pub const REMOTE_LOCATION: &str = "s3://profile:default@testbucket";

pub fn checksum_of(data: &[u8]) -> String {
    hex::encode(Sha256::digest(data))
}

/// In-memory document-metadata layer.
pub struct MemoryDirectory {
    location: Mutex<String>,
    params: Mutex<HashMap<String, String>>,
    records: Mutex<Vec<AttachmentRecord>>,
}

impl MemoryDirectory {
    pub fn new(location: &str) -> Arc<Self> {
        Arc::new(Self {
            location: Mutex::new(location.to_string()),
            params: Mutex::new(HashMap::new()),
            records: Mutex::new(Vec::new()),
        })
    }

    pub fn insert_record(&self, name: &str, store_fname: Option<&str>) -> Uuid {
        let record = AttachmentRecord {
            id: Uuid::new_v4(),
            name: name.to_string(),
            res_model: None,
            res_id: None,
            description: None,
            store_fname: store_fname.map(str::to_string),
            checksum: None,
            remote_url: None,
            lost: false,
            created_at: Utc::now(),
        };
        let id = record.id;
        self.records.lock().unwrap().push(record);
        id
    }

    pub fn record(&self, id: Uuid) -> Option<AttachmentRecord> {
        self.records
            .lock()
            .unwrap()
            .iter()
            .find(|record| record.id == id)
            .cloned()
    }

    pub fn param(&self, key: &str) -> Option<String> {
        self.params.lock().unwrap().get(key).cloned()
    }
}

#[async_trait]
impl AttachmentDirectory for MemoryDirectory {
    async fn storage_location(&self) -> Result<String, AppError> {
        Ok(self.location.lock().unwrap().clone())
    }

    async fn get_param(&self, key: &str) -> Result<Option<String>, AppError> {
        Ok(self.param(key))
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
        candidates: &[String],
    ) -> Result<HashSet<String>, AppError> {
        let referenced: HashSet<String> = self
            .records
            .lock()
            .unwrap()
            .iter()
            .filter_map(|record| record.store_fname.clone())
            .collect();
        Ok(candidates
            .iter()
            .filter(|fname| referenced.contains(*fname))
            .cloned()
            .collect())
    }

    async fn mark_lost(&self, store_fname: &str) -> Result<u64, AppError> {
        let mut records = self.records.lock().unwrap();
        let mut flagged = 0;
        for record in records.iter_mut() {
            if record.store_fname.as_deref() == Some(store_fname) {
                record.lost = true;
                flagged += 1;
            }
        }
        Ok(flagged)
    }

    async fn records_by_ids(&self, ids: &[Uuid]) -> Result<Vec<AttachmentRecord>, AppError> {
        let records = self.records.lock().unwrap();
        Ok(records
            .iter()
            .filter(|record| ids.contains(&record.id))
            .cloned()
            .collect())
    }

    async fn begin_gc_session(&self) -> Result<Box<dyn GcSession>, AppError> {
        // Snapshot semantics: the whitelist is frozen at lock time.
        let referenced: HashSet<String> = self
            .records
            .lock()
            .unwrap()
            .iter()
            .filter_map(|record| record.store_fname.clone())
            .collect();
        Ok(Box::new(MemorySession { referenced }))
    }
}

struct MemorySession {
    referenced: HashSet<String>,
}

#[async_trait]
impl GcSession for MemorySession {
    async fn referenced_filenames(
        &mut self,
        candidates: &[String],
    ) -> Result<HashSet<String>, AppError> {
        Ok(candidates
            .iter()
            .filter(|fname| self.referenced.contains(*fname))
            .cloned()
            .collect())
    }

    async fn commit(self: Box<Self>) -> Result<(), AppError> {
        Ok(())
    }
}

/// Engine wired to the in-memory remote store and a tempdir filestore.
pub async fn remote_fixture(
    directory: Arc<MemoryDirectory>,
) -> (StorageEngine, Arc<MemoryRemoteStore>, tempfile::TempDir) {
    let dir = tempfile::tempdir().unwrap();
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
