//! Remote store abstraction
//!
//! This module defines the `RemoteStore` trait implemented by the S3 client
//! and by the in-memory store used in tests, together with the storage error
//! taxonomy.

use std::sync::Arc;

use arkiva_core::{AppError, RemoteLocation};
use async_trait::async_trait;
use bytes::Bytes;
use thiserror::Error;

/// Storage operation errors
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Connection failed: {0}")]
    Connection(String),

    #[error("Object not found: {0}")]
    NotFound(String),

    #[error("Transient service error: {0}")]
    Transient(String),

    #[error("Permission denied: {0}")]
    Permission(String),

    #[error("Invalid storage key: {0}")]
    InvalidKey(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Metadata directory error: {0}")]
    Directory(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

impl StorageError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, StorageError::NotFound(_))
    }

    /// Connection-class failures invalidate the engine's cached handle so
    /// the next call reconnects.
    pub fn is_connection(&self) -> bool {
        matches!(self, StorageError::Connection(_))
    }
}

impl From<StorageError> for AppError {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::NotFound(what) => AppError::NotFound(what),
            StorageError::Config(what) => AppError::Config(what),
            other => AppError::Storage(other.to_string()),
        }
    }
}

/// Synchronous-per-call view of the remote object store.
///
/// All operations may fail with {Connection, NotFound, Transient,
/// Permission}; none of them is fatal to the caller — the engine always has
/// a fallback path.
#[async_trait]
pub trait RemoteStore: Send + Sync {
    /// Fetch an object's bytes.
    async fn get(&self, key: &str) -> StorageResult<Bytes>;

    /// Size in bytes of an object, without fetching the body.
    async fn head(&self, key: &str) -> StorageResult<u64>;

    /// Store an object with per-object metadata pairs.
    async fn put(&self, key: &str, data: Bytes, metadata: &[(String, String)])
        -> StorageResult<()>;

    /// Server-side copy from one key to another.
    async fn copy(&self, src_key: &str, dst_key: &str) -> StorageResult<()>;

    /// Delete an object. Deleting a missing object is not an error.
    async fn delete(&self, key: &str) -> StorageResult<()>;

    /// List all object keys under a prefix. Finite; driven to completion via
    /// continuation tokens.
    async fn list(&self, prefix: &str) -> StorageResult<Vec<String>>;

    /// Bucket this store is bound to.
    fn bucket(&self) -> &str;
}

/// Builds connected [`RemoteStore`] handles from a parsed remote location.
///
/// The engine owns one connector and calls it lazily; injecting a different
/// connector is how tests run against the in-memory store.
#[async_trait]
pub trait RemoteConnector: Send + Sync {
    async fn connect(&self, location: &RemoteLocation) -> StorageResult<Arc<dyn RemoteStore>>;
}
