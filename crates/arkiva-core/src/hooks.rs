//! Collaborator interface to the document-metadata layer.
//!
//! This module defines the narrow trait through which the storage engine and
//! the maintenance services talk to the surrounding document-management
//! framework, without depending on it. The Postgres implementation lives in
//! `arkiva-db`; tests provide in-memory implementations.

use std::collections::HashSet;

use async_trait::async_trait;
use uuid::Uuid;

use crate::constants::PARAM_MIGRATION_COMPLETE;
use crate::error::AppError;
use crate::models::AttachmentRecord;

/// Narrow interface to the document-metadata layer.
#[async_trait]
pub trait AttachmentDirectory: Send + Sync {
    /// Current storage location descriptor string.
    ///
    /// Re-read on every storage call; the engine never caches the decision.
    async fn storage_location(&self) -> Result<String, AppError>;

    /// Read a named configuration parameter.
    async fn get_param(&self, key: &str) -> Result<Option<String>, AppError>;

    /// Write a named configuration parameter.
    async fn set_param(&self, key: &str, value: &str) -> Result<(), AppError>;

    /// Of the given candidate filenames, return those still referenced by a
    /// live record. Implementations chunk the query to respect their own
    /// parameter limits.
    async fn referenced_filenames(
        &self,
        candidates: &[String],
    ) -> Result<HashSet<String>, AppError>;

    /// Flag every record pointing at `store_fname` as lost. Returns the
    /// number of records updated.
    async fn mark_lost(&self, store_fname: &str) -> Result<u64, AppError>;

    /// Fetch records by id, for administrative inspection.
    async fn records_by_ids(&self, ids: &[Uuid]) -> Result<Vec<AttachmentRecord>, AppError>;

    /// Open a garbage-collection session.
    ///
    /// The session must take a share-mode lock on the record set as the first
    /// statement of a fresh transaction, so the whitelist snapshot cannot
    /// miss records created while the sweep decides.
    async fn begin_gc_session(&self) -> Result<Box<dyn GcSession>, AppError>;

    /// Whether bulk migration to the remote store has completed.
    async fn migration_complete(&self) -> Result<bool, AppError> {
        let value = self.get_param(PARAM_MIGRATION_COMPLETE).await?;
        Ok(matches!(value.as_deref(), Some("true") | Some("1")))
    }
}

/// A locked garbage-collection scan over the record set.
///
/// Holds the share-mode lock until [`GcSession::commit`]; dropping the
/// session without committing releases the lock by rolling back.
#[async_trait]
pub trait GcSession: Send {
    /// Whitelist query, evaluated inside the locked transaction.
    async fn referenced_filenames(
        &mut self,
        candidates: &[String],
    ) -> Result<HashSet<String>, AppError>;

    /// Release the lock by committing the transaction.
    async fn commit(self: Box<Self>) -> Result<(), AppError>;
}
