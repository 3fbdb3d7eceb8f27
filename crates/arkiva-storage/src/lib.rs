//! Arkiva Storage Library
//!
//! This crate is the storage engine behind the document-management layer's
//! attachment persistence: content-addressed keys, the local filestore, the
//! remote object-store client and the engine that routes between them.
//!
//! # Object key format
//!
//! Keys are namespace-scoped and content-addressed. For a content hash
//! `ab12...`, the live object lives at `{namespace}/ab/ab12...`; the reserved
//! tiers are `{namespace}/checklist/{fname}` (garbage-collection candidates)
//! and `{namespace}/trash/{fname}` (soft-deleted, recoverable). Key
//! derivation is centralized in the `keys` module so every component renders
//! the same strings.

pub mod engine;
pub mod keys;
pub mod local;
pub mod memory;
#[cfg(feature = "storage-s3")]
pub mod s3;
pub mod traits;

// Re-export commonly used types
pub use engine::{
    EnginePolicy, FallbackReason, MarkOutcome, Placement, ReadOutcome, ReadSource, RemoteDecision,
    StorageEngine, WriteOutcome,
};
pub use keys::{ContentAddresser, KeyKind, ObjectKey};
pub use local::LocalFilestore;
pub use memory::{MemoryConnector, MemoryRemoteStore, UnreachableConnector};
#[cfg(feature = "storage-s3")]
pub use s3::{S3Connector, S3RemoteStore};
pub use traits::{RemoteConnector, RemoteStore, StorageError, StorageResult};
