//! Arkiva Core Library
//!
//! This crate provides the domain models, error types, configuration and the
//! collaborator interface to the document-metadata layer that are shared
//! across all Arkiva components.

pub mod config;
pub mod constants;
pub mod error;
pub mod hooks;
pub mod location;
pub mod models;

// Re-export commonly used types
pub use config::Config;
pub use error::AppError;
pub use hooks::{AttachmentDirectory, GcSession};
pub use location::{RemoteAuth, RemoteLocation, StorageLocation};
pub use models::{AttachmentRecord, ObjectMetadata};
