//! Arkiva DB Library
//!
//! Postgres implementation of the document-metadata collaborator interface:
//! the attachment repository, the configuration-parameter repository and the
//! `AttachmentDirectory` facade the storage engine and maintenance services
//! talk to.

pub mod db;

// Re-export commonly used types
pub use db::attachment::AttachmentRepository;
pub use db::config_param::ConfigParamRepository;
pub use db::directory::PgAttachmentDirectory;
pub use db::{connect_pool, run_migrations};
