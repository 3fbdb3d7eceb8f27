//! Error types module
//!
//! This module provides the core error type used throughout Arkiva. All
//! errors are unified under the `AppError` enum which can represent database,
//! storage, configuration and other domain-specific errors.
//!
//! The `Database` variant and `From<sqlx::Error>` are gated behind the `sqlx`
//! feature so that crates without a database dependency can still use
//! `AppError`.

#[cfg(feature = "sqlx")]
use sqlx::Error as SqlxError;

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[cfg(feature = "sqlx")]
    #[error("Database error: {0}")]
    Database(#[from] SqlxError),

    #[cfg(not(feature = "sqlx"))]
    #[error("Database error: {0}")]
    Database(String),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    /// Whether a retry next cycle could plausibly succeed.
    pub fn is_recoverable(&self) -> bool {
        matches!(self, AppError::Database(_) | AppError::Storage(_))
    }
}
