//! Configuration module
//!
//! Environment-driven configuration for the storage engine, the local
//! filestore, the database connection and the maintenance services.

use std::env;

// Common defaults
const MAX_CONNECTIONS: u32 = 20;
const REMOTE_TIMEOUT_SECS: u64 = 30;
const MAINTENANCE_INTERVAL_SECS: u64 = 86_400;

/// Application configuration.
#[derive(Clone, Debug)]
pub struct Config {
    /// Postgres connection string for the document-metadata database.
    pub database_url: String,
    /// Tenant/database namespace; the leading component of every object key.
    pub namespace: String,
    /// Root directory of the local filestore.
    pub filestore_path: String,
    pub db_max_connections: u32,
    // Remote store configuration
    pub s3_region: Option<String>,
    /// Custom endpoint for S3-compatible providers (MinIO etc.).
    pub s3_endpoint: Option<String>,
    /// Bounded per-operation timeout on remote calls.
    pub remote_timeout_secs: u64,
    /// After migration completes, still write the local GC marker when the
    /// remote mark fails.
    pub gc_mark_local_after_remote_failure: bool,
    /// Interval between maintenance cycles when running the periodic hook.
    pub maintenance_interval_secs: u64,
}

impl Config {
    pub fn from_env() -> Result<Self, anyhow::Error> {
        let database_url = env::var("ARKIVA_DATABASE_URL")
            .or_else(|_| env::var("DATABASE_URL"))
            .map_err(|_| anyhow::anyhow!("ARKIVA_DATABASE_URL or DATABASE_URL must be set"))?;

        let namespace = env::var("ARKIVA_NAMESPACE")
            .map_err(|_| anyhow::anyhow!("ARKIVA_NAMESPACE must be set"))?;

        let filestore_path = env::var("ARKIVA_FILESTORE_PATH")
            .map_err(|_| anyhow::anyhow!("ARKIVA_FILESTORE_PATH must be set"))?;

        let config = Config {
            database_url,
            namespace,
            filestore_path,
            db_max_connections: parse_env("ARKIVA_DB_MAX_CONNECTIONS", MAX_CONNECTIONS)?,
            s3_region: env::var("ARKIVA_S3_REGION")
                .or_else(|_| env::var("AWS_REGION"))
                .ok(),
            s3_endpoint: env::var("ARKIVA_S3_ENDPOINT").ok(),
            remote_timeout_secs: parse_env("ARKIVA_REMOTE_TIMEOUT_SECS", REMOTE_TIMEOUT_SECS)?,
            gc_mark_local_after_remote_failure: parse_env(
                "ARKIVA_GC_MARK_LOCAL_AFTER_REMOTE_FAILURE",
                true,
            )?,
            maintenance_interval_secs: parse_env(
                "ARKIVA_MAINTENANCE_INTERVAL_SECS",
                MAINTENANCE_INTERVAL_SECS,
            )?,
        };

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), anyhow::Error> {
        if self.namespace.is_empty() {
            anyhow::bail!("ARKIVA_NAMESPACE must not be empty");
        }
        if self.namespace.contains('/') {
            anyhow::bail!("ARKIVA_NAMESPACE must not contain '/'");
        }
        if self.remote_timeout_secs == 0 {
            anyhow::bail!("ARKIVA_REMOTE_TIMEOUT_SECS must be positive");
        }
        Ok(())
    }
}

fn parse_env<T: std::str::FromStr>(key: &str, default: T) -> Result<T, anyhow::Error>
where
    T::Err: std::fmt::Display,
{
    match env::var(key) {
        Ok(raw) => raw
            .parse()
            .map_err(|e| anyhow::anyhow!("Invalid {}: {}", key, e)),
        Err(_) => Ok(default),
    }
}
