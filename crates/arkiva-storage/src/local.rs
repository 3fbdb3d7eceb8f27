//! Local filestore.
//!
//! The on-disk fallback tier. Files live under the sharded layout
//! `{base}/{shard}/{hash}`; garbage-collection candidates are marked by an
//! empty file under `{base}/checklist/`. The actual sweep of the local tier
//! belongs to the host framework; this module only reads, writes and marks.

use std::path::{Path, PathBuf};

use arkiva_core::constants::{CHECKLIST_PREFIX, TRASH_PREFIX};
use tokio::fs;
use tokio::io::AsyncWriteExt;

use crate::traits::{StorageError, StorageResult};

/// Local filesystem storage for one namespace.
#[derive(Debug, Clone)]
pub struct LocalFilestore {
    base_path: PathBuf,
}

impl LocalFilestore {
    /// Open (and create if needed) a filestore rooted at `base_path`.
    pub async fn new(base_path: impl Into<PathBuf>) -> StorageResult<Self> {
        let base_path = base_path.into();

        fs::create_dir_all(&base_path).await.map_err(|e| {
            StorageError::Config(format!(
                "Failed to create filestore directory {}: {}",
                base_path.display(),
                e
            ))
        })?;

        Ok(LocalFilestore { base_path })
    }

    pub fn base_path(&self) -> &Path {
        &self.base_path
    }

    /// Convert a stored filename to a filesystem path, rejecting traversal
    /// sequences that could escape the base directory.
    fn fname_to_path(&self, fname: &str) -> StorageResult<PathBuf> {
        if fname.contains("..") || fname.starts_with('/') || fname.starts_with('\\') {
            return Err(StorageError::InvalidKey(format!(
                "Stored filename escapes the filestore: {fname:?}"
            )));
        }
        Ok(self.base_path.join(fname))
    }

    async fn ensure_parent_dir(&self, path: &Path) -> StorageResult<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).await?;
        }
        Ok(())
    }

    /// Write a stored file. Content addressing makes this idempotent: an
    /// existing file is left untouched.
    pub async fn write(&self, fname: &str, data: &[u8]) -> StorageResult<()> {
        let path = self.fname_to_path(fname)?;

        if fs::try_exists(&path).await.unwrap_or(false) {
            tracing::debug!(fname = %fname, "Content already stored locally, skipping write");
            return Ok(());
        }

        self.ensure_parent_dir(&path).await?;

        let mut file = fs::File::create(&path).await?;
        file.write_all(data).await?;
        file.sync_all().await?;

        tracing::info!(
            path = %path.display(),
            fname = %fname,
            size_bytes = data.len(),
            "Local filestore write successful"
        );

        Ok(())
    }

    pub async fn read(&self, fname: &str) -> StorageResult<Vec<u8>> {
        let path = self.fname_to_path(fname)?;

        if !fs::try_exists(&path).await.unwrap_or(false) {
            return Err(StorageError::NotFound(fname.to_string()));
        }

        Ok(fs::read(&path).await?)
    }

    pub async fn content_length(&self, fname: &str) -> StorageResult<u64> {
        let path = self.fname_to_path(fname)?;

        match fs::metadata(&path).await {
            Ok(meta) => Ok(meta.len()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(StorageError::NotFound(fname.to_string()))
            }
            Err(e) => Err(e.into()),
        }
    }

    pub async fn exists(&self, fname: &str) -> StorageResult<bool> {
        let path = self.fname_to_path(fname)?;
        Ok(fs::try_exists(&path).await.unwrap_or(false))
    }

    /// Mark a stored file as a garbage-collection candidate by touching an
    /// empty file under the checklist directory.
    pub async fn mark_for_gc(&self, fname: &str) -> StorageResult<()> {
        self.fname_to_path(fname)?;
        let marker = self
            .base_path
            .join(CHECKLIST_PREFIX)
            .join(fname.replace('/', "_"));

        self.ensure_parent_dir(&marker).await?;
        fs::File::create(&marker).await?;

        tracing::debug!(fname = %fname, marker = %marker.display(), "Local GC marker written");
        Ok(())
    }

    /// Enumerate every stored filename (`shard/hash`), skipping the reserved
    /// checklist and trash directories. Used by bulk migration.
    pub async fn walk(&self) -> StorageResult<Vec<String>> {
        let mut fnames = Vec::new();

        let mut shards = fs::read_dir(&self.base_path).await?;
        while let Some(shard) = shards.next_entry().await? {
            if !shard.file_type().await?.is_dir() {
                continue;
            }
            let shard_name = shard.file_name().to_string_lossy().to_string();
            if shard_name == CHECKLIST_PREFIX || shard_name == TRASH_PREFIX {
                continue;
            }

            let mut files = fs::read_dir(shard.path()).await?;
            while let Some(file) = files.next_entry().await? {
                if file.file_type().await?.is_file() {
                    let file_name = file.file_name().to_string_lossy().to_string();
                    fnames.push(format!("{shard_name}/{file_name}"));
                }
            }
        }

        Ok(fnames)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[tokio::test]
    async fn write_then_read_round_trips() {
        let dir = tempdir().unwrap();
        let store = LocalFilestore::new(dir.path()).await.unwrap();

        store.write("ab/abc123", b"hello").await.unwrap();
        assert_eq!(store.read("ab/abc123").await.unwrap(), b"hello");
        assert_eq!(store.content_length("ab/abc123").await.unwrap(), 5);
    }

    #[tokio::test]
    async fn write_is_idempotent_for_existing_content() {
        let dir = tempdir().unwrap();
        let store = LocalFilestore::new(dir.path()).await.unwrap();

        store.write("ab/abc123", b"original").await.unwrap();
        store.write("ab/abc123", b"ignored").await.unwrap();
        assert_eq!(store.read("ab/abc123").await.unwrap(), b"original");
    }

    #[tokio::test]
    async fn missing_file_reads_as_not_found() {
        let dir = tempdir().unwrap();
        let store = LocalFilestore::new(dir.path()).await.unwrap();

        assert!(matches!(
            store.read("ab/missing").await,
            Err(StorageError::NotFound(_))
        ));
        assert!(matches!(
            store.content_length("ab/missing").await,
            Err(StorageError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn traversal_filenames_are_rejected() {
        let dir = tempdir().unwrap();
        let store = LocalFilestore::new(dir.path()).await.unwrap();

        assert!(matches!(
            store.read("../../etc/passwd").await,
            Err(StorageError::InvalidKey(_))
        ));
        assert!(matches!(
            store.write("/etc/shadow", b"x").await,
            Err(StorageError::InvalidKey(_))
        ));
    }

    #[tokio::test]
    async fn walk_skips_reserved_directories() {
        let dir = tempdir().unwrap();
        let store = LocalFilestore::new(dir.path()).await.unwrap();

        store.write("ab/abc123", b"one").await.unwrap();
        store.write("cd/cdef45", b"two").await.unwrap();
        store.mark_for_gc("ab/abc123").await.unwrap();

        let mut fnames = store.walk().await.unwrap();
        fnames.sort();
        assert_eq!(fnames, vec!["ab/abc123", "cd/cdef45"]);
    }
}
