// MediaLake - Media Ingestion & Deduplication
// Copyright (C) 2025 MediaLake Contributors
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU Affero General Public License as published
// by the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE. See the
// GNU Affero General Public License for more details.

//! Local filesystem storage backend
//!
//! Implements the [`StorageBackend`](crate::StorageBackend) trait on the
//! local filesystem with:
//! - Hierarchical keys mapped directly to relative paths under the root
//!   (ingestion keys are digest-sharded, e.g. `media/ab/cdef...`, so the
//!   resulting tree stays shallow)
//! - Atomic writes using temp files and rename, which makes a retried `put`
//!   safe: the old blob is never observable in a half-written state
//! - Async I/O using `tokio::fs`
//!
//! # Examples
//!
//! ```rust,no_run
//! use medialake_storage::{StorageBackend, local::LocalBackend};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let storage = LocalBackend::new("/var/lib/medialake").await?;
//!
//!     let receipt = storage.put("media/ab/cdef", b"content", "image/png").await?;
//!     println!("stored at {}", receipt.url());
//!
//!     let data = storage.get("media/ab/cdef").await?;
//!     assert_eq!(data, b"content");
//!
//!     storage.delete("media/ab/cdef").await?;
//!     Ok(())
//! }
//! ```

use crate::error::{validate_key, StorageError};
use crate::{PutReceipt, StorageBackend, StorageProvider};
use async_trait::async_trait;
use std::fmt;
use std::path::{Component, Path, PathBuf};
use tokio::fs;
use tokio::io::AsyncWriteExt;

/// Local filesystem storage backend
///
/// # Thread Safety
///
/// `Send + Sync`; the filesystem provides natural synchronization for
/// concurrent access, and writes are atomic via temp file + rename.
#[derive(Clone)]
pub struct LocalBackend {
    root: PathBuf,
}

impl LocalBackend {
    /// Create a new local filesystem backend at the given root path.
    ///
    /// Creates the root directory if it doesn't exist.
    ///
    /// # Errors
    ///
    /// Fails if the root path exists but is not a directory.
    pub async fn new<P: AsRef<Path>>(root: P) -> anyhow::Result<Self> {
        let root = root.as_ref().to_path_buf();

        if !root.exists() {
            fs::create_dir_all(&root).await?;
        } else if !root.is_dir() {
            return Err(anyhow::anyhow!(
                "path exists but is not a directory: {}",
                root.display()
            ));
        }

        Ok(LocalBackend { root })
    }

    /// Get the root path for this backend
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Map a key to its path under the root.
    ///
    /// Keys are used as relative paths. Rejects keys with `..` or absolute
    /// components so a key can never escape the root.
    fn object_path(&self, key: &str) -> anyhow::Result<PathBuf> {
        let rel = Path::new(key);
        for component in rel.components() {
            match component {
                Component::Normal(_) => {}
                _ => {
                    return Err(StorageError::invalid_key(format!(
                        "key contains invalid path component: {key}"
                    ))
                    .into())
                }
            }
        }
        Ok(self.root.join(rel))
    }

    async fn ensure_parent_dir(path: &Path) -> anyhow::Result<()> {
        if let Some(parent) = path.parent() {
            if !parent.exists() {
                fs::create_dir_all(parent).await?;
            }
        }
        Ok(())
    }
}

impl fmt::Debug for LocalBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LocalBackend")
            .field("root", &self.root)
            .finish()
    }
}

#[async_trait]
impl StorageBackend for LocalBackend {
    fn provider(&self) -> StorageProvider {
        StorageProvider::Local
    }

    async fn put(&self, key: &str, data: &[u8], _content_type: &str) -> anyhow::Result<PutReceipt> {
        validate_key(key)?;
        let path = self.object_path(key)?;
        Self::ensure_parent_dir(&path).await?;

        // Write to a uniquely named sibling temp file, then rename into
        // place. Rename is atomic on the same filesystem, and the per-call
        // temp name keeps concurrent puts (same key, or keys sharing a
        // stem) from truncating each other's in-flight file.
        let parent = path
            .parent()
            .ok_or_else(|| anyhow::anyhow!("key has no parent directory: {key}"))?;
        let (tmp_file, tmp_path) = tempfile::Builder::new()
            .prefix(".put-")
            .tempfile_in(parent)?
            .into_parts();
        let mut file = fs::File::from_std(tmp_file);
        file.write_all(data).await?;
        file.sync_all().await?;
        drop(file);
        tmp_path.persist(&path)?;

        tracing::debug!(key = %key, bytes = data.len(), "stored object on local filesystem");

        Ok(PutReceipt::Local {
            path: path.display().to_string(),
            url: format!("file://{}", path.display()),
        })
    }

    async fn get(&self, key: &str) -> anyhow::Result<Vec<u8>> {
        validate_key(key)?;
        let path = self.object_path(key)?;

        match fs::read(&path).await {
            Ok(data) => Ok(data),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(StorageError::not_found(key).into())
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn exists(&self, key: &str) -> anyhow::Result<bool> {
        validate_key(key)?;
        let path = self.object_path(key)?;
        Ok(fs::try_exists(&path).await?)
    }

    async fn delete(&self, key: &str) -> anyhow::Result<()> {
        validate_key(key)?;
        let path = self.object_path(key)?;

        match fs::remove_file(&path).await {
            Ok(()) => Ok(()),
            // Idempotent: deleting a missing object succeeds
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}
