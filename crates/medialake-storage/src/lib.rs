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

//! Storage abstraction layer for MediaLake
//!
//! This crate provides a unified, asynchronous storage interface that supports
//! multiple backends:
//! - Local filesystem
//! - AWS S3 (and S3-compatible services via custom endpoints)
//! - Managed media CDN (upload API over HTTPS)
//! - In-memory mock for testing
//!
//! # Architecture
//!
//! The [`StorageBackend`] trait defines a minimal but complete interface for
//! blob storage, allowing the ingestion pipeline to treat every backend
//! identically: it never branches on provider type except to select which
//! implementation to construct.
//!
//! ## Core Concepts
//!
//! - **Keys**: unique identifiers for stored blobs (hierarchical strings,
//!   typically digest-derived like `media/ab/cdef...`)
//! - **Receipts**: every successful [`StorageBackend::put`] returns a
//!   [`PutReceipt`] — a tagged, per-provider result carrying the durable
//!   public URL (and the CDN URL where one exists)
//!
//! # Examples
//!
//! Using the mock backend for testing:
//!
//! ```no_run
//! use medialake_storage::{StorageBackend, mock::MockBackend};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let storage = MockBackend::new();
//!
//!     let receipt = storage.put("media/ab/cdef", b"bytes", "image/png").await?;
//!     println!("stored at {}", receipt.url());
//!
//!     assert!(storage.exists("media/ab/cdef").await?);
//!     storage.delete("media/ab/cdef").await?;
//!
//!     Ok(())
//! }
//! ```

pub mod cdn;
pub mod error;
pub mod local;
pub mod mock;
pub mod s3;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt::Debug;

pub use cdn::CdnBackend;
pub use error::{StorageError, StorageResult};
pub use local::LocalBackend;
pub use mock::MockBackend;
pub use s3::S3Backend;

/// Identifies which physical backend holds a blob.
///
/// Stored on every media record next to the storage key; the pair is set
/// exactly once at creation and never mutated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum StorageProvider {
    /// Local filesystem storage
    Local,
    /// AWS S3 or an S3-compatible object store
    S3,
    /// Managed media CDN (upload API)
    CdnManaged,
}

impl std::fmt::Display for StorageProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StorageProvider::Local => write!(f, "local"),
            StorageProvider::S3 => write!(f, "s3"),
            StorageProvider::CdnManaged => write!(f, "cdn-managed"),
        }
    }
}

/// Result of a successful [`StorageBackend::put`].
///
/// A tagged union keyed by provider rather than an untyped map: each
/// backend's response fields are statically known where they matter (the
/// URL and the key) and opaque elsewhere.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "provider", rename_all = "kebab-case")]
pub enum PutReceipt {
    /// Blob written to the local filesystem
    Local {
        /// Absolute path of the stored file
        path: String,
        /// Direct `file://` URL
        url: String,
    },
    /// Blob written to S3
    S3 {
        /// Bucket the blob was written into
        bucket: String,
        /// Object key within the bucket
        key: String,
        /// Direct object URL
        url: String,
    },
    /// Blob uploaded to a managed media CDN
    CdnManaged {
        /// Provider-assigned public id
        public_id: String,
        /// Direct URL reported by the upload API
        url: String,
        /// CDN delivery URL
        cdn_url: String,
    },
}

impl PutReceipt {
    /// The durable, publicly reachable URL for the stored blob.
    pub fn url(&self) -> &str {
        match self {
            PutReceipt::Local { url, .. } => url,
            PutReceipt::S3 { url, .. } => url,
            PutReceipt::CdnManaged { url, .. } => url,
        }
    }

    /// The CDN delivery URL, when the backend provides one.
    pub fn cdn_url(&self) -> Option<&str> {
        match self {
            PutReceipt::CdnManaged { cdn_url, .. } => Some(cdn_url),
            _ => None,
        }
    }

    /// The provider that produced this receipt.
    pub fn provider(&self) -> StorageProvider {
        match self {
            PutReceipt::Local { .. } => StorageProvider::Local,
            PutReceipt::S3 { .. } => StorageProvider::S3,
            PutReceipt::CdnManaged { .. } => StorageProvider::CdnManaged,
        }
    }
}

/// Storage backend trait for blob storage operations
///
/// Implementations must be async-safe, thread-safe (`Send + Sync`), and
/// implement `Debug` for observability.
///
/// # Idempotency
///
/// - `put` must be safe to retry: a retried `put` with the same key either
///   overwrites atomically or succeeds again — it must never corrupt the
///   blob or silently create a second copy under a different key.
/// - `delete` is idempotent: deleting a non-existent key succeeds.
///
/// Blobs, once written, are treated as immutable by callers: they are only
/// ever deleted wholesale, never partially overwritten.
#[async_trait]
pub trait StorageBackend: Send + Sync + Debug {
    /// The provider this backend writes to.
    fn provider(&self) -> StorageProvider;

    /// Store a blob under the given key and return its receipt.
    ///
    /// # Errors
    ///
    /// Returns an error on I/O failure, permission denial, quota
    /// exhaustion, or an empty key.
    async fn put(&self, key: &str, data: &[u8], content_type: &str) -> anyhow::Result<PutReceipt>;

    /// Retrieve a blob by its key.
    ///
    /// # Errors
    ///
    /// Returns an error if the key doesn't exist (the error message
    /// contains "object not found") or an I/O error occurs.
    async fn get(&self, key: &str) -> anyhow::Result<Vec<u8>>;

    /// Check whether a blob exists.
    ///
    /// # Errors
    ///
    /// Returns an error only on I/O or permission failures, never for a
    /// missing key.
    async fn exists(&self, key: &str) -> anyhow::Result<bool>;

    /// Delete a blob. Deleting a non-existent key succeeds.
    ///
    /// # Errors
    ///
    /// Returns an error on I/O failure or permission denial.
    async fn delete(&self, key: &str) -> anyhow::Result<()>;
}
