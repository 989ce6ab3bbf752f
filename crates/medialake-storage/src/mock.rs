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

//! In-memory mock storage backend for testing
//!
//! Thread-safe, in-memory implementation of
//! [`StorageBackend`](crate::StorageBackend) using `Arc<RwLock<HashMap>>`,
//! extended with operation counters and injectable put/delete failures so
//! pipeline tests can assert "exactly one `Put`" and exercise the upload
//! and compensation failure branches.

use crate::error::{validate_key, StorageError};
use crate::{PutReceipt, StorageBackend, StorageProvider};
use async_trait::async_trait;
use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::RwLock;

/// In-memory mock storage backend for testing
///
/// # Thread Safety
///
/// `Send + Sync`; clones share the same underlying store, so one instance
/// can be handed to the pipeline while the test keeps another for
/// assertions.
#[derive(Clone)]
pub struct MockBackend {
    store: Arc<RwLock<HashMap<String, Vec<u8>>>>,
    put_count: Arc<AtomicU64>,
    delete_count: Arc<AtomicU64>,
    fail_puts: Arc<AtomicBool>,
    fail_deletes: Arc<AtomicBool>,
}

impl MockBackend {
    /// Create a new empty mock storage backend
    pub fn new() -> Self {
        MockBackend {
            store: Arc::new(RwLock::new(HashMap::new())),
            put_count: Arc::new(AtomicU64::new(0)),
            delete_count: Arc::new(AtomicU64::new(0)),
            fail_puts: Arc::new(AtomicBool::new(false)),
            fail_deletes: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Number of `put` calls attempted so far (including failed ones)
    pub fn put_count(&self) -> u64 {
        self.put_count.load(Ordering::SeqCst)
    }

    /// Number of `delete` calls so far
    pub fn delete_count(&self) -> u64 {
        self.delete_count.load(Ordering::SeqCst)
    }

    /// Make every subsequent `put` fail until cleared
    pub fn set_fail_puts(&self, fail: bool) {
        self.fail_puts.store(fail, Ordering::SeqCst);
    }

    /// Make every subsequent `delete` fail until cleared
    pub fn set_fail_deletes(&self, fail: bool) {
        self.fail_deletes.store(fail, Ordering::SeqCst);
    }

    /// Current number of stored objects
    pub async fn len(&self) -> usize {
        self.store.read().await.len()
    }

    /// Check if the storage is empty
    pub async fn is_empty(&self) -> bool {
        self.store.read().await.is_empty()
    }

    /// A copy of all stored keys
    pub async fn keys(&self) -> Vec<String> {
        self.store.read().await.keys().cloned().collect()
    }
}

impl Default for MockBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for MockBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MockBackend").finish()
    }
}

#[async_trait]
impl StorageBackend for MockBackend {
    fn provider(&self) -> StorageProvider {
        StorageProvider::Local
    }

    async fn put(&self, key: &str, data: &[u8], _content_type: &str) -> anyhow::Result<PutReceipt> {
        validate_key(key)?;

        self.put_count.fetch_add(1, Ordering::SeqCst);

        if self.fail_puts.load(Ordering::SeqCst) {
            return Err(StorageError::backend(format!("injected put failure: {key}")).into());
        }

        let mut store = self.store.write().await;
        store.insert(key.to_string(), data.to_vec());

        Ok(PutReceipt::Local {
            path: format!("mock://{key}"),
            url: format!("mock://{key}"),
        })
    }

    async fn get(&self, key: &str) -> anyhow::Result<Vec<u8>> {
        validate_key(key)?;

        let store = self.store.read().await;
        store
            .get(key)
            .cloned()
            .ok_or_else(|| StorageError::not_found(key).into())
    }

    async fn exists(&self, key: &str) -> anyhow::Result<bool> {
        validate_key(key)?;

        let store = self.store.read().await;
        Ok(store.contains_key(key))
    }

    async fn delete(&self, key: &str) -> anyhow::Result<()> {
        validate_key(key)?;

        self.delete_count.fetch_add(1, Ordering::SeqCst);

        if self.fail_deletes.load(Ordering::SeqCst) {
            return Err(StorageError::backend(format!("injected delete failure: {key}")).into());
        }

        let mut store = self.store.write().await;
        store.remove(key);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_put_and_get() {
        let backend = MockBackend::new();

        backend.put("key1", b"test data", "image/png").await.unwrap();
        assert_eq!(backend.len().await, 1);
        assert_eq!(backend.put_count(), 1);

        let retrieved = backend.get("key1").await.unwrap();
        assert_eq!(retrieved, b"test data");
    }

    #[tokio::test]
    async fn test_get_nonexistent() {
        let backend = MockBackend::new();
        assert!(backend.get("nonexistent").await.is_err());
    }

    #[tokio::test]
    async fn test_empty_key_operations() {
        let backend = MockBackend::new();

        assert!(backend.put("", b"data", "image/png").await.is_err());
        assert!(backend.get("").await.is_err());
        assert!(backend.exists("").await.is_err());
        assert!(backend.delete("").await.is_err());
    }

    #[tokio::test]
    async fn test_delete_is_idempotent() {
        let backend = MockBackend::new();

        backend.put("key1", b"data", "image/png").await.unwrap();
        backend.delete("key1").await.unwrap();
        assert!(!backend.exists("key1").await.unwrap());

        backend.delete("key1").await.unwrap();
        assert_eq!(backend.delete_count(), 2);
    }

    #[tokio::test]
    async fn test_injected_put_failure() {
        let backend = MockBackend::new();
        backend.set_fail_puts(true);

        assert!(backend.put("key1", b"data", "image/png").await.is_err());
        assert!(backend.is_empty().await);
        // Failed attempts still count
        assert_eq!(backend.put_count(), 1);

        backend.set_fail_puts(false);
        backend.put("key1", b"data", "image/png").await.unwrap();
        assert_eq!(backend.len().await, 1);
    }

    #[tokio::test]
    async fn test_injected_delete_failure() {
        let backend = MockBackend::new();
        backend.put("key1", b"data", "image/png").await.unwrap();

        backend.set_fail_deletes(true);
        assert!(backend.delete("key1").await.is_err());
        assert!(backend.exists("key1").await.unwrap());
        // Failed attempts still count
        assert_eq!(backend.delete_count(), 1);

        backend.set_fail_deletes(false);
        backend.delete("key1").await.unwrap();
        assert!(backend.is_empty().await);
    }

    #[tokio::test]
    async fn test_clone_shares_state() {
        let backend1 = MockBackend::new();
        backend1.put("key1", b"data", "image/png").await.unwrap();

        let backend2 = backend1.clone();
        assert_eq!(backend2.len().await, 1);

        backend2.put("key2", b"data", "image/png").await.unwrap();
        assert_eq!(backend1.len().await, 2);
        assert_eq!(backend1.put_count(), 2);
    }

    #[tokio::test]
    async fn test_concurrent_access() {
        let backend = MockBackend::new();

        let backend1 = backend.clone();
        let handle1 = tokio::spawn(async move {
            for i in 0..10 {
                let key = format!("task1_key{}", i);
                backend1.put(&key, b"data", "image/png").await.unwrap();
            }
        });

        let backend2 = backend.clone();
        let handle2 = tokio::spawn(async move {
            for i in 0..10 {
                let key = format!("task2_key{}", i);
                backend2.put(&key, b"data", "image/png").await.unwrap();
            }
        });

        handle1.await.unwrap();
        handle2.await.unwrap();

        assert_eq!(backend.len().await, 20);
    }
}
