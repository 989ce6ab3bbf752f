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

//! Registry storage with atomic unique-insert semantics
//!
//! The store is the single shared mutable resource in the ingestion path,
//! and all dedup coordination flows through its uniqueness guarantee on
//! `content_digest`. The authoritative dedup check IS the unique insert: an
//! insert that loses the race comes back as
//! [`StoreError::DuplicateDigest`] carrying the winning record, and the
//! caller treats that as a hit, not an error.
//!
//! [`MemoryStore`] implements the contract atomically for a single process
//! (both indexes live under one write lock). Multi-node deployments
//! substitute a store backed by a database unique index behind the same
//! trait seam; an in-process lock is not a substitute for that guarantee
//! across machines.

use crate::{ApprovalStatus, Digest, MediaId, MediaRecord, OwnerRef, StoreError};
use async_trait::async_trait;
use std::collections::HashMap;
use std::fmt::Debug;
use std::sync::Arc;
use tokio::sync::RwLock;

/// Worker write-back applied after a post-processing job completes.
///
/// Re-applying the same update is a no-op, matching the queue's
/// at-least-once delivery.
#[derive(Debug, Clone, Default)]
pub struct ProcessingUpdate {
    /// Thumbnail blob key produced by the thumbnail worker
    pub thumbnail_key: Option<String>,
    /// Rendition keys produced by the transcode worker; appended,
    /// duplicates ignored
    pub transcode_keys: Vec<String>,
    /// Moderation verdict
    pub approval: Option<ApprovalStatus>,
}

/// Persistence contract for media records.
///
/// `insert_unique` must be atomic with respect to the digest index: of any
/// number of concurrent inserts for the same digest, exactly one succeeds
/// and the rest observe the winner.
#[async_trait]
pub trait RegistryStore: Send + Sync + Debug {
    /// Insert a new record, enforcing digest uniqueness.
    ///
    /// # Errors
    ///
    /// [`StoreError::DuplicateDigest`] when the digest is already
    /// registered; the error carries the winning record.
    async fn insert_unique(&self, record: MediaRecord) -> Result<(), StoreError>;

    /// Fetch a record by id.
    async fn get(&self, id: MediaId) -> Result<Option<MediaRecord>, StoreError>;

    /// The deduplication index lookup: digest → canonical record.
    async fn find_by_digest(&self, digest: &Digest) -> Result<Option<MediaRecord>, StoreError>;

    /// Add an owner reference if absent; returns the resulting usage
    /// count. Re-attaching an existing reference is a successful no-op.
    async fn attach_usage(&self, id: MediaId, owner: OwnerRef) -> Result<u64, StoreError>;

    /// Remove an owner reference if present; returns the resulting usage
    /// count. Never drops below zero.
    async fn detach_usage(&self, id: MediaId, owner: &OwnerRef) -> Result<u64, StoreError>;

    /// Remove a record entirely and return it.
    async fn remove(&self, id: MediaId) -> Result<MediaRecord, StoreError>;

    /// Apply a worker's processing results to a record.
    async fn update_processing(
        &self,
        id: MediaId,
        update: ProcessingUpdate,
    ) -> Result<MediaRecord, StoreError>;
}

#[derive(Debug, Default)]
struct Inner {
    by_id: HashMap<MediaId, MediaRecord>,
    by_digest: HashMap<Digest, MediaId>,
}

/// In-memory registry store.
///
/// Both indexes live under one `RwLock`, so `insert_unique` is atomic:
/// check-and-insert happens under a single write guard.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    inner: Arc<RwLock<Inner>>,
}

impl MemoryStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of records currently stored.
    pub async fn len(&self) -> usize {
        self.inner.read().await.by_id.len()
    }

    /// Whether the store holds no records.
    pub async fn is_empty(&self) -> bool {
        self.inner.read().await.by_id.is_empty()
    }
}

#[async_trait]
impl RegistryStore for MemoryStore {
    async fn insert_unique(&self, record: MediaRecord) -> Result<(), StoreError> {
        let mut inner = self.inner.write().await;

        if let Some(digest) = record.content_digest {
            if let Some(existing_id) = inner.by_digest.get(&digest) {
                let existing = inner
                    .by_id
                    .get(existing_id)
                    .cloned()
                    .ok_or_else(|| StoreError::backend("digest index points at missing record"))?;
                return Err(StoreError::DuplicateDigest {
                    existing: Box::new(existing),
                });
            }
            inner.by_digest.insert(digest, record.id);
        }

        if inner.by_id.insert(record.id, record).is_some() {
            return Err(StoreError::backend("media id collision on insert"));
        }
        Ok(())
    }

    async fn get(&self, id: MediaId) -> Result<Option<MediaRecord>, StoreError> {
        Ok(self.inner.read().await.by_id.get(&id).cloned())
    }

    async fn find_by_digest(&self, digest: &Digest) -> Result<Option<MediaRecord>, StoreError> {
        let inner = self.inner.read().await;
        Ok(inner
            .by_digest
            .get(digest)
            .and_then(|id| inner.by_id.get(id))
            .cloned())
    }

    async fn attach_usage(&self, id: MediaId, owner: OwnerRef) -> Result<u64, StoreError> {
        let mut inner = self.inner.write().await;
        let record = inner.by_id.get_mut(&id).ok_or(StoreError::NotFound(id))?;

        record.used_in.insert(owner);
        record.usage_count = record.used_in.len() as u64;
        Ok(record.usage_count)
    }

    async fn detach_usage(&self, id: MediaId, owner: &OwnerRef) -> Result<u64, StoreError> {
        let mut inner = self.inner.write().await;
        let record = inner.by_id.get_mut(&id).ok_or(StoreError::NotFound(id))?;

        record.used_in.remove(owner);
        record.usage_count = record.used_in.len() as u64;
        Ok(record.usage_count)
    }

    async fn remove(&self, id: MediaId) -> Result<MediaRecord, StoreError> {
        let mut inner = self.inner.write().await;
        let record = inner.by_id.remove(&id).ok_or(StoreError::NotFound(id))?;
        if let Some(digest) = record.content_digest {
            inner.by_digest.remove(&digest);
        }
        Ok(record)
    }

    async fn update_processing(
        &self,
        id: MediaId,
        update: ProcessingUpdate,
    ) -> Result<MediaRecord, StoreError> {
        let mut inner = self.inner.write().await;
        let record = inner.by_id.get_mut(&id).ok_or(StoreError::NotFound(id))?;

        if let Some(key) = update.thumbnail_key {
            record.thumbnail_key = Some(key);
        }
        for key in update.transcode_keys {
            if !record.transcode_keys.contains(&key) {
                record.transcode_keys.push(key);
            }
        }
        if let Some(approval) = update.approval {
            record.approval = approval;
        }
        Ok(record.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::NewMedia;
    use medialake_storage::StorageProvider;

    fn draft(content: &[u8], owner: OwnerRef) -> NewMedia {
        let digest = Digest::hash(content);
        NewMedia {
            digest,
            uploader_id: "u1".into(),
            mime_type: "image/png".into(),
            byte_size: content.len() as u64,
            folder: "uploads".into(),
            tags: vec![],
            provider: StorageProvider::Local,
            storage_key: format!("media/{}", digest.to_key_path()),
            direct_url: "file:///data/blob".into(),
            cdn_url: None,
            owner,
        }
    }

    #[tokio::test]
    async fn test_insert_and_lookup() {
        let store = MemoryStore::new();
        let record = draft(b"bytes", OwnerRef::new("post", "1")).into_record();
        let digest = record.content_digest.unwrap();

        store.insert_unique(record.clone()).await.unwrap();

        let found = store.find_by_digest(&digest).await.unwrap().unwrap();
        assert_eq!(found.id, record.id);
        assert_eq!(store.get(record.id).await.unwrap().unwrap().id, record.id);
    }

    #[tokio::test]
    async fn test_duplicate_digest_returns_winner() {
        let store = MemoryStore::new();
        let winner = draft(b"same bytes", OwnerRef::new("post", "1")).into_record();
        store.insert_unique(winner.clone()).await.unwrap();

        let loser = draft(b"same bytes", OwnerRef::new("post", "2")).into_record();
        let err = store.insert_unique(loser).await.unwrap_err();

        match err {
            StoreError::DuplicateDigest { existing } => assert_eq!(existing.id, winner.id),
            other => panic!("expected DuplicateDigest, got {other:?}"),
        }
        assert_eq!(store.len().await, 1);
    }

    #[tokio::test]
    async fn test_concurrent_inserts_one_winner() {
        let store = MemoryStore::new();

        let mut handles = Vec::new();
        for i in 0..16 {
            let store = store.clone();
            handles.push(tokio::spawn(async move {
                let record = draft(b"raced bytes", OwnerRef::new("post", i.to_string())).into_record();
                store.insert_unique(record).await
            }));
        }

        let mut wins = 0;
        let mut losses = 0;
        for handle in handles {
            match handle.await.unwrap() {
                Ok(()) => wins += 1,
                Err(StoreError::DuplicateDigest { .. }) => losses += 1,
                Err(other) => panic!("unexpected error: {other:?}"),
            }
        }

        assert_eq!(wins, 1);
        assert_eq!(losses, 15);
        assert_eq!(store.len().await, 1);
    }

    #[tokio::test]
    async fn test_attach_is_idempotent() {
        let store = MemoryStore::new();
        let record = draft(b"bytes", OwnerRef::new("post", "1")).into_record();
        let id = record.id;
        store.insert_unique(record).await.unwrap();

        assert_eq!(
            store.attach_usage(id, OwnerRef::new("post", "2")).await.unwrap(),
            2
        );
        // Same owner again: count unchanged
        assert_eq!(
            store.attach_usage(id, OwnerRef::new("post", "2")).await.unwrap(),
            2
        );
    }

    #[tokio::test]
    async fn test_detach_never_negative() {
        let store = MemoryStore::new();
        let record = draft(b"bytes", OwnerRef::new("post", "1")).into_record();
        let id = record.id;
        store.insert_unique(record).await.unwrap();

        assert_eq!(
            store.detach_usage(id, &OwnerRef::new("post", "1")).await.unwrap(),
            0
        );
        // Detaching an absent owner stays at zero
        assert_eq!(
            store.detach_usage(id, &OwnerRef::new("post", "1")).await.unwrap(),
            0
        );
    }

    #[tokio::test]
    async fn test_remove_frees_digest() {
        let store = MemoryStore::new();
        let record = draft(b"bytes", OwnerRef::new("post", "1")).into_record();
        let id = record.id;
        let digest = record.content_digest.unwrap();
        store.insert_unique(record).await.unwrap();

        store.remove(id).await.unwrap();
        assert!(store.find_by_digest(&digest).await.unwrap().is_none());

        // Digest can be registered again after removal
        let again = draft(b"bytes", OwnerRef::new("post", "9")).into_record();
        store.insert_unique(again).await.unwrap();
    }

    #[tokio::test]
    async fn test_update_processing_idempotent() {
        let store = MemoryStore::new();
        let record = draft(b"bytes", OwnerRef::new("post", "1")).into_record();
        let id = record.id;
        store.insert_unique(record).await.unwrap();

        let update = ProcessingUpdate {
            thumbnail_key: Some("thumbs/ab/cd".into()),
            transcode_keys: vec!["renditions/720p".into()],
            approval: Some(ApprovalStatus::Approved),
        };

        let first = store.update_processing(id, update.clone()).await.unwrap();
        let second = store.update_processing(id, update).await.unwrap();

        assert_eq!(first.transcode_keys, second.transcode_keys);
        assert_eq!(second.approval, ApprovalStatus::Approved);
        assert_eq!(second.thumbnail_key.as_deref(), Some("thumbs/ab/cd"));
    }

    #[tokio::test]
    async fn test_missing_record_errors() {
        let store = MemoryStore::new();
        let id = MediaId::new();

        assert!(matches!(
            store.attach_usage(id, OwnerRef::new("post", "1")).await,
            Err(StoreError::NotFound(_))
        ));
        assert!(matches!(store.remove(id).await, Err(StoreError::NotFound(_))));
    }
}
