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

//! Media record lifecycle
//!
//! [`MediaRegistry`] owns creation, usage tracking, worker write-back, and
//! deletion of media records over a [`RegistryStore`], and emits deletion
//! jobs to the post-processing queue so physical blob removal happens
//! asynchronously.

use crate::{
    Digest, MediaId, MediaRecord, NewMedia, OwnerRef, ProcessingUpdate, RegistryError,
    RegistryStore,
};
use medialake_queue::{Job, PostProcessingQueue};
use std::sync::Arc;
use tracing::{debug, info};

/// Registry of canonical media records.
///
/// # Examples
///
/// ```no_run
/// use std::sync::Arc;
/// use medialake_queue::MemoryQueue;
/// use medialake_registry::{MediaRegistry, MemoryStore};
///
/// let registry = MediaRegistry::new(
///     Arc::new(MemoryStore::new()),
///     Arc::new(MemoryQueue::new()),
/// );
/// ```
#[derive(Debug, Clone)]
pub struct MediaRegistry {
    store: Arc<dyn RegistryStore>,
    queue: Arc<dyn PostProcessingQueue>,
}

impl MediaRegistry {
    /// Create a registry over the given store and queue.
    pub fn new(store: Arc<dyn RegistryStore>, queue: Arc<dyn PostProcessingQueue>) -> Self {
        MediaRegistry { store, queue }
    }

    /// Insert a new record for a finished upload.
    ///
    /// # Errors
    ///
    /// [`RegistryError::DuplicateDigest`] when a concurrent insert won the
    /// race for this digest. Callers must treat that as a dedup hit: fetch
    /// the winning record from the error, compensate the uploaded blob,
    /// and attach the usage there instead of surfacing the error.
    pub async fn create_from_upload(&self, draft: NewMedia) -> Result<MediaRecord, RegistryError> {
        let record = draft.into_record();
        let id = record.id;

        self.store.insert_unique(record.clone()).await?;

        info!(
            media_id = %id,
            digest = %record.content_digest.map(|d| d.to_hex()).unwrap_or_default(),
            provider = %record.provider,
            bytes = record.byte_size,
            "registered new media record"
        );
        Ok(record)
    }

    /// Fetch a record by id.
    pub async fn get(&self, id: MediaId) -> Result<MediaRecord, RegistryError> {
        self.store
            .get(id)
            .await?
            .ok_or(RegistryError::NotFound(id))
    }

    /// Deduplication index lookup: digest → canonical record.
    pub async fn find_by_digest(
        &self,
        digest: &Digest,
    ) -> Result<Option<MediaRecord>, RegistryError> {
        Ok(self.store.find_by_digest(digest).await?)
    }

    /// Register one logical usage of an asset. Returns the resulting
    /// usage count; re-registering the same owner is a successful no-op.
    pub async fn attach_usage(
        &self,
        id: MediaId,
        owner: OwnerRef,
    ) -> Result<u64, RegistryError> {
        let count = self.store.attach_usage(id, owner).await?;
        debug!(media_id = %id, usage_count = count, "attached usage");
        Ok(count)
    }

    /// Remove one logical usage. Returns the resulting usage count; never
    /// drops below zero.
    pub async fn detach_usage(
        &self,
        id: MediaId,
        owner: &OwnerRef,
    ) -> Result<u64, RegistryError> {
        let count = self.store.detach_usage(id, owner).await?;
        debug!(media_id = %id, usage_count = count, "detached usage");
        Ok(count)
    }

    /// Delete a record.
    ///
    /// The deletion job for the physical blob is enqueued *before* the
    /// record is removed: if the enqueue fails the delete aborts and the
    /// record stays, so a blob can never be silently stranded without
    /// either a record or a pending deletion job. The blob itself
    /// disappears when a worker processes the job — eventually consistent
    /// with the synchronous record removal.
    ///
    /// # Errors
    ///
    /// [`RegistryError::InUse`] when `usage_count > 0` and `force` is not
    /// set.
    pub async fn delete(&self, id: MediaId, force: bool) -> Result<(), RegistryError> {
        let record = self.get(id).await?;

        if record.usage_count > 0 && !force {
            return Err(RegistryError::InUse {
                usage_count: record.usage_count,
            });
        }

        let job = Job::delete(
            id.as_uuid(),
            record.provider,
            record.storage_key.clone(),
            record.mime_type.clone(),
        );
        let job_id = self.queue.enqueue(job).await?;

        self.store.remove(id).await?;
        info!(
            media_id = %id,
            job_id = %job_id,
            storage_key = %record.storage_key,
            forced = force,
            "deleted media record, blob deletion enqueued"
        );
        Ok(())
    }

    /// Apply a worker's results to a record. Safe to re-apply under
    /// at-least-once delivery.
    pub async fn record_processing_result(
        &self,
        id: MediaId,
        update: ProcessingUpdate,
    ) -> Result<MediaRecord, RegistryError> {
        let record = self.store.update_processing(id, update).await?;
        debug!(media_id = %id, approval = ?record.approval, "applied processing result");
        Ok(record)
    }

    /// The store behind this registry, for callers that only need reads.
    pub fn store(&self) -> &Arc<dyn RegistryStore> {
        &self.store
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::MemoryStore;
    use medialake_queue::{JobKind, MemoryQueue};
    use medialake_storage::StorageProvider;

    fn registry() -> (MediaRegistry, Arc<MemoryQueue>) {
        let queue = Arc::new(MemoryQueue::new());
        let registry = MediaRegistry::new(
            Arc::new(MemoryStore::new()),
            Arc::clone(&queue) as Arc<dyn PostProcessingQueue>,
        );
        (registry, queue)
    }

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
    async fn test_create_and_get() {
        let (registry, _queue) = registry();

        let record = registry
            .create_from_upload(draft(b"bytes", OwnerRef::new("post", "1")))
            .await
            .unwrap();

        let fetched = registry.get(record.id).await.unwrap();
        assert_eq!(fetched.id, record.id);
        assert_eq!(fetched.usage_count, 1);
    }

    #[tokio::test]
    async fn test_duplicate_create_carries_winner() {
        let (registry, _queue) = registry();

        let winner = registry
            .create_from_upload(draft(b"same", OwnerRef::new("post", "1")))
            .await
            .unwrap();

        let err = registry
            .create_from_upload(draft(b"same", OwnerRef::new("post", "2")))
            .await
            .unwrap_err();

        match err {
            RegistryError::DuplicateDigest { existing } => assert_eq!(existing.id, winner.id),
            other => panic!("expected DuplicateDigest, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_delete_in_use_refused() {
        let (registry, _queue) = registry();

        let record = registry
            .create_from_upload(draft(b"bytes", OwnerRef::new("post", "1")))
            .await
            .unwrap();
        registry
            .attach_usage(record.id, OwnerRef::new("comment", "7"))
            .await
            .unwrap();

        let err = registry.delete(record.id, false).await.unwrap_err();
        assert!(matches!(err, RegistryError::InUse { usage_count: 2 }));

        // Record unchanged
        let fetched = registry.get(record.id).await.unwrap();
        assert_eq!(fetched.usage_count, 2);
    }

    #[tokio::test]
    async fn test_delete_emits_job_with_storage_key() {
        let (registry, queue) = registry();
        let mut rx = queue.take_receiver().await.unwrap();

        let record = registry
            .create_from_upload(draft(b"bytes", OwnerRef::new("post", "1")))
            .await
            .unwrap();
        let owner = OwnerRef::new("post", "1");
        registry.detach_usage(record.id, &owner).await.unwrap();

        registry.delete(record.id, false).await.unwrap();

        let job = rx.recv().await.unwrap();
        assert_eq!(job.kind, JobKind::Delete);
        assert_eq!(job.storage_key, record.storage_key);
        assert_eq!(job.media_id, record.id.as_uuid());

        assert!(matches!(
            registry.get(record.id).await,
            Err(RegistryError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_force_delete_overrides_usages() {
        let (registry, queue) = registry();
        let mut rx = queue.take_receiver().await.unwrap();

        let record = registry
            .create_from_upload(draft(b"bytes", OwnerRef::new("post", "1")))
            .await
            .unwrap();

        registry.delete(record.id, true).await.unwrap();
        assert_eq!(rx.recv().await.unwrap().kind, JobKind::Delete);
    }

    #[tokio::test]
    async fn test_delete_aborts_when_enqueue_fails() {
        let (registry, queue) = registry();
        queue.close().await;

        let record = registry
            .create_from_upload(draft(b"bytes", OwnerRef::new("post", "1")))
            .await
            .unwrap();
        let owner = OwnerRef::new("post", "1");
        registry.detach_usage(record.id, &owner).await.unwrap();

        let err = registry.delete(record.id, false).await.unwrap_err();
        assert!(matches!(err, RegistryError::Queue(_)));

        // Record survives an aborted delete
        assert!(registry.get(record.id).await.is_ok());
    }

    #[tokio::test]
    async fn test_processing_write_back() {
        let (registry, _queue) = registry();

        let record = registry
            .create_from_upload(draft(b"bytes", OwnerRef::new("post", "1")))
            .await
            .unwrap();

        let updated = registry
            .record_processing_result(
                record.id,
                ProcessingUpdate {
                    thumbnail_key: Some("thumbs/ab/cd".into()),
                    transcode_keys: vec![],
                    approval: Some(crate::ApprovalStatus::Approved),
                },
            )
            .await
            .unwrap();

        assert_eq!(updated.thumbnail_key.as_deref(), Some("thumbs/ab/cd"));
        assert_eq!(updated.approval, crate::ApprovalStatus::Approved);
    }
}
