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

//! The ingestion pipeline
//!
//! One call takes an upload stream from intake to a registered record:
//!
//! 1. Validate the declared metadata against the [`UploadPolicy`]
//! 2. Stage the stream to disk, computing size and digest in the same pass
//! 3. Look the digest up in the registry; a hit attaches a usage to the
//!    canonical record and returns it without touching storage
//! 4. Transfer the staged blob to the backend under its digest key
//! 5. Register the record; losing the registration race to a concurrent
//!    identical upload compensates the blob write and converts the result
//!    into a dedup hit
//! 6. Enqueue the post-processing job; a failed enqueue degrades the
//!    result instead of failing the ingestion
//!
//! Every failure path cleans up what it wrote: the staging file dies with
//! its guard, and a blob uploaded for a record that never materialized is
//! deleted (asynchronously, when the caller drops the future mid-flight).

use crate::error::{IngestError, IngestResult, IngestStage, ValidationError};
use crate::policy::UploadPolicy;
use crate::stage::{StagedBlob, StagedFile};
use medialake_queue::{Job, JobKind, PostProcessingQueue};
use medialake_registry::{
    MediaCategory, MediaId, MediaRecord, MediaRegistry, NewMedia, OwnerRef, RegistryError,
};
use medialake_storage::StorageBackend;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::io::{AsyncRead, AsyncReadExt};
use tracing::{debug, error, info, warn};

const READ_CHUNK_BYTES: usize = 64 * 1024;

/// Metadata accompanying an upload stream.
#[derive(Debug, Clone)]
pub struct UploadRequest {
    /// Who is uploading
    pub uploader_id: String,
    /// The first logical usage of the asset
    pub owner: OwnerRef,
    /// Original file name, used to guess the MIME type when none is
    /// declared
    pub file_name: Option<String>,
    /// Declared MIME type
    pub declared_mime: Option<String>,
    /// Declared size in bytes; when absent the limit is enforced while
    /// streaming
    pub declared_size: Option<u64>,
    /// Target folder
    pub folder: String,
    /// Free-form tags
    pub tags: Vec<String>,
}

impl UploadRequest {
    /// A minimal request: everything else defaults.
    pub fn new(uploader_id: impl Into<String>, owner: OwnerRef) -> Self {
        UploadRequest {
            uploader_id: uploader_id.into(),
            owner,
            file_name: None,
            declared_mime: None,
            declared_size: None,
            folder: "uploads".into(),
            tags: Vec::new(),
        }
    }

    /// Set the original file name.
    pub fn with_file_name(mut self, name: impl Into<String>) -> Self {
        self.file_name = Some(name.into());
        self
    }

    /// Set the declared MIME type.
    pub fn with_mime(mut self, mime: impl Into<String>) -> Self {
        self.declared_mime = Some(mime.into());
        self
    }

    /// Set the declared size.
    pub fn with_size(mut self, bytes: u64) -> Self {
        self.declared_size = Some(bytes);
        self
    }

    /// Set the target folder.
    pub fn with_folder(mut self, folder: impl Into<String>) -> Self {
        self.folder = folder.into();
        self
    }

    /// Set the tags.
    pub fn with_tags(mut self, tags: Vec<String>) -> Self {
        self.tags = tags;
        self
    }
}

/// What an ingestion resolved to.
#[derive(Debug, Clone)]
pub struct IngestOutcome {
    /// The canonical record, as a duplicate view on a dedup hit
    pub record: MediaRecord,
    /// Whether the upload resolved to an already-known asset
    pub is_duplicate: bool,
    /// False when the asset was stored and registered but the
    /// post-processing job could not be enqueued. Duplicates report true:
    /// their processing was scheduled when the canonical record was first
    /// ingested.
    pub post_processing_scheduled: bool,
}

/// Content-addressed ingestion over a storage backend, registry, and
/// post-processing queue.
///
/// # Examples
///
/// ```no_run
/// use std::sync::Arc;
/// use medialake_ingest::{IngestionPipeline, UploadPolicy, UploadRequest};
/// use medialake_queue::{MemoryQueue, PostProcessingQueue};
/// use medialake_registry::{MediaRegistry, MemoryStore, OwnerRef};
/// use medialake_storage::LocalBackend;
///
/// # async fn run() -> anyhow::Result<()> {
/// let storage = Arc::new(LocalBackend::new("/var/lib/medialake/blobs").await?);
/// let queue: Arc<dyn PostProcessingQueue> = Arc::new(MemoryQueue::new());
/// let registry = MediaRegistry::new(Arc::new(MemoryStore::new()), Arc::clone(&queue));
///
/// let pipeline = IngestionPipeline::new(
///     storage,
///     registry,
///     queue,
///     UploadPolicy::default(),
///     "/var/lib/medialake/staging",
/// );
///
/// let request = UploadRequest::new("u1", OwnerRef::new("post", "42"))
///     .with_file_name("photo.jpg");
/// let outcome = pipeline
///     .ingest(&b"...image bytes..."[..], request)
///     .await?;
/// println!("stored at {}", outcome.record.url());
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct IngestionPipeline {
    storage: Arc<dyn StorageBackend>,
    registry: MediaRegistry,
    queue: Arc<dyn PostProcessingQueue>,
    policy: UploadPolicy,
    staging_dir: PathBuf,
}

impl IngestionPipeline {
    /// Assemble a pipeline.
    pub fn new(
        storage: Arc<dyn StorageBackend>,
        registry: MediaRegistry,
        queue: Arc<dyn PostProcessingQueue>,
        policy: UploadPolicy,
        staging_dir: impl Into<PathBuf>,
    ) -> Self {
        IngestionPipeline {
            storage,
            registry,
            queue,
            policy,
            staging_dir: staging_dir.into(),
        }
    }

    /// The registry this pipeline writes to.
    pub fn registry(&self) -> &MediaRegistry {
        &self.registry
    }

    /// Ingest one upload stream.
    ///
    /// Byte-identical uploads resolve to the same record no matter the
    /// file name, declared MIME type, uploader, or timing: concurrent
    /// identical uploads race on registration and the loser is converted
    /// into a dedup hit against the winner.
    ///
    /// # Errors
    ///
    /// - [`IngestError::Validation`] before any bytes are stored
    /// - [`IngestError::Stage`] for staging, hashing, upload, or registry
    ///   failures, after cleanup of everything this call wrote
    /// - [`IngestError::CompensationFailed`] when a lost registration race
    ///   leaves a blob that could not be deleted
    pub async fn ingest<R>(&self, stream: R, request: UploadRequest) -> IngestResult<IngestOutcome>
    where
        R: AsyncRead + Unpin + Send,
    {
        let mime_type = self
            .policy
            .resolve_mime(request.declared_mime.as_deref(), request.file_name.as_deref());
        self.policy.check(&mime_type, request.declared_size)?;

        // Staging file is removed on every exit path from here on.
        let blob = self.stage_stream(stream).await?;
        let digest = blob.digest();

        debug!(
            digest = %digest,
            bytes = blob.byte_size(),
            mime_type = %mime_type,
            uploader = %request.uploader_id,
            "upload staged"
        );

        // Dedup index lookup before any backend write.
        let existing = self
            .registry
            .find_by_digest(&digest)
            .await
            .map_err(|e| IngestError::stage(IngestStage::Registering, e))?;
        if let Some(existing) = existing {
            info!(
                digest = %digest,
                media_id = %existing.id,
                "dedup hit, no bytes stored"
            );
            let record = self.attach_to_canonical(existing.id, request.owner).await?;
            return Ok(IngestOutcome {
                record,
                is_duplicate: true,
                post_processing_scheduled: true,
            });
        }

        let storage_key = format!("media/{}", digest.to_key_path());
        let data = blob
            .read()
            .await
            .map_err(|e| IngestError::stage(IngestStage::Upload, e))?;
        let receipt = self
            .storage
            .put(&storage_key, &data, &mime_type)
            .await
            .map_err(|e| IngestError::stage(IngestStage::Upload, e))?;

        // Between the put and a successful registration the blob has no
        // record; the guard deletes it if this future is dropped in that
        // window.
        let mut guard = UploadGuard::new(Arc::clone(&self.storage), storage_key.clone());

        let draft = NewMedia {
            digest,
            uploader_id: request.uploader_id,
            mime_type,
            byte_size: blob.byte_size(),
            folder: request.folder,
            tags: request.tags,
            provider: receipt.provider(),
            storage_key: storage_key.clone(),
            direct_url: receipt.url().to_string(),
            cdn_url: receipt.cdn_url().map(String::from),
            owner: request.owner.clone(),
        };

        match self.registry.create_from_upload(draft).await {
            Ok(record) => {
                guard.disarm();
                let scheduled = self.schedule_post_processing(&record).await;
                info!(
                    media_id = %record.id,
                    digest = %digest,
                    storage_key = %storage_key,
                    "ingested new asset"
                );
                Ok(IngestOutcome {
                    record,
                    is_duplicate: false,
                    post_processing_scheduled: scheduled,
                })
            }
            Err(RegistryError::DuplicateDigest { existing }) => {
                guard.disarm();
                info!(
                    digest = %digest,
                    media_id = %existing.id,
                    "lost registration race, converting to dedup hit"
                );
                self.compensate_lost_race(&existing, &storage_key).await?;
                let record = self.attach_to_canonical(existing.id, request.owner).await?;
                Ok(IngestOutcome {
                    record,
                    is_duplicate: true,
                    post_processing_scheduled: true,
                })
            }
            Err(err) => {
                guard.disarm();
                if let Err(delete_err) = self.storage.delete(&storage_key).await {
                    error!(
                        storage_key = %storage_key,
                        error = %delete_err,
                        "failed to remove blob after registration failure, orphan left behind"
                    );
                }
                Err(IngestError::stage(IngestStage::Registering, err))
            }
        }
    }

    /// Stream the upload into a staging file, enforcing the size limit on
    /// bytes actually seen.
    async fn stage_stream<R>(&self, mut stream: R) -> IngestResult<StagedBlob>
    where
        R: AsyncRead + Unpin + Send,
    {
        let mut stage = StagedFile::create(&self.staging_dir)
            .await
            .map_err(|e| IngestError::stage(IngestStage::Staging, e))?;

        let mut buf = vec![0u8; READ_CHUNK_BYTES];
        loop {
            let n = stream
                .read(&mut buf)
                .await
                .map_err(|e| IngestError::stage(IngestStage::Hashing, e))?;
            if n == 0 {
                break;
            }

            stage
                .write_chunk(&buf[..n])
                .await
                .map_err(|e| IngestError::stage(IngestStage::Staging, e))?;

            if stage.bytes_written() > self.policy.max_bytes() {
                return Err(ValidationError::TooLarge {
                    limit: self.policy.max_bytes(),
                    actual: None,
                }
                .into());
            }
        }

        stage
            .finish()
            .await
            .map_err(|e| IngestError::stage(IngestStage::Staging, e))
    }

    /// Dedup hit: register the usage on the canonical record and return a
    /// duplicate view of it.
    async fn attach_to_canonical(
        &self,
        canonical: MediaId,
        owner: OwnerRef,
    ) -> IngestResult<MediaRecord> {
        self.registry
            .attach_usage(canonical, owner)
            .await
            .map_err(|e| IngestError::stage(IngestStage::Registering, e))?;
        let record = self
            .registry
            .get(canonical)
            .await
            .map_err(|e| IngestError::stage(IngestStage::Registering, e))?;
        Ok(record.duplicate_view())
    }

    /// Remove the blob this call uploaded after losing the registration
    /// race. When the winner's record points at the very same backend
    /// location the put was an idempotent overwrite of identical bytes,
    /// not an orphan, and deleting it would take the canonical blob down
    /// with it.
    async fn compensate_lost_race(
        &self,
        winner: &MediaRecord,
        storage_key: &str,
    ) -> IngestResult<()> {
        if winner.provider == self.storage.provider() && winner.storage_key == storage_key {
            debug!(
                storage_key = %storage_key,
                "race loser wrote the canonical location, nothing to compensate"
            );
            return Ok(());
        }

        self.storage.delete(storage_key).await.map_err(|source| {
            error!(
                storage_key = %storage_key,
                error = %source,
                "compensating deletion failed, orphan blob left behind"
            );
            IngestError::CompensationFailed {
                storage_key: storage_key.to_string(),
                source,
            }
        })?;

        debug!(storage_key = %storage_key, "compensated orphan blob write");
        Ok(())
    }

    /// Enqueue the derived-work job for a freshly registered asset.
    /// Returns false (a degraded ingestion, not a failure) when the queue
    /// refuses it.
    async fn schedule_post_processing(&self, record: &MediaRecord) -> bool {
        let kind = match record.category {
            MediaCategory::Image => JobKind::Thumbnail,
            MediaCategory::Video | MediaCategory::Audio => JobKind::Transcode,
            MediaCategory::Document | MediaCategory::Other => JobKind::Moderation,
        };

        let job = Job::post_processing(
            kind,
            record.id.as_uuid(),
            record.provider,
            record.storage_key.clone(),
            record.mime_type.clone(),
        );

        match self.queue.enqueue(job).await {
            Ok(job_id) => {
                debug!(media_id = %record.id, job_id = %job_id, kind = ?kind, "scheduled post-processing");
                true
            }
            Err(err) => {
                warn!(
                    media_id = %record.id,
                    error = %err,
                    "asset stored and registered but post-processing could not be scheduled"
                );
                false
            }
        }
    }
}

/// Deletes an uploaded blob whose record never materialized. Armed between
/// the backend put and the registration outcome; dropping the ingestion
/// future in that window spawns the compensating delete.
struct UploadGuard {
    storage: Arc<dyn StorageBackend>,
    key: String,
    armed: bool,
}

impl UploadGuard {
    fn new(storage: Arc<dyn StorageBackend>, key: String) -> Self {
        UploadGuard {
            storage,
            key,
            armed: true,
        }
    }

    fn disarm(&mut self) {
        self.armed = false;
    }
}

impl Drop for UploadGuard {
    fn drop(&mut self) {
        if !self.armed {
            return;
        }

        let key = std::mem::take(&mut self.key);
        if let Ok(handle) = tokio::runtime::Handle::try_current() {
            let storage = Arc::clone(&self.storage);
            handle.spawn(async move {
                match storage.delete(&key).await {
                    Ok(()) => {
                        info!(storage_key = %key, "removed blob of abandoned ingestion")
                    }
                    Err(err) => error!(
                        storage_key = %key,
                        error = %err,
                        "failed to remove blob of abandoned ingestion, orphan left behind"
                    ),
                }
            });
        } else {
            error!(
                storage_key = %key,
                "no async runtime to remove blob of abandoned ingestion, orphan left behind"
            );
        }
    }
}
