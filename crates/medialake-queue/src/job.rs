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

//! Job payloads for the post-processing queue
//!
//! A job carries everything a worker needs to fetch the blob and act
//! without querying the registry first: the media id, the storage location
//! `(provider, key)`, and the MIME type.

use medialake_storage::StorageProvider;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Opaque job handle returned from a successful enqueue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct JobId(Uuid);

impl JobId {
    /// Generate a fresh job id.
    pub fn new() -> Self {
        JobId(Uuid::new_v4())
    }
}

impl Default for JobId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for JobId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Kind of derived work requested from a worker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobKind {
    /// Generate thumbnail renditions for an image
    Thumbnail,
    /// Transcode audio/video into delivery formats
    Transcode,
    /// Run content moderation on the asset
    Moderation,
    /// Delete the physical blob from its storage backend
    Delete,
}

/// One unit of asynchronous post-processing work.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Job {
    /// Unique id of this job instance
    pub id: JobId,
    /// What the worker should do
    pub kind: JobKind,
    /// The media record this job refers to
    pub media_id: Uuid,
    /// Backend holding the blob
    pub provider: StorageProvider,
    /// Blob locator within the backend
    pub storage_key: String,
    /// MIME type of the blob
    pub mime_type: String,
    /// Free-form worker parameters (rendition sizes, codec hints, ...)
    #[serde(default, skip_serializing_if = "serde_json::Value::is_null")]
    pub payload: serde_json::Value,
}

impl Job {
    /// Build a post-processing job for a freshly registered asset.
    pub fn post_processing(
        kind: JobKind,
        media_id: Uuid,
        provider: StorageProvider,
        storage_key: impl Into<String>,
        mime_type: impl Into<String>,
    ) -> Self {
        Job {
            id: JobId::new(),
            kind,
            media_id,
            provider,
            storage_key: storage_key.into(),
            mime_type: mime_type.into(),
            payload: serde_json::Value::Null,
        }
    }

    /// Build the deletion job emitted when a registry record is removed.
    ///
    /// Physical deletion is eventually consistent with the registry's
    /// synchronous removal: the record disappears now, the blob disappears
    /// when a worker processes this job.
    pub fn delete(
        media_id: Uuid,
        provider: StorageProvider,
        storage_key: impl Into<String>,
        mime_type: impl Into<String>,
    ) -> Self {
        Self::post_processing(JobKind::Delete, media_id, provider, storage_key, mime_type)
    }

    /// Attach worker parameters to the job.
    pub fn with_payload(mut self, payload: serde_json::Value) -> Self {
        self.payload = payload;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_job_ids_are_unique() {
        assert_ne!(JobId::new(), JobId::new());
    }

    #[test]
    fn test_job_payload_roundtrip() {
        let media_id = Uuid::new_v4();
        let job = Job::post_processing(
            JobKind::Thumbnail,
            media_id,
            StorageProvider::S3,
            "media/ab/cd",
            "image/png",
        )
        .with_payload(serde_json::json!({ "sizes": [128, 512] }));

        let encoded = serde_json::to_string(&job).unwrap();
        let decoded: Job = serde_json::from_str(&encoded).unwrap();
        assert_eq!(decoded, job);
        assert_eq!(decoded.media_id, media_id);
        assert_eq!(decoded.storage_key, "media/ab/cd");
    }

    #[test]
    fn test_delete_job_kind() {
        let job = Job::delete(
            Uuid::new_v4(),
            StorageProvider::Local,
            "media/ab/cd",
            "application/pdf",
        );
        assert_eq!(job.kind, JobKind::Delete);
    }

    #[test]
    fn test_job_kind_wire_names() {
        assert_eq!(
            serde_json::to_value(JobKind::Thumbnail).unwrap(),
            serde_json::json!("thumbnail")
        );
        assert_eq!(
            serde_json::to_value(JobKind::Delete).unwrap(),
            serde_json::json!("delete")
        );
    }
}
