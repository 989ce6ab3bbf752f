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

//! Canonical media records
//!
//! A [`MediaRecord`] is the single source of truth for one physical asset.
//! The rest of the platform references assets through `(owner_type,
//! owner_id)` usages; the record tracks those usages so the blob can be
//! shared by many logical owners and deleted only when nothing references
//! it anymore.

use crate::Digest;
use chrono::{DateTime, Utc};
use medialake_storage::StorageProvider;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use uuid::Uuid;

/// Opaque, immutable media record identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct MediaId(Uuid);

impl MediaId {
    /// Generate a fresh media id.
    pub fn new() -> Self {
        MediaId(Uuid::new_v4())
    }

    /// The underlying UUID, for wire formats that want it raw.
    pub fn as_uuid(&self) -> Uuid {
        self.0
    }
}

impl Default for MediaId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for MediaId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Coarse asset category derived from the MIME type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MediaCategory {
    /// Raster or vector images
    Image,
    /// Video assets
    Video,
    /// Audio assets
    Audio,
    /// Documents (PDF, office formats, plain text)
    Document,
    /// Anything else
    Other,
}

impl MediaCategory {
    /// Derive the category from a MIME type string.
    pub fn from_mime(mime_type: &str) -> Self {
        let mime_type = mime_type.to_ascii_lowercase();
        if mime_type.starts_with("image/") {
            MediaCategory::Image
        } else if mime_type.starts_with("video/") {
            MediaCategory::Video
        } else if mime_type.starts_with("audio/") {
            MediaCategory::Audio
        } else if mime_type.starts_with("text/")
            || mime_type == "application/pdf"
            || mime_type.starts_with("application/vnd.openxmlformats-officedocument")
            || mime_type == "application/msword"
        {
            MediaCategory::Document
        } else {
            MediaCategory::Other
        }
    }
}

/// Moderation state of an asset. Set asynchronously by workers; fresh
/// uploads start as `Pending`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ApprovalStatus {
    /// Not yet reviewed
    Pending,
    /// Cleared for delivery
    Approved,
    /// Rejected by moderation
    Rejected,
}

/// One logical usage of an asset: `(owner_type, owner_id)`.
///
/// Ordered so the usage set has a stable serialized form.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct OwnerRef {
    /// Kind of the owning entity ("post", "comment", "course", ...)
    pub owner_type: String,
    /// Identifier of the owning entity
    pub owner_id: String,
}

impl OwnerRef {
    /// Build an owner reference.
    pub fn new(owner_type: impl Into<String>, owner_id: impl Into<String>) -> Self {
        OwnerRef {
            owner_type: owner_type.into(),
            owner_id: owner_id.into(),
        }
    }
}

/// The canonical representation of one physical asset.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MediaRecord {
    /// Opaque, immutable identifier
    pub id: MediaId,
    /// Content digest; `None` only for legacy records ingested before
    /// hashing existed. When present it is unique across all records.
    pub content_digest: Option<Digest>,

    /// Who uploaded the original bytes
    pub uploader_id: String,
    /// When the record was created
    pub created_at: DateTime<Utc>,

    /// Backend holding the blob. Together with `storage_key` this is set
    /// exactly once at creation and never mutated; moving backends means a
    /// new record and a reference migration.
    pub provider: StorageProvider,
    /// Blob locator within the backend
    pub storage_key: String,
    /// Direct URL recorded from the backend at upload time
    pub direct_url: String,
    /// CDN delivery URL, present only when a CDN mirror exists
    pub cdn_url: Option<String>,

    /// Declared MIME type
    pub mime_type: String,
    /// Size in bytes, computed from the same stream as the digest
    pub byte_size: u64,
    /// Coarse category derived from the MIME type
    pub category: MediaCategory,
    /// Logical folder chosen by the uploader
    pub folder: String,
    /// Free-form tags
    pub tags: Vec<String>,

    /// Number of distinct usages; always equals `used_in.len()`
    pub usage_count: u64,
    /// Deduplicated set of owner references
    pub used_in: BTreeSet<OwnerRef>,

    /// Set only on record views returned from a dedup hit, pointing at the
    /// canonical record the request resolved to. Stored records never carry
    /// it: there is never a second record for a digest.
    pub duplicate_of: Option<MediaId>,

    /// Moderation state
    pub approval: ApprovalStatus,
    /// Thumbnail blob key, populated by the thumbnail worker
    pub thumbnail_key: Option<String>,
    /// Transcoded rendition keys, populated by the transcode worker
    pub transcode_keys: Vec<String>,
}

impl MediaRecord {
    /// The URL the platform should hand out: the CDN mirror when one
    /// exists, else the backend's direct URL.
    pub fn url(&self) -> &str {
        self.cdn_url.as_deref().unwrap_or(&self.direct_url)
    }

    /// A view of this record marking that a request resolved to it as a
    /// duplicate.
    pub fn duplicate_view(&self) -> MediaRecord {
        let mut view = self.clone();
        view.duplicate_of = Some(self.id);
        view
    }
}

/// Input for creating a record from a finished upload.
#[derive(Debug, Clone)]
pub struct NewMedia {
    /// Content digest computed while staging
    pub digest: Digest,
    /// Uploader identity
    pub uploader_id: String,
    /// Declared MIME type
    pub mime_type: String,
    /// Byte size from the same stream as the digest
    pub byte_size: u64,
    /// Target folder
    pub folder: String,
    /// Free-form tags
    pub tags: Vec<String>,
    /// Backend that stored the blob
    pub provider: StorageProvider,
    /// Key the blob was stored under
    pub storage_key: String,
    /// Direct URL reported by the backend
    pub direct_url: String,
    /// CDN URL, when the backend provides one
    pub cdn_url: Option<String>,
    /// The first logical usage of the asset
    pub owner: OwnerRef,
}

impl NewMedia {
    /// Materialize the draft into a full record with a fresh id.
    pub fn into_record(self) -> MediaRecord {
        let category = MediaCategory::from_mime(&self.mime_type);
        let mut used_in = BTreeSet::new();
        used_in.insert(self.owner);

        MediaRecord {
            id: MediaId::new(),
            content_digest: Some(self.digest),
            uploader_id: self.uploader_id,
            created_at: Utc::now(),
            provider: self.provider,
            storage_key: self.storage_key,
            direct_url: self.direct_url,
            cdn_url: self.cdn_url,
            mime_type: self.mime_type,
            byte_size: self.byte_size,
            category,
            folder: self.folder,
            tags: self.tags,
            usage_count: 1,
            used_in,
            duplicate_of: None,
            approval: ApprovalStatus::Pending,
            thumbnail_key: None,
            transcode_keys: Vec::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_record() -> MediaRecord {
        NewMedia {
            digest: Digest::hash(b"sample"),
            uploader_id: "u1".into(),
            mime_type: "image/png".into(),
            byte_size: 6,
            folder: "avatars".into(),
            tags: vec!["profile".into()],
            provider: StorageProvider::Local,
            storage_key: "media/ab/cd".into(),
            direct_url: "file:///data/media/ab/cd".into(),
            cdn_url: None,
            owner: OwnerRef::new("post", "p1"),
        }
        .into_record()
    }

    #[test]
    fn test_category_from_mime() {
        assert_eq!(MediaCategory::from_mime("image/png"), MediaCategory::Image);
        assert_eq!(MediaCategory::from_mime("IMAGE/JPEG"), MediaCategory::Image);
        assert_eq!(MediaCategory::from_mime("video/mp4"), MediaCategory::Video);
        assert_eq!(MediaCategory::from_mime("audio/mpeg"), MediaCategory::Audio);
        assert_eq!(
            MediaCategory::from_mime("application/pdf"),
            MediaCategory::Document
        );
        assert_eq!(MediaCategory::from_mime("text/plain"), MediaCategory::Document);
        assert_eq!(
            MediaCategory::from_mime("application/zip"),
            MediaCategory::Other
        );
    }

    #[test]
    fn test_new_record_invariants() {
        let record = sample_record();
        assert_eq!(record.usage_count, 1);
        assert_eq!(record.usage_count as usize, record.used_in.len());
        assert_eq!(record.approval, ApprovalStatus::Pending);
        assert!(record.duplicate_of.is_none());
        assert!(record.content_digest.is_some());
    }

    #[test]
    fn test_url_prefers_cdn() {
        let mut record = sample_record();
        assert_eq!(record.url(), "file:///data/media/ab/cd");

        record.cdn_url = Some("https://cdn.example.com/ab/cd".into());
        assert_eq!(record.url(), "https://cdn.example.com/ab/cd");
    }

    #[test]
    fn test_duplicate_view_points_at_canonical() {
        let record = sample_record();
        let view = record.duplicate_view();
        assert_eq!(view.duplicate_of, Some(record.id));
        assert_eq!(view.id, record.id);
    }

    #[test]
    fn test_owner_ref_ordering_is_stable() {
        let mut set = BTreeSet::new();
        set.insert(OwnerRef::new("post", "2"));
        set.insert(OwnerRef::new("post", "1"));
        set.insert(OwnerRef::new("comment", "9"));

        let owners: Vec<_> = set.iter().map(|o| o.owner_type.as_str()).collect();
        assert_eq!(owners, vec!["comment", "post", "post"]);
    }
}
