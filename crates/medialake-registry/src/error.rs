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

//! Registry and store error types

use crate::{MediaId, MediaRecord};
use medialake_queue::QueueError;
use thiserror::Error;

/// Errors raised by a [`RegistryStore`](crate::RegistryStore)
/// implementation.
#[derive(Error, Debug)]
pub enum StoreError {
    /// An insert lost the uniqueness race on `content_digest`. Carries the
    /// record that won so the caller can treat this as a dedup hit without
    /// a second lookup.
    #[error("digest already registered under media id {}", existing.id)]
    DuplicateDigest {
        /// The canonical record already holding this digest
        existing: Box<MediaRecord>,
    },

    /// No record with the given id
    #[error("media record not found: {0}")]
    NotFound(MediaId),

    /// The backing store failed
    #[error("registry store error: {0}")]
    Backend(String),

    /// Transparent wrapper for opaque error types
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl StoreError {
    /// Create a Backend error with context
    pub fn backend<S: Into<String>>(msg: S) -> Self {
        StoreError::Backend(msg.into())
    }
}

/// Errors surfaced by [`MediaRegistry`](crate::MediaRegistry) operations.
#[derive(Error, Debug)]
pub enum RegistryError {
    /// No record with the given id
    #[error("media record not found: {0}")]
    NotFound(MediaId),

    /// `create_from_upload` lost the digest-uniqueness race. Never a
    /// user-facing error: the pipeline compensates and attaches to the
    /// winning record instead.
    #[error("digest already registered under media id {}", existing.id)]
    DuplicateDigest {
        /// The canonical record already holding this digest
        existing: Box<MediaRecord>,
    },

    /// Deletion refused because usages still reference the record
    #[error("media record is still in use ({usage_count} usages)")]
    InUse {
        /// Current usage count at the time of the refused delete
        usage_count: u64,
    },

    /// The backing store failed
    #[error("registry store error: {0}")]
    Store(StoreError),

    /// Enqueueing the deletion job failed; the delete was aborted
    #[error("failed to enqueue deletion job: {0}")]
    Queue(#[from] QueueError),
}

impl From<StoreError> for RegistryError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::DuplicateDigest { existing } => RegistryError::DuplicateDigest { existing },
            StoreError::NotFound(id) => RegistryError::NotFound(id),
            other => RegistryError::Store(other),
        }
    }
}
