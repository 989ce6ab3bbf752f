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

//! Ingestion error types

use thiserror::Error;

/// Pre-storage rejections: the upload never reached a backend.
#[derive(Error, Debug)]
pub enum ValidationError {
    /// The upload exceeds the configured size limit. `actual` is known
    /// only when the client declared a size; streams that blow the limit
    /// mid-transfer are rejected without a final count.
    #[error("upload exceeds the size limit of {limit} bytes")]
    TooLarge {
        /// Configured maximum in bytes
        limit: u64,
        /// Declared size, when the client sent one
        actual: Option<u64>,
    },

    /// The MIME type is not on the allow-list.
    #[error("MIME type not allowed: {0}")]
    DisallowedMime(String),
}

/// Stage of the pipeline an ingestion failed in. Each stage has its own
/// cleanup obligations, so errors carry it for logging and retry decisions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IngestStage {
    /// Writing the upload stream to the staging area
    Staging,
    /// Reading the upload stream while hashing
    Hashing,
    /// Transferring the staged blob to the storage backend
    Upload,
    /// Registering or looking up the record
    Registering,
}

impl std::fmt::Display for IngestStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            IngestStage::Staging => "staging",
            IngestStage::Hashing => "hashing",
            IngestStage::Upload => "upload",
            IngestStage::Registering => "registering",
        };
        write!(f, "{name}")
    }
}

/// Errors surfaced by [`IngestionPipeline::ingest`](crate::IngestionPipeline::ingest).
#[derive(Error, Debug)]
pub enum IngestError {
    /// The upload was rejected before any bytes reached storage.
    #[error("upload rejected: {0}")]
    Validation(#[from] ValidationError),

    /// A pipeline stage failed. By the time this is returned, everything
    /// the failed ingestion wrote has been cleaned up.
    #[error("ingestion failed during {stage}: {source}")]
    Stage {
        /// Where the failure happened
        stage: IngestStage,
        /// The underlying failure
        #[source]
        source: anyhow::Error,
    },

    /// The registration race was lost and the compensating blob deletion
    /// itself failed, leaving an orphan at `storage_key`. Operators must
    /// reconcile it; the dedup hit was not returned to the caller.
    #[error("failed to remove orphan blob {storage_key} after losing registration race: {source}")]
    CompensationFailed {
        /// Key of the stranded blob
        storage_key: String,
        /// The deletion failure
        #[source]
        source: anyhow::Error,
    },
}

impl IngestError {
    /// Tag an underlying failure with the stage it happened in.
    pub fn stage(stage: IngestStage, source: impl Into<anyhow::Error>) -> Self {
        IngestError::Stage {
            stage,
            source: source.into(),
        }
    }
}

/// Result alias for ingestion operations.
pub type IngestResult<T> = Result<T, IngestError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stage_display() {
        assert_eq!(IngestStage::Hashing.to_string(), "hashing");
        assert_eq!(IngestStage::Upload.to_string(), "upload");
    }

    #[test]
    fn test_error_messages() {
        let err = IngestError::from(ValidationError::TooLarge {
            limit: 1024,
            actual: Some(2048),
        });
        assert!(err.to_string().contains("1024"));

        let err = IngestError::stage(IngestStage::Upload, anyhow::anyhow!("connection reset"));
        assert!(err.to_string().contains("upload"));
        assert!(err.to_string().contains("connection reset"));
    }
}
