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

//! Upload intake and ingestion for MediaLake
//!
//! The entry point is [`IngestionPipeline`]: validate an upload against the
//! [`UploadPolicy`], stage and hash it in one pass, deduplicate it against
//! the registry by content digest, store new bytes under their digest key,
//! and hand derived work to the post-processing queue.
//!
//! The pipeline's correctness story is cleanup: staging files never outlive
//! the call, and a blob written for a record that never materialized is
//! deleted, including when the caller drops the future mid-flight.

pub mod error;
pub mod pipeline;
pub mod policy;
pub mod stage;

pub use error::{IngestError, IngestResult, IngestStage, ValidationError};
pub use pipeline::{IngestOutcome, IngestionPipeline, UploadRequest};
pub use policy::UploadPolicy;
pub use stage::{StagedBlob, StagedFile};
