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

//! Post-processing queue contract for MediaLake
//!
//! The ingestion pipeline and registry only *emit* jobs; workers (thumbnail
//! generation, transcoding, moderation, physical blob deletion) live behind
//! this boundary. The contract is at-least-once delivery with
//! consumer-idempotent jobs: a worker re-processing the same media id must
//! produce the same derived outputs, not duplicate them.
//!
//! There is deliberately no silent-drop implementation. If no broker is
//! available, deployments run the [`MemoryQueue`] with in-process workers or
//! handle jobs inline; dropping jobs on the floor would defeat the
//! degraded-success signal that ingestion reports when an enqueue fails.

pub mod error;
pub mod inline;
pub mod job;
pub mod memory;

pub use error::{QueueError, QueueResult};
pub use inline::{InlineQueue, JobHandler};
pub use job::{Job, JobId, JobKind};
pub use memory::MemoryQueue;

use async_trait::async_trait;
use std::fmt::Debug;

/// Client contract the pipeline needs from a job queue.
///
/// Delivery is at-least-once; consumers must be idempotent per media id.
#[async_trait]
pub trait PostProcessingQueue: Send + Sync + Debug {
    /// Enqueue a job and return its handle.
    ///
    /// # Errors
    ///
    /// Returns [`QueueError`] if the broker rejects the job or is closed.
    /// Ingestion treats this as a degraded-success condition, not a fatal
    /// failure.
    async fn enqueue(&self, job: Job) -> QueueResult<JobId>;
}
