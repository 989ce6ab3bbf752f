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

//! In-memory queue broker
//!
//! An unbounded mpsc channel wearing the [`PostProcessingQueue`] contract.
//! Suitable for single-process deployments with in-process workers and for
//! tests. `close()` makes subsequent enqueues fail with
//! [`QueueError::Closed`], which is how tests exercise the degraded-success
//! ingestion path.

use crate::{Job, JobId, PostProcessingQueue, QueueError, QueueResult};
use async_trait::async_trait;
use std::fmt;
use std::sync::Arc;
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tokio::sync::Mutex;
use tracing::debug;

/// In-memory post-processing queue
///
/// Clones share the same channel; one clone goes to the pipeline and the
/// registry, another stays with whoever drives the workers.
#[derive(Clone)]
pub struct MemoryQueue {
    tx: UnboundedSender<Job>,
    rx: Arc<Mutex<Option<UnboundedReceiver<Job>>>>,
}

impl MemoryQueue {
    /// Create a new in-memory queue.
    pub fn new() -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        MemoryQueue {
            tx,
            rx: Arc::new(Mutex::new(Some(rx))),
        }
    }

    /// Take the consumer side of the queue.
    ///
    /// Returns `None` on the second and later calls; there is exactly one
    /// consumer.
    pub async fn take_receiver(&self) -> Option<UnboundedReceiver<Job>> {
        self.rx.lock().await.take()
    }

    /// Close the queue: subsequent enqueues fail with
    /// [`QueueError::Closed`].
    pub async fn close(&self) {
        // Dropping the receiver closes the sender side of the channel.
        self.rx.lock().await.take();
    }
}

impl Default for MemoryQueue {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for MemoryQueue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MemoryQueue")
            .field("closed", &self.tx.is_closed())
            .finish()
    }
}

#[async_trait]
impl PostProcessingQueue for MemoryQueue {
    async fn enqueue(&self, job: Job) -> QueueResult<JobId> {
        let id = job.id;
        debug!(job_id = %id, kind = ?job.kind, media_id = %job.media_id, "enqueueing job");

        self.tx.send(job).map_err(|_| QueueError::Closed)?;
        Ok(id)
    }
}
