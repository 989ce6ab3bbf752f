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

//! Inline job execution
//!
//! The `inline` queue mode: instead of brokering jobs to workers, the
//! handler runs inside the enqueue call. Ingestion latency then includes
//! the post-processing work, which is the right trade for small
//! deployments that would rather not run workers at all. A handler failure
//! surfaces as a failed enqueue, which ingestion reports as a degraded
//! success like any other queue failure.

use crate::{Job, JobId, PostProcessingQueue, QueueError, QueueResult};
use async_trait::async_trait;
use std::fmt::Debug;
use tracing::debug;

/// Processes one job to completion.
///
/// Handlers must be idempotent per media id: the same job may be handed to
/// them more than once.
#[async_trait]
pub trait JobHandler: Send + Sync + Debug {
    /// Process the job.
    ///
    /// # Errors
    ///
    /// Any error fails the enqueue that carried the job.
    async fn handle(&self, job: Job) -> anyhow::Result<()>;
}

/// Queue that executes jobs synchronously in the enqueue call.
#[derive(Debug)]
pub struct InlineQueue<H> {
    handler: H,
}

impl<H: JobHandler> InlineQueue<H> {
    /// Wrap a handler as an inline queue.
    pub fn new(handler: H) -> Self {
        InlineQueue { handler }
    }
}

#[async_trait]
impl<H: JobHandler> PostProcessingQueue for InlineQueue<H> {
    async fn enqueue(&self, job: Job) -> QueueResult<JobId> {
        let id = job.id;
        debug!(job_id = %id, kind = ?job.kind, media_id = %job.media_id, "handling job inline");

        self.handler
            .handle(job)
            .await
            .map_err(|e| QueueError::transport(e.to_string()))?;
        Ok(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::JobKind;
    use medialake_storage::StorageProvider;
    use std::sync::Arc;
    use tokio::sync::Mutex;
    use uuid::Uuid;

    #[derive(Debug, Default, Clone)]
    struct RecordingHandler {
        seen: Arc<Mutex<Vec<JobKind>>>,
    }

    #[async_trait]
    impl JobHandler for RecordingHandler {
        async fn handle(&self, job: Job) -> anyhow::Result<()> {
            self.seen.lock().await.push(job.kind);
            Ok(())
        }
    }

    #[derive(Debug)]
    struct FailingHandler;

    #[async_trait]
    impl JobHandler for FailingHandler {
        async fn handle(&self, _job: Job) -> anyhow::Result<()> {
            anyhow::bail!("thumbnailer crashed")
        }
    }

    fn job(kind: JobKind) -> Job {
        Job::post_processing(
            kind,
            Uuid::new_v4(),
            StorageProvider::Local,
            "media/ab/cd",
            "image/png",
        )
    }

    #[tokio::test]
    async fn test_jobs_run_before_enqueue_returns() {
        let handler = RecordingHandler::default();
        let queue = InlineQueue::new(handler.clone());

        queue.enqueue(job(JobKind::Thumbnail)).await.unwrap();
        assert_eq!(*handler.seen.lock().await, vec![JobKind::Thumbnail]);
    }

    #[tokio::test]
    async fn test_handler_failure_fails_the_enqueue() {
        let queue = InlineQueue::new(FailingHandler);

        let err = queue.enqueue(job(JobKind::Thumbnail)).await.unwrap_err();
        assert!(matches!(err, QueueError::Transport(_)));
        assert!(err.to_string().contains("thumbnailer crashed"));
    }
}
