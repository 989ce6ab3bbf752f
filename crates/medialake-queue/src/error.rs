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

//! Queue error types

use thiserror::Error;

/// Result type alias for queue operations
pub type QueueResult<T> = Result<T, QueueError>;

/// Errors that can occur while enqueueing a job
#[derive(Error, Debug)]
pub enum QueueError {
    /// The broker has been shut down and accepts no more jobs
    #[error("queue is closed")]
    Closed,

    /// The job payload could not be serialized for the transport
    #[error("job serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),

    /// The broker transport rejected the job
    #[error("queue transport error: {0}")]
    Transport(String),
}

impl QueueError {
    /// Create a Transport error with context
    pub fn transport<S: Into<String>>(msg: S) -> Self {
        QueueError::Transport(msg.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display() {
        assert_eq!(QueueError::Closed.to_string(), "queue is closed");
        assert_eq!(
            QueueError::transport("connection reset").to_string(),
            "queue transport error: connection reset"
        );
    }
}
