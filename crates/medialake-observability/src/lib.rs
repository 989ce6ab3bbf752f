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

//! Structured logging for MediaLake
//!
//! Thin initialization layer over `tracing-subscriber`:
//! - Pretty, compact, and JSON output formats
//! - Environment-based filtering via `RUST_LOG` or an explicit level
//!
//! # Example
//!
//! ```ignore
//! use medialake_observability::{init_tracing, LogFormat};
//!
//! init_tracing(LogFormat::Pretty, Some("debug"))?;
//! tracing::info!("ingestion service started");
//! ```

use thiserror::Error;
use tracing_subscriber::{fmt, EnvFilter};

/// Log output format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    /// Human-readable multi-line output for development
    #[default]
    Pretty,
    /// Single-line output for terminals
    Compact,
    /// Machine-readable JSON for log aggregation
    Json,
}

impl std::str::FromStr for LogFormat {
    type Err = LogError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "pretty" => Ok(LogFormat::Pretty),
            "compact" => Ok(LogFormat::Compact),
            "json" => Ok(LogFormat::Json),
            other => Err(LogError::UnknownFormat(other.to_string())),
        }
    }
}

/// Errors raised during logging initialization
#[derive(Error, Debug)]
pub enum LogError {
    /// Unrecognized format name
    #[error("unknown log format: {0}")]
    UnknownFormat(String),

    /// The level filter string could not be parsed
    #[error("failed to parse log filter: {0}")]
    InvalidFilter(String),

    /// A global subscriber is already installed
    #[error("tracing subscriber already initialized")]
    AlreadyInitialized,
}

/// Initialize the global tracing subscriber.
///
/// `level` overrides `RUST_LOG` when given; otherwise the environment
/// decides and falls back to `info`.
///
/// # Errors
///
/// Fails if the filter string is invalid or a subscriber is already
/// installed.
pub fn init_tracing(format: LogFormat, level: Option<&str>) -> Result<(), LogError> {
    let filter = build_env_filter(level)?;

    let result = match format {
        LogFormat::Pretty => fmt()
            .with_env_filter(filter)
            .with_thread_names(true)
            .pretty()
            .try_init(),
        LogFormat::Compact => fmt().with_env_filter(filter).compact().try_init(),
        LogFormat::Json => fmt().with_env_filter(filter).json().try_init(),
    };

    result.map_err(|_| LogError::AlreadyInitialized)
}

/// Initialize logging for tests, ignoring the error when another test
/// already installed the global subscriber.
pub fn try_init_for_tests() {
    let _ = init_tracing(LogFormat::Compact, Some("debug"));
}

fn build_env_filter(level: Option<&str>) -> Result<EnvFilter, LogError> {
    match level {
        Some(level) => {
            EnvFilter::try_new(level).map_err(|e| LogError::InvalidFilter(e.to_string()))
        }
        None => Ok(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn test_format_parsing() {
        assert_eq!(LogFormat::from_str("pretty").unwrap(), LogFormat::Pretty);
        assert_eq!(LogFormat::from_str("JSON").unwrap(), LogFormat::Json);
        assert!(LogFormat::from_str("yaml").is_err());
    }

    #[test]
    fn test_env_filter_parsing() {
        assert!(build_env_filter(Some("debug")).is_ok());
        assert!(build_env_filter(Some("medialake_ingest=trace,info")).is_ok());
        assert!(build_env_filter(None).is_ok());
    }

    // Tests that install the global subscriber are intentionally absent:
    // once a global default is set it cannot be replaced within the
    // process. try_init_for_tests covers that path from integration tests.
}
