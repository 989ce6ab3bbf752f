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

//! Configuration error types

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for configuration operations
pub type ConfigResult<T> = Result<T, ConfigError>;

/// Errors that can occur while loading or validating configuration
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Configuration file does not exist
    #[error("configuration file not found: {0}")]
    FileNotFound(PathBuf),

    /// I/O error while reading the file
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// TOML syntax or type error
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),

    /// An environment override had an unparsable value
    #[error("invalid value for {var}: {value}")]
    InvalidEnvOverride {
        /// Variable name
        var: String,
        /// Offending value
        value: String,
    },

    /// Semantic validation failed
    #[error("configuration validation failed: {0}")]
    Validation(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display() {
        let err = ConfigError::Validation("max_upload_bytes must be positive".into());
        assert!(err.to_string().contains("validation failed"));
    }
}
