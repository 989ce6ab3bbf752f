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

//! Configuration loading
//!
//! TOML files with environment variable overrides layered on top:
//! - `MEDIALAKE_MAX_UPLOAD_BYTES`
//! - `MEDIALAKE_S3_BUCKET`
//! - `MEDIALAKE_LOG_LEVEL`

use crate::error::{ConfigError, ConfigResult};
use crate::schema::{Config, StorageConfig};
use std::path::Path;
use tokio::fs;
use tracing::{debug, info};

/// Configuration loader
#[derive(Debug)]
pub struct ConfigLoader {
    validate: bool,
}

impl ConfigLoader {
    /// Create a new configuration loader with validation enabled.
    pub fn new() -> Self {
        ConfigLoader { validate: true }
    }

    /// Create a loader that skips semantic validation.
    pub fn without_validation() -> Self {
        ConfigLoader { validate: false }
    }

    /// Load configuration from a TOML file.
    pub async fn load_file<P: AsRef<Path>>(&self, path: P) -> ConfigResult<Config> {
        let path = path.as_ref();
        debug!("Loading configuration from: {}", path.display());

        if !path.exists() {
            return Err(ConfigError::FileNotFound(path.to_path_buf()));
        }

        let content = fs::read_to_string(path).await?;
        let config = self.load_from_string(&content)?;

        info!("Loaded configuration file: {}", path.display());
        Ok(config)
    }

    /// Load configuration from a TOML string.
    pub fn load_from_string(&self, content: &str) -> ConfigResult<Config> {
        let config: Config = toml::from_str(content)?;

        if self.validate {
            config.validate()?;
        }
        Ok(config)
    }

    /// Load a file and apply environment variable overrides.
    pub async fn load_with_overrides<P: AsRef<Path>>(&self, path: P) -> ConfigResult<Config> {
        let mut config = self.load_file(path).await?;
        self.apply_env_overrides(&mut config)?;

        if self.validate {
            config.validate()?;
        }
        Ok(config)
    }

    /// Apply environment variable overrides to a loaded configuration.
    pub fn apply_env_overrides(&self, config: &mut Config) -> ConfigResult<()> {
        if let Ok(value) = std::env::var("MEDIALAKE_MAX_UPLOAD_BYTES") {
            config.intake.max_upload_bytes =
                value
                    .parse()
                    .map_err(|_| ConfigError::InvalidEnvOverride {
                        var: "MEDIALAKE_MAX_UPLOAD_BYTES".into(),
                        value,
                    })?;
            debug!("Applied MEDIALAKE_MAX_UPLOAD_BYTES override");
        }

        if let Ok(bucket) = std::env::var("MEDIALAKE_S3_BUCKET") {
            if let StorageConfig::S3(s3) = &mut config.storage {
                s3.bucket = bucket;
                debug!("Applied MEDIALAKE_S3_BUCKET override");
            }
        }

        if let Ok(level) = std::env::var("MEDIALAKE_LOG_LEVEL") {
            config.observability.level = level;
            debug!("Applied MEDIALAKE_LOG_LEVEL override");
        }

        Ok(())
    }
}

impl Default for ConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::QueueMode;

    #[test]
    fn test_load_from_string() {
        let loader = ConfigLoader::new();
        let config = loader
            .load_from_string(
                r#"
                [storage]
                backend = "local"
                root = "/var/lib/medialake"

                [intake]
                max_upload_bytes = 1048576
                allowed_mime_types = ["image/*"]

                [queue]
                mode = "memory"
                "#,
            )
            .unwrap();

        assert_eq!(config.intake.max_upload_bytes, 1_048_576);
        assert_eq!(config.queue.mode, QueueMode::Memory);
    }

    #[test]
    fn test_invalid_config_rejected() {
        let loader = ConfigLoader::new();
        let result = loader.load_from_string("[intake]\nmax_upload_bytes = 0");
        assert!(matches!(result, Err(ConfigError::Validation(_))));
    }

    #[test]
    fn test_without_validation_accepts_invalid() {
        let loader = ConfigLoader::without_validation();
        assert!(loader
            .load_from_string("[intake]\nmax_upload_bytes = 0")
            .is_ok());
    }

    #[tokio::test]
    async fn test_load_file_not_found() {
        let loader = ConfigLoader::new();
        let result = loader.load_file("/nonexistent/medialake.toml").await;
        assert!(matches!(result, Err(ConfigError::FileNotFound(_))));
    }

    #[tokio::test]
    async fn test_load_file_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("medialake.toml");
        tokio::fs::write(&path, "[queue]\nmode = \"inline\"")
            .await
            .unwrap();

        let config = ConfigLoader::new().load_file(&path).await.unwrap();
        assert_eq!(config.queue.mode, QueueMode::Inline);
    }
}
