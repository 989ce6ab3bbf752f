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

//! Configuration schema

use crate::error::{ConfigError, ConfigResult};
use serde::{Deserialize, Serialize};

/// Top-level configuration structure
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(default)]
pub struct Config {
    /// Storage backend selection and settings
    pub storage: StorageConfig,

    /// Upload intake limits
    pub intake: IntakeConfig,

    /// Post-processing queue mode
    pub queue: QueueConfig,

    /// Logging settings
    pub observability: ObservabilityConfig,
}

impl Config {
    /// Semantic validation beyond what serde enforces.
    pub fn validate(&self) -> ConfigResult<()> {
        if self.intake.max_upload_bytes == 0 {
            return Err(ConfigError::Validation(
                "intake.max_upload_bytes must be positive".into(),
            ));
        }
        if self.intake.allowed_mime_types.is_empty() {
            return Err(ConfigError::Validation(
                "intake.allowed_mime_types must not be empty".into(),
            ));
        }
        match &self.storage {
            StorageConfig::S3(s3) if s3.bucket.is_empty() => Err(ConfigError::Validation(
                "storage.bucket must be set for the s3 backend".into(),
            )),
            StorageConfig::Cdn(cdn) if cdn.api_base.is_empty() => Err(ConfigError::Validation(
                "storage.api_base must be set for the cdn backend".into(),
            )),
            _ => Ok(()),
        }
    }
}

/// Storage backend configuration, tagged by backend name
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "backend", rename_all = "lowercase")]
pub enum StorageConfig {
    /// Local filesystem storage
    Local(LocalStorageConfig),

    /// AWS S3 or S3-compatible storage
    S3(S3StorageConfig),

    /// Managed media CDN
    Cdn(CdnStorageConfig),
}

impl Default for StorageConfig {
    fn default() -> Self {
        StorageConfig::Local(LocalStorageConfig::default())
    }
}

/// Local filesystem storage settings
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct LocalStorageConfig {
    /// Root directory for stored blobs
    pub root: String,
}

impl Default for LocalStorageConfig {
    fn default() -> Self {
        LocalStorageConfig {
            root: ".medialake/blobs".into(),
        }
    }
}

/// S3 storage settings
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(default)]
pub struct S3StorageConfig {
    /// Bucket name
    pub bucket: String,
    /// Custom endpoint for S3-compatible services
    pub endpoint: Option<String>,
}

/// Managed CDN settings
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct CdnStorageConfig {
    /// Base URL of the CDN asset API
    pub api_base: String,
    /// Environment variable holding the API key (the key itself never
    /// lives in the config file)
    pub api_key_env: String,
}

impl Default for CdnStorageConfig {
    fn default() -> Self {
        CdnStorageConfig {
            api_base: String::new(),
            api_key_env: "MEDIALAKE_CDN_API_KEY".into(),
        }
    }
}

/// Upload intake limits
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct IntakeConfig {
    /// Maximum accepted upload size in bytes
    pub max_upload_bytes: u64,

    /// MIME type allow-list; entries are exact types or `type/*` families
    pub allowed_mime_types: Vec<String>,
}

impl Default for IntakeConfig {
    fn default() -> Self {
        IntakeConfig {
            max_upload_bytes: 512 * 1024 * 1024, // 512 MiB
            allowed_mime_types: vec![
                "image/*".into(),
                "video/*".into(),
                "audio/*".into(),
                "application/pdf".into(),
            ],
        }
    }
}

/// Queue mode selection. There is no silent-drop mode: jobs are either
/// brokered in memory or handled inline.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(default)]
pub struct QueueConfig {
    /// Broker mode
    pub mode: QueueMode,
}

/// How post-processing jobs are dispatched
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum QueueMode {
    /// In-memory broker with in-process workers
    #[default]
    Memory,
    /// Handle jobs synchronously in the ingestion call
    Inline,
}

/// Logging settings
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level filter ("info", "debug", ...)
    pub level: String,
    /// Output format: "pretty", "compact", or "json"
    pub format: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        ObservabilityConfig {
            level: "info".into(),
            format: "pretty".into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_validate() {
        Config::default().validate().unwrap();
    }

    #[test]
    fn test_storage_backend_tagging() {
        let toml_str = r#"
            [storage]
            backend = "s3"
            bucket = "media-assets"
            endpoint = "https://minio.internal:9000"
        "#;
        let config: Config = toml::from_str(toml_str).unwrap();
        match config.storage {
            StorageConfig::S3(s3) => {
                assert_eq!(s3.bucket, "media-assets");
                assert_eq!(s3.endpoint.as_deref(), Some("https://minio.internal:9000"));
            }
            other => panic!("expected s3 config, got {other:?}"),
        }
    }

    #[test]
    fn test_s3_requires_bucket() {
        let config = Config {
            storage: StorageConfig::S3(S3StorageConfig::default()),
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_zero_limit_rejected() {
        let config = Config {
            intake: IntakeConfig {
                max_upload_bytes: 0,
                ..Default::default()
            },
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_queue_mode_parsing() {
        let config: Config = toml::from_str("[queue]\nmode = \"inline\"").unwrap();
        assert_eq!(config.queue.mode, QueueMode::Inline);
    }
}
