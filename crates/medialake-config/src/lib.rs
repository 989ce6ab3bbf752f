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

//! Configuration for MediaLake
//!
//! TOML-based configuration with serde defaults, semantic validation, and
//! environment variable overrides. Secrets (the CDN API key) are referenced
//! by environment variable name, never stored in the file.

pub mod error;
pub mod loader;
pub mod schema;

pub use error::{ConfigError, ConfigResult};
pub use loader::ConfigLoader;
pub use schema::{
    CdnStorageConfig, Config, IntakeConfig, LocalStorageConfig, ObservabilityConfig, QueueConfig,
    QueueMode, S3StorageConfig, StorageConfig,
};
