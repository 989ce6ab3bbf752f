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

//! Managed media CDN storage backend
//!
//! Implements the [`StorageBackend`](crate::StorageBackend) trait against a
//! managed media CDN's upload API: blobs are pushed over an authenticated
//! HTTPS call, the service assigns a public id, and the receipt carries the
//! CDN delivery URL that ends up on the media record as `cdn_url`.
//!
//! The wire protocol is the common upload-API shape:
//! - `PUT  {api_base}/assets/{key}` with the raw bytes → JSON
//!   `{ "public_id": ..., "url": ..., "secure_url": ... }`
//! - `HEAD {api_base}/assets/{key}` → 200 / 404
//! - `DELETE {api_base}/assets/{key}` → 200 / 404 (both treated as success)

use crate::error::{validate_key, StorageError};
use crate::{PutReceipt, StorageBackend, StorageProvider};
use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::Deserialize;
use std::fmt;
use std::sync::Arc;
use tracing::debug;

/// Configuration for the managed CDN backend
#[derive(Clone)]
pub struct CdnConfig {
    /// Base URL of the CDN's asset API, e.g. `https://api.cdn.example.com/v1`
    pub api_base: String,

    /// API key sent as a bearer token
    pub api_key: String,
}

impl fmt::Debug for CdnConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // api_key deliberately omitted
        f.debug_struct("CdnConfig")
            .field("api_base", &self.api_base)
            .finish()
    }
}

/// Upload API response body
#[derive(Debug, Deserialize)]
struct UploadResponse {
    public_id: String,
    url: String,
    secure_url: String,
}

/// Managed media CDN storage backend
///
/// # Thread Safety
///
/// `Send + Sync`; the underlying `reqwest::Client` pools connections and is
/// safe to share across tasks.
#[derive(Clone)]
pub struct CdnBackend {
    client: reqwest::Client,
    config: Arc<CdnConfig>,
}

impl CdnBackend {
    /// Create a new CDN backend with the given configuration.
    ///
    /// # Errors
    ///
    /// Fails if the HTTP client cannot be constructed or the API base URL
    /// is empty.
    pub fn new(config: CdnConfig) -> Result<Self> {
        if config.api_base.is_empty() {
            anyhow::bail!("CDN api_base cannot be empty");
        }

        let client = reqwest::Client::builder()
            .build()
            .context("failed to build HTTP client for CDN backend")?;

        Ok(CdnBackend {
            client,
            config: Arc::new(config),
        })
    }

    fn asset_url(&self, key: &str) -> String {
        format!("{}/assets/{}", self.config.api_base.trim_end_matches('/'), key)
    }
}

impl fmt::Debug for CdnBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CdnBackend")
            .field("api_base", &self.config.api_base)
            .finish()
    }
}

#[async_trait]
impl StorageBackend for CdnBackend {
    fn provider(&self) -> StorageProvider {
        StorageProvider::CdnManaged
    }

    async fn put(&self, key: &str, data: &[u8], content_type: &str) -> Result<PutReceipt> {
        validate_key(key)?;

        debug!(key = %key, bytes = data.len(), "uploading object to CDN");

        // PUT addressed by key is idempotent on the provider side: a retry
        // re-uploads the same bytes under the same public id.
        let response = self
            .client
            .put(self.asset_url(key))
            .bearer_auth(&self.config.api_key)
            .header(reqwest::header::CONTENT_TYPE, content_type)
            .body(data.to_vec())
            .send()
            .await
            .context(format!("CDN upload request failed: {key}"))?;

        if !response.status().is_success() {
            return Err(StorageError::backend(format!(
                "CDN upload rejected with status {}: {key}",
                response.status()
            ))
            .into());
        }

        let body: UploadResponse = response
            .json()
            .await
            .context("failed to parse CDN upload response")?;

        Ok(PutReceipt::CdnManaged {
            public_id: body.public_id,
            url: body.url,
            cdn_url: body.secure_url,
        })
    }

    async fn get(&self, key: &str) -> Result<Vec<u8>> {
        validate_key(key)?;

        let response = self
            .client
            .get(self.asset_url(key))
            .bearer_auth(&self.config.api_key)
            .send()
            .await
            .context(format!("CDN fetch request failed: {key}"))?;

        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Err(StorageError::not_found(key).into());
        }
        if !response.status().is_success() {
            return Err(StorageError::backend(format!(
                "CDN fetch failed with status {}: {key}",
                response.status()
            ))
            .into());
        }

        Ok(response.bytes().await?.to_vec())
    }

    async fn exists(&self, key: &str) -> Result<bool> {
        validate_key(key)?;

        let response = self
            .client
            .head(self.asset_url(key))
            .bearer_auth(&self.config.api_key)
            .send()
            .await
            .context(format!("CDN existence check failed: {key}"))?;

        match response.status() {
            reqwest::StatusCode::NOT_FOUND => Ok(false),
            status if status.is_success() => Ok(true),
            status => Err(StorageError::backend(format!(
                "CDN existence check failed with status {status}: {key}"
            ))
            .into()),
        }
    }

    async fn delete(&self, key: &str) -> Result<()> {
        validate_key(key)?;

        debug!(key = %key, "deleting object from CDN");

        let response = self
            .client
            .delete(self.asset_url(key))
            .bearer_auth(&self.config.api_key)
            .send()
            .await
            .context(format!("CDN delete request failed: {key}"))?;

        // 404 is fine: delete is idempotent
        if response.status() == reqwest::StatusCode::NOT_FOUND || response.status().is_success() {
            Ok(())
        } else {
            Err(StorageError::backend(format!(
                "CDN delete failed with status {}: {key}",
                response.status()
            ))
            .into())
        }
    }
}
