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

//! AWS S3 storage backend
//!
//! Implements the [`StorageBackend`](crate::StorageBackend) trait using
//! AWS S3. Supports standard S3 and S3-compatible services (MinIO,
//! DigitalOcean Spaces, etc.) via a custom endpoint.
//!
//! # Authentication
//!
//! Uses the standard AWS credential chain:
//! 1. Environment variables (AWS_ACCESS_KEY_ID, AWS_SECRET_ACCESS_KEY)
//! 2. IAM role credentials (EC2, ECS, Lambda)
//! 3. AWS profiles (~/.aws/credentials and ~/.aws/config)
//!
//! # Error Handling
//!
//! AWS errors are mapped to `anyhow::Error` with descriptive messages, and
//! transient failures are retried with exponential backoff.

use crate::error::validate_key;
use crate::{PutReceipt, StorageBackend, StorageProvider};
use anyhow::{Context, Result};
use async_trait::async_trait;
use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::Client;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, warn};

/// Configuration for the S3 backend
#[derive(Clone, Debug)]
pub struct S3Config {
    /// S3 bucket name
    pub bucket: String,

    /// Optional custom S3 endpoint (for S3-compatible services like MinIO)
    pub endpoint: Option<String>,

    /// Maximum number of retries for failed operations (default: 3)
    pub max_retries: u32,

    /// Initial retry delay in milliseconds (default: 100ms)
    pub initial_retry_delay_ms: u64,
}

impl Default for S3Config {
    fn default() -> Self {
        S3Config {
            bucket: String::new(),
            endpoint: None,
            max_retries: 3,
            initial_retry_delay_ms: 100,
        }
    }
}

/// AWS S3 storage backend
///
/// # Thread Safety
///
/// `Send + Sync`; the SDK client is internally reference-counted and safe
/// to share across tasks.
#[derive(Clone)]
pub struct S3Backend {
    client: Client,
    config: Arc<S3Config>,
}

impl S3Backend {
    /// Create a new S3 backend with the given bucket name.
    ///
    /// Uses automatic AWS credential and region detection.
    ///
    /// # Errors
    ///
    /// Fails if the bucket is not reachable with the resolved credentials.
    pub async fn new(bucket: impl Into<String>) -> Result<Self> {
        let config = S3Config {
            bucket: bucket.into(),
            ..Default::default()
        };
        Self::with_config(config).await
    }

    /// Create a new S3 backend with custom configuration.
    ///
    /// # Errors
    ///
    /// Fails if SDK initialization fails or bucket access cannot be
    /// verified.
    pub async fn with_config(config: S3Config) -> Result<Self> {
        let sdk_config = aws_config::defaults(aws_config::BehaviorVersion::latest())
            .load()
            .await;

        let client = if let Some(endpoint) = &config.endpoint {
            debug!("Using custom S3 endpoint: {}", endpoint);
            let s3_config = aws_sdk_s3::config::Builder::from(&sdk_config)
                .endpoint_url(endpoint.clone())
                .force_path_style(true)
                .build();
            Client::from_conf(s3_config)
        } else {
            Client::new(&sdk_config)
        };

        client
            .head_bucket()
            .bucket(&config.bucket)
            .send()
            .await
            .context(format!(
                "Failed to verify S3 bucket access: {}",
                config.bucket
            ))?;

        debug!(bucket = %config.bucket, "Successfully connected to S3 bucket");

        Ok(S3Backend {
            client,
            config: Arc::new(config),
        })
    }

    /// Direct object URL for a key in this bucket.
    fn object_url(&self, key: &str) -> String {
        match &self.config.endpoint {
            Some(endpoint) => format!(
                "{}/{}/{}",
                endpoint.trim_end_matches('/'),
                self.config.bucket,
                key
            ),
            None => format!("https://{}.s3.amazonaws.com/{}", self.config.bucket, key),
        }
    }

    /// Perform an operation with exponential backoff retry logic
    async fn with_retry<F, T>(&self, mut operation: F) -> Result<T>
    where
        F: FnMut() -> std::pin::Pin<Box<dyn std::future::Future<Output = Result<T>> + Send>>,
    {
        let mut retry_count = 0;
        let mut delay_ms = self.config.initial_retry_delay_ms;

        loop {
            match operation().await {
                Ok(result) => return Ok(result),
                Err(e) => {
                    retry_count += 1;
                    if retry_count >= self.config.max_retries {
                        return Err(e)
                            .context(format!("Failed after {} retries", self.config.max_retries));
                    }

                    warn!(
                        "Operation failed (attempt {}/{}), retrying in {}ms: {}",
                        retry_count, self.config.max_retries, delay_ms, e
                    );

                    tokio::time::sleep(tokio::time::Duration::from_millis(delay_ms)).await;

                    // Exponential backoff, capped at 10 seconds
                    delay_ms = (delay_ms * 2).min(10_000);
                }
            }
        }
    }
}

impl fmt::Debug for S3Backend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("S3Backend")
            .field("bucket", &self.config.bucket)
            .field("endpoint", &self.config.endpoint)
            .finish()
    }
}

#[async_trait]
impl StorageBackend for S3Backend {
    fn provider(&self) -> StorageProvider {
        StorageProvider::S3
    }

    async fn put(&self, key: &str, data: &[u8], content_type: &str) -> Result<PutReceipt> {
        validate_key(key)?;

        let client = self.client.clone();
        let bucket = self.config.bucket.clone();
        let key_owned = key.to_string();
        let content_type = content_type.to_string();
        let body = data.to_vec();

        self.with_retry(|| {
            let client = client.clone();
            let bucket = bucket.clone();
            let key = key_owned.clone();
            let content_type = content_type.clone();
            let body = body.clone();

            Box::pin(async move {
                debug!(key = %key, bytes = body.len(), "putting object to S3");

                client
                    .put_object()
                    .bucket(&bucket)
                    .key(&key)
                    .content_type(&content_type)
                    .body(ByteStream::from(body))
                    .send()
                    .await
                    .context(format!("failed to put object: {key}"))?;

                Ok(())
            })
        })
        .await?;

        Ok(PutReceipt::S3 {
            bucket: self.config.bucket.clone(),
            key: key.to_string(),
            url: self.object_url(key),
        })
    }

    async fn get(&self, key: &str) -> Result<Vec<u8>> {
        validate_key(key)?;

        let client = self.client.clone();
        let bucket = self.config.bucket.clone();
        let key_owned = key.to_string();

        self.with_retry(|| {
            let client = client.clone();
            let bucket = bucket.clone();
            let key = key_owned.clone();

            Box::pin(async move {
                let response = client
                    .get_object()
                    .bucket(&bucket)
                    .key(&key)
                    .send()
                    .await
                    .context(format!("object not found: {key}"))?;

                let data = response
                    .body
                    .collect()
                    .await
                    .context("failed to read object body")?;

                Ok(data.into_bytes().to_vec())
            })
        })
        .await
    }

    async fn exists(&self, key: &str) -> Result<bool> {
        validate_key(key)?;

        match self
            .client
            .head_object()
            .bucket(&self.config.bucket)
            .key(key)
            .send()
            .await
        {
            Ok(_) => Ok(true),
            Err(e) => {
                let service_err = e.into_service_error();
                if service_err.is_not_found() {
                    Ok(false)
                } else {
                    Err(anyhow::Error::new(service_err))
                        .context(format!("failed to check object existence: {key}"))
                }
            }
        }
    }

    async fn delete(&self, key: &str) -> Result<()> {
        validate_key(key)?;

        let client = self.client.clone();
        let bucket = self.config.bucket.clone();
        let key_owned = key.to_string();

        self.with_retry(|| {
            let client = client.clone();
            let bucket = bucket.clone();
            let key = key_owned.clone();

            Box::pin(async move {
                debug!(key = %key, "deleting object from S3");

                // DeleteObject succeeds for missing keys, so this is
                // naturally idempotent.
                client
                    .delete_object()
                    .bucket(&bucket)
                    .key(&key)
                    .send()
                    .await
                    .context(format!("failed to delete object: {key}"))?;

                Ok(())
            })
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = S3Config::default();
        assert_eq!(config.max_retries, 3);
        assert_eq!(config.initial_retry_delay_ms, 100);
        assert!(config.endpoint.is_none());
    }

    #[test]
    fn test_key_validation() {
        assert!(validate_key("media/ab/cd").is_ok());
        assert!(validate_key("").is_err());
        assert!(validate_key("/leading").is_err());
    }
}
