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

//! Upload acceptance policy
//!
//! Size limit and MIME allow-list, checked before any bytes reach a
//! storage backend. Allow-list entries are exact types (`application/pdf`)
//! or `type/*` families (`image/*`).

use crate::error::ValidationError;
use medialake_config::IntakeConfig;

/// What the intake accepts.
#[derive(Debug, Clone)]
pub struct UploadPolicy {
    max_bytes: u64,
    allowed: Vec<String>,
}

impl UploadPolicy {
    /// Build a policy from explicit values.
    pub fn new(max_bytes: u64, allowed: Vec<String>) -> Self {
        UploadPolicy { max_bytes, allowed }
    }

    /// Build a policy from the intake section of the configuration.
    pub fn from_config(intake: &IntakeConfig) -> Self {
        UploadPolicy {
            max_bytes: intake.max_upload_bytes,
            allowed: intake.allowed_mime_types.clone(),
        }
    }

    /// The configured size limit in bytes.
    pub fn max_bytes(&self) -> u64 {
        self.max_bytes
    }

    /// Whether a MIME type is on the allow-list.
    pub fn allows(&self, mime_type: &str) -> bool {
        let mime_type = mime_type.to_ascii_lowercase();
        self.allowed.iter().any(|entry| {
            let entry = entry.to_ascii_lowercase();
            if let Some(family) = entry.strip_suffix("/*") {
                mime_type
                    .split('/')
                    .next()
                    .is_some_and(|t| t == family)
            } else {
                mime_type == entry
            }
        })
    }

    /// Resolve the effective MIME type of an upload: the declared type when
    /// present, else a guess from the file name extension, else the opaque
    /// `application/octet-stream`.
    pub fn resolve_mime(&self, declared: Option<&str>, file_name: Option<&str>) -> String {
        if let Some(declared) = declared {
            if !declared.is_empty() {
                return declared.to_ascii_lowercase();
            }
        }

        file_name
            .and_then(|name| mime_guess::from_path(name).first_raw())
            .unwrap_or("application/octet-stream")
            .to_string()
    }

    /// Check an upload's declared metadata before staging begins.
    ///
    /// `declared_size` of `None` means the client did not declare one; the
    /// limit is then enforced while streaming instead.
    pub fn check(
        &self,
        mime_type: &str,
        declared_size: Option<u64>,
    ) -> Result<(), ValidationError> {
        if !self.allows(mime_type) {
            return Err(ValidationError::DisallowedMime(mime_type.to_string()));
        }

        if let Some(size) = declared_size {
            if size > self.max_bytes {
                return Err(ValidationError::TooLarge {
                    limit: self.max_bytes,
                    actual: Some(size),
                });
            }
        }
        Ok(())
    }
}

impl Default for UploadPolicy {
    fn default() -> Self {
        Self::from_config(&IntakeConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn policy() -> UploadPolicy {
        UploadPolicy::new(
            1024,
            vec!["image/*".into(), "application/pdf".into()],
        )
    }

    #[test]
    fn test_family_wildcard() {
        let policy = policy();
        assert!(policy.allows("image/png"));
        assert!(policy.allows("IMAGE/JPEG"));
        assert!(!policy.allows("video/mp4"));
    }

    #[test]
    fn test_exact_entry() {
        let policy = policy();
        assert!(policy.allows("application/pdf"));
        assert!(!policy.allows("application/zip"));
    }

    #[test]
    fn test_wildcard_does_not_match_prefix() {
        // "imagex/png" must not slip past "image/*"
        assert!(!policy().allows("imagex/png"));
    }

    #[test]
    fn test_declared_size_checked() {
        let policy = policy();
        assert!(policy.check("image/png", Some(1024)).is_ok());
        assert!(matches!(
            policy.check("image/png", Some(1025)),
            Err(ValidationError::TooLarge {
                limit: 1024,
                actual: Some(1025),
            })
        ));
        // Undeclared size defers to streaming enforcement
        assert!(policy.check("image/png", None).is_ok());
    }

    #[test]
    fn test_resolve_mime_precedence() {
        let policy = policy();
        assert_eq!(
            policy.resolve_mime(Some("image/png"), Some("photo.jpg")),
            "image/png"
        );
        assert_eq!(
            policy.resolve_mime(None, Some("photo.jpg")),
            "image/jpeg"
        );
        assert_eq!(
            policy.resolve_mime(Some(""), Some("clip.mp4")),
            "video/mp4"
        );
        assert_eq!(
            policy.resolve_mime(None, None),
            "application/octet-stream"
        );
        assert_eq!(
            policy.resolve_mime(None, Some("README")),
            "application/octet-stream"
        );
    }

    #[test]
    fn test_default_matches_intake_defaults() {
        let policy = UploadPolicy::default();
        assert!(policy.allows("video/webm"));
        assert!(policy.allows("application/pdf"));
        assert!(!policy.allows("application/x-msdownload"));
    }
}
