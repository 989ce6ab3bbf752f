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

//! Content digest for deduplication
//!
//! A digest is the SHA-256 hash of a byte stream's contents, providing:
//! - Content identity: byte-identical inputs produce identical digests
//!   regardless of filename, declared MIME type, or upload order
//! - The registry's uniqueness key for duplicate detection
//! - The storage key layout for stored blobs

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use sha2::{Digest as _, Sha256};
use std::fmt;

/// Content digest - SHA-256 hash of a byte stream's contents
///
/// # Examples
///
/// ```
/// use medialake_registry::Digest;
///
/// let digest = Digest::hash(b"Hello, World!");
/// assert_eq!(digest.to_hex().len(), 64);
/// ```
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Digest([u8; 32]);

impl Digest {
    /// Compute the digest of an in-memory buffer.
    pub fn hash(data: &[u8]) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(data);
        let result = hasher.finalize();
        let mut bytes = [0u8; 32];
        bytes.copy_from_slice(&result);
        Digest(bytes)
    }

    /// Create a digest from raw bytes.
    pub fn from_bytes(bytes: [u8; 32]) -> Self {
        Digest(bytes)
    }

    /// Raw digest bytes.
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// Lowercase hex rendering (64 characters).
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    /// Parse a digest from its 64-character hex rendering.
    ///
    /// # Errors
    ///
    /// Fails if the string is not exactly 64 hex characters.
    pub fn from_hex(s: &str) -> anyhow::Result<Self> {
        if s.len() != 64 {
            anyhow::bail!("digest hex string must be 64 characters, got {}", s.len());
        }

        let bytes = hex::decode(s)?;
        let mut digest_bytes = [0u8; 32];
        digest_bytes.copy_from_slice(&bytes);
        Ok(Digest(digest_bytes))
    }

    /// Sharded storage-key path for this digest: `{first2hex}/{remaining62hex}`.
    ///
    /// Keeps any single storage directory from accumulating every object.
    pub fn to_key_path(&self) -> String {
        let hex = self.to_hex();
        format!("{}/{}", &hex[..2], &hex[2..])
    }
}

impl fmt::Display for Digest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}

impl fmt::Debug for Digest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Digest({})", self.to_hex())
    }
}

impl Serialize for Digest {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for Digest {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Digest::from_hex(&s).map_err(serde::de::Error::custom)
    }
}

/// Incremental digest computation for streamed inputs.
///
/// Feed chunks as they arrive; the input is never buffered in memory as a
/// whole. Used by the ingestion pipeline to tee the upload stream into the
/// hash and the staging file simultaneously.
///
/// # Examples
///
/// ```
/// use medialake_registry::{Digest, DigestWriter};
///
/// let mut writer = DigestWriter::new();
/// writer.update(b"Hello, ");
/// writer.update(b"World!");
/// assert_eq!(writer.finalize(), Digest::hash(b"Hello, World!"));
/// ```
#[derive(Debug, Default)]
pub struct DigestWriter {
    hasher: Sha256,
    bytes_seen: u64,
}

impl DigestWriter {
    /// Create a fresh writer.
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed a chunk into the digest.
    pub fn update(&mut self, chunk: &[u8]) {
        self.hasher.update(chunk);
        self.bytes_seen += chunk.len() as u64;
    }

    /// Total bytes fed so far.
    pub fn bytes_seen(&self) -> u64 {
        self.bytes_seen
    }

    /// Consume the writer and produce the digest.
    pub fn finalize(self) -> Digest {
        let result = self.hasher.finalize();
        let mut bytes = [0u8; 32];
        bytes.copy_from_slice(&result);
        Digest(bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_hash_deterministic() {
        let data = b"test content";
        assert_eq!(Digest::hash(data), Digest::hash(data));
    }

    #[test]
    fn test_hash_different_content() {
        assert_ne!(Digest::hash(b"content1"), Digest::hash(b"content2"));
    }

    #[test]
    fn test_hex_roundtrip() {
        let digest = Digest::hash(b"test");
        assert_eq!(Digest::from_hex(&digest.to_hex()).unwrap(), digest);
    }

    #[test]
    fn test_invalid_hex() {
        assert!(Digest::from_hex("too_short").is_err());
        assert!(Digest::from_hex(&"z".repeat(64)).is_err());
    }

    #[test]
    fn test_key_path_format() {
        let digest = Digest::hash(b"test");
        let path = digest.to_key_path();
        let parts: Vec<&str> = path.split('/').collect();
        assert_eq!(parts.len(), 2);
        assert_eq!(parts[0].len(), 2);
        assert_eq!(parts[1].len(), 62);
    }

    #[test]
    fn test_serde_as_hex_string() {
        let digest = Digest::hash(b"test");
        let json = serde_json::to_string(&digest).unwrap();
        assert_eq!(json, format!("\"{}\"", digest.to_hex()));

        let back: Digest = serde_json::from_str(&json).unwrap();
        assert_eq!(back, digest);
    }

    #[test]
    fn test_writer_matches_one_shot() {
        let mut writer = DigestWriter::new();
        writer.update(b"Hello, ");
        writer.update(b"World!");
        assert_eq!(writer.bytes_seen(), 13);
        assert_eq!(writer.finalize(), Digest::hash(b"Hello, World!"));
    }

    #[test]
    fn test_writer_empty_input() {
        assert_eq!(DigestWriter::new().finalize(), Digest::hash(b""));
    }

    proptest! {
        #[test]
        fn prop_chunked_hash_matches_one_shot(
            data in proptest::collection::vec(any::<u8>(), 0..8192),
            chunk_size in 1usize..512,
        ) {
            let mut writer = DigestWriter::new();
            for chunk in data.chunks(chunk_size) {
                writer.update(chunk);
            }
            prop_assert_eq!(writer.finalize(), Digest::hash(&data));
        }
    }
}
