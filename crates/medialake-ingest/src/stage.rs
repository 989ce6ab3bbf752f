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

//! Upload staging
//!
//! An upload stream is written to a temporary file in the staging area
//! while the digest is computed from the same pass over the bytes. The
//! temp file is removed when the stage handle is dropped, so every exit
//! path out of the pipeline - success, failure at any stage, or the caller
//! abandoning the future - leaves the staging area clean.

use anyhow::Context;
use medialake_registry::{Digest, DigestWriter};
use std::path::Path;
use tempfile::TempPath;
use tokio::fs::File;
use tokio::io::AsyncWriteExt;
use tracing::debug;

/// A staging file being written. Dropping it removes the file.
#[derive(Debug)]
pub struct StagedFile {
    file: File,
    path: TempPath,
    hasher: DigestWriter,
}

impl StagedFile {
    /// Create a fresh staging file under `staging_dir`, creating the
    /// directory if needed.
    pub async fn create(staging_dir: &Path) -> anyhow::Result<Self> {
        tokio::fs::create_dir_all(staging_dir)
            .await
            .with_context(|| {
                format!("failed to create staging dir: {}", staging_dir.display())
            })?;

        let (file, path) = tempfile::Builder::new()
            .prefix("ingest-")
            .tempfile_in(staging_dir)
            .context("failed to create staging file")?
            .into_parts();

        debug!(path = %path.display(), "opened staging file");
        Ok(StagedFile {
            file: File::from_std(file),
            path,
            hasher: DigestWriter::new(),
        })
    }

    /// Append a chunk, feeding the digest from the same bytes.
    pub async fn write_chunk(&mut self, chunk: &[u8]) -> anyhow::Result<()> {
        self.file
            .write_all(chunk)
            .await
            .context("failed to write to staging file")?;
        self.hasher.update(chunk);
        Ok(())
    }

    /// Bytes written so far.
    pub fn bytes_written(&self) -> u64 {
        self.hasher.bytes_seen()
    }

    /// Finish writing: flush to disk and seal the digest. The file stays
    /// on disk inside the returned blob until that is dropped.
    pub async fn finish(mut self) -> anyhow::Result<StagedBlob> {
        self.file
            .flush()
            .await
            .context("failed to flush staging file")?;
        self.file
            .sync_all()
            .await
            .context("failed to sync staging file")?;

        let byte_size = self.hasher.bytes_seen();
        let digest = self.hasher.finalize();
        debug!(
            digest = %digest,
            bytes = byte_size,
            "sealed staging file"
        );

        Ok(StagedBlob {
            path: self.path,
            digest,
            byte_size,
        })
    }
}

/// A fully staged upload: sealed digest, byte count, and the file holding
/// the bytes. Dropping it removes the file.
#[derive(Debug)]
pub struct StagedBlob {
    path: TempPath,
    digest: Digest,
    byte_size: u64,
}

impl StagedBlob {
    /// Content digest of the staged bytes.
    pub fn digest(&self) -> Digest {
        self.digest
    }

    /// Size of the staged bytes.
    pub fn byte_size(&self) -> u64 {
        self.byte_size
    }

    /// Read the staged bytes back for the backend transfer.
    ///
    /// Buffers the whole file in memory, which is acceptable because the
    /// intake policy capped the staged size; a streaming backend `put`
    /// would lift that bound.
    pub async fn read(&self) -> anyhow::Result<Vec<u8>> {
        tokio::fs::read(&self.path)
            .await
            .with_context(|| format!("failed to read staging file: {}", self.path.display()))
    }
}
