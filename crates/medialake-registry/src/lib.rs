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

//! Media registry for MediaLake
//!
//! This crate owns the canonical data model of the deduplication pipeline:
//!
//! - [`Digest`]: SHA-256 content identity, the key duplicates are detected
//!   by
//! - [`MediaRecord`]: the single record representing one physical asset,
//!   with usage tracking (`usage_count` / `used_in`) so many logical owners
//!   share one blob
//! - [`RegistryStore`]: the persistence seam whose atomic unique-insert on
//!   `content_digest` is the pipeline's correctness guarantee against
//!   concurrent duplicate writes
//! - [`MediaRegistry`]: lifecycle operations (create, attach/detach usage,
//!   delete with asynchronous blob removal, worker write-back)
//!
//! # Core invariant
//!
//! A digest, when present, is unique across all records. The registry
//! never creates a second record for bytes it has already seen; an insert
//! that loses the race surfaces the winning record so callers attach a
//! usage to it instead.

pub mod digest;
pub mod error;
pub mod record;
pub mod registry;
pub mod store;

pub use digest::{Digest, DigestWriter};
pub use error::{RegistryError, StoreError};
pub use record::{ApprovalStatus, MediaCategory, MediaId, MediaRecord, NewMedia, OwnerRef};
pub use registry::MediaRegistry;
pub use store::{MemoryStore, ProcessingUpdate, RegistryStore};
