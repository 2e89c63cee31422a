//! Storage layer abstractions for PixRecall.
//!
//! This module provides a trait-based abstraction over the storage engine,
//! allowing different backends to be used (e.g., redb, mock for testing).
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                     VectorStore                              │
//! │                         │                                    │
//! │                         ▼                                    │
//! │              ┌─────────────────────┐                        │
//! │              │   StorageEngine     │  ← Trait               │
//! │              └─────────────────────┘                        │
//! │                         ▲                                    │
//! │                         │                                    │
//! │                  ┌──────┴──────┐                             │
//! │                  │ RedbStorage │                             │
//! │                  └─────────────┘                             │
//! └─────────────────────────────────────────────────────────────┘
//! ```

pub mod redb;
pub mod schema;

pub use self::redb::RedbStorage;
pub use schema::{CollectionInfo, CollectionKind, DatabaseMetadata, Metric, SCHEMA_VERSION};

use std::path::Path;

use crate::config::Config;
use crate::error::Result;
use crate::identity::ReferenceIdentity;
use crate::photo::PhotoRecord;
use crate::types::PhotoId;

/// Storage engine trait for PixRecall.
///
/// # Thread Safety
///
/// Implementations must be `Send + Sync`. The engine handles internal
/// synchronization; callers add no locking around individual calls.
pub trait StorageEngine: Send + Sync {
    // =========================================================================
    // Lifecycle
    // =========================================================================

    /// Returns the database metadata.
    fn metadata(&self) -> &DatabaseMetadata;

    /// Closes the storage engine, flushing any pending writes.
    fn close(self: Box<Self>) -> Result<()>;

    /// Returns the path to the database file, if applicable.
    fn path(&self) -> Option<&Path>;

    // =========================================================================
    // Collections
    // =========================================================================

    /// Declares a collection if it does not exist yet.
    ///
    /// Idempotent: an existing declaration with the same dimension is
    /// returned unchanged.
    ///
    /// # Errors
    ///
    /// Returns `ValidationError::DimensionMismatch` if the collection exists
    /// with a different dimension.
    fn ensure_collection(
        &self,
        kind: CollectionKind,
        dimension: usize,
        metric: Metric,
    ) -> Result<CollectionInfo>;

    /// Returns a collection declaration, if present.
    fn get_collection(&self, kind: CollectionKind) -> Result<Option<CollectionInfo>>;

    // =========================================================================
    // Reference Faces
    // =========================================================================

    /// Appends a reference identity and its signature in one transaction.
    ///
    /// No duplicate check: the same name may be saved any number of times.
    fn save_reference(&self, reference: &ReferenceIdentity) -> Result<()>;

    /// Returns up to `limit` references with signatures, in registration order.
    fn list_references(&self, limit: usize) -> Result<Vec<ReferenceIdentity>>;

    /// Counts stored references.
    fn count_references(&self) -> Result<u64>;

    // =========================================================================
    // Photos
    // =========================================================================

    /// Saves a photo record and its embedding in one transaction.
    fn save_photo(&self, photo: &PhotoRecord) -> Result<()>;

    /// Retrieves a photo by ID, including its embedding.
    fn get_photo(&self, id: PhotoId) -> Result<Option<PhotoRecord>>;

    /// Returns every photo with its embedding.
    fn list_photos(&self) -> Result<Vec<PhotoRecord>>;

    /// Counts stored photos.
    fn count_photos(&self) -> Result<u64>;
}

/// Opens a storage engine at the given path.
///
/// # Errors
///
/// Returns an error if:
/// - The database file is corrupted or locked by another process
/// - Schema version doesn't match
/// - A configured dimension doesn't match the existing database
pub fn open_storage(path: impl AsRef<Path>, config: &Config) -> Result<Box<dyn StorageEngine>> {
    let storage = RedbStorage::open(path, config)?;
    Ok(Box::new(storage))
}
