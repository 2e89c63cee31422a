//! Database schema definitions and versioning.
//!
//! This module defines the table structure for the redb storage engine.
//! All table definitions are compile-time constants to ensure consistency.
//!
//! # Collections
//!
//! Reference faces and photos live in two logical collections, each with
//! its own declared vector dimension and metric. A record's kind is given
//! by the table it lives in, never by the shape of its payload.
//!
//! # Table Layout
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │ METADATA_TABLE                                               │
//! │   Key: &str            Value: bincode DatabaseMetadata       │
//! ├─────────────────────────────────────────────────────────────┤
//! │ COLLECTIONS_TABLE                                            │
//! │   Key: &str (name)     Value: bincode CollectionInfo         │
//! ├─────────────────────────────────────────────────────────────┤
//! │ REFERENCES_TABLE / REFERENCE_SIGNATURES_TABLE                │
//! │   Key: &[u8; 16]       Value: bincode record / raw f32 bytes │
//! ├─────────────────────────────────────────────────────────────┤
//! │ PHOTOS_TABLE / PHOTO_EMBEDDINGS_TABLE                        │
//! │   Key: &[u8; 16]       Value: bincode record / raw f32 bytes │
//! └─────────────────────────────────────────────────────────────┘
//! ```

use std::fmt;

use redb::TableDefinition;
use serde::{Deserialize, Serialize};

use crate::config::EmbeddingDimension;
use crate::error::StorageError;
use crate::types::Timestamp;

/// Current schema version.
///
/// Increment this when making breaking changes to the schema.
/// The database will refuse to open if versions don't match.
pub const SCHEMA_VERSION: u32 = 1;

// ============================================================================
// Table Definitions
// ============================================================================

/// Metadata table for database-level information.
pub const METADATA_TABLE: TableDefinition<&str, &[u8]> = TableDefinition::new("metadata");

/// Declared collections.
///
/// Key: collection name
/// Value: bincode-serialized [`CollectionInfo`]
pub const COLLECTIONS_TABLE: TableDefinition<&str, &[u8]> = TableDefinition::new("collections");

/// Reference identities.
///
/// Key: ReferenceId as 16-byte UUID (v7, so key order is registration order)
/// Value: bincode-serialized ReferenceIdentity (without signature)
pub const REFERENCES_TABLE: TableDefinition<&[u8; 16], &[u8]> =
    TableDefinition::new("reference_faces");

/// Reference face signatures.
///
/// Key: ReferenceId as 16-byte UUID
/// Value: raw little-endian f32 bytes (D_face * 4 bytes)
pub const REFERENCE_SIGNATURES_TABLE: TableDefinition<&[u8; 16], &[u8]> =
    TableDefinition::new("reference_signatures");

/// Photo records.
///
/// Key: PhotoId as 16-byte UUID
/// Value: bincode-serialized PhotoRecord (without embedding)
pub const PHOTOS_TABLE: TableDefinition<&[u8; 16], &[u8]> = TableDefinition::new("photos");

/// Photo semantic embeddings.
///
/// Key: PhotoId as 16-byte UUID
/// Value: raw little-endian f32 bytes (D_image * 4 bytes)
pub const PHOTO_EMBEDDINGS_TABLE: TableDefinition<&[u8; 16], &[u8]> =
    TableDefinition::new("photo_embeddings");

// ============================================================================
// Collections
// ============================================================================

/// The two logical collections.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CollectionKind {
    /// Reference face signatures (`D_face`), payload `{name}`.
    ReferenceFaces,

    /// Ingested photos (`D_image`), payload `{path, people, caption}`.
    Photos,
}

impl CollectionKind {
    /// Returns the stored collection name.
    pub const fn name(&self) -> &'static str {
        match self {
            Self::ReferenceFaces => "reference_faces",
            Self::Photos => "photos",
        }
    }
}

impl fmt::Display for CollectionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Similarity metric of a collection.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum Metric {
    /// Cosine similarity.
    #[default]
    Cosine,
}

/// A declared collection: its vector dimension and metric are fixed for
/// the life of the database.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CollectionInfo {
    /// Which collection this is.
    pub kind: CollectionKind,

    /// Vector dimension every point must have.
    pub dimension: usize,

    /// Similarity metric.
    pub metric: Metric,

    /// When the collection was first created.
    pub created_at: Timestamp,
}

impl CollectionInfo {
    /// Creates a new collection declaration.
    pub fn new(kind: CollectionKind, dimension: usize, metric: Metric) -> Self {
        Self {
            kind,
            dimension,
            metric,
            created_at: Timestamp::now(),
        }
    }
}

// ============================================================================
// Database Metadata
// ============================================================================

/// Database metadata stored in the metadata table.
///
/// This is serialized with bincode and stored under the key "db_metadata".
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct DatabaseMetadata {
    /// Schema version for compatibility checking.
    pub schema_version: u32,

    /// Face signature dimension locked at creation.
    pub face_dimension: EmbeddingDimension,

    /// Image embedding dimension locked at creation.
    pub image_dimension: EmbeddingDimension,

    /// Timestamp when the database was created.
    pub created_at: Timestamp,

    /// Last time the database was opened (updated on each open).
    pub last_opened_at: Timestamp,
}

impl DatabaseMetadata {
    /// Creates new metadata for a fresh database.
    pub fn new(face_dimension: EmbeddingDimension, image_dimension: EmbeddingDimension) -> Self {
        let now = Timestamp::now();
        Self {
            schema_version: SCHEMA_VERSION,
            face_dimension,
            image_dimension,
            created_at: now,
            last_opened_at: now,
        }
    }

    /// Updates the last_opened_at timestamp.
    pub fn touch(&mut self) {
        self.last_opened_at = Timestamp::now();
    }

    /// Checks if this metadata is compatible with the current schema.
    pub fn is_compatible(&self) -> bool {
        self.schema_version == SCHEMA_VERSION
    }
}

// ============================================================================
// Vector Encoding
// ============================================================================

/// Encodes a vector as raw little-endian f32 bytes.
pub fn encode_vector(vector: &[f32]) -> Vec<u8> {
    let mut bytes = Vec::with_capacity(vector.len() * 4);
    for value in vector {
        bytes.extend_from_slice(&value.to_le_bytes());
    }
    bytes
}

/// Decodes raw little-endian f32 bytes.
pub fn decode_vector(bytes: &[u8]) -> Result<Vec<f32>, StorageError> {
    if bytes.len() % 4 != 0 {
        return Err(StorageError::corrupted(format!(
            "Vector byte length {} is not a multiple of 4",
            bytes.len()
        )));
    }
    Ok(bytes
        .chunks_exact(4)
        .map(|chunk| f32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]))
        .collect())
}
