//! Error types for PixRecall.
//!
//! PixRecall uses a hierarchical error system:
//! - `PixRecallError` is the top-level error returned by all public APIs
//! - Specific error types (`StorageError`, `ValidationError`, `IdentityError`)
//!   provide detail
//!
//! # Error Handling Pattern
//! ```rust,ignore
//! use pixrecall::{PixRecall, Config, Result};
//!
//! fn example(provider: Arc<dyn EmbeddingProvider>) -> Result<()> {
//!     let app = PixRecall::open("./photos.db", Config::default(), provider)?;
//!     // ... operations that may fail ...
//!     app.close()?;
//!     Ok(())
//! }
//! ```
//!
//! # Propagation Policy
//!
//! - Identity registration errors ([`IdentityError`]) are surfaced verbatim;
//!   the caller decides whether to retry with another photo.
//! - Pipeline stage failures never escape `process_image`; they are recorded
//!   as degraded stages on the ingest report.
//! - A store that could not be opened yields [`PixRecallError::StoreUnavailable`]
//!   for every steady-state operation. Nothing here retries automatically.

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for PixRecall operations.
pub type Result<T> = std::result::Result<T, PixRecallError>;

/// Top-level error enum for all PixRecall operations.
///
/// This is the only error type returned by public APIs.
/// Use pattern matching to handle specific error cases.
#[derive(Debug, Error)]
pub enum PixRecallError {
    /// Storage layer error (I/O, corruption, transactions).
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    /// Input validation error.
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    /// Face identity error (registration or image decoding).
    #[error("Identity error: {0}")]
    Identity(#[from] IdentityError),

    /// Configuration error.
    #[error("Configuration error: {reason}")]
    Config {
        /// Description of what's wrong with the configuration.
        reason: String,
    },

    /// Requested entity not found.
    #[error("{0}")]
    NotFound(#[from] NotFoundError),

    /// General I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Embedding provider failure (detection, embedding or captioning).
    #[error("Embedding error: {0}")]
    Embedding(String),

    /// Vector index error (HNSW operations).
    #[error("Vector index error: {0}")]
    Vector(String),

    /// The vector store could not be opened or reached.
    #[error("Vector store unavailable: {0}")]
    StoreUnavailable(String),

    /// A pipeline stage fell back to its default value.
    #[error("Stage '{stage}' degraded: {reason}")]
    StageDegraded {
        /// Name of the pipeline stage.
        stage: String,
        /// Why the stage fell back.
        reason: String,
    },
}

impl PixRecallError {
    /// Creates a configuration error with the given reason.
    pub fn config(reason: impl Into<String>) -> Self {
        Self::Config {
            reason: reason.into(),
        }
    }

    /// Creates an embedding error with the given message.
    pub fn embedding(msg: impl Into<String>) -> Self {
        Self::Embedding(msg.into())
    }

    /// Creates a vector index error with the given message.
    pub fn vector(msg: impl Into<String>) -> Self {
        Self::Vector(msg.into())
    }

    /// Creates a store unavailable error with the given message.
    pub fn store_unavailable(msg: impl Into<String>) -> Self {
        Self::StoreUnavailable(msg.into())
    }

    /// Creates a stage degraded error.
    pub fn stage_degraded(stage: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::StageDegraded {
            stage: stage.into(),
            reason: reason.into(),
        }
    }

    /// Returns true if this is a "not found" error.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }

    /// Returns true if this is a validation error.
    pub fn is_validation(&self) -> bool {
        matches!(self, Self::Validation(_))
    }

    /// Returns true if this is a storage error.
    pub fn is_storage(&self) -> bool {
        matches!(self, Self::Storage(_))
    }

    /// Returns true if this is a vector index error.
    pub fn is_vector(&self) -> bool {
        matches!(self, Self::Vector(_))
    }

    /// Returns true if this is an identity error.
    pub fn is_identity(&self) -> bool {
        matches!(self, Self::Identity(_))
    }

    /// Returns true if the vector store is unavailable.
    pub fn is_store_unavailable(&self) -> bool {
        matches!(self, Self::StoreUnavailable(_))
    }

    /// Returns true if zero faces were found where exactly one was expected.
    pub fn is_no_face_detected(&self) -> bool {
        matches!(self, Self::Identity(IdentityError::NoFaceDetected))
    }

    /// Returns true if several faces were found where exactly one was expected.
    pub fn is_ambiguous_reference(&self) -> bool {
        matches!(self, Self::Identity(IdentityError::AmbiguousReference { .. }))
    }
}

/// Face identity errors.
///
/// Raised by reference registration, which requires exactly one face.
#[derive(Debug, Error)]
pub enum IdentityError {
    /// Zero faces detected where exactly one was expected.
    #[error("No face detected in image")]
    NoFaceDetected,

    /// More than one face detected where exactly one was expected.
    #[error("Ambiguous reference: {faces} faces detected, expected exactly one")]
    AmbiguousReference {
        /// Number of faces found in the image.
        faces: usize,
    },

    /// The file exists but cannot be decoded as an image.
    #[error("Unreadable image: {}", .0.display())]
    UnreadableImage(PathBuf),
}

impl IdentityError {
    /// Creates an unreadable image error for the given path.
    pub fn unreadable(path: impl Into<PathBuf>) -> Self {
        Self::UnreadableImage(path.into())
    }
}

/// Storage-related errors.
///
/// These errors indicate problems with the underlying storage layer.
#[derive(Debug, Error)]
pub enum StorageError {
    /// Database file or data is corrupted.
    #[error("Database corrupted: {0}")]
    Corrupted(String),

    /// Database is locked by another process.
    #[error("Database is locked by another writer")]
    DatabaseLocked,

    /// Transaction failed (commit, rollback, etc.).
    #[error("Transaction failed: {0}")]
    Transaction(String),

    /// Serialization/deserialization error.
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Error from the redb storage engine.
    #[error("Storage engine error: {0}")]
    Redb(String),

    /// Database schema version doesn't match expected version.
    #[error("Schema version mismatch: expected {expected}, found {found}")]
    SchemaVersionMismatch {
        /// Expected schema version.
        expected: u32,
        /// Actual schema version found in database.
        found: u32,
    },
}

impl StorageError {
    /// Creates a corruption error with the given message.
    pub fn corrupted(msg: impl Into<String>) -> Self {
        Self::Corrupted(msg.into())
    }

    /// Creates a transaction error with the given message.
    pub fn transaction(msg: impl Into<String>) -> Self {
        Self::Transaction(msg.into())
    }

    /// Creates a serialization error with the given message.
    pub fn serialization(msg: impl Into<String>) -> Self {
        Self::Serialization(msg.into())
    }

    /// Creates a redb error with the given message.
    pub fn redb(msg: impl Into<String>) -> Self {
        Self::Redb(msg.into())
    }
}

// Conversions from redb error types
impl From<redb::Error> for StorageError {
    fn from(err: redb::Error) -> Self {
        StorageError::Redb(err.to_string())
    }
}

impl From<redb::DatabaseError> for StorageError {
    fn from(err: redb::DatabaseError) -> Self {
        StorageError::Redb(err.to_string())
    }
}

impl From<redb::TransactionError> for StorageError {
    fn from(err: redb::TransactionError) -> Self {
        StorageError::Transaction(err.to_string())
    }
}

impl From<redb::CommitError> for StorageError {
    fn from(err: redb::CommitError) -> Self {
        StorageError::Transaction(format!("Commit failed: {}", err))
    }
}

impl From<redb::TableError> for StorageError {
    fn from(err: redb::TableError) -> Self {
        StorageError::Redb(format!("Table error: {}", err))
    }
}

impl From<redb::StorageError> for StorageError {
    fn from(err: redb::StorageError) -> Self {
        StorageError::Redb(format!("Storage error: {}", err))
    }
}

impl From<bincode::Error> for StorageError {
    fn from(err: bincode::Error) -> Self {
        StorageError::Serialization(err.to_string())
    }
}

impl From<redb::Error> for PixRecallError {
    fn from(err: redb::Error) -> Self {
        PixRecallError::Storage(StorageError::from(err))
    }
}

impl From<redb::DatabaseError> for PixRecallError {
    fn from(err: redb::DatabaseError) -> Self {
        PixRecallError::Storage(StorageError::from(err))
    }
}

impl From<redb::TransactionError> for PixRecallError {
    fn from(err: redb::TransactionError) -> Self {
        PixRecallError::Storage(StorageError::from(err))
    }
}

impl From<redb::CommitError> for PixRecallError {
    fn from(err: redb::CommitError) -> Self {
        PixRecallError::Storage(StorageError::from(err))
    }
}

impl From<redb::TableError> for PixRecallError {
    fn from(err: redb::TableError) -> Self {
        PixRecallError::Storage(StorageError::from(err))
    }
}

impl From<redb::StorageError> for PixRecallError {
    fn from(err: redb::StorageError) -> Self {
        PixRecallError::Storage(StorageError::from(err))
    }
}

impl From<bincode::Error> for PixRecallError {
    fn from(err: bincode::Error) -> Self {
        PixRecallError::Storage(StorageError::from(err))
    }
}

/// Validation errors for input data.
///
/// These errors indicate problems with data provided by the caller.
#[derive(Debug, Error)]
pub enum ValidationError {
    /// Vector dimension doesn't match the collection's declared dimension.
    #[error("Embedding dimension mismatch: expected {expected}, got {got}")]
    DimensionMismatch {
        /// Expected dimension from collection configuration.
        expected: usize,
        /// Actual dimension provided.
        got: usize,
    },

    /// A field has an invalid value.
    #[error("Invalid field '{field}': {reason}")]
    InvalidField {
        /// Name of the invalid field.
        field: String,
        /// Why the value is invalid.
        reason: String,
    },

    /// A required field is missing or empty.
    #[error("Required field missing: {field}")]
    RequiredField {
        /// Name of the missing field.
        field: String,
    },
}

impl ValidationError {
    /// Creates a dimension mismatch error.
    pub fn dimension_mismatch(expected: usize, got: usize) -> Self {
        Self::DimensionMismatch { expected, got }
    }

    /// Creates an invalid field error.
    pub fn invalid_field(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidField {
            field: field.into(),
            reason: reason.into(),
        }
    }

    /// Creates a required field error.
    pub fn required_field(field: impl Into<String>) -> Self {
        Self::RequiredField {
            field: field.into(),
        }
    }
}

/// Not found errors for specific entity types.
#[derive(Debug, Error)]
pub enum NotFoundError {
    /// Photo with given ID not found.
    #[error("Photo not found: {0}")]
    Photo(String),

    /// Directory to ingest or scan not found.
    #[error("Folder not found: {0}")]
    Folder(String),

    /// Image file not found.
    #[error("Image not found: {0}")]
    Image(String),
}

impl NotFoundError {
    /// Creates a photo not found error.
    pub fn photo(id: impl ToString) -> Self {
        Self::Photo(id.to_string())
    }

    /// Creates a folder not found error.
    pub fn folder(path: &std::path::Path) -> Self {
        Self::Folder(path.display().to_string())
    }

    /// Creates an image not found error.
    pub fn image(path: &std::path::Path) -> Self {
        Self::Image(path.display().to_string())
    }
}
