//! # PixRecall
//!
//! Embedded photo index with face identity matching and hybrid semantic search.
//!
//! PixRecall ingests images, recognizes registered people in them, stores a
//! semantic embedding and caption per photo, and answers queries such as
//! "Alice and Bob at the beach" by combining an exact people filter with
//! vector similarity.
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use std::path::Path;
//! use std::sync::Arc;
//! use pixrecall::{Config, HybridQuery, PixRecall};
//!
//! // The models live behind an EmbeddingProvider implemented by the host
//! let provider = Arc::new(MyInferenceClient::connect()?);
//! let app = PixRecall::open("./photos.db", Config::default(), provider)?;
//!
//! // Register a reference face
//! app.register("Alice", Path::new("refs/alice.jpg"))?;
//!
//! // Ingest a folder
//! let report = app.process_folder(Path::new("/photos/2024"))?;
//!
//! // Hybrid search
//! let hits = app.search(&HybridQuery::new("beach").with_people(["Alice"]))?;
//!
//! app.close()?;
//! ```
//!
//! ## Key Concepts
//!
//! ### Identity Index
//!
//! The in-memory list of reference face signatures, one entry per registered
//! reference photo. A face in a new photo is attributed to the name of its
//! single nearest reference, and only when the cosine similarity is strictly
//! above [`Config::match_threshold`].
//!
//! ### Vector Store
//!
//! Two collections with fixed dimensions: reference faces (`D_face`) and
//! photos (`D_image`). Records are durable in an embedded redb file; photo
//! embeddings are also kept in an HNSW index for approximate search.
//!
//! ### Ingestion Pipeline
//!
//! Each image passes through identify, embed and caption stages. A failing
//! stage degrades to an empty default and the photo is still stored.
//!
//! ### Hybrid Query
//!
//! A text query is embedded into the image space and matched against photos
//! whose people include every requested name.
//!
//! ## Thread Safety
//!
//! [`PixRecall`] is `Send + Sync` and can be shared across threads using `Arc`.
//! The database uses MVCC for concurrent reads with exclusive write locking.

#![warn(missing_docs)]
#![warn(rustdoc::missing_crate_level_docs)]
#![deny(unsafe_op_in_unsafe_fn)]

// ============================================================================
// Module declarations
// ============================================================================

mod config;
mod db;
mod error;
mod types;

pub mod embedding;
pub mod storage;

// Domain modules
pub mod identity;
pub mod photo;
pub mod pipeline;
pub mod search;
pub mod store;

/// Vector index module for HNSW-based approximate nearest neighbor search.
pub mod vector;

// ============================================================================
// Public API re-exports
// ============================================================================

// Main application context
pub use db::PixRecall;

// Configuration
pub use config::{Config, EmbeddingDimension, HnswConfig, SyncMode};

// Error handling
pub use error::{
    IdentityError, NotFoundError, PixRecallError, Result, StorageError, ValidationError,
};

// Core types
pub use types::{Embedding, PhotoId, ReferenceId, Timestamp};

// Domain types
pub use embedding::{BoundingBox, DetectedFace, EmbeddingProvider};
pub use identity::{IdentityIndex, PersonSummary, ReferenceIdentity, RegistrationOutcome};
pub use photo::{NewPhoto, PhotoRecord};
pub use pipeline::{
    DegradedStage, FolderReport, IngestQueue, IngestReport, IngestionPipeline, QueueStats, Stage,
};
pub use store::VectorStore;

// Search
pub use search::{HybridQuery, HybridQueryEngine, PeopleFilter, SearchHit};

// Storage (for advanced users)
pub use storage::DatabaseMetadata;

// ============================================================================
// Prelude module for convenient imports
// ============================================================================

/// Convenient imports for common PixRecall usage.
///
/// ```rust
/// use pixrecall::prelude::*;
/// ```
pub mod prelude {
    pub use crate::config::{Config, EmbeddingDimension, SyncMode};
    pub use crate::db::PixRecall;
    pub use crate::embedding::{DetectedFace, EmbeddingProvider};
    pub use crate::error::{PixRecallError, Result};
    pub use crate::photo::PhotoRecord;
    pub use crate::pipeline::IngestReport;
    pub use crate::search::{HybridQuery, PeopleFilter, SearchHit};
    pub use crate::types::{Embedding, PhotoId, Timestamp};
}
