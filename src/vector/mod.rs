//! Vector index abstractions for photo similarity search.
//!
//! This module provides a trait-based abstraction over vector indexes,
//! allowing different ANN (Approximate Nearest Neighbor) backends.
//! The primary implementation uses [`hnsw_rs`] (pure Rust).
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────┐
//! │         VectorIndex trait         │
//! └──────────┬───────────────────────┘
//!            │
//!    ┌───────┴────────┐
//!    │   HnswIndex    │  (hnsw_rs wrapper)
//!    └────────────────┘
//! ```
//!
//! Embeddings stored in redb are the **source of truth**. The HNSW index
//! is derived and rebuilt from stored embeddings every time the store opens.

mod hnsw;

pub use hnsw::HnswIndex;

use crate::error::Result;
use crate::types::PhotoId;

/// Vector index trait for approximate nearest neighbor search.
///
/// Implementations must be `Send + Sync`. Mutating methods take `&self`
/// and use interior mutability, so searches run concurrently with inserts.
pub trait VectorIndex: Send + Sync {
    /// Inserts a vector for the given photo. Re-inserting an id is a no-op.
    fn insert(&self, id: PhotoId, embedding: &[f32]) -> Result<()>;

    /// Searches for the k nearest photos to the query vector.
    ///
    /// Returns `(id, distance)` pairs sorted by cosine distance ascending
    /// (0.0 = identical, 2.0 = opposite).
    fn search(&self, query: &[f32], k: usize, ef_search: usize) -> Result<Vec<(PhotoId, f32)>>;

    /// Searches with a predicate applied during graph traversal.
    ///
    /// Only photos where `filter(id)` returns `true` are considered. This
    /// is filter-during-traversal, not post-filtering, so a selective
    /// filter still yields up to `k` results.
    fn search_filtered(
        &self,
        query: &[f32],
        k: usize,
        ef_search: usize,
        filter: &(dyn Fn(&PhotoId) -> bool + Sync),
    ) -> Result<Vec<(PhotoId, f32)>>;

    /// Returns the number of indexed vectors.
    fn len(&self) -> usize;

    /// Returns true if the index holds no vectors.
    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Cosine similarity of two vectors of equal length.
///
/// Returns 0.0 when either vector has zero norm, so placeholder vectors
/// never match anything.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    debug_assert_eq!(a.len(), b.len());

    let mut dot = 0.0f32;
    let mut norm_a = 0.0f32;
    let mut norm_b = 0.0f32;
    for (x, y) in a.iter().zip(b) {
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }

    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    dot / (norm_a.sqrt() * norm_b.sqrt())
}

/// Returns true if every component is zero.
pub fn is_zero(vector: &[f32]) -> bool {
    vector.iter().all(|v| *v == 0.0)
}

/// Scales a vector to unit length in place. Zero vectors are left alone.
pub fn normalize(vector: &mut [f32]) {
    let norm = vector.iter().map(|v| v * v).sum::<f32>().sqrt();
    if norm > 0.0 {
        vector.iter_mut().for_each(|v| *v /= norm);
    }
}
