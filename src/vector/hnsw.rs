//! HNSW vector index implementation using hnsw_rs.
//!
//! Wraps `hnsw_rs::Hnsw<f32, DistCosine>` with a bidirectional
//! `PhotoId` ↔ `usize` ID mapping.
//!
//! # Thread Safety
//!
//! The `hnsw_rs::Hnsw` graph uses `parking_lot::RwLock` internally,
//! so `insert()` takes `&self`. Our mapping (`IndexState`) is
//! protected by `std::sync::RwLock`.

use std::collections::HashMap;
use std::sync::RwLock;

use hnsw_rs::prelude::*;

use crate::config::HnswConfig;
use crate::error::{PixRecallError, Result};
use crate::types::PhotoId;

use super::VectorIndex;

/// Bridges a `PhotoId` predicate to hnsw_rs's `FilterT`, which sees only
/// internal `usize` ids.
struct FilterBridge<'a> {
    internal_to_id: &'a [PhotoId],
    accept: &'a (dyn Fn(&PhotoId) -> bool + Sync),
}

impl FilterT for FilterBridge<'_> {
    fn hnsw_filter(&self, id: &DataId) -> bool {
        self.internal_to_id
            .get(*id)
            .is_some_and(|photo_id| (self.accept)(photo_id))
    }
}

/// HNSW vector index backed by `hnsw_rs`.
///
/// The graph is never persisted. The store rebuilds it from the embeddings
/// table on open.
pub struct HnswIndex {
    /// The underlying HNSW graph. Uses `'static` lifetime because
    /// all data is heap-owned (not memory-mapped).
    hnsw: Hnsw<'static, f32, DistCosine>,

    /// Mutable id mapping protected by RwLock.
    state: RwLock<IndexState>,

    /// Embedding dimension (must match all inserted vectors).
    dimension: usize,
}

/// Internal mutable state for ID mapping.
#[derive(Debug, Default)]
struct IndexState {
    /// Forward map: PhotoId → internal usize ID.
    id_to_internal: HashMap<PhotoId, usize>,

    /// Reverse map: internal usize ID → PhotoId.
    internal_to_id: Vec<PhotoId>,
}

impl IndexState {
    /// Records a new id and returns its internal id, or `None` if present.
    fn assign(&mut self, id: PhotoId) -> Option<usize> {
        if self.id_to_internal.contains_key(&id) {
            return None;
        }
        let internal_id = self.internal_to_id.len();
        self.id_to_internal.insert(id, internal_id);
        self.internal_to_id.push(id);
        Some(internal_id)
    }
}

impl HnswIndex {
    /// Creates a new empty HNSW index.
    ///
    /// # Arguments
    ///
    /// * `dimension` - Expected embedding dimension (validated on insert)
    /// * `config` - HNSW tuning parameters
    pub fn new(dimension: usize, config: &HnswConfig) -> Self {
        let hnsw = Hnsw::new(
            config.max_nb_connection,
            config.max_elements,
            config.max_layer,
            config.ef_construction,
            DistCosine,
        );

        Self {
            hnsw,
            state: RwLock::new(IndexState::default()),
            dimension,
        }
    }

    /// Rebuilds an index from stored embeddings.
    ///
    /// Used when the store opens to reconstruct the graph from redb.
    pub fn rebuild_from_embeddings(
        dimension: usize,
        config: &HnswConfig,
        embeddings: Vec<(PhotoId, Vec<f32>)>,
    ) -> Result<Self> {
        let index = Self::new(dimension, config);

        if embeddings.is_empty() {
            return Ok(index);
        }

        let mut state = index
            .state
            .write()
            .map_err(|_| PixRecallError::vector("Index state lock poisoned"))?;

        let mut batch: Vec<(&Vec<f32>, usize)> = Vec::with_capacity(embeddings.len());
        for (id, embedding) in &embeddings {
            index.check_dimension(embedding)?;
            if let Some(internal_id) = state.assign(*id) {
                batch.push((embedding, internal_id));
            }
        }

        drop(state);

        // Parallel bulk insert (uses rayon internally)
        index.hnsw.parallel_insert(&batch);

        Ok(index)
    }

    /// Returns true if the given photo is in the index.
    pub fn contains(&self, id: PhotoId) -> bool {
        self.state
            .read()
            .ok()
            .is_some_and(|s| s.id_to_internal.contains_key(&id))
    }

    /// Returns the embedding dimension of this index.
    pub fn dimension(&self) -> usize {
        self.dimension
    }

    fn check_dimension(&self, vector: &[f32]) -> Result<()> {
        if vector.len() != self.dimension {
            return Err(PixRecallError::vector(format!(
                "Embedding dimension mismatch: expected {}, got {}",
                self.dimension,
                vector.len()
            )));
        }
        Ok(())
    }

    fn map_results(state: &IndexState, results: Vec<Neighbour>) -> Vec<(PhotoId, f32)> {
        results
            .into_iter()
            .filter_map(|n| {
                state
                    .internal_to_id
                    .get(n.d_id)
                    .map(|&id| (id, n.distance))
            })
            .collect()
    }
}

// ==========================================================================
// VectorIndex trait implementation
// ==========================================================================

impl VectorIndex for HnswIndex {
    fn insert(&self, id: PhotoId, embedding: &[f32]) -> Result<()> {
        self.check_dimension(embedding)?;

        let mut state = self
            .state
            .write()
            .map_err(|_| PixRecallError::vector("Index state lock poisoned"))?;

        let Some(internal_id) = state.assign(id) else {
            return Ok(());
        };

        // hnsw insert acquires its own lock
        drop(state);

        self.hnsw.insert((embedding, internal_id));
        Ok(())
    }

    fn search(&self, query: &[f32], k: usize, ef_search: usize) -> Result<Vec<(PhotoId, f32)>> {
        self.check_dimension(query)?;

        let state = self
            .state
            .read()
            .map_err(|_| PixRecallError::vector("Index state lock poisoned"))?;

        if state.internal_to_id.is_empty() {
            return Ok(Vec::new());
        }

        let results = self.hnsw.search(query, k, ef_search);
        Ok(Self::map_results(&state, results))
    }

    fn search_filtered(
        &self,
        query: &[f32],
        k: usize,
        ef_search: usize,
        filter: &(dyn Fn(&PhotoId) -> bool + Sync),
    ) -> Result<Vec<(PhotoId, f32)>> {
        self.check_dimension(query)?;

        let state = self
            .state
            .read()
            .map_err(|_| PixRecallError::vector("Index state lock poisoned"))?;

        if state.internal_to_id.is_empty() {
            return Ok(Vec::new());
        }

        let bridge = FilterBridge {
            internal_to_id: &state.internal_to_id,
            accept: filter,
        };
        let results = self.hnsw.search_filter(query, k, ef_search, Some(&bridge));
        Ok(Self::map_results(&state, results))
    }

    fn len(&self) -> usize {
        self.state
            .read()
            .map_or(0, |s| s.internal_to_id.len())
    }
}

// ==========================================================================
// Tests
// ==========================================================================
