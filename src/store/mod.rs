//! The vector store: durable records plus similarity search.
//!
//! [`VectorStore`] sits on top of a [`StorageEngine`] and keeps two derived
//! in-memory structures for the photo collection: an HNSW graph over the
//! semantic embeddings and an inverted index from person name to photos.
//! Both are rebuilt from redb on open.
//!
//! # Availability
//!
//! If the database cannot be opened because of a storage-level failure
//! (locked, corrupted, engine error), the store starts *unavailable*:
//! [`VectorStore::scan_references`] returns nothing and every other
//! operation fails with [`PixRecallError::StoreUnavailable`]. Validation
//! failures such as a dimension mismatch still fail [`VectorStore::open`].
//!
//! # Query Strategy
//!
//! ```text
//! required people ──► inverted index ──► candidate set
//!                                            │
//!                 ┌──────────────────────────┴──────────────┐
//!                 ▼                                         ▼
//!     |candidates| <= ef_search                |candidates| > ef_search
//!     exact cosine over stored vectors         HNSW filtered traversal
//! ```

mod people;

use std::collections::BTreeSet;
use std::path::Path;
use std::sync::RwLock;

use tracing::{debug, info, instrument, warn};

use crate::config::{Config, HnswConfig};
use crate::error::{PixRecallError, Result, ValidationError};
use crate::identity::ReferenceIdentity;
use crate::photo::{NewPhoto, PhotoRecord};
use crate::search::{PeopleFilter, SearchHit};
use crate::storage::{
    open_storage, CollectionInfo, CollectionKind, DatabaseMetadata, Metric, StorageEngine,
};
use crate::types::{Embedding, PhotoId, ReferenceId};
use crate::vector::{cosine_similarity, is_zero, HnswIndex, VectorIndex};

use people::PeopleIndex;

/// Persistent store for reference faces and photos.
///
/// `VectorStore` is `Send + Sync`; individual calls need no outside locking.
pub struct VectorStore {
    /// `None` when the database could not be opened.
    storage: Option<Box<dyn StorageEngine>>,

    /// Why the store is unavailable.
    unavailable_reason: Option<String>,

    /// ANN index over non-zero photo embeddings.
    index: HnswIndex,

    /// Person name → photos.
    people: RwLock<PeopleIndex>,

    face_dimension: usize,
    image_dimension: usize,
    hnsw: HnswConfig,
}

impl std::fmt::Debug for VectorStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VectorStore")
            .field("available", &self.is_available())
            .field("indexed_photos", &self.index.len())
            .field("face_dimension", &self.face_dimension)
            .field("image_dimension", &self.image_dimension)
            .finish()
    }
}

impl VectorStore {
    /// Opens the store at `path`, declaring both collections.
    ///
    /// # Errors
    ///
    /// Returns a validation error if the configured dimensions conflict with
    /// the database. Storage failures do not error; the store comes up
    /// unavailable instead.
    #[instrument(skip(config), fields(path = %path.as_ref().display()))]
    pub fn open(path: impl AsRef<Path>, config: &Config) -> Result<Self> {
        match open_storage(path.as_ref(), config) {
            Ok(storage) => Self::with_storage(storage, config),
            Err(err) if err.is_storage() => {
                warn!(error = %err, "Vector store unavailable, continuing without it");
                Ok(Self::unavailable(config, err.to_string()))
            }
            Err(err) => Err(err),
        }
    }

    /// Wraps an opened storage engine and rebuilds the in-memory indexes.
    pub fn with_storage(storage: Box<dyn StorageEngine>, config: &Config) -> Result<Self> {
        storage.ensure_collection(CollectionKind::ReferenceFaces, config.face_dim(), Metric::Cosine)?;
        storage.ensure_collection(CollectionKind::Photos, config.image_dim(), Metric::Cosine)?;

        let photos = storage.list_photos()?;

        let mut people = PeopleIndex::default();
        let mut embeddings = Vec::with_capacity(photos.len());
        for photo in photos {
            people.insert(photo.id, &photo.people);
            if !is_zero(&photo.embedding) {
                embeddings.push((photo.id, photo.embedding));
            }
        }

        let index = HnswIndex::rebuild_from_embeddings(config.image_dim(), &config.hnsw, embeddings)?;

        info!(
            photos = people.len(),
            indexed = index.len(),
            "Vector store ready"
        );

        Ok(Self {
            storage: Some(storage),
            unavailable_reason: None,
            index,
            people: RwLock::new(people),
            face_dimension: config.face_dim(),
            image_dimension: config.image_dim(),
            hnsw: config.hnsw.clone(),
        })
    }

    /// Builds a store with no backing database.
    pub fn unavailable(config: &Config, reason: impl Into<String>) -> Self {
        Self {
            storage: None,
            unavailable_reason: Some(reason.into()),
            index: HnswIndex::new(config.image_dim(), &config.hnsw),
            people: RwLock::new(PeopleIndex::default()),
            face_dimension: config.face_dim(),
            image_dimension: config.image_dim(),
            hnsw: config.hnsw.clone(),
        }
    }

    /// Returns true if the backing database is open.
    pub fn is_available(&self) -> bool {
        self.storage.is_some()
    }

    /// Why the store is unavailable, if it is.
    pub fn unavailable_reason(&self) -> Option<&str> {
        self.unavailable_reason.as_deref()
    }

    /// Returns the database metadata, if the store is available.
    pub fn metadata(&self) -> Option<&DatabaseMetadata> {
        self.storage.as_ref().map(|s| s.metadata())
    }

    fn storage(&self) -> Result<&dyn StorageEngine> {
        self.storage.as_deref().ok_or_else(|| {
            PixRecallError::store_unavailable(
                self.unavailable_reason
                    .clone()
                    .unwrap_or_else(|| "database not open".to_string()),
            )
        })
    }

    // =========================================================================
    // Collections
    // =========================================================================

    /// Declares a collection. Idempotent for a matching dimension.
    pub fn ensure_collection(
        &self,
        kind: CollectionKind,
        dimension: usize,
        metric: Metric,
    ) -> Result<CollectionInfo> {
        self.storage()?.ensure_collection(kind, dimension, metric)
    }

    // =========================================================================
    // References
    // =========================================================================

    /// Appends a reference signature under `name`.
    ///
    /// Re-registering a name adds another independent reference.
    pub fn upsert_reference(&self, name: &str, signature: Embedding) -> Result<ReferenceId> {
        if signature.len() != self.face_dimension {
            return Err(ValidationError::dimension_mismatch(self.face_dimension, signature.len()).into());
        }

        let reference = ReferenceIdentity::new(name, signature);
        self.storage()?.save_reference(&reference)?;
        Ok(reference.id)
    }

    /// Returns up to `limit` references in registration order.
    ///
    /// Never fails: an unavailable store or a failed read yields an empty
    /// list, and the caller falls back to the references directory.
    pub fn scan_references(&self, limit: usize) -> Vec<ReferenceIdentity> {
        let storage = match self.storage() {
            Ok(storage) => storage,
            Err(err) => {
                warn!(error = %err, "Reference scan skipped");
                return Vec::new();
            }
        };

        match storage.list_references(limit) {
            Ok(references) => references,
            Err(err) => {
                warn!(error = %err, "Reference scan failed, treating as empty");
                Vec::new()
            }
        }
    }

    /// Counts stored references.
    pub fn count_references(&self) -> Result<u64> {
        self.storage()?.count_references()
    }

    // =========================================================================
    // Photos
    // =========================================================================

    /// Persists a new photo and makes it searchable.
    ///
    /// No deduplication: the same path may be stored any number of times.
    pub fn upsert_photo(&self, photo: NewPhoto) -> Result<PhotoRecord> {
        if photo.embedding.len() != self.image_dimension {
            return Err(
                ValidationError::dimension_mismatch(self.image_dimension, photo.embedding.len()).into(),
            );
        }

        let storage = self.storage()?;
        let record = photo.into_record();
        storage.save_photo(&record)?;

        self.people
            .write()
            .map_err(|_| PixRecallError::vector("People index lock poisoned"))?
            .insert(record.id, &record.people);

        if !is_zero(&record.embedding) {
            self.index.insert(record.id, &record.embedding)?;
        }

        debug!(id = %record.id, path = %record.path, "Photo indexed");
        Ok(record)
    }

    /// Retrieves a photo by ID.
    pub fn get_photo(&self, id: PhotoId) -> Result<Option<PhotoRecord>> {
        self.storage()?.get_photo(id)
    }

    /// Counts stored photos.
    pub fn count_photos(&self) -> Result<u64> {
        self.storage()?.count_photos()
    }

    /// Returns every stored photo embedding.
    pub fn photo_embeddings(&self) -> Result<Vec<(PhotoId, Embedding)>> {
        Ok(self
            .storage()?
            .list_photos()?
            .into_iter()
            .map(|photo| (photo.id, photo.embedding))
            .collect())
    }

    // =========================================================================
    // Query
    // =========================================================================

    /// Similarity search over photos containing every name in `filter`.
    ///
    /// Returns up to `top_k` hits by descending cosine similarity. An empty
    /// filter searches every photo.
    #[instrument(skip(self, vector))]
    pub fn query(&self, vector: &[f32], filter: &PeopleFilter, top_k: usize) -> Result<Vec<SearchHit>> {
        if vector.len() != self.image_dimension {
            return Err(ValidationError::dimension_mismatch(self.image_dimension, vector.len()).into());
        }
        let storage = self.storage()?;

        if top_k == 0 {
            return Ok(Vec::new());
        }

        let candidates = self
            .people
            .read()
            .map_err(|_| PixRecallError::vector("People index lock poisoned"))?
            .candidates(filter);

        if candidates.is_empty() {
            return Ok(Vec::new());
        }

        let mut hits = if candidates.len() <= self.hnsw.ef_search {
            Self::exact_scan(storage, vector, &candidates)?
        } else {
            self.ann_scan(storage, vector, filter, &candidates, top_k)?
        };

        hits.sort_by(|a, b| b.score.total_cmp(&a.score));
        hits.truncate(top_k);

        debug!(candidates = candidates.len(), hits = hits.len(), "Query complete");
        Ok(hits)
    }

    fn exact_scan(
        storage: &dyn StorageEngine,
        vector: &[f32],
        candidates: &BTreeSet<PhotoId>,
    ) -> Result<Vec<SearchHit>> {
        let mut hits = Vec::with_capacity(candidates.len());
        for id in candidates {
            if let Some(photo) = storage.get_photo(*id)? {
                let score = cosine_similarity(vector, &photo.embedding);
                hits.push(SearchHit::from_record(photo, score));
            }
        }
        Ok(hits)
    }

    fn ann_scan(
        &self,
        storage: &dyn StorageEngine,
        vector: &[f32],
        filter: &PeopleFilter,
        candidates: &BTreeSet<PhotoId>,
        top_k: usize,
    ) -> Result<Vec<SearchHit>> {
        let ef = self.hnsw.ef_search.max(top_k);
        let neighbours = if filter.is_empty() {
            self.index.search(vector, top_k, ef)?
        } else {
            let accept = |id: &PhotoId| candidates.contains(id);
            self.index.search_filtered(vector, top_k, ef, &accept)?
        };

        let mut hits = Vec::with_capacity(neighbours.len());
        for (id, distance) in neighbours {
            if let Some(photo) = storage.get_photo(id)? {
                hits.push(SearchHit::from_record(photo, 1.0 - distance));
            }
        }
        Ok(hits)
    }

    /// Closes the backing database.
    #[instrument(skip(self))]
    pub fn close(self) -> Result<()> {
        match self.storage {
            Some(storage) => storage.close(),
            None => Ok(()),
        }
    }
}
