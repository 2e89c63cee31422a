//! PixRecall main struct and lifecycle operations.
//!
//! The [`PixRecall`] struct is the application context: it is built once at
//! startup and owns the vector store, the identity index, the ingestion
//! pipeline and the query engine. Request handlers share it through `Arc`;
//! there is no global state.
//!
//! # Quick Start
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use pixrecall::{Config, HybridQuery, PixRecall};
//!
//! let provider = Arc::new(MyInferenceClient::connect()?);
//! let app = PixRecall::open("./photos.db", Config::default(), provider)?;
//!
//! app.register("Alice", Path::new("refs/alice.jpg"))?;
//! app.process_folder(Path::new("/photos/2024"))?;
//!
//! let hits = app.search(&HybridQuery::new("birthday cake").with_people(["Alice"]))?;
//!
//! app.close()?;
//! ```
//!
//! # Startup
//!
//! 1. Validate the configuration and the provider's dimensions.
//! 2. Open the vector store. Storage failures leave it unavailable instead
//!    of failing startup.
//! 3. Load reference identities from the store, or bootstrap them from
//!    `Config::references_dir` when the store has none.
//! 4. Rebuild the photo index from stored embeddings.
//!
//! # Thread Safety
//!
//! `PixRecall` is `Send + Sync`. `identify` and `search` run concurrently;
//! registrations are serialized inside the identity index.

use std::collections::BTreeSet;
use std::path::Path;
use std::sync::Arc;

use tracing::{info, instrument, warn};

use crate::config::Config;
use crate::embedding::EmbeddingProvider;
use crate::error::{PixRecallError, Result};
use crate::identity::{IdentityIndex, PersonSummary, ReferenceIdentity, RegistrationOutcome};
use crate::photo::PhotoRecord;
use crate::pipeline::{FolderReport, IngestQueue, IngestReport, IngestionPipeline};
use crate::search::{HybridQuery, HybridQueryEngine, SearchHit};
use crate::storage::DatabaseMetadata;
use crate::store::VectorStore;
use crate::types::{PhotoId, ReferenceId};

/// The PixRecall application context.
///
/// Create an instance with [`PixRecall::open()`] and close it with
/// [`PixRecall::close()`].
pub struct PixRecall {
    store: Arc<VectorStore>,
    identity: Arc<IdentityIndex>,
    pipeline: Arc<IngestionPipeline>,
    query: HybridQueryEngine,
    config: Config,
}

impl std::fmt::Debug for PixRecall {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PixRecall")
            .field("config", &self.config)
            .field("store", &self.store)
            .field("identity", &self.identity)
            .finish_non_exhaustive()
    }
}

impl PixRecall {
    /// Opens or creates a PixRecall database at the specified path.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - Configuration is invalid (see [`Config::validate`])
    /// - The provider's dimensions differ from the configured ones
    /// - A dimension differs from the one locked into an existing database
    /// - The references directory cannot be read or created
    ///
    /// A locked or corrupted database does not fail `open`; see
    /// [`is_store_available`](Self::is_store_available).
    #[instrument(skip(config, provider), fields(path = %path.as_ref().display()))]
    pub fn open(
        path: impl AsRef<Path>,
        config: Config,
        provider: Arc<dyn EmbeddingProvider>,
    ) -> Result<Self> {
        config.validate().map_err(PixRecallError::from)?;

        if provider.face_dimension() != config.face_dim()
            || provider.image_dimension() != config.image_dim()
        {
            return Err(PixRecallError::config(format!(
                "provider dimensions (face {}, image {}) do not match config (face {}, image {})",
                provider.face_dimension(),
                provider.image_dimension(),
                config.face_dim(),
                config.image_dim()
            )));
        }

        info!("Opening PixRecall");

        let store = Arc::new(VectorStore::open(&path, &config)?);
        if !store.is_available() {
            warn!(
                reason = store.unavailable_reason().unwrap_or_default(),
                "Starting without vector store"
            );
        }

        let identity = Arc::new(IdentityIndex::new(store.clone(), provider.clone(), &config));
        identity.load(store.scan_references(config.reference_scan_limit))?;

        let pipeline = Arc::new(IngestionPipeline::new(
            identity.clone(),
            store.clone(),
            provider.clone(),
            &config,
        ));
        let query = HybridQueryEngine::new(store.clone(), provider, config.search_top_k);

        info!(
            references = identity.len(),
            store_available = store.is_available(),
            face_dimension = config.face_dim(),
            image_dimension = config.image_dim(),
            sync_mode = ?config.sync_mode,
            "PixRecall opened successfully"
        );

        Ok(Self {
            store,
            identity,
            pipeline,
            query,
            config,
        })
    }

    /// Closes the database, flushing all pending writes.
    ///
    /// If an [`IngestQueue`] still holds the store, the database closes when
    /// that queue is shut down.
    #[instrument(skip(self))]
    pub fn close(self) -> Result<()> {
        info!("Closing PixRecall");

        let Self {
            store,
            identity,
            pipeline,
            query,
            ..
        } = self;
        drop(query);
        drop(pipeline);
        drop(identity);

        match Arc::try_unwrap(store) {
            Ok(store) => store.close()?,
            Err(_) => warn!("Vector store still shared, it closes when the last handle drops"),
        }

        info!("PixRecall closed successfully");
        Ok(())
    }

    /// Returns the configuration used to open this database.
    #[inline]
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Returns the database metadata, or `None` if the store is unavailable.
    #[inline]
    pub fn metadata(&self) -> Option<&DatabaseMetadata> {
        self.store.metadata()
    }

    /// Returns true if the vector store opened.
    pub fn is_store_available(&self) -> bool {
        self.store.is_available()
    }

    // =========================================================================
    // Identity
    // =========================================================================

    /// Names of the known people in `image`, without duplicates.
    pub fn identify(&self, image: &Path) -> Result<BTreeSet<String>> {
        self.identity.identify(image)
    }

    /// Registers a reference photo (exactly one face) for `name`.
    pub fn register(&self, name: &str, image: &Path) -> Result<ReferenceId> {
        self.identity.register(name, image)
    }

    /// Registers several reference photos for one person.
    pub fn register_many<P: AsRef<Path>>(&self, name: &str, images: &[P]) -> Vec<RegistrationOutcome> {
        self.identity.register_many(name, images)
    }

    /// Known people and their reference counts, sorted by name.
    pub fn known_people(&self) -> Result<Vec<PersonSummary>> {
        self.identity.known_people()
    }

    /// Number of reference signatures in memory.
    pub fn reference_count(&self) -> usize {
        self.identity.len()
    }

    /// Stored references, up to `limit`. Empty if the store is unavailable.
    pub fn scan_references(&self, limit: usize) -> Vec<ReferenceIdentity> {
        self.store.scan_references(limit)
    }

    // =========================================================================
    // Ingestion
    // =========================================================================

    /// Ingests one image.
    pub fn process_image(&self, path: &Path) -> Result<IngestReport> {
        self.pipeline.process_image(path)
    }

    /// Ingests every image under `root`.
    pub fn process_folder(&self, root: &Path) -> Result<FolderReport> {
        self.pipeline.process_folder(root)
    }

    /// Starts a background queue that ingests jobs one at a time.
    pub fn ingest_queue(&self) -> Result<IngestQueue> {
        IngestQueue::start(self.pipeline.clone())
    }

    // =========================================================================
    // Search
    // =========================================================================

    /// Runs a hybrid text + people query.
    pub fn search(&self, query: &HybridQuery) -> Result<Vec<SearchHit>> {
        self.query.search(query)
    }

    /// Runs a people-filtered query with a precomputed `D_image` vector.
    pub fn search_by_vector<S: AsRef<str>>(
        &self,
        vector: &[f32],
        people: &[S],
        top_k: Option<usize>,
    ) -> Result<Vec<SearchHit>> {
        self.query.search_by_vector(vector, people, top_k)
    }

    /// Retrieves a stored photo.
    pub fn get_photo(&self, id: PhotoId) -> Result<Option<PhotoRecord>> {
        self.store.get_photo(id)
    }

    /// Number of stored photos.
    pub fn photo_count(&self) -> Result<u64> {
        self.store.count_photos()
    }
}
