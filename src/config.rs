//! Configuration types for PixRecall.
//!
//! The [`Config`] struct controls behavior including:
//! - Face signature and image embedding dimensions (separate vector spaces)
//! - Identity matching threshold and the reference photo directory
//! - Search defaults, HNSW tuning, cache size and durability settings
//!
//! # Example
//! ```rust
//! use pixrecall::{Config, EmbeddingDimension, SyncMode};
//!
//! // Use defaults (512-dim faces, 512-dim images, threshold 0.5)
//! let config = Config::default();
//!
//! // Customize for production
//! let config = Config {
//!     image_dimension: EmbeddingDimension::D768,
//!     match_threshold: 0.55,
//!     sync_mode: SyncMode::Normal,
//!     ..Default::default()
//! };
//! ```

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{PixRecallError, Result, ValidationError};

/// Largest vector dimension accepted for either vector space.
pub const MAX_DIMENSION: usize = 4096;

/// Database configuration options.
///
/// All fields have sensible defaults. Use struct update syntax to override
/// specific settings:
///
/// ```rust
/// use pixrecall::Config;
///
/// let config = Config {
///     search_top_k: 25,
///     ..Default::default()
/// };
/// ```
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Dimension of face signature vectors (`D_face`).
    pub face_dimension: EmbeddingDimension,

    /// Dimension of image and text semantic embeddings (`D_image`).
    pub image_dimension: EmbeddingDimension,

    /// Directory scanned for reference photos when the store holds none.
    ///
    /// Each `.jpg`/`.jpeg`/`.png` file registers a person named after the
    /// file stem. The scan is not recursive.
    pub references_dir: PathBuf,

    /// A face matches its nearest reference only if the cosine similarity
    /// is strictly greater than this value.
    pub match_threshold: f32,

    /// Number of results returned by a search when the query sets no limit.
    pub search_top_k: usize,

    /// Maximum number of reference records loaded at startup.
    pub reference_scan_limit: usize,

    /// File extensions (lowercase, without the dot) treated as images.
    pub image_extensions: Vec<String>,

    /// Cache size in megabytes for the storage engine.
    ///
    /// Default: 64 MB
    pub cache_size_mb: usize,

    /// Durability mode for write operations.
    pub sync_mode: SyncMode,

    /// HNSW tuning for the photo index.
    pub hnsw: HnswConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            // buffalo_l normed embeddings and CLIP ViT-B/32 are both 512-d
            face_dimension: EmbeddingDimension::D512,
            image_dimension: EmbeddingDimension::D512,
            references_dir: PathBuf::from("data/faces"),
            match_threshold: 0.5,
            search_top_k: 10,
            reference_scan_limit: 2000,
            image_extensions: vec!["jpg".into(), "jpeg".into(), "png".into()],
            cache_size_mb: 64,
            sync_mode: SyncMode::Normal,
            hnsw: HnswConfig::default(),
        }
    }
}

impl Config {
    /// Creates a new Config with default settings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a Config that bootstraps references from the given directory.
    pub fn with_references_dir(dir: impl Into<PathBuf>) -> Self {
        Self {
            references_dir: dir.into(),
            ..Default::default()
        }
    }

    /// Parses a Config from JSON. Missing fields take their defaults.
    ///
    /// # Example
    /// ```rust
    /// use pixrecall::Config;
    ///
    /// let config = Config::from_json_str(r#"{ "match_threshold": 0.6 }"#).unwrap();
    /// assert_eq!(config.match_threshold, 0.6);
    /// assert_eq!(config.search_top_k, 10);
    /// ```
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: Config = serde_json::from_str(json)
            .map_err(|e| PixRecallError::config(format!("Invalid config JSON: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Reads and parses a JSON config file.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let json = std::fs::read_to_string(path.as_ref())?;
        Self::from_json_str(&json)
    }

    /// Validates the configuration.
    ///
    /// Called automatically by `PixRecall::open()`.
    ///
    /// # Errors
    /// Returns `ValidationError` if:
    /// - `cache_size_mb`, `search_top_k` or `reference_scan_limit` is 0
    /// - a dimension is 0 or > 4096
    /// - `match_threshold` is outside [-1.0, 1.0]
    /// - `image_extensions` is empty
    pub fn validate(&self) -> std::result::Result<(), ValidationError> {
        if self.cache_size_mb == 0 {
            return Err(ValidationError::invalid_field(
                "cache_size_mb",
                "must be greater than 0",
            ));
        }

        if self.search_top_k == 0 {
            return Err(ValidationError::invalid_field(
                "search_top_k",
                "must be greater than 0",
            ));
        }

        if self.reference_scan_limit == 0 {
            return Err(ValidationError::invalid_field(
                "reference_scan_limit",
                "must be greater than 0",
            ));
        }

        validate_dimension("face_dimension", self.face_dimension)?;
        validate_dimension("image_dimension", self.image_dimension)?;

        // Cosine similarity lives in [-1, 1]; anything else can never match
        // or always matches.
        if !(-1.0..=1.0).contains(&self.match_threshold) {
            return Err(ValidationError::invalid_field(
                "match_threshold",
                format!("must be between -1.0 and 1.0, got {}", self.match_threshold),
            ));
        }

        if self.image_extensions.is_empty() {
            return Err(ValidationError::required_field("image_extensions"));
        }

        if self.hnsw.ef_search == 0 || self.hnsw.max_nb_connection == 0 {
            return Err(ValidationError::invalid_field(
                "hnsw",
                "ef_search and max_nb_connection must be greater than 0",
            ));
        }

        Ok(())
    }

    /// Returns `D_face` as a numeric value.
    pub fn face_dim(&self) -> usize {
        self.face_dimension.size()
    }

    /// Returns `D_image` as a numeric value.
    pub fn image_dim(&self) -> usize {
        self.image_dimension.size()
    }

    /// Returns true if the path's extension is one of `image_extensions`
    /// (case-insensitive).
    pub fn is_image_path(&self, path: &Path) -> bool {
        path.extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| {
                self.image_extensions
                    .iter()
                    .any(|allowed| allowed.eq_ignore_ascii_case(ext))
            })
    }
}

fn validate_dimension(
    field: &str,
    dimension: EmbeddingDimension,
) -> std::result::Result<(), ValidationError> {
    if let EmbeddingDimension::Custom(dim) = dimension {
        if dim == 0 {
            return Err(ValidationError::invalid_field(
                field,
                "custom dimension must be greater than 0",
            ));
        }
        if dim > MAX_DIMENSION {
            return Err(ValidationError::invalid_field(
                field,
                format!("custom dimension must not exceed {}", MAX_DIMENSION),
            ));
        }
    }
    Ok(())
}

/// Embedding vector dimensions.
///
/// Standard dimensions are provided for common models. Use `Custom` for
/// other face or image encoders.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum EmbeddingDimension {
    /// 384 dimensions.
    D384,

    /// 512 dimensions (ArcFace signatures, CLIP ViT-B/32).
    #[default]
    D512,

    /// 768 dimensions (CLIP ViT-L/14).
    D768,

    /// Custom dimension for other models.
    ///
    /// Must be between 1 and 4096.
    Custom(usize),
}

impl EmbeddingDimension {
    /// Returns the numeric size of this dimension.
    ///
    /// # Example
    /// ```rust
    /// use pixrecall::EmbeddingDimension;
    ///
    /// assert_eq!(EmbeddingDimension::D512.size(), 512);
    /// assert_eq!(EmbeddingDimension::Custom(128).size(), 128);
    /// ```
    #[inline]
    pub const fn size(&self) -> usize {
        match self {
            Self::D384 => 384,
            Self::D512 => 512,
            Self::D768 => 768,
            Self::Custom(n) => *n,
        }
    }
}

/// Durability mode for write operations.
///
/// Controls the trade-off between write performance and crash safety.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum SyncMode {
    /// Sync to disk on transaction commit.
    #[default]
    Normal,

    /// Async sync (faster writes, may lose recent data on crash).
    ///
    /// Reasonable for large one-off folder ingests that can be re-run.
    Fast,

    /// Sync every write operation (slowest, maximum durability).
    Paranoid,
}

impl SyncMode {
    /// Returns true if this mode syncs on every write.
    pub fn is_paranoid(&self) -> bool {
        matches!(self, Self::Paranoid)
    }

    /// Returns true if this mode is async (may lose data on crash).
    pub fn is_fast(&self) -> bool {
        matches!(self, Self::Fast)
    }

    /// Maps this mode onto a redb commit durability.
    pub(crate) fn durability(&self) -> redb::Durability {
        match self {
            Self::Fast => redb::Durability::Eventual,
            // Every store write is its own transaction, so an fsync per
            // commit already syncs every write.
            Self::Normal | Self::Paranoid => redb::Durability::Immediate,
        }
    }
}

/// HNSW tuning parameters for the photo index.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HnswConfig {
    /// Maximum connections per node (M).
    pub max_nb_connection: usize,

    /// Candidate list size during construction.
    pub ef_construction: usize,

    /// Candidate list size during search.
    ///
    /// Filtered queries whose candidate set is no larger than this are
    /// scored exactly instead of traversing the graph.
    pub ef_search: usize,

    /// Maximum number of graph layers.
    pub max_layer: usize,

    /// Capacity hint for the graph.
    pub max_elements: usize,
}

impl Default for HnswConfig {
    fn default() -> Self {
        Self {
            max_nb_connection: 16,
            ef_construction: 200,
            ef_search: 100,
            max_layer: 16,
            max_elements: 100_000,
        }
    }
}
