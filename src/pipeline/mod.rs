//! Ingestion pipeline: one image in, one searchable photo record out.
//!
//! [`IngestionPipeline::process_image`] runs four steps in a fixed order:
//!
//! ```text
//! identify people ──► embed image ──► caption ──► persist
//!   (degrades to {})   (zero vector)    (degrades to "")  (fails the image)
//! ```
//!
//! The first three stages never abort the image. A failing stage is
//! recorded as a [`StageOutcome::Degraded`] with its fallback value, and the
//! record is still persisted: a photo with no caption is more useful than a
//! photo that was never indexed. Only a missing file (before stage 1) or a
//! failed write is an error.
//!
//! [`IngestionPipeline::process_folder`] walks a directory tree and ingests
//! every image in file-name order. There is no deduplication: running it
//! twice over the same folder stores every photo twice.

mod queue;
mod stage;

pub use queue::{IngestQueue, QueueStats};
pub use stage::{DegradedStage, Stage, StageOutcome};

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument, warn};
use walkdir::WalkDir;

use crate::config::Config;
use crate::embedding::EmbeddingProvider;
use crate::error::{NotFoundError, Result};
use crate::identity::IdentityIndex;
use crate::photo::NewPhoto;
use crate::store::VectorStore;
use crate::types::{Embedding, PhotoId};

/// What happened to one ingested image.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct IngestReport {
    /// Id of the stored record.
    pub photo_id: PhotoId,

    /// The ingested file.
    pub path: PathBuf,

    /// People resolved in the photo.
    pub people: BTreeSet<String>,

    /// Stored caption.
    pub caption: String,

    /// Stages that fell back to their default.
    pub degraded: Vec<DegradedStage>,
}

impl IngestReport {
    /// Returns true if every stage completed.
    pub fn is_complete(&self) -> bool {
        self.degraded.is_empty()
    }
}

/// Counts from a folder ingest.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FolderReport {
    /// Image files attempted.
    pub processed: usize,
    /// Images persisted.
    pub succeeded: usize,
    /// Images that could not be persisted.
    pub failed: usize,
}

/// Turns image files into stored photo records.
pub struct IngestionPipeline {
    identity: Arc<IdentityIndex>,
    store: Arc<VectorStore>,
    provider: Arc<dyn EmbeddingProvider>,
    config: Config,
}

impl IngestionPipeline {
    /// Creates a pipeline over the shared identity index and store.
    pub fn new(
        identity: Arc<IdentityIndex>,
        store: Arc<VectorStore>,
        provider: Arc<dyn EmbeddingProvider>,
        config: &Config,
    ) -> Self {
        Self {
            identity,
            store,
            provider,
            config: config.clone(),
        }
    }

    /// Ingests one image.
    ///
    /// # Errors
    ///
    /// - `NotFound` if `path` is missing or not a regular file
    /// - store errors (including `StoreUnavailable`) if the record cannot
    ///   be persisted
    ///
    /// Stage failures are not errors; they appear in
    /// [`IngestReport::degraded`].
    #[instrument(skip(self), fields(path = %path.display()))]
    pub fn process_image(&self, path: &Path) -> Result<IngestReport> {
        if !path.is_file() {
            return Err(NotFoundError::image(path).into());
        }

        let people = StageOutcome::from_result(self.identity.identify(path), BTreeSet::new);
        let embedding = StageOutcome::from_result(self.embed(path), || {
            vec![0.0; self.config.image_dim()]
        });
        let caption = StageOutcome::from_result(self.provider.caption(path), String::new);

        let mut degraded = Vec::new();
        let (people, d) = people.into_parts(Stage::Identify);
        degraded.extend(d);
        let (embedding, d) = embedding.into_parts(Stage::Embed);
        degraded.extend(d);
        let (caption, d) = caption.into_parts(Stage::Caption);
        degraded.extend(d);

        for stage in &degraded {
            warn!(stage = %stage.stage, reason = %stage.reason, "Stage degraded");
        }

        let record = self.store.upsert_photo(NewPhoto {
            path: path.to_string_lossy().into_owned(),
            embedding,
            people,
            caption,
        })?;

        debug!(
            id = %record.id,
            people = record.people.len(),
            degraded = degraded.len(),
            "Image ingested"
        );

        Ok(IngestReport {
            photo_id: record.id,
            path: path.to_path_buf(),
            people: record.people,
            caption: record.caption,
            degraded,
        })
    }

    fn embed(&self, path: &Path) -> Result<Embedding> {
        let embedding = self.provider.embed_image(path)?;
        self.provider.validate_embedding(&embedding)?;
        Ok(embedding)
    }

    /// Ingests every image under `root`, recursively, one at a time.
    ///
    /// Files are visited in file-name order. Unreadable directory entries
    /// are skipped.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` if `root` is not a directory. Per-image failures
    /// are counted, not returned.
    #[instrument(skip(self), fields(root = %root.display()))]
    pub fn process_folder(&self, root: &Path) -> Result<FolderReport> {
        if !root.is_dir() {
            return Err(NotFoundError::folder(root).into());
        }

        let images = self.collect_images(root);
        info!(images = images.len(), "Folder scan complete");

        let mut report = FolderReport::default();
        for image in images {
            report.processed += 1;
            match self.process_image(&image) {
                Ok(_) => report.succeeded += 1,
                Err(err) => {
                    warn!(path = %image.display(), error = %err, "Image ingest failed");
                    report.failed += 1;
                }
            }
        }

        info!(
            processed = report.processed,
            succeeded = report.succeeded,
            failed = report.failed,
            "Folder ingest complete"
        );
        Ok(report)
    }

    fn collect_images(&self, root: &Path) -> Vec<PathBuf> {
        WalkDir::new(root)
            .sort_by_file_name()
            .into_iter()
            .filter_map(|entry| match entry {
                Ok(entry) => Some(entry),
                Err(err) => {
                    warn!(error = %err, "Skipping unreadable entry");
                    None
                }
            })
            .filter(|entry| entry.file_type().is_file() && self.config.is_image_path(entry.path()))
            .map(|entry| entry.into_path())
            .collect()
    }
}
