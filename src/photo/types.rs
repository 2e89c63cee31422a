//! Type definitions for photo records.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::types::{Embedding, PhotoId, Timestamp};

/// A stored photo record.
///
/// # Serialization Note
///
/// The `embedding` field is marked `#[serde(skip)]` because embeddings are
/// stored in a separate table as raw `f32` bytes. The storage layer
/// reconstitutes the full struct by joining both tables on read.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct PhotoRecord {
    /// Unique identifier (UUID v7, time-ordered).
    pub id: PhotoId,

    /// Path of the ingested image file.
    pub path: String,

    /// Semantic embedding (`D_image`). All zeros if the embedding stage
    /// degraded.
    #[serde(skip)]
    pub embedding: Embedding,

    /// Names resolved from faces in the photo, without duplicates.
    pub people: BTreeSet<String>,

    /// Generated caption. Empty if the caption stage degraded.
    pub caption: String,

    /// When the photo was ingested.
    pub ingested_at: Timestamp,
}

impl PhotoRecord {
    /// Returns true if every name in `required` appears in `people`.
    pub fn contains_all<'a>(&self, required: impl IntoIterator<Item = &'a str>) -> bool {
        required.into_iter().all(|name| self.people.contains(name))
    }
}

/// Input for persisting a new photo.
///
/// The `id` and `ingested_at` fields are assigned by the store.
#[derive(Clone, Debug, Default)]
pub struct NewPhoto {
    /// Path of the image file.
    pub path: String,

    /// Semantic embedding (`D_image`).
    pub embedding: Embedding,

    /// Resolved people.
    pub people: BTreeSet<String>,

    /// Caption text.
    pub caption: String,
}

impl NewPhoto {
    /// Builds the stored record with a fresh id and timestamp.
    pub(crate) fn into_record(self) -> PhotoRecord {
        PhotoRecord {
            id: PhotoId::new(),
            path: self.path,
            embedding: self.embedding,
            people: self.people,
            caption: self.caption,
            ingested_at: Timestamp::now(),
        }
    }
}
