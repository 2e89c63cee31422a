//! Hybrid query types and the query engine.

use std::collections::BTreeSet;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

use crate::embedding::EmbeddingProvider;
use crate::error::Result;
use crate::photo::PhotoRecord;
use crate::store::VectorStore;
use crate::types::PhotoId;

use super::PeopleFilter;

/// A search request: free text plus the people who must appear.
///
/// `people` and `text` normally come from an upstream intent parser.
///
/// # Example
///
/// ```rust
/// use pixrecall::HybridQuery;
///
/// let query = HybridQuery::new("sunset at the beach")
///     .with_people(["Alice", "Bob"])
///     .with_top_k(5);
/// assert_eq!(query.people.len(), 2);
/// ```
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HybridQuery {
    /// Names that must all appear in a photo. Empty means no filter.
    pub people: Vec<String>,

    /// Visual description embedded into the image space.
    pub text: String,

    /// Maximum results. `None` uses `Config::search_top_k`.
    pub top_k: Option<usize>,
}

impl HybridQuery {
    /// Creates an unfiltered query for the given text.
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            ..Default::default()
        }
    }

    /// Requires every given name to appear in a result.
    pub fn with_people<I, S>(mut self, people: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.people = people.into_iter().map(Into::into).collect();
        self
    }

    /// Limits the number of results.
    pub fn with_top_k(mut self, top_k: usize) -> Self {
        self.top_k = Some(top_k);
        self
    }

    /// The conjunctive people filter for this query.
    pub fn filter(&self) -> PeopleFilter {
        PeopleFilter::new(&self.people)
    }
}

/// One ranked search result.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SearchHit {
    /// Stored photo id.
    pub photo_id: PhotoId,

    /// Path of the image file.
    pub path: String,

    /// Cosine similarity to the query (higher is better).
    pub score: f32,

    /// People resolved at ingestion time.
    pub people: BTreeSet<String>,

    /// Caption generated at ingestion time.
    pub caption: String,
}

impl SearchHit {
    pub(crate) fn from_record(photo: PhotoRecord, score: f32) -> Self {
        Self {
            photo_id: photo.id,
            path: photo.path,
            score,
            people: photo.people,
            caption: photo.caption,
        }
    }
}

/// Turns hybrid queries into ranked photo lists.
///
/// Results keep the store's ordering; nothing is re-ranked.
pub struct HybridQueryEngine {
    store: Arc<VectorStore>,
    provider: Arc<dyn EmbeddingProvider>,
    default_top_k: usize,
}

impl HybridQueryEngine {
    /// Creates an engine over the given store and provider.
    pub fn new(
        store: Arc<VectorStore>,
        provider: Arc<dyn EmbeddingProvider>,
        default_top_k: usize,
    ) -> Self {
        Self {
            store,
            provider,
            default_top_k,
        }
    }

    /// Embeds `query.text` and runs the filtered similarity search.
    ///
    /// # Errors
    ///
    /// Provider failures are returned as-is, never degraded. A vector of the
    /// wrong dimension is a validation error, and an unavailable store
    /// returns [`PixRecallError::StoreUnavailable`](crate::PixRecallError::StoreUnavailable).
    #[instrument(skip(self), fields(people = query.people.len()))]
    pub fn search(&self, query: &HybridQuery) -> Result<Vec<SearchHit>> {
        let vector = self.provider.embed_text(&query.text)?;

        let hits = self.search_by_vector(&vector, &query.people, query.top_k)?;
        debug!(hits = hits.len(), "Hybrid search complete");
        Ok(hits)
    }

    /// Runs the filtered similarity search with a precomputed vector.
    pub fn search_by_vector<S: AsRef<str>>(
        &self,
        vector: &[f32],
        people: &[S],
        top_k: Option<usize>,
    ) -> Result<Vec<SearchHit>> {
        let filter = PeopleFilter::new(people);
        self.store
            .query(vector, &filter, top_k.unwrap_or(self.default_top_k))
    }
}
