//! Hybrid search for PixRecall.
//!
//! A hybrid query combines a semantic vector (from free text) with a
//! conjunctive filter over the people resolved in each photo.

mod filter;
mod query;

pub use filter::PeopleFilter;
pub use query::{HybridQuery, HybridQueryEngine, SearchHit};
