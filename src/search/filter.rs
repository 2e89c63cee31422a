//! People filtering for photo queries.
//!
//! [`PeopleFilter`] is a conjunctive exact-match filter over a photo's
//! resolved people: a photo passes only if it contains every required name.
//! An empty filter matches every photo.

use std::collections::BTreeSet;

use crate::photo::PhotoRecord;

/// Conjunctive filter over the `people` of a photo.
///
/// Names are trimmed; blank names and duplicates are dropped.
///
/// # Example
///
/// ```rust
/// use pixrecall::PeopleFilter;
///
/// let filter = PeopleFilter::new(["Alice", " Bob ", "Alice"]);
/// assert_eq!(filter.len(), 2);
/// assert!(filter.names().any(|n| n == "Bob"));
/// ```
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct PeopleFilter {
    required: BTreeSet<String>,
}

impl PeopleFilter {
    /// Builds a filter requiring every given name.
    pub fn new<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let required = names
            .into_iter()
            .map(|name| name.as_ref().trim().to_string())
            .filter(|name| !name.is_empty())
            .collect();
        Self { required }
    }

    /// A filter that matches every photo.
    pub fn none() -> Self {
        Self::default()
    }

    /// Returns true if no names are required.
    pub fn is_empty(&self) -> bool {
        self.required.is_empty()
    }

    /// Number of distinct required names.
    pub fn len(&self) -> usize {
        self.required.len()
    }

    /// Iterates over the required names in sorted order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.required.iter().map(String::as_str)
    }

    /// Returns `true` if the photo contains every required name.
    pub fn matches(&self, photo: &PhotoRecord) -> bool {
        photo.contains_all(self.names())
    }
}
