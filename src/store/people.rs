//! In-memory inverted index from person name to photo ids.

use std::collections::{BTreeSet, HashMap};

use crate::search::PeopleFilter;
use crate::types::PhotoId;

/// Maps each person to the photos they appear in.
///
/// Rebuilt from the photo table on open and updated after every persisted
/// photo. Ids are kept in `BTreeSet`s so candidate sets come out in
/// ingestion order (v7 ids sort by creation time).
#[derive(Debug, Default)]
pub(crate) struct PeopleIndex {
    by_person: HashMap<String, BTreeSet<PhotoId>>,
    all: BTreeSet<PhotoId>,
}

impl PeopleIndex {
    pub(crate) fn insert<'a>(&mut self, id: PhotoId, people: impl IntoIterator<Item = &'a String>) {
        self.all.insert(id);
        for name in people {
            self.by_person.entry(name.clone()).or_default().insert(id);
        }
    }

    /// Photos containing every name in the filter. An empty filter yields
    /// every photo.
    pub(crate) fn candidates(&self, filter: &PeopleFilter) -> BTreeSet<PhotoId> {
        if filter.is_empty() {
            return self.all.clone();
        }

        let mut sets = Vec::with_capacity(filter.len());
        for name in filter.names() {
            match self.by_person.get(name) {
                Some(ids) => sets.push(ids),
                None => return BTreeSet::new(),
            }
        }

        // intersect starting from the smallest set
        sets.sort_by_key(|ids| ids.len());
        let (first, rest) = match sets.split_first() {
            Some(split) => split,
            None => return BTreeSet::new(),
        };
        first
            .iter()
            .filter(|id| rest.iter().all(|ids| ids.contains(id)))
            .copied()
            .collect()
    }

    pub(crate) fn len(&self) -> usize {
        self.all.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn names(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_candidates_intersect() {
        let mut index = PeopleIndex::default();
        let both = PhotoId::new();
        let alice_only = PhotoId::new();
        let nobody = PhotoId::new();

        index.insert(both, &names(&["Alice", "Bob"]));
        index.insert(alice_only, &names(&["Alice"]));
        index.insert(nobody, &names(&[]));

        let hits = index.candidates(&PeopleFilter::new(["Alice", "Bob"]));
        assert_eq!(hits.into_iter().collect::<Vec<_>>(), vec![both]);

        let hits = index.candidates(&PeopleFilter::new(["Alice"]));
        assert_eq!(hits.len(), 2);

        assert_eq!(index.candidates(&PeopleFilter::none()).len(), 3);
        assert_eq!(index.len(), 3);
    }

    #[test]
    fn test_unknown_person_yields_nothing() {
        let mut index = PeopleIndex::default();
        index.insert(PhotoId::new(), &names(&["Alice"]));

        assert!(index.candidates(&PeopleFilter::new(["Zed"])).is_empty());
        assert!(index.candidates(&PeopleFilter::new(["Alice", "Zed"])).is_empty());
    }
}
