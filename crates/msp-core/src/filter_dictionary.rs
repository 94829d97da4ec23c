//! Revisioned hash to pattern-set dictionary
//!
//! Confirmation stage: after a prefix hit, the full host hash selects a
//! bucket of regex patterns to run against the URL.
//!
//! # Bucket Invariant
//!
//! A hash never maps to an empty pattern set. Removing the last pattern of a
//! bucket removes the bucket, so `get` answers `None` ("hash unknown") rather
//! than `Some(empty)` ("hash known, nothing to match").

use std::collections::hash_map::Entry;
use std::collections::{HashMap, HashSet};

use crate::dataset::IncrementallyUpdatableDataSet;
use crate::types::{DataKind, Filter};

/// Regex patterns grouped by host hash, at a given revision.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FilterDictionary {
    revision: u64,
    filters: HashMap<String, HashSet<String>>,
}

impl FilterDictionary {
    /// Group `items` by hash.
    pub fn new<I>(revision: u64, items: I) -> Self
    where
        I: IntoIterator<Item = Filter>,
    {
        let mut dict = Self {
            revision,
            filters: HashMap::new(),
        };
        dict.insert_all(items);
        dict
    }

    /// Patterns registered for `hash`, if the hash is known.
    #[inline]
    pub fn get(&self, hash: &str) -> Option<&HashSet<String>> {
        self.filters.get(hash)
    }

    pub fn contains_hash(&self, hash: &str) -> bool {
        self.filters.contains_key(hash)
    }

    /// Number of hash buckets.
    pub fn len(&self) -> usize {
        self.filters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.filters.is_empty()
    }

    /// Total number of `(hash, regex)` entries.
    pub fn pattern_count(&self) -> usize {
        self.filters.values().map(HashSet::len).sum()
    }

    /// Iterate `(hash, patterns)` buckets in arbitrary order.
    pub fn iter(&self) -> impl Iterator<Item = (&String, &HashSet<String>)> + '_ {
        self.filters.iter()
    }

    /// Flatten back to `Filter` records (advisory fields empty).
    pub fn to_filters(&self) -> Vec<Filter> {
        self.filters
            .iter()
            .flat_map(|(hash, patterns)| patterns.iter().map(move |regex| Filter::new(hash.clone(), regex.clone())))
            .collect()
    }

    fn insert_all<I>(&mut self, items: I)
    where
        I: IntoIterator<Item = Filter>,
    {
        for filter in items {
            self.filters.entry(filter.hash).or_default().insert(filter.regex);
        }
    }
}

impl IncrementallyUpdatableDataSet for FilterDictionary {
    type Element = Filter;

    const DATA_KIND: DataKind = DataKind::FilterSet;

    fn from_items<I>(revision: u64, items: I) -> Self
    where
        I: IntoIterator<Item = Filter>,
    {
        Self::new(revision, items)
    }

    fn revision(&self) -> u64 {
        self.revision
    }

    fn set_revision(&mut self, revision: u64) {
        self.revision = revision;
    }

    fn subtract<I>(&mut self, items: I)
    where
        I: IntoIterator<Item = Filter>,
    {
        for filter in items {
            if let Entry::Occupied(mut bucket) = self.filters.entry(filter.hash) {
                bucket.get_mut().remove(&filter.regex);
                if bucket.get().is_empty() {
                    bucket.remove();
                }
            }
        }
    }

    fn form_union<I>(&mut self, items: I)
    where
        I: IntoIterator<Item = Filter>,
    {
        self.insert_all(items);
    }
}
