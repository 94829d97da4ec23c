//! Revisioned hash-prefix set
//!
//! Coarse screening stage: a candidate hostname's hash prefix is tested here
//! before any pattern is consulted. Prefix format is not validated; callers
//! feed hex-encoded prefixes of a fixed length.

use std::collections::HashSet;

use crate::dataset::IncrementallyUpdatableDataSet;
use crate::types::DataKind;

/// Set of hash prefixes at a given revision.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HashPrefixSet {
    revision: u64,
    set: HashSet<String>,
}

impl HashPrefixSet {
    /// Create a set from a possibly duplicate-containing sequence.
    pub fn new<I>(revision: u64, items: I) -> Self
    where
        I: IntoIterator<Item = String>,
    {
        Self {
            revision,
            set: items.into_iter().collect(),
        }
    }

    /// Membership test.
    #[inline]
    pub fn contains(&self, prefix: &str) -> bool {
        self.set.contains(prefix)
    }

    pub fn len(&self) -> usize {
        self.set.len()
    }

    pub fn is_empty(&self) -> bool {
        self.set.is_empty()
    }

    /// Iterate prefixes in arbitrary order.
    pub fn iter(&self) -> impl Iterator<Item = &String> + '_ {
        self.set.iter()
    }

    /// Prefixes in ascending order, for deterministic output.
    pub fn sorted(&self) -> Vec<&str> {
        let mut items: Vec<&str> = self.set.iter().map(String::as_str).collect();
        items.sort_unstable();
        items
    }
}

impl IncrementallyUpdatableDataSet for HashPrefixSet {
    type Element = String;

    const DATA_KIND: DataKind = DataKind::HashPrefixSet;

    fn from_items<I>(revision: u64, items: I) -> Self
    where
        I: IntoIterator<Item = String>,
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
        I: IntoIterator<Item = String>,
    {
        for item in items {
            self.set.remove(&item);
        }
    }

    fn form_union<I>(&mut self, items: I)
    where
        I: IntoIterator<Item = String>,
    {
        self.set.extend(items);
    }
}
