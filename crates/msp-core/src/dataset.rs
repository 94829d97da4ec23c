//! Incremental update algorithm
//!
//! Both dataset shapes implement `IncrementallyUpdatableDataSet`, so the
//! reconciliation of a change set against local state is written once, in
//! the trait's default `apply`.
//!
//! None of this is internally synchronised. The owner (see `store`) applies
//! change sets to a private copy and swaps it in, so readers never see a
//! half-applied update.

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::change_set::{AnyChangeSet, ChangeSetResponse};
use crate::embedded;
use crate::filter_dictionary::FilterDictionary;
use crate::hash_prefix_set::HashPrefixSet;
use crate::persist::DecodeError;
use crate::types::DataKind;

// =============================================================================
// Traits
// =============================================================================

/// A revisioned collection that can be evolved by change sets.
pub trait IncrementallyUpdatableDataSet: Sized {
    /// Element carried by change sets for this dataset.
    type Element;

    /// Data kind this dataset stores.
    const DATA_KIND: DataKind;

    /// Build a dataset from a revision and an arbitrary element sequence.
    fn from_items<I>(revision: u64, items: I) -> Self
    where
        I: IntoIterator<Item = Self::Element>;

    fn revision(&self) -> u64;

    fn set_revision(&mut self, revision: u64);

    /// Remove every given element; absent elements are ignored.
    fn subtract<I>(&mut self, items: I)
    where
        I: IntoIterator<Item = Self::Element>;

    /// Add every given element; present elements are ignored.
    fn form_union<I>(&mut self, items: I)
    where
        I: IntoIterator<Item = Self::Element>;

    /// Reconcile `change_set` against the current state.
    ///
    /// A replacing change set rebuilds the dataset through `from_items`.
    /// Otherwise deletions run before insertions, so an element that is both
    /// deleted and inserted ends up present, and the revision is committed
    /// last. The revision is not checked against the current one.
    fn apply(&mut self, change_set: ChangeSetResponse<Self::Element>) {
        let ChangeSetResponse { revision, replace, insert, delete } = change_set;

        if replace {
            *self = Self::from_items(revision, insert);
            return;
        }

        self.subtract(delete);
        self.form_union(insert);
        self.set_revision(revision);
    }
}

/// Bootstrap from a bundled snapshot.
///
/// Goes through `from_items`, the same constructor a replacing change set
/// uses, so a bootstrapped dataset is indistinguishable from one received
/// as a full replacement.
pub trait LoadableFromEmbeddedData: IncrementallyUpdatableDataSet {
    fn from_embedded(revision: u64, items: Vec<Self::Element>) -> Self {
        Self::from_items(revision, items)
    }

    /// Decode and verify an embedded snapshot file.
    fn from_embedded_json(bytes: &[u8]) -> Result<Self, DecodeError>
    where
        Self::Element: Serialize + DeserializeOwned,
    {
        let snapshot = embedded::decode_snapshot::<Self::Element>(bytes)?;
        Ok(Self::from_embedded(snapshot.revision, snapshot.items))
    }
}

impl LoadableFromEmbeddedData for HashPrefixSet {}
impl LoadableFromEmbeddedData for FilterDictionary {}

// =============================================================================
// DataSet
// =============================================================================

/// A dataset of either shape, as held by one store slot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DataSet {
    HashPrefixes(HashPrefixSet),
    Filters(FilterDictionary),
}

/// A change set was routed to a dataset of the other shape.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("{found} change set cannot be applied to a {expected} dataset")]
pub struct ShapeMismatch {
    pub expected: DataKind,
    pub found: DataKind,
}

impl DataSet {
    /// Empty dataset of the given kind at revision 0.
    pub fn empty(kind: DataKind) -> Self {
        match kind {
            DataKind::HashPrefixSet => Self::HashPrefixes(HashPrefixSet::default()),
            DataKind::FilterSet => Self::Filters(FilterDictionary::default()),
        }
    }

    /// Decode an embedded snapshot of the given kind.
    pub fn from_embedded_json(kind: DataKind, bytes: &[u8]) -> Result<Self, DecodeError> {
        Ok(match kind {
            DataKind::HashPrefixSet => Self::HashPrefixes(HashPrefixSet::from_embedded_json(bytes)?),
            DataKind::FilterSet => Self::Filters(FilterDictionary::from_embedded_json(bytes)?),
        })
    }

    pub fn data_kind(&self) -> DataKind {
        match self {
            Self::HashPrefixes(_) => HashPrefixSet::DATA_KIND,
            Self::Filters(_) => FilterDictionary::DATA_KIND,
        }
    }

    pub fn revision(&self) -> u64 {
        match self {
            Self::HashPrefixes(set) => set.revision(),
            Self::Filters(dict) => dict.revision(),
        }
    }

    /// Number of prefixes, or number of hash buckets.
    pub fn len(&self) -> usize {
        match self {
            Self::HashPrefixes(set) => set.len(),
            Self::Filters(dict) => dict.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn as_hash_prefixes(&self) -> Option<&HashPrefixSet> {
        match self {
            Self::HashPrefixes(set) => Some(set),
            Self::Filters(_) => None,
        }
    }

    pub fn as_filters(&self) -> Option<&FilterDictionary> {
        match self {
            Self::Filters(dict) => Some(dict),
            Self::HashPrefixes(_) => None,
        }
    }

    /// Apply a change set of matching shape.
    pub fn apply(&mut self, change_set: AnyChangeSet) -> Result<(), ShapeMismatch> {
        match (self, change_set) {
            (Self::HashPrefixes(set), AnyChangeSet::HashPrefixes(cs)) => set.apply(cs),
            (Self::Filters(dict), AnyChangeSet::Filters(cs)) => dict.apply(cs),
            (this, cs) => {
                return Err(ShapeMismatch {
                    expected: this.data_kind(),
                    found: cs.data_kind(),
                })
            }
        }
        Ok(())
    }
}

impl From<HashPrefixSet> for DataSet {
    fn from(set: HashPrefixSet) -> Self {
        Self::HashPrefixes(set)
    }
}

impl From<FilterDictionary> for DataSet {
    fn from(dict: FilterDictionary) -> Self {
        Self::Filters(dict)
    }
}
