//! Dataset encode/decode

use crate::dataset::{DataSet, IncrementallyUpdatableDataSet};
use crate::filter_dictionary::FilterDictionary;
use crate::hash_prefix_set::HashPrefixSet;
use crate::types::{DataKind, Filter};

use super::format::*;

/// Error type for dataset decoding.
#[derive(Debug, thiserror::Error)]
pub enum DecodeError {
    #[error("Malformed JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Unsupported format version: {0}")]
    UnsupportedFormat(u16),
    #[error("Expected {expected} data, found {found}")]
    UnexpectedDataKind { expected: DataKind, found: DataKind },
    #[error("Checksum mismatch: expected={expected:#010x}, computed={computed:#010x}")]
    ChecksumMismatch { expected: u32, computed: u32 },
}

/// Encode a hash-prefix set.
pub fn encode_hash_prefixes(set: &HashPrefixSet) -> Result<Vec<u8>, serde_json::Error> {
    let file = PersistedHashPrefixes {
        format_version: FORMAT_VERSION,
        kind: DataKind::HashPrefixSet,
        revision: set.revision(),
        items: set.sorted().into_iter().map(str::to_owned).collect(),
    };
    serde_json::to_vec(&file)
}

/// Encode a filter dictionary.
pub fn encode_filters(dict: &FilterDictionary) -> Result<Vec<u8>, serde_json::Error> {
    let filters = dict
        .iter()
        .map(|(hash, patterns)| {
            let mut patterns: Vec<String> = patterns.iter().cloned().collect();
            patterns.sort_unstable();
            (hash.clone(), patterns)
        })
        .collect();

    let file = PersistedFilterSet {
        format_version: FORMAT_VERSION,
        kind: DataKind::FilterSet,
        revision: dict.revision(),
        filters,
    };
    serde_json::to_vec(&file)
}

/// Encode either dataset shape.
pub fn encode(dataset: &DataSet) -> Result<Vec<u8>, serde_json::Error> {
    match dataset {
        DataSet::HashPrefixes(set) => encode_hash_prefixes(set),
        DataSet::Filters(dict) => encode_filters(dict),
    }
}

/// Decode a persisted file that must hold `expected` data.
pub fn decode(expected: DataKind, bytes: &[u8]) -> Result<DataSet, DecodeError> {
    let header: PersistedHeader = serde_json::from_slice(bytes)?;
    if header.format_version != FORMAT_VERSION {
        return Err(DecodeError::UnsupportedFormat(header.format_version));
    }
    if header.kind != expected {
        return Err(DecodeError::UnexpectedDataKind {
            expected,
            found: header.kind,
        });
    }

    match expected {
        DataKind::HashPrefixSet => {
            let file: PersistedHashPrefixes = serde_json::from_slice(bytes)?;
            Ok(HashPrefixSet::new(file.revision, file.items).into())
        }
        DataKind::FilterSet => {
            let file: PersistedFilterSet = serde_json::from_slice(bytes)?;
            // Empty pattern lists contribute no filters, so no empty bucket
            // can be rebuilt from a hand-edited file.
            let filters = file.filters.into_iter().flat_map(|(hash, patterns)| {
                patterns
                    .into_iter()
                    .map(move |regex| Filter::new(hash.clone(), regex))
            });
            Ok(FilterDictionary::new(file.revision, filters).into())
        }
    }
}
