//! Change-set wire model
//!
//! A change set moves a dataset from the revision the client reports to the
//! revision the server returns. It is either incremental (`insert`/`delete`
//! relative to the client's current state) or a full replacement.

use serde::{Deserialize, Serialize};

use crate::types::{DataKind, Filter, ThreatKind};

// =============================================================================
// Response
// =============================================================================

/// Update package for a dataset whose elements are `T`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChangeSetResponse<T> {
    /// Revision the dataset is at once this change set is applied
    pub revision: u64,
    /// `insert` is the complete new content; existing content is discarded
    #[serde(default)]
    pub replace: bool,
    #[serde(default = "Vec::new")]
    pub insert: Vec<T>,
    #[serde(default = "Vec::new")]
    pub delete: Vec<T>,
}

impl<T> ChangeSetResponse<T> {
    /// Incremental change set.
    pub fn incremental(revision: u64, insert: Vec<T>, delete: Vec<T>) -> Self {
        Self { revision, replace: false, insert, delete }
    }

    /// Full replacement carrying the whole dataset.
    pub fn replacing(revision: u64, items: Vec<T>) -> Self {
        Self { revision, replace: true, insert: items, delete: Vec::new() }
    }

    /// True when applying this change set would not touch any element.
    pub fn is_empty(&self) -> bool {
        !self.replace && self.insert.is_empty() && self.delete.is_empty()
    }
}

/// Change set for either dataset shape.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AnyChangeSet {
    HashPrefixes(ChangeSetResponse<String>),
    Filters(ChangeSetResponse<Filter>),
}

impl AnyChangeSet {
    /// Decode a JSON response body for the given data kind.
    pub fn from_json(kind: DataKind, bytes: &[u8]) -> Result<Self, serde_json::Error> {
        Ok(match kind {
            DataKind::HashPrefixSet => Self::HashPrefixes(serde_json::from_slice(bytes)?),
            DataKind::FilterSet => Self::Filters(serde_json::from_slice(bytes)?),
        })
    }

    pub fn data_kind(&self) -> DataKind {
        match self {
            Self::HashPrefixes(_) => DataKind::HashPrefixSet,
            Self::Filters(_) => DataKind::FilterSet,
        }
    }

    pub fn revision(&self) -> u64 {
        match self {
            Self::HashPrefixes(cs) => cs.revision,
            Self::Filters(cs) => cs.revision,
        }
    }

    pub fn is_replace(&self) -> bool {
        match self {
            Self::HashPrefixes(cs) => cs.replace,
            Self::Filters(cs) => cs.replace,
        }
    }

    /// `(insert, delete)` element counts.
    pub fn counts(&self) -> (usize, usize) {
        match self {
            Self::HashPrefixes(cs) => (cs.insert.len(), cs.delete.len()),
            Self::Filters(cs) => (cs.insert.len(), cs.delete.len()),
        }
    }
}

impl From<ChangeSetResponse<String>> for AnyChangeSet {
    fn from(change_set: ChangeSetResponse<String>) -> Self {
        Self::HashPrefixes(change_set)
    }
}

impl From<ChangeSetResponse<Filter>> for AnyChangeSet {
    fn from(change_set: ChangeSetResponse<Filter>) -> Self {
        Self::Filters(change_set)
    }
}

// =============================================================================
// Request
// =============================================================================

/// Parameters of a change-set fetch, as handed to the API client.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ChangeSetRequest {
    pub threat_kind: ThreatKind,
    pub data_kind: DataKind,
    /// Revision the client currently holds
    pub revision: u64,
}

impl ChangeSetRequest {
    /// Endpoint name for this data kind.
    pub fn endpoint(&self) -> &'static str {
        match self.data_kind {
            DataKind::HashPrefixSet => "hashPrefix",
            DataKind::FilterSet => "filterSet",
        }
    }

    /// Relative request path including query.
    pub fn path(&self) -> String {
        format!(
            "{}/?category={}&revision={}",
            self.endpoint(),
            self.threat_kind.name(),
            self.revision
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_incremental_hash_prefix_response() {
        let json = br#"{"revision":4,"replace":false,"insert":["aa11bb22"],"delete":["cc33dd44"]}"#;
        let cs = AnyChangeSet::from_json(DataKind::HashPrefixSet, json).unwrap();
        assert_eq!(
            cs,
            AnyChangeSet::HashPrefixes(ChangeSetResponse::incremental(
                4,
                vec!["aa11bb22".to_string()],
                vec!["cc33dd44".to_string()],
            ))
        );
        assert_eq!(cs.counts(), (1, 1));
        assert!(!cs.is_replace());
    }

    #[test]
    fn test_decode_filter_response_defaults() {
        let json = br#"{"revision":9,"insert":[{"hash":"h1","regex":"r1"}]}"#;
        let cs = AnyChangeSet::from_json(DataKind::FilterSet, json).unwrap();
        match cs {
            AnyChangeSet::Filters(cs) => {
                assert_eq!(cs.revision, 9);
                assert!(!cs.replace);
                assert!(cs.delete.is_empty());
                assert_eq!(cs.insert, vec![Filter::new("h1", "r1")]);
            }
            other => panic!("unexpected change set {:?}", other),
        }
    }

    #[test]
    fn test_wrong_shape_is_decode_error() {
        let json = br#"{"revision":1,"insert":["plain-string"]}"#;
        assert!(AnyChangeSet::from_json(DataKind::FilterSet, json).is_err());
    }

    #[test]
    fn test_is_empty() {
        assert!(ChangeSetResponse::<String>::incremental(3, vec![], vec![]).is_empty());
        assert!(!ChangeSetResponse::<String>::replacing(3, vec![]).is_empty());
    }

    #[test]
    fn test_request_path() {
        let request = ChangeSetRequest {
            threat_kind: ThreatKind::Phishing,
            data_kind: DataKind::FilterSet,
            revision: 12,
        };
        assert_eq!(request.path(), "filterSet/?category=phishing&revision=12");
    }
}
