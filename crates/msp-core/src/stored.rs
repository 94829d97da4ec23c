//! Stored dataset keys
//!
//! A `StoredDataType` names one store slot: a threat kind paired with a data
//! kind. A fully initialised store holds exactly one dataset per key in
//! `StoredDataType::all_cases()`.

use std::fmt;

use crate::change_set::ChangeSetRequest;
use crate::types::{DataKind, ThreatKind};

/// Key of a dataset slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum StoredDataType {
    HashPrefixSet(ThreatKind),
    FilterSet(ThreatKind),
}

impl StoredDataType {
    /// Number of required slots.
    pub const COUNT: usize = ThreatKind::ALL.len() * DataKind::ALL.len();

    pub const fn new(threat_kind: ThreatKind, data_kind: DataKind) -> Self {
        match data_kind {
            DataKind::HashPrefixSet => Self::HashPrefixSet(threat_kind),
            DataKind::FilterSet => Self::FilterSet(threat_kind),
        }
    }

    /// Every required slot, threat-major.
    pub fn all_cases() -> Vec<StoredDataType> {
        ThreatKind::ALL
            .into_iter()
            .flat_map(|threat| DataKind::ALL.into_iter().map(move |kind| Self::new(threat, kind)))
            .collect()
    }

    pub const fn threat_kind(self) -> ThreatKind {
        match self {
            Self::HashPrefixSet(threat) | Self::FilterSet(threat) => threat,
        }
    }

    pub const fn data_kind(self) -> DataKind {
        match self {
            Self::HashPrefixSet(_) => DataKind::HashPrefixSet,
            Self::FilterSet(_) => DataKind::FilterSet,
        }
    }

    /// File name used by directory-backed stores and embedded bundles.
    pub fn file_name(self) -> String {
        match self {
            Self::HashPrefixSet(threat) => format!("{}HashPrefixes.json", threat.name()),
            Self::FilterSet(threat) => format!("{}FilterSet.json", threat.name()),
        }
    }

    /// Request for the change set following `revision`.
    pub fn change_set_request(self, revision: u64) -> ChangeSetRequest {
        ChangeSetRequest {
            threat_kind: self.threat_kind(),
            data_kind: self.data_kind(),
            revision,
        }
    }
}

impl fmt::Display for StoredDataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.threat_kind(), self.data_kind())
    }
}
