//! Persisted dataset format v1
//!
//! All files are JSON. Element lists are written sorted so that saving the
//! same content twice produces the same bytes.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::types::DataKind;

/// Current format version
pub const FORMAT_VERSION: u16 = 1;

/// Fields shared by every persisted file, read before the body.
#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PersistedHeader {
    pub format_version: u16,
    pub kind: DataKind,
}

/// Persisted `HashPrefixSet`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PersistedHashPrefixes {
    pub format_version: u16,
    pub kind: DataKind,
    pub revision: u64,
    pub items: Vec<String>,
}

/// Persisted `FilterDictionary`: hash to sorted regex list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PersistedFilterSet {
    pub format_version: u16,
    pub kind: DataKind,
    pub revision: u64,
    pub filters: BTreeMap<String, Vec<String>>,
}
