//! Core type definitions for Malicious Site Protection
//!
//! These types appear on the wire (change sets, embedded snapshots) and in
//! the persisted dataset files.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

// =============================================================================
// Threat Kinds
// =============================================================================

/// Category of malicious-site classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ThreatKind {
    Phishing,
    Malware,
    Scam,
}

impl ThreatKind {
    /// Every known threat kind, in registry order.
    pub const ALL: [ThreatKind; 3] = [Self::Phishing, Self::Malware, Self::Scam];

    /// Stable lowercase name used in request paths and file names.
    pub const fn name(self) -> &'static str {
        match self {
            Self::Phishing => "phishing",
            Self::Malware => "malware",
            Self::Scam => "scam",
        }
    }
}

impl fmt::Display for ThreatKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for ThreatKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|kind| kind.name().eq_ignore_ascii_case(s))
            .ok_or_else(|| format!("unknown threat kind '{}'", s))
    }
}

// =============================================================================
// Data Kinds
// =============================================================================

/// Shape of an incrementally updatable artifact.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum DataKind {
    /// Flat set of hash prefixes
    HashPrefixSet,
    /// Hash to regex-set dictionary
    FilterSet,
}

impl DataKind {
    pub const ALL: [DataKind; 2] = [Self::HashPrefixSet, Self::FilterSet];

    pub const fn name(self) -> &'static str {
        match self {
            Self::HashPrefixSet => "hashPrefixSet",
            Self::FilterSet => "filterSet",
        }
    }
}

impl fmt::Display for DataKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for DataKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "hashPrefixSet" | "hash-prefix-set" | "hash-prefixes" => Ok(Self::HashPrefixSet),
            "filterSet" | "filter-set" | "filters" => Ok(Self::FilterSet),
            _ => Err(format!("unknown data kind '{}'", s)),
        }
    }
}

// =============================================================================
// Filter
// =============================================================================

/// A single `(hash, regex)` filter entry.
///
/// `hash` is the digest of the canonical hostname and selects the bucket;
/// `regex` is matched against the full URL. `hostname` and `url` are
/// advisory and never consulted while matching.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Filter {
    #[serde(default)]
    pub hostname: String,
    #[serde(default)]
    pub url: String,
    pub regex: String,
    pub hash: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
}

impl Filter {
    /// Create a filter carrying only the matching fields.
    pub fn new(hash: impl Into<String>, regex: impl Into<String>) -> Self {
        Self {
            hash: hash.into(),
            regex: regex.into(),
            ..Self::default()
        }
    }

    /// Attach a classification label.
    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.category = Some(category.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_threat_kind_from_str() {
        assert_eq!("phishing".parse::<ThreatKind>(), Ok(ThreatKind::Phishing));
        assert_eq!("Malware".parse::<ThreatKind>(), Ok(ThreatKind::Malware));
        assert!("spam".parse::<ThreatKind>().is_err());
    }

    #[test]
    fn test_data_kind_serde_names() {
        let json = serde_json::to_string(&DataKind::HashPrefixSet).unwrap();
        assert_eq!(json, "\"hashPrefixSet\"");
        let kind: DataKind = serde_json::from_str("\"filterSet\"").unwrap();
        assert_eq!(kind, DataKind::FilterSet);
    }

    #[test]
    fn test_filter_decodes_without_advisory_fields() {
        let filter: Filter = serde_json::from_str(r#"{"hash":"abc","regex":"x"}"#).unwrap();
        assert_eq!(filter, Filter::new("abc", "x"));
        assert!(filter.category.is_none());
    }

    #[test]
    fn test_filter_category_skipped_when_none() {
        let json = serde_json::to_string(&Filter::new("abc", "x")).unwrap();
        assert!(!json.contains("category"));

        let json = serde_json::to_string(&Filter::new("abc", "x").with_category("crypto")).unwrap();
        assert!(json.contains("\"category\":\"crypto\""));
    }
}
