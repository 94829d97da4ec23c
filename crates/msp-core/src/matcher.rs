//! Two-stage URL classification
//!
//! For every suffix of the canonical host the matcher computes the host
//! digest, screens its prefix against the threat's `HashPrefixSet`, and on
//! a hit confirms the full URL against the regex patterns stored under that
//! digest in the `FilterDictionary`.
//!
//! Pattern buckets are compiled on first use and reused until the store
//! publishes a new filter snapshot.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex, PoisonError};

use log::warn;
use regex::Regex;

use crate::dataset::DataSet;
use crate::hash::hash_prefix;
use crate::store::{DataManager, StoreError};
use crate::stored::StoredDataType;
use crate::types::ThreatKind;
use crate::url::{canonical_host, walk_host_suffixes};

/// Supplies the hex digest of a canonical host.
pub trait HostHasher: Send + Sync {
    fn hash_hex(&self, host: &str) -> String;
}

impl<F> HostHasher for F
where
    F: Fn(&str) -> String + Send + Sync,
{
    fn hash_hex(&self, host: &str) -> String {
        self(host)
    }
}

/// A confirmed match.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ThreatMatch {
    pub threat_kind: ThreatKind,
    /// Host suffix whose digest matched
    pub host: String,
    pub hash: String,
    /// Pattern that matched the URL
    pub pattern: String,
}

/// Result of checking a URL against one threat kind.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MatchOutcome {
    /// No prefix hit
    Clean,
    /// A prefix hit that no pattern confirmed
    PrefixHit,
    Matched(ThreatMatch),
}

/// A filter pattern compiled once per published snapshot.
#[derive(Debug)]
struct CompiledPattern {
    source: String,
    regex: Regex,
}

/// Compiled buckets of one `FilterSet` snapshot.
///
/// Keyed on the snapshot `Arc`; a new snapshot published by the store
/// starts a fresh cache.
struct CompiledFilters {
    snapshot: Arc<DataSet>,
    buckets: HashMap<String, Arc<[CompiledPattern]>>,
}

/// URL matcher over a `DataManager`.
pub struct Matcher<'a, H> {
    manager: &'a DataManager,
    hasher: H,
    compiled: Mutex<HashMap<ThreatKind, CompiledFilters>>,
}

impl<'a, H: HostHasher> Matcher<'a, H> {
    pub fn new(manager: &'a DataManager, hasher: H) -> Self {
        Self {
            manager,
            hasher,
            compiled: Mutex::new(HashMap::new()),
        }
    }

    /// First threat kind whose data confirms `url`.
    pub fn check(&self, url: &str) -> Result<Option<ThreatMatch>, StoreError> {
        for threat_kind in ThreatKind::ALL {
            if let MatchOutcome::Matched(found) = self.check_threat(url, threat_kind)? {
                return Ok(Some(found));
            }
        }
        Ok(None)
    }

    /// Check `url` against a single threat kind.
    pub fn check_threat(&self, url: &str, threat_kind: ThreatKind) -> Result<MatchOutcome, StoreError> {
        let host = match canonical_host(url) {
            Some(host) => host,
            None => return Ok(MatchOutcome::Clean),
        };

        let prefixes = self.manager.dataset(StoredDataType::HashPrefixSet(threat_kind))?;
        let prefixes = match prefixes.as_hash_prefixes() {
            Some(prefixes) => prefixes,
            None => return Ok(MatchOutcome::Clean),
        };

        let mut outcome = MatchOutcome::Clean;
        for candidate in walk_host_suffixes(&host) {
            let hash = self.hasher.hash_hex(candidate);
            if !prefixes.contains(hash_prefix(&hash)) {
                continue;
            }
            outcome = MatchOutcome::PrefixHit;

            let filters = self.manager.dataset(StoredDataType::FilterSet(threat_kind))?;
            let patterns = match self.bucket(threat_kind, &filters, &hash) {
                Some(patterns) => patterns,
                None => continue,
            };

            if let Some(pattern) = patterns.iter().find(|pattern| pattern.regex.is_match(url)) {
                return Ok(MatchOutcome::Matched(ThreatMatch {
                    threat_kind,
                    host: candidate.to_string(),
                    hash,
                    pattern: pattern.source.clone(),
                }));
            }
        }

        Ok(outcome)
    }

    /// Compiled patterns for `hash` in the `filters` snapshot.
    fn bucket(&self, threat_kind: ThreatKind, filters: &Arc<DataSet>, hash: &str) -> Option<Arc<[CompiledPattern]>> {
        let mut compiled = self.compiled.lock().unwrap_or_else(PoisonError::into_inner);
        let entry = compiled.entry(threat_kind).or_insert_with(|| CompiledFilters {
            snapshot: Arc::clone(filters),
            buckets: HashMap::new(),
        });
        if !Arc::ptr_eq(&entry.snapshot, filters) {
            entry.snapshot = Arc::clone(filters);
            entry.buckets.clear();
        }

        if let Some(bucket) = entry.buckets.get(hash) {
            return Some(Arc::clone(bucket));
        }
        let patterns = filters.as_filters()?.get(hash)?;
        let bucket = compile_bucket(patterns);
        entry.buckets.insert(hash.to_string(), Arc::clone(&bucket));
        Some(bucket)
    }

    #[cfg(test)]
    fn compiled_bucket_count(&self, threat_kind: ThreatKind) -> usize {
        let compiled = self.compiled.lock().unwrap_or_else(PoisonError::into_inner);
        compiled.get(&threat_kind).map_or(0, |entry| entry.buckets.len())
    }
}

/// Compile a bucket in sorted order; invalid patterns are dropped.
fn compile_bucket(patterns: &HashSet<String>) -> Arc<[CompiledPattern]> {
    let mut sources: Vec<&String> = patterns.iter().collect();
    sources.sort_unstable();
    sources
        .into_iter()
        .filter_map(|source| match Regex::new(source) {
            Ok(regex) => Some(CompiledPattern {
                source: source.clone(),
                regex,
            }),
            Err(e) => {
                warn!("Skipping invalid filter pattern {:?}: {}", source, e);
                None
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::change_set::ChangeSetResponse;
    use crate::embedded::{encode_snapshot, StaticEmbeddedData};
    use crate::persist::MemoryStore;
    use crate::store::StoreConfig;
    use crate::types::Filter;

    // Deterministic stand-in digest: the host itself, hex-encoded.
    fn hex_hasher(host: &str) -> String {
        host.bytes().map(|b| format!("{:02x}", b)).collect()
    }

    fn seeded_manager(prefixes: Vec<String>, filters: Vec<Filter>) -> DataManager {
        let mut embedded = StaticEmbeddedData::new();
        for threat in ThreatKind::ALL {
            let (p, f) = if threat == ThreatKind::Phishing {
                (prefixes.clone(), filters.clone())
            } else {
                (Vec::new(), Vec::new())
            };
            embedded.insert(
                StoredDataType::HashPrefixSet(threat),
                encode_snapshot(1, &p).unwrap(),
            );
            embedded.insert(
                StoredDataType::FilterSet(threat),
                encode_snapshot(1, &f).unwrap(),
            );
        }
        DataManager::new(MemoryStore::new(), embedded, StoreConfig::default())
    }

    #[test]
    fn test_missing_data_is_error() {
        let manager = DataManager::new(MemoryStore::new(), StaticEmbeddedData::new(), StoreConfig::default());
        let matcher = Matcher::new(&manager, hex_hasher);
        assert!(matcher.check("https://example.com/").is_err());
    }

    #[test]
    fn test_confirmed_match() {
        let hash = hex_hasher("evil.test");
        let manager = seeded_manager(
            vec![hash_prefix(&hash).to_string()],
            vec![Filter::new(hash.clone(), r"^https?://(www\.)?evil\.test/login")],
        );
        let matcher = Matcher::new(&manager, hex_hasher);

        let found = matcher.check("https://www.evil.test/login?user=a").unwrap().unwrap();
        assert_eq!(found.threat_kind, ThreatKind::Phishing);
        assert_eq!(found.host, "evil.test");
        assert_eq!(found.hash, hash);
    }

    #[test]
    fn test_prefix_hit_without_pattern_match() {
        let hash = hex_hasher("evil.test");
        let manager = seeded_manager(
            vec![hash_prefix(&hash).to_string()],
            vec![Filter::new(hash, r"/login$")],
        );
        let matcher = Matcher::new(&manager, hex_hasher);

        let outcome = matcher.check_threat("https://evil.test/about", ThreatKind::Phishing).unwrap();
        assert_eq!(outcome, MatchOutcome::PrefixHit);
        assert_eq!(matcher.check("https://evil.test/about").unwrap(), None);
    }

    #[test]
    fn test_parent_host_matches() {
        let hash = hex_hasher("evil.test");
        let manager = seeded_manager(
            vec![hash_prefix(&hash).to_string()],
            vec![Filter::new(hash, r"evil\.test")],
        );
        let matcher = Matcher::new(&manager, hex_hasher);

        let found = matcher.check("https://cdn.login.evil.test/x").unwrap().unwrap();
        assert_eq!(found.host, "evil.test");
    }

    #[test]
    fn test_clean_url() {
        let hash = hex_hasher("evil.test");
        let manager = seeded_manager(vec![hash_prefix(&hash).to_string()], vec![Filter::new(hash, ".*")]);
        let matcher = Matcher::new(&manager, hex_hasher);

        assert_eq!(
            matcher.check_threat("https://fine.example/", ThreatKind::Phishing).unwrap(),
            MatchOutcome::Clean
        );
        assert_eq!(matcher.check_threat("not a url", ThreatKind::Phishing).unwrap(), MatchOutcome::Clean);
    }

    #[test]
    fn test_invalid_pattern_is_skipped() {
        let hash = hex_hasher("evil.test");
        let manager = seeded_manager(
            vec![hash_prefix(&hash).to_string()],
            vec![Filter::new(hash.clone(), "(unclosed"), Filter::new(hash, "evil")],
        );
        let matcher = Matcher::new(&manager, hex_hasher);

        let found = matcher.check("https://evil.test/").unwrap().unwrap();
        assert_eq!(found.pattern, "evil");
    }

    #[test]
    fn test_patterns_compiled_once_per_snapshot() {
        let hash = hex_hasher("evil.test");
        let manager = seeded_manager(
            vec![hash_prefix(&hash).to_string()],
            vec![Filter::new(hash.clone(), r"/login$")],
        );
        let matcher = Matcher::new(&manager, hex_hasher);

        assert_eq!(matcher.check("https://evil.test/about").unwrap(), None);
        assert_eq!(matcher.check("https://evil.test/help").unwrap(), None);
        assert_eq!(matcher.compiled_bucket_count(ThreatKind::Phishing), 1);
        let first = matcher.bucket(
            ThreatKind::Phishing,
            &manager.dataset(StoredDataType::FilterSet(ThreatKind::Phishing)).unwrap(),
            &hash,
        );
        let second = matcher.bucket(
            ThreatKind::Phishing,
            &manager.dataset(StoredDataType::FilterSet(ThreatKind::Phishing)).unwrap(),
            &hash,
        );
        assert!(Arc::ptr_eq(&first.unwrap(), &second.unwrap()));
    }

    #[test]
    fn test_new_snapshot_recompiles_patterns() {
        let hash = hex_hasher("evil.test");
        let manager = seeded_manager(
            vec![hash_prefix(&hash).to_string()],
            vec![Filter::new(hash.clone(), r"/login$")],
        );
        let matcher = Matcher::new(&manager, hex_hasher);
        assert_eq!(matcher.check("https://evil.test/about").unwrap(), None);

        manager
            .apply_change_set(
                StoredDataType::FilterSet(ThreatKind::Phishing),
                ChangeSetResponse::incremental(2, vec![Filter::new(hash, r"/about$")], vec![]).into(),
            )
            .unwrap();

        let found = matcher.check("https://evil.test/about").unwrap().unwrap();
        assert_eq!(found.pattern, "/about$");
    }
}
