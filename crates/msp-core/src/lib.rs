//! Malicious Site Protection Core Library
//!
//! This crate keeps the threat-detection datasets (hash-prefix sets and
//! hash-to-pattern filter dictionaries) consistent with a remote service that
//! ships incremental, revisioned change sets.
//!
//! # Architecture
//!
//! Every dataset starts life from an embedded snapshot at a known revision.
//! Change sets fetched by an external client are applied through one shared
//! reconciliation algorithm (`IncrementallyUpdatableDataSet::apply`), and the
//! result is persisted by an external store. Lookups go through the matcher,
//! which screens a host hash against the prefix set before confirming the full
//! URL against the filter patterns.
//!
//! # Modules
//!
//! - `types`: Threat kinds, data kinds and the `Filter` record
//! - `hash_prefix_set`: Revisioned set of hash prefixes
//! - `filter_dictionary`: Revisioned hash to regex-set multimap
//! - `change_set`: Change-set request/response wire model
//! - `dataset`: The incremental update algorithm and embedded bootstrap contract
//! - `stored`: `StoredDataType` keys and the registry of required datasets
//! - `hash`: CRC32 used for embedded snapshot integrity
//! - `embedded`: Embedded snapshot decoding and providers
//! - `persist`: On-disk format, codec and storage backends
//! - `store`: `DataManager`, the copy-on-write owner of every dataset slot
//! - `url`: Host extraction and canonicalisation
//! - `matcher`: Two-stage URL classification

pub mod change_set;
pub mod dataset;
pub mod embedded;
pub mod filter_dictionary;
pub mod hash;
pub mod hash_prefix_set;
pub mod matcher;
pub mod persist;
pub mod store;
pub mod stored;
pub mod types;
pub mod url;

// Re-export commonly used types
pub use change_set::{AnyChangeSet, ChangeSetRequest, ChangeSetResponse};
pub use dataset::{DataSet, IncrementallyUpdatableDataSet, LoadableFromEmbeddedData};
pub use filter_dictionary::FilterDictionary;
pub use hash_prefix_set::HashPrefixSet;
pub use matcher::{HostHasher, MatchOutcome, Matcher, ThreatMatch};
pub use persist::{DataStore, DecodeError, DirectoryStore, MemoryStore};
pub use store::{DataManager, RevisionPolicy, StoreConfig, StoreError};
pub use stored::StoredDataType;
pub use types::{DataKind, Filter, ThreatKind};
