//! Dataset store
//!
//! `DataManager` owns one immutable `Arc<DataSet>` per `StoredDataType`.
//! Updates are applied to a private copy, persisted, and only then swapped
//! into the slot, so a reader holding an `Arc` keeps a consistent snapshot
//! and never observes a half-applied change set.

use std::collections::HashMap;
use std::io;
use std::sync::{Arc, Mutex, PoisonError, RwLock};

use log::{debug, info, warn};
use serde::{Deserialize, Serialize};

use crate::change_set::{AnyChangeSet, ChangeSetRequest};
use crate::dataset::{DataSet, ShapeMismatch};
use crate::embedded::EmbeddedDataProvider;
use crate::persist::{self, DataStore, DecodeError};
use crate::stored::StoredDataType;

// =============================================================================
// Configuration
// =============================================================================

/// How `apply_change_set` treats a change set whose revision is lower than
/// the slot's current revision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum RevisionPolicy {
    /// Reject with `StoreError::RevisionRegression`
    #[default]
    RejectRegressive,
    /// Apply whatever the server sends
    TrustServer,
}

/// Store behaviour knobs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct StoreConfig {
    pub revision_policy: RevisionPolicy,
    /// Write the updated dataset to the `DataStore` before publishing it
    pub persist_on_apply: bool,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            revision_policy: RevisionPolicy::RejectRegressive,
            persist_on_apply: true,
        }
    }
}

impl StoreConfig {
    /// Parse a JSON config; missing fields take their defaults.
    pub fn from_json(bytes: &[u8]) -> Result<Self, serde_json::Error> {
        serde_json::from_slice(bytes)
    }
}

// =============================================================================
// Errors
// =============================================================================

/// Error type for store operations.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("Failed to decode {key}: {source}")]
    Decode { key: StoredDataType, source: DecodeError },
    #[error("Failed to encode {key}: {source}")]
    Encode { key: StoredDataType, source: serde_json::Error },
    #[error("I/O error for {key}: {source}")]
    Io { key: StoredDataType, source: io::Error },
    #[error("Revision regression for {key}: current={current}, received={received}")]
    RevisionRegression {
        key: StoredDataType,
        current: u64,
        received: u64,
    },
    #[error("No persisted or embedded data for {0}")]
    Missing(StoredDataType),
    #[error("Cannot update {key}: {source}")]
    ShapeMismatch { key: StoredDataType, source: ShapeMismatch },
}

// =============================================================================
// DataManager
// =============================================================================

/// Owner of every dataset slot.
///
/// Slots are loaded lazily: the persisted blob wins unless the embedded
/// snapshot carries a newer revision (e.g. after an app update shipped a
/// fresher bundle).
pub struct DataManager {
    store: Box<dyn DataStore>,
    embedded: Box<dyn EmbeddedDataProvider>,
    config: StoreConfig,
    slots: RwLock<HashMap<StoredDataType, Arc<DataSet>>>,
    // Serialises slot loads and updates; readers only take `slots`.
    update_lock: Mutex<()>,
}

impl DataManager {
    pub fn new<S, E>(store: S, embedded: E, config: StoreConfig) -> Self
    where
        S: DataStore + 'static,
        E: EmbeddedDataProvider + 'static,
    {
        Self {
            store: Box::new(store),
            embedded: Box::new(embedded),
            config,
            slots: RwLock::new(HashMap::new()),
            update_lock: Mutex::new(()),
        }
    }

    pub fn config(&self) -> &StoreConfig {
        &self.config
    }

    /// Current snapshot of a slot, loading it on first use.
    pub fn dataset(&self, key: StoredDataType) -> Result<Arc<DataSet>, StoreError> {
        if let Some(dataset) = self.cached(key) {
            return Ok(dataset);
        }

        let _guard = self.update_lock.lock().unwrap_or_else(PoisonError::into_inner);
        self.dataset_locked(key)
    }

    /// Current revision of a slot.
    pub fn revision(&self, key: StoredDataType) -> Result<u64, StoreError> {
        Ok(self.dataset(key)?.revision())
    }

    /// True once the slot has been loaded into memory.
    pub fn is_loaded(&self, key: StoredDataType) -> bool {
        self.cached(key).is_some()
    }

    /// Load every required slot.
    pub fn load_all(&self) -> Result<(), StoreError> {
        for key in StoredDataType::all_cases() {
            self.dataset(key)?;
        }
        Ok(())
    }

    /// Requests for the change sets following every slot's revision.
    pub fn change_set_requests(&self) -> Result<Vec<ChangeSetRequest>, StoreError> {
        StoredDataType::all_cases()
            .into_iter()
            .map(|key| Ok(key.change_set_request(self.revision(key)?)))
            .collect()
    }

    /// Write a slot's current snapshot to the `DataStore`.
    pub fn persist(&self, key: StoredDataType) -> Result<(), StoreError> {
        let dataset = self.dataset(key)?;
        self.write(key, &dataset)
    }

    /// Apply a fetched change set to a slot and return the new revision.
    ///
    /// A replacing change set may initialise a slot that has neither
    /// persisted nor embedded data, or whose data fails to decode. On any
    /// error the slot keeps its previous snapshot.
    pub fn apply_change_set(
        &self,
        key: StoredDataType,
        change_set: AnyChangeSet,
    ) -> Result<u64, StoreError> {
        if change_set.data_kind() != key.data_kind() {
            return Err(StoreError::ShapeMismatch {
                key,
                source: ShapeMismatch {
                    expected: key.data_kind(),
                    found: change_set.data_kind(),
                },
            });
        }

        let _guard = self.update_lock.lock().unwrap_or_else(PoisonError::into_inner);
        let current = match self.dataset_locked(key) {
            // A full replacement needs no prior state.
            Err(StoreError::Missing(_)) if change_set.is_replace() => Arc::new(DataSet::empty(key.data_kind())),
            Err(e @ StoreError::Decode { .. }) if change_set.is_replace() => {
                warn!("Replacing unreadable data for {}: {}", key, e);
                Arc::new(DataSet::empty(key.data_kind()))
            }
            other => other?,
        };

        let received = change_set.revision();
        if received < current.revision() && self.config.revision_policy == RevisionPolicy::RejectRegressive {
            warn!(
                "Rejecting change set for {}: revision {} is older than {}",
                key,
                received,
                current.revision()
            );
            return Err(StoreError::RevisionRegression {
                key,
                current: current.revision(),
                received,
            });
        }

        let replace = change_set.is_replace();
        let (inserted, deleted) = change_set.counts();

        let mut next = DataSet::clone(&current);
        next.apply(change_set)
            .map_err(|source| StoreError::ShapeMismatch { key, source })?;

        if self.config.persist_on_apply {
            self.write(key, &next)?;
        }

        debug!(
            "Applied change set to {}: revision {} -> {}, replace={}, +{} -{}, {} entries",
            key,
            current.revision(),
            received,
            replace,
            inserted,
            deleted,
            next.len()
        );

        self.publish(key, next);
        Ok(received)
    }

    fn cached(&self, key: StoredDataType) -> Option<Arc<DataSet>> {
        let slots = self.slots.read().unwrap_or_else(PoisonError::into_inner);
        slots.get(&key).cloned()
    }

    /// `dataset` body; caller holds `update_lock`.
    fn dataset_locked(&self, key: StoredDataType) -> Result<Arc<DataSet>, StoreError> {
        if let Some(dataset) = self.cached(key) {
            return Ok(dataset);
        }
        let dataset = self.load_slot(key)?;
        Ok(self.publish(key, dataset))
    }

    fn publish(&self, key: StoredDataType, dataset: DataSet) -> Arc<DataSet> {
        let dataset = Arc::new(dataset);
        let mut slots = self.slots.write().unwrap_or_else(PoisonError::into_inner);
        slots.insert(key, Arc::clone(&dataset));
        dataset
    }

    fn write(&self, key: StoredDataType, dataset: &DataSet) -> Result<(), StoreError> {
        let bytes = persist::encode(dataset).map_err(|source| StoreError::Encode { key, source })?;
        self.store
            .store(key, &bytes)
            .map_err(|source| StoreError::Io { key, source })
    }

    fn load_slot(&self, key: StoredDataType) -> Result<DataSet, StoreError> {
        let persisted = match self.store.load(key).map_err(|source| StoreError::Io { key, source })? {
            Some(bytes) => match persist::decode(key.data_kind(), &bytes) {
                Ok(dataset) => Some(dataset),
                Err(source) => {
                    warn!("Persisted data for {} is unreadable: {}", key, source);
                    return Err(StoreError::Decode { key, source });
                }
            },
            None => None,
        };

        match (persisted, self.load_embedded(key)) {
            (Some(persisted), Ok(Some(embedded))) if embedded.revision() > persisted.revision() => {
                info!(
                    "Bootstrapping {} from embedded revision {} (persisted revision {})",
                    key,
                    embedded.revision(),
                    persisted.revision()
                );
                Ok(embedded)
            }
            (Some(persisted), Ok(_)) => Ok(persisted),
            (Some(persisted), Err(e)) => {
                warn!("Ignoring unreadable embedded data for {}: {}", key, e);
                Ok(persisted)
            }
            (None, Ok(Some(embedded))) => {
                info!("Bootstrapping {} from embedded revision {}", key, embedded.revision());
                Ok(embedded)
            }
            (None, Ok(None)) => Err(StoreError::Missing(key)),
            (None, Err(e)) => Err(e),
        }
    }

    fn load_embedded(&self, key: StoredDataType) -> Result<Option<DataSet>, StoreError> {
        let bytes = match self
            .embedded
            .load_bytes(key)
            .map_err(|source| StoreError::Io { key, source })?
        {
            Some(bytes) => bytes,
            None => return Ok(None),
        };

        DataSet::from_embedded_json(key.data_kind(), &bytes)
            .map(Some)
            .map_err(|source| StoreError::Decode { key, source })
    }
}
