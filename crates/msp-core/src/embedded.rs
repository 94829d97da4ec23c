//! Embedded snapshot data
//!
//! Each dataset slot ships with a bundled snapshot that gives it a first
//! state before any change set has been fetched. A snapshot file is
//!
//! ```json
//! { "revision": 1694, "checksum": 3735928559, "items": [ ... ] }
//! ```
//!
//! where `checksum` is the CRC32 of the compact JSON encoding of `items`.
//! A mismatch means the bundle is damaged and is reported, never replaced
//! by an empty dataset.

use std::collections::HashMap;
use std::fs;
use std::io;
use std::path::PathBuf;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::hash::crc32;
use crate::persist::DecodeError;
use crate::stored::StoredDataType;

/// Decoded embedded snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmbeddedSnapshot<T> {
    pub revision: u64,
    pub checksum: u32,
    pub items: Vec<T>,
}

/// CRC32 over the compact JSON encoding of `items`.
pub fn items_checksum<T: Serialize>(items: &[T]) -> Result<u32, serde_json::Error> {
    let bytes = serde_json::to_vec(items)?;
    Ok(crc32(&bytes))
}

/// Encode `items` as an embedded snapshot file.
pub fn encode_snapshot<T: Serialize>(revision: u64, items: &[T]) -> Result<Vec<u8>, serde_json::Error> {
    #[derive(Serialize)]
    struct Borrowed<'a, T> {
        revision: u64,
        checksum: u32,
        items: &'a [T],
    }

    let checksum = items_checksum(items)?;
    serde_json::to_vec_pretty(&Borrowed { revision, checksum, items })
}

/// Decode an embedded snapshot file and verify its checksum.
pub fn decode_snapshot<T>(bytes: &[u8]) -> Result<EmbeddedSnapshot<T>, DecodeError>
where
    T: Serialize + DeserializeOwned,
{
    let snapshot: EmbeddedSnapshot<T> = serde_json::from_slice(bytes)?;
    let computed = items_checksum(&snapshot.items)?;
    if computed != snapshot.checksum {
        return Err(DecodeError::ChecksumMismatch {
            expected: snapshot.checksum,
            computed,
        });
    }
    Ok(snapshot)
}

// =============================================================================
// Providers
// =============================================================================

/// Source of bundled snapshot files.
pub trait EmbeddedDataProvider: Send + Sync {
    /// Raw snapshot bytes for `key`, or `None` if nothing is bundled.
    fn load_bytes(&self, key: StoredDataType) -> io::Result<Option<Vec<u8>>>;
}

/// Snapshots stored as `<dir>/<key file name>`.
#[derive(Debug, Clone)]
pub struct DirectoryEmbeddedData {
    dir: PathBuf,
}

impl DirectoryEmbeddedData {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }
}

impl EmbeddedDataProvider for DirectoryEmbeddedData {
    fn load_bytes(&self, key: StoredDataType) -> io::Result<Option<Vec<u8>>> {
        match fs::read(self.dir.join(key.file_name())) {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e),
        }
    }
}

/// Snapshots held in memory, e.g. compiled in with `include_bytes!`.
#[derive(Debug, Clone, Default)]
pub struct StaticEmbeddedData {
    snapshots: HashMap<StoredDataType, Vec<u8>>,
}

impl StaticEmbeddedData {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, key: StoredDataType, bytes: impl Into<Vec<u8>>) -> Self {
        self.insert(key, bytes);
        self
    }

    pub fn insert(&mut self, key: StoredDataType, bytes: impl Into<Vec<u8>>) {
        self.snapshots.insert(key, bytes.into());
    }
}

impl EmbeddedDataProvider for StaticEmbeddedData {
    fn load_bytes(&self, key: StoredDataType) -> io::Result<Option<Vec<u8>>> {
        Ok(self.snapshots.get(&key).cloned())
    }
}
