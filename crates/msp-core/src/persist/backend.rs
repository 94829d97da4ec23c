//! Storage backends for persisted datasets

use std::collections::HashMap;
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};

use crate::stored::StoredDataType;

/// Durable storage for encoded datasets, one blob per slot.
pub trait DataStore: Send + Sync {
    /// Stored bytes for `key`, or `None` if the slot was never written.
    fn load(&self, key: StoredDataType) -> io::Result<Option<Vec<u8>>>;

    /// Replace the stored bytes for `key`.
    fn store(&self, key: StoredDataType, bytes: &[u8]) -> io::Result<()>;
}

/// One file per slot under a directory.
///
/// Writes go to a temporary sibling that is renamed over the target, so a
/// crash leaves either the old or the new file, never a truncated one.
#[derive(Debug, Clone)]
pub struct DirectoryStore {
    dir: PathBuf,
}

impl DirectoryStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn path_for(&self, key: StoredDataType) -> PathBuf {
        self.dir.join(key.file_name())
    }
}

impl DataStore for DirectoryStore {
    fn load(&self, key: StoredDataType) -> io::Result<Option<Vec<u8>>> {
        match fs::read(self.path_for(key)) {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e),
        }
    }

    fn store(&self, key: StoredDataType, bytes: &[u8]) -> io::Result<()> {
        fs::create_dir_all(&self.dir)?;

        let target = self.path_for(key);
        let tmp = self.dir.join(format!(".{}.tmp", key.file_name()));

        let result = write_synced(&tmp, bytes).and_then(|()| fs::rename(&tmp, &target));
        if result.is_err() {
            let _ = fs::remove_file(&tmp);
        }
        result
    }
}

fn write_synced(path: &Path, bytes: &[u8]) -> io::Result<()> {
    let mut file = fs::File::create(path)?;
    file.write_all(bytes)?;
    file.sync_all()
}

/// In-memory store, used in tests and by embedders without a disk.
#[derive(Debug, Default)]
pub struct MemoryStore {
    blobs: Mutex<HashMap<StoredDataType, Vec<u8>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.blobs.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl DataStore for MemoryStore {
    fn load(&self, key: StoredDataType) -> io::Result<Option<Vec<u8>>> {
        let blobs = self.blobs.lock().unwrap_or_else(PoisonError::into_inner);
        Ok(blobs.get(&key).cloned())
    }

    fn store(&self, key: StoredDataType, bytes: &[u8]) -> io::Result<()> {
        let mut blobs = self.blobs.lock().unwrap_or_else(PoisonError::into_inner);
        blobs.insert(key, bytes.to_vec());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ThreatKind;

    #[test]
    fn test_directory_store_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let store = DirectoryStore::new(dir.path().join("nested"));
        let key = StoredDataType::HashPrefixSet(ThreatKind::Phishing);

        assert_eq!(store.load(key).unwrap(), None);

        store.store(key, b"first").unwrap();
        store.store(key, b"second").unwrap();
        assert_eq!(store.load(key).unwrap(), Some(b"second".to_vec()));
        assert!(store.path_for(key).ends_with("phishingHashPrefixes.json"));
    }

    #[test]
    fn test_directory_store_leaves_no_temp_file() {
        let dir = tempfile::tempdir().unwrap();
        let store = DirectoryStore::new(dir.path());
        store.store(StoredDataType::FilterSet(ThreatKind::Malware), b"{}").unwrap();

        let names: Vec<String> = fs::read_dir(dir.path())
            .unwrap()
            .map(|entry| entry.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, vec!["malwareFilterSet.json".to_string()]);
    }

    #[test]
    fn test_failed_store_removes_temp_file() {
        let dir = tempfile::tempdir().unwrap();
        let store = DirectoryStore::new(dir.path());
        let key = StoredDataType::HashPrefixSet(ThreatKind::Scam);

        // A non-empty directory at the target path makes the rename fail.
        let target = store.path_for(key);
        fs::create_dir(&target).unwrap();
        fs::write(target.join("occupied"), b"x").unwrap();

        assert!(store.store(key, b"{}").is_err());
        let names: Vec<String> = fs::read_dir(dir.path())
            .unwrap()
            .map(|entry| entry.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, vec!["scamHashPrefixes.json".to_string()]);
    }

    #[test]
    fn test_memory_store() {
        let store = MemoryStore::new();
        let key = StoredDataType::FilterSet(ThreatKind::Scam);
        assert!(store.is_empty());

        store.store(key, b"abc").unwrap();
        assert_eq!(store.load(key).unwrap(), Some(b"abc".to_vec()));
        assert_eq!(store.len(), 1);
    }
}
