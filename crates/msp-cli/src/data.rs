use std::fs;
use std::path::Path;

use msp_core::embedded::{encode_snapshot, DirectoryEmbeddedData, StaticEmbeddedData};
use msp_core::{AnyChangeSet, DataKind, DataManager, DirectoryStore, Filter, StoreConfig};

pub struct StoreOptions<'a> {
    pub data_dir: &'a str,
    pub embedded_dir: Option<&'a str>,
    pub config: Option<&'a str>,
}

pub fn open_manager(opts: &StoreOptions<'_>) -> Result<DataManager, String> {
    let config = match opts.config {
        Some(path) => {
            let bytes = read_file(Path::new(path))?;
            StoreConfig::from_json(&bytes)
                .map_err(|e| format!("Invalid config '{}': {}", path, e))?
        }
        None => StoreConfig::default(),
    };

    let store = DirectoryStore::new(opts.data_dir);
    let manager = match opts.embedded_dir {
        Some(dir) => DataManager::new(store, DirectoryEmbeddedData::new(dir), config),
        None => DataManager::new(store, StaticEmbeddedData::new(), config),
    };
    Ok(manager)
}

pub fn read_change_set(path: &Path, kind: DataKind) -> Result<AnyChangeSet, String> {
    let bytes = read_file(path)?;
    AnyChangeSet::from_json(kind, &bytes)
        .map_err(|e| format!("Invalid {} change set '{}': {}", kind, path.display(), e))
}

/// Wrap a plain JSON array of elements into an embedded snapshot file.
pub fn build_embedded(input: &Path, kind: DataKind, revision: u64) -> Result<(Vec<u8>, usize), String> {
    let bytes = read_file(input)?;
    let invalid = |e: serde_json::Error| format!("Invalid {} items in '{}': {}", kind, input.display(), e);

    match kind {
        DataKind::HashPrefixSet => {
            let items: Vec<String> = serde_json::from_slice(&bytes).map_err(invalid)?;
            let out = encode_snapshot(revision, &items).map_err(|e| format!("Failed to encode snapshot: {}", e))?;
            Ok((out, items.len()))
        }
        DataKind::FilterSet => {
            let items: Vec<Filter> = serde_json::from_slice(&bytes).map_err(invalid)?;
            let out = encode_snapshot(revision, &items).map_err(|e| format!("Failed to encode snapshot: {}", e))?;
            Ok((out, items.len()))
        }
    }
}

pub fn write_file(path: &Path, bytes: &[u8]) -> Result<(), String> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)
                .map_err(|e| format!("Failed to create '{}': {}", parent.display(), e))?;
        }
    }
    fs::write(path, bytes)
        .map_err(|e| format!("Failed to write '{}': {}", path.display(), e))
}

fn read_file(path: &Path) -> Result<Vec<u8>, String> {
    fs::read(path)
        .map_err(|e| format!("Failed to read '{}': {}", path.display(), e))
}
