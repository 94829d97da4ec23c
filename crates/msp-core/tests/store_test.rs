use std::fs;
use std::sync::Arc;
use std::thread;

use msp_core::embedded::{encode_snapshot, DirectoryEmbeddedData};
use msp_core::{
    AnyChangeSet, ChangeSetResponse, DataKind, DataManager, DataStore, DirectoryStore, Filter,
    StoreConfig, StoreError, StoredDataType, ThreatKind,
};

fn strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

fn write_embedded(dir: &std::path::Path, revision: u64) {
    for key in StoredDataType::all_cases() {
        let bytes = match key.data_kind() {
            DataKind::HashPrefixSet => encode_snapshot(revision, &strings(&["0a0b0c0d", "11223344"])).unwrap(),
            DataKind::FilterSet => encode_snapshot(
                revision,
                &[Filter::new("0a0b0c0d99", "a"), Filter::new("0a0b0c0d99", "b")],
            )
            .unwrap(),
        };
        fs::write(dir.join(key.file_name()), bytes).unwrap();
    }
}

#[test]
fn test_update_survives_restart() {
    let embedded_dir = tempfile::tempdir().unwrap();
    let data_dir = tempfile::tempdir().unwrap();
    write_embedded(embedded_dir.path(), 3);

    let key = StoredDataType::FilterSet(ThreatKind::Phishing);
    {
        let manager = DataManager::new(
            DirectoryStore::new(data_dir.path()),
            DirectoryEmbeddedData::new(embedded_dir.path()),
            StoreConfig::default(),
        );
        manager.load_all().unwrap();

        let change_set = ChangeSetResponse::incremental(
            4,
            vec![Filter::new("ffff0000", "c")],
            vec![Filter::new("0a0b0c0d99", "a"), Filter::new("0a0b0c0d99", "b")],
        );
        assert_eq!(manager.apply_change_set(key, change_set.into()).unwrap(), 4);
    }

    let manager = DataManager::new(
        DirectoryStore::new(data_dir.path()),
        DirectoryEmbeddedData::new(embedded_dir.path()),
        StoreConfig::default(),
    );
    let dataset = manager.dataset(key).unwrap();
    let dict = dataset.as_filters().unwrap();

    assert_eq!(dataset.revision(), 4);
    assert!(dict.get("0a0b0c0d99").is_none());
    assert!(dict.get("ffff0000").unwrap().contains("c"));

    // Untouched slots still come from the embedded bundle.
    assert_eq!(manager.revision(StoredDataType::FilterSet(ThreatKind::Malware)).unwrap(), 3);
}

#[test]
fn test_newer_embedded_bundle_supersedes_persisted_data() {
    let embedded_dir = tempfile::tempdir().unwrap();
    let data_dir = tempfile::tempdir().unwrap();
    write_embedded(embedded_dir.path(), 3);

    let key = StoredDataType::HashPrefixSet(ThreatKind::Scam);
    {
        let manager = DataManager::new(
            DirectoryStore::new(data_dir.path()),
            DirectoryEmbeddedData::new(embedded_dir.path()),
            StoreConfig::default(),
        );
        manager
            .apply_change_set(key, ChangeSetResponse::incremental(5, strings(&["deadbeef"]), vec![]).into())
            .unwrap();
    }

    write_embedded(embedded_dir.path(), 8);
    let manager = DataManager::new(
        DirectoryStore::new(data_dir.path()),
        DirectoryEmbeddedData::new(embedded_dir.path()),
        StoreConfig::default(),
    );
    let dataset = manager.dataset(key).unwrap();
    assert_eq!(dataset.revision(), 8);
    assert!(!dataset.as_hash_prefixes().unwrap().contains("deadbeef"));
}

#[test]
fn test_persist_on_apply_disabled_keeps_disk_untouched() {
    let embedded_dir = tempfile::tempdir().unwrap();
    let data_dir = tempfile::tempdir().unwrap();
    write_embedded(embedded_dir.path(), 1);

    let config = StoreConfig {
        persist_on_apply: false,
        ..StoreConfig::default()
    };
    let store = DirectoryStore::new(data_dir.path());
    let manager = DataManager::new(store.clone(), DirectoryEmbeddedData::new(embedded_dir.path()), config);

    let key = StoredDataType::HashPrefixSet(ThreatKind::Phishing);
    manager
        .apply_change_set(key, ChangeSetResponse::replacing(2, strings(&["aaaa0000"])).into())
        .unwrap();
    assert_eq!(store.load(key).unwrap(), None);

    manager.persist(key).unwrap();
    assert!(store.load(key).unwrap().is_some());
}

#[test]
fn test_corrupt_embedded_bundle_without_persisted_data_fails() {
    let embedded_dir = tempfile::tempdir().unwrap();
    let data_dir = tempfile::tempdir().unwrap();
    write_embedded(embedded_dir.path(), 1);

    let key = StoredDataType::HashPrefixSet(ThreatKind::Malware);
    let path = embedded_dir.path().join(key.file_name());
    let tampered = fs::read_to_string(&path).unwrap().replace("11223344", "11223345");
    fs::write(&path, tampered).unwrap();

    let manager = DataManager::new(
        DirectoryStore::new(data_dir.path()),
        DirectoryEmbeddedData::new(embedded_dir.path()),
        StoreConfig::default(),
    );
    assert!(matches!(manager.dataset(key), Err(StoreError::Decode { .. })));
    assert!(manager.dataset(StoredDataType::HashPrefixSet(ThreatKind::Phishing)).is_ok());
}

#[test]
fn test_readers_see_whole_revisions_during_updates() {
    let embedded_dir = tempfile::tempdir().unwrap();
    let data_dir = tempfile::tempdir().unwrap();
    write_embedded(embedded_dir.path(), 0);

    let manager = Arc::new(DataManager::new(
        DirectoryStore::new(data_dir.path()),
        DirectoryEmbeddedData::new(embedded_dir.path()),
        StoreConfig {
            persist_on_apply: false,
            ..StoreConfig::default()
        },
    ));
    let key = StoredDataType::HashPrefixSet(ThreatKind::Phishing);
    manager.load_all().unwrap();

    let writer = {
        let manager = Arc::clone(&manager);
        thread::spawn(move || {
            for revision in 1..=50u64 {
                // Each revision replaces the set with exactly `revision` prefixes.
                let items = (0..revision).map(|i| format!("{:08x}", i)).collect();
                let change_set = AnyChangeSet::HashPrefixes(ChangeSetResponse::replacing(revision, items));
                manager.apply_change_set(key, change_set).unwrap();
            }
        })
    };

    let readers: Vec<_> = (0..4)
        .map(|_| {
            let manager = Arc::clone(&manager);
            thread::spawn(move || {
                for _ in 0..200 {
                    let dataset = manager.dataset(key).unwrap();
                    let revision = dataset.revision();
                    if revision > 0 {
                        assert_eq!(dataset.len() as u64, revision);
                    }
                }
            })
        })
        .collect();

    writer.join().unwrap();
    for reader in readers {
        reader.join().unwrap();
    }
    assert_eq!(manager.revision(key).unwrap(), 50);
}
