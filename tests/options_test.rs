//! User edits to the option lists, stored next to the session

use flora_track::storage::{JsonFileStorage, OPTIONS_FILE_NAME};
use flora_track_common::{OptionEdits, ReferenceCategory, ReferenceDataStore};
use tempfile::tempdir;

#[test]
fn test_option_edits_survive_reload() {
    let dir = tempdir().expect("Failed to create temp dir");
    let storage = JsonFileStorage::new(dir.path());
    assert!(storage.load_option_edits().is_empty());

    let mut reference = ReferenceDataStore::initialize();
    assert!(reference.add_option(ReferenceCategory::Stores, "Livorno Centro"));
    let removed = reference.data().chains[0].clone();
    assert!(reference.remove_option(ReferenceCategory::Chains, &removed));

    let mut edits = OptionEdits::default();
    edits.record_add(ReferenceCategory::Stores, "Livorno Centro");
    edits.record_remove(ReferenceCategory::Chains, &removed);
    storage.save_option_edits(&edits).unwrap();

    let mut reloaded = ReferenceDataStore::initialize();
    reloaded.apply_edits(&storage.load_option_edits());
    assert_eq!(reloaded.data(), reference.data());
}

#[test]
fn test_unreadable_option_edits_are_ignored() {
    let dir = tempdir().expect("Failed to create temp dir");
    std::fs::write(dir.path().join(OPTIONS_FILE_NAME), "[1, 2").unwrap();

    let storage = JsonFileStorage::new(dir.path());
    assert_eq!(storage.load_option_edits(), OptionEdits::default());
}
