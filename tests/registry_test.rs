//! Registry document compatibility and maintenance resets

mod common;

use common::t0;
use homily::models::{Category, ContentItem, Outcome, PublicationRecord};
use homily::storage::{RegistryState, RegistryStore, ResetScope, SCHEMA_VERSION};
use std::fs;
use tempfile::TempDir;

fn store(dir: &TempDir) -> RegistryStore {
    RegistryStore::new(dir.path().join("registry.json"))
}

fn populated() -> RegistryState {
    let mut state = RegistryState::new();
    let text = ContentItem::text("text-01.txt", "Bendito sea el Señor");
    let link = ContentItem::link("item-001.txt", "https://youtu.be/a", Vec::new());

    state.record_success(
        PublicationRecord::new(t0(), &text, Outcome::Success, 1, 800),
        5,
    );
    state.record_success(
        PublicationRecord::new(t0(), &link, Outcome::Success, 2, 1200),
        5,
    );
    state.harvest.used_references.insert("youtu.be/a".into());
    state.harvest.next_number = 12;
    state
}

#[test]
fn test_legacy_document_is_migrated() {
    let dir = TempDir::new().unwrap();
    let store = store(&dir);

    // history only, plus one record that no longer parses
    let legacy = r#"{
        "history": [
            {
                "timestamp": "2024-03-10T08:00:00Z",
                "item_id": "text-03.txt",
                "category": "primary",
                "outcome": "success",
                "attempts": 1,
                "duration_ms": 900,
                "preview": "Salmo 23"
            },
            { "timestamp": "yesterday" }
        ],
        "rotation": { "recent": ["text-03.txt", "text-03.txt"] }
    }"#;
    fs::write(store.path(), legacy).unwrap();

    let state = store.load().unwrap();
    assert_eq!(state.schema_version, SCHEMA_VERSION);
    assert_eq!(state.history.len(), 1);
    assert_eq!(state.rotation.recent, vec!["text-03.txt"]);
    assert_eq!(state.alternation.last_category, Some(Category::Primary));
    assert_eq!(state.rate_gate.last_success_at, Some(t0()));
    assert_eq!(state.stats.successes, 1);
    assert_eq!(state.harvest.next_number, 1);

    // loading twice gives the same state
    store.save(&state).unwrap();
    assert_eq!(store.load().unwrap(), state);
}

#[test]
fn test_invalid_section_falls_back_to_default() {
    let dir = TempDir::new().unwrap();
    let store = store(&dir);
    fs::write(
        store.path(),
        r#"{ "schema_version": 2, "harvest": "oops", "rate_gate": {} }"#,
    )
    .unwrap();

    let state = store.load().unwrap();
    assert_eq!(state.harvest.next_number, 1);
    assert!(state.harvest.used_references.is_empty());
    assert_eq!(state.rate_gate.last_success_at, None);
}

#[test]
fn test_non_object_document_is_preserved() {
    let dir = TempDir::new().unwrap();
    let store = store(&dir);
    fs::write(store.path(), "[1, 2, 3]").unwrap();

    let state = store.load().unwrap();
    assert_eq!(state, RegistryState::new());
    assert!(!store.path().exists());

    let preserved = fs::read_dir(dir.path())
        .unwrap()
        .filter_map(|e| e.ok())
        .any(|e| e.file_name().to_string_lossy().contains(".corrupt-"));
    assert!(preserved);
}

#[test]
fn test_invalid_utf8_document_is_preserved() {
    let dir = TempDir::new().unwrap();
    let store = store(&dir);
    fs::write(store.path(), [0xff, 0xfe, 0x7b, 0x80]).unwrap();

    let state = store.load().unwrap();
    assert_eq!(state, RegistryState::new());
    assert!(!store.path().exists());

    // the next save and load work normally
    store.save(&populated()).unwrap();
    assert_eq!(store.load().unwrap().history.len(), 2);
}

#[test]
fn test_reset_recent_keeps_history() {
    let dir = TempDir::new().unwrap();
    let store = store(&dir);
    store.save(&populated()).unwrap();

    let state = store.reset(ResetScope::Recent).unwrap();
    assert!(state.rotation.recent.is_empty());
    assert_eq!(state.history.len(), 2);
    assert_eq!(store.load().unwrap(), state);
}

#[test]
fn test_reset_harvest_keeps_numbering() {
    let dir = TempDir::new().unwrap();
    let store = store(&dir);
    store.save(&populated()).unwrap();

    let state = store.reset(ResetScope::Harvest).unwrap();
    assert!(state.harvest.used_references.is_empty());
    assert_eq!(state.harvest.next_number, 12);
    assert_eq!(state.history.len(), 2);
}

#[test]
fn test_reset_history_clears_cursors() {
    let dir = TempDir::new().unwrap();
    let store = store(&dir);
    store.save(&populated()).unwrap();

    let state = store.reset(ResetScope::History).unwrap();
    assert!(state.history.is_empty());
    assert_eq!(state.stats.successes, 0);
    assert_eq!(state.alternation.last_category, None);
    assert_eq!(state.rate_gate.last_success_at, None);
    assert!(state.harvest.used_references.contains("youtu.be/a"));

    // cursors stay empty after a reload
    let reloaded = store.load().unwrap();
    assert_eq!(reloaded.alternation.last_category, None);
}
