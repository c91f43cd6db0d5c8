//! Catalog hot reload as seen by the recompute engine.

mod support;

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use filetime::FileTime;
use mr_common::EntityId;
use mr_core::catalog::CatalogSource;
use mr_core::{BatchOptions, CatalogHandle, Engine, MemoryStore, NoopSink};
use support::corpus::monster;
use tempfile::tempdir;

const CATALOG_V1: &str = r#"
schema_version = 1

[[tags]]
code = "debuff_drowsy"
category = "debuff"
patterns = ['(?i)\bdrowsy\b']
signals = ["hard_control"]
"#;

const CATALOG_V2: &str = r#"
schema_version = 1

[[tags]]
code = "debuff_drowsy"
category = "debuff"
patterns = ['(?i)\bdrowsy\b']
signals = ["hard_control"]

[[tags]]
code = "utility_doze"
category = "utility"
patterns = ['(?i)\bdoz(e|es|ing)\b']
signals = ["priority"]
"#;

fn write_with_mtime(path: &Path, content: &str, unix_secs: i64) {
    std::fs::write(path, content).unwrap();
    filetime::set_file_mtime(path, FileTime::from_unix_time(unix_secs, 0)).unwrap();
}

#[test]
fn test_engine_picks_up_catalog_edits() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("tags.toml");
    write_with_mtime(&path, CATALOG_V1, 1_700_000_000);

    let store = Arc::new(MemoryStore::with_entities(vec![monster(
        1,
        "Sandman",
        &["Makes the target drowsy.", "Dozes off to recover."],
    )]));
    let catalog = Arc::new(CatalogHandle::with_file(&path, Duration::ZERO));
    let engine = Engine::new(store.clone(), catalog.clone());

    let first = engine.recompute_one(EntityId(1)).unwrap();
    assert_eq!(first.inputs.matched_tags, vec!["debuff_drowsy".to_string()]);
    assert_eq!(first.inputs.signals.get("hard_control"), Some(&1.0));

    write_with_mtime(&path, CATALOG_V2, 1_700_000_100);
    let second = engine.recompute_one(EntityId(1)).unwrap();
    assert_ne!(second.inputs.catalog_version, first.inputs.catalog_version);
    assert!(second.inputs.matched_tags.contains(&"utility_doze".to_string()));
    assert!(store.get(EntityId(1)).unwrap().tags.contains("utility_doze"));

    // A broken edit keeps the last good snapshot in service
    write_with_mtime(&path, "schema_version = [", 1_700_000_200);
    let third = engine.recompute_one(EntityId(1)).unwrap();
    assert_eq!(third.inputs.catalog_version, second.inputs.catalog_version);
    assert_eq!(
        catalog.current().unwrap().version(),
        second.inputs.catalog_version
    );
}

#[test]
fn test_only_stale_batch_reprocesses_after_catalog_edit() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("tags.toml");
    write_with_mtime(&path, CATALOG_V1, 1_700_000_000);

    let store = Arc::new(MemoryStore::with_entities(vec![
        monster(1, "Sandman", &["Makes the target drowsy."]),
        monster(2, "Dormouse", &["Dozes between blows."]),
    ]));
    let catalog = Arc::new(CatalogHandle::with_file(&path, Duration::ZERO));
    let engine = Engine::new(store.clone(), catalog);
    let options = BatchOptions {
        only_stale: true,
        ..BatchOptions::default()
    };

    assert_eq!(engine.recompute_all(&options, &NoopSink).unwrap().processed, 2);
    let settled = engine.recompute_all(&options, &NoopSink).unwrap();
    assert_eq!((settled.processed, settled.skipped), (0, 2));

    write_with_mtime(&path, CATALOG_V2, 1_700_000_100);
    let after_edit = engine.recompute_all(&options, &NoopSink).unwrap();
    assert_eq!((after_edit.processed, after_edit.skipped), (2, 0));
    assert!(store.get(EntityId(2)).unwrap().tags.contains("utility_doze"));
}

#[test]
fn test_in_flight_snapshot_survives_swap() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("tags.toml");
    write_with_mtime(&path, CATALOG_V1, 1_700_000_000);

    let handle = CatalogHandle::with_file(&path, Duration::ZERO);
    let held = handle.acquire().unwrap();
    assert_eq!(held.len(), 1);

    write_with_mtime(&path, CATALOG_V2, 1_700_000_100);
    let fresh = handle.reload(true).unwrap();
    assert_eq!(fresh.len(), 2);

    // The earlier snapshot is untouched by the swap
    assert_eq!(held.len(), 1);
    assert!(held.get("utility_doze").is_none());
    assert_ne!(held.version(), fresh.version());
}
