//! Integration tests for the complete import pipeline
//!
//! These tests run a descriptor tree on disk through the directory source,
//! batch driver and reconciler into a SQLite database:
//! - End-to-end import of a tagged tree
//! - Re-import stability
//! - Truncate-before-import
//! - Partial-failure isolation
//!
//! Run with: cargo test --test integration_tests

use chrono::{DateTime, TimeZone, Utc};
use oniontree_ingest::{
    import_directory, BatchDriver, CancelToken, ImportConfig, ItemErrorClass, Reconciler,
};
use oniontree_storage::{EntityKind, Row, SqliteStore, Store, StoreTx};
use std::fs;
use std::path::Path;
use tempfile::tempdir;

fn write(root: &Path, rel: &str, body: &str) {
    let path = root.join(rel);
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, body).unwrap();
}

fn import(store: &mut SqliteStore, root: &Path, truncate: bool) -> oniontree_ingest::ImportReport {
    let mut config = ImportConfig::with_root(root);
    config.truncate = truncate;
    import_directory(store, config, CancelToken::new()).unwrap()
}

const MY_SERVICE: &str = r#"
name: "My Service"
description: "Example hidden service"
urls:
  - "http://example.onion"
public_keys:
  - id: "k1"
    user_id: "admin@example"
    fingerprint: "0123ABCD"
    value: "-----BEGIN PGP PUBLIC KEY BLOCK-----"
"#;

// ============================================================================
// End-to-end scenario
// ============================================================================

#[test]
fn test_single_descriptor_end_to_end() {
    let dir = tempdir().unwrap();
    let tree = dir.path().join("tagged");
    write(&tree, "category-a/svc1.yaml", MY_SERVICE);
    let mut store = SqliteStore::open(dir.path().join("oniontree.db")).unwrap();

    let report = import(&mut store, &tree, false);
    assert_eq!(report.succeeded, 1);
    assert!(report.failed.is_empty());

    let counts = store.counts().unwrap();
    assert_eq!(counts.services, 1);
    assert_eq!(counts.tags, 1);
    assert_eq!(counts.urls, 1);
    assert_eq!(counts.public_keys, 1);
    assert_eq!(counts.associations(), 3);

    let tx = store.begin().unwrap();
    let service = tx
        .find(EntityKind::Service, "my-service")
        .unwrap()
        .and_then(Row::into_service)
        .expect("service by slug");
    assert_eq!(service.name, "My Service");

    let links = tx.associations(service.id).unwrap();
    let tag = tx.find(EntityKind::Tag, "category-a").unwrap().unwrap();
    let url = tx.find(EntityKind::Url, "http://example.onion").unwrap().unwrap();
    let key = tx.find(EntityKind::PublicKey, "k1").unwrap().unwrap();
    assert!(links.contains(EntityKind::Tag, tag.id()));
    assert!(links.contains(EntityKind::Url, url.id()));
    assert!(links.contains(EntityKind::PublicKey, key.id()));

    match key {
        Row::PublicKey(key) => {
            assert_eq!(key.owner_id, "admin@example");
            assert_eq!(key.fingerprint, "0123ABCD");
        }
        other => panic!("expected a public key row, got {other:?}"),
    }
}

#[test]
fn test_reimport_does_not_grow_store() {
    let dir = tempdir().unwrap();
    let tree = dir.path().join("tagged");
    write(&tree, "category-a/svc1.yaml", MY_SERVICE);
    write(&tree, "category-b/svc1.yaml", MY_SERVICE);
    write(
        &tree,
        "category-b/other.yaml",
        "name: Other\nurls: [http://example.onion, http://other.onion]\n",
    );
    let mut store = SqliteStore::open(dir.path().join("oniontree.db")).unwrap();

    import(&mut store, &tree, false);
    let first = store.counts().unwrap();
    assert_eq!(first.services, 2);
    assert_eq!(first.tags, 2);
    assert_eq!(first.urls, 2);
    assert_eq!(first.service_tags, 3);

    let report = import(&mut store, &tree, false);
    assert_eq!(report.created.services, 0);
    assert_eq!(report.created.associations, 0);
    assert_eq!(store.counts().unwrap(), first);
}

// ============================================================================
// Identity preservation
// ============================================================================

fn early() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2020, 5, 1, 12, 0, 0).unwrap()
}

#[test]
fn test_existing_service_keeps_id_and_creation_time() {
    let dir = tempdir().unwrap();
    let tree = dir.path().join("tagged");
    write(&tree, "forum/svc.yaml", "name: Svc\ndescription: first\n");
    let mut store = SqliteStore::open(dir.path().join("oniontree.db")).unwrap();

    let config = ImportConfig::with_root(&tree);
    BatchDriver::new(
        &mut store,
        config.clone(),
        Reconciler::new(CancelToken::new()).with_clock(early),
    )
    .run_import()
    .unwrap();

    write(&tree, "forum/svc.yaml", "name: Svc\ndescription: second\n");
    write(&tree, "market/svc.yaml", "name: SVC\n");
    import(&mut store, &tree, false);

    let tx = store.begin().unwrap();
    let service = tx
        .find(EntityKind::Service, "svc")
        .unwrap()
        .and_then(Row::into_service)
        .unwrap();
    assert_eq!(service.id, 1);
    assert_eq!(service.created_at, early());
    assert_eq!(service.description, "first");
    assert!(service.updated_at > early());
    assert_eq!(tx.associations(service.id).unwrap().tags.len(), 2);
}

// ============================================================================
// Truncate / reset
// ============================================================================

#[test]
fn test_truncate_reimport_matches_current_tree() {
    let dir = tempdir().unwrap();
    let tree = dir.path().join("tagged");
    write(&tree, "forum/a.yaml", "name: A\nurls: [http://a.onion]\n");
    write(&tree, "forum/b.yaml", "name: B\nurls: [http://b.onion]\n");
    let mut store = SqliteStore::open(dir.path().join("oniontree.db")).unwrap();
    import(&mut store, &tree, false);

    fs::remove_file(tree.join("forum/b.yaml")).unwrap();

    // Without truncation the removed descriptor's rows stay behind.
    import(&mut store, &tree, false);
    assert_eq!(store.counts().unwrap().services, 2);

    let report = import(&mut store, &tree, true);
    assert!(report.truncated);
    let counts = store.counts().unwrap();
    assert_eq!(counts.services, 1);
    assert_eq!(counts.urls, 1);
    assert_eq!(counts.tags, 1);
    assert_eq!(counts.associations(), 2);
}

// ============================================================================
// Partial failure isolation
// ============================================================================

#[test]
fn test_malformed_descriptor_is_isolated() {
    let dir = tempdir().unwrap();
    let tree = dir.path().join("tagged");
    for i in 0..4 {
        write(&tree, &format!("forum/svc{i}.yaml"), &format!("name: Service {i}\n"));
    }
    write(&tree, "forum/broken.yaml", "name: \"unterminated\n");
    let mut store = SqliteStore::open(dir.path().join("oniontree.db")).unwrap();

    let report = import(&mut store, &tree, false);
    assert_eq!(report.succeeded, 4);
    assert_eq!(report.failed.len(), 1);
    assert_eq!(report.failed[0].class, ItemErrorClass::Parse);
    assert!(report.failed[0].path.ends_with("broken.yaml"));
    assert_eq!(store.counts().unwrap().services, 4);
}
