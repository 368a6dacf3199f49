//! External-store backend tests. These need a reachable PostgreSQL instance
//! and are skipped when DATABASE_URL is not set.

use std::fs;
use std::path::{Path, PathBuf};
use tempfile::tempdir;

use dupelink::config::{AppConfig, BackendKind};
use dupelink::{DedupeEngine, SilentReporter};

fn database_url() -> Option<String> {
    std::env::var("DATABASE_URL").ok()
}

fn create_test_tree(root: &Path) {
    fs::create_dir_all(root.join("folder_a")).unwrap();
    fs::create_dir_all(root.join("folder_b")).unwrap();
    fs::write(root.join("folder_a/unique_a.txt"), "unique content a").unwrap();
    fs::write(root.join("folder_b/unique_b.txt"), "unique content b").unwrap();
    fs::write(root.join("folder_a/shared.txt"), "shared content xyz").unwrap();
    fs::write(root.join("folder_b/shared.txt"), "shared content xyz").unwrap();
    let large = vec![0xAAu8; 4096];
    fs::write(root.join("folder_a/large_1.bin"), &large).unwrap();
    fs::write(root.join("folder_b/large_2.bin"), &large).unwrap();
    fs::write(root.join("empty.dat"), "").unwrap();
    fs::write(root.join("linked_a"), "hardlinked contents").unwrap();
    fs::hard_link(root.join("linked_a"), root.join("linked_b")).unwrap();
}

fn membership(outcome: &dupelink::RunOutcome) -> Vec<(String, Vec<PathBuf>)> {
    outcome
        .sets
        .iter()
        .map(|set| {
            (
                set.digest.clone(),
                set.members.iter().map(|m| m.path.clone()).collect(),
            )
        })
        .collect()
}

#[test]
fn test_external_store_matches_in_memory() {
    let Some(url) = database_url() else {
        eprintln!("DATABASE_URL not set; skipping external-store test");
        return;
    };

    let tmp = tempdir().unwrap();
    let root = tmp.path().join("scan_parity");
    create_test_tree(&root);

    let base = AppConfig {
        root_paths: vec![root.to_string_lossy().into_owned()],
        ..Default::default()
    };

    let in_memory = DedupeEngine::new(base.clone())
        .run(&SilentReporter)
        .unwrap();

    let store_config = AppConfig {
        backend: BackendKind::ExternalStore,
        database_url: Some(url),
        batch_size: 3, // small batches to exercise chunked inserts
        ..base
    };
    let external = DedupeEngine::new(store_config)
        .run(&SilentReporter)
        .unwrap();

    // Identical duplicate-set membership: same digests, same path sets.
    assert_eq!(membership(&in_memory), membership(&external));

    // Identical elimination accounting.
    assert_eq!(
        in_memory.stats.files_cataloged,
        external.stats.files_cataloged
    );
    assert_eq!(
        in_memory.stats.zero_byte_files,
        external.stats.zero_byte_files
    );
    assert_eq!(
        in_memory.stats.hardlink_eliminations,
        external.stats.hardlink_eliminations
    );
    assert_eq!(
        in_memory.stats.unique_size_eliminations,
        external.stats.unique_size_eliminations
    );
    assert_eq!(external.sets.len(), 2);
}

#[test]
fn test_external_store_run_owns_and_resets_its_table() {
    let Some(url) = database_url() else {
        eprintln!("DATABASE_URL not set; skipping external-store test");
        return;
    };

    let tmp = tempdir().unwrap();
    let root = tmp.path().join("scan_reset");
    fs::create_dir_all(&root).unwrap();
    fs::write(root.join("p"), "pair contents").unwrap();
    fs::write(root.join("q"), "pair contents").unwrap();

    let config = AppConfig {
        root_paths: vec![root.to_string_lossy().into_owned()],
        backend: BackendKind::ExternalStore,
        database_url: Some(url),
        ..Default::default()
    };

    // Two consecutive runs must see the same tree, not stale rows.
    let first = DedupeEngine::new(config.clone()).run(&SilentReporter).unwrap();
    let second = DedupeEngine::new(config).run(&SilentReporter).unwrap();

    assert_eq!(first.sets.len(), 1);
    assert_eq!(membership(&first), membership(&second));
}
