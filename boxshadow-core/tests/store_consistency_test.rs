//! Readers racing with `replace` only ever see whole catalogs

use boxshadow_core::catalog::{Catalog, CatalogBuilder, ParsedArtifact};
use boxshadow_core::CatalogStore;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;

/// A catalog whose every box carries the same version string `tag`
fn generation_catalog(tag: usize) -> Catalog {
    let artifacts = (0..20)
        .map(|i| ParsedArtifact {
            owner: format!("owner{}", i % 4),
            boxname: format!("box{i}"),
            version: format!("{tag}.0"),
            provider: "virtualbox".into(),
            path: PathBuf::from(format!("/boxes/{tag}/{i}.box")),
        })
        .collect();
    CatalogBuilder::from_host("localhost", 8099).build(artifacts)
}

#[test]
fn test_readers_never_observe_mixed_catalogs() {
    let store = Arc::new(CatalogStore::with_catalog(generation_catalog(0)));
    let done = Arc::new(AtomicBool::new(false));

    let readers: Vec<_> = (0..4)
        .map(|_| {
            let store = store.clone();
            let done = done.clone();
            thread::spawn(move || {
                let mut checked = 0usize;
                while !done.load(Ordering::Relaxed) || checked == 0 {
                    let snapshot = store.current_catalog();
                    let versions: Vec<&str> = snapshot
                        .boxes()
                        .map(|b| b.current_version().unwrap().version.as_str())
                        .collect();
                    assert_eq!(versions.len(), 20);
                    assert!(
                        versions.iter().all(|v| *v == versions[0]),
                        "snapshot mixes builds: {versions:?}"
                    );
                    checked += 1;
                }
                checked
            })
        })
        .collect();

    for tag in 1..200 {
        store.replace(generation_catalog(tag));
    }
    done.store(true, Ordering::Relaxed);

    for reader in readers {
        assert!(reader.join().unwrap() > 0);
    }
    assert_eq!(store.generation(), 199);
}

#[test]
fn test_lookup_absent_is_distinct_from_found() {
    let store = CatalogStore::with_catalog(generation_catalog(1));
    assert!(store.get_box("owner0", "box0").is_some());
    assert!(store.get_box("owner0", "box1").is_none());
    assert!(store.get_box("nobody", "box0").is_none());
}
