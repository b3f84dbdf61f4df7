//! End-to-end tests: box files on disk → published catalog

mod common;

use boxshadow_core::error::RebuildError;
use boxshadow_core::{CatalogStore, FilenameLayout, Indexer, ShadowConfig};
use common::*;
use pretty_assertions::assert_eq;
use std::path::Path;
use std::sync::Arc;
use tempfile::TempDir;

fn config_for(dirs: &[&Path]) -> ShadowConfig {
    ShadowConfig {
        directories: dirs.iter().map(|d| d.to_path_buf()).collect(),
        hostname: "boxes.test".into(),
        port: 8080,
        ..Default::default()
    }
}

#[tokio::test]
async fn test_rebuild_indexes_all_formats() {
    init_test_logging();
    let temp = TempDir::new().unwrap();
    write_box(temp.path(), "acme", "web", "1.0", "virtualbox");
    write_box(temp.path(), "acme", "web", "1.10", "virtualbox");
    write_zip_box(
        temp.path(),
        "acme-VAGRANTSLASH-web__1.10__vmware_desktop.box",
        &[("metadata.json", &metadata("vmware_desktop"))],
    );
    write_tar_box(
        temp.path(),
        "other-VAGRANTSLASH-db__2.0__libvirt.box",
        &[("metadata.json", &metadata("libvirt"))],
    );

    let store = Arc::new(CatalogStore::new());
    let indexer = Indexer::new(config_for(&[temp.path()]), store.clone());
    let report = indexer.rebuild().await.unwrap();

    assert_eq!(report.generation, 1);
    assert_eq!(report.summary.owners, 2);
    assert_eq!(report.summary.boxes, 2);
    assert_eq!(report.summary.versions, 3);
    assert_eq!(report.summary.providers, 4);
    assert!(report.skipped.is_empty());

    let web = store.get_box("acme", "web").unwrap();
    assert_eq!(web.current_version().unwrap().version, "1.10");
    assert_eq!(web.current_version().unwrap().providers.len(), 2);
    assert_eq!(
        web.current_version().unwrap().provider("vmware_desktop").unwrap().download_url,
        "http://boxes.test:8080/acme/web/1.10/vmware_desktop/vmware_desktop.box"
    );
}

#[tokio::test]
async fn test_bad_files_do_not_block_siblings() {
    init_test_logging();
    let temp = TempDir::new().unwrap();
    let good = write_box(temp.path(), "acme", "web", "1.0", "virtualbox");
    std::fs::write(temp.path().join("not-a-valid-name.box"), b"whatever").unwrap();
    write_tar_gz_box(
        temp.path(),
        "acme-VAGRANTSLASH-empty__1.0__virtualbox.box",
        &[("README", b"no metadata here")],
    );
    std::fs::write(
        temp.path().join("acme-VAGRANTSLASH-junk__1.0__virtualbox.box"),
        "plain text pretending to be a box file, which it is not ".repeat(16),
    )
    .unwrap();

    let store = Arc::new(CatalogStore::new());
    let report = Indexer::new(config_for(&[temp.path()]), store.clone())
        .rebuild()
        .await
        .unwrap();

    assert_eq!(report.summary.boxes, 1);
    assert_eq!(report.skipped.len(), 3);
    assert!(store.box_available("acme", "web"));
    assert!(!store.box_available("acme", "empty"));
    assert!(!store.box_available("acme", "junk"));
    assert_eq!(
        store.get_box_file_location("acme", "web", "virtualbox", "1.0"),
        Some(good)
    );
}

#[tokio::test]
async fn test_two_providers_resolve_to_their_own_files() {
    let temp = TempDir::new().unwrap();
    let vbox = write_box(temp.path(), "benphegan", "dev", "2.0", "virtualbox");
    let vmware = write_box(temp.path(), "benphegan", "dev", "2.0", "vmware");

    let store = Arc::new(CatalogStore::new());
    Indexer::new(config_for(&[temp.path()]), store.clone())
        .rebuild()
        .await
        .unwrap();

    assert_eq!(store.get_box_file_location("benphegan", "dev", "virtualbox", "2.0"), Some(vbox));
    assert_eq!(store.get_box_file_location("benphegan", "dev", "vmware", "2.0"), Some(vmware));
}

#[tokio::test]
async fn test_multiple_directories_and_removal() {
    let first = TempDir::new().unwrap();
    let second = TempDir::new().unwrap();
    write_box(first.path(), "acme", "web", "1.0", "virtualbox");
    let removed = write_box(second.path(), "acme", "db", "3.0", "virtualbox");

    let store = Arc::new(CatalogStore::new());
    let indexer = Indexer::new(config_for(&[first.path(), second.path()]), store.clone());
    indexer.rebuild().await.unwrap();
    assert!(store.box_available("acme", "web"));
    assert!(store.box_available("acme", "db"));

    std::fs::remove_file(removed).unwrap();
    indexer.rebuild().await.unwrap();
    assert!(!store.box_available("acme", "db"));
    assert_eq!(store.generation(), 2);
}

#[tokio::test]
async fn test_provider_version_layout() {
    let temp = TempDir::new().unwrap();
    write_tar_gz_box(
        temp.path(),
        "benphegan-VAGRANTSLASH-development__virtualbox__1.0.box",
        &[("metadata.json", &metadata("virtualbox"))],
    );

    let store = Arc::new(CatalogStore::new());
    let config = ShadowConfig {
        filename_layout: FilenameLayout::ProviderVersion,
        ..config_for(&[temp.path()])
    };
    Indexer::new(config, store.clone()).rebuild().await.unwrap();

    let entry = store.get_box("benphegan", "development").unwrap();
    assert_eq!(entry.current_version().unwrap().version, "1.0");
}

#[tokio::test]
async fn test_filename_only_mode_skips_archive_reads() {
    let temp = TempDir::new().unwrap();
    std::fs::write(temp.path().join("acme-VAGRANTSLASH-web__1.0__virtualbox.box"), b"").unwrap();

    let store = Arc::new(CatalogStore::new());
    let config = ShadowConfig {
        inspect_archives: false,
        ..config_for(&[temp.path()])
    };
    Indexer::new(config, store.clone()).rebuild().await.unwrap();
    assert!(store.box_available("acme", "web"));
}

#[tokio::test]
async fn test_empty_and_missing_directories_give_empty_catalog() {
    let temp = TempDir::new().unwrap();
    let store = Arc::new(CatalogStore::new());
    let config = config_for(&[temp.path(), Path::new("/nonexistent/boxshadow")]);

    let report = Indexer::new(config, store.clone()).rebuild().await.unwrap();
    assert_eq!(report.summary, Default::default());
    assert!(store.current_catalog().is_empty());

    let report = Indexer::new(config_for(&[]), store.clone()).rebuild().await.unwrap();
    assert_eq!(report.summary.boxes, 0);
}

#[tokio::test]
async fn test_served_json_omits_local_paths() {
    let temp = TempDir::new().unwrap();
    write_box(temp.path(), "acme", "web", "1.0", "virtualbox");

    let store = Arc::new(CatalogStore::new());
    Indexer::new(config_for(&[temp.path()]), store.clone())
        .rebuild()
        .await
        .unwrap();

    let json = store.get_box("acme", "web").unwrap().to_json().unwrap();
    let value: serde_json::Value = serde_json::from_str(&json).unwrap();
    assert_eq!(value["name"], "acme/web");
    assert_eq!(value["current_version"]["providers"][0]["hosted"], "true");
    assert!(!json.contains(&temp.path().display().to_string()));
}

#[tokio::test]
async fn test_archive_provider_mismatch_keeps_filename_provider() {
    init_test_logging();
    let temp = TempDir::new().unwrap();
    let path = write_tar_gz_box(
        temp.path(),
        "acme-VAGRANTSLASH-web__1.0__virtualbox.box",
        &[("metadata.json", &metadata("libvirt"))],
    );

    let store = Arc::new(CatalogStore::new());
    let report = Indexer::new(config_for(&[temp.path()]), store.clone())
        .rebuild()
        .await
        .unwrap();

    assert!(report.skipped.is_empty());
    assert_eq!(store.get_box_file_location("acme", "web", "virtualbox", "1.0"), Some(path));
    assert!(store.get_box_file_location("acme", "web", "libvirt", "1.0").is_none());
}

#[tokio::test]
async fn test_failed_rebuild_keeps_previous_catalog() {
    init_test_logging();
    let root = TempDir::new().unwrap();
    let boxes = root.path().join("boxes");
    std::fs::create_dir(&boxes).unwrap();
    write_box(&boxes, "acme", "web", "1.0", "virtualbox");

    let store = Arc::new(CatalogStore::new());
    let indexer = Indexer::new(config_for(&[boxes.as_path()]), store.clone());
    indexer.rebuild().await.unwrap();
    let published = store.current_catalog();

    // The directory still exists but can no longer be listed
    std::fs::remove_dir_all(&boxes).unwrap();
    std::fs::write(&boxes, b"not a directory").unwrap();

    let err = indexer.rebuild().await.unwrap_err();
    assert!(matches!(err, RebuildError::Directory { .. }), "got {err:?}");
    assert!(indexer.rebuild_or_keep().await.is_none());

    assert_eq!(store.generation(), 1);
    assert_eq!(*store.current_catalog(), *published);
    assert!(store.box_available("acme", "web"));
}
