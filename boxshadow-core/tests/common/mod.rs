//! Test helper functions for integration tests
//!
//! Shared across test files using the tests/common/ pattern. Box fixtures
//! are generated on the fly so every archive format can be exercised.

#![allow(dead_code)]

use flate2::write::GzEncoder;
use flate2::Compression;
use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Once;

/// Initialize logging for tests (only once per test run)
static INIT: Once = Once::new();

pub fn init_test_logging() {
    INIT.call_once(|| {
        use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

        let _ = tracing_subscriber::registry()
            .with(
                tracing_subscriber::fmt::layer()
                    .with_test_writer()
                    .with_target(true)
                    .with_level(true),
            )
            .with(tracing_subscriber::filter::EnvFilter::from_default_env())
            .try_init();
    });
}

pub fn metadata(provider: &str) -> Vec<u8> {
    format!(r#"{{"provider": "{provider}"}}"#).into_bytes()
}

fn append_tar<W: Write>(builder: &mut tar::Builder<W>, entries: &[(&str, &[u8])]) {
    for (name, data) in entries {
        let mut header = tar::Header::new_gnu();
        header.set_size(data.len() as u64);
        header.set_mode(0o644);
        header.set_cksum();
        builder.append_data(&mut header, name, *data).unwrap();
    }
}

/// Write a gzip-compressed tar box
pub fn write_tar_gz_box(dir: &Path, name: &str, entries: &[(&str, &[u8])]) -> PathBuf {
    let path = dir.join(name);
    let encoder = GzEncoder::new(File::create(&path).unwrap(), Compression::default());
    let mut builder = tar::Builder::new(encoder);
    append_tar(&mut builder, entries);
    builder.into_inner().unwrap().finish().unwrap();
    path
}

/// Write an uncompressed tar box
pub fn write_tar_box(dir: &Path, name: &str, entries: &[(&str, &[u8])]) -> PathBuf {
    let path = dir.join(name);
    let mut builder = tar::Builder::new(File::create(&path).unwrap());
    append_tar(&mut builder, entries);
    builder.into_inner().unwrap().flush().unwrap();
    path
}

/// Write a zip box
pub fn write_zip_box(dir: &Path, name: &str, entries: &[(&str, &[u8])]) -> PathBuf {
    let path = dir.join(name);
    let mut zip = zip::ZipWriter::new(File::create(&path).unwrap());
    for (entry, data) in entries {
        let options = zip::write::SimpleFileOptions::default()
            .compression_method(zip::CompressionMethod::Stored);
        zip.start_file(*entry, options).unwrap();
        zip.write_all(data).unwrap();
    }
    zip.finish().unwrap();
    path
}

/// A valid tar.gz box for `provider` named with the version-first layout
pub fn write_box(dir: &Path, owner: &str, boxname: &str, version: &str, provider: &str) -> PathBuf {
    let name = format!("{owner}-VAGRANTSLASH-{boxname}__{version}__{provider}.box");
    write_tar_gz_box(
        dir,
        &name,
        &[("metadata.json", &metadata(provider)), ("box-disk1.vmdk", b"disk")],
    )
}
