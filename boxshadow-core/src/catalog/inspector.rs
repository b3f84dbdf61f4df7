//! Archive inspection
//!
//! A `.box` file is a zip, a gzip-compressed tar or a plain tar. Formats
//! are tried in that order; a later format is only attempted when the
//! earlier one fails to open or parse. Inside the archive the provider is
//! read from `metadata.json`. Old VirtualBox boxes have no metadata and
//! are recognised by their `.ovf` descriptor instead.

use flate2::read::GzDecoder;
use std::fs::File;
use std::io::{self, Read};
use std::path::{Component, Path};
use tracing::debug;

use crate::error::InspectError;

/// Name of the metadata entry inside a box archive
pub const METADATA_ENTRY: &str = "metadata.json";

/// Provider assumed for archives that only carry an OVF descriptor
pub const LEGACY_OVF_PROVIDER: &str = "virtualbox";

/// What a single pass over an archive found
#[derive(Debug)]
enum Scan {
    Metadata(Vec<u8>),
    Ovf,
    Nothing,
}

#[derive(Debug, Clone, Copy)]
enum Format {
    Zip,
    TarGz,
    Tar,
}

impl Format {
    const ORDER: [Format; 3] = [Format::Zip, Format::TarGz, Format::Tar];

    fn name(&self) -> &'static str {
        match self {
            Format::Zip => "zip",
            Format::TarGz => "tar.gz",
            Format::Tar => "tar",
        }
    }
}

/// Reads the provider a box archive declares
#[derive(Debug, Clone, Copy)]
pub struct ArchiveInspector {
    max_metadata_bytes: u64,
}

impl Default for ArchiveInspector {
    fn default() -> Self {
        Self {
            max_metadata_bytes: 64 * 1024,
        }
    }
}

impl ArchiveInspector {
    pub fn new(max_metadata_bytes: u64) -> Self {
        Self { max_metadata_bytes }
    }

    /// Determine the provider of the box at `path`
    pub fn inspect(&self, path: &Path) -> Result<String, InspectError> {
        let mut last_error = None;

        for format in Format::ORDER {
            match self.scan(path, format) {
                Ok(scan) => {
                    debug!("{} opened as {}", path.display(), format.name());
                    return self.resolve(path, scan);
                }
                Err(e) => {
                    debug!("{} is not a {} archive: {}", path.display(), format.name(), e);
                    last_error = Some(e);
                }
            }
        }

        Err(InspectError::ArchiveOpen {
            path: path.to_path_buf(),
            source: last_error
                .unwrap_or_else(|| io::Error::new(io::ErrorKind::InvalidData, "unrecognised archive")),
        })
    }

    fn resolve(&self, path: &Path, scan: Scan) -> Result<String, InspectError> {
        match scan {
            Scan::Metadata(bytes) => parse_provider(&bytes).map_err(|source| {
                InspectError::MalformedMetadata {
                    path: path.to_path_buf(),
                    source,
                }
            }),
            Scan::Ovf => {
                debug!(
                    "No {} in {}, found OVF descriptor; assuming {}",
                    METADATA_ENTRY,
                    path.display(),
                    LEGACY_OVF_PROVIDER
                );
                Ok(LEGACY_OVF_PROVIDER.to_string())
            }
            Scan::Nothing => Err(InspectError::MetadataNotFound {
                path: path.to_path_buf(),
            }),
        }
    }

    fn scan(&self, path: &Path, format: Format) -> io::Result<Scan> {
        let file = File::open(path)?;
        match format {
            Format::Zip => self.scan_zip(file),
            Format::TarGz => self.scan_tar(GzDecoder::new(file)),
            Format::Tar => self.scan_tar(file),
        }
    }

    fn scan_zip(&self, file: File) -> io::Result<Scan> {
        let mut archive = zip::ZipArchive::new(file).map_err(zip_to_io)?;
        let mut ovf = false;

        for i in 0..archive.len() {
            let entry = archive.by_index(i).map_err(zip_to_io)?;
            let name = Path::new(entry.name()).to_path_buf();
            if is_metadata(&name) {
                return self.read_metadata(entry).map(Scan::Metadata);
            }
            ovf |= is_ovf(&name);
        }

        Ok(if ovf { Scan::Ovf } else { Scan::Nothing })
    }

    /// A stream with no entries (an empty file, or only zero blocks) is not a tar
    fn scan_tar<R: Read>(&self, reader: R) -> io::Result<Scan> {
        let mut archive = tar::Archive::new(reader);
        let mut ovf = false;
        let mut entries = 0usize;

        for entry in archive.entries()? {
            let entry = entry?;
            entries += 1;
            let name = entry.path()?.into_owned();
            if is_metadata(&name) {
                return self.read_metadata(entry).map(Scan::Metadata);
            }
            ovf |= is_ovf(&name);
        }

        if entries == 0 {
            return Err(io::Error::new(io::ErrorKind::InvalidData, "archive has no entries"));
        }
        Ok(if ovf { Scan::Ovf } else { Scan::Nothing })
    }

    fn read_metadata<R: Read>(&self, entry: R) -> io::Result<Vec<u8>> {
        let mut buf = Vec::new();
        entry.take(self.max_metadata_bytes).read_to_end(&mut buf)?;
        Ok(buf)
    }
}

/// Decode `metadata.json` as a flat object and take its `provider` field
fn parse_provider(bytes: &[u8]) -> Result<String, serde_json::Error> {
    use serde::de::Error;

    let fields: serde_json::Map<String, serde_json::Value> = serde_json::from_slice(bytes)?;
    match fields.get("provider") {
        Some(serde_json::Value::String(provider)) if !provider.is_empty() => Ok(provider.clone()),
        _ => Err(serde_json::Error::custom("missing string field `provider`")),
    }
}

/// `metadata.json` at the archive root, with or without a leading `./`
fn is_metadata(name: &Path) -> bool {
    let mut components = name.components().filter(|c| !matches!(c, Component::CurDir));
    matches!(
        (components.next(), components.next()),
        (Some(Component::Normal(first)), None) if first == METADATA_ENTRY
    )
}

fn is_ovf(name: &Path) -> bool {
    name.extension()
        .map(|ext| ext.eq_ignore_ascii_case("ovf"))
        .unwrap_or(false)
}

fn zip_to_io(err: zip::result::ZipError) -> io::Error {
    match err {
        zip::result::ZipError::Io(e) => e,
        other => io::Error::new(io::ErrorKind::InvalidData, other),
    }
}
