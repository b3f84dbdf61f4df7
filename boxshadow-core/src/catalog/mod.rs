//! Box catalog - indexing of local box files
//!
//! # Pipeline
//!
//! ```text
//! directories ──► scanner ──► filename parser ─┐
//!                        └──► archive inspector ┴─► builder ──► Catalog
//! ```
//!
//! A [`Catalog`] is immutable. Rebuilds produce a new value which the
//! [`crate::store::CatalogStore`] publishes as a unit.

mod builder;
mod filename;
mod inspector;
mod model;
mod scanner;
mod version;

pub use builder::CatalogBuilder;
pub use filename::{BoxFilename, FilenameParser, SLASH_TOKEN};
pub use inspector::{ArchiveInspector, LEGACY_OVF_PROVIDER, METADATA_ENTRY};
pub use model::{
    BoxEntry, Catalog, CatalogSummary, ParsedArtifact, ProviderEntry, VersionEntry, VersionStatus,
};
pub use scanner::{scan_directories, ArtifactScanner, ScanOutcome, SkippedArtifact};
pub use version::compare_versions;
