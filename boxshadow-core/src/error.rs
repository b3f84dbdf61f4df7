//! Error types for the indexing pipeline
//!
//! Per-artifact failures (`ParseError`, `InspectError`) are absorbed by the
//! scanner, logged and reported as a [`SkipReason`]. `WatchError::Setup`
//! is the one condition that aborts startup.

use std::path::PathBuf;
use thiserror::Error;

/// A box filename did not match the configured grammar
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Filename '{filename}' does not match the {layout} box filename grammar")]
pub struct ParseError {
    pub filename: String,
    pub layout: &'static str,
}

/// Failure to determine the provider of a box archive
#[derive(Error, Debug)]
pub enum InspectError {
    /// The archive opened but carries neither `metadata.json` nor an `.ovf` disk descriptor
    #[error("No metadata.json or .ovf descriptor found in {path}")]
    MetadataNotFound { path: PathBuf },

    /// The file could not be read as zip, gzip-compressed tar or plain tar
    #[error("Could not open {path} as a zip, tar.gz or tar archive")]
    ArchiveOpen {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// `metadata.json` exists but is not a JSON object with a string `provider`
    #[error("Malformed metadata.json in {path}")]
    MalformedMetadata {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    /// Inspection exceeded the configured per-artifact time bound
    #[error("Inspecting {path} took longer than {seconds}s")]
    Timeout { path: PathBuf, seconds: u64 },
}

impl InspectError {
    pub fn path(&self) -> &std::path::Path {
        match self {
            InspectError::MetadataNotFound { path }
            | InspectError::ArchiveOpen { path, .. }
            | InspectError::MalformedMetadata { path, .. }
            | InspectError::Timeout { path, .. } => path,
        }
    }
}

/// Why the scanner left a box file out of the catalog
#[derive(Error, Debug)]
pub enum SkipReason {
    #[error(transparent)]
    Parse(#[from] ParseError),

    #[error(transparent)]
    Inspect(#[from] InspectError),
}

/// Filesystem watch could not be established
#[derive(Error, Debug)]
pub enum WatchError {
    #[error("Failed to watch directory {path}")]
    Setup {
        path: PathBuf,
        #[source]
        source: notify::Error,
    },

    #[error("Failed to create filesystem watcher")]
    Backend(#[source] notify::Error),
}

/// A rebuild failed as a whole; the previously published catalog stays in effect
#[derive(Error, Debug)]
pub enum RebuildError {
    /// A blocking scan task panicked or was cancelled
    #[error("Scan task failed: {0}")]
    ScanTask(#[from] tokio::task::JoinError),

    /// A configured directory exists but could not be listed
    #[error("Failed to list box directory {path}")]
    Directory {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}
