//! Box discovery
//!
//! Lists `*.box` files in each configured directory (non-recursively),
//! then runs the filename parser and, if enabled, the archive inspector
//! over each one. A file that fails either step is skipped and reported;
//! it never aborts the scan.

use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, info, warn};

use super::filename::FilenameParser;
use super::inspector::ArchiveInspector;
use super::model::ParsedArtifact;
use crate::error::{InspectError, ParseError, RebuildError, SkipReason};

/// A box file left out of the catalog and why
#[derive(Debug)]
pub struct SkippedArtifact {
    pub path: PathBuf,
    pub reason: SkipReason,
}

/// Result of scanning every configured directory once
#[derive(Debug, Default)]
pub struct ScanOutcome {
    pub artifacts: Vec<ParsedArtifact>,
    pub skipped: Vec<SkippedArtifact>,
}

/// List `*.box` files directly inside each directory, sorted by path
///
/// A directory that does not exist is logged and contributes nothing. One
/// that exists but cannot be listed fails the whole scan, so a transient
/// permission or mount problem never publishes a catalog missing its boxes.
pub fn scan_directories(directories: &[PathBuf]) -> Result<Vec<PathBuf>, RebuildError> {
    let mut files = Vec::new();

    for dir in directories {
        match std::fs::metadata(dir) {
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                warn!("Box directory does not exist: {}", dir.display());
                continue;
            }
            Err(source) => {
                return Err(RebuildError::Directory {
                    path: dir.clone(),
                    source,
                })
            }
            Ok(_) => {}
        }
        std::fs::read_dir(dir).map_err(|source| RebuildError::Directory {
            path: dir.clone(),
            source,
        })?;

        info!("Checking for files in: {}", dir.display());
        let pattern = format!("{}/*.box", glob::Pattern::escape(&dir.to_string_lossy()));
        let paths = match glob::glob(&pattern) {
            Ok(paths) => paths,
            Err(e) => {
                warn!("Invalid glob for {}: {}", dir.display(), e);
                continue;
            }
        };

        for entry in paths {
            match entry {
                Ok(path) if path.is_file() => files.push(path),
                Ok(path) => debug!("Skipping non-file {}", path.display()),
                Err(e) => warn!("Unreadable entry while scanning {}: {}", dir.display(), e),
            }
        }
    }

    files.sort();
    files.dedup();
    Ok(files)
}

/// Turns box files into [`ParsedArtifact`]s
#[derive(Debug, Clone)]
pub struct ArtifactScanner {
    parser: FilenameParser,
    inspector: Option<ArchiveInspector>,
    inspect_timeout: Duration,
}

impl ArtifactScanner {
    pub fn new(parser: FilenameParser, inspector: Option<ArchiveInspector>, inspect_timeout: Duration) -> Self {
        Self {
            parser,
            inspector,
            inspect_timeout,
        }
    }

    /// Parse only the filename of `path`
    pub fn parse_path(&self, path: &Path) -> Result<ParsedArtifact, ParseError> {
        let basename = path
            .file_name()
            .map(|n| n.to_string_lossy())
            .unwrap_or_default();
        let name = self.parser.parse(&basename)?;

        Ok(ParsedArtifact {
            owner: name.owner,
            boxname: name.boxname,
            version: name.version,
            provider: name.provider,
            path: path.to_path_buf(),
        })
    }

    /// Scan all directories; blocking filesystem work runs off the async runtime
    pub async fn scan(&self, directories: &[PathBuf]) -> Result<ScanOutcome, RebuildError> {
        let dirs = directories.to_vec();
        let files = tokio::task::spawn_blocking(move || scan_directories(&dirs)).await??;
        Ok(self.collect_artifacts(files).await)
    }

    /// Parse and inspect each file in order, skipping the ones that fail
    pub async fn collect_artifacts(&self, paths: Vec<PathBuf>) -> ScanOutcome {
        let mut outcome = ScanOutcome::default();
        for path in paths {
            match self.process(&path).await {
                Ok(artifact) => outcome.artifacts.push(artifact),
                Err(reason) => {
                    warn!("Skipping {}: {}", path.display(), reason);
                    outcome.skipped.push(SkippedArtifact { path, reason });
                }
            }
        }

        info!(
            "Scan complete: {} box files indexed, {} skipped",
            outcome.artifacts.len(),
            outcome.skipped.len()
        );
        outcome
    }

    async fn process(&self, path: &Path) -> Result<ParsedArtifact, SkipReason> {
        let artifact = self.parse_path(path)?;

        let Some(inspector) = self.inspector else {
            return Ok(artifact);
        };

        let declared = self.inspect(inspector, path).await?;
        if declared != artifact.provider {
            warn!(
                "{} declares provider '{}' but is named for '{}'; using the filename",
                path.display(),
                declared,
                artifact.provider
            );
        }
        Ok(artifact)
    }

    async fn inspect(&self, inspector: ArchiveInspector, path: &Path) -> Result<String, InspectError> {
        let owned = path.to_path_buf();
        let task = tokio::task::spawn_blocking(move || inspector.inspect(&owned));

        match tokio::time::timeout(self.inspect_timeout, task).await {
            Ok(Ok(result)) => result,
            Ok(Err(join)) => Err(InspectError::ArchiveOpen {
                path: path.to_path_buf(),
                source: std::io::Error::other(join.to_string()),
            }),
            Err(_) => Err(InspectError::Timeout {
                path: path.to_path_buf(),
                seconds: self.inspect_timeout.as_secs(),
            }),
        }
    }
}
