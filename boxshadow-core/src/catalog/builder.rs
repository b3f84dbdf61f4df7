//! Catalog construction
//!
//! Groups a batch of parsed artifacts by owner, box and version, keeps
//! providers unique per version and orders each box's versions newest
//! first so the current version is always the first entry.
//!
//! Duplicate providers: if two files in one scan claim the same
//! `(owner, box, version, provider)`, the first one in input order wins
//! and the rest are logged and dropped. The scanner feeds files in sorted
//! path order, so the winner is stable across rebuilds.

use std::collections::BTreeMap;
use tracing::{debug, warn};

use super::model::{BoxEntry, Catalog, ParsedArtifact, ProviderEntry, VersionEntry, VersionStatus};
use super::version::compare_versions;

/// Builds immutable [`Catalog`] values from scan results
#[derive(Debug, Clone)]
pub struct CatalogBuilder {
    download_base: String,
}

impl CatalogBuilder {
    /// `download_base` is the scheme/host/port prefix, e.g. `http://localhost:8099`
    pub fn new(download_base: impl Into<String>) -> Self {
        Self {
            download_base: download_base.into().trim_end_matches('/').to_string(),
        }
    }

    pub fn from_host(hostname: &str, port: u16) -> Self {
        Self::new(format!("http://{hostname}:{port}"))
    }

    /// `http://{host}:{port}/{owner}/{box}/{version}/{provider}/{provider}.box`
    pub fn download_url(&self, artifact: &ParsedArtifact) -> String {
        format!(
            "{}/{}/{}/{}/{}/{}.box",
            self.download_base,
            artifact.owner,
            artifact.boxname,
            artifact.version,
            artifact.provider,
            artifact.provider
        )
    }

    pub fn build(&self, artifacts: Vec<ParsedArtifact>) -> Catalog {
        let mut grouped: BTreeMap<String, BTreeMap<String, Vec<VersionEntry>>> = BTreeMap::new();

        for artifact in artifacts {
            let versions = grouped
                .entry(artifact.owner.clone())
                .or_default()
                .entry(artifact.boxname.clone())
                .or_default();

            let position = match versions.iter().position(|v| v.version == artifact.version) {
                Some(i) => i,
                None => {
                    versions.push(VersionEntry {
                        version: artifact.version.clone(),
                        status: VersionStatus::Active,
                        providers: Vec::new(),
                    });
                    versions.len() - 1
                }
            };
            let version = &mut versions[position];

            if let Some(existing) = version.provider(&artifact.provider) {
                warn!(
                    "Duplicate {}/{}/{}/{}: keeping {}, ignoring {}",
                    artifact.owner,
                    artifact.boxname,
                    artifact.version,
                    artifact.provider,
                    existing.local_path.display(),
                    artifact.path.display()
                );
                continue;
            }

            let url = self.download_url(&artifact);
            debug!("Adding {} -> {}", artifact.path.display(), url);
            version
                .providers
                .push(ProviderEntry::new(artifact.provider, url, artifact.path));
        }

        let mut owners = BTreeMap::new();
        for (owner, boxes) in grouped {
            let mut entries = BTreeMap::new();
            for (boxname, mut versions) in boxes {
                debug_assert!(!versions.is_empty(), "box grouped without a version");
                versions.sort_by(|a, b| compare_versions(&b.version, &a.version));

                entries.insert(
                    boxname.clone(),
                    BoxEntry {
                        name: format!("{owner}/{boxname}"),
                        username: owner.clone(),
                        private: false,
                        versions,
                    },
                );
            }
            owners.insert(owner, entries);
        }

        Catalog::new(owners)
    }
}
