//! Rebuild pipeline: scan → build → publish

use std::sync::Arc;
use std::time::Instant;
use tracing::{info, warn};

use crate::catalog::{
    ArchiveInspector, ArtifactScanner, Catalog, CatalogBuilder, CatalogSummary, FilenameParser,
    SkippedArtifact,
};
use crate::config::ShadowConfig;
use crate::error::RebuildError;
use crate::store::CatalogStore;

/// Outcome of one completed rebuild
#[derive(Debug)]
pub struct RebuildReport {
    /// Store generation the new catalog was published as
    pub generation: u64,
    pub summary: CatalogSummary,
    pub skipped: Vec<SkippedArtifact>,
}

/// Owns the configuration and publishes freshly built catalogs to the store
#[derive(Debug, Clone)]
pub struct Indexer {
    config: ShadowConfig,
    scanner: ArtifactScanner,
    builder: CatalogBuilder,
    store: Arc<CatalogStore>,
}

impl Indexer {
    pub fn new(config: ShadowConfig, store: Arc<CatalogStore>) -> Self {
        let inspector = config
            .inspect_archives
            .then(|| ArchiveInspector::new(config.max_metadata_bytes));
        let scanner = ArtifactScanner::new(
            FilenameParser::new(config.filename_layout),
            inspector,
            config.inspect_timeout(),
        );
        let builder = CatalogBuilder::new(config.download_base());

        Self {
            config,
            scanner,
            builder,
            store,
        }
    }

    pub fn config(&self) -> &ShadowConfig {
        &self.config
    }

    pub fn store(&self) -> &Arc<CatalogStore> {
        &self.store
    }

    /// Scan every directory and publish the resulting catalog
    ///
    /// On error nothing is published and the previous catalog stays current.
    pub async fn rebuild(&self) -> Result<RebuildReport, RebuildError> {
        let started = Instant::now();
        info!("Populating boxes from {} directories", self.config.directories.len());

        let outcome = self.scanner.scan(&self.config.directories).await?;
        let catalog = self.builder.build(outcome.artifacts);
        log_catalog(&catalog);

        let summary = catalog.summary();
        let generation = self.store.replace(catalog);

        info!(
            generation,
            owners = summary.owners,
            boxes = summary.boxes,
            versions = summary.versions,
            providers = summary.providers,
            skipped = outcome.skipped.len(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Catalog published"
        );

        Ok(RebuildReport {
            generation,
            summary,
            skipped: outcome.skipped,
        })
    }

    /// Rebuild, logging instead of returning a failure
    pub async fn rebuild_or_keep(&self) -> Option<RebuildReport> {
        match self.rebuild().await {
            Ok(report) => Some(report),
            Err(e) => {
                warn!(
                    "Rebuild failed, keeping catalog generation {}: {}",
                    self.store.generation(),
                    e
                );
                None
            }
        }
    }
}

fn log_catalog(catalog: &Catalog) {
    for entry in catalog.boxes() {
        for version in &entry.versions {
            for provider in &version.providers {
                info!("Found {}/{}/{}", entry.name, version.version, provider.name);
            }
        }
    }
}
