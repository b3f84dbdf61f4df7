//! Published catalog
//!
//! The store holds exactly one `Arc<Catalog>`. Readers load the pointer
//! without blocking; `replace` swaps in a fully built catalog. A reader
//! holding an earlier snapshot keeps seeing that snapshot unchanged.

use arc_swap::ArcSwap;
use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use crate::catalog::{BoxEntry, Catalog};

/// Holder of the most recently published catalog
#[derive(Debug)]
pub struct CatalogStore {
    current: ArcSwap<Catalog>,
    generation: AtomicU64,
}

impl Default for CatalogStore {
    fn default() -> Self {
        Self::new()
    }
}

impl CatalogStore {
    /// A store publishing an empty catalog
    pub fn new() -> Self {
        Self::with_catalog(Catalog::default())
    }

    pub fn with_catalog(catalog: Catalog) -> Self {
        Self {
            current: ArcSwap::from_pointee(catalog),
            generation: AtomicU64::new(0),
        }
    }

    /// Snapshot of the latest complete catalog
    pub fn current_catalog(&self) -> Arc<Catalog> {
        self.current.load_full()
    }

    /// Publish `catalog`; returns the new generation number
    pub fn replace(&self, catalog: Catalog) -> u64 {
        self.current.store(Arc::new(catalog));
        self.generation.fetch_add(1, Ordering::AcqRel) + 1
    }

    /// Number of catalogs published since the store was created
    pub fn generation(&self) -> u64 {
        self.generation.load(Ordering::Acquire)
    }

    pub fn get_box(&self, owner: &str, boxname: &str) -> Option<BoxEntry> {
        self.current.load().get_box(owner, boxname).cloned()
    }

    pub fn box_available(&self, owner: &str, boxname: &str) -> bool {
        self.current.load().box_available(owner, boxname)
    }

    pub fn get_box_file_location(
        &self,
        owner: &str,
        boxname: &str,
        provider: &str,
        version: &str,
    ) -> Option<PathBuf> {
        self.current
            .load()
            .file_location(owner, boxname, provider, version)
            .map(PathBuf::from)
    }
}
