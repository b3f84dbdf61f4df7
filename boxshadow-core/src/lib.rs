//! boxshadow library exports
//!
//! Indexes a directory of Vagrant `.box` files into a versioned,
//! multi-provider catalog and keeps it current as files change.

pub mod catalog;
pub mod config;
pub mod error;
pub mod indexer;
pub mod store;
pub mod watcher;

pub use config::{FilenameLayout, ShadowConfig};
pub use indexer::{Indexer, RebuildReport};
pub use store::CatalogStore;
pub use watcher::{ChangeWatcher, WatchHandle};
