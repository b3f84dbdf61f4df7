//! Filesystem change watcher
//!
//! One `notify` watcher per process feeds raw events into an unbounded
//! channel. A single worker task drains the channel, coalesces bursts that
//! arrive within the debounce window and runs one rebuild per burst, so at
//! most one rebuild is ever in flight.
//!
//! ```text
//! notify thread ──events──► mpsc ──► worker: Rebuilding ─► Idle ─► Rebuilding ─► Idle ...
//! ```

use notify::event::{AccessKind, AccessMode};
use notify::{Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{debug, info, warn};

use crate::error::WatchError;
use crate::indexer::Indexer;

/// Watches the configured directories and rebuilds on change
#[derive(Debug)]
pub struct ChangeWatcher {
    indexer: Arc<Indexer>,
    debounce: Duration,
}

/// Keeps the watch alive; dropping it stops event delivery
pub struct WatchHandle {
    _watcher: RecommendedWatcher,
    worker: JoinHandle<()>,
    shutdown: oneshot::Sender<()>,
}

impl WatchHandle {
    /// Stop the worker after any in-flight rebuild finishes
    pub async fn shutdown(self) {
        let _ = self.shutdown.send(());
        if let Err(e) = self.worker.await {
            warn!("Watch worker ended abnormally: {}", e);
        }
    }
}

impl ChangeWatcher {
    pub fn new(indexer: Arc<Indexer>) -> Self {
        let debounce = indexer.config().debounce();
        Self { indexer, debounce }
    }

    pub fn with_debounce(mut self, debounce: Duration) -> Self {
        self.debounce = debounce;
        self
    }

    /// Establish a watch on every configured directory and spawn the worker
    ///
    /// The worker's first action is a full rebuild, so files created before
    /// the watches existed are never missed. Must be called from within a
    /// tokio runtime. Failing to watch any directory is fatal: nothing is
    /// spawned and the error is returned.
    pub fn start(self) -> Result<WatchHandle, WatchError> {
        let (tx, rx) = mpsc::unbounded_channel();
        let mut watcher = notify::recommended_watcher(move |res: notify::Result<Event>| {
            // The receiver only goes away during shutdown
            let _ = tx.send(res);
        })
        .map_err(WatchError::Backend)?;

        for dir in &self.indexer.config().directories {
            watcher
                .watch(dir, RecursiveMode::NonRecursive)
                .map_err(|source| WatchError::Setup {
                    path: dir.clone(),
                    source,
                })?;
            info!("Watching {} for box changes", dir.display());
        }

        let (shutdown_tx, shutdown_rx) = oneshot::channel();
        let worker = tokio::spawn(run_worker(self.indexer, self.debounce, rx, shutdown_rx));

        Ok(WatchHandle {
            _watcher: watcher,
            worker,
            shutdown: shutdown_tx,
        })
    }
}

async fn run_worker(
    indexer: Arc<Indexer>,
    debounce: Duration,
    mut events: mpsc::UnboundedReceiver<notify::Result<Event>>,
    mut shutdown: oneshot::Receiver<()>,
) {
    // Watches are live before this runs, so anything that changed earlier is picked up here
    debug!("Watches established, running catch-up rebuild");
    indexer.rebuild_or_keep().await;

    loop {
        let first = tokio::select! {
            _ = &mut shutdown => break,
            event = events.recv() => match event {
                Some(event) => event,
                None => break,
            },
        };

        if !triggers_rebuild(&first) {
            continue;
        }

        let mut coalesced = 0usize;
        let deadline = Instant::now() + debounce;
        let mut closed = false;
        while !debounce.is_zero() {
            match tokio::time::timeout_at(deadline, events.recv()).await {
                Ok(Some(_)) => coalesced += 1,
                Ok(None) => {
                    closed = true;
                    break;
                }
                Err(_) => break,
            }
        }

        debug!("Change detected ({} further events coalesced), rebuilding", coalesced);
        indexer.rebuild_or_keep().await;

        if closed {
            break;
        }
    }
    debug!("Watch worker stopped");
}

/// Whether a raw event should cause a rebuild
///
/// Reads are ignored so the inspector opening archives cannot retrigger itself.
fn triggers_rebuild(event: &notify::Result<Event>) -> bool {
    let event = match event {
        Ok(event) => event,
        Err(e) => {
            warn!("Filesystem watch error, rebuilding to resynchronise: {}", e);
            return true;
        }
    };

    let relevant_kind = match event.kind {
        EventKind::Access(AccessKind::Close(AccessMode::Write)) => true,
        EventKind::Access(_) => false,
        _ => true,
    };

    relevant_kind && (event.paths.is_empty() || event.paths.iter().any(|p| is_box_path(p)))
}

fn is_box_path(path: &Path) -> bool {
    path.extension().map(|ext| ext == "box").unwrap_or(false)
}
