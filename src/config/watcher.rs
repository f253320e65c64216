//! Local configuration file watcher for hot reload.

use std::time::Duration;

use notify::{Config, Event, RecommendedWatcher, RecursiveMode, Watcher};
use tokio::sync::mpsc;

use crate::document::ItemCounts;
use crate::local::LocalConfigStore;

/// Watches the file backing a [`LocalConfigStore`] and reloads it on change.
pub struct LocalConfigWatcher {
    store: LocalConfigStore,
    reloaded_tx: mpsc::UnboundedSender<ItemCounts>,
}

impl LocalConfigWatcher {
    /// Create a new watcher.
    ///
    /// Returns the watcher and a receiver that yields the item counts after
    /// every successful reload.
    pub fn new(store: LocalConfigStore) -> (Self, mpsc::UnboundedReceiver<ItemCounts>) {
        let (reloaded_tx, reloaded_rx) = mpsc::unbounded_channel();
        (Self { store, reloaded_tx }, reloaded_rx)
    }

    /// Start watching. The returned handle must be kept alive.
    ///
    /// Returns `Ok(None)` when the store is not backed by a file.
    pub fn run(self) -> Result<Option<RecommendedWatcher>, notify::Error> {
        let Some(path) = self.store.path().map(|path| path.to_path_buf()) else {
            return Ok(None);
        };
        let store = self.store.clone();
        let tx = self.reloaded_tx.clone();

        let mut watcher = RecommendedWatcher::new(
            move |res: notify::Result<Event>| match res {
                Ok(event) => {
                    if event.kind.is_modify() || event.kind.is_create() {
                        tracing::info!("Local configuration change detected, reloading");
                        match store.reload() {
                            Ok(counts) => {
                                tracing::info!(
                                    routers = counts.routers,
                                    services = counts.services,
                                    middlewares = counts.middlewares,
                                    "Local configuration reloaded"
                                );
                                let _ = tx.send(counts);
                            }
                            Err(e) => {
                                tracing::error!(error = %e, "Failed to reload local configuration, keeping current");
                            }
                        }
                    }
                }
                Err(e) => tracing::error!(error = ?e, "Watch error"),
            },
            Config::default().with_poll_interval(Duration::from_secs(2)),
        )?;

        watcher.watch(&path, RecursiveMode::NonRecursive)?;

        tracing::info!(path = %path.display(), "Local configuration watcher started");
        Ok(Some(watcher))
    }
}
