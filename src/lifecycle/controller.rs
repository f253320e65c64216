//! Poller lifecycle controller.
//!
//! # Responsibilities
//! - Start one poller per active source at boot
//! - Restart, stop and evict pollers as sources are created, edited or removed
//! - Trigger out-of-schedule refreshes
//! - Serve merges over the current snapshot cache

use std::sync::{Arc, Weak};
use std::time::Duration;

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;

use crate::document::HttpConfiguration;
use crate::lifecycle::Shutdown;
use crate::merge::{self, MergedConfiguration};
use crate::observability::metrics;
use crate::polling::{effective_interval, Fetcher, PollContext, PollOutcome, Poller, PollerExit, MIN_POLL_INTERVAL};
use crate::registry::{RegistryError, Source, SourceId, SourceRegistry};
use crate::snapshot::SnapshotCache;

/// Default timeout of a single provider fetch.
pub const DEFAULT_FETCH_TIMEOUT: Duration = Duration::from_secs(5);

/// Poller tuning.
#[derive(Debug, Clone, PartialEq)]
pub struct PollerSettings {
    /// Floor applied to every source's refresh interval.
    pub min_interval: Duration,
    /// Timeout of a single fetch.
    pub fetch_timeout: Duration,
}

impl Default for PollerSettings {
    fn default() -> Self {
        Self {
            min_interval: MIN_POLL_INTERVAL,
            fetch_timeout: DEFAULT_FETCH_TIMEOUT,
        }
    }
}

#[derive(thiserror::Error, Debug)]
pub enum LifecycleError {
    #[error("failed to load sources at startup: {0}")]
    StartupLoad(#[source] RegistryError),
    #[error("source {0} not found")]
    NotFound(SourceId),
    #[error("registry error: {0}")]
    Registry(#[from] RegistryError),
    #[error("failed to build HTTP client: {0}")]
    Client(#[from] reqwest::Error),
}

/// A running poller task.
struct PollerHandle {
    generation: u64,
    stop: oneshot::Sender<()>,
    task: JoinHandle<()>,
}

impl PollerHandle {
    /// Ask the task to stop after its current tick.
    fn cancel(self) -> JoinHandle<()> {
        let _ = self.stop.send(());
        self.task
    }
}

struct AggregatorInner {
    context: PollContext,
    pollers: DashMap<SourceId, PollerHandle>,
    settings: PollerSettings,
    shutdown: Shutdown,
}

/// Owns every poller and the snapshot cache they write to.
///
/// This is the only component that creates or destroys pollers.
#[derive(Clone)]
pub struct Aggregator {
    inner: Arc<AggregatorInner>,
}

impl Aggregator {
    pub fn new(
        registry: Arc<dyn SourceRegistry>,
        settings: PollerSettings,
        shutdown: Shutdown,
    ) -> Result<Self, LifecycleError> {
        let fetcher = Fetcher::new(settings.fetch_timeout)?;
        let context = PollContext::new(registry, SnapshotCache::new(), fetcher);

        Ok(Self {
            inner: Arc::new(AggregatorInner {
                context,
                pollers: DashMap::new(),
                settings,
                shutdown,
            }),
        })
    }

    pub fn registry(&self) -> &Arc<dyn SourceRegistry> {
        &self.inner.context.registry
    }

    pub fn cache(&self) -> &SnapshotCache {
        &self.inner.context.cache
    }

    pub fn settings(&self) -> &PollerSettings {
        &self.inner.settings
    }

    /// Whether a poller is currently installed for `id`.
    pub fn is_polling(&self, id: SourceId) -> bool {
        self.inner.pollers.contains_key(&id)
    }

    pub fn poller_count(&self) -> usize {
        self.inner.pollers.len()
    }

    /// Load every source and start a poller for each active one.
    ///
    /// Failing to read the registry is fatal: the aggregator cannot run
    /// without knowing its sources.
    pub async fn start_all(&self) -> Result<usize, LifecycleError> {
        tracing::info!("Starting HTTP provider aggregator");

        let sources = self
            .registry()
            .list()
            .await
            .map_err(LifecycleError::StartupLoad)?;

        for source in &sources {
            self.start(source).await;
        }

        tracing::info!(
            providers = sources.len(),
            polling = self.poller_count(),
            "Aggregator started"
        );
        Ok(sources.len())
    }

    /// Signal every poller to stop and wait for them to finish their current tick.
    pub async fn stop_all(&self) {
        let ids: Vec<SourceId> = self.inner.pollers.iter().map(|entry| *entry.key()).collect();
        let mut tasks = Vec::with_capacity(ids.len());
        for id in ids {
            if let Some((_, handle)) = self.inner.pollers.remove(&id) {
                tasks.push(handle.cancel());
            }
        }
        metrics::set_active_pollers(self.poller_count());

        let stopped = tasks.len();
        for task in tasks {
            if let Err(e) = task.await {
                tracing::warn!(error = %e, "Poller task ended abnormally");
            }
        }
        tracing::info!(stopped, "All pollers stopped");
    }

    /// (Re)start polling `source`.
    ///
    /// Any existing poller for the source is cancelled first. An inactive
    /// source is evicted instead. Otherwise one fetch runs before this
    /// returns and a periodic task is armed.
    pub async fn start(&self, source: &Source) {
        if let Some((_, old)) = self.inner.pollers.remove(&source.id) {
            old.cancel();
        }

        let cache = self.cache();
        if !source.is_active {
            cache.remove(source.id);
            metrics::set_active_pollers(self.poller_count());
            tracing::debug!(source = %source.name, "Provider inactive, not polling");
            return;
        }

        let generation = cache.arm(source);
        self.inner.context.poll_once(source, Some(generation)).await;

        if cache.generation(source.id) != Some(generation) {
            // Stopped or restarted while the first fetch was in flight.
            return;
        }

        let interval = effective_interval(source.refresh_interval, self.inner.settings.min_interval);
        let poller = Poller::new(source.id, generation, interval, self.inner.context.clone());
        let handle = self.spawn(source, generation, poller);

        // Checked under the entry lock: a `stop` that evicted the slot has either
        // happened already or will remove this handle after the insert.
        match self.inner.pollers.entry(source.id) {
            _ if cache.generation(source.id) != Some(generation) => {
                handle.cancel();
                return;
            }
            Entry::Occupied(mut entry) => {
                if entry.get().generation < generation {
                    entry.insert(handle).cancel();
                } else {
                    handle.cancel();
                    return;
                }
            }
            Entry::Vacant(entry) => {
                entry.insert(handle);
            }
        }
        metrics::set_active_pollers(self.poller_count());

        tracing::info!(
            source = %source.name,
            interval_secs = interval.as_secs(),
            "Started polling provider"
        );
    }

    fn spawn(&self, source: &Source, generation: u64, poller: Poller) -> PollerHandle {
        let (stop_tx, stop_rx) = oneshot::channel();
        let shutdown_rx = self.inner.shutdown.subscribe();
        let weak: Weak<AggregatorInner> = Arc::downgrade(&self.inner);
        let source_id = source.id;
        let name = source.name.clone();

        let task = tokio::spawn(async move {
            let exit = poller.run(stop_rx, shutdown_rx).await;
            tracing::debug!(source = %name, exit = ?exit, "Poller exited");

            if matches!(exit, PollerExit::SourceRemoved | PollerExit::SourceDeactivated) {
                if let Some(inner) = weak.upgrade() {
                    inner
                        .pollers
                        .remove_if(&source_id, |_, handle| handle.generation == generation);
                    inner.context.cache.remove_if_current(source_id, generation);
                    metrics::set_active_pollers(inner.pollers.len());
                }
            }
        });

        PollerHandle {
            generation,
            stop: stop_tx,
            task,
        }
    }

    /// Stop polling `id` and evict its snapshot.
    pub fn stop(&self, id: SourceId) -> Result<(), LifecycleError> {
        // Evict first: a concurrent `start` installs only while its slot is armed.
        let snapshot = self.cache().remove(id);
        let poller = self.inner.pollers.remove(&id);
        metrics::set_active_pollers(self.poller_count());

        match (poller, snapshot) {
            (None, None) => Err(LifecycleError::NotFound(id)),
            (poller, _) => {
                if let Some((_, handle)) = poller {
                    handle.cancel();
                }
                tracing::info!(source_id = %id, "Stopped polling provider");
                Ok(())
            }
        }
    }

    pub async fn on_source_created(&self, source: &Source) {
        self.start(source).await;
    }

    pub async fn on_source_updated(&self, source: &Source) {
        self.start(source).await;
    }

    pub fn on_source_deleted(&self, id: SourceId) -> Result<(), LifecycleError> {
        self.stop(id)
    }

    /// Trigger one out-of-band fetch without touching the source's timer.
    ///
    /// The fetch runs in the background; only the lookup is awaited.
    pub async fn refresh_now(&self, id: SourceId) -> Result<(), LifecycleError> {
        let source = self
            .registry()
            .get(id)
            .await?
            .ok_or(LifecycleError::NotFound(id))?;

        let context = self.inner.context.clone();
        let generation = context.cache.generation(id);
        tokio::spawn(async move {
            context.poll_once(&source, generation).await;
        });
        Ok(())
    }

    /// Fetch `id` once and wait for the result.
    pub async fn refresh_and_wait(&self, id: SourceId) -> Result<PollOutcome, LifecycleError> {
        let source = self
            .registry()
            .get(id)
            .await?
            .ok_or(LifecycleError::NotFound(id))?;

        let generation = self.cache().generation(id);
        Ok(self.inner.context.poll_once(&source, generation).await)
    }

    /// Merge `local` with the current snapshots.
    pub fn merged(&self, local: &HttpConfiguration) -> MergedConfiguration {
        let snapshots = self.cache().get_all();
        let result = merge::merge(local, &snapshots);
        metrics::record_merge(result.conflicts.len());
        result
    }
}
