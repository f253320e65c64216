//! Per-source periodic polling task.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::sync::{broadcast, oneshot};
use tokio::time::{self, Instant, MissedTickBehavior};

use crate::polling::fetcher::Fetcher;
use crate::registry::{Source, SourceId, SourceRegistry, StatusUpdate, MAX_REFRESH_INTERVAL_SECS};
use crate::snapshot::{Snapshot, SnapshotCache};

/// Floor applied to every configured poll interval.
pub const MIN_POLL_INTERVAL: Duration = Duration::from_secs(5);

/// Ceiling applied to every poll interval.
pub const MAX_POLL_INTERVAL: Duration = Duration::from_secs(MAX_REFRESH_INTERVAL_SECS);

/// Interval a source is actually polled at.
pub fn effective_interval(refresh_interval_secs: u64, floor: Duration) -> Duration {
    Duration::from_secs(refresh_interval_secs)
        .max(floor)
        .min(MAX_POLL_INTERVAL)
}

/// Outcome of a single fetch cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollOutcome {
    Updated,
    Failed,
    /// The result belonged to a stopped or superseded poller and was dropped.
    Discarded,
}

/// Why a poller loop ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollerExit {
    Stopped,
    Shutdown,
    SourceRemoved,
    SourceDeactivated,
}

/// Collaborators shared by every poller.
#[derive(Clone)]
pub struct PollContext {
    pub registry: Arc<dyn SourceRegistry>,
    pub cache: SnapshotCache,
    pub fetcher: Fetcher,
}

impl PollContext {
    pub fn new(registry: Arc<dyn SourceRegistry>, cache: SnapshotCache, fetcher: Fetcher) -> Self {
        Self {
            registry,
            cache,
            fetcher,
        }
    }

    /// Fetch `source` once and record the result.
    ///
    /// With a generation the snapshot is written only while that generation
    /// owns the cache slot. Without one only the registry status is written.
    pub async fn poll_once(&self, source: &Source, generation: Option<u64>) -> PollOutcome {
        tracing::debug!(source = %source.name, url = %source.url, "Fetching from provider");

        let result = self.fetcher.fetch(&source.name, &source.url).await;

        let (outcome, status) = match result {
            Ok(document) => {
                let fetched_at = Utc::now();
                let counts = document.counts();
                if let Some(generation) = generation {
                    let applied = self.cache.apply_if_current(source.id, generation, |_| {
                        Snapshot::succeeded(source, document, fetched_at)
                    });
                    if !applied {
                        tracing::debug!(source = %source.name, "Discarding fetch result of stopped poller");
                        return PollOutcome::Discarded;
                    }
                }
                tracing::info!(
                    source = %source.name,
                    routers = counts.routers,
                    services = counts.services,
                    middlewares = counts.middlewares,
                    "Fetched provider configuration"
                );
                (PollOutcome::Updated, StatusUpdate::Success { fetched_at, counts })
            }
            Err(e) => {
                let error = e.to_string();
                if let Some(generation) = generation {
                    let applied = self.cache.apply_if_current(source.id, generation, |previous| {
                        Snapshot::failed(source, Some(previous), error.clone())
                    });
                    if !applied {
                        tracing::debug!(source = %source.name, "Discarding fetch error of stopped poller");
                        return PollOutcome::Discarded;
                    }
                }
                tracing::warn!(source = %source.name, error = %error, "Provider fetch failed");
                (PollOutcome::Failed, StatusUpdate::Failure { error })
            }
        };

        if let Err(e) = self.registry.update_status(source.id, status).await {
            tracing::error!(source = %source.name, error = %e, "Failed to persist provider status");
        }
        outcome
    }
}

/// Periodic fetch loop for one source.
pub struct Poller {
    source_id: SourceId,
    generation: u64,
    interval: Duration,
    context: PollContext,
}

impl Poller {
    pub fn new(source_id: SourceId, generation: u64, interval: Duration, context: PollContext) -> Self {
        Self {
            source_id,
            generation,
            // Keeps the first deadline representable as an `Instant`.
            interval: interval.min(MAX_POLL_INTERVAL),
            context,
        }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Tick until stopped, shut down, or the source goes away.
    ///
    /// The first tick fires one interval from now; the caller performs the
    /// initial fetch itself.
    pub async fn run(
        self,
        mut stop: oneshot::Receiver<()>,
        mut shutdown: broadcast::Receiver<()>,
    ) -> PollerExit {
        let mut ticker = time::interval_at(Instant::now() + self.interval, self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    if let Some(exit) = self.tick().await {
                        return exit;
                    }
                }
                // Fires on an explicit stop and when the handle is dropped.
                _ = &mut stop => return PollerExit::Stopped,
                _ = shutdown.recv() => return PollerExit::Shutdown,
            }
        }
    }

    async fn tick(&self) -> Option<PollerExit> {
        let source = match self.context.registry.get(self.source_id).await {
            Ok(Some(source)) => source,
            Ok(None) => {
                tracing::info!(source_id = %self.source_id, "Provider not found, stopping polling");
                return Some(PollerExit::SourceRemoved);
            }
            Err(e) => {
                tracing::warn!(source_id = %self.source_id, error = %e, "Failed to re-read provider, skipping tick");
                return None;
            }
        };

        if !source.is_active {
            tracing::info!(source = %source.name, "Provider deactivated, stopping polling");
            return Some(PollerExit::SourceDeactivated);
        }

        self.context.poll_once(&source, Some(self.generation)).await;
        None
    }
}
