//! Startup orchestration.
//!
//! # Responsibilities
//! - Seed the registry from the service configuration
//! - Load and optionally watch the local configuration file
//! - Start one poller per active source
//! - Bind the listener and serve until shutdown
//!
//! # Design Decisions
//! - Fail fast: startup errors are fatal, except the metrics exporter
//! - Subsystems initialize in order, not concurrently
//! - The listener binds last (traffic only when ready)

use std::net::SocketAddr;
use std::sync::Arc;

use notify::RecommendedWatcher;
use tokio::net::TcpListener;

use crate::config::{AggregatorConfig, LocalConfigWatcher};
use crate::http::{AppState, HttpServer};
use crate::lifecycle::{spawn_signal_handler, Aggregator, LifecycleError, Shutdown};
use crate::local::{LocalConfigError, LocalConfigStore};
use crate::observability::metrics;
use crate::registry::{MemoryRegistry, NewSource, RegistryError, SourceRegistry};

#[derive(thiserror::Error, Debug)]
pub enum StartupError {
    #[error("failed to register source '{name}': {error}")]
    Seed { name: String, error: RegistryError },
    #[error(transparent)]
    Lifecycle(#[from] LifecycleError),
    #[error(transparent)]
    Local(#[from] LocalConfigError),
    #[error("failed to watch local configuration: {0}")]
    Watch(#[from] notify::Error),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// A running aggregator with its collaborators.
pub struct Service {
    pub aggregator: Aggregator,
    pub local: LocalConfigStore,
    pub shutdown: Shutdown,
    _watcher: Option<RecommendedWatcher>,
}

impl Service {
    pub fn state(&self) -> AppState {
        AppState::new(self.aggregator.clone(), self.local.clone())
    }

    /// Broadcast shutdown and wait for every poller to stop.
    pub async fn stop(self) {
        self.shutdown.trigger();
        self.aggregator.stop_all().await;
    }
}

/// Register the configured sources that the registry does not know yet.
pub async fn seed_sources(
    registry: &dyn SourceRegistry,
    config: &AggregatorConfig,
) -> Result<usize, StartupError> {
    let mut created = 0;
    for source in &config.sources {
        match registry.create(NewSource::from(source)).await {
            Ok(source) => {
                tracing::info!(source = %source.name, id = %source.id, "Registered configured provider");
                created += 1;
            }
            Err(RegistryError::DuplicateName(name)) => {
                tracing::debug!(source = %name, "Configured provider already registered");
            }
            Err(error) => {
                return Err(StartupError::Seed {
                    name: source.name.clone(),
                    error,
                })
            }
        }
    }
    Ok(created)
}

/// Build every subsystem and start polling; does not bind the listener.
pub async fn bootstrap(
    config: &AggregatorConfig,
    registry: Arc<dyn SourceRegistry>,
    shutdown: Shutdown,
) -> Result<Service, StartupError> {
    seed_sources(registry.as_ref(), config).await?;

    let local = match &config.local.path {
        Some(path) => LocalConfigStore::open(path)?,
        None => LocalConfigStore::empty(),
    };

    metrics::set_local_items(local.counts());

    let watcher = if config.local.watch {
        let (watcher, mut reloads) = LocalConfigWatcher::new(local.clone());
        let watcher = watcher.run()?;
        // Ends when the watcher, and with it the sender, is dropped.
        tokio::spawn(async move {
            while let Some(counts) = reloads.recv().await {
                metrics::record_local_reload(counts);
            }
        });
        watcher
    } else {
        None
    };

    let aggregator = Aggregator::new(registry, config.poller.settings(), shutdown.clone())?;
    aggregator.start_all().await?;

    Ok(Service {
        aggregator,
        local,
        shutdown,
        _watcher: watcher,
    })
}

/// Run the service until a termination signal arrives.
pub async fn run(config: AggregatorConfig) -> Result<(), StartupError> {
    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse::<SocketAddr>() {
            Ok(addr) => {
                if let Err(e) = metrics::init_metrics(addr) {
                    tracing::error!(error = %e, "Failed to start metrics endpoint");
                }
            }
            Err(e) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                error = %e,
                "Failed to parse metrics address"
            ),
        }
    }

    let shutdown = Shutdown::new();
    let registry: Arc<dyn SourceRegistry> = Arc::new(MemoryRegistry::new());
    let service = bootstrap(&config, registry, shutdown.clone()).await?;

    let listener = TcpListener::bind(&config.listener.bind_address).await?;
    tracing::info!(address = %listener.local_addr()?, "Listening for connections");

    spawn_signal_handler(shutdown.clone());

    let server = HttpServer::new(config.listener.clone(), service.state());
    let served = server.run(listener, shutdown.subscribe()).await;

    service.stop().await;
    served?;

    tracing::info!("Shutdown complete");
    Ok(())
}
