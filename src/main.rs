//! Provider aggregator service.
//!
//! # Architecture Overview
//!
//! ```text
//!   External providers              ┌───────────────────────────────────────────┐
//!   (HTTP, JSON documents)          │             PROVIDER AGGREGATOR           │
//!                                   │                                           │
//!   ┌──────────┐   GET per interval │  ┌─────────┐    ┌──────────────────────┐  │
//!   │ source A │◀───────────────────┼──│ poller  │───▶│    snapshot cache    │  │
//!   └──────────┘                    │  └─────────┘    │ (generation checked) │  │
//!   ┌──────────┐                    │  ┌─────────┐    └──────────┬───────────┘  │
//!   │ source B │◀───────────────────┼──│ poller  │───▶           │              │
//!   └──────────┘                    │  └─────────┘               ▼              │
//!                                   │  ┌─────────┐    ┌──────────────────────┐  │
//!   local.toml ─────────────────────┼─▶│  local  │───▶│     merge engine     │  │
//!                                   │  └─────────┘    └──────────┬───────────┘  │
//!                                   │                            ▼              │
//!   Reverse proxy ◀─────────────────┼──────────── GET /api/provider/config      │
//!   Operators     ◀────────────────▶┼──────────── /api/http-providers/...       │
//!                                   │                                           │
//!                                   │  registry · lifecycle · config · metrics  │
//!                                   └───────────────────────────────────────────┘
//! ```

use std::path::PathBuf;

use provider_aggregator::config::{load_config, AggregatorConfig};
use provider_aggregator::lifecycle;
use provider_aggregator::observability::logging;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config_path = std::env::args_os()
        .nth(1)
        .map(PathBuf::from)
        .or_else(|| std::env::var_os("AGGREGATOR_CONFIG").map(PathBuf::from));

    let config = match &config_path {
        Some(path) => load_config(path)?,
        None => AggregatorConfig::default(),
    };

    logging::init_logging(&config.observability.log_level)?;

    tracing::info!("provider-aggregator v{} starting", env!("CARGO_PKG_VERSION"));
    tracing::info!(
        config = ?config_path,
        bind_address = %config.listener.bind_address,
        sources = config.sources.len(),
        local = ?config.local.path,
        "Configuration loaded"
    );

    lifecycle::run(config).await?;
    Ok(())
}
