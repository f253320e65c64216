//! Metrics collection and exposition.
//!
//! # Metrics
//! - `aggregator_fetches_total` (counter): provider fetches by source, outcome
//! - `aggregator_fetch_duration_seconds` (histogram): fetch latency by source
//! - `aggregator_active_pollers` (gauge): running poller tasks
//! - `aggregator_merge_conflicts` (gauge): conflicts found by the last merge
//! - `aggregator_local_items` (gauge): first-party items by kind
//! - `aggregator_local_reloads_total` (counter): successful local configuration reloads
//!
//! # Design Decisions
//! - Recording goes through the `metrics` facade; without an installed
//!   recorder every call is a no-op, so tests need no setup
//! - Prometheus exposition is opt-in via `observability.metrics_enabled`

use std::net::SocketAddr;
use std::time::Instant;

use metrics::{counter, describe_counter, describe_gauge, describe_histogram, gauge, histogram, Unit};
use metrics_exporter_prometheus::{BuildError, PrometheusBuilder};

use crate::document::ItemCounts;

pub const FETCHES_TOTAL: &str = "aggregator_fetches_total";
pub const FETCH_DURATION_SECONDS: &str = "aggregator_fetch_duration_seconds";
pub const ACTIVE_POLLERS: &str = "aggregator_active_pollers";
pub const MERGE_CONFLICTS: &str = "aggregator_merge_conflicts";
pub const LOCAL_ITEMS: &str = "aggregator_local_items";
pub const LOCAL_RELOADS_TOTAL: &str = "aggregator_local_reloads_total";

/// Install the Prometheus recorder and its scrape listener on `addr`.
///
/// Must be called from within a tokio runtime.
pub fn init_metrics(addr: SocketAddr) -> Result<(), BuildError> {
    PrometheusBuilder::new().with_http_listener(addr).install()?;

    describe_counter!(FETCHES_TOTAL, "Provider fetches by source and outcome");
    describe_histogram!(FETCH_DURATION_SECONDS, Unit::Seconds, "Provider fetch latency");
    describe_gauge!(ACTIVE_POLLERS, "Running provider pollers");
    describe_gauge!(MERGE_CONFLICTS, "Conflicts recorded by the most recent merge");
    describe_gauge!(LOCAL_ITEMS, "First-party configuration items by kind");
    describe_counter!(LOCAL_RELOADS_TOTAL, "Successful local configuration reloads");

    tracing::info!(address = %addr, "Metrics endpoint listening");
    Ok(())
}

/// Record one fetch attempt against a provider.
pub fn record_fetch(source: &str, outcome: &'static str, started: Instant) {
    counter!(FETCHES_TOTAL, "source" => source.to_owned(), "outcome" => outcome).increment(1);
    histogram!(FETCH_DURATION_SECONDS, "source" => source.to_owned())
        .record(started.elapsed().as_secs_f64());
}

pub fn set_active_pollers(count: usize) {
    gauge!(ACTIVE_POLLERS).set(count as f64);
}

pub fn record_merge(conflicts: usize) {
    gauge!(MERGE_CONFLICTS).set(conflicts as f64);
}

pub fn set_local_items(counts: ItemCounts) {
    gauge!(LOCAL_ITEMS, "kind" => "router").set(counts.routers as f64);
    gauge!(LOCAL_ITEMS, "kind" => "service").set(counts.services as f64);
    gauge!(LOCAL_ITEMS, "kind" => "middleware").set(counts.middlewares as f64);
}

pub fn record_local_reload(counts: ItemCounts) {
    counter!(LOCAL_RELOADS_TOTAL).increment(1);
    set_local_items(counts);
}
