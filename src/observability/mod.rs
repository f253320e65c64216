//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! Pollers, lifecycle, HTTP handlers produce:
//!     → logging.rs (structured tracing events)
//!     → metrics.rs (fetch counters and latency, poller and conflict gauges)
//!     → tracing.rs (per-request spans with request ids)
//!
//! Consumers:
//!     → stdout
//!     → Prometheus scrape endpoint (optional)
//! ```

pub mod logging;
pub mod metrics;
pub mod tracing;
