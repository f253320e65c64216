//! Dynamic configuration aggregator.
//!
//! Polls external HTTP providers of reverse-proxy dynamic configuration,
//! keeps the latest snapshot of each, and merges them with first-party
//! configuration by priority.

pub mod admin;
pub mod config;
pub mod document;
pub mod http;
pub mod lifecycle;
pub mod local;
pub mod merge;
pub mod observability;
pub mod polling;
pub mod registry;
pub mod snapshot;
pub mod status;

pub use config::AggregatorConfig;
pub use lifecycle::{Aggregator, Shutdown};
pub use merge::{merge, Conflict, MergedConfiguration};
