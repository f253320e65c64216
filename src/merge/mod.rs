//! Configuration merge engine.
//!
//! # Data Flow
//! ```text
//! local HttpConfiguration ──┐
//!                           ├─→ engine.rs (seed local, walk sources by priority)
//! SnapshotCache::get_all ───┘        → MergedConfiguration { config, conflicts }
//! ```
//!
//! # Design Decisions
//! - Pure function: no I/O, no mutation of snapshots
//! - Local items always win; then higher priority; then name order
//! - Routers, services and middlewares are independent namespaces
//! - Sources currently reporting an error are left out entirely

pub mod engine;

pub use engine::{merge, Conflict, MergedConfiguration, LOCAL_SOURCE};
