//! Provider polling subsystem.
//!
//! # Data Flow
//! ```text
//! Poller (one tokio task per active source)
//!     → interval tick (max(refresh_interval, floor))
//!     → re-read source from registry
//!     → fetcher.rs: GET url (timeout) → parse JSON
//!     → SnapshotCache (generation checked)
//!     → registry status fields (failures logged, never raised)
//! ```
//!
//! # Design Decisions
//! - Exactly one task per source; restarts cancel the old task first
//! - A failed fetch keeps the previous document and records the error
//! - No retries beyond the next scheduled tick

pub mod fetcher;
pub mod poller;

pub use fetcher::{FetchError, Fetcher};
pub use poller::{effective_interval, PollContext, PollOutcome, Poller, PollerExit, MAX_POLL_INTERVAL, MIN_POLL_INTERVAL};
