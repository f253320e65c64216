//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Startup (startup.rs):
//!     Load config → seed registry → load local file → start pollers → serve
//!
//! Source changes (controller.rs):
//!     created / updated → Aggregator::start (cancel old, arm, fetch, spawn)
//!     deleted           → Aggregator::stop (cancel, evict)
//!
//! Shutdown (shutdown.rs, signals.rs):
//!     SIGTERM/SIGINT → broadcast → server drains, pollers exit
//! ```
//!
//! # Design Decisions
//! - Ordered startup: registry and pollers before the listener accepts traffic
//! - Failing to read the registry at startup is fatal
//! - Poller cancellation is cooperative; late results are discarded

pub mod controller;
pub mod shutdown;
pub mod signals;
pub mod startup;

pub use controller::{Aggregator, LifecycleError, PollerSettings, DEFAULT_FETCH_TIMEOUT};
pub use shutdown::Shutdown;
pub use signals::spawn_signal_handler;
pub use startup::{bootstrap, run, Service, StartupError};
