//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! aggregator.toml
//!     → loader.rs (parse & deserialize)
//!     → validation.rs (semantic checks, all errors at once)
//!     → AggregatorConfig (validated, immutable)
//!     → startup: listener, poller settings, source seed, local file
//!
//! Local configuration file:
//!     watcher.rs detects change
//!     → LocalConfigStore::reload
//!     → atomic swap; next merge sees the new items
//! ```
//!
//! # Design Decisions
//! - Service config is immutable once loaded; sources change through the API
//! - All fields have defaults to allow minimal configs
//! - Validation separates syntactic (serde) from semantic checks

pub mod loader;
pub mod schema;
pub mod validation;
pub mod watcher;

pub use loader::{load_config, parse_config, ConfigError};
pub use schema::{AggregatorConfig, ListenerConfig, LocalConfig, ObservabilityConfig, PollerConfig, SourceConfig};
pub use watcher::LocalConfigWatcher;
