//! Source registry.
//!
//! # Data Flow
//! ```text
//! admin API / config seed
//!     → SourceRegistry::create / update / delete
//!     → Aggregator lifecycle hooks (start / restart / stop pollers)
//!
//! Poller tick
//!     → SourceRegistry::get (re-read definition)
//!     → fetch
//!     → SourceRegistry::update_status (denormalized status fields)
//! ```
//!
//! # Design Decisions
//! - Async trait: the production store is a database
//! - The aggregator only reads definitions and writes status fields
//! - Status write failures are the caller's to log; they never stop polling

pub mod memory;

use std::fmt;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::document::ItemCounts;
use crate::merge::LOCAL_SOURCE;

pub use memory::MemoryRegistry;

/// Refresh interval applied when a source is created without a usable one.
pub const DEFAULT_REFRESH_INTERVAL_SECS: u64 = 30;

/// Smallest refresh interval the registry accepts.
pub const MIN_REFRESH_INTERVAL_SECS: u64 = 5;

/// Largest refresh interval the registry accepts (one day).
pub const MAX_REFRESH_INTERVAL_SECS: u64 = 86_400;

/// Reject names a source may not take.
///
/// `local` is reserved for first-party configuration in merges and reports.
pub fn check_source_name(name: &str) -> Result<(), RegistryError> {
    if name.trim().is_empty() {
        return Err(RegistryError::Invalid("name must not be empty".into()));
    }
    if name.eq_ignore_ascii_case(LOCAL_SOURCE) {
        return Err(RegistryError::Invalid(format!("name '{name}' is reserved")));
    }
    Ok(())
}

pub fn check_refresh_interval(secs: u64) -> Result<(), RegistryError> {
    if secs > MAX_REFRESH_INTERVAL_SECS {
        return Err(RegistryError::Invalid(format!(
            "refresh_interval must not exceed {MAX_REFRESH_INTERVAL_SECS} seconds"
        )));
    }
    Ok(())
}

/// Stable identity of a source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SourceId(pub u64);

impl fmt::Display for SourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// An external provider of dynamic configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Source {
    pub id: SourceId,
    pub name: String,
    pub url: String,
    /// Higher wins conflicts.
    pub priority: i32,
    pub is_active: bool,
    pub refresh_interval: u64,
    pub last_fetched: Option<DateTime<Utc>>,
    pub last_error: String,
    #[serde(flatten)]
    pub counts: ItemCounts,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Fields for creating a source.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NewSource {
    pub name: String,
    pub url: String,
    #[serde(default)]
    pub priority: i32,
    #[serde(default)]
    pub refresh_interval: u64,
    #[serde(default)]
    pub is_active: bool,
}

/// Partial update of a source; `None` leaves the field unchanged.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SourceUpdate {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub priority: Option<i32>,
    #[serde(default)]
    pub refresh_interval: Option<u64>,
    #[serde(default)]
    pub is_active: Option<bool>,
}

/// Denormalized status written back after each fetch.
#[derive(Debug, Clone, PartialEq)]
pub enum StatusUpdate {
    Success {
        fetched_at: DateTime<Utc>,
        counts: ItemCounts,
    },
    Failure {
        error: String,
    },
}

#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum RegistryError {
    #[error("source {0} not found")]
    NotFound(SourceId),
    #[error("a source named '{0}' already exists")]
    DuplicateName(String),
    #[error("invalid source: {0}")]
    Invalid(String),
    #[error("registry unavailable: {0}")]
    Unavailable(String),
}

/// Storage of source definitions.
#[async_trait]
pub trait SourceRegistry: Send + Sync {
    /// All sources, priority descending then creation order.
    async fn list(&self) -> Result<Vec<Source>, RegistryError>;

    async fn get(&self, id: SourceId) -> Result<Option<Source>, RegistryError>;

    async fn create(&self, source: NewSource) -> Result<Source, RegistryError>;

    async fn update(&self, id: SourceId, update: SourceUpdate) -> Result<Source, RegistryError>;

    async fn delete(&self, id: SourceId) -> Result<(), RegistryError>;

    async fn update_status(&self, id: SourceId, status: StatusUpdate) -> Result<(), RegistryError>;
}
