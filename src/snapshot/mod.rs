//! Snapshot cache.
//!
//! # Data Flow
//! ```text
//! Poller fetch result
//!     → Snapshot (document + error + timestamp + counts)
//!     → SnapshotCache::apply_if_current (generation checked)
//!
//! Merge / status readers
//!     → SnapshotCache::get_all (Arc clones, no fetch in the critical section)
//! ```
//!
//! # Design Decisions
//! - One slot per source; a snapshot is replaced whole, never edited in place
//! - Readers clone `Arc<Snapshot>` so they see either the old or the new value
//! - Each poller start arms a new generation; stale writers are dropped

pub mod cache;

use std::sync::Arc;

use chrono::{DateTime, Utc};

use crate::document::{DynamicConfig, ItemCounts};
use crate::registry::{Source, SourceId};

pub use cache::SnapshotCache;

/// Latest known state of one source.
#[derive(Debug, Clone, PartialEq)]
pub struct Snapshot {
    pub source_id: SourceId,
    pub name: String,
    pub url: String,
    pub priority: i32,
    pub is_active: bool,
    /// Last successfully fetched document, if any.
    pub document: Option<Arc<DynamicConfig>>,
    pub last_fetched: Option<DateTime<Utc>>,
    /// Empty when the last fetch succeeded.
    pub last_error: String,
    pub counts: ItemCounts,
}

impl Snapshot {
    /// Snapshot of a source that has not been fetched yet.
    pub fn pending(source: &Source) -> Self {
        Self {
            source_id: source.id,
            name: source.name.clone(),
            url: source.url.clone(),
            priority: source.priority,
            is_active: source.is_active,
            document: None,
            last_fetched: None,
            last_error: String::new(),
            counts: ItemCounts::default(),
        }
    }

    /// Successor after a successful fetch: the new document replaces the old one.
    pub fn succeeded(source: &Source, document: DynamicConfig, fetched_at: DateTime<Utc>) -> Self {
        Self {
            counts: document.counts(),
            document: Some(Arc::new(document)),
            last_fetched: Some(fetched_at),
            last_error: String::new(),
            ..Self::pending(source)
        }
    }

    /// Successor after a failed fetch: the previous document is retained.
    pub fn failed(source: &Source, previous: Option<&Snapshot>, error: String) -> Self {
        let mut next = Self::pending(source);
        if let Some(previous) = previous {
            next.document = previous.document.clone();
            next.last_fetched = previous.last_fetched;
            next.counts = previous.counts;
        }
        next.last_error = error;
        next
    }

    pub fn is_healthy(&self) -> bool {
        self.last_error.is_empty()
    }

    /// Whether this snapshot contributes to merges.
    pub fn is_mergeable(&self) -> bool {
        self.is_active && self.document.is_some() && self.last_error.is_empty()
    }
}
