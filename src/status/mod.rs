//! Per-source status report.
//!
//! A derived view computed on every call from the registry, the snapshot
//! cache and the local configuration. Nothing here is cached.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::document::ItemCounts;
use crate::merge::LOCAL_SOURCE;
use crate::registry::{RegistryError, Source, SourceRegistry};
use crate::snapshot::SnapshotCache;

/// Priority reported for the local entry.
pub const LOCAL_PRIORITY: i32 = i32::MAX;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceHealth {
    Healthy,
    Degraded,
    Unhealthy,
    Inactive,
}

impl SourceHealth {
    /// Inactive wins; an error is unhealthy until the first success, then degraded.
    pub fn classify(is_active: bool, last_error: &str, last_fetched: Option<DateTime<Utc>>) -> Self {
        if !is_active {
            SourceHealth::Inactive
        } else if !last_error.is_empty() {
            if last_fetched.is_none() {
                SourceHealth::Unhealthy
            } else {
                SourceHealth::Degraded
            }
        } else {
            SourceHealth::Healthy
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceInfo {
    pub name: String,
    pub priority: i32,
    pub status: SourceHealth,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_fetched: Option<DateTime<Utc>>,
    #[serde(default)]
    pub last_error: String,
    #[serde(flatten)]
    pub counts: ItemCounts,
}

impl SourceInfo {
    pub fn local(counts: ItemCounts) -> Self {
        Self {
            name: LOCAL_SOURCE.to_string(),
            priority: LOCAL_PRIORITY,
            status: SourceHealth::Healthy,
            last_fetched: None,
            last_error: String::new(),
            counts,
        }
    }

    /// Status of `source`, preferring the cached snapshot's fetch state.
    pub fn for_source(source: &Source, cache: &SnapshotCache) -> Self {
        let (last_fetched, last_error, counts) = match cache.get(source.id) {
            Some(snapshot) => (snapshot.last_fetched, snapshot.last_error.clone(), snapshot.counts),
            None => (source.last_fetched, source.last_error.clone(), source.counts),
        };

        Self {
            name: source.name.clone(),
            priority: source.priority,
            status: SourceHealth::classify(source.is_active, &last_error, last_fetched),
            last_fetched,
            last_error,
            counts,
        }
    }
}

/// The local entry first, then every registered source by priority descending.
pub async fn sources_info(
    registry: &dyn SourceRegistry,
    cache: &SnapshotCache,
    local_counts: ItemCounts,
) -> Result<Vec<SourceInfo>, RegistryError> {
    let sources = registry.list().await?;

    let mut report = Vec::with_capacity(sources.len() + 1);
    report.push(SourceInfo::local(local_counts));
    report.extend(sources.iter().map(|source| SourceInfo::for_source(source, cache)));
    Ok(report)
}
