//! In-process source registry.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use dashmap::DashMap;
use tokio::sync::Mutex;

use crate::document::ItemCounts;
use crate::registry::{
    check_refresh_interval, check_source_name, NewSource, RegistryError, Source, SourceId,
    SourceRegistry, SourceUpdate, StatusUpdate, DEFAULT_REFRESH_INTERVAL_SECS,
    MIN_REFRESH_INTERVAL_SECS,
};

/// Registry kept in memory.
///
/// Reads go straight to the map. Definition writes are serialized so that
/// name uniqueness holds without a transactional store.
#[derive(Clone, Default)]
pub struct MemoryRegistry {
    sources: Arc<DashMap<SourceId, Source>>,
    next_id: Arc<AtomicU64>,
    write_lock: Arc<Mutex<()>>,
}

impl MemoryRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of registered sources.
    pub fn len(&self) -> usize {
        self.sources.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sources.is_empty()
    }

    fn name_taken(&self, name: &str, except: Option<SourceId>) -> bool {
        self.sources
            .iter()
            .any(|entry| entry.name == name && Some(entry.id) != except)
    }
}

#[async_trait]
impl SourceRegistry for MemoryRegistry {
    async fn list(&self) -> Result<Vec<Source>, RegistryError> {
        let mut sources: Vec<Source> = self.sources.iter().map(|r| r.value().clone()).collect();
        // Ids are allocated in creation order.
        sources.sort_by(|a, b| b.priority.cmp(&a.priority).then(a.id.cmp(&b.id)));
        Ok(sources)
    }

    async fn get(&self, id: SourceId) -> Result<Option<Source>, RegistryError> {
        Ok(self.sources.get(&id).map(|r| r.value().clone()))
    }

    async fn create(&self, new: NewSource) -> Result<Source, RegistryError> {
        check_source_name(&new.name)?;
        check_refresh_interval(new.refresh_interval)?;
        if new.url.trim().is_empty() {
            return Err(RegistryError::Invalid("url must not be empty".into()));
        }

        let _guard = self.write_lock.lock().await;
        if self.name_taken(&new.name, None) {
            return Err(RegistryError::DuplicateName(new.name));
        }

        let refresh_interval = if new.refresh_interval < MIN_REFRESH_INTERVAL_SECS {
            DEFAULT_REFRESH_INTERVAL_SECS
        } else {
            new.refresh_interval
        };

        let now = Utc::now();
        let source = Source {
            id: SourceId(self.next_id.fetch_add(1, Ordering::Relaxed) + 1),
            name: new.name,
            url: new.url,
            priority: new.priority,
            is_active: new.is_active,
            refresh_interval,
            last_fetched: None,
            last_error: String::new(),
            counts: ItemCounts::default(),
            created_at: now,
            updated_at: now,
        };
        self.sources.insert(source.id, source.clone());

        tracing::debug!(source_id = %source.id, name = %source.name, "Source registered");
        Ok(source)
    }

    async fn update(&self, id: SourceId, update: SourceUpdate) -> Result<Source, RegistryError> {
        if let Some(name) = update.name.as_deref().filter(|n| !n.is_empty()) {
            check_source_name(name)?;
        }
        if let Some(interval) = update.refresh_interval {
            check_refresh_interval(interval)?;
        }

        let _guard = self.write_lock.lock().await;

        if let Some(name) = update.name.as_deref().filter(|n| !n.is_empty()) {
            if self.name_taken(name, Some(id)) {
                return Err(RegistryError::DuplicateName(name.to_string()));
            }
        }

        let mut entry = self.sources.get_mut(&id).ok_or(RegistryError::NotFound(id))?;
        let source = entry.value_mut();

        if let Some(name) = update.name.filter(|n| !n.is_empty()) {
            source.name = name;
        }
        if let Some(url) = update.url.filter(|u| !u.is_empty()) {
            source.url = url;
        }
        if let Some(priority) = update.priority {
            source.priority = priority;
        }
        if let Some(interval) = update.refresh_interval.filter(|i| *i >= MIN_REFRESH_INTERVAL_SECS) {
            source.refresh_interval = interval;
        }
        if let Some(active) = update.is_active {
            source.is_active = active;
        }
        source.updated_at = Utc::now();

        Ok(source.clone())
    }

    async fn delete(&self, id: SourceId) -> Result<(), RegistryError> {
        let _guard = self.write_lock.lock().await;
        self.sources
            .remove(&id)
            .map(|_| ())
            .ok_or(RegistryError::NotFound(id))
    }

    async fn update_status(&self, id: SourceId, status: StatusUpdate) -> Result<(), RegistryError> {
        let mut entry = self.sources.get_mut(&id).ok_or(RegistryError::NotFound(id))?;
        let source = entry.value_mut();
        match status {
            StatusUpdate::Success { fetched_at, counts } => {
                source.last_fetched = Some(fetched_at);
                source.last_error.clear();
                source.counts = counts;
            }
            StatusUpdate::Failure { error } => {
                source.last_error = error;
            }
        }
        Ok(())
    }
}
