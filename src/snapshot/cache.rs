//! Concurrent snapshot storage keyed by source identity.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use dashmap::DashMap;

use crate::registry::{Source, SourceId};
use crate::snapshot::Snapshot;

#[derive(Debug)]
struct Slot {
    /// Generation of the poller allowed to write this slot.
    generation: u64,
    /// Insertion order, for stable display ordering.
    seq: u64,
    snapshot: Arc<Snapshot>,
}

/// Thread-safe map from source identity to its latest snapshot.
///
/// Locking is per shard and only covers the map operation itself; fetches
/// always happen outside of it.
#[derive(Clone, Default)]
pub struct SnapshotCache {
    slots: Arc<DashMap<SourceId, Slot>>,
    generations: Arc<AtomicU64>,
    seq: Arc<AtomicU64>,
}

impl SnapshotCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Arm the slot for a (re)started poller and return its write generation.
    ///
    /// An existing snapshot keeps its document, error and timestamps; only
    /// the source definition fields are refreshed.
    pub fn arm(&self, source: &Source) -> u64 {
        let generation = self.generations.fetch_add(1, Ordering::Relaxed) + 1;
        let mut slot = self.slots.entry(source.id).or_insert_with(|| Slot {
            generation,
            seq: self.seq.fetch_add(1, Ordering::Relaxed),
            snapshot: Arc::new(Snapshot::pending(source)),
        });

        slot.generation = generation;
        if slot.snapshot.name != source.name
            || slot.snapshot.url != source.url
            || slot.snapshot.priority != source.priority
            || slot.snapshot.is_active != source.is_active
        {
            let mut refreshed = (*slot.snapshot).clone();
            refreshed.name = source.name.clone();
            refreshed.url = source.url.clone();
            refreshed.priority = source.priority;
            refreshed.is_active = source.is_active;
            slot.snapshot = Arc::new(refreshed);
        }
        generation
    }

    /// Current write generation of a source, if it has a slot.
    pub fn generation(&self, id: SourceId) -> Option<u64> {
        self.slots.get(&id).map(|slot| slot.generation)
    }

    /// Unconditionally replace the snapshot of `id`.
    pub fn put(&self, id: SourceId, snapshot: Snapshot) {
        let snapshot = Arc::new(snapshot);
        match self.slots.get_mut(&id) {
            Some(mut slot) => slot.snapshot = snapshot,
            None => {
                self.slots.insert(
                    id,
                    Slot {
                        generation: 0,
                        seq: self.seq.fetch_add(1, Ordering::Relaxed),
                        snapshot,
                    },
                );
            }
        }
    }

    /// Replace the snapshot of `id` with `next(previous)` if `generation` still owns the slot.
    ///
    /// Returns false when the slot was evicted or re-armed by a newer poller,
    /// in which case nothing is written.
    pub fn apply_if_current<F>(&self, id: SourceId, generation: u64, next: F) -> bool
    where
        F: FnOnce(&Snapshot) -> Snapshot,
    {
        match self.slots.get_mut(&id) {
            Some(mut slot) if slot.generation == generation => {
                let replacement = next(&slot.snapshot);
                slot.snapshot = Arc::new(replacement);
                true
            }
            _ => false,
        }
    }

    pub fn get(&self, id: SourceId) -> Option<Arc<Snapshot>> {
        self.slots.get(&id).map(|slot| slot.snapshot.clone())
    }

    /// All snapshots, in no particular order.
    pub fn get_all(&self) -> Vec<Arc<Snapshot>> {
        self.slots.iter().map(|slot| slot.snapshot.clone()).collect()
    }

    /// All snapshots, priority descending, ties in insertion order.
    pub fn list_sorted_by_priority_desc(&self) -> Vec<Arc<Snapshot>> {
        let mut entries: Vec<(u64, Arc<Snapshot>)> = self
            .slots
            .iter()
            .map(|slot| (slot.seq, slot.snapshot.clone()))
            .collect();
        entries.sort_by(|(seq_a, a), (seq_b, b)| b.priority.cmp(&a.priority).then(seq_a.cmp(seq_b)));
        entries.into_iter().map(|(_, snapshot)| snapshot).collect()
    }

    /// Evict the snapshot of `id`.
    pub fn remove(&self, id: SourceId) -> Option<Arc<Snapshot>> {
        self.slots.remove(&id).map(|(_, slot)| slot.snapshot)
    }

    /// Evict the snapshot of `id` only if `generation` still owns it.
    pub fn remove_if_current(&self, id: SourceId, generation: u64) -> bool {
        self.slots
            .remove_if(&id, |_, slot| slot.generation == generation)
            .is_some()
    }

    pub fn clear(&self) {
        self.slots.clear();
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }
}
