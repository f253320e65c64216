//! Priority merge of local configuration and provider snapshots.

use std::collections::HashMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::document::{DynamicConfig, HttpConfiguration, ItemKind};
use crate::snapshot::Snapshot;

/// Owner name recorded for first-party items.
pub const LOCAL_SOURCE: &str = "local";

/// A definition that lost to an earlier owner of the same name.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Conflict {
    #[serde(rename = "type")]
    pub kind: ItemKind,
    pub name: String,
    /// Source whose definition was dropped.
    pub source: String,
    /// Source that owns the name in the merged result.
    pub overridden_by: String,
    /// Priority of `source`, the dropped definition, not of the winner.
    pub source_priority: i32,
}

/// Result of a merge pass.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MergedConfiguration {
    pub config: DynamicConfig,
    pub conflicts: Vec<Conflict>,
}

/// Merge `local` with every mergeable snapshot.
///
/// Local items are seeded first and never replaced. Snapshots that are
/// active, hold a document and report no error are then walked by priority
/// descending (ties by source name); the first owner of a name keeps it and
/// every later definition is reported as a [`Conflict`].
pub fn merge(local: &HttpConfiguration, snapshots: &[Arc<Snapshot>]) -> MergedConfiguration {
    let mut candidates: Vec<&Snapshot> = snapshots
        .iter()
        .map(|snapshot| snapshot.as_ref())
        .filter(|snapshot| snapshot.is_mergeable())
        .collect();
    candidates.sort_by(|a, b| b.priority.cmp(&a.priority).then_with(|| a.name.cmp(&b.name)));

    let mut merged = local.clone();
    let mut conflicts = Vec::new();

    for kind in ItemKind::ALL {
        let mut owners: HashMap<&str, &str> = local
            .items(kind)
            .keys()
            .map(|name| (name.as_str(), LOCAL_SOURCE))
            .collect();
        let items = merged.items_mut(kind);

        for snapshot in candidates.iter().copied() {
            let Some(document) = snapshot.document.as_deref() else {
                continue;
            };

            for (name, item) in document.http.items(kind) {
                match owners.get(name.as_str()) {
                    // Names are unique within one document, so any owner is an earlier one.
                    Some(owner) => conflicts.push(Conflict {
                        kind,
                        name: name.clone(),
                        source: snapshot.name.clone(),
                        overridden_by: (*owner).to_string(),
                        source_priority: snapshot.priority,
                    }),
                    None => {
                        items.insert(name.clone(), item.clone());
                        owners.insert(name.as_str(), snapshot.name.as_str());
                    }
                }
            }
        }
    }

    MergedConfiguration {
        config: DynamicConfig::new(merged),
        conflicts,
    }
}
