//! Dynamic configuration document model.
//!
//! # Data Flow
//! ```text
//! Provider HTTP body (JSON)
//!     → DynamicConfig { http: { routers, services, middlewares } }
//!     → Snapshot (one per source)
//!     → merge engine (union by name, per kind)
//!     → DynamicConfig served to the reverse proxy
//! ```
//!
//! # Design Decisions
//! - Items are opaque `serde_json::Value`s; merging only needs their names
//! - Collections are `BTreeMap`s so serialization is deterministic
//! - Missing or `null` collections are empty maps, never errors

pub mod traefik;

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

/// Named items of one kind.
pub type ItemMap = BTreeMap<String, Value>;

/// Root of a dynamic configuration document.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DynamicConfig {
    #[serde(default, deserialize_with = "null_as_default")]
    pub http: HttpConfiguration,
}

/// The three independently merged namespaces.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HttpConfiguration {
    #[serde(default, deserialize_with = "null_as_default")]
    pub routers: ItemMap,

    #[serde(default, deserialize_with = "null_as_default")]
    pub services: ItemMap,

    #[serde(default, deserialize_with = "null_as_default")]
    pub middlewares: ItemMap,
}

impl DynamicConfig {
    pub fn new(http: HttpConfiguration) -> Self {
        Self { http }
    }

    pub fn counts(&self) -> ItemCounts {
        self.http.counts()
    }
}

impl HttpConfiguration {
    /// Collection holding items of `kind`.
    pub fn items(&self, kind: ItemKind) -> &ItemMap {
        match kind {
            ItemKind::Router => &self.routers,
            ItemKind::Service => &self.services,
            ItemKind::Middleware => &self.middlewares,
        }
    }

    pub fn items_mut(&mut self, kind: ItemKind) -> &mut ItemMap {
        match kind {
            ItemKind::Router => &mut self.routers,
            ItemKind::Service => &mut self.services,
            ItemKind::Middleware => &mut self.middlewares,
        }
    }

    pub fn counts(&self) -> ItemCounts {
        ItemCounts {
            routers: self.routers.len(),
            services: self.services.len(),
            middlewares: self.middlewares.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.routers.is_empty() && self.services.is_empty() && self.middlewares.is_empty()
    }
}

/// Kind of a configuration item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ItemKind {
    Router,
    Service,
    Middleware,
}

impl ItemKind {
    pub const ALL: [ItemKind; 3] = [ItemKind::Router, ItemKind::Service, ItemKind::Middleware];

    pub fn as_str(&self) -> &'static str {
        match self {
            ItemKind::Router => "router",
            ItemKind::Service => "service",
            ItemKind::Middleware => "middleware",
        }
    }
}

impl fmt::Display for ItemKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Item counts per collection.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemCounts {
    #[serde(rename = "router_count")]
    pub routers: usize,
    #[serde(rename = "service_count")]
    pub services: usize,
    #[serde(rename = "middleware_count")]
    pub middlewares: usize,
}

fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Option::unwrap_or_default)
}
