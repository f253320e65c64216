//! Configuration schema definitions.
//!
//! Every section has defaults, so an empty file is a valid configuration.

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::lifecycle::PollerSettings;
use crate::registry::{NewSource, DEFAULT_REFRESH_INTERVAL_SECS};

/// Root configuration of the aggregator service.
#[derive(Debug, Clone, Deserialize, Serialize, Default, PartialEq)]
#[serde(default)]
pub struct AggregatorConfig {
    /// HTTP listener for the provider endpoint and management API.
    pub listener: ListenerConfig,

    /// Poller tuning.
    pub poller: PollerConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,

    /// First-party configuration file.
    pub local: LocalConfig,

    /// Sources registered at startup.
    pub sources: Vec<SourceConfig>,
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct ListenerConfig {
    /// Bind address (e.g., "0.0.0.0:8080").
    pub bind_address: String,

    /// Request timeout in seconds.
    pub request_timeout_secs: u64,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:8080".to_string(),
            request_timeout_secs: 30,
        }
    }
}

/// Poller configuration.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct PollerConfig {
    /// Timeout of a single provider fetch in seconds.
    pub fetch_timeout_secs: u64,

    /// Floor applied to every source's refresh interval, in seconds.
    pub min_interval_secs: u64,
}

impl Default for PollerConfig {
    fn default() -> Self {
        Self {
            fetch_timeout_secs: 5,
            min_interval_secs: 5,
        }
    }
}

impl PollerConfig {
    pub fn settings(&self) -> PollerSettings {
        PollerSettings {
            min_interval: Duration::from_secs(self.min_interval_secs),
            fetch_timeout: Duration::from_secs(self.fetch_timeout_secs),
        }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            metrics_enabled: true,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}

/// Local (first-party) configuration file.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct LocalConfig {
    /// TOML file of routers, services and middlewares. None means no local items.
    pub path: Option<PathBuf>,

    /// Reload the file when it changes.
    pub watch: bool,
}

impl Default for LocalConfig {
    fn default() -> Self {
        Self {
            path: None,
            watch: true,
        }
    }
}

/// A source registered at startup.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct SourceConfig {
    pub name: String,

    /// URL returning a dynamic configuration document.
    pub url: String,

    /// Higher wins conflicts.
    #[serde(default)]
    pub priority: i32,

    /// Poll interval in seconds.
    #[serde(default = "default_refresh_interval")]
    pub refresh_interval_secs: u64,

    #[serde(default = "default_active")]
    pub active: bool,
}

fn default_refresh_interval() -> u64 {
    DEFAULT_REFRESH_INTERVAL_SECS
}

fn default_active() -> bool {
    true
}

impl From<&SourceConfig> for NewSource {
    fn from(source: &SourceConfig) -> Self {
        NewSource {
            name: source.name.clone(),
            url: source.url.clone(),
            priority: source.priority,
            refresh_interval: source.refresh_interval_secs,
            is_active: source.active,
        }
    }
}
