//! First-party configuration entities as written in the local TOML file.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Default router entry points.
pub const DEFAULT_ENTRY_POINTS: &str = "web, websecure";

/// Default ACME resolver for TLS routers.
pub const DEFAULT_CERT_RESOLVER: &str = "letsencrypt";

/// Contents of the local configuration file.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LocalEntities {
    pub routers: Vec<RouterEntity>,
    pub services: Vec<ServiceEntity>,
    pub middlewares: Vec<MiddlewareEntity>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RouterEntity {
    pub name: String,
    #[serde(default)]
    pub hostnames: Vec<String>,
    /// Name of the service traffic is sent to.
    pub service: String,
    /// Comma separated entry point names.
    #[serde(default = "default_entry_points")]
    pub entry_points: String,
    /// Names of middlewares to attach, in order.
    #[serde(default)]
    pub middlewares: Vec<String>,
    #[serde(default = "default_true")]
    pub redirect_https: bool,
    #[serde(default)]
    pub tls: bool,
    #[serde(default = "default_cert_resolver")]
    pub cert_resolver: String,
    #[serde(default = "default_true")]
    pub active: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServiceEntity {
    pub name: String,
    /// Backend server URLs.
    #[serde(default)]
    pub servers: Vec<String>,
    #[serde(default = "default_true")]
    pub pass_host_header: bool,
    #[serde(default)]
    pub health_check_path: Option<String>,
    #[serde(default)]
    pub health_check_interval_secs: Option<u64>,
    #[serde(default = "default_true")]
    pub active: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MiddlewareEntity {
    pub name: String,
    /// `redirectScheme`, `headers`, `stripPrefix` or `addPrefix`.
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub config: MiddlewareSettings,
    #[serde(default = "default_true")]
    pub active: bool,
}

/// Settings for every middleware type; each type reads its own fields.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MiddlewareSettings {
    // redirectScheme
    pub scheme: String,
    pub port: String,
    pub permanent: bool,

    // headers
    pub custom_request_headers: BTreeMap<String, String>,
    pub custom_response_headers: BTreeMap<String, String>,
    pub ssl_redirect: bool,

    // stripPrefix
    pub prefixes: Vec<String>,
    pub force_slash: bool,

    // addPrefix
    pub prefix: String,
}

fn default_entry_points() -> String {
    DEFAULT_ENTRY_POINTS.to_string()
}

fn default_cert_resolver() -> String {
    DEFAULT_CERT_RESOLVER.to_string()
}

fn default_true() -> bool {
    true
}
