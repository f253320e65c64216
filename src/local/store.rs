//! Hot-swappable holder of the converted local configuration.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use arc_swap::ArcSwap;

use crate::document::{HttpConfiguration, ItemCounts};
use crate::local::convert::to_http_configuration;
use crate::local::model::LocalEntities;

#[derive(thiserror::Error, Debug)]
pub enum LocalConfigError {
    #[error("failed to read local configuration: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse local configuration: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("failed to render local configuration: {0}")]
    Render(#[from] serde_json::Error),
}

/// Parse local entities from TOML text and convert them.
pub fn parse_local(content: &str) -> Result<HttpConfiguration, LocalConfigError> {
    let entities: LocalEntities = toml::from_str(content)?;
    Ok(to_http_configuration(&entities)?)
}

/// Read and convert a local configuration file.
pub fn load_local(path: &Path) -> Result<HttpConfiguration, LocalConfigError> {
    let content = fs::read_to_string(path)?;
    parse_local(&content)
}

/// Current local configuration, readable lock-free from request handlers.
#[derive(Clone)]
pub struct LocalConfigStore {
    current: Arc<ArcSwap<HttpConfiguration>>,
    path: Option<PathBuf>,
}

impl LocalConfigStore {
    /// A store holding `config`, not backed by a file.
    pub fn new(config: HttpConfiguration) -> Self {
        Self {
            current: Arc::new(ArcSwap::from_pointee(config)),
            path: None,
        }
    }

    pub fn empty() -> Self {
        Self::new(HttpConfiguration::default())
    }

    /// Load `path` into a new store that can later be reloaded.
    pub fn open(path: &Path) -> Result<Self, LocalConfigError> {
        let config = load_local(path)?;
        tracing::info!(
            path = %path.display(),
            routers = config.routers.len(),
            services = config.services.len(),
            middlewares = config.middlewares.len(),
            "Local configuration loaded"
        );
        Ok(Self {
            current: Arc::new(ArcSwap::from_pointee(config)),
            path: Some(path.to_path_buf()),
        })
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    pub fn current(&self) -> Arc<HttpConfiguration> {
        self.current.load_full()
    }

    pub fn counts(&self) -> ItemCounts {
        self.current.load().counts()
    }

    pub fn replace(&self, config: HttpConfiguration) {
        self.current.store(Arc::new(config));
    }

    /// Re-read the backing file. On error the current configuration is kept.
    pub fn reload(&self) -> Result<ItemCounts, LocalConfigError> {
        let Some(path) = self.path.as_deref() else {
            return Ok(self.counts());
        };
        let config = load_local(path)?;
        let counts = config.counts();
        self.replace(config);
        Ok(counts)
    }
}

impl Default for LocalConfigStore {
    fn default() -> Self {
        Self::empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const ONE_ROUTER: &str = r#"
[[routers]]
name = "app"
hostnames = ["app.example.com"]
service = "app-svc"
redirect_https = false

[[services]]
name = "app-svc"
servers = ["http://10.0.0.1:8080"]
"#;

    #[test]
    fn test_parse_local_file_format() {
        let config = parse_local(ONE_ROUTER).unwrap();
        assert_eq!(config.counts(), ItemCounts { routers: 1, services: 1, middlewares: 0 });
    }

    #[test]
    fn test_redirect_https_defaults_on() {
        let config = parse_local(
            r#"
[[routers]]
name = "app"
hostnames = ["app.example.com"]
service = "app-svc"
"#,
        )
        .unwrap();
        assert!(config.middlewares.contains_key("app-redirect-https"));
    }

    #[test]
    fn test_reload_keeps_current_on_error() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(ONE_ROUTER.as_bytes()).unwrap();
        file.flush().unwrap();

        let store = LocalConfigStore::open(file.path()).unwrap();
        assert_eq!(store.counts().routers, 1);

        fs::write(file.path(), "routers = 7").unwrap();
        assert!(store.reload().is_err());
        assert_eq!(store.counts().routers, 1);

        fs::write(file.path(), "").unwrap();
        assert_eq!(store.reload().unwrap(), ItemCounts::default());
        assert!(store.current().is_empty());
    }

    #[test]
    fn test_store_without_file() {
        let store = LocalConfigStore::empty();
        assert!(store.path().is_none());
        assert_eq!(store.reload().unwrap(), ItemCounts::default());
    }
}
