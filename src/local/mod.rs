//! First-party (local) configuration.
//!
//! # Data Flow
//! ```text
//! local TOML file
//!     → model.rs (routers, services, middlewares entities)
//!     → convert.rs (rules, redirect middlewares, TLS domains)
//!     → store.rs (ArcSwap<HttpConfiguration>)
//!     → merge engine seed (local always wins)
//!
//! On file change:
//!     config::watcher → LocalConfigStore::reload → atomic swap
//! ```

pub mod convert;
pub mod model;
pub mod store;

pub use convert::to_http_configuration;
pub use model::{LocalEntities, MiddlewareEntity, MiddlewareSettings, RouterEntity, ServiceEntity};
pub use store::{load_local, parse_local, LocalConfigError, LocalConfigStore};
