//! HTTP surface.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (axum, request id, trace span, timeout)
//!     → handlers.rs: GET /api/provider/config
//!         → LocalConfigStore::current + Aggregator::merged → { "http": ... }
//!     → handlers.rs: merged-config / status views
//!     → admin: source management and refresh
//! ```
//!
//! # Design Decisions
//! - Merging happens per request; there is no cached merged document
//! - Every error body is `{ "error": "..." }`

pub mod error;
pub mod handlers;
pub mod request;
pub mod server;

pub use error::ApiError;
pub use request::REQUEST_ID_HEADER;
pub use server::{build_router, AppState, HttpServer};
