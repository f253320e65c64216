//! Source management API.
//!
//! ```text
//! GET    /api/http-providers              list sources
//! POST   /api/http-providers              create (201; 409 on duplicate name)
//! GET    /api/http-providers/{id}         read
//! PUT    /api/http-providers/{id}         partial update, restarts polling
//! DELETE /api/http-providers/{id}         stop polling, evict, delete
//! POST   /api/http-providers/{id}/refresh fetch now in the background
//! POST   /api/http-providers/{id}/test    fetch now and return the record
//! ```

pub mod handlers;

use axum::routing::{get, post};
use axum::Router;

use self::handlers::*;
use crate::http::server::AppState;

pub fn setup_admin_router(state: AppState) -> Router {
    Router::new()
        .route("/api/http-providers", get(list_sources).post(create_source))
        .route(
            "/api/http-providers/{id}",
            get(get_source).put(update_source).delete(delete_source),
        )
        .route("/api/http-providers/{id}/refresh", post(refresh_source))
        .route("/api/http-providers/{id}/test", post(test_source))
        .with_state(state)
}
