//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Create the axum Router with the provider, status and management routes
//! - Wire up middleware (request ids, tracing, timeout)
//! - Serve until the shutdown signal fires

use std::time::Duration;

use axum::routing::get;
use axum::Router;
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tower::ServiceBuilder;
use tower_http::request_id::{PropagateRequestIdLayer, SetRequestIdLayer};
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;

use crate::admin::setup_admin_router;
use crate::config::ListenerConfig;
use crate::http::handlers;
use crate::http::request::UuidRequestId;
use crate::lifecycle::Aggregator;
use crate::local::LocalConfigStore;
use crate::observability::tracing::RequestSpan;

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    pub aggregator: Aggregator,
    pub local: LocalConfigStore,
}

impl AppState {
    pub fn new(aggregator: Aggregator, local: LocalConfigStore) -> Self {
        Self { aggregator, local }
    }
}

/// HTTP server exposing the merged configuration and the management API.
pub struct HttpServer {
    router: Router,
    config: ListenerConfig,
}

impl HttpServer {
    pub fn new(config: ListenerConfig, state: AppState) -> Self {
        let router = build_router(state, Duration::from_secs(config.request_timeout_secs));
        Self { router, config }
    }

    /// Run the server until `shutdown` fires, then drain in-flight requests.
    pub async fn run(
        self,
        listener: TcpListener,
        mut shutdown: broadcast::Receiver<()>,
    ) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(address = %addr, "HTTP server starting");

        axum::serve(listener, self.router)
            .with_graceful_shutdown(async move {
                let _ = shutdown.recv().await;
                tracing::info!("HTTP server shutting down");
            })
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }

    pub fn config(&self) -> &ListenerConfig {
        &self.config
    }
}

/// Build the full router with all middleware layers.
#[allow(deprecated)]
pub fn build_router(state: AppState, request_timeout: Duration) -> Router {
    Router::new()
        .route("/health", get(handlers::health))
        .route("/api/provider/config", get(handlers::provider_config))
        .route("/api/http-providers/merged-config", get(handlers::merged_config))
        .route("/api/http-providers/status", get(handlers::sources_status))
        .with_state(state.clone())
        .merge(setup_admin_router(state))
        .layer(
            ServiceBuilder::new()
                .layer(SetRequestIdLayer::x_request_id(UuidRequestId))
                .layer(PropagateRequestIdLayer::x_request_id())
                .layer(TraceLayer::new_for_http().make_span_with(RequestSpan))
                .layer(TimeoutLayer::new(request_timeout)),
        )
}
