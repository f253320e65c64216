//! Provider endpoint and read-only aggregate views.

use axum::extract::State;
use axum::Json;
use serde::{Deserialize, Serialize};

use crate::document::DynamicConfig;
use crate::http::error::ApiError;
use crate::http::server::AppState;
use crate::merge::Conflict;
use crate::status::{self, SourceInfo};

#[derive(Debug, Serialize, Deserialize)]
pub struct HealthStatus {
    pub status: String,
    pub version: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct MergedView {
    pub config: DynamicConfig,
    pub conflicts: Vec<Conflict>,
    pub sources: Vec<SourceInfo>,
}

pub async fn health() -> Json<HealthStatus> {
    Json(HealthStatus {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

/// The merged document polled by the reverse proxy.
///
/// Conflicts are logged, not returned.
pub async fn provider_config(State(state): State<AppState>) -> Json<DynamicConfig> {
    let local = state.local.current();
    let merged = state.aggregator.merged(&local);

    for conflict in &merged.conflicts {
        tracing::debug!(
            kind = %conflict.kind,
            name = %conflict.name,
            source = %conflict.source,
            overridden_by = %conflict.overridden_by,
            source_priority = conflict.source_priority,
            "Configuration conflict"
        );
    }

    Json(merged.config)
}

pub async fn merged_config(State(state): State<AppState>) -> Result<Json<MergedView>, ApiError> {
    let local = state.local.current();
    let merged = state.aggregator.merged(&local);
    let sources = sources_report(&state).await?;

    Ok(Json(MergedView {
        config: merged.config,
        conflicts: merged.conflicts,
        sources,
    }))
}

pub async fn sources_status(State(state): State<AppState>) -> Result<Json<Vec<SourceInfo>>, ApiError> {
    Ok(Json(sources_report(&state).await?))
}

async fn sources_report(state: &AppState) -> Result<Vec<SourceInfo>, ApiError> {
    let aggregator = &state.aggregator;
    Ok(status::sources_info(aggregator.registry().as_ref(), aggregator.cache(), state.local.counts()).await?)
}
