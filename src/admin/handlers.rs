//! Source management handlers.
//!
//! Every mutation goes to the registry first and is then reported to the
//! aggregator, which starts, restarts or stops the source's poller.

use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use serde::{Deserialize, Serialize};

use crate::config::validation::check_source_url;
use crate::http::server::AppState;
use crate::http::ApiError;
use crate::lifecycle::LifecycleError;
use crate::registry::{NewSource, Source, SourceId, SourceUpdate};

#[derive(Debug, Serialize, Deserialize)]
pub struct Message {
    pub message: String,
}

impl Message {
    fn new(message: &str) -> Json<Self> {
        Json(Self {
            message: message.to_string(),
        })
    }
}

fn parse_id(raw: &str) -> Result<SourceId, ApiError> {
    raw.parse::<u64>()
        .map(SourceId)
        .map_err(|_| ApiError::BadRequest("Invalid provider ID".into()))
}

fn check_url(url: &str) -> Result<(), ApiError> {
    check_source_url(url).map_err(|reason| ApiError::BadRequest(format!("invalid url '{url}': {reason}")))
}

pub async fn list_sources(State(state): State<AppState>) -> Result<Json<Vec<Source>>, ApiError> {
    Ok(Json(state.aggregator.registry().list().await?))
}

pub async fn get_source(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Source>, ApiError> {
    let id = parse_id(&id)?;
    state
        .aggregator
        .registry()
        .get(id)
        .await?
        .map(Json)
        .ok_or_else(|| ApiError::NotFound("Provider not found".into()))
}

pub async fn create_source(
    State(state): State<AppState>,
    body: Result<Json<NewSource>, JsonRejection>,
) -> Result<(StatusCode, Json<Source>), ApiError> {
    let Json(new_source) = body?;
    check_url(&new_source.url)?;

    let source = state.aggregator.registry().create(new_source).await?;
    tracing::info!(source = %source.name, id = %source.id, "Provider created");

    state.aggregator.on_source_created(&source).await;
    Ok((StatusCode::CREATED, Json(source)))
}

pub async fn update_source(
    State(state): State<AppState>,
    Path(id): Path<String>,
    body: Result<Json<SourceUpdate>, JsonRejection>,
) -> Result<Json<Source>, ApiError> {
    let id = parse_id(&id)?;
    let Json(update) = body?;
    if let Some(url) = update.url.as_deref().filter(|url| !url.is_empty()) {
        check_url(url)?;
    }

    let source = state.aggregator.registry().update(id, update).await?;
    tracing::info!(source = %source.name, id = %source.id, active = source.is_active, "Provider updated");

    state.aggregator.on_source_updated(&source).await;
    Ok(Json(source))
}

pub async fn delete_source(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Message>, ApiError> {
    let id = parse_id(&id)?;
    let registry = state.aggregator.registry();
    if registry.get(id).await?.is_none() {
        return Err(ApiError::NotFound("Provider not found".into()));
    }

    match state.aggregator.on_source_deleted(id) {
        // Inactive sources have no poller to stop.
        Ok(()) | Err(LifecycleError::NotFound(_)) => {}
        Err(e) => return Err(e.into()),
    }
    registry.delete(id).await?;
    tracing::info!(id = %id, "Provider deleted");

    Ok(Message::new("Provider deleted successfully"))
}

pub async fn refresh_source(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Message>, ApiError> {
    let id = parse_id(&id)?;
    state.aggregator.refresh_now(id).await?;
    Ok(Message::new("Refresh triggered"))
}

/// Fetch the source once, wait for the result and return its updated record.
pub async fn test_source(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Source>, ApiError> {
    let id = parse_id(&id)?;
    let outcome = state.aggregator.refresh_and_wait(id).await?;
    tracing::debug!(id = %id, outcome = ?outcome, "Provider test fetch finished");

    state
        .aggregator
        .registry()
        .get(id)
        .await?
        .map(Json)
        .ok_or_else(|| ApiError::NotFound("Provider not found".into()))
}
