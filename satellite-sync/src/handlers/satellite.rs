use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use chrono::Utc;
use satellite_common::satellite::{NewSatellite, Satellite, SatelliteDetails};
use serde::Deserialize;
use tracing::info;
use uuid::Uuid;

use super::app::AppState;
use crate::error::SyncError;
use crate::outcome::SyncSummary;

pub const DEFAULT_FETCH_SIZE: u32 = 10;

fn default_fetch_size() -> u32 {
    DEFAULT_FETCH_SIZE
}

#[derive(Debug, Deserialize)]
pub struct FetchParams {
    #[serde(default = "default_fetch_size")]
    pub size: u32,
    #[serde(rename = "chunk-size")]
    pub chunk_size: Option<u32>,
}

pub async fn fetch(
    State(state): State<AppState>,
    Query(params): Query<FetchParams>,
) -> Result<(StatusCode, Json<SyncSummary>), SyncError> {
    info!(
        size = params.size,
        chunk_size = ?params.chunk_size,
        "received satellite fetch request"
    );

    let summary = state
        .sync
        .fetch_and_reconcile(params.size, params.chunk_size)
        .await?;

    Ok((StatusCode::CREATED, Json(summary)))
}

pub async fn create(
    State(state): State<AppState>,
    Json(details): Json<SatelliteDetails>,
) -> Result<(StatusCode, Json<Satellite>), SyncError> {
    details.validate()?;

    let satellite = state
        .store
        .save(NewSatellite::from_details(details, Utc::now()))
        .await?;
    info!(guid = %satellite.guid, "created satellite");

    Ok((StatusCode::CREATED, Json(satellite)))
}

pub async fn update(
    State(state): State<AppState>,
    Path(guid): Path<Uuid>,
    Json(details): Json<SatelliteDetails>,
) -> Result<Json<Satellite>, SyncError> {
    details.validate()?;

    let existing = state
        .store
        .find_by_guid(guid)
        .await?
        .ok_or(SyncError::NotFound(guid))?;

    let mut satellite = NewSatellite::from(existing);
    satellite.apply_details(details, Utc::now());
    let satellite = state.store.save(satellite).await?;
    info!(%guid, "updated satellite");

    Ok(Json(satellite))
}

pub async fn get(
    State(state): State<AppState>,
    Path(guid): Path<Uuid>,
) -> Result<Json<Satellite>, SyncError> {
    match state.store.find_by_guid(guid).await? {
        Some(satellite) => Ok(Json(satellite)),
        None => Err(SyncError::NotFound(guid)),
    }
}

pub async fn delete(
    State(state): State<AppState>,
    Path(guid): Path<Uuid>,
) -> Result<StatusCode, SyncError> {
    if state.store.delete(guid).await? {
        info!(%guid, "deleted satellite");
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(SyncError::NotFound(guid))
    }
}
