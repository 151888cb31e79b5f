use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use satellite_common::retry::Retryable;
use satellite_common::satellite::InvalidSatellite;
use satellite_common::store::StoreError;
use serde::Serialize;
use thiserror::Error;
use tracing::error;
use uuid::Uuid;

use crate::planner::PlanError;
use crate::source::SourceError;

/// A single record could not be written to the store.
/// The store error is flattened to text so every task awaiting the same record can share it.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("failed to process satellite with external id {external_id}: {reason}")]
pub struct PersistenceError {
    pub external_id: i32,
    pub reason: String,
}

impl PersistenceError {
    pub fn new(external_id: i32, error: &StoreError) -> Self {
        Self {
            external_id,
            reason: error.to_string(),
        }
    }
}

/// Enumeration of errors that abort one sync attempt.
#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("catalogue unavailable: {0}")]
    SourceUnavailable(#[from] SourceError),
    #[error(transparent)]
    Persistence(#[from] PersistenceError),
    #[error("a sync worker failed: {0}")]
    WorkerFailed(String),
}

impl Retryable for PipelineError {
    fn is_retryable(&self) -> bool {
        match self {
            PipelineError::SourceUnavailable(_) | PipelineError::Persistence(_) => true,
            PipelineError::WorkerFailed(_) => false,
        }
    }
}

/// Enumeration of errors surfaced to callers of the sync service.
#[derive(Error, Debug)]
pub enum SyncError {
    #[error("{0}")]
    ValidationError(#[from] PlanError),
    #[error("invalid satellite: {0}")]
    InvalidSatellite(#[from] InvalidSatellite),
    #[error("failed to fetch and update satellites: retries exhausted after {attempts} attempts")]
    ExternalSourceExhausted { attempts: u32 },
    #[error("failed to fetch and update satellites: {0}")]
    ExternalSourceError(String),
    #[error("satellite not found by guid {0}")]
    NotFound(Uuid),
    #[error("a store error occurred: {0}")]
    StoreError(#[from] StoreError),
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

impl IntoResponse for SyncError {
    fn into_response(self) -> Response {
        let status = match self {
            SyncError::ValidationError(_) | SyncError::InvalidSatellite(_) => {
                StatusCode::BAD_REQUEST
            }
            SyncError::NotFound(_) => StatusCode::NOT_FOUND,
            SyncError::ExternalSourceExhausted { .. } | SyncError::ExternalSourceError(_) => {
                StatusCode::SERVICE_UNAVAILABLE
            }
            SyncError::StoreError(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };

        if status.is_server_error() {
            error!("request failed with {}: {}", status, self);
        }

        (
            status,
            Json(ErrorResponse {
                error: self.to_string(),
            }),
        )
            .into_response()
    }
}
