use std::sync::Arc;

use axum::{routing, Router};
use metrics_exporter_prometheus::PrometheusHandle;
use satellite_common::metrics;
use satellite_common::store::SatelliteStore;
use tower_http::trace::TraceLayer;

use super::satellite;
use crate::sync::SatelliteSync;

#[derive(Clone)]
pub struct AppState {
    pub sync: Arc<SatelliteSync>,
    pub store: Arc<dyn SatelliteStore + Send + Sync>,
}

impl AppState {
    pub fn new(sync: SatelliteSync, store: Arc<dyn SatelliteStore + Send + Sync>) -> Self {
        Self {
            sync: Arc::new(sync),
            store,
        }
    }
}

pub fn app(state: AppState, metrics: Option<PrometheusHandle>) -> Router {
    Router::new()
        .route("/", routing::get(index))
        .route(
            "/metrics",
            routing::get(move || match metrics {
                Some(ref recorder_handle) => std::future::ready(recorder_handle.render()),
                None => std::future::ready("no metrics recorder installed".to_owned()),
            }),
        )
        .route("/v1/satellite", routing::post(satellite::create))
        .route("/v1/satellite/fetch", routing::post(satellite::fetch))
        .route(
            "/v1/satellite/:guid",
            routing::get(satellite::get)
                .put(satellite::update)
                .delete(satellite::delete),
        )
        .layer(TraceLayer::new_for_http())
        .layer(axum::middleware::from_fn(metrics::track_metrics))
        .with_state(state)
}

pub async fn index() -> &'static str {
    "satellite sync"
}
