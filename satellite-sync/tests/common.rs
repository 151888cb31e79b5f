#![allow(dead_code)]

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex, Once};
use std::time::Duration;

use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::{routing, Json, Router};
use serde_json::{json, Value};
use tokio::net::TcpListener;

use satellite_common::retry::RetryPolicy;
use satellite_common::store::MemoryStore;
use satellite_sync::source::HttpRecordSource;
use satellite_sync::sync::{SatelliteSync, SyncLimits};

static TRACING_INIT: Once = Once::new();
pub fn setup_tracing() {
    TRACING_INIT.call_once(|| {
        tracing_subscriber::fmt()
            .with_writer(tracing_subscriber::fmt::TestWriter::new())
            .init()
    });
}

pub fn tle(external_id: i32, line1: &str) -> Value {
    json!({
        "@id": format!("https://tle.example.com/api/tle/{}", external_id),
        "@type": "Tle",
        "satelliteId": external_id,
        "name": format!("SAT-{}", external_id),
        "date": "2024-05-09T11:12:40+00:00",
        "line1": line1,
        "line2": format!("2 {} 51.6388 158.3541", external_id),
    })
}

#[derive(Default)]
struct Catalogue {
    records: Mutex<Vec<Value>>,
    status: Mutex<Option<StatusCode>>,
    requests: AtomicU32,
}

async fn list(
    State(catalogue): State<Arc<Catalogue>>,
    Query(params): Query<HashMap<String, u32>>,
) -> Response {
    catalogue.requests.fetch_add(1, Ordering::SeqCst);

    if let Some(status) = *catalogue.status.lock().unwrap() {
        return status.into_response();
    }

    let page = params.get("page").copied().unwrap_or(1).max(1) as usize;
    let page_size = params.get("page-size").copied().unwrap_or(20) as usize;

    let records = catalogue.records.lock().unwrap();
    let member: Vec<Value> = records
        .iter()
        .skip((page - 1) * page_size)
        .take(page_size)
        .cloned()
        .collect();

    Json(json!({
        "@type": "Collection",
        "totalItems": records.len(),
        "member": member,
    }))
    .into_response()
}

/// A paginated TLE catalogue served over HTTP on an ephemeral port.
pub struct CatalogueHandle {
    pub addr: SocketAddr,
    catalogue: Arc<Catalogue>,
}

impl CatalogueHandle {
    pub async fn serve(records: Vec<Value>) -> Self {
        let catalogue = Arc::new(Catalogue {
            records: Mutex::new(records),
            ..Default::default()
        });

        let router = Router::new()
            .route("/api/tle", routing::get(list))
            .with_state(catalogue.clone());

        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move { axum::serve(listener, router).await.unwrap() });

        Self { addr, catalogue }
    }

    pub fn url(&self) -> String {
        format!("http://{}/api/tle", self.addr)
    }

    pub fn set_records(&self, records: Vec<Value>) {
        *self.catalogue.records.lock().unwrap() = records;
    }

    pub fn respond_with(&self, status: StatusCode) {
        *self.catalogue.status.lock().unwrap() = Some(status);
    }

    pub fn requests(&self) -> u32 {
        self.catalogue.requests.load(Ordering::SeqCst)
    }

    /// Build a sync over this catalogue, retrying with a negligible backoff.
    pub fn sync(&self, store: Arc<MemoryStore>, max_attempts: u32) -> SatelliteSync {
        let source = HttpRecordSource::new(self.url().parse().unwrap(), Duration::from_secs(5))
            .expect("failed to build catalogue client");

        SatelliteSync::new(
            Arc::new(source),
            store,
            SyncLimits::default(),
            RetryPolicy::new(max_attempts, 2, Duration::from_millis(1), None),
        )
    }
}
