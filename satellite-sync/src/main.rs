//! Serve the satellite sync API, pulling TLE records from the upstream catalogue on demand.
use std::sync::Arc;

use envconfig::Envconfig;
use eyre::Result;
use tokio::signal;
use tracing_subscriber::EnvFilter;
use url::Url;

use satellite_common::{
    metrics::{serve, setup_metrics_recorder},
    pgstore::PgStore,
    store::{MemoryStore, SatelliteStore},
};
use satellite_sync::config::Config;
use satellite_sync::handlers::{app, AppState};
use satellite_sync::source::HttpRecordSource;
use satellite_sync::sync::SatelliteSync;

async fn shutdown() {
    let mut term = signal::unix::signal(signal::unix::SignalKind::terminate())
        .expect("failed to register SIGTERM handler");

    let mut interrupt = signal::unix::signal(signal::unix::SignalKind::interrupt())
        .expect("failed to register SIGINT handler");

    tokio::select! {
        _ = term.recv() => {},
        _ = interrupt.recv() => {},
    };

    tracing::info!("Shutting down gracefully...");
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = Config::init_from_env()?;

    let store: Arc<dyn SatelliteStore + Send + Sync> = if config.in_memory_store {
        tracing::warn!("using an in-memory store, satellites will not survive a restart");
        Arc::new(MemoryStore::new())
    } else {
        Arc::new(PgStore::new(&config.database_url, config.max_pg_connections).await?)
    };

    let source = HttpRecordSource::new(
        Url::parse(&config.source_url)?,
        config.request_timeout.0,
    )?;

    let sync = SatelliteSync::new(
        Arc::new(source),
        store.clone(),
        config.sync_limits(),
        config.retry_policy.provide(),
    );

    let recorder_handle = setup_metrics_recorder()?;
    let router = app(AppState::new(sync, store), Some(recorder_handle));

    serve(router, &config.bind(), shutdown()).await?;

    Ok(())
}
