use std::sync::atomic::{AtomicU32, AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use chrono::DateTime;
use http::StatusCode;
use satellite_common::satellite::{NewSatellite, Satellite, TleRecord};
use satellite_common::store::{MemoryStore, SatelliteStore, StoreError, StoreResult};
use uuid::Uuid;

use crate::source::{CataloguePage, RecordSource, SourceError};

pub fn tle_record(external_id: i32, line1: &str) -> TleRecord {
    TleRecord {
        external_id,
        name: format!("SAT {}", external_id),
        epoch: DateTime::parse_from_rfc3339("2024-05-09T11:12:40+00:00")
            .expect("invalid test epoch"),
        line1: line1.to_owned(),
        line2: format!("2 {}", external_id),
    }
}

/// A RecordSource serving a fixed list of records, which can be told to fail its first calls.
pub struct ScriptedSource {
    records: Mutex<Vec<TleRecord>>,
    failures_left: AtomicU32,
    calls: AtomicUsize,
    latency: Option<Duration>,
}

impl ScriptedSource {
    pub fn new(records: Vec<TleRecord>) -> Self {
        Self {
            records: Mutex::new(records),
            failures_left: AtomicU32::new(0),
            calls: AtomicUsize::new(0),
            latency: None,
        }
    }

    /// Take `latency` to answer every page, like a real network round trip.
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    /// Fail the next `failures` calls with a 503.
    pub fn failing_first(self, failures: u32) -> Self {
        self.failures_left.store(failures, Ordering::SeqCst);
        self
    }

    pub fn set_records(&self, records: Vec<TleRecord>) {
        *self.records.lock().unwrap() = records;
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl RecordSource for ScriptedSource {
    async fn fetch_page(&self, page: u32, page_size: u32) -> Result<CataloguePage, SourceError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(latency) = self.latency {
            tokio::time::sleep(latency).await;
        }

        let failing = self
            .failures_left
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |left| left.checked_sub(1))
            .is_ok();
        if failing {
            return Err(SourceError::StatusError {
                page,
                status: StatusCode::SERVICE_UNAVAILABLE,
            });
        }

        let records = self.records.lock().unwrap();
        let start = ((page - 1) * page_size) as usize;
        let member = records
            .iter()
            .skip(start)
            .take(page_size as usize)
            .cloned()
            .collect();

        Ok(CataloguePage {
            total_items: records.len() as u32,
            member,
        })
    }
}

/// A MemoryStore that takes its time answering.
pub struct SlowStore {
    inner: MemoryStore,
    delay: Duration,
}

impl SlowStore {
    pub fn new(delay: Duration) -> Self {
        Self {
            inner: MemoryStore::new(),
            delay,
        }
    }

    pub fn inner(&self) -> &MemoryStore {
        &self.inner
    }
}

#[async_trait]
impl SatelliteStore for SlowStore {
    async fn find_by_external_id(&self, external_id: i32) -> StoreResult<Option<Satellite>> {
        tokio::time::sleep(self.delay).await;
        self.inner.find_by_external_id(external_id).await
    }

    async fn find_by_guid(&self, guid: Uuid) -> StoreResult<Option<Satellite>> {
        self.inner.find_by_guid(guid).await
    }

    async fn save(&self, satellite: NewSatellite) -> StoreResult<Satellite> {
        tokio::time::sleep(self.delay).await;
        self.inner.save(satellite).await
    }

    async fn delete(&self, guid: Uuid) -> StoreResult<bool> {
        self.inner.delete(guid).await
    }
}

/// A store whose database is never there.
pub struct FailingStore;

fn unavailable(command: &str) -> StoreError {
    StoreError::QueryError {
        command: command.to_owned(),
        error: sqlx::Error::PoolClosed,
    }
}

#[async_trait]
impl SatelliteStore for FailingStore {
    async fn find_by_external_id(&self, _external_id: i32) -> StoreResult<Option<Satellite>> {
        Err(unavailable("SELECT"))
    }

    async fn find_by_guid(&self, _guid: Uuid) -> StoreResult<Option<Satellite>> {
        Err(unavailable("SELECT"))
    }

    async fn save(&self, _satellite: NewSatellite) -> StoreResult<Satellite> {
        Err(unavailable("INSERT"))
    }

    async fn delete(&self, _guid: Uuid) -> StoreResult<bool> {
        Err(unavailable("DELETE"))
    }
}
