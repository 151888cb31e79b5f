use std::collections::HashMap;

use async_trait::async_trait;
use thiserror::Error;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::satellite::{NewSatellite, Satellite};

/// Enumeration of errors for operations with a SatelliteStore.
/// Errors can originate from sqlx and are wrapped by us to provide additional context.
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("connection failed with: {error}")]
    ConnectionError { error: sqlx::Error },
    #[error("{command} query failed with: {error}")]
    QueryError { command: String, error: sqlx::Error },
    #[error("external id {0} already belongs to another satellite")]
    ExternalIdConflict(i32),
}

pub type StoreResult<T> = std::result::Result<T, StoreError>;

/// Persistence for Satellites.
///
/// At most one Satellite may exist per non-null external id: implementations must reject
/// a `save` that would break this, regardless of what the caller checked beforehand.
#[async_trait]
pub trait SatelliteStore {
    async fn find_by_external_id(&self, external_id: i32) -> StoreResult<Option<Satellite>>;

    async fn find_by_guid(&self, guid: Uuid) -> StoreResult<Option<Satellite>>;

    /// Insert a Satellite, or update the stored one with the same guid.
    async fn save(&self, satellite: NewSatellite) -> StoreResult<Satellite>;

    /// Delete a Satellite by guid, returning whether anything was deleted.
    async fn delete(&self, guid: Uuid) -> StoreResult<bool>;
}

#[derive(Default)]
struct Tables {
    last_id: i64,
    satellites: HashMap<Uuid, Satellite>,
    by_external_id: HashMap<i32, Uuid>,
}

/// A SatelliteStore kept in process memory. Used for local runs and tests.
#[derive(Default)]
pub struct MemoryStore {
    tables: RwLock<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.tables.read().await.satellites.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

#[async_trait]
impl SatelliteStore for MemoryStore {
    async fn find_by_external_id(&self, external_id: i32) -> StoreResult<Option<Satellite>> {
        let tables = self.tables.read().await;

        Ok(tables
            .by_external_id
            .get(&external_id)
            .and_then(|guid| tables.satellites.get(guid))
            .cloned())
    }

    async fn find_by_guid(&self, guid: Uuid) -> StoreResult<Option<Satellite>> {
        Ok(self.tables.read().await.satellites.get(&guid).cloned())
    }

    async fn save(&self, satellite: NewSatellite) -> StoreResult<Satellite> {
        let mut tables = self.tables.write().await;

        if let Some(external_id) = satellite.external_id {
            match tables.by_external_id.get(&external_id) {
                Some(owner) if *owner != satellite.guid => {
                    return Err(StoreError::ExternalIdConflict(external_id));
                }
                _ => {}
            }
        }

        let (id, created_at, previous_external_id) = match tables.satellites.get(&satellite.guid) {
            Some(existing) => (existing.id, existing.created_at, existing.external_id),
            None => {
                tables.last_id += 1;
                (tables.last_id, satellite.created_at, None)
            }
        };

        if let Some(previous) = previous_external_id {
            tables.by_external_id.remove(&previous);
        }
        if let Some(external_id) = satellite.external_id {
            tables.by_external_id.insert(external_id, satellite.guid);
        }

        let stored = Satellite {
            id,
            guid: satellite.guid,
            external_id: satellite.external_id,
            name: satellite.name,
            epoch: satellite.epoch,
            line1: satellite.line1,
            line2: satellite.line2,
            created_at,
            updated_at: satellite.updated_at,
        };
        tables.satellites.insert(stored.guid, stored.clone());

        Ok(stored)
    }

    async fn delete(&self, guid: Uuid) -> StoreResult<bool> {
        let mut tables = self.tables.write().await;

        match tables.satellites.remove(&guid) {
            Some(removed) => {
                if let Some(external_id) = removed.external_id {
                    tables.by_external_id.remove(&external_id);
                }
                Ok(true)
            }
            None => Ok(false),
        }
    }
}
