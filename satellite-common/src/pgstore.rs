use async_trait::async_trait;
use sqlx::postgres::{PgPool, PgPoolOptions};
use uuid::Uuid;

use crate::satellite::{NewSatellite, Satellite};
use crate::store::{SatelliteStore, StoreError, StoreResult};

/// A SatelliteStore backed by the `satellite` table in PostgreSQL.
/// The unique index on `external_id` backs the at-most-one-row-per-external-id guarantee.
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    /// Initialize a new PgStore, connecting to the database at `url`.
    pub async fn new(url: &str, max_connections: u32) -> StoreResult<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .connect(url)
            .await
            .map_err(|error| StoreError::ConnectionError { error })?;

        Ok(Self { pool })
    }

    /// Initialize a new PgStore from an existing pool.
    pub fn new_from_pool(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn query_error(command: &str, error: sqlx::Error, external_id: Option<i32>) -> StoreError {
    if let (sqlx::Error::Database(db_error), Some(external_id)) = (&error, external_id) {
        if db_error.is_unique_violation() {
            return StoreError::ExternalIdConflict(external_id);
        }
    }

    StoreError::QueryError {
        command: command.to_owned(),
        error,
    }
}

#[async_trait]
impl SatelliteStore for PgStore {
    async fn find_by_external_id(&self, external_id: i32) -> StoreResult<Option<Satellite>> {
        sqlx::query_as::<_, Satellite>("SELECT * FROM satellite WHERE external_id = $1")
            .bind(external_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|error| query_error("SELECT", error, None))
    }

    async fn find_by_guid(&self, guid: Uuid) -> StoreResult<Option<Satellite>> {
        sqlx::query_as::<_, Satellite>("SELECT * FROM satellite WHERE guid = $1")
            .bind(guid)
            .fetch_optional(&self.pool)
            .await
            .map_err(|error| query_error("SELECT", error, None))
    }

    async fn save(&self, satellite: NewSatellite) -> StoreResult<Satellite> {
        let query = r#"
INSERT INTO satellite
    (guid, external_id, name, epoch, line1, line2, created_at, updated_at)
VALUES
    ($1, $2, $3, $4, $5, $6, $7, $8)
ON CONFLICT (guid) DO UPDATE
SET
    external_id = EXCLUDED.external_id,
    name = EXCLUDED.name,
    epoch = EXCLUDED.epoch,
    line1 = EXCLUDED.line1,
    line2 = EXCLUDED.line2,
    updated_at = EXCLUDED.updated_at
RETURNING
    *
        "#;

        sqlx::query_as::<_, Satellite>(query)
            .bind(satellite.guid)
            .bind(satellite.external_id)
            .bind(&satellite.name)
            .bind(satellite.epoch)
            .bind(&satellite.line1)
            .bind(&satellite.line2)
            .bind(satellite.created_at)
            .bind(satellite.updated_at)
            .fetch_one(&self.pool)
            .await
            .map_err(|error| query_error("INSERT", error, satellite.external_id))
    }

    async fn delete(&self, guid: Uuid) -> StoreResult<bool> {
        let result = sqlx::query("DELETE FROM satellite WHERE guid = $1")
            .bind(guid)
            .execute(&self.pool)
            .await
            .map_err(|error| query_error("DELETE", error, None))?;

        Ok(result.rows_affected() > 0)
    }
}
