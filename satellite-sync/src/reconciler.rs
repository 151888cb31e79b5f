use std::sync::Arc;

use chrono::Utc;
use satellite_common::satellite::{NewSatellite, TleRecord};
use satellite_common::store::SatelliteStore;
use tracing::{debug, error};

use crate::error::PersistenceError;
use crate::outcome::{Outcome, OutcomeCounters};

/// Creates or updates the local Satellite matching a catalogue record.
///
/// Callers are expected to go through `InFlight` so that a given external id is never
/// reconciled by two tasks at once.
pub struct Reconciler {
    store: Arc<dyn SatelliteStore + Send + Sync>,
    counters: Arc<OutcomeCounters>,
}

impl Reconciler {
    pub fn new(store: Arc<dyn SatelliteStore + Send + Sync>, counters: Arc<OutcomeCounters>) -> Self {
        Self { store, counters }
    }

    pub async fn reconcile(&self, record: &TleRecord) -> Result<Outcome, PersistenceError> {
        let external_id = record.external_id;

        let result = self.upsert(record).await;
        match result {
            Ok(outcome) => {
                debug!(external_id, "satellite {}", outcome.as_str());
                self.counters.record(outcome);
                metrics::counter!("satellite_sync_records_total", "outcome" => outcome.as_str())
                    .increment(1);
                Ok(outcome)
            }
            Err(error) => {
                error!("error processing satellite: {}", error);
                metrics::counter!("satellite_sync_records_failed_total").increment(1);
                Err(error)
            }
        }
    }

    async fn upsert(&self, record: &TleRecord) -> Result<Outcome, PersistenceError> {
        let external_id = record.external_id;
        let now = Utc::now();

        let existing = self
            .store
            .find_by_external_id(external_id)
            .await
            .map_err(|error| PersistenceError::new(external_id, &error))?;

        let (satellite, outcome) = match existing {
            Some(existing) => {
                let mut satellite = NewSatellite::from(existing);
                satellite.refresh_from(record, now);
                (satellite, Outcome::Updated)
            }
            None => (NewSatellite::from_record(record, now), Outcome::Created),
        };

        self.store
            .save(satellite)
            .await
            .map_err(|error| PersistenceError::new(external_id, &error))?;

        Ok(outcome)
    }
}
