use chrono::{DateTime, FixedOffset, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

const MAX_NAME_LENGTH: usize = 255;

/// A two-line element set as published by the upstream catalogue.
/// The catalogue calls the external identifier `satelliteId` and the epoch `date`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct TleRecord {
    #[serde(rename = "satelliteId")]
    pub external_id: i32,
    pub name: String,
    #[serde(rename = "date")]
    pub epoch: DateTime<FixedOffset>,
    pub line1: String,
    pub line2: String,
}

/// Satellite details written through the API rather than pulled from the catalogue.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct SatelliteDetails {
    pub name: String,
    #[serde(rename = "date")]
    pub epoch: DateTime<FixedOffset>,
    pub line1: String,
    pub line2: String,
}

#[derive(Error, Debug, PartialEq, Eq)]
pub enum InvalidSatellite {
    #[error("'{0}' must not be empty")]
    BlankField(&'static str),
    #[error("'name' must be at most 255 characters long, got {0}")]
    NameTooLong(usize),
}

impl SatelliteDetails {
    pub fn validate(&self) -> Result<(), InvalidSatellite> {
        for (field, value) in [
            ("name", &self.name),
            ("line1", &self.line1),
            ("line2", &self.line2),
        ] {
            if value.trim().is_empty() {
                return Err(InvalidSatellite::BlankField(field));
            }
        }

        let name_length = self.name.chars().count();
        if name_length > MAX_NAME_LENGTH {
            return Err(InvalidSatellite::NameTooLong(name_length));
        }

        Ok(())
    }
}

/// A Satellite as stored locally.
/// `id` is the surrogate key assigned by the store and is never exposed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Satellite {
    #[serde(skip_serializing)]
    pub id: i64,
    pub guid: Uuid,
    pub external_id: Option<i32>,
    pub name: String,
    pub epoch: DateTime<Utc>,
    pub line1: String,
    pub line2: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// The writable part of a Satellite, passed to `SatelliteStore::save`.
/// Saving a NewSatellite whose `guid` is already stored updates that row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewSatellite {
    pub guid: Uuid,
    pub external_id: Option<i32>,
    pub name: String,
    pub epoch: DateTime<Utc>,
    pub line1: String,
    pub line2: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl NewSatellite {
    /// Build a never-seen-before Satellite out of a catalogue record, with a fresh guid.
    pub fn from_record(record: &TleRecord, now: DateTime<Utc>) -> Self {
        Self {
            guid: Uuid::new_v4(),
            external_id: Some(record.external_id),
            name: record.name.to_owned(),
            epoch: record.epoch.with_timezone(&Utc),
            line1: record.line1.to_owned(),
            line2: record.line2.to_owned(),
            created_at: now,
            updated_at: now,
        }
    }

    /// Build a manually created Satellite. It has no external id, so syncs never touch it.
    pub fn from_details(details: SatelliteDetails, now: DateTime<Utc>) -> Self {
        Self {
            guid: Uuid::new_v4(),
            external_id: None,
            name: details.name,
            epoch: details.epoch.with_timezone(&Utc),
            line1: details.line1,
            line2: details.line2,
            created_at: now,
            updated_at: now,
        }
    }

    /// Overwrite everything a caller may edit. Guid and external id are kept.
    pub fn apply_details(&mut self, details: SatelliteDetails, now: DateTime<Utc>) {
        self.name = details.name;
        self.epoch = details.epoch.with_timezone(&Utc);
        self.line1 = details.line1;
        self.line2 = details.line2;
        self.updated_at = now;
    }

    /// Refresh the orbital elements from a newer catalogue record.
    /// Name and guid are left untouched.
    pub fn refresh_from(&mut self, record: &TleRecord, now: DateTime<Utc>) {
        self.epoch = record.epoch.with_timezone(&Utc);
        self.line1 = record.line1.to_owned();
        self.line2 = record.line2.to_owned();
        self.updated_at = now;
    }
}

impl From<Satellite> for NewSatellite {
    fn from(satellite: Satellite) -> Self {
        Self {
            guid: satellite.guid,
            external_id: satellite.external_id,
            name: satellite.name,
            epoch: satellite.epoch,
            line1: satellite.line1,
            line2: satellite.line2,
            created_at: satellite.created_at,
            updated_at: satellite.updated_at,
        }
    }
}
