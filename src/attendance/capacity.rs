//! Cleaning of the commune-level accommodation capacity table (INSEE `DS_TOUR_CAP`).

use crate::attendance::error::AttendanceError;
use crate::attendance::{department_of, trailing_code};
use crate::config::{MissingCapacity, PipelineConfig};
use crate::frames::schema::{self, TableReader};
use crate::types::accommodation::{AccommodationType, ActivityCodes};
use crate::types::attendance::CapacityRecord;
use log::{info, warn};
use polars::prelude::DataFrame;
use std::collections::btree_map::Entry;
use std::collections::BTreeMap;

/// Turns raw capacity rows into one [`CapacityRecord`] per (commune, accommodation type).
///
/// Only hotels and campings are kept, because nights-stayed figures exist for no other
/// accommodation type.
#[derive(Debug, Clone)]
pub struct CapacityNormalizer {
    codes: ActivityCodes,
    on_missing: MissingCapacity,
}

impl CapacityNormalizer {
    pub fn new(codes: ActivityCodes, on_missing: MissingCapacity) -> Self {
        Self { codes, on_missing }
    }

    pub fn from_config(config: &PipelineConfig) -> Self {
        Self::new(config.activity_codes.clone(), config.missing_capacity)
    }

    /// Normalizes a table with columns `geography_code`, `activity_code` and
    /// `observation_value`.
    ///
    /// The result is sorted by commune then accommodation type.
    ///
    /// # Errors
    ///
    /// * [`AttendanceError::Frame`] if a column is missing or unreadable.
    /// * [`AttendanceError::MissingCapacity`] for an absent value under [`MissingCapacity::Fail`].
    /// * [`AttendanceError::InvalidCapacity`] for negative or fractional values.
    /// * [`AttendanceError::DuplicateCapacity`] if a (commune, type) pair appears twice.
    pub fn normalize(&self, frame: &DataFrame) -> Result<Vec<CapacityRecord>, AttendanceError> {
        let reader = TableReader::new(frame, schema::CAPACITY)?;
        let geography = reader.strings("geography_code")?;
        let activities = reader.strings("activity_code")?;
        let values = reader.floats("observation_value")?;

        let mut records: BTreeMap<(String, AccommodationType), CapacityRecord> = BTreeMap::new();
        let mut unsupported = 0usize;
        let mut skipped = 0usize;

        for (row, ((geography_code, activity_code), value)) in geography
            .into_iter()
            .zip(activities)
            .zip(values)
            .enumerate()
        {
            let Some(accommodation_type) = activity_code
                .as_deref()
                .and_then(|code| self.codes.classify(code))
            else {
                unsupported += 1;
                continue;
            };
            let geography_code = geography_code.ok_or(AttendanceError::NullKey {
                table: schema::CAPACITY.name,
                column: "geography_code",
                row,
            })?;
            let commune_id = trailing_code(&geography_code)?;
            let department_id = department_of(&commune_id)?;

            let capacity = match value {
                Some(value) => {
                    to_capacity(value).ok_or_else(|| AttendanceError::InvalidCapacity {
                        commune_id: commune_id.clone(),
                        accommodation_type,
                        value,
                    })?
                }
                None => match self.on_missing {
                    MissingCapacity::Fail => {
                        return Err(AttendanceError::MissingCapacity {
                            commune_id,
                            accommodation_type,
                        })
                    }
                    MissingCapacity::Skip => {
                        skipped += 1;
                        continue;
                    }
                    MissingCapacity::Zero => 0,
                },
            };

            match records.entry((commune_id.clone(), accommodation_type)) {
                Entry::Occupied(_) => {
                    return Err(AttendanceError::DuplicateCapacity {
                        commune_id,
                        accommodation_type,
                    })
                }
                Entry::Vacant(entry) => {
                    entry.insert(CapacityRecord {
                        commune_id,
                        department_id,
                        accommodation_type,
                        capacity,
                    });
                }
            }
        }

        if skipped > 0 {
            warn!("Dropped {} capacity rows without an observation value", skipped);
        }
        info!(
            "Normalized {} capacity rows ({} rows of other accommodation types excluded)",
            records.len(),
            unsupported
        );
        Ok(records.into_values().collect())
    }
}

fn to_capacity(value: f64) -> Option<u64> {
    (value.is_finite() && value >= 0.0 && value.fract() == 0.0).then_some(value as u64)
}
