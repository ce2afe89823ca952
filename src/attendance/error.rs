use crate::frames::error::FrameError;
use crate::types::accommodation::{AccommodationType, TemporalRate};
use crate::types::period::{ParsePeriodError, TimePeriod};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AttendanceError {
    #[error(transparent)]
    Frame(#[from] FrameError),

    #[error("Row {row} of table '{table}' has no value for key column '{column}'")]
    NullKey {
        table: &'static str,
        column: &'static str,
        row: usize,
    },

    #[error("Geography code '{0}' does not end with a usable commune or department code")]
    MalformedGeography(String),

    // Only raised under `MissingCapacity::Fail`.
    #[error("No capacity value for commune {commune_id} ({accommodation_type})")]
    MissingCapacity {
        commune_id: String,
        accommodation_type: AccommodationType,
    },

    #[error("Capacity {value} for commune {commune_id} ({accommodation_type}) is not a non-negative integer")]
    InvalidCapacity {
        commune_id: String,
        accommodation_type: AccommodationType,
        value: f64,
    },

    #[error("Commune {commune_id} has more than one {accommodation_type} capacity row")]
    DuplicateCapacity {
        commune_id: String,
        accommodation_type: AccommodationType,
    },

    #[error("Department {department_id} has more than one {accommodation_type} nights row for {time_period}")]
    DuplicateNights {
        department_id: String,
        accommodation_type: AccommodationType,
        time_period: TimePeriod,
    },

    #[error(transparent)]
    InvalidPeriod(#[from] ParsePeriodError),

    #[error("Unknown temporal rate '{0}', expected 'A' or 'M'")]
    UnknownTemporalRate(String),

    #[error("Period {time_period} does not match temporal rate {temporal_rate}")]
    PeriodRateMismatch {
        time_period: TimePeriod,
        temporal_rate: TemporalRate,
    },

    #[error("Commune {commune_id} is assigned to both cluster {first} and cluster {second}")]
    ConflictingAssignment {
        commune_id: String,
        first: u32,
        second: u32,
    },
}
