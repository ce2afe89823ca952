use crate::frames::error::FrameError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum WeatherError {
    #[error(transparent)]
    Frame(#[from] FrameError),

    #[error("Row {row} of table '{table}' has no value for key column '{column}'")]
    NullKey {
        table: &'static str,
        column: &'static str,
        row: usize,
    },

    #[error("Unreadable observation timestamp '{value}' at row {row}")]
    InvalidTimestamp { row: usize, value: String },

    #[error("Month {month} of station {station} is outside 1-12")]
    InvalidMonth { station: String, month: i64 },

    #[error("Station {station} has more than one row for month {month}")]
    DuplicateStationMonth { station: String, month: u32 },

    #[error("Cluster {0} has more than one centroid")]
    DuplicateCluster(u32),
}
