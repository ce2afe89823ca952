use crate::frames::error::FrameError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ClusterError {
    #[error(transparent)]
    Frame(#[from] FrameError),

    #[error("Row {row} of table '{table}' has no value for key column '{column}'")]
    NullKey {
        table: &'static str,
        column: &'static str,
        row: usize,
    },

    #[error("Commune {0} appears more than once in the commune table")]
    DuplicateCommune(String),

    #[error("Row {row} of table '{table}' has cluster id {value}, cluster ids start at 1")]
    InvalidClusterId {
        table: &'static str,
        row: usize,
        value: i64,
    },
}
