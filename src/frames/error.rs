use polars::error::PolarsError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum FrameError {
    #[error("Table '{table}' is missing required column '{column}'")]
    MissingColumn { table: &'static str, column: String },

    #[error("Column '{column}' of table '{table}' could not be read as {expected}")]
    ColumnType {
        table: &'static str,
        column: String,
        expected: &'static str,
        #[source]
        source: PolarsError,
    },

    #[error("Failed to build table '{table}'")]
    Build {
        table: &'static str,
        #[source]
        source: PolarsError,
    },
}
