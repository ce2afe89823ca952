//! Column layouts of every table crossing the crate boundary, and a reader that
//! checks a `DataFrame` against one of them before any row is touched.

use crate::frames::error::FrameError;
use polars::prelude::{DataFrame, DataType};

/// Name and required columns of a table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TableSchema {
    pub name: &'static str,
    pub columns: &'static [&'static str],
}

pub const CAPACITY: TableSchema = TableSchema {
    name: "capacity",
    columns: &["geography_code", "activity_code", "observation_value"],
};

pub const NIGHTS: TableSchema = TableSchema {
    name: "nights",
    columns: &[
        "geography_code",
        "activity_code",
        "time_period",
        "temporal_rate",
        "observation_value",
    ],
};

pub const COMMUNES: TableSchema = TableSchema {
    name: "communes",
    columns: &[
        "commune_id",
        "commune_name",
        "employment_zone_id",
        "population",
        "latitude_centre",
        "longitude_centre",
        "postal_code",
    ],
};

/// Optional column of the commune table used to exclude overseas communes.
pub const COMMUNES_REGION_COLUMN: &str = "region_name";

pub const CLUSTER_CENTROIDS: TableSchema = TableSchema {
    name: "cluster_centroids",
    columns: &["cluster_id", "centroid_latitude", "centroid_longitude"],
};

pub const COMMUNE_ASSIGNMENTS: TableSchema = TableSchema {
    name: "commune_assignments",
    columns: &["commune_id", "cluster_id"],
};

pub const STATION_MONTHS: TableSchema = TableSchema {
    name: "station_months",
    columns: &[
        "station_commune_id",
        "latitude",
        "longitude",
        "month",
        "mean_pressure",
        "mean_temperature",
        "total_precipitation",
        "mean_gust",
    ],
};

pub const OBSERVATIONS: TableSchema = TableSchema {
    name: "weather_observations",
    columns: &[
        "station_commune_id",
        "latitude",
        "longitude",
        "observed_at",
        "pressure",
        "temperature",
        "precipitation_24h",
        "gust",
    ],
};

/// Typed, column-at-a-time access to a `DataFrame` whose layout was validated
/// against a [`TableSchema`].
pub struct TableReader<'a> {
    frame: &'a DataFrame,
    schema: TableSchema,
}

impl<'a> TableReader<'a> {
    /// Fails with [`FrameError::MissingColumn`] on the first required column that is absent.
    pub fn new(frame: &'a DataFrame, schema: TableSchema) -> Result<Self, FrameError> {
        if let Some(missing) = schema
            .columns
            .iter()
            .find(|name| frame.get_column_index(name).is_none())
        {
            return Err(FrameError::MissingColumn {
                table: schema.name,
                column: missing.to_string(),
            });
        }
        Ok(Self { frame, schema })
    }

    pub fn height(&self) -> usize {
        self.frame.height()
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.frame.get_column_index(name).is_some()
    }

    pub fn strings(&self, name: &str) -> Result<Vec<Option<String>>, FrameError> {
        let column = self.cast(name, &DataType::String, "text")?;
        let values = column.str().map_err(|e| self.type_error(name, "text", e))?;
        Ok(values
            .into_iter()
            .map(|v| v.map(|s| s.trim().to_string()))
            .collect())
    }

    pub fn floats(&self, name: &str) -> Result<Vec<Option<f64>>, FrameError> {
        let column = self.cast(name, &DataType::Float64, "a number")?;
        let values = column
            .f64()
            .map_err(|e| self.type_error(name, "a number", e))?;
        Ok(values.into_iter().collect())
    }

    pub fn integers(&self, name: &str) -> Result<Vec<Option<i64>>, FrameError> {
        let column = self.cast(name, &DataType::Int64, "an integer")?;
        let values = column
            .i64()
            .map_err(|e| self.type_error(name, "an integer", e))?;
        Ok(values.into_iter().collect())
    }

    fn cast(
        &self,
        name: &str,
        dtype: &DataType,
        expected: &'static str,
    ) -> Result<polars::prelude::Column, FrameError> {
        let column = self
            .frame
            .column(name)
            .map_err(|_| FrameError::MissingColumn {
                table: self.schema.name,
                column: name.to_string(),
            })?;
        column
            .cast(dtype)
            .map_err(|e| self.type_error(name, expected, e))
    }

    fn type_error(
        &self,
        name: &str,
        expected: &'static str,
        source: polars::error::PolarsError,
    ) -> FrameError {
        FrameError::ColumnType {
            table: self.schema.name,
            column: name.to_string(),
            expected,
            source,
        }
    }
}
