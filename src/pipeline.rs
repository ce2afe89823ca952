//! Runs every stage on one set of input tables.

use crate::artifacts::{ensure_dir, write_table};
use crate::attendance::allocator::{AttendanceAllocator, ClusterAttendance};
use crate::attendance::capacity::CapacityNormalizer;
use crate::attendance::nights::NightsEstimator;
use crate::config::PipelineConfig;
use crate::error::EtlError;
use crate::geography::clusters::{ClusterBuilder, Clusters};
use crate::types::attendance::{CapacityRecord, CommuneAttendance, NightsRecord};
use crate::types::station::WeatherStationRecord;
use crate::weather::aggregate::aggregate_observations;
use crate::weather::locate_station::{read_station_months, NearestStationLinker, StationLinks};
use bon::bon;
use log::info;
use polars::prelude::DataFrame;
use std::path::{Path, PathBuf};

/// Where the weather comes from.
#[derive(Debug, Clone, Copy)]
pub enum WeatherSource<'a> {
    /// Already aggregated station-month table.
    StationMonths(&'a DataFrame),
    /// Raw observations, aggregated per station and month first.
    Observations(&'a DataFrame),
}

/// Every table derived by a run.
#[derive(Debug, Clone, PartialEq)]
pub struct PipelineOutput {
    pub clusters: Clusters,
    pub capacity: Vec<CapacityRecord>,
    /// Monthly nights per department, camping months estimated from hotel seasonality.
    pub nights: Vec<NightsRecord>,
    pub commune_attendance: Vec<CommuneAttendance>,
    pub cluster_attendance: ClusterAttendance,
    pub station_months: Vec<WeatherStationRecord>,
    pub station_links: StationLinks,
}

impl PipelineOutput {
    /// Writes every table as CSV into `dir`, creating it if needed.
    ///
    /// Returns the written paths in writing order.
    pub fn write_csv(&self, dir: &Path) -> Result<Vec<PathBuf>, EtlError> {
        ensure_dir(dir)?;
        let written = vec![
            write_table(dir, "cluster_mapping.csv", self.clusters.mappings.as_slice())?,
            write_table(dir, "commune_clusters.csv", self.clusters.assignments.as_slice())?,
            write_table(dir, "capacity.csv", self.capacity.as_slice())?,
            write_table(dir, "nights_monthly.csv", self.nights.as_slice())?,
            write_table(dir, "commune_attendance.csv", self.commune_attendance.as_slice())?,
            write_table(
                dir,
                "cluster_attendance.csv",
                self.cluster_attendance.records.as_slice(),
            )?,
            write_table(dir, "station_months.csv", self.station_months.as_slice())?,
            write_table(
                dir,
                "station_assignments.csv",
                self.station_links.assignments.as_slice(),
            )?,
            write_table(dir, "cluster_weather.csv", self.station_links.weather.as_slice())?,
        ];

        info!("Wrote {} tables to {}", written.len(), dir.display());
        Ok(written)
    }
}

#[derive(Debug, Clone, Default)]
pub struct Pipeline {
    config: PipelineConfig,
}

#[bon]
impl Pipeline {
    pub fn new(config: PipelineConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Runs clustering, attendance and weather linking.
    ///
    /// Stages run in dependency order and the first failing stage stops the run. Without a
    /// `weather` source the weather tables are empty.
    ///
    /// # Example
    ///
    /// ```no_run
    /// # use voyage_etl::{Pipeline, PipelineConfig, WeatherSource};
    /// # fn run(communes: polars::prelude::DataFrame, capacity: polars::prelude::DataFrame,
    /// #        nights: polars::prelude::DataFrame, weather: polars::prelude::DataFrame)
    /// #        -> Result<(), voyage_etl::EtlError> {
    /// let output = Pipeline::new(PipelineConfig::default())
    ///     .run()
    ///     .communes(&communes)
    ///     .capacity(&capacity)
    ///     .nights(&nights)
    ///     .weather(WeatherSource::Observations(&weather))
    ///     .call()?;
    /// println!("{} attendance rows", output.cluster_attendance.records.len());
    /// # Ok(())
    /// # }
    /// ```
    ///
    /// # Errors
    ///
    /// Any error of the stages, wrapped in [`EtlError`].
    #[builder]
    pub fn run<'a>(
        &self,
        communes: &'a DataFrame,
        capacity: &'a DataFrame,
        nights: &'a DataFrame,
        weather: Option<WeatherSource<'a>>,
    ) -> Result<PipelineOutput, EtlError> {
        let clusters = ClusterBuilder::from_config(&self.config).build(communes)?;
        let capacity = CapacityNormalizer::from_config(&self.config).normalize(capacity)?;
        let nights = NightsEstimator::from_config(&self.config).estimate_frame(nights)?;

        let allocator = AttendanceAllocator::from_config(&self.config);
        let commune_attendance = allocator.allocate(&capacity, &nights)?;
        let cluster_attendance = allocator.aggregate(&commune_attendance, &clusters.assignments)?;

        let station_months = match weather {
            Some(WeatherSource::StationMonths(frame)) => read_station_months(frame)?,
            Some(WeatherSource::Observations(frame)) => aggregate_observations(frame)?,
            None => Vec::new(),
        };
        let station_links = NearestStationLinker::from_config(&self.config)
            .link(&clusters.centroids(), &station_months)?;

        info!(
            "Run complete: {} clusters, {} attendance rows, {} weather rows",
            clusters.mappings.len(),
            cluster_attendance.records.len(),
            station_links.weather.len()
        );
        Ok(PipelineOutput {
            clusters,
            capacity,
            nights,
            commune_attendance,
            cluster_attendance,
            station_months,
            station_links,
        })
    }
}
