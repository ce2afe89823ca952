mod artifacts;
mod attendance;
mod config;
mod error;
mod frames;
mod geography;
mod pipeline;
mod types;
mod weather;

pub use error::EtlError;
pub use pipeline::*;

pub use config::{MissingCapacity, PipelineConfig, DEFAULT_EXCLUDED_REGIONS};

pub use artifacts::{ensure_dir, write_csv, write_table, ArtifactError};
pub use frames::convert::ToFrame;
pub use frames::error::FrameError;

pub use attendance::allocator::{AttendanceAllocator, ClusterAttendance};
pub use attendance::capacity::CapacityNormalizer;
pub use attendance::error::AttendanceError;
pub use attendance::nights::NightsEstimator;

pub use geography::clusters::{read_assignments, read_centroids, ClusterBuilder, Clusters};
pub use geography::error::ClusterError;

pub use weather::aggregate::aggregate_observations;
pub use weather::error::WeatherError;
pub use weather::locate_station::{
    read_station_months, NearestStationLinker, StationLinks, StationLocator,
};

pub use types::accommodation::{AccommodationType, ActivityCodes, TemporalRate};
pub use types::attendance::*;
pub use types::cluster::*;
pub use types::period::{Month, ParsePeriodError, TimePeriod, Year};
pub use types::station::*;
