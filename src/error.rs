use crate::artifacts::ArtifactError;
use crate::attendance::error::AttendanceError;
use crate::frames::error::FrameError;
use crate::geography::error::ClusterError;
use crate::weather::error::WeatherError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum EtlError {
    #[error(transparent)]
    Frame(#[from] FrameError),

    #[error(transparent)]
    Attendance(#[from] AttendanceError),

    #[error(transparent)]
    Cluster(#[from] ClusterError),

    #[error(transparent)]
    Weather(#[from] WeatherError),

    #[error(transparent)]
    Artifact(#[from] ArtifactError),
}
