//! Run configuration shared by the pipeline stages.

use crate::types::accommodation::ActivityCodes;
use crate::types::period::Year;
use bon::Builder;

/// Regions excluded from the commune table: overseas departments are outside the
/// area covered by the weather and attendance data.
pub const DEFAULT_EXCLUDED_REGIONS: [&str; 5] = [
    "Mayotte",
    "Guyane",
    "La Réunion",
    "Guadeloupe",
    "Martinique",
];

/// What to do with a capacity row whose observation value is absent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MissingCapacity {
    /// Stop with [`crate::AttendanceError::MissingCapacity`].
    #[default]
    Fail,
    /// Drop the row and log how many were dropped.
    Skip,
    /// Read the absence as "no capacity observed".
    Zero,
}

/// Settings for a pipeline run.
///
/// Every field has a default, so `PipelineConfig::default()` is a valid configuration.
///
/// # Examples
///
/// ```
/// use voyage_etl::{MissingCapacity, PipelineConfig, Year};
///
/// let config = PipelineConfig::builder()
///     .target_year(Year(2024))
///     .nights_unit_multiplier(1000.0)
///     .missing_capacity(MissingCapacity::Skip)
///     .build();
///
/// assert_eq!(config.activity_codes.hotel, "I551");
/// assert!(config.require_full_year);
/// ```
#[derive(Debug, Clone, PartialEq, Builder)]
pub struct PipelineConfig {
    /// Raw activity codes identifying hotels and campsites.
    #[builder(default)]
    pub activity_codes: ActivityCodes,

    /// Restrict the nights estimation to a single year.
    pub target_year: Option<Year>,

    /// Factor applied to department nights before allocation. INSEE publishes nights in
    /// thousands, in which case this should be `1000.0`.
    #[builder(default = 1.0)]
    pub nights_unit_multiplier: f64,

    #[builder(default)]
    pub missing_capacity: MissingCapacity,

    /// Region names whose communes are left out of the cluster mapping.
    #[builder(default = DEFAULT_EXCLUDED_REGIONS.iter().map(|r| r.to_string()).collect())]
    pub excluded_regions: Vec<String>,

    /// Drop clusters whose nearest station does not cover all twelve months. Set to `false`
    /// to keep whatever months the station has.
    #[builder(default = true)]
    pub require_full_year: bool,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self::builder().build()
    }
}
