//! Row types of the attendance tables, from cleaned capacity and nights records
//! down to the employment-zone aggregate.

use crate::types::accommodation::{AccommodationType, TemporalRate};
use crate::types::period::{Month, TimePeriod};
use serde::{Deserialize, Serialize};

/// Accommodation capacity (beds or pitches) of one accommodation type in one commune.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CapacityRecord {
    /// INSEE commune code, e.g. `"01004"` or `"2A004"`.
    pub commune_id: String,
    /// First two characters of the commune code.
    pub department_id: String,
    pub accommodation_type: AccommodationType,
    pub capacity: u64,
}

/// Nights stayed in one department for one accommodation type over a period.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NightsRecord {
    pub department_id: String,
    pub time_period: TimePeriod,
    pub accommodation_type: AccommodationType,
    pub temporal_rate: TemporalRate,
    pub nights: f64,
}

/// Department nights of one month allocated to a single commune.
///
/// `nights_city` is `None` when the department has no capacity at all for the
/// accommodation type, in which case the share is undefined rather than zero.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommuneAttendance {
    pub commune_id: String,
    pub department_id: String,
    pub accommodation_type: AccommodationType,
    pub time_period: Month,
    pub capacity_city: u64,
    pub capacity_department: u64,
    pub nights_department: f64,
    pub nights_city: Option<f64>,
}

/// Monthly attendance of one accommodation type in an employment-zone cluster.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AttendanceRecord {
    pub cluster_id: u32,
    pub accommodation_type: AccommodationType,
    pub time_period: Month,
    /// Exact sum of the member communes' capacity.
    pub capacity_total: u64,
    /// Sum of the defined commune estimates, `None` if none of them is defined.
    pub nights_total: Option<f64>,
    /// Number of member commune rows whose estimate was undefined and left out of `nights_total`.
    pub undefined_communes: u32,
}
