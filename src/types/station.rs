//! Weather stations, their monthly aggregates, and the implementations needed to
//! index stations spatially with the `rstar` crate.

use rstar::{PointDistance, RTreeObject, AABB};
use serde::{Deserialize, Serialize};

/// Represents the geographical location of a weather station.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq)]
pub struct Location {
    /// Latitude in decimal degrees (positive for North, negative for South).
    pub latitude: f64,
    /// Longitude in decimal degrees (positive for East, negative for West).
    pub longitude: f64,
}

/// A synoptic weather station, identified by the INSEE code of the commune it sits in.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct WeatherStation {
    pub id: String,
    pub location: Location,
}

/// Monthly weather aggregates of one station.
///
/// `month` is the calendar month (1-12), pooled over all years present in the observations.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeatherStationRecord {
    pub station_commune_id: String,
    pub latitude: f64,
    pub longitude: f64,
    pub month: u32,
    pub mean_pressure: Option<f64>,
    pub mean_temperature: Option<f64>,
    pub total_precipitation: Option<f64>,
    pub mean_gust: Option<f64>,
}

impl WeatherStationRecord {
    pub fn station(&self) -> WeatherStation {
        WeatherStation {
            id: self.station_commune_id.clone(),
            location: Location {
                latitude: self.latitude,
                longitude: self.longitude,
            },
        }
    }
}

/// The station chosen for a cluster.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StationAssignment {
    pub cluster_id: u32,
    pub station_commune_id: String,
    /// Great-circle distance between the centroid and the station. Informational only,
    /// the selection itself uses planar distance on degrees.
    pub distance_km: f64,
}

/// Weather of the nearest station attached to a cluster for one month.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClusterWeatherRecord {
    pub cluster_id: u32,
    pub month: u32,
    pub nearest_station_commune_id: String,
    pub mean_pressure: Option<f64>,
    pub mean_temperature: Option<f64>,
    pub total_precipitation: Option<f64>,
    pub mean_gust: Option<f64>,
}

// --- R-Tree Implementations ---

/// Implementation required by `rstar` to treat a `WeatherStation` as an object within an R-Tree.
impl RTreeObject for WeatherStation {
    /// The envelope type is an Axis-Aligned Bounding Box (AABB) in 2D space (latitude, longitude).
    type Envelope = AABB<[f64; 2]>;

    /// A station is a point, so its envelope is a degenerate AABB holding only that point.
    fn envelope(&self) -> Self::Envelope {
        AABB::from_point([self.location.latitude, self.location.longitude])
    }
}

/// Implementation required by `rstar` to calculate distances between stations and query points.
impl PointDistance for WeatherStation {
    /// Squared Euclidean distance between the station and `[query_latitude, query_longitude]`,
    /// treating degrees as Cartesian coordinates.
    fn distance_2(&self, point: &[f64; 2]) -> f64 {
        let dx = self.location.latitude - point[0];
        let dy = self.location.longitude - point[1];
        dx * dx + dy * dy
    }
}
