//! Conversion of typed rows into polars `DataFrame`s with the published column names.

use crate::frames::error::FrameError;
use crate::types::attendance::{AttendanceRecord, CapacityRecord, CommuneAttendance, NightsRecord};
use crate::types::cluster::{ClusterMapping, CommuneClusterAssignment};
use crate::types::station::{ClusterWeatherRecord, StationAssignment, WeatherStationRecord};
use polars::prelude::{Column, DataFrame};

/// Builds a `DataFrame` out of a slice of rows.
pub trait ToFrame {
    fn to_frame(&self) -> Result<DataFrame, FrameError>;
}

fn build(table: &'static str, columns: Vec<Column>) -> Result<DataFrame, FrameError> {
    DataFrame::new(columns).map_err(|source| FrameError::Build { table, source })
}

fn text<T>(rows: &[T], f: impl Fn(&T) -> String) -> Vec<String> {
    rows.iter().map(f).collect()
}

impl ToFrame for [CapacityRecord] {
    fn to_frame(&self) -> Result<DataFrame, FrameError> {
        build(
            "capacity",
            vec![
                Column::new("commune_id".into(), text(self, |r| r.commune_id.clone())),
                Column::new("department_id".into(), text(self, |r| r.department_id.clone())),
                Column::new(
                    "accommodation_type".into(),
                    text(self, |r| r.accommodation_type.to_string()),
                ),
                Column::new(
                    "capacity".into(),
                    self.iter().map(|r| r.capacity).collect::<Vec<u64>>(),
                ),
            ],
        )
    }
}

impl ToFrame for [NightsRecord] {
    fn to_frame(&self) -> Result<DataFrame, FrameError> {
        build(
            "nights",
            vec![
                Column::new("department_id".into(), text(self, |r| r.department_id.clone())),
                Column::new("time_period".into(), text(self, |r| r.time_period.to_string())),
                Column::new(
                    "accommodation_type".into(),
                    text(self, |r| r.accommodation_type.to_string()),
                ),
                Column::new("temporal_rate".into(), text(self, |r| r.temporal_rate.to_string())),
                Column::new(
                    "nights".into(),
                    self.iter().map(|r| r.nights).collect::<Vec<f64>>(),
                ),
            ],
        )
    }
}

impl ToFrame for [CommuneAttendance] {
    fn to_frame(&self) -> Result<DataFrame, FrameError> {
        build(
            "commune_attendance",
            vec![
                Column::new("commune_id".into(), text(self, |r| r.commune_id.clone())),
                Column::new("department_id".into(), text(self, |r| r.department_id.clone())),
                Column::new(
                    "accommodation_type".into(),
                    text(self, |r| r.accommodation_type.to_string()),
                ),
                Column::new("time_period".into(), text(self, |r| r.time_period.to_string())),
                Column::new(
                    "capacity_city".into(),
                    self.iter().map(|r| r.capacity_city).collect::<Vec<u64>>(),
                ),
                Column::new(
                    "capacity_department".into(),
                    self.iter().map(|r| r.capacity_department).collect::<Vec<u64>>(),
                ),
                Column::new(
                    "nights_department".into(),
                    self.iter().map(|r| r.nights_department).collect::<Vec<f64>>(),
                ),
                Column::new(
                    "nights_city".into(),
                    self.iter().map(|r| r.nights_city).collect::<Vec<Option<f64>>>(),
                ),
            ],
        )
    }
}

impl ToFrame for [AttendanceRecord] {
    fn to_frame(&self) -> Result<DataFrame, FrameError> {
        build(
            "cluster_attendance",
            vec![
                Column::new(
                    "cluster_id".into(),
                    self.iter().map(|r| r.cluster_id).collect::<Vec<u32>>(),
                ),
                Column::new(
                    "accommodation_type".into(),
                    text(self, |r| r.accommodation_type.to_string()),
                ),
                Column::new("time_period".into(), text(self, |r| r.time_period.to_string())),
                Column::new(
                    "capacity_zone".into(),
                    self.iter().map(|r| r.capacity_total).collect::<Vec<u64>>(),
                ),
                Column::new(
                    "nights_zone".into(),
                    self.iter().map(|r| r.nights_total).collect::<Vec<Option<f64>>>(),
                ),
                Column::new(
                    "undefined_communes".into(),
                    self.iter().map(|r| r.undefined_communes).collect::<Vec<u32>>(),
                ),
            ],
        )
    }
}

impl ToFrame for [ClusterMapping] {
    fn to_frame(&self) -> Result<DataFrame, FrameError> {
        build(
            "cluster_mapping",
            vec![
                Column::new(
                    "cluster_id".into(),
                    self.iter().map(|r| r.cluster_id).collect::<Vec<u32>>(),
                ),
                Column::new(
                    "representative_commune_id".into(),
                    text(self, |r| r.representative_commune_id.clone()),
                ),
                Column::new(
                    "centroid_latitude".into(),
                    self.iter().map(|r| r.centroid_latitude).collect::<Vec<Option<f64>>>(),
                ),
                Column::new(
                    "centroid_longitude".into(),
                    self.iter().map(|r| r.centroid_longitude).collect::<Vec<Option<f64>>>(),
                ),
                Column::new(
                    "principal_town_name".into(),
                    text(self, |r| r.principal_town_name.clone()),
                ),
            ],
        )
    }
}

impl ToFrame for [CommuneClusterAssignment] {
    fn to_frame(&self) -> Result<DataFrame, FrameError> {
        build(
            "commune_assignments",
            vec![
                Column::new("commune_id".into(), text(self, |r| r.commune_id.clone())),
                Column::new(
                    "cluster_id".into(),
                    self.iter().map(|r| r.cluster_id).collect::<Vec<u32>>(),
                ),
            ],
        )
    }
}

impl ToFrame for [WeatherStationRecord] {
    fn to_frame(&self) -> Result<DataFrame, FrameError> {
        build(
            "station_months",
            vec![
                Column::new(
                    "station_commune_id".into(),
                    text(self, |r| r.station_commune_id.clone()),
                ),
                Column::new(
                    "latitude".into(),
                    self.iter().map(|r| r.latitude).collect::<Vec<f64>>(),
                ),
                Column::new(
                    "longitude".into(),
                    self.iter().map(|r| r.longitude).collect::<Vec<f64>>(),
                ),
                Column::new(
                    "month".into(),
                    self.iter().map(|r| r.month).collect::<Vec<u32>>(),
                ),
                Column::new(
                    "mean_pressure".into(),
                    self.iter().map(|r| r.mean_pressure).collect::<Vec<Option<f64>>>(),
                ),
                Column::new(
                    "mean_temperature".into(),
                    self.iter().map(|r| r.mean_temperature).collect::<Vec<Option<f64>>>(),
                ),
                Column::new(
                    "total_precipitation".into(),
                    self.iter().map(|r| r.total_precipitation).collect::<Vec<Option<f64>>>(),
                ),
                Column::new(
                    "mean_gust".into(),
                    self.iter().map(|r| r.mean_gust).collect::<Vec<Option<f64>>>(),
                ),
            ],
        )
    }
}

impl ToFrame for [StationAssignment] {
    fn to_frame(&self) -> Result<DataFrame, FrameError> {
        build(
            "station_assignments",
            vec![
                Column::new(
                    "cluster_id".into(),
                    self.iter().map(|r| r.cluster_id).collect::<Vec<u32>>(),
                ),
                Column::new(
                    "station_commune_id".into(),
                    text(self, |r| r.station_commune_id.clone()),
                ),
                Column::new(
                    "distance_km".into(),
                    self.iter().map(|r| r.distance_km).collect::<Vec<f64>>(),
                ),
            ],
        )
    }
}

impl ToFrame for [ClusterWeatherRecord] {
    fn to_frame(&self) -> Result<DataFrame, FrameError> {
        build(
            "cluster_weather",
            vec![
                Column::new(
                    "cluster_id".into(),
                    self.iter().map(|r| r.cluster_id).collect::<Vec<u32>>(),
                ),
                Column::new(
                    "month".into(),
                    self.iter().map(|r| r.month).collect::<Vec<u32>>(),
                ),
                Column::new(
                    "nearest_station_commune_id".into(),
                    text(self, |r| r.nearest_station_commune_id.clone()),
                ),
                Column::new(
                    "mean_pressure".into(),
                    self.iter().map(|r| r.mean_pressure).collect::<Vec<Option<f64>>>(),
                ),
                Column::new(
                    "mean_temperature".into(),
                    self.iter().map(|r| r.mean_temperature).collect::<Vec<Option<f64>>>(),
                ),
                Column::new(
                    "total_precipitation".into(),
                    self.iter().map(|r| r.total_precipitation).collect::<Vec<Option<f64>>>(),
                ),
                Column::new(
                    "mean_gust".into(),
                    self.iter().map(|r| r.mean_gust).collect::<Vec<Option<f64>>>(),
                ),
            ],
        )
    }
}
