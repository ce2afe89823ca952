use crate::config::PipelineConfig;
use crate::frames::schema::{self, TableReader};
use crate::types::cluster::ClusterCentroid;
use crate::types::station::{
    ClusterWeatherRecord, StationAssignment, WeatherStation, WeatherStationRecord,
};
use crate::weather::error::WeatherError;
use haversine::{distance, Location as HaversineLocation, Units};
use log::{debug, info, warn};
use ordered_float::OrderedFloat;
use polars::prelude::DataFrame;
use rstar::RTree;
use std::cmp::Ordering;
use std::collections::btree_map::Entry;
use std::collections::BTreeMap;

const MONTHS_IN_YEAR: usize = 12;

/// Spatial index over weather stations.
#[derive(Debug, Clone)]
pub struct StationLocator {
    rtree: RTree<WeatherStation>,
}

// Orders by planar distance first, then by station id.
struct StationCandidate<'a> {
    distance_2: OrderedFloat<f64>,
    station: &'a WeatherStation,
}

impl PartialEq for StationCandidate<'_> {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}
impl Eq for StationCandidate<'_> {}
impl PartialOrd for StationCandidate<'_> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}
impl Ord for StationCandidate<'_> {
    fn cmp(&self, other: &Self) -> Ordering {
        self.distance_2
            .cmp(&other.distance_2)
            .then_with(|| self.station.id.cmp(&other.station.id))
    }
}

impl StationLocator {
    pub fn new(stations: Vec<WeatherStation>) -> Self {
        Self {
            rtree: RTree::bulk_load(stations),
        }
    }

    pub fn len(&self) -> usize {
        self.rtree.size()
    }

    pub fn is_empty(&self) -> bool {
        self.rtree.size() == 0
    }

    /// Nearest station to a point, using squared distance on degrees.
    ///
    /// Among stations at exactly the same distance the smallest id is returned, so the
    /// answer does not depend on how the tree was built.
    pub fn nearest(&self, latitude: f64, longitude: f64) -> Option<&WeatherStation> {
        let query_point = [latitude, longitude];
        let mut candidates = self
            .rtree
            .nearest_neighbor_iter_with_distance_2(&query_point)
            .map(|(station, distance_2)| StationCandidate {
                distance_2: OrderedFloat(distance_2),
                station,
            });

        let first = candidates.next()?;
        let best_distance = first.distance_2;
        let winner = candidates
            .take_while(|candidate| candidate.distance_2 == best_distance)
            .fold(first, |best, candidate| best.min(candidate));
        Some(winner.station)
    }
}

/// Station assignments and the weather joined onto each cluster.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct StationLinks {
    /// One row per linked cluster, sorted by cluster id.
    pub assignments: Vec<StationAssignment>,
    /// One row per (cluster, month present for its station), sorted by cluster then month.
    pub weather: Vec<ClusterWeatherRecord>,
}

/// Attaches to every cluster the monthly weather of its nearest station.
///
/// By default a cluster is only linked when its station covers all twelve months.
#[derive(Debug, Clone, Copy)]
pub struct NearestStationLinker {
    require_full_year: bool,
}

impl Default for NearestStationLinker {
    fn default() -> Self {
        Self::new(true)
    }
}

impl NearestStationLinker {
    pub fn new(require_full_year: bool) -> Self {
        Self { require_full_year }
    }

    pub fn from_config(config: &PipelineConfig) -> Self {
        Self::new(config.require_full_year)
    }

    /// Links clusters to stations.
    ///
    /// A station's location is the one on its earliest month. Clusters with a non-finite
    /// centroid are skipped. When `require_full_year` is set (the default), clusters whose
    /// station lacks a month are dropped from both outputs rather than padded.
    ///
    /// # Errors
    ///
    /// * [`WeatherError::DuplicateStationMonth`] if a station has two rows for one month.
    /// * [`WeatherError::DuplicateCluster`] if a cluster id has two centroids.
    pub fn link(
        &self,
        centroids: &[ClusterCentroid],
        station_months: &[WeatherStationRecord],
    ) -> Result<StationLinks, WeatherError> {
        let mut months_by_station: BTreeMap<&str, BTreeMap<u32, &WeatherStationRecord>> =
            BTreeMap::new();
        for record in station_months {
            let months = months_by_station
                .entry(record.station_commune_id.as_str())
                .or_default();
            if months.insert(record.month, record).is_some() {
                return Err(WeatherError::DuplicateStationMonth {
                    station: record.station_commune_id.clone(),
                    month: record.month,
                });
            }
        }

        let stations: Vec<WeatherStation> = months_by_station
            .values()
            .filter_map(|months| months.values().next())
            .map(|record| record.station())
            .collect();
        let locator = StationLocator::new(stations);
        if locator.is_empty() && !centroids.is_empty() {
            warn!("No weather stations available, no cluster will receive weather");
        }

        let mut by_cluster: BTreeMap<u32, &ClusterCentroid> = BTreeMap::new();
        for centroid in centroids {
            match by_cluster.entry(centroid.cluster_id) {
                Entry::Vacant(slot) => {
                    slot.insert(centroid);
                }
                Entry::Occupied(_) => {
                    return Err(WeatherError::DuplicateCluster(centroid.cluster_id));
                }
            }
        }

        let mut links = StationLinks::default();
        let mut invalid_centroids = 0usize;
        let mut partial_years = 0usize;

        for (cluster_id, centroid) in by_cluster {
            if !centroid.is_valid() {
                invalid_centroids += 1;
                continue;
            }
            let Some(station) = locator.nearest(centroid.latitude, centroid.longitude) else {
                continue;
            };
            let Some(months) = months_by_station.get(station.id.as_str()) else {
                continue;
            };
            if self.require_full_year && months.len() < MONTHS_IN_YEAR {
                debug!(
                    "Cluster {} dropped, station {} covers {} months",
                    cluster_id,
                    station.id,
                    months.len()
                );
                partial_years += 1;
                continue;
            }

            let distance_km = distance(
                HaversineLocation {
                    latitude: centroid.latitude,
                    longitude: centroid.longitude,
                },
                HaversineLocation {
                    latitude: station.location.latitude,
                    longitude: station.location.longitude,
                },
                Units::Kilometers,
            );
            links.assignments.push(StationAssignment {
                cluster_id,
                station_commune_id: station.id.clone(),
                distance_km,
            });
            links
                .weather
                .extend(months.values().map(|record| ClusterWeatherRecord {
                    cluster_id,
                    month: record.month,
                    nearest_station_commune_id: station.id.clone(),
                    mean_pressure: record.mean_pressure,
                    mean_temperature: record.mean_temperature,
                    total_precipitation: record.total_precipitation,
                    mean_gust: record.mean_gust,
                }));
        }

        if invalid_centroids > 0 {
            warn!("Skipped {} clusters without a usable centroid", invalid_centroids);
        }
        if partial_years > 0 {
            warn!(
                "Dropped {} clusters whose nearest station lacks a full year",
                partial_years
            );
        }
        info!(
            "Linked {} clusters to {} weather stations",
            links.assignments.len(),
            locator.len()
        );
        Ok(links)
    }

    pub fn link_frame(
        &self,
        centroids: &[ClusterCentroid],
        station_months: &DataFrame,
    ) -> Result<StationLinks, WeatherError> {
        let records = read_station_months(station_months)?;
        self.link(centroids, &records)
    }
}

/// Reads a station-month weather table.
///
/// # Errors
///
/// * [`WeatherError::NullKey`] for a row without station, location or month.
/// * [`WeatherError::InvalidMonth`] for a month outside 1-12.
pub fn read_station_months(frame: &DataFrame) -> Result<Vec<WeatherStationRecord>, WeatherError> {
    let table = schema::STATION_MONTHS;
    let reader = TableReader::new(frame, table)?;
    let stations = reader.strings("station_commune_id")?;
    let latitudes = reader.floats("latitude")?;
    let longitudes = reader.floats("longitude")?;
    let months = reader.integers("month")?;
    let pressures = reader.floats("mean_pressure")?;
    let temperatures = reader.floats("mean_temperature")?;
    let precipitations = reader.floats("total_precipitation")?;
    let gusts = reader.floats("mean_gust")?;

    let null_key = |column: &'static str, row: usize| WeatherError::NullKey {
        table: table.name,
        column,
        row,
    };

    let mut records = Vec::with_capacity(reader.height());
    for row in 0..reader.height() {
        let station = stations[row]
            .clone()
            .ok_or_else(|| null_key("station_commune_id", row))?;
        let month = months[row].ok_or_else(|| null_key("month", row))?;
        let month = u32::try_from(month)
            .ok()
            .filter(|m| (1..=12).contains(m))
            .ok_or_else(|| WeatherError::InvalidMonth {
                station: station.clone(),
                month,
            })?;
        records.push(WeatherStationRecord {
            latitude: latitudes[row].ok_or_else(|| null_key("latitude", row))?,
            longitude: longitudes[row].ok_or_else(|| null_key("longitude", row))?,
            station_commune_id: station,
            month,
            mean_pressure: pressures[row],
            mean_temperature: temperatures[row],
            total_precipitation: precipitations[row],
            mean_gust: gusts[row],
        });
    }
    Ok(records)
}

#[cfg(test)]
mod tests {
    use super::*;
    use polars::prelude::*;

    fn month(station: &str, latitude: f64, longitude: f64, month: u32) -> WeatherStationRecord {
        WeatherStationRecord {
            station_commune_id: station.to_string(),
            latitude,
            longitude,
            month,
            mean_pressure: Some(101000.0 + month as f64),
            mean_temperature: Some(month as f64),
            total_precipitation: Some(10.0),
            mean_gust: Some(5.0),
        }
    }

    fn centroid(cluster_id: u32, latitude: f64, longitude: f64) -> ClusterCentroid {
        ClusterCentroid {
            cluster_id,
            latitude,
            longitude,
        }
    }

    #[test]
    fn nearest_station_wins() -> Result<(), WeatherError> {
        let stations = vec![
            month("06088", 43.65, 7.21, 1),
            month("13054", 43.44, 5.22, 1),
            month("75114", 48.82, 2.34, 1),
        ];
        let links = NearestStationLinker::new(false).link(
            &[centroid(2, 48.85, 2.35), centroid(1, 43.70, 7.25)],
            &stations,
        )?;

        let chosen: Vec<(u32, &str)> = links
            .assignments
            .iter()
            .map(|a| (a.cluster_id, a.station_commune_id.as_str()))
            .collect();
        assert_eq!(chosen, vec![(1, "06088"), (2, "75114")]);
        assert!(links.assignments[1].distance_km < 5.0);
        Ok(())
    }

    #[test]
    fn equidistant_stations_resolve_to_smallest_id() -> Result<(), WeatherError> {
        let forward = vec![month("B", 45.0, 6.0, 1), month("A", 45.0, 4.0, 1)];
        let backward: Vec<_> = forward.iter().rev().cloned().collect();
        let linker = NearestStationLinker::new(false);

        for stations in [&forward, &backward] {
            let links = linker.link(&[centroid(1, 45.0, 5.0)], stations)?;
            assert_eq!(links.assignments[0].station_commune_id, "A");
        }
        Ok(())
    }

    #[test]
    fn station_location_comes_from_its_earliest_month() -> Result<(), WeatherError> {
        let stations = vec![
            month("A", 10.0, 10.0, 2),
            month("A", 0.0, 0.0, 1),
            month("B", 5.0, 5.0, 1),
        ];
        let links = NearestStationLinker::new(false).link(&[centroid(1, 0.1, 0.1)], &stations)?;
        assert_eq!(links.assignments[0].station_commune_id, "A");
        Ok(())
    }

    #[test]
    fn join_is_inner_and_sorted() -> Result<(), WeatherError> {
        let stations = vec![month("A", 0.0, 0.0, 7), month("A", 0.0, 0.0, 1)];
        let links = NearestStationLinker::new(false)
            .link(&[centroid(3, 0.0, 0.0), centroid(1, 0.5, 0.5)], &stations)?;
        let rows: Vec<(u32, u32)> = links.weather.iter().map(|w| (w.cluster_id, w.month)).collect();
        assert_eq!(rows, vec![(1, 1), (1, 7), (3, 1), (3, 7)]);
        assert_eq!(links.weather[1].mean_temperature, Some(7.0));
        Ok(())
    }

    #[test]
    fn full_year_requirement_drops_partial_stations() -> Result<(), WeatherError> {
        let mut stations: Vec<_> = (1..=12).map(|m| month("FULL", 0.0, 0.0, m)).collect();
        stations.extend((1..=11).map(|m| month("PART", 10.0, 10.0, m)));
        let centroids = [centroid(1, 0.0, 0.0), centroid(2, 10.0, 10.0)];

        let relaxed = NearestStationLinker::new(false).link(&centroids, &stations)?;
        assert_eq!(relaxed.assignments.len(), 2);
        assert_eq!(relaxed.weather.len(), 23);

        let strict = NearestStationLinker::new(true).link(&centroids, &stations)?;
        assert_eq!(strict.assignments.len(), 1);
        assert!(strict.weather.iter().all(|w| w.cluster_id == 1));
        assert_eq!(strict.weather.len(), 12);
        Ok(())
    }

    #[test]
    fn default_linker_drops_stations_missing_a_month() -> Result<(), WeatherError> {
        let stations: Vec<_> = (1..=11).map(|m| month("PART", 0.0, 0.0, m)).collect();
        let links = NearestStationLinker::default().link(&[centroid(1, 0.0, 0.0)], &stations)?;
        assert!(links.assignments.is_empty());
        assert!(links.weather.is_empty());

        let config = PipelineConfig::default();
        let links =
            NearestStationLinker::from_config(&config).link(&[centroid(1, 0.0, 0.0)], &stations)?;
        assert!(links.weather.is_empty());
        Ok(())
    }

    #[test]
    fn invalid_centroids_are_skipped() -> Result<(), WeatherError> {
        let stations = vec![month("A", 0.0, 0.0, 1)];
        let links = NearestStationLinker::new(false)
            .link(&[centroid(1, f64::NAN, 0.0), centroid(2, 0.0, 0.0)], &stations)?;
        assert_eq!(links.assignments.len(), 1);
        assert_eq!(links.assignments[0].cluster_id, 2);
        Ok(())
    }

    #[test]
    fn linking_is_repeatable() -> Result<(), WeatherError> {
        let stations: Vec<_> = ["C", "A", "B", "D"]
            .iter()
            .enumerate()
            .map(|(i, id)| month(id, i as f64, (i % 2) as f64, 1))
            .collect();
        let centroids: Vec<_> = (1..=5).map(|i| centroid(i, i as f64 * 0.7, 0.5)).collect();
        let linker = NearestStationLinker::new(false);
        assert_eq!(linker.link(&centroids, &stations)?, linker.link(&centroids, &stations)?);
        Ok(())
    }

    #[test]
    fn duplicate_station_months_are_rejected() {
        let stations = vec![month("A", 0.0, 0.0, 1), month("A", 0.1, 0.0, 1)];
        assert!(matches!(
            NearestStationLinker::new(false).link(&[centroid(1, 0.0, 0.0)], &stations),
            Err(WeatherError::DuplicateStationMonth { .. })
        ));
    }

    #[test]
    fn no_stations_means_no_links() -> Result<(), WeatherError> {
        let links = NearestStationLinker::new(false).link(&[centroid(1, 0.0, 0.0)], &[])?;
        assert!(links.assignments.is_empty());
        assert!(links.weather.is_empty());
        Ok(())
    }

    #[test]
    fn reads_station_month_table() -> Result<(), Box<dyn std::error::Error>> {
        let df = df!(
            "station_commune_id" => ["06088", "06088"],
            "latitude" => [43.65, 43.65],
            "longitude" => [7.21, 7.21],
            "month" => [1i64, 13],
            "mean_pressure" => [Some(101000.0), None],
            "mean_temperature" => [10.0, 11.0],
            "total_precipitation" => [3.0, 4.0],
            "mean_gust" => [6.0, 7.0]
        )?;
        assert!(matches!(
            read_station_months(&df),
            Err(WeatherError::InvalidMonth { month: 13, .. })
        ));

        let valid = df.head(Some(1));
        let records = read_station_months(&valid)?;
        assert_eq!(records, vec![WeatherStationRecord {
            station_commune_id: "06088".to_string(),
            latitude: 43.65,
            longitude: 7.21,
            month: 1,
            mean_pressure: Some(101000.0),
            mean_temperature: Some(10.0),
            total_precipitation: Some(3.0),
            mean_gust: Some(6.0),
        }]);
        Ok(())
    }
}
