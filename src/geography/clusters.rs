//! Employment-zone clusters built from the commune table.
//!
//! Each INSEE employment zone becomes one cluster. Clusters are numbered from 1 in the
//! order their zone first appears in the commune table.

use crate::config::PipelineConfig;
use crate::frames::schema::{self, TableReader, TableSchema};
use crate::geography::error::ClusterError;
use crate::types::cluster::{ClusterCentroid, ClusterMapping, CommuneClusterAssignment};
use log::{info, warn};
use polars::prelude::DataFrame;
use std::collections::{BTreeSet, HashMap};

/// Cluster mapping and commune membership produced by [`ClusterBuilder::build`].
#[derive(Debug, Clone, PartialEq)]
pub struct Clusters {
    /// One row per cluster, sorted by cluster id.
    pub mappings: Vec<ClusterMapping>,
    /// One row per kept commune, sorted by commune id.
    pub assignments: Vec<CommuneClusterAssignment>,
}

impl Clusters {
    /// Centroids of the clusters that have one.
    pub fn centroids(&self) -> Vec<ClusterCentroid> {
        self.mappings.iter().filter_map(ClusterMapping::centroid).collect()
    }
}

#[derive(Debug, Clone, Default)]
pub struct ClusterBuilder {
    excluded_regions: BTreeSet<String>,
}

struct Accumulator {
    zone: String,
    latitude: MeanOf,
    longitude: MeanOf,
    principal: Option<(f64, String)>,
    first_name: String,
}

#[derive(Default)]
struct MeanOf {
    sum: f64,
    count: u32,
}

impl MeanOf {
    fn push(&mut self, value: Option<f64>) {
        if let Some(v) = value.filter(|v| v.is_finite()) {
            self.sum += v;
            self.count += 1;
        }
    }

    fn mean(&self) -> Option<f64> {
        (self.count > 0).then(|| self.sum / self.count as f64)
    }
}

impl ClusterBuilder {
    pub fn new<I, S>(excluded_regions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            excluded_regions: excluded_regions.into_iter().map(Into::into).collect(),
        }
    }

    pub fn from_config(config: &PipelineConfig) -> Self {
        Self::new(config.excluded_regions.iter().cloned())
    }

    /// Builds clusters from a commune table.
    ///
    /// Communes of an excluded region (when the table has a `region_name` column) and
    /// communes without an employment zone or postal code are skipped and counted. The
    /// centroid is the mean of the members' centre coordinates; the principal town is the
    /// most populated member, the first one listed on ties.
    ///
    /// # Errors
    ///
    /// * [`ClusterError::Frame`] if a required column is missing or unreadable.
    /// * [`ClusterError::NullKey`] for a commune without a code.
    /// * [`ClusterError::DuplicateCommune`] if a commune code appears twice.
    pub fn build(&self, communes: &DataFrame) -> Result<Clusters, ClusterError> {
        let reader = TableReader::new(communes, schema::COMMUNES)?;
        let ids = reader.strings("commune_id")?;
        let names = reader.strings("commune_name")?;
        let zones = reader.strings("employment_zone_id")?;
        let populations = reader.floats("population")?;
        let latitudes = reader.floats("latitude_centre")?;
        let longitudes = reader.floats("longitude_centre")?;
        let postal_codes = reader.strings("postal_code")?;
        let regions = if reader.has_column(schema::COMMUNES_REGION_COLUMN) {
            reader.strings(schema::COMMUNES_REGION_COLUMN)?
        } else {
            vec![None; reader.height()]
        };

        let mut cluster_of_zone: HashMap<String, u32> = HashMap::new();
        let mut accumulators: Vec<Accumulator> = Vec::new();
        let mut assignments: Vec<CommuneClusterAssignment> = Vec::new();
        let mut seen: BTreeSet<String> = BTreeSet::new();
        let mut overseas = 0usize;
        let mut incomplete = 0usize;

        for row in 0..reader.height() {
            if regions[row]
                .as_ref()
                .is_some_and(|region| self.excluded_regions.contains(region))
            {
                overseas += 1;
                continue;
            }
            let (Some(zone), Some(_)) = (&zones[row], &postal_codes[row]) else {
                incomplete += 1;
                continue;
            };
            let commune_id = ids[row].clone().ok_or(ClusterError::NullKey {
                table: schema::COMMUNES.name,
                column: "commune_id",
                row,
            })?;
            if !seen.insert(commune_id.clone()) {
                return Err(ClusterError::DuplicateCommune(commune_id));
            }

            let cluster_id = *cluster_of_zone.entry(zone.clone()).or_insert_with(|| {
                accumulators.push(Accumulator {
                    zone: zone.clone(),
                    latitude: MeanOf::default(),
                    longitude: MeanOf::default(),
                    principal: None,
                    first_name: names[row].clone().unwrap_or_default(),
                });
                accumulators.len() as u32
            });

            let accumulator = &mut accumulators[cluster_id as usize - 1];
            accumulator.latitude.push(latitudes[row]);
            accumulator.longitude.push(longitudes[row]);
            if let Some(population) = populations[row].filter(|p| p.is_finite()) {
                let is_larger = accumulator
                    .principal
                    .as_ref()
                    .map_or(true, |(best, _)| population > *best);
                if is_larger {
                    accumulator.principal = Some((population, names[row].clone().unwrap_or_default()));
                }
            }

            assignments.push(CommuneClusterAssignment {
                commune_id,
                cluster_id,
            });
        }

        if overseas > 0 {
            info!("Excluded {} communes of overseas regions", overseas);
        }
        if incomplete > 0 {
            warn!(
                "Dropped {} communes without an employment zone or postal code",
                incomplete
            );
        }

        let mappings: Vec<ClusterMapping> = accumulators
            .into_iter()
            .enumerate()
            .map(|(index, accumulator)| ClusterMapping {
                cluster_id: index as u32 + 1,
                centroid_latitude: accumulator.latitude.mean(),
                centroid_longitude: accumulator.longitude.mean(),
                principal_town_name: accumulator
                    .principal
                    .map(|(_, name)| name)
                    .unwrap_or(accumulator.first_name),
                representative_commune_id: accumulator.zone,
            })
            .collect();
        assignments.sort_by(|a, b| a.commune_id.cmp(&b.commune_id));

        info!(
            "Built {} clusters from {} communes",
            mappings.len(),
            assignments.len()
        );
        Ok(Clusters {
            mappings,
            assignments,
        })
    }
}

/// Reads a `{commune_id, cluster_id}` table.
pub fn read_assignments(frame: &DataFrame) -> Result<Vec<CommuneClusterAssignment>, ClusterError> {
    let reader = TableReader::new(frame, schema::COMMUNE_ASSIGNMENTS)?;
    let ids = reader.strings("commune_id")?;
    let clusters = reader.integers("cluster_id")?;
    ids.into_iter()
        .zip(clusters)
        .enumerate()
        .map(|(row, (commune_id, cluster_id))| -> Result<_, ClusterError> {
            let table = schema::COMMUNE_ASSIGNMENTS;
            Ok(CommuneClusterAssignment {
                commune_id: commune_id.ok_or(ClusterError::NullKey {
                    table: table.name,
                    column: "commune_id",
                    row,
                })?,
                cluster_id: cluster_id_at(table, row, cluster_id)?,
            })
        })
        .collect()
}

/// Reads a `{cluster_id, centroid_latitude, centroid_longitude}` table.
///
/// Rows without coordinates are skipped.
pub fn read_centroids(frame: &DataFrame) -> Result<Vec<ClusterCentroid>, ClusterError> {
    let table = schema::CLUSTER_CENTROIDS;
    let reader = TableReader::new(frame, table)?;
    let clusters = reader.integers("cluster_id")?;
    let latitudes = reader.floats("centroid_latitude")?;
    let longitudes = reader.floats("centroid_longitude")?;

    let mut centroids = Vec::with_capacity(reader.height());
    for (row, ((cluster_id, latitude), longitude)) in
        clusters.into_iter().zip(latitudes).zip(longitudes).enumerate()
    {
        let cluster_id = cluster_id_at(table, row, cluster_id)?;
        if let (Some(latitude), Some(longitude)) = (latitude, longitude) {
            centroids.push(ClusterCentroid {
                cluster_id,
                latitude,
                longitude,
            });
        }
    }
    Ok(centroids)
}

fn cluster_id_at(table: TableSchema, row: usize, value: Option<i64>) -> Result<u32, ClusterError> {
    let value = value.ok_or(ClusterError::NullKey {
        table: table.name,
        column: "cluster_id",
        row,
    })?;
    u32::try_from(value)
        .ok()
        .filter(|id| *id >= 1)
        .ok_or(ClusterError::InvalidClusterId {
            table: table.name,
            row,
            value,
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DEFAULT_EXCLUDED_REGIONS;
    use polars::prelude::*;

    fn communes() -> PolarsResult<DataFrame> {
        df!(
            "commune_id" => ["01004", "01053", "97101", "01001", "74010", "01002"],
            "commune_name" => ["Ambérieu-en-Bugey", "Bourg-en-Bresse", "Les Abymes", "L'Abergement-Clémenciat", "Annecy", "L'Abergement-de-Varey"],
            "employment_zone_id" => [Some("01004"), Some("01053"), Some("97101"), Some("01053"), Some("74010"), None],
            "population" => [14514.0, 41248.0, 53000.0, 832.0, 131272.0, 267.0],
            "latitude_centre" => [45.96, 46.20, 16.27, 46.15, 45.90, 46.01],
            "longitude_centre" => [5.37, 5.22, -61.50, 4.92, 6.13, 5.42],
            "postal_code" => ["01500", "01000", "97139", "01400", "74000", "01640"],
            "region_name" => ["Auvergne-Rhône-Alpes", "Auvergne-Rhône-Alpes", "Guadeloupe", "Auvergne-Rhône-Alpes", "Auvergne-Rhône-Alpes", "Auvergne-Rhône-Alpes"]
        )
    }

    #[test]
    fn builds_clusters_in_first_appearance_order() -> Result<(), Box<dyn std::error::Error>> {
        let clusters = ClusterBuilder::new(DEFAULT_EXCLUDED_REGIONS).build(&communes()?)?;

        assert_eq!(clusters.mappings.len(), 3);
        let ids: Vec<&str> = clusters
            .mappings
            .iter()
            .map(|m| m.representative_commune_id.as_str())
            .collect();
        assert_eq!(ids, ["01004", "01053", "74010"]);

        let bourg = &clusters.mappings[1];
        assert_eq!(bourg.cluster_id, 2);
        assert_eq!(bourg.principal_town_name, "Bourg-en-Bresse");
        assert!((bourg.centroid_latitude.unwrap() - (46.20 + 46.15) / 2.0).abs() < 1e-12);
        assert!((bourg.centroid_longitude.unwrap() - (5.22 + 4.92) / 2.0).abs() < 1e-12);

        let assigned: Vec<(&str, u32)> = clusters
            .assignments
            .iter()
            .map(|a| (a.commune_id.as_str(), a.cluster_id))
            .collect();
        assert_eq!(
            assigned,
            [("01001", 2), ("01004", 1), ("01053", 2), ("74010", 3)]
        );
        assert_eq!(clusters.centroids().len(), 3);
        Ok(())
    }

    #[test]
    fn region_column_is_optional() -> Result<(), Box<dyn std::error::Error>> {
        let df = communes()?.drop("region_name")?;
        let clusters = ClusterBuilder::default().build(&df)?;
        assert_eq!(clusters.mappings.len(), 4);
        Ok(())
    }

    #[test]
    fn duplicate_communes_are_rejected() -> Result<(), Box<dyn std::error::Error>> {
        let df = df!(
            "commune_id" => ["01004", "01004"],
            "commune_name" => ["A", "B"],
            "employment_zone_id" => ["01004", "01004"],
            "population" => [1.0, 2.0],
            "latitude_centre" => [45.0, 45.1],
            "longitude_centre" => [5.0, 5.1],
            "postal_code" => ["01500", "01500"]
        )?;
        assert!(matches!(
            ClusterBuilder::default().build(&df),
            Err(ClusterError::DuplicateCommune(ref id)) if id == "01004"
        ));
        Ok(())
    }

    #[test]
    fn reads_assignment_and_centroid_tables() -> Result<(), Box<dyn std::error::Error>> {
        let assignments = df!(
            "commune_id" => ["01004", "01053"],
            "cluster_id" => [1i64, 2]
        )?;
        let read = read_assignments(&assignments)?;
        assert_eq!(
            read,
            vec![
                CommuneClusterAssignment {
                    commune_id: "01004".to_string(),
                    cluster_id: 1
                },
                CommuneClusterAssignment {
                    commune_id: "01053".to_string(),
                    cluster_id: 2
                },
            ]
        );

        let without_commune = df!(
            "commune_id" => [Some("01004"), None],
            "cluster_id" => [1i64, 2]
        )?;
        assert!(matches!(
            read_assignments(&without_commune),
            Err(ClusterError::NullKey { column: "commune_id", row: 1, .. })
        ));

        let centroids = df!(
            "cluster_id" => [1i64, 2, 3],
            "centroid_latitude" => [Some(45.9), None, Some(46.1)],
            "centroid_longitude" => [Some(5.3), Some(5.2), Some(6.0)]
        )?;
        let read = read_centroids(&centroids)?;
        assert_eq!(read.len(), 2);
        assert_eq!(read[1].cluster_id, 3);

        let bad = df!(
            "commune_id" => ["01004"],
            "cluster_id" => [0i64]
        )?;
        assert!(matches!(
            read_assignments(&bad),
            Err(ClusterError::InvalidClusterId { value: 0, .. })
        ));
        Ok(())
    }
}
