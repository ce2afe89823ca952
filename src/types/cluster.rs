//! Employment-zone clusters and the communes that belong to them.

use serde::{Deserialize, Serialize};

/// One employment zone, renumbered as a dense cluster id starting at 1.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClusterMapping {
    pub cluster_id: u32,
    /// INSEE code of the commune the employment zone is named after.
    pub representative_commune_id: String,
    /// Mean of the member communes' centre coordinates, `None` if none of them has one.
    pub centroid_latitude: Option<f64>,
    pub centroid_longitude: Option<f64>,
    /// Name of the most populated member commune.
    pub principal_town_name: String,
}

impl ClusterMapping {
    pub fn centroid(&self) -> Option<ClusterCentroid> {
        Some(ClusterCentroid {
            cluster_id: self.cluster_id,
            latitude: self.centroid_latitude?,
            longitude: self.centroid_longitude?,
        })
    }
}

/// Membership of a commune in a cluster. Each commune belongs to exactly one cluster.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommuneClusterAssignment {
    pub commune_id: String,
    pub cluster_id: u32,
}

/// The location used to attach weather to a cluster.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ClusterCentroid {
    pub cluster_id: u32,
    pub latitude: f64,
    pub longitude: f64,
}

impl ClusterCentroid {
    pub fn is_valid(&self) -> bool {
        self.latitude.is_finite() && self.longitude.is_finite()
    }
}
