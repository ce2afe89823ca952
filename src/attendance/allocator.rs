//! Allocation of department nights to communes, and aggregation into clusters.
//!
//! Within a department, nights of a given month and accommodation type are shared between
//! communes in proportion to their capacity:
//!
//! ```text
//! nights_city = nights_department * capacity_city / capacity_department
//! ```

use crate::attendance::error::AttendanceError;
use crate::config::PipelineConfig;
use crate::types::accommodation::AccommodationType;
use crate::types::attendance::{AttendanceRecord, CapacityRecord, CommuneAttendance, NightsRecord};
use crate::types::cluster::CommuneClusterAssignment;
use crate::types::period::Month;
use log::{info, warn};
use std::collections::btree_map::Entry;
use std::collections::{BTreeMap, BTreeSet};

#[derive(Debug, Clone, Copy)]
pub struct AttendanceAllocator {
    nights_unit_multiplier: f64,
}

/// Result of the cluster aggregation.
#[derive(Debug, Clone, PartialEq)]
pub struct ClusterAttendance {
    /// Sparse table sorted by cluster, accommodation type and month.
    pub records: Vec<AttendanceRecord>,
    /// Communes with attendance rows but no cluster. They are not part of any aggregate.
    pub unassigned_communes: Vec<String>,
}

#[derive(Default)]
struct ZoneTotals {
    capacity: u64,
    nights: f64,
    defined: u32,
    undefined: u32,
}

impl Default for AttendanceAllocator {
    fn default() -> Self {
        Self::new(1.0)
    }
}

impl AttendanceAllocator {
    pub fn new(nights_unit_multiplier: f64) -> Self {
        Self {
            nights_unit_multiplier,
        }
    }

    pub fn from_config(config: &PipelineConfig) -> Self {
        Self::new(config.nights_unit_multiplier)
    }

    /// Spreads the monthly department nights over the communes of the department.
    ///
    /// Only monthly nights rows are used. When the department has no capacity at all for an
    /// accommodation type the share is undefined, and `nights_city` is `None` for each of its
    /// communes. Communes whose department has no nights rows for the type produce no rows.
    ///
    /// The result is sorted by commune, accommodation type and month.
    ///
    /// # Errors
    ///
    /// [`AttendanceError::DuplicateNights`] if a (department, type, month) has two nights rows.
    pub fn allocate(
        &self,
        capacity: &[CapacityRecord],
        nights: &[NightsRecord],
    ) -> Result<Vec<CommuneAttendance>, AttendanceError> {
        let mut capacity_department: BTreeMap<(&str, AccommodationType), u64> = BTreeMap::new();
        for record in capacity {
            *capacity_department
                .entry((record.department_id.as_str(), record.accommodation_type))
                .or_insert(0) += record.capacity;
        }

        let mut monthly_nights: BTreeMap<(&str, AccommodationType), BTreeMap<Month, f64>> =
            BTreeMap::new();
        for record in nights {
            let Some(month) = record.time_period.as_month() else {
                continue;
            };
            let months = monthly_nights
                .entry((record.department_id.as_str(), record.accommodation_type))
                .or_default();
            match months.entry(month) {
                Entry::Occupied(_) => {
                    return Err(AttendanceError::DuplicateNights {
                        department_id: record.department_id.clone(),
                        accommodation_type: record.accommodation_type,
                        time_period: record.time_period,
                    })
                }
                Entry::Vacant(entry) => {
                    entry.insert(record.nights);
                }
            }
        }

        let mut communes: Vec<&CapacityRecord> = capacity.iter().collect();
        communes.sort_by(|a, b| {
            (&a.commune_id, a.accommodation_type).cmp(&(&b.commune_id, b.accommodation_type))
        });

        let mut rows = Vec::new();
        let mut uncovered: BTreeSet<(&str, AccommodationType)> = BTreeSet::new();
        let mut undefined_departments: BTreeSet<(&str, AccommodationType)> = BTreeSet::new();

        for commune in communes {
            let key = (commune.department_id.as_str(), commune.accommodation_type);
            let Some(months) = monthly_nights.get(&key) else {
                uncovered.insert(key);
                continue;
            };
            let department_total = capacity_department.get(&key).copied().unwrap_or(0);
            if department_total == 0 {
                undefined_departments.insert(key);
            }
            for (month, nights_department) in months {
                rows.push(CommuneAttendance {
                    commune_id: commune.commune_id.clone(),
                    department_id: commune.department_id.clone(),
                    accommodation_type: commune.accommodation_type,
                    time_period: *month,
                    capacity_city: commune.capacity,
                    capacity_department: department_total,
                    nights_department: *nights_department,
                    nights_city: self.share(*nights_department, commune.capacity, department_total),
                });
            }
        }

        if !uncovered.is_empty() {
            warn!(
                "No monthly nights for {} department/type pairs, their communes are left out: {:?}",
                uncovered.len(),
                uncovered
            );
        }
        if !undefined_departments.is_empty() {
            warn!(
                "Zero total capacity in {} department/type pairs, commune nights left undefined: {:?}",
                undefined_departments.len(),
                undefined_departments
            );
        }
        info!("Allocated department nights to {} commune rows", rows.len());
        Ok(rows)
    }

    fn share(&self, nights_department: f64, capacity_city: u64, capacity_department: u64) -> Option<f64> {
        if capacity_department == 0 {
            return None;
        }
        Some(
            nights_department * self.nights_unit_multiplier * capacity_city as f64
                / capacity_department as f64,
        )
    }

    /// Sums commune rows per (cluster, accommodation type, month).
    ///
    /// Communes without a cluster are listed in [`ClusterAttendance::unassigned_communes`]
    /// and excluded. Undefined commune estimates are left out of `nights_total` and counted
    /// in `undefined_communes`. Sums are accumulated in commune order, so the result does
    /// not depend on the order of `communes`.
    ///
    /// # Errors
    ///
    /// [`AttendanceError::ConflictingAssignment`] if a commune is assigned to two clusters.
    pub fn aggregate(
        &self,
        communes: &[CommuneAttendance],
        assignments: &[CommuneClusterAssignment],
    ) -> Result<ClusterAttendance, AttendanceError> {
        let mut cluster_of: BTreeMap<&str, u32> = BTreeMap::new();
        for assignment in assignments {
            match cluster_of.entry(assignment.commune_id.as_str()) {
                Entry::Vacant(entry) => {
                    entry.insert(assignment.cluster_id);
                }
                Entry::Occupied(entry) if *entry.get() != assignment.cluster_id => {
                    return Err(AttendanceError::ConflictingAssignment {
                        commune_id: assignment.commune_id.clone(),
                        first: *entry.get(),
                        second: assignment.cluster_id,
                    });
                }
                Entry::Occupied(_) => {}
            }
        }

        let mut ordered: Vec<&CommuneAttendance> = communes.iter().collect();
        ordered.sort_by(|a, b| {
            (&a.commune_id, a.accommodation_type, a.time_period).cmp(&(
                &b.commune_id,
                b.accommodation_type,
                b.time_period,
            ))
        });

        let mut zones: BTreeMap<(u32, AccommodationType, Month), ZoneTotals> = BTreeMap::new();
        let mut unassigned: BTreeSet<&str> = BTreeSet::new();

        for row in ordered {
            let Some(cluster_id) = cluster_of.get(row.commune_id.as_str()) else {
                unassigned.insert(row.commune_id.as_str());
                continue;
            };
            let totals = zones
                .entry((*cluster_id, row.accommodation_type, row.time_period))
                .or_default();
            totals.capacity += row.capacity_city;
            match row.nights_city {
                Some(nights) => {
                    totals.nights += nights;
                    totals.defined += 1;
                }
                None => totals.undefined += 1,
            }
        }

        if !unassigned.is_empty() {
            warn!(
                "{} communes have no cluster and are excluded from the cluster aggregates",
                unassigned.len()
            );
        }

        let records: Vec<AttendanceRecord> = zones
            .into_iter()
            .map(
                |((cluster_id, accommodation_type, time_period), totals)| AttendanceRecord {
                    cluster_id,
                    accommodation_type,
                    time_period,
                    capacity_total: totals.capacity,
                    nights_total: (totals.defined > 0).then_some(totals.nights),
                    undefined_communes: totals.undefined,
                },
            )
            .collect();
        info!("Aggregated attendance into {} cluster rows", records.len());

        Ok(ClusterAttendance {
            records,
            unassigned_communes: unassigned.into_iter().map(str::to_string).collect(),
        })
    }
}
