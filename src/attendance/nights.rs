//! Cleaning of the department-level nights-stayed table (INSEE `DS_TOUR_FREQ`) and the
//! estimation of monthly camping nights.
//!
//! Hotels are published per month and per year, campings only per year. Monthly camping
//! nights are estimated by assuming that campings follow the seasonal curve of the hotels
//! of the same department:
//!
//! ```text
//! camping_nights_month = camping_nights_year * hotel_nights_month / hotel_nights_year
//! ```
//!
//! This is a modelling assumption, not a measurement.

use crate::attendance::error::AttendanceError;
use crate::attendance::trailing_code;
use crate::config::PipelineConfig;
use crate::frames::schema::{self, TableReader};
use crate::types::accommodation::{AccommodationType, ActivityCodes, TemporalRate};
use crate::types::attendance::NightsRecord;
use crate::types::period::{Month, TimePeriod, Year};
use log::{debug, info, warn};
use polars::prelude::DataFrame;
use std::collections::btree_map::Entry;
use std::collections::{BTreeMap, BTreeSet};

/// Relative gap between the sum of hotel months and the hotel annual total above which a
/// warning is logged.
const SEASONAL_TOLERANCE: f64 = 0.01;

#[derive(Debug, Clone)]
pub struct NightsEstimator {
    codes: ActivityCodes,
    target_year: Option<Year>,
}

impl NightsEstimator {
    pub fn new(codes: ActivityCodes, target_year: Option<Year>) -> Self {
        Self { codes, target_year }
    }

    pub fn from_config(config: &PipelineConfig) -> Self {
        Self::new(config.activity_codes.clone(), config.target_year)
    }

    /// Cleans a raw nights table with columns `geography_code`, `activity_code`,
    /// `time_period`, `temporal_rate` and `observation_value`.
    ///
    /// Rows of other accommodation types are excluded. Rows without a usable value
    /// (absent, negative or not finite) are dropped and counted. The result is sorted by
    /// department, accommodation type and period.
    pub fn normalize(&self, frame: &DataFrame) -> Result<Vec<NightsRecord>, AttendanceError> {
        let reader = TableReader::new(frame, schema::NIGHTS)?;
        let geography = reader.strings("geography_code")?;
        let activities = reader.strings("activity_code")?;
        let periods = reader.strings("time_period")?;
        let rates = reader.strings("temporal_rate")?;
        let values = reader.floats("observation_value")?;

        let null_key = |column: &'static str, row: usize| AttendanceError::NullKey {
            table: schema::NIGHTS.name,
            column,
            row,
        };

        let mut records = Vec::with_capacity(reader.height());
        let mut unsupported = 0usize;
        let mut without_value = 0usize;

        for (row, ((((geography_code, activity_code), period), rate), value)) in geography
            .into_iter()
            .zip(activities)
            .zip(periods)
            .zip(rates)
            .zip(values)
            .enumerate()
        {
            let Some(accommodation_type) = activity_code
                .as_deref()
                .and_then(|code| self.codes.classify(code))
            else {
                unsupported += 1;
                continue;
            };
            let department_id = trailing_code(&geography_code.ok_or(null_key("geography_code", row))?)?;
            let rate = rate.ok_or(null_key("temporal_rate", row))?;
            let temporal_rate = TemporalRate::from_code(&rate)
                .ok_or_else(|| AttendanceError::UnknownTemporalRate(rate.clone()))?;
            let time_period: TimePeriod = period.ok_or(null_key("time_period", row))?.parse()?;
            check_rate(time_period, temporal_rate)?;

            let Some(nights) = value.filter(|v| v.is_finite() && *v >= 0.0) else {
                without_value += 1;
                continue;
            };

            records.push(NightsRecord {
                department_id,
                time_period,
                accommodation_type,
                temporal_rate,
                nights,
            });
        }

        records.sort_by(|a, b| {
            (&a.department_id, a.accommodation_type, a.time_period).cmp(&(
                &b.department_id,
                b.accommodation_type,
                b.time_period,
            ))
        });

        if without_value > 0 {
            warn!("Dropped {} nights rows without a usable value", without_value);
        }
        info!(
            "Normalized {} nights rows ({} rows of other accommodation types excluded)",
            records.len(),
            unsupported
        );
        Ok(records)
    }

    /// Builds the monthly nights table: the hotel monthly rows unchanged, followed by the
    /// estimated camping monthly rows, each block sorted by department then month.
    ///
    /// A (department, year) whose hotel annual total is missing or zero, or whose camping
    /// annual total is missing, gets no camping rows. These gaps are logged, not raised.
    ///
    /// # Errors
    ///
    /// * [`AttendanceError::DuplicateNights`] if an input key appears twice.
    /// * [`AttendanceError::PeriodRateMismatch`] if a record's period contradicts its rate.
    pub fn estimate(&self, records: &[NightsRecord]) -> Result<Vec<NightsRecord>, AttendanceError> {
        let mut hotel_months: BTreeMap<(String, Month), f64> = BTreeMap::new();
        let mut hotel_years: BTreeMap<(String, Year), f64> = BTreeMap::new();
        let mut camping_years: BTreeMap<(String, Year), f64> = BTreeMap::new();
        let mut ignored_camping_months = 0usize;

        for record in records {
            if self
                .target_year
                .is_some_and(|year| record.time_period.year() != year)
            {
                continue;
            }
            check_rate(record.time_period, record.temporal_rate)?;
            let department = record.department_id.clone();
            match (record.accommodation_type, record.time_period) {
                (AccommodationType::Hotel, TimePeriod::Month(month)) => {
                    insert_unique(&mut hotel_months, (department, month), record)?
                }
                (AccommodationType::Hotel, TimePeriod::Year(year)) => {
                    insert_unique(&mut hotel_years, (department, year), record)?
                }
                (AccommodationType::Camping, TimePeriod::Year(year)) => {
                    insert_unique(&mut camping_years, (department, year), record)?
                }
                (AccommodationType::Camping, TimePeriod::Month(_)) => {
                    ignored_camping_months += 1;
                }
            }
        }

        if ignored_camping_months > 0 {
            debug!(
                "Ignored {} camping monthly input rows, camping months are always estimated",
                ignored_camping_months
            );
        }
        check_seasonal_totals(&hotel_months, &hotel_years);

        let mut without_hotel_year: BTreeSet<(String, Year)> = BTreeSet::new();
        let mut without_camping_year: BTreeSet<(String, Year)> = BTreeSet::new();
        let mut camping_rows = Vec::new();

        for ((department_id, month), hotel_month) in &hotel_months {
            let key = (department_id.clone(), Year(month.year()));
            let Some(hotel_year) = hotel_years.get(&key).copied().filter(|v| *v > 0.0) else {
                without_hotel_year.insert(key);
                continue;
            };
            let Some(camping_year) = camping_years.get(&key).copied() else {
                without_camping_year.insert(key);
                continue;
            };
            camping_rows.push(NightsRecord {
                department_id: department_id.clone(),
                time_period: TimePeriod::Month(*month),
                accommodation_type: AccommodationType::Camping,
                temporal_rate: TemporalRate::Monthly,
                nights: camping_year * hotel_month / hotel_year,
            });
        }

        if !without_hotel_year.is_empty() {
            warn!(
                "No camping estimate for {} department-years without a positive hotel annual total: {:?}",
                without_hotel_year.len(),
                without_hotel_year
            );
        }
        if !without_camping_year.is_empty() {
            warn!(
                "No camping estimate for {} department-years without a camping annual total: {:?}",
                without_camping_year.len(),
                without_camping_year
            );
        }

        let mut monthly: Vec<NightsRecord> = hotel_months
            .into_iter()
            .map(|((department_id, month), nights)| NightsRecord {
                department_id,
                time_period: TimePeriod::Month(month),
                accommodation_type: AccommodationType::Hotel,
                temporal_rate: TemporalRate::Monthly,
                nights,
            })
            .collect();
        info!(
            "Monthly nights table: {} hotel rows, {} estimated camping rows",
            monthly.len(),
            camping_rows.len()
        );
        monthly.extend(camping_rows);
        Ok(monthly)
    }

    /// [`normalize`](Self::normalize) followed by [`estimate`](Self::estimate).
    pub fn estimate_frame(&self, frame: &DataFrame) -> Result<Vec<NightsRecord>, AttendanceError> {
        let cleaned = self.normalize(frame)?;
        self.estimate(&cleaned)
    }
}

fn check_rate(time_period: TimePeriod, temporal_rate: TemporalRate) -> Result<(), AttendanceError> {
    match (time_period, temporal_rate) {
        (TimePeriod::Year(_), TemporalRate::Annual) | (TimePeriod::Month(_), TemporalRate::Monthly) => {
            Ok(())
        }
        _ => Err(AttendanceError::PeriodRateMismatch {
            time_period,
            temporal_rate,
        }),
    }
}

fn insert_unique<K: Ord>(
    map: &mut BTreeMap<K, f64>,
    key: K,
    record: &NightsRecord,
) -> Result<(), AttendanceError> {
    match map.entry(key) {
        Entry::Occupied(_) => Err(AttendanceError::DuplicateNights {
            department_id: record.department_id.clone(),
            accommodation_type: record.accommodation_type,
            time_period: record.time_period,
        }),
        Entry::Vacant(entry) => {
            entry.insert(record.nights);
            Ok(())
        }
    }
}

/// Logs departments whose hotel months do not add up to the published annual total.
fn check_seasonal_totals(
    hotel_months: &BTreeMap<(String, Month), f64>,
    hotel_years: &BTreeMap<(String, Year), f64>,
) {
    let mut sums: BTreeMap<(&str, Year), f64> = BTreeMap::new();
    for ((department_id, month), nights) in hotel_months {
        *sums
            .entry((department_id.as_str(), Year(month.year())))
            .or_insert(0.0) += nights;
    }
    for ((department_id, year), sum) in sums {
        let Some(annual) = hotel_years.get(&(department_id.to_string(), year)) else {
            continue;
        };
        if *annual > 0.0 && ((sum - annual) / annual).abs() > SEASONAL_TOLERANCE {
            warn!(
                "Hotel months of department {} in {} sum to {}, annual total is {}",
                department_id, year, sum, annual
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use polars::prelude::*;

    fn estimator() -> NightsEstimator {
        NightsEstimator::new(ActivityCodes::default(), None)
    }

    fn record(
        department_id: &str,
        period: &str,
        accommodation_type: AccommodationType,
        nights: f64,
    ) -> NightsRecord {
        let time_period: TimePeriod = period.parse().unwrap();
        let temporal_rate = match time_period {
            TimePeriod::Year(_) => TemporalRate::Annual,
            TimePeriod::Month(_) => TemporalRate::Monthly,
        };
        NightsRecord {
            department_id: department_id.to_string(),
            time_period,
            accommodation_type,
            temporal_rate,
            nights,
        }
    }

    /// A department with a full hotel year (month m has m * 10 nights) and a camping year.
    fn department(department_id: &str, hotel_year: f64, camping_year: f64) -> Vec<NightsRecord> {
        let mut rows: Vec<NightsRecord> = (1..=12)
            .map(|m| {
                record(
                    department_id,
                    &format!("2024-{:02}", m),
                    AccommodationType::Hotel,
                    m as f64 * 10.0,
                )
            })
            .collect();
        rows.push(record(department_id, "2024", AccommodationType::Hotel, hotel_year));
        rows.push(record(department_id, "2024", AccommodationType::Camping, camping_year));
        rows
    }

    #[test]
    fn camping_months_follow_hotel_seasonality() -> Result<(), AttendanceError> {
        let input = department("01", 780.0, 1560.0);
        let monthly = estimator().estimate(&input)?;
        assert_eq!(monthly.len(), 24);

        let hotel_months: BTreeMap<TimePeriod, f64> = monthly
            .iter()
            .filter(|r| r.accommodation_type == AccommodationType::Hotel)
            .map(|r| (r.time_period, r.nights))
            .collect();
        for camping in monthly
            .iter()
            .filter(|r| r.accommodation_type == AccommodationType::Camping)
        {
            assert_eq!(camping.temporal_rate, TemporalRate::Monthly);
            let hotel_month = hotel_months[&camping.time_period];
            let camping_ratio = camping.nights / 1560.0;
            let hotel_ratio = hotel_month / 780.0;
            assert!(
                (camping_ratio - hotel_ratio).abs() < 1e-12,
                "{}: {} vs {}",
                camping.time_period,
                camping_ratio,
                hotel_ratio
            );
        }
        Ok(())
    }

    #[test]
    fn hotel_rows_pass_through_untouched() -> Result<(), AttendanceError> {
        let input = department("01", 780.0, 100.0);
        let monthly = estimator().estimate(&input)?;
        let hotel_sum: f64 = monthly
            .iter()
            .filter(|r| r.accommodation_type == AccommodationType::Hotel)
            .map(|r| r.nights)
            .sum();
        assert!((hotel_sum - 780.0).abs() < 1e-9);
        assert!(monthly[..12]
            .iter()
            .all(|r| r.accommodation_type == AccommodationType::Hotel));
        assert!(monthly[12..]
            .iter()
            .all(|r| r.accommodation_type == AccommodationType::Camping));
        Ok(())
    }

    #[test]
    fn zero_hotel_year_yields_no_camping_rows() -> Result<(), AttendanceError> {
        let mut input: Vec<NightsRecord> = (1..=12)
            .map(|m| record("05", &format!("2024-{:02}", m), AccommodationType::Hotel, 0.0))
            .collect();
        input.push(record("05", "2024", AccommodationType::Hotel, 0.0));
        input.push(record("05", "2024", AccommodationType::Camping, 5000.0));
        input.extend(department("01", 780.0, 1560.0));

        let monthly = estimator().estimate(&input)?;
        assert!(!monthly.iter().any(|r| r.department_id == "05"
            && r.accommodation_type == AccommodationType::Camping));
        assert_eq!(
            monthly
                .iter()
                .filter(|r| r.department_id == "05")
                .count(),
            12
        );
        assert!(monthly
            .iter()
            .all(|r| r.nights.is_finite() && r.nights >= 0.0));
        Ok(())
    }

    #[test]
    fn missing_annual_totals_are_coverage_gaps() -> Result<(), AttendanceError> {
        let mut input = department("01", 780.0, 1560.0);
        input.retain(|r| r.accommodation_type != AccommodationType::Camping);
        input.push(record("02", "2024-07", AccommodationType::Hotel, 40.0));
        input.push(record("02", "2024", AccommodationType::Camping, 400.0));

        let monthly = estimator().estimate(&input)?;
        assert_eq!(monthly.len(), 13);
        assert!(monthly
            .iter()
            .all(|r| r.accommodation_type == AccommodationType::Hotel));
        Ok(())
    }

    #[test]
    fn target_year_restricts_the_estimation() -> Result<(), AttendanceError> {
        let mut input = department("01", 780.0, 1560.0);
        input.push(record("01", "2023-07", AccommodationType::Hotel, 99.0));
        let monthly = NightsEstimator::new(ActivityCodes::default(), Some(Year(2024))).estimate(&input)?;
        assert!(monthly.iter().all(|r| r.time_period.year() == Year(2024)));
        assert_eq!(monthly.len(), 24);
        Ok(())
    }

    #[test]
    fn duplicate_keys_are_rejected() {
        let mut input = department("01", 780.0, 1560.0);
        input.push(record("01", "2024", AccommodationType::Camping, 1.0));
        assert!(matches!(
            estimator().estimate(&input),
            Err(AttendanceError::DuplicateNights { .. })
        ));
    }

    #[test]
    fn normalizes_raw_table() -> Result<(), Box<dyn std::error::Error>> {
        let df = df!(
            "geography_code" => ["2025-DEP-01", "2025-DEP-01", "2025-DEP-01", "2025-DEP-2A", "2025-DEP-01"],
            "activity_code" => ["I551", "I551", "I553", "I551", "I552B"],
            "time_period" => ["2024-01", "2024", "2024", "2024-02", "2024"],
            "temporal_rate" => ["M", "A", "A", "M", "A"],
            "observation_value" => [Some(12.5), Some(150.0), Some(30.0), None, Some(8.0)]
        )?;
        let records = estimator().normalize(&df)?;
        assert_eq!(records.len(), 3);
        assert_eq!(records[0].department_id, "01");
        assert_eq!(records[0].time_period, TimePeriod::Year(Year(2024)));
        assert_eq!(records[0].temporal_rate, TemporalRate::Annual);
        assert_eq!(records[1].time_period, TimePeriod::Month(Month(2024, 1)));
        assert_eq!(records[2].accommodation_type, AccommodationType::Camping);

        let monthly = estimator().estimate_frame(&df)?;
        assert_eq!(monthly.len(), 2);
        assert_eq!(monthly[1].nights, 30.0 * 12.5 / 150.0);
        Ok(())
    }

    #[test]
    fn inconsistent_rate_is_an_error() -> Result<(), Box<dyn std::error::Error>> {
        let df = df!(
            "geography_code" => ["2025-DEP-01"],
            "activity_code" => ["I551"],
            "time_period" => ["2024"],
            "temporal_rate" => ["M"],
            "observation_value" => [1.0]
        )?;
        assert!(matches!(
            estimator().normalize(&df),
            Err(AttendanceError::PeriodRateMismatch { .. })
        ));
        Ok(())
    }
}
