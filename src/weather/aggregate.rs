//! Monthly aggregation of synoptic (SYNOP) observations per station.

use crate::frames::schema::{self, TableReader};
use crate::types::station::WeatherStationRecord;
use crate::weather::error::WeatherError;
use chrono::{DateTime, Datelike, NaiveDate, NaiveDateTime, Utc};
use log::{info, warn};
use ordered_float::OrderedFloat;
use polars::prelude::DataFrame;
use std::collections::BTreeMap;

type StationMonthKey = (String, OrderedFloat<f64>, OrderedFloat<f64>, u32);

#[derive(Default)]
struct MonthTotals {
    pressure: f64,
    temperature: f64,
    precipitation: f64,
    gust: f64,
    count: u32,
}

/// Aggregates observations into one row per (station, location, calendar month).
///
/// Input columns: `station_commune_id`, `latitude`, `longitude`, `observed_at`,
/// `pressure`, `temperature`, `precipitation_24h` and `gust`. Observations missing any of
/// these values are dropped. The month is taken from the timestamp converted to UTC.
/// Pressure, temperature and gust are averaged, precipitation is summed. Years are pooled.
///
/// The result is sorted by station, location and month.
///
/// # Errors
///
/// * [`WeatherError::Frame`] if a column is missing or unreadable.
/// * [`WeatherError::InvalidTimestamp`] if a timestamp cannot be parsed.
pub fn aggregate_observations(
    observations: &DataFrame,
) -> Result<Vec<WeatherStationRecord>, WeatherError> {
    let reader = TableReader::new(observations, schema::OBSERVATIONS)?;
    let stations = reader.strings("station_commune_id")?;
    let latitudes = reader.floats("latitude")?;
    let longitudes = reader.floats("longitude")?;
    let timestamps = reader.strings("observed_at")?;
    let pressures = reader.floats("pressure")?;
    let temperatures = reader.floats("temperature")?;
    let precipitations = reader.floats("precipitation_24h")?;
    let gusts = reader.floats("gust")?;

    let mut months: BTreeMap<StationMonthKey, MonthTotals> = BTreeMap::new();
    let mut incomplete = 0usize;

    for row in 0..reader.height() {
        let (
            Some(station),
            Some(latitude),
            Some(longitude),
            Some(observed_at),
            Some(pressure),
            Some(temperature),
            Some(precipitation),
            Some(gust),
        ) = (
            &stations[row],
            latitudes[row],
            longitudes[row],
            &timestamps[row],
            pressures[row],
            temperatures[row],
            precipitations[row],
            gusts[row],
        )
        else {
            incomplete += 1;
            continue;
        };

        let month = observation_month(observed_at).ok_or_else(|| WeatherError::InvalidTimestamp {
            row,
            value: observed_at.clone(),
        })?;

        let totals = months
            .entry((
                station.clone(),
                OrderedFloat(latitude),
                OrderedFloat(longitude),
                month,
            ))
            .or_default();
        totals.pressure += pressure;
        totals.temperature += temperature;
        totals.precipitation += precipitation;
        totals.gust += gust;
        totals.count += 1;
    }

    if incomplete > 0 {
        warn!("Dropped {} incomplete weather observations", incomplete);
    }

    let records: Vec<WeatherStationRecord> = months
        .into_iter()
        .map(|((station, latitude, longitude, month), totals)| {
            let n = totals.count as f64;
            WeatherStationRecord {
                station_commune_id: station,
                latitude: latitude.into_inner(),
                longitude: longitude.into_inner(),
                month,
                mean_pressure: Some(totals.pressure / n),
                mean_temperature: Some(totals.temperature / n),
                total_precipitation: Some(totals.precipitation),
                mean_gust: Some(totals.gust / n),
            }
        })
        .collect();
    info!("Aggregated weather observations into {} station-months", records.len());
    Ok(records)
}

/// Calendar month (1-12) of a timestamp, in UTC.
///
/// Accepts RFC 3339 timestamps with an offset, naive date-times (read as UTC) and plain dates.
fn observation_month(value: &str) -> Option<u32> {
    let value = value.trim();
    if let Ok(datetime) = DateTime::parse_from_rfc3339(value) {
        return Some(datetime.with_timezone(&Utc).month());
    }
    let naive = value.trim_end_matches(" UTC");
    for format in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"] {
        if let Ok(datetime) = NaiveDateTime::parse_from_str(naive, format) {
            return Some(datetime.month());
        }
    }
    NaiveDate::parse_from_str(naive, "%Y-%m-%d")
        .ok()
        .map(|date| date.month())
}
