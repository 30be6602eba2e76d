//! Code for reading time series.
use super::*;
use crate::resolution::Resolution;
use crate::time_series::{RawSeries, SeriesID, timestamp_format};
use anyhow::{Context, Result, ensure};
use chrono::NaiveDateTime;
use indexmap::IndexMap;
use serde::Deserialize;
use std::path::Path;

const SERIES_FILE_NAME: &str = "series.csv";
const TIMESERIES_FILE_NAME: &str = "timeseries.csv";

#[derive(Debug, Deserialize, PartialEq)]
struct SeriesRaw {
    series_id: String,
    resolution: Resolution,
    conservative: bool,
    target_resolution: Option<Resolution>,
}

#[derive(Debug, Deserialize, PartialEq)]
struct ValueRaw {
    series_id: String,
    #[serde(with = "timestamp_format")]
    timestamp: NaiveDateTime,
    value: Option<f64>,
}

/// Read time series metadata and values, if given.
///
/// Values may be given in any order; they are sorted by timestamp for each series.
///
/// # Arguments
///
/// * `scenario_dir` - Folder containing scenario files
pub fn read_series(scenario_dir: &Path) -> Result<Vec<RawSeries>> {
    let file_path = scenario_dir.join(SERIES_FILE_NAME);
    let series_csv = read_csv_optional(&file_path)?;
    let mut series = read_series_metadata_from_iter(series_csv)
        .with_context(|| input_err_msg(&file_path))?;

    let file_path = scenario_dir.join(TIMESERIES_FILE_NAME);
    let values_csv = read_csv_optional(&file_path)?;
    read_series_values_from_iter(values_csv, &mut series)
        .with_context(|| input_err_msg(&file_path))?;

    Ok(series.into_values().collect())
}

fn read_series_metadata_from_iter<I>(iter: I) -> Result<IndexMap<SeriesID, RawSeries>>
where
    I: Iterator<Item = SeriesRaw>,
{
    let mut map = IndexMap::new();
    for row in iter {
        let id = SeriesID::from(row.series_id);
        let series = RawSeries {
            id: id.clone(),
            resolution: row.resolution,
            conservative: row.conservative,
            target_resolution: row.target_resolution,
            observations: Vec::new(),
        };
        ensure!(
            map.insert(id.clone(), series).is_none(),
            "Duplicate series ID: {id}"
        );
    }

    Ok(map)
}

fn read_series_values_from_iter<I>(iter: I, series: &mut IndexMap<SeriesID, RawSeries>) -> Result<()>
where
    I: Iterator<Item = ValueRaw>,
{
    for row in iter {
        let entry = series
            .get_mut(row.series_id.as_str())
            .with_context(|| format!("Unknown series ID: {}", row.series_id))?;
        entry.observations.push((row.timestamp, row.value));
    }

    for entry in series.values_mut() {
        ensure!(
            !entry.observations.is_empty(),
            "No values given for series {}",
            entry.id
        );
        entry.observations.sort_by_key(|(time, _)| *time);
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixture::{assert_error, time};
    use std::fs::File;
    use std::io::Write;
    use tempfile::tempdir;

    fn metadata(series_id: &str) -> SeriesRaw {
        SeriesRaw {
            series_id: series_id.into(),
            resolution: Resolution::HOURLY,
            conservative: true,
            target_resolution: None,
        }
    }

    fn value(series_id: &str, timestamp: &str, value: Option<f64>) -> ValueRaw {
        ValueRaw {
            series_id: series_id.into(),
            timestamp: time(timestamp),
            value,
        }
    }

    #[test]
    fn test_read_series() {
        let dir = tempdir().unwrap();
        {
            let mut file = File::create(dir.path().join(SERIES_FILE_NAME)).unwrap();
            writeln!(
                file,
                "series_id,resolution,conservative,target_resolution\n\
                 inflow,1h,true,1d\n\
                 load,15min,false,"
            )
            .unwrap();
            let mut file = File::create(dir.path().join(TIMESERIES_FILE_NAME)).unwrap();
            writeln!(
                file,
                "series_id,timestamp,value\n\
                 inflow,2020-01-01 01:00,2\n\
                 inflow,2020-01-01 00:00,1\n\
                 load,2020-01-01 00:00,"
            )
            .unwrap();
        }

        let series = read_series(dir.path()).unwrap();
        assert_eq!(series.len(), 2);
        assert_eq!(series[0].id, "inflow".into());
        assert_eq!(series[0].target_resolution, Some(Resolution::Fixed(1440)));
        assert_eq!(
            series[0].observations,
            [
                (time("2020-01-01 00:00"), Some(1.0)),
                (time("2020-01-01 01:00"), Some(2.0))
            ]
        );
        assert_eq!(series[1].resolution, Resolution::Fixed(15));
        assert!(!series[1].conservative);
        assert_eq!(series[1].target_resolution, None);
        assert_eq!(series[1].observations, [(time("2020-01-01 00:00"), None)]);
    }

    #[test]
    fn test_read_series_missing_files() {
        let dir = tempdir().unwrap();
        assert!(read_series(dir.path()).unwrap().is_empty());
    }

    #[test]
    fn test_read_series_metadata_from_iter_duplicate() {
        assert_error!(
            read_series_metadata_from_iter([metadata("a"), metadata("a")].into_iter()),
            "Duplicate series ID: a"
        );
    }

    #[test]
    fn test_read_series_values_from_iter_invalid() {
        let mut series = read_series_metadata_from_iter([metadata("a")].into_iter()).unwrap();
        assert_error!(
            read_series_values_from_iter(
                [value("b", "2020-01-01 00:00", Some(1.0))].into_iter(),
                &mut series
            ),
            "Unknown series ID: b"
        );

        let mut series = read_series_metadata_from_iter([metadata("a")].into_iter()).unwrap();
        assert_error!(
            read_series_values_from_iter(std::iter::empty(), &mut series),
            "No values given for series a"
        );
    }
}
