//! Regularly sampled time series.
use crate::error::{Anomaly, PrepError, Stage};
use crate::id::define_id_type;
use crate::resolution::Resolution;
use chrono::NaiveDateTime;
use itertools::Itertools;

define_id_type! {SeriesID}

/// Format of timestamps in input and output files
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M";

/// Serde helpers for timestamps in [`TIMESTAMP_FORMAT`]
pub mod timestamp_format {
    use super::TIMESTAMP_FORMAT;
    use chrono::NaiveDateTime;
    use serde::{Deserialize, Deserializer, Serializer};

    /// Serialise a timestamp
    pub fn serialize<S>(time: &NaiveDateTime, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.collect_str(&time.format(TIMESTAMP_FORMAT))
    }

    /// Deserialise a timestamp
    pub fn deserialize<'de, D>(deserializer: D) -> Result<NaiveDateTime, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        NaiveDateTime::parse_from_str(&s, TIMESTAMP_FORMAT).map_err(serde::de::Error::custom)
    }
}

/// A time series as read from the input files, possibly with missing values
#[derive(Debug, Clone, PartialEq)]
pub struct RawSeries {
    /// Identifier of the series
    pub id: SeriesID,
    /// Spacing of the timestamps
    pub resolution: Resolution,
    /// Whether values are extensive (energy-like) rather than intensive (power-like)
    pub conservative: bool,
    /// Resolution to convert to, if different from the scenario default
    pub target_resolution: Option<Resolution>,
    /// Timestamps in ascending order with their values, if known
    pub observations: Vec<(NaiveDateTime, Option<f64>)>,
}

impl RawSeries {
    /// Fill gaps in the observations to obtain a complete [`TimeSeries`]
    pub fn complete(&self) -> Result<(TimeSeries, Option<Anomaly>), PrepError> {
        TimeSeries::from_observations(
            self.id.clone(),
            self.resolution,
            self.conservative,
            &self.observations,
        )
    }
}

/// A gap-free series of values on a regular grid
#[derive(Debug, Clone, PartialEq)]
pub struct TimeSeries {
    /// Identifier of the series
    pub id: SeriesID,
    /// Spacing of the timestamps
    pub resolution: Resolution,
    /// Whether values are extensive (energy-like) rather than intensive (power-like)
    pub conservative: bool,
    points: Vec<(NaiveDateTime, f64)>,
}

impl TimeSeries {
    /// Create a time series from complete data.
    ///
    /// Timestamps must be strictly increasing and consecutive at the given resolution.
    pub fn new(
        id: SeriesID,
        resolution: Resolution,
        conservative: bool,
        points: Vec<(NaiveDateTime, f64)>,
    ) -> Result<Self, PrepError> {
        let series = Self {
            id,
            resolution,
            conservative,
            points,
        };
        series.check_points()?;

        Ok(series)
    }

    /// Create a time series from observations which may have gaps.
    ///
    /// Missing values and missing grid timestamps between the first and last observation are
    /// filled by linear interpolation between the nearest known values (the nearest known value is
    /// used at the edges). If anything was filled, an [`Anomaly`] describing it is also returned.
    pub fn from_observations(
        id: SeriesID,
        resolution: Resolution,
        conservative: bool,
        observations: &[(NaiveDateTime, Option<f64>)],
    ) -> Result<(Self, Option<Anomaly>), PrepError> {
        let err = |message: String| PrepError::Series {
            series_id: id.to_string(),
            message,
        };

        let Some(&(first, _)) = observations.first() else {
            return Err(err("series has no observations".into()));
        };
        check_order(observations.iter().map(|(time, _)| *time)).map_err(err)?;

        // Lay the observations out on the full grid
        let mut grid: Vec<(NaiveDateTime, Option<f64>)> = Vec::new();
        let mut time = first;
        for &(obs_time, value) in observations {
            while time < obs_time {
                grid.push((time, None));
                time = resolution.advance(time);
            }
            if time != obs_time {
                return Err(err(format!(
                    "timestamp {} is not on the {resolution} grid",
                    obs_time.format(TIMESTAMP_FORMAT)
                )));
            }
            grid.push((time, value));
            time = resolution.advance(time);
        }
        let values = grid.iter().map(|(_, value)| *value).collect_vec();
        let (filled, count) = fill_gaps(&values).ok_or_else(|| err("series has no values".into()))?;
        let points = grid.into_iter().map(|(time, _)| time).zip(filled).collect();
        let series = Self::new(id, resolution, conservative, points)?;
        let anomaly = (count > 0).then(|| {
            Anomaly::new(
                Stage::Resample,
                series.id.to_string(),
                format!("{count} missing value(s) filled by interpolation"),
            )
        });

        Ok((series, anomaly))
    }

    fn check_points(&self) -> Result<(), PrepError> {
        let err = |message: String| PrepError::Series {
            series_id: self.id.to_string(),
            message,
        };

        if self.points.is_empty() {
            return Err(err("series has no values".into()));
        }
        check_order(self.timestamps()).map_err(err)?;
        if let Some((time, _)) = self.points.iter().find(|(_, value)| !value.is_finite()) {
            return Err(err(format!(
                "value at {} is not finite",
                time.format(TIMESTAMP_FORMAT)
            )));
        }
        for ((time, _), (next, _)) in self.points.iter().tuple_windows() {
            if self.resolution.advance(*time) != *next {
                return Err(err(format!(
                    "gap between {} and {}",
                    time.format(TIMESTAMP_FORMAT),
                    next.format(TIMESTAMP_FORMAT)
                )));
            }
        }
        let first = self.points[0].0;
        if !self.resolution.is_period_start(first) {
            return Err(err(format!(
                "timestamp {} is not the start of a {} period",
                first.format(TIMESTAMP_FORMAT),
                self.resolution
            )));
        }

        Ok(())
    }

    /// The `(timestamp, value)` pairs
    pub fn points(&self) -> &[(NaiveDateTime, f64)] {
        &self.points
    }

    /// The timestamps
    pub fn timestamps(&self) -> impl Iterator<Item = NaiveDateTime> + '_ {
        self.points.iter().map(|(time, _)| *time)
    }

    /// The sum of all values
    pub fn total(&self) -> f64 {
        self.points.iter().map(|(_, value)| value).sum()
    }

    /// The end of the last period covered by the series
    pub fn end(&self) -> NaiveDateTime {
        let (last, _) = self.points[self.points.len() - 1];
        self.resolution.advance(last)
    }
}

/// Check that timestamps are strictly increasing
fn check_order(times: impl Iterator<Item = NaiveDateTime>) -> Result<(), String> {
    for (time, next) in times.tuple_windows() {
        if next == time {
            return Err(format!(
                "duplicate timestamp {}",
                time.format(TIMESTAMP_FORMAT)
            ));
        }
        if next < time {
            return Err(format!(
                "timestamps are not in ascending order ({} follows {})",
                next.format(TIMESTAMP_FORMAT),
                time.format(TIMESTAMP_FORMAT)
            ));
        }
    }

    Ok(())
}

/// Fill missing values by linear interpolation between the nearest known values.
///
/// Leading and trailing gaps take the nearest known value. Returns the filled values and the
/// number filled, or `None` if no value is known.
fn fill_gaps(values: &[Option<f64>]) -> Option<(Vec<f64>, usize)> {
    let known = values
        .iter()
        .enumerate()
        .filter_map(|(idx, value)| value.map(|value| (idx, value)))
        .collect_vec();
    let &(first_idx, first_value) = known.first()?;
    let &(last_idx, last_value) = known.last()?;

    let mut filled = Vec::with_capacity(values.len());
    let mut count = 0;
    for (idx, value) in values.iter().enumerate() {
        if let Some(value) = value {
            filled.push(*value);
            continue;
        }

        count += 1;
        let value = if idx < first_idx {
            first_value
        } else if idx > last_idx {
            last_value
        } else {
            // Neighbouring known values
            let next = known.partition_point(|(known_idx, _)| *known_idx < idx);
            let (idx0, v0) = known[next - 1];
            let (idx1, v1) = known[next];
            let t = (idx - idx0) as f64 / (idx1 - idx0) as f64;
            v0 + t * (v1 - v0)
        };
        filled.push(value);
    }

    Some((filled, count))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixture::time;
    use float_cmp::assert_approx_eq;
    use rstest::rstest;

    #[test]
    fn test_fill_gaps() {
        let (filled, count) =
            fill_gaps(&[None, Some(1.0), None, None, Some(4.0), None]).unwrap();
        assert_eq!(count, 4);
        assert_eq!(filled.len(), 6);
        for (actual, expected) in filled.iter().zip([1.0, 1.0, 2.0, 3.0, 4.0, 4.0]) {
            assert_approx_eq!(f64, *actual, expected);
        }

        assert!(fill_gaps(&[None, None]).is_none());
        assert_eq!(fill_gaps(&[Some(2.0)]), Some((vec![2.0], 0)));
    }

    #[test]
    fn test_from_observations_fills_gaps() {
        let observations = [
            (time("2020-01-01 00:00"), Some(1.0)),
            (time("2020-01-01 01:00"), None),
            // 02:00 missing entirely
            (time("2020-01-01 03:00"), Some(4.0)),
        ];
        let (series, anomaly) =
            TimeSeries::from_observations("s".into(), Resolution::HOURLY, true, &observations)
                .unwrap();
        assert_eq!(series.points().len(), 4);
        assert_approx_eq!(f64, series.points()[2].1, 3.0);
        assert_approx_eq!(f64, series.total(), 10.0);
        assert_eq!(series.end(), time("2020-01-01 04:00"));
        assert_eq!(
            anomaly.unwrap().to_string(),
            "[resample] s: 2 missing value(s) filled by interpolation"
        );
    }

    #[test]
    fn test_from_observations_complete() {
        let observations = [
            (time("2020-01-01 00:00"), Some(1.0)),
            (time("2020-02-01 00:00"), Some(2.0)),
        ];
        let (series, anomaly) =
            TimeSeries::from_observations("s".into(), Resolution::Month, true, &observations)
                .unwrap();
        assert_eq!(series.points().len(), 2);
        assert!(anomaly.is_none());
    }

    #[rstest]
    #[case(&[], "series has no observations")]
    #[case(&[("2020-01-01 00:00", Some(1.0)), ("2020-01-01 00:00", Some(1.0))], "duplicate timestamp 2020-01-01 00:00")]
    #[case(&[("2020-01-01 01:00", Some(1.0)), ("2020-01-01 00:00", Some(1.0))], "timestamps are not in ascending order (2020-01-01 00:00 follows 2020-01-01 01:00)")]
    #[case(&[("2020-01-01 00:00", Some(1.0)), ("2020-01-01 00:30", Some(1.0))], "timestamp 2020-01-01 00:30 is not on the 1h grid")]
    #[case(&[("2020-01-01 00:00", None)], "series has no values")]
    fn test_from_observations_invalid(
        #[case] observations: &[(&str, Option<f64>)],
        #[case] msg: &str,
    ) {
        let observations = observations
            .iter()
            .map(|(t, value)| (time(t), *value))
            .collect_vec();
        assert_eq!(
            TimeSeries::from_observations("s".into(), Resolution::HOURLY, true, &observations)
                .unwrap_err(),
            PrepError::Series {
                series_id: "s".into(),
                message: msg.into()
            }
        );
    }

    #[test]
    fn test_new_invalid() {
        let result = TimeSeries::new(
            "s".into(),
            Resolution::HOURLY,
            true,
            vec![(time("2020-01-01 00:00"), 1.0), (time("2020-01-01 02:00"), 1.0)],
        );
        assert_eq!(
            result.unwrap_err().to_string(),
            "Invalid time series s: gap between 2020-01-01 00:00 and 2020-01-01 02:00"
        );

        let result = TimeSeries::new(
            "s".into(),
            Resolution::Month,
            true,
            vec![(time("2020-01-15 00:00"), 1.0)],
        );
        assert!(result.is_err());
    }
}
