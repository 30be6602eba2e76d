//! The resampler, which converts time series between resolutions.
//!
//! For conservative (energy-like) series the total over any input period is preserved: coarse
//! values are split evenly over the finer sub-periods and fine values are summed into the coarser
//! periods. Non-conservative (power-like) series repeat values when downscaling and take the
//! duration-weighted mean when upscaling, which preserves the time integral instead.
use crate::error::PrepError;
use crate::resolution::{Resolution, Scaling};
use crate::time_series::TimeSeries;
use chrono::{NaiveDateTime, TimeDelta};
use itertools::Itertools;

/// Resample a series to the target resolution.
///
/// Fails with [`PrepError::Resolution`] if neither resolution is an integer multiple of the other.
pub fn resample(series: &TimeSeries, target: Resolution) -> Result<TimeSeries, PrepError> {
    let scaling = series
        .resolution
        .scaling_to(target)
        .map_err(|message| PrepError::Resolution {
            series_id: series.id.to_string(),
            from: series.resolution.to_string(),
            to: target.to_string(),
            message,
        })?;

    let points = match scaling {
        Scaling::Same => return Ok(series.clone()),
        Scaling::Down => downscale(series, target),
        Scaling::Up => upscale(series, target),
    };

    TimeSeries::new(series.id.clone(), target, series.conservative, points)
}

/// Split each value over the finer sub-periods of its period
fn downscale(series: &TimeSeries, target: Resolution) -> Vec<(NaiveDateTime, f64)> {
    let mut points = Vec::new();
    for &(start, value) in series.points() {
        let end = series.resolution.advance(start);
        let mut sub_periods = Vec::new();
        let mut time = start;
        while time < end {
            sub_periods.push(time);
            time = target.advance(time);
        }

        let sub_value = if series.conservative {
            value / sub_periods.len() as f64
        } else {
            value
        };
        points.extend(sub_periods.into_iter().map(|time| (time, sub_value)));
    }

    points
}

/// Aggregate values into the coarser periods containing them.
///
/// Fixed-duration output periods are anchored at the first timestamp of the series; calendar
/// periods start at the beginning of a month or year.
fn upscale(series: &TimeSeries, target: Resolution) -> Vec<(NaiveDateTime, f64)> {
    let Some(&(origin, _)) = series.points().first() else {
        return Vec::new();
    };
    let period_of = |time: NaiveDateTime| match target {
        Resolution::Fixed(minutes) => {
            let minutes = i64::from(minutes);
            let index = (time - origin).num_minutes().div_euclid(minutes);
            origin + TimeDelta::minutes(index * minutes)
        }
        Resolution::Month | Resolution::Year => target.period_start(time),
    };

    series
        .points()
        .iter()
        .chunk_by(|(time, _)| period_of(*time))
        .into_iter()
        .map(|(period, group)| {
            let value = if series.conservative {
                group.map(|(_, value)| value).sum()
            } else {
                let (weighted_sum, total_duration) =
                    group.fold((0.0, 0.0), |(sum, duration), (time, value)| {
                        let weight = duration_minutes(series.resolution, *time);
                        (sum + value * weight, duration + weight)
                    });
                weighted_sum / total_duration
            };
            (period, value)
        })
        .collect()
}

/// Length of the period starting at `time`, in minutes
fn duration_minutes(resolution: Resolution, time: NaiveDateTime) -> f64 {
    (resolution.advance(time) - time).num_minutes() as f64
}
