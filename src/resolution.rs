//! Sampling resolutions of time series.
//!
//! A resolution is either a fixed number of minutes or a calendar period (month or year), whose
//! length varies.
use anyhow::{Context, Result, bail, ensure};
use chrono::{Datelike, Months, NaiveDate, NaiveDateTime, TimeDelta, Timelike};
use serde::de::{Deserialize, Deserializer};
use std::fmt;
use std::str::FromStr;

const MINUTES_PER_HOUR: u32 = 60;
const MINUTES_PER_DAY: u32 = 24 * MINUTES_PER_HOUR;
const MINUTES_PER_WEEK: u32 = 7 * MINUTES_PER_DAY;

/// The sampling resolution of a time series
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Resolution {
    /// A fixed duration in minutes
    Fixed(u32),
    /// Calendar months
    Month,
    /// Calendar years
    Year,
}

/// How one resolution relates to another
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scaling {
    /// The resolutions are equal
    Same,
    /// The target is finer than the source
    Down,
    /// The target is coarser than the source
    Up,
}

impl Resolution {
    /// One hour
    pub const HOURLY: Resolution = Resolution::Fixed(MINUTES_PER_HOUR);

    /// Whether periods have a variable length
    pub fn is_calendar(self) -> bool {
        matches!(self, Self::Month | Self::Year)
    }

    /// Check that periods counted from 1 January start again exactly at the next 1 January
    pub fn check_divides_year(self) -> Result<(), String> {
        match self {
            Self::Fixed(minutes) => fixed_divides_day(minutes),
            Self::Month | Self::Year => Ok(()),
        }
    }

    /// How converting from `self` to `target` scales the data.
    ///
    /// Returns an error message if neither resolution is an integer multiple of the other.
    pub fn scaling_to(self, target: Resolution) -> Result<Scaling, String> {
        if self == target {
            return Ok(Scaling::Same);
        }

        match (self, target) {
            (Self::Fixed(from), Self::Fixed(to)) if from % to == 0 => Ok(Scaling::Down),
            (Self::Fixed(from), Self::Fixed(to)) if to % from == 0 => Ok(Scaling::Up),
            (Self::Fixed(_), Self::Fixed(_)) => {
                Err("neither resolution is an integer multiple of the other".into())
            }
            (Self::Year, Self::Month) => Ok(Scaling::Down),
            (Self::Month, Self::Year) => Ok(Scaling::Up),
            (_, Self::Fixed(to)) => fixed_divides_day(to).map(|()| Scaling::Down),
            (Self::Fixed(from), _) => fixed_divides_day(from).map(|()| Scaling::Up),
            _ => unreachable!("calendar resolutions are handled above"),
        }
    }

    /// The start of the period following the one starting at `time`
    pub fn advance(self, time: NaiveDateTime) -> NaiveDateTime {
        let next = match self {
            Self::Fixed(minutes) => time.checked_add_signed(TimeDelta::minutes(minutes.into())),
            Self::Month => time.checked_add_months(Months::new(1)),
            Self::Year => time.checked_add_months(Months::new(12)),
        };

        next.unwrap_or(NaiveDateTime::MAX)
    }

    /// Whether `time` is the start of a calendar period.
    ///
    /// Any time is a period start for fixed resolutions.
    pub fn is_period_start(self, time: NaiveDateTime) -> bool {
        let midnight = time.hour() == 0 && time.minute() == 0 && time.second() == 0;
        match self {
            Self::Fixed(_) => true,
            Self::Month => midnight && time.day() == 1,
            Self::Year => midnight && time.day() == 1 && time.month() == 1,
        }
    }

    /// The start of the calendar period containing `time`.
    ///
    /// For fixed resolutions `time` is returned unchanged.
    pub fn period_start(self, time: NaiveDateTime) -> NaiveDateTime {
        let date = match self {
            Self::Fixed(_) => return time,
            Self::Month => NaiveDate::from_ymd_opt(time.year(), time.month(), 1),
            Self::Year => NaiveDate::from_ymd_opt(time.year(), 1, 1),
        };

        date.and_then(|date| date.and_hms_opt(0, 0, 0))
            .unwrap_or(time)
    }
}

/// Check that a fixed resolution divides a day, so that it also divides calendar periods
fn fixed_divides_day(minutes: u32) -> Result<(), String> {
    if MINUTES_PER_DAY % minutes == 0 {
        Ok(())
    } else {
        Err(format!(
            "calendar periods can only be combined with resolutions dividing a day, not {}",
            Resolution::Fixed(minutes)
        ))
    }
}

impl FromStr for Resolution {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        let s = s.trim();
        match s {
            "month" => return Ok(Self::Month),
            "year" => return Ok(Self::Year),
            _ => {}
        }

        let split = s.find(|c: char| !c.is_ascii_digit()).unwrap_or(s.len());
        let (count, unit) = s.split_at(split);
        let count = if count.is_empty() {
            1
        } else {
            count
                .parse::<u32>()
                .with_context(|| format!("Invalid resolution: {s}"))?
        };
        ensure!(count > 0, "Resolution must be positive: {s}");

        let minutes_per_unit = match unit {
            "min" => 1,
            "h" => MINUTES_PER_HOUR,
            "d" => MINUTES_PER_DAY,
            "w" => MINUTES_PER_WEEK,
            _ => bail!(
                "Invalid resolution: {s}. Expected e.g. 15min, 1h, 1d, 1w, month or year"
            ),
        };
        let minutes = count
            .checked_mul(minutes_per_unit)
            .with_context(|| format!("Resolution too large: {s}"))?;

        Ok(Self::Fixed(minutes))
    }
}

impl fmt::Display for Resolution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            Self::Fixed(minutes) if minutes % MINUTES_PER_WEEK == 0 => {
                write!(f, "{}w", minutes / MINUTES_PER_WEEK)
            }
            Self::Fixed(minutes) if minutes % MINUTES_PER_DAY == 0 => {
                write!(f, "{}d", minutes / MINUTES_PER_DAY)
            }
            Self::Fixed(minutes) if minutes % MINUTES_PER_HOUR == 0 => {
                write!(f, "{}h", minutes / MINUTES_PER_HOUR)
            }
            Self::Fixed(minutes) => write!(f, "{minutes}min"),
            Self::Month => write!(f, "month"),
            Self::Year => write!(f, "year"),
        }
    }
}

impl<'de> Deserialize<'de> for Resolution {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let value = String::deserialize(deserializer)?;
        Resolution::from_str(&value).map_err(serde::de::Error::custom)
    }
}
