//! The interconnector capacity assigner.
//!
//! Sparse yearly observations of net transfer capacity (NTC) are turned into a dense,
//! piecewise-constant series for each direction of each link.
use crate::error::PrepError;
use crate::id::define_id_type;
use crate::resolution::Resolution;
use crate::time_series::timestamp_format;
use crate::unit::RegionID;
use crate::units::Capacity;
use chrono::{NaiveDate, NaiveDateTime};
use indexmap::IndexMap;
use log::debug;
use serde::Serialize;
use serde_string_enum::{DeserializeLabeledStringEnum, SerializeLabeledStringEnum};

define_id_type! {LinkID}

/// The direction of flow over a link
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    SerializeLabeledStringEnum,
    DeserializeLabeledStringEnum,
)]
pub enum Direction {
    /// From `from_region` to `to_region`
    #[string = "forward"]
    Forward,
    /// From `to_region` to `from_region`
    #[string = "backward"]
    Backward,
}

/// An interconnector between two regions
#[derive(Debug, Clone, PartialEq)]
pub struct Link {
    /// Identifier of the link
    pub id: LinkID,
    /// Region at the start of the forward direction
    pub from_region: RegionID,
    /// Region at the end of the forward direction
    pub to_region: RegionID,
    /// Whether the forward capacities also apply to the backward direction
    pub symmetric: bool,
}

impl Link {
    /// The exporting and importing regions for a direction
    pub fn regions(&self, direction: Direction) -> (&RegionID, &RegionID) {
        match direction {
            Direction::Forward => (&self.from_region, &self.to_region),
            Direction::Backward => (&self.to_region, &self.from_region),
        }
    }

    /// The direction whose observations are used for `direction`
    fn source_direction(&self, direction: Direction) -> Direction {
        if self.symmetric {
            Direction::Forward
        } else {
            direction
        }
    }
}

/// Links by ID
pub type LinkMap = IndexMap<LinkID, Link>;

/// A known transfer capacity, effective from the start of a year
#[derive(Debug, Clone, PartialEq)]
pub struct NtcObservation {
    /// The link observed
    pub link_id: LinkID,
    /// The direction observed
    pub direction: Direction,
    /// The year from which the capacity applies
    pub year: u32,
    /// Transfer capacity
    pub capacity: Capacity,
}

/// The transfer capacity of one direction of a link at one time
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NtcEntry {
    /// The link
    pub link_id: LinkID,
    /// Exporting region
    pub from_region: RegionID,
    /// Importing region
    pub to_region: RegionID,
    /// Direction of flow
    pub direction: Direction,
    /// Start of the period
    #[serde(with = "timestamp_format")]
    pub timestamp: NaiveDateTime,
    /// Transfer capacity
    pub capacity_mw: Capacity,
}

/// The time range and resolution of the output
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NtcRange {
    /// First year (from 1 January)
    pub start_year: u32,
    /// Last year (until 31 December)
    pub end_year: u32,
    /// Spacing of the output timestamps
    pub resolution: Resolution,
}

/// The outcome of assigning capacities to all links
#[derive(Debug, Clone, PartialEq, Default)]
pub struct NtcOutput {
    /// Entries of links with sufficient data, by link, direction and time
    pub entries: Vec<NtcEntry>,
    /// One error per link without sufficient data
    pub errors: Vec<PrepError>,
}

/// Start of 1 January of the given year
fn year_start(year: u32) -> NaiveDateTime {
    i32::try_from(year)
        .ok()
        .and_then(|year| NaiveDate::from_ymd_opt(year, 1, 1))
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .unwrap_or(NaiveDateTime::MAX)
}

/// Assign a transfer capacity to every period of the range for both directions of every link.
///
/// Capacity changes exactly at each observation's breakpoint and holds until the next one; before
/// the first breakpoint the first observed value is used. A link lacking observations within the
/// range for a direction it needs fails as a whole.
pub fn assign_ntc(links: &LinkMap, observations: &[NtcObservation], range: &NtcRange) -> NtcOutput {
    let timestamps = {
        let end = year_start(range.end_year + 1);
        let mut timestamps = Vec::new();
        let mut time = year_start(range.start_year);
        while time < end {
            timestamps.push(time);
            time = range.resolution.advance(time);
        }
        timestamps
    };

    let mut output = NtcOutput::default();
    for link in links.values() {
        match assign_link(link, observations, range, &timestamps) {
            Ok(entries) => output.entries.extend(entries),
            Err(err) => output.errors.push(err),
        }
    }
    debug!(
        "Assigned NTC values to {} links at {} timestamps each, {} failed",
        links.len() - output.errors.len(),
        timestamps.len(),
        output.errors.len()
    );

    output
}

fn assign_link(
    link: &Link,
    observations: &[NtcObservation],
    range: &NtcRange,
    timestamps: &[NaiveDateTime],
) -> Result<Vec<NtcEntry>, PrepError> {
    let mut entries = Vec::new();
    for direction in [Direction::Forward, Direction::Backward] {
        let source_direction = link.source_direction(direction);
        let mut breakpoints: Vec<_> = observations
            .iter()
            .filter(|obs| obs.link_id == link.id && obs.direction == source_direction)
            .map(|obs| (obs.year, obs.capacity))
            .collect();
        breakpoints.sort_by_key(|(year, _)| *year);

        if !breakpoints
            .iter()
            .any(|(year, _)| (range.start_year..=range.end_year).contains(year))
        {
            return Err(PrepError::MissingLinkData {
                link_id: link.id.to_string(),
                direction: source_direction.to_string(),
                start_year: range.start_year,
                end_year: range.end_year,
            });
        }

        let breakpoints: Vec<_> = breakpoints
            .into_iter()
            .map(|(year, capacity)| (year_start(year), capacity))
            .collect();
        let (from_region, to_region) = link.regions(direction);
        for &timestamp in timestamps {
            let idx = breakpoints.partition_point(|(time, _)| *time <= timestamp);
            let (_, capacity_mw) = breakpoints[idx.saturating_sub(1)];
            entries.push(NtcEntry {
                link_id: link.id.clone(),
                from_region: from_region.clone(),
                to_region: to_region.clone(),
                direction,
                timestamp,
                capacity_mw,
            });
        }
    }

    Ok(entries)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixture::time;
    use rstest::{fixture, rstest};

    #[fixture]
    fn links() -> LinkMap {
        let link = Link {
            id: "DE-FR".into(),
            from_region: "DE".into(),
            to_region: "FR".into(),
            symmetric: true,
        };
        [(link.id.clone(), link)].into_iter().collect()
    }

    fn observation(direction: Direction, year: u32, capacity: f64) -> NtcObservation {
        NtcObservation {
            link_id: "DE-FR".into(),
            direction,
            year,
            capacity: Capacity(capacity),
        }
    }

    const RANGE: NtcRange = NtcRange {
        start_year: 2018,
        end_year: 2030,
        resolution: Resolution::Month,
    };

    fn capacity_at(entries: &[NtcEntry], direction: Direction, at: &str) -> Capacity {
        entries
            .iter()
            .find(|entry| entry.direction == direction && entry.timestamp == time(at))
            .unwrap()
            .capacity_mw
    }

    #[rstest]
    fn test_assign_ntc_steps(links: LinkMap) {
        let observations = [
            observation(Direction::Forward, 2025, 150.0),
            observation(Direction::Forward, 2020, 100.0),
        ];
        let output = assign_ntc(&links, &observations, &RANGE);
        assert!(output.errors.is_empty());
        // 13 years of months, both directions
        assert_eq!(output.entries.len(), 2 * 13 * 12);

        let entries = &output.entries;
        // The first value is held before the first breakpoint
        assert_eq!(capacity_at(entries, Direction::Forward, "2018-01-01 00:00"), Capacity(100.0));
        assert_eq!(capacity_at(entries, Direction::Forward, "2024-12-01 00:00"), Capacity(100.0));
        assert_eq!(capacity_at(entries, Direction::Forward, "2025-01-01 00:00"), Capacity(150.0));
        assert_eq!(capacity_at(entries, Direction::Forward, "2030-12-01 00:00"), Capacity(150.0));
        // Symmetric links use the forward values for the backward direction
        assert_eq!(capacity_at(entries, Direction::Backward, "2025-01-01 00:00"), Capacity(150.0));

        let backward = entries
            .iter()
            .find(|entry| entry.direction == Direction::Backward)
            .unwrap();
        assert_eq!(backward.from_region, "FR".into());
        assert_eq!(backward.to_region, "DE".into());
    }

    #[rstest]
    fn test_assign_ntc_asymmetric(mut links: LinkMap) {
        links[0].symmetric = false;
        let observations = [
            observation(Direction::Forward, 2020, 100.0),
            observation(Direction::Backward, 2020, 80.0),
        ];
        let output = assign_ntc(&links, &observations, &RANGE);
        assert_eq!(
            capacity_at(&output.entries, Direction::Backward, "2021-06-01 00:00"),
            Capacity(80.0)
        );
    }

    #[rstest]
    fn test_assign_ntc_missing_direction(mut links: LinkMap) {
        links[0].symmetric = false;
        let observations = [observation(Direction::Forward, 2020, 100.0)];
        let output = assign_ntc(&links, &observations, &RANGE);
        assert!(output.entries.is_empty());
        assert_eq!(
            output.errors[0].to_string(),
            "No NTC observations for link DE-FR (backward) in 2018-2030"
        );
    }

    #[rstest]
    fn test_assign_ntc_out_of_range(links: LinkMap) {
        let observations = [observation(Direction::Forward, 2015, 100.0)];
        let output = assign_ntc(&links, &observations, &RANGE);
        assert_eq!(
            output.errors,
            [PrepError::MissingLinkData {
                link_id: "DE-FR".into(),
                direction: "forward".into(),
                start_year: 2018,
                end_year: 2030
            }]
        );
    }
}
