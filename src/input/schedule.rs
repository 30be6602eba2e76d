//! Code for reading the capacity schedule.
use super::*;
use crate::projection::{EventKind, ScheduleEvent};
use crate::technology::Technology;
use crate::unit::RegionID;
use crate::units::Capacity;
use anyhow::{Context, Result, ensure};
use serde::Deserialize;
use std::path::Path;

const SCHEDULE_FILE_NAME: &str = "schedule.csv";

#[derive(Debug, Deserialize, PartialEq)]
struct ScheduleEventRaw {
    technology: Technology,
    region: String,
    year: u32,
    #[serde(rename = "event")]
    kind: EventKind,
    #[serde(rename = "capacity_mw")]
    capacity: f64,
    commissioning_year: Option<u32>,
}

/// Read scheduled capacity additions and retirements, if given.
///
/// # Arguments
///
/// * `scenario_dir` - Folder containing scenario files
pub fn read_schedule(scenario_dir: &Path) -> Result<Vec<ScheduleEvent>> {
    let file_path = scenario_dir.join(SCHEDULE_FILE_NAME);
    let schedule_csv = read_csv_optional(&file_path)?;
    read_schedule_from_iter(schedule_csv).with_context(|| input_err_msg(&file_path))
}

fn read_schedule_from_iter<I>(iter: I) -> Result<Vec<ScheduleEvent>>
where
    I: Iterator<Item = ScheduleEventRaw>,
{
    iter.map(|row| {
        ensure!(
            row.capacity.is_finite() && row.capacity > 0.0,
            "Scheduled capacity for {} in {} must be positive",
            row.technology,
            row.region
        );
        ensure!(
            row.commissioning_year.is_none() || row.kind == EventKind::Retirement,
            "Commissioning year can only be given for retirements ({} in {})",
            row.technology,
            row.region
        );

        Ok(ScheduleEvent {
            technology: row.technology,
            region: RegionID::from(row.region),
            year: row.year,
            kind: row.kind,
            capacity: Capacity(row.capacity),
            commissioning_year: row.commissioning_year,
        })
    })
    .collect()
}
