//! Code for reading the vintage efficiency table.
use super::*;
use crate::normalise::EfficiencyDefaults;
use crate::technology::Technology;
use crate::year::is_sorted_and_unique;
use anyhow::{Context, Result, ensure};
use serde::Deserialize;
use std::collections::HashMap;
use std::path::Path;

const EFFICIENCY_DEFAULTS_FILE_NAME: &str = "efficiency_defaults.csv";

#[derive(Debug, Deserialize, PartialEq)]
struct EfficiencyDefaultRaw {
    technology: Technology,
    year: u32,
    #[serde(deserialize_with = "deserialise_proportion_nonzero")]
    efficiency: f64,
}

/// Read the default efficiencies by technology and commissioning year, if given.
///
/// # Arguments
///
/// * `scenario_dir` - Folder containing scenario files
pub fn read_efficiency_defaults(scenario_dir: &Path) -> Result<EfficiencyDefaults> {
    let file_path = scenario_dir.join(EFFICIENCY_DEFAULTS_FILE_NAME);
    let defaults_csv = read_csv_optional(&file_path)?;
    read_efficiency_defaults_from_iter(defaults_csv).with_context(|| input_err_msg(&file_path))
}

fn read_efficiency_defaults_from_iter<I>(iter: I) -> Result<EfficiencyDefaults>
where
    I: Iterator<Item = EfficiencyDefaultRaw>,
{
    let mut map: HashMap<Technology, Vec<(u32, f64)>> = HashMap::new();
    for row in iter {
        map.entry(row.technology)
            .or_default()
            .push((row.year, row.efficiency));
    }

    for (technology, points) in &mut map {
        points.sort_by_key(|(year, _)| *year);
        let years: Vec<_> = points.iter().map(|(year, _)| *year).collect();
        ensure!(
            is_sorted_and_unique(&years),
            "Duplicate year in efficiency defaults for {technology}"
        );
    }

    Ok(EfficiencyDefaults::new(map))
}
