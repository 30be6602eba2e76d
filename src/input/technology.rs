//! Code for reading the financial parameters of technologies.
use super::*;
use crate::cost::TechnologyFinance;
use crate::technology::Technology;
use crate::units::{Dimensionless, FullLoadHours};
use anyhow::{Context, Result, ensure};
use serde::Deserialize;
use std::collections::HashMap;
use std::path::Path;

const TECHNOLOGIES_FILE_NAME: &str = "technologies.csv";

/// Maximum full load hours in a year (leap year)
const MAX_FULL_LOAD_HOURS: f64 = 8784.0;

#[derive(Debug, Deserialize, PartialEq)]
struct TechnologyFinanceRaw {
    technology: Technology,
    lifetime: u32,
    #[serde(deserialize_with = "deserialise_non_negative")]
    wacc: f64,
    full_load_hours: f64,
}

/// Read the financial parameters of technologies.
///
/// # Arguments
///
/// * `scenario_dir` - Folder containing scenario files
pub fn read_technology_finance(
    scenario_dir: &Path,
) -> Result<HashMap<Technology, TechnologyFinance>> {
    let file_path = scenario_dir.join(TECHNOLOGIES_FILE_NAME);
    let technologies_csv = read_csv(&file_path)?;
    read_technology_finance_from_iter(technologies_csv).with_context(|| input_err_msg(&file_path))
}

fn read_technology_finance_from_iter<I>(iter: I) -> Result<HashMap<Technology, TechnologyFinance>>
where
    I: Iterator<Item = TechnologyFinanceRaw>,
{
    let mut map = HashMap::new();
    for row in iter {
        ensure!(
            row.lifetime > 0,
            "Lifetime for {} must be greater than zero",
            row.technology
        );
        ensure!(
            row.wacc < 1.0,
            "WACC for {} must be less than 1",
            row.technology
        );
        ensure!(
            row.full_load_hours > 0.0 && row.full_load_hours <= MAX_FULL_LOAD_HOURS,
            "Full load hours for {} must be > 0 and <= {MAX_FULL_LOAD_HOURS}",
            row.technology
        );

        let finance = TechnologyFinance {
            lifetime: row.lifetime,
            wacc: Dimensionless(row.wacc),
            full_load_hours: FullLoadHours(row.full_load_hours),
        };
        ensure!(
            map.insert(row.technology, finance).is_none(),
            "Duplicate entry for technology {}",
            row.technology
        );
    }

    Ok(map)
}
