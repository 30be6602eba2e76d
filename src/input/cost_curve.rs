//! Code for reading cost curves and combining them with the financial parameters of technologies.
use super::*;
use crate::cost::{CostCurve, CostPoint, TechnologyCosts, TechnologyCostsMap, TechnologyFinance};
use crate::technology::Technology;
use crate::units::{MoneyPerCapacity, MoneyPerCapacityPerYear, MoneyPerEnergy};
use anyhow::{Context, Result, ensure};
use itertools::Itertools;
use serde::Deserialize;
use std::collections::HashMap;
use std::path::Path;

const COST_CURVES_FILE_NAME: &str = "cost_curves.csv";

#[derive(Debug, Deserialize, PartialEq)]
struct CostCurveRaw {
    technology: Technology,
    year: u32,
    #[serde(deserialize_with = "deserialise_non_negative")]
    capex: f64,
    #[serde(deserialize_with = "deserialise_non_negative")]
    opex: f64,
    #[serde(deserialize_with = "deserialise_non_negative")]
    fuel_cost: f64,
}

/// Read the cost data of all technologies.
///
/// Every technology with a cost curve must also have financial parameters.
///
/// # Arguments
///
/// * `scenario_dir` - Folder containing scenario files
pub fn read_technology_costs(scenario_dir: &Path) -> Result<TechnologyCostsMap> {
    let finance = read_technology_finance(scenario_dir)?;
    let file_path = scenario_dir.join(COST_CURVES_FILE_NAME);
    let curves_csv = read_csv(&file_path)?;
    read_technology_costs_from_iter(curves_csv, &finance).with_context(|| input_err_msg(&file_path))
}

fn read_technology_costs_from_iter<I>(
    iter: I,
    finance: &HashMap<Technology, TechnologyFinance>,
) -> Result<TechnologyCostsMap>
where
    I: Iterator<Item = CostCurveRaw>,
{
    let mut points: HashMap<Technology, Vec<(u32, CostPoint)>> = HashMap::new();
    for row in iter {
        let point = CostPoint {
            capex: MoneyPerCapacity(row.capex),
            opex: MoneyPerCapacityPerYear(row.opex),
            fuel_cost: MoneyPerEnergy(row.fuel_cost),
        };
        points
            .entry(row.technology)
            .or_default()
            .push((row.year, point));
    }

    points
        .into_iter()
        .sorted_by_key(|(technology, _)| *technology)
        .map(|(technology, mut points)| -> Result<_> {
            let finance = *finance.get(&technology).with_context(|| {
                format!("No financial parameters given for technology {technology}")
            })?;
            points.sort_by_key(|(year, _)| *year);
            let years = points.iter().map(|(year, _)| *year).collect_vec();
            ensure!(
                years.iter().all_unique(),
                "Duplicate year in cost curve for {technology}"
            );
            let curve = CostCurve::new(points)?;

            Ok((technology, TechnologyCosts { finance, curve }))
        })
        .try_collect()
}
