//! Code for loading the inputs of a scenario.
use crate::cost::TechnologyCostsMap;
use crate::input::{
    read_efficiency_defaults, read_links, read_schedule, read_series, read_sources,
    read_technology_costs,
};
use crate::normalise::{EfficiencyDefaults, RawSource};
use crate::ntc::{LinkMap, NtcObservation};
use crate::projection::ScheduleEvent;
use crate::time_series::RawSeries;
use anyhow::{Context, Result};
use log::info;
use std::path::Path;

pub mod parameters;
pub use parameters::ScenarioParameters;

/// All the inputs of a scenario, read from a scenario directory
#[derive(Debug, PartialEq)]
pub struct ScenarioInputs {
    /// Scenario parameters
    pub parameters: ScenarioParameters,
    /// Unit registers with their field mappings
    pub sources: Vec<RawSource>,
    /// Default efficiencies by technology and commissioning year
    pub efficiency_defaults: EfficiencyDefaults,
    /// Cost curves and financial parameters by technology
    pub technology_costs: TechnologyCostsMap,
    /// Scheduled capacity additions and retirements
    pub schedule: Vec<ScheduleEvent>,
    /// Time series to resample
    pub series: Vec<RawSeries>,
    /// Interconnectors
    pub links: LinkMap,
    /// Known transfer capacities of interconnectors
    pub ntc_observations: Vec<NtcObservation>,
}

impl ScenarioInputs {
    /// Read a scenario from the specified directory.
    ///
    /// # Arguments
    ///
    /// * `scenario_dir` - Folder containing scenario files
    ///
    /// # Returns
    ///
    /// The scenario inputs or an error naming the offending file
    pub fn from_path<P: AsRef<Path>>(scenario_dir: P) -> Result<Self> {
        let scenario_dir = scenario_dir.as_ref();
        let parameters = ScenarioParameters::from_path(scenario_dir)?;
        let sources = read_sources(scenario_dir).context("Failed to read unit registers")?;
        let efficiency_defaults = read_efficiency_defaults(scenario_dir)?;
        let technology_costs = read_technology_costs(scenario_dir)?;
        let schedule = read_schedule(scenario_dir)?;
        let series = read_series(scenario_dir)?;
        let (links, ntc_observations) = read_links(scenario_dir)?;

        info!(
            "Read {} source(s), {} cost curve(s), {} scheduled event(s), {} series and {} link(s)",
            sources.len(),
            technology_costs.len(),
            schedule.len(),
            series.len(),
            links.len()
        );

        Ok(Self {
            parameters,
            sources,
            efficiency_defaults,
            technology_costs,
            schedule,
            series,
            links,
            ntc_observations,
        })
    }
}
