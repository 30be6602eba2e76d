//! The projection engine.
//!
//! Extends the capacity of each (technology, region) over the target years, starting from the
//! capacity of its clusters and applying scheduled additions and retirements, and attaches the
//! interpolated costs of the technology to every year.
use crate::cluster::ClusterMap;
use crate::cost::{CostInterpolation, CostPoint, TechnologyCostsMap};
use crate::error::PrepError;
use crate::technology::Technology;
use crate::unit::RegionID;
use crate::units::{Capacity, MoneyPerEnergy};
use log::debug;
use serde_string_enum::DeserializeLabeledStringEnum;
use std::collections::BTreeMap;
use std::fmt;

/// Cumulative retirements may undershoot zero by this much before being treated as inconsistent
const CAPACITY_TOLERANCE: f64 = 1e-9;

/// The kind of a scheduled capacity change
#[derive(Debug, Clone, Copy, PartialEq, Eq, DeserializeLabeledStringEnum)]
pub enum EventKind {
    /// New capacity, e.g. from a tender
    #[string = "addition"]
    Addition,
    /// Capacity leaving the system
    #[string = "retirement"]
    Retirement,
}

/// A scheduled capacity change
#[derive(Debug, Clone, PartialEq)]
pub struct ScheduleEvent {
    /// Technology affected
    pub technology: Technology,
    /// Region affected
    pub region: RegionID,
    /// Year from which the change is in effect
    pub year: u32,
    /// Addition or retirement
    pub kind: EventKind,
    /// Capacity added or retired (positive)
    pub capacity: Capacity,
    /// For retirements, the year the retired capacity was commissioned
    pub commissioning_year: Option<u32>,
}

impl ScheduleEvent {
    /// The signed change in capacity
    fn delta(&self) -> Capacity {
        match self.kind {
            EventKind::Addition => self.capacity,
            EventKind::Retirement => -self.capacity,
        }
    }
}

/// A (technology, region) pair, the unit of projection
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct ProjectionKey {
    /// The technology
    pub technology: Technology,
    /// The region
    pub region: RegionID,
}

impl fmt::Display for ProjectionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.technology, self.region)
    }
}

/// The years a projection covers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProjectionYears {
    /// The year the cluster capacities describe
    pub base_year: u32,
    /// First year of the output
    pub start_year: u32,
    /// Last year of the output
    pub end_year: u32,
}

/// Projected values for a single year
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ProjectedYear {
    /// The year
    pub year: u32,
    /// Installed capacity
    pub capacity_mw: Capacity,
    /// Interpolated cost components
    pub costs: CostPoint,
    /// Levelised cost of electricity
    pub levelised_cost: MoneyPerEnergy,
}

/// Projected capacity and costs for every year of the target range
pub type ProjectedSeries = Vec<ProjectedYear>;

/// The outcome of projecting all keys
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ProjectionOutput {
    /// Series for each key that could be projected
    pub series: BTreeMap<ProjectionKey, ProjectedSeries>,
    /// One error per key that could not
    pub errors: Vec<PrepError>,
}

/// Project every (technology, region) present in the clusters or the schedule.
///
/// Keys are projected independently: a key which fails does not affect the others.
pub fn project(
    clusters: &ClusterMap,
    schedule: &[ScheduleEvent],
    costs: &TechnologyCostsMap,
    years: &ProjectionYears,
    interpolation: &CostInterpolation,
) -> ProjectionOutput {
    let mut plans: BTreeMap<ProjectionKey, CapacityPlan> = BTreeMap::new();
    for (key, cluster) in clusters {
        let plan = plans
            .entry(ProjectionKey {
                technology: key.technology,
                region: key.region.clone(),
            })
            .or_default();
        // Units commissioned after the base year are not yet part of its capacity
        for (year, capacity) in &cluster.commissioning {
            if *year <= years.base_year {
                plan.base += *capacity;
            } else {
                plan.add_delta(*year, *capacity);
            }
        }
        for (year, capacity) in &cluster.decommissioning {
            plan.add_delta(*year, -*capacity);
        }
    }
    for event in schedule {
        plans
            .entry(ProjectionKey {
                technology: event.technology,
                region: event.region.clone(),
            })
            .or_default()
            .events
            .push(event.clone());
    }

    let mut output = ProjectionOutput::default();
    for (key, plan) in plans {
        match project_key(&key, &plan, costs, years, interpolation) {
            Ok(series) => {
                output.series.insert(key, series);
            }
            Err(err) => output.errors.push(err),
        }
    }
    debug!(
        "Projected {} (technology, region) keys, {} failed",
        output.series.len(),
        output.errors.len()
    );

    output
}

/// Base capacity and changes for one key
#[derive(Debug, Default)]
struct CapacityPlan {
    base: Capacity,
    /// Changes derived from unit commissioning and decommissioning years, by year
    deltas: BTreeMap<u32, Capacity>,
    /// Changes from the schedule
    events: Vec<ScheduleEvent>,
}

impl CapacityPlan {
    fn add_delta(&mut self, year: u32, delta: Capacity) {
        *self.deltas.entry(year).or_default() += delta;
    }

    /// All changes, summed by year
    fn changes(&self, key: &ProjectionKey) -> Result<BTreeMap<u32, Capacity>, PrepError> {
        let mut changes = self.deltas.clone();
        for event in &self.events {
            if let Some(commissioning_year) = event.commissioning_year
                && event.kind == EventKind::Retirement
                && event.year < commissioning_year
            {
                return Err(PrepError::InconsistentSchedule {
                    key: key.to_string(),
                    message: format!(
                        "retirement in {} precedes commissioning in {commissioning_year}",
                        event.year
                    ),
                });
            }
            *changes.entry(event.year).or_default() += event.delta();
        }

        Ok(changes)
    }
}

/// Project a single key
fn project_key(
    key: &ProjectionKey,
    plan: &CapacityPlan,
    costs: &TechnologyCostsMap,
    years: &ProjectionYears,
    interpolation: &CostInterpolation,
) -> Result<ProjectedSeries, PrepError> {
    let technology_costs = costs
        .get(&key.technology)
        .filter(|costs| costs.curve.overlaps(years.start_year, years.end_year))
        .ok_or_else(|| PrepError::ProjectionRange {
            key: key.to_string(),
            start_year: years.start_year,
            end_year: years.end_year,
        })?;

    // Capacity after each year with a change
    let mut steps = Vec::new();
    let mut capacity = plan.base;
    for (year, delta) in plan.changes(key)? {
        capacity += delta;
        if capacity.value() < -CAPACITY_TOLERANCE {
            return Err(PrepError::InconsistentSchedule {
                key: key.to_string(),
                message: format!("capacity would become negative ({capacity} MW) in {year}"),
            });
        }
        steps.push((year, capacity));
    }

    let capacity_in = |year: u32| {
        let effective_year = year.max(years.base_year);
        let idx = steps.partition_point(|(step_year, _)| *step_year <= effective_year);
        let capacity = if idx == 0 { plan.base } else { steps[idx - 1].1 };
        Capacity(capacity.value().max(0.0))
    };

    let series = (years.start_year..=years.end_year)
        .map(|year| {
            let (costs, levelised_cost) = technology_costs.at(year, interpolation);
            ProjectedYear {
                year,
                capacity_mw: capacity_in(year),
                costs,
                levelised_cost,
            }
        })
        .collect();

    Ok(series)
}
