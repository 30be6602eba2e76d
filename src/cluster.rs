//! The clustering engine, which groups units into representative aggregate units.
//!
//! Units are grouped in a single pass into running accumulators keyed by [`ClusterKey`]. A final
//! pass turns the capacity-weighted sums into means.
use crate::error::{Anomaly, Stage};
use crate::technology::Technology;
use crate::unit::{FuelID, RegionID, UnitRecord};
use crate::units::{Capacity, Dimensionless, MoneyPerCapacityPerYear, MoneyPerEnergy};
use anyhow::{Result, ensure};
use float_cmp::approx_eq;
use itertools::Itertools;
use log::debug;
use serde::Deserialize;
use serde_string_enum::DeserializeLabeledStringEnum;
use std::collections::BTreeMap;
use std::fmt;

/// Relative tolerance for the capacity conservation check
const CONSERVATION_TOLERANCE: f64 = 1e-9;

/// Efficiencies this close below a band edge belong to the band above it
const BAND_EDGE_TOLERANCE: f64 = 1e-9;

/// Optional components of the cluster key
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, DeserializeLabeledStringEnum)]
pub enum KeyField {
    /// Group by fuel type
    #[string = "fuel_type"]
    FuelType,
    /// Group by commissioning-year cohort
    #[string = "cohort"]
    Cohort,
}

fn default_cohort_width() -> u32 {
    5
}

fn default_key_fields() -> Vec<KeyField> {
    vec![KeyField::FuelType, KeyField::Cohort]
}

/// Configuration of the cluster key
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ClusterConfig {
    /// Width of commissioning-year cohorts in years
    #[serde(default = "default_cohort_width")]
    pub cohort_width: u32,
    /// A year at which a cohort starts
    #[serde(default)]
    pub cohort_origin: u32,
    /// Key components used in addition to technology and region
    #[serde(default = "default_key_fields")]
    pub key_fields: Vec<KeyField>,
    /// If set, units are also split into efficiency bands of this width
    #[serde(default)]
    pub efficiency_band: Option<f64>,
}

impl Default for ClusterConfig {
    fn default() -> Self {
        Self {
            cohort_width: default_cohort_width(),
            cohort_origin: 0,
            key_fields: default_key_fields(),
            efficiency_band: None,
        }
    }
}

impl ClusterConfig {
    /// Check that the configuration is usable
    pub fn validate(&self) -> Result<()> {
        ensure!(self.cohort_width >= 1, "cohort_width must be at least 1");
        ensure!(
            self.key_fields.iter().all_unique(),
            "key_fields cannot contain duplicates"
        );
        if let Some(width) = self.efficiency_band {
            ensure!(
                width > 0.0 && width <= 1.0,
                "efficiency_band must be > 0 and <= 1"
            );
        }

        Ok(())
    }

    fn uses(&self, field: KeyField) -> bool {
        self.key_fields.contains(&field)
    }

    /// The cohort containing the given commissioning year
    pub fn cohort_of(&self, year: u32) -> Cohort {
        let width = i64::from(self.cohort_width);
        let origin = i64::from(self.cohort_origin);
        let offset = (i64::from(year) - origin).div_euclid(width) * width;
        let start = (origin + offset).max(0) as u32;

        Cohort {
            start,
            end: start + self.cohort_width - 1,
        }
    }

    /// The key a unit is grouped under
    pub fn key_of(&self, unit: &UnitRecord) -> ClusterKey {
        let efficiency_band = self.efficiency_band.and_then(|width| {
            unit.efficiency.map(|efficiency| EfficiencyBand {
                index: (efficiency.value() / width + BAND_EDGE_TOLERANCE).floor() as u32,
                width,
            })
        });

        ClusterKey {
            technology: unit.technology,
            region: unit.region.clone(),
            fuel_type: self
                .uses(KeyField::FuelType)
                .then(|| unit.fuel_type.clone()),
            cohort: self
                .uses(KeyField::Cohort)
                .then(|| self.cohort_of(unit.commissioning_year)),
            efficiency_band,
        }
    }
}

/// A bucket of commissioning years (both ends inclusive)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Cohort {
    /// First year of the cohort
    pub start: u32,
    /// Last year of the cohort
    pub end: u32,
}

impl fmt::Display for Cohort {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.start, self.end)
    }
}

/// A range of efficiencies `[index * width, (index + 1) * width)`
#[derive(Debug, Clone, Copy)]
pub struct EfficiencyBand {
    /// Position of the band
    pub index: u32,
    /// Width of the band
    pub width: f64,
}

// Bands from one configuration share a width, so the index identifies them
impl PartialEq for EfficiencyBand {
    fn eq(&self, other: &Self) -> bool {
        self.index == other.index
    }
}

impl Eq for EfficiencyBand {}

impl PartialOrd for EfficiencyBand {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for EfficiencyBand {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.index.cmp(&other.index)
    }
}

impl fmt::Display for EfficiencyBand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let lower = f64::from(self.index) * self.width;
        write!(f, "{lower:.2}-{:.2}", lower + self.width)
    }
}

/// The key identifying a cluster.
///
/// Keys order by technology, region, fuel, cohort and efficiency band, in that order.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct ClusterKey {
    /// Technology of the members
    pub technology: Technology,
    /// Region of the members
    pub region: RegionID,
    /// Fuel of the members, if grouping by fuel
    pub fuel_type: Option<FuelID>,
    /// Commissioning cohort of the members, if grouping by cohort
    pub cohort: Option<Cohort>,
    /// Efficiency band of the members, if grouping by efficiency
    pub efficiency_band: Option<EfficiencyBand>,
}

impl ClusterKey {
    /// A stable label for the cluster, made of the key's components joined by underscores
    pub fn label(&self) -> String {
        let mut parts = vec![self.technology.to_string(), self.region.to_string()];
        if let Some(fuel_type) = &self.fuel_type {
            parts.push(fuel_type.to_string());
        }
        if let Some(cohort) = &self.cohort {
            parts.push(cohort.start.to_string());
        }
        if let Some(band) = &self.efficiency_band {
            parts.push(format!("eff{}", band.index));
        }

        parts.join("_")
    }
}

/// An aggregate of all units sharing a [`ClusterKey`]
#[derive(Debug, Clone, PartialEq)]
pub struct Cluster {
    /// Sum of member capacities
    pub total_capacity_mw: Capacity,
    /// Capacity-weighted mean efficiency of the members which declare one
    pub weighted_efficiency: Option<Dimensionless>,
    /// Capacity-weighted mean commissioning year, rounded
    pub representative_commissioning_year: u32,
    /// Capacity-weighted mean variable cost
    pub variable_cost: MoneyPerEnergy,
    /// Capacity-weighted mean fixed cost
    pub fixed_cost: MoneyPerCapacityPerYear,
    /// Capacity-weighted mean minimum load factor of the members which declare one
    pub min_load_factor: Option<Dimensionless>,
    /// Capacity-weighted mean hourly load gradient of the members which declare one
    pub load_gradient: Option<Dimensionless>,
    /// Number of member units
    pub member_count: usize,
    /// Capacity entering the cluster in each commissioning year
    pub commissioning: BTreeMap<u32, Capacity>,
    /// Capacity leaving the cluster in each decommissioning year
    pub decommissioning: BTreeMap<u32, Capacity>,
}

/// Clusters ordered by key
pub type ClusterMap = BTreeMap<ClusterKey, Cluster>;

/// Capacity-weighted sum of a value which not every member declares
#[derive(Default)]
struct PartialMean {
    capacity: f64,
    sum: f64,
}

impl PartialMean {
    fn add(&mut self, capacity: f64, value: Option<Dimensionless>) {
        if let Some(value) = value {
            self.capacity += capacity;
            self.sum += capacity * value.value();
        }
    }

    fn finish(&self) -> Option<Dimensionless> {
        (self.capacity > 0.0).then(|| Dimensionless(self.sum / self.capacity))
    }
}

/// Running sums for one group
#[derive(Default)]
struct Accumulator {
    capacity: f64,
    efficiency: PartialMean,
    min_load_factor: PartialMean,
    load_gradient: PartialMean,
    year_sum: f64,
    variable_cost_sum: f64,
    fixed_cost_sum: f64,
    member_count: usize,
    commissioning: BTreeMap<u32, Capacity>,
    decommissioning: BTreeMap<u32, Capacity>,
}

impl Accumulator {
    fn add(&mut self, unit: &UnitRecord) {
        let capacity = unit.net_capacity_mw.value();
        self.capacity += capacity;
        self.efficiency.add(capacity, unit.efficiency);
        self.min_load_factor.add(capacity, unit.min_load_factor);
        self.load_gradient.add(capacity, unit.load_gradient);
        self.year_sum += capacity * f64::from(unit.commissioning_year);
        self.variable_cost_sum += capacity * unit.variable_cost.value();
        self.fixed_cost_sum += capacity * unit.fixed_cost.value();
        self.member_count += 1;
        *self
            .commissioning
            .entry(unit.commissioning_year)
            .or_default() += unit.net_capacity_mw;
        if let Some(year) = unit.decommissioning_year {
            *self.decommissioning.entry(year).or_default() += unit.net_capacity_mw;
        }
    }

    /// Divide the weighted sums by capacity. Returns `None` if the total capacity is zero.
    fn finish(self) -> Option<Cluster> {
        if self.capacity <= 0.0 {
            return None;
        }

        Some(Cluster {
            total_capacity_mw: Capacity(self.capacity),
            weighted_efficiency: self.efficiency.finish(),
            representative_commissioning_year: (self.year_sum / self.capacity).round() as u32,
            variable_cost: MoneyPerEnergy(self.variable_cost_sum / self.capacity),
            fixed_cost: MoneyPerCapacityPerYear(self.fixed_cost_sum / self.capacity),
            min_load_factor: self.min_load_factor.finish(),
            load_gradient: self.load_gradient.finish(),
            member_count: self.member_count,
            commissioning: self.commissioning,
            decommissioning: self.decommissioning,
        })
    }
}

/// Group units into clusters.
///
/// Groups whose total capacity is zero are dropped and reported as anomalies.
///
/// # Returns
///
/// The clusters, in key order, and any anomalies, or an error if the cluster capacities do not add
/// up to the total capacity of the units.
pub fn cluster_units(
    units: &[UnitRecord],
    config: &ClusterConfig,
) -> Result<(ClusterMap, Vec<Anomaly>)> {
    let mut groups: BTreeMap<ClusterKey, Accumulator> = BTreeMap::new();
    for unit in units {
        groups.entry(config.key_of(unit)).or_default().add(unit);
    }

    let mut clusters = ClusterMap::new();
    let mut anomalies = Vec::new();
    for (key, accumulator) in groups {
        let member_count = accumulator.member_count;
        match accumulator.finish() {
            Some(cluster) => {
                clusters.insert(key, cluster);
            }
            None => anomalies.push(Anomaly::new(
                Stage::Cluster,
                key.label(),
                format!("Cluster with {member_count} member(s) has zero total capacity"),
            )),
        }
    }

    check_capacity_conserved(units, &clusters)?;
    debug!("Grouped {} units into {} clusters", units.len(), clusters.len());

    Ok((clusters, anomalies))
}

/// Check that the cluster capacities sum to the unit capacities
fn check_capacity_conserved(units: &[UnitRecord], clusters: &ClusterMap) -> Result<()> {
    let expected: Capacity = units.iter().map(|unit| unit.net_capacity_mw).sum();
    let actual: Capacity = clusters.values().map(|c| c.total_capacity_mw).sum();
    let tolerance = CONSERVATION_TOLERANCE * expected.value().abs().max(1.0);
    ensure!(
        approx_eq!(f64, expected.value(), actual.value(), epsilon = tolerance),
        "Cluster capacities ({actual} MW) do not add up to unit capacities ({expected} MW)"
    );

    Ok(())
}
