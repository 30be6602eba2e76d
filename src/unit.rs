//! Canonical records for individual generation and storage units.
use crate::id::define_id_type;
use crate::technology::Technology;
use crate::units::{Capacity, Dimensionless, MoneyPerCapacityPerYear, MoneyPerEnergy};
use serde::Serialize;

define_id_type! {UnitID}
define_id_type! {RegionID}
define_id_type! {FuelID}

/// One physical generation or storage unit in canonical form.
///
/// Records are produced by the normaliser and never modified afterwards.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UnitRecord {
    /// Unique identifier of the unit within the scenario
    pub id: UnitID,
    /// The unit's technology
    pub technology: Technology,
    /// The fuel the unit burns (or the primary energy it converts)
    pub fuel_type: FuelID,
    /// Bidding-zone code
    pub region: RegionID,
    /// Net electrical capacity (always positive)
    pub net_capacity_mw: Capacity,
    /// Net electrical efficiency in (0, 1], if known
    pub efficiency: Option<Dimensionless>,
    /// Year in which the unit was commissioned
    pub commissioning_year: u32,
    /// Year in which the unit is (or will be) decommissioned, if known
    pub decommissioning_year: Option<u32>,
    /// Variable operating cost
    pub variable_cost: MoneyPerEnergy,
    /// Fixed operating cost
    pub fixed_cost: MoneyPerCapacityPerYear,
    /// Lowest stable output as a share of net capacity, if known
    pub min_load_factor: Option<Dimensionless>,
    /// Largest change in output within an hour as a share of net capacity, if known
    pub load_gradient: Option<Dimensionless>,
}
