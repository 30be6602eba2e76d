//! Cost curves and levelised cost of electricity.
use crate::technology::Technology;
use crate::units::{
    Dimensionless, FullLoadHours, MoneyPerCapacity, MoneyPerCapacityPerYear, MoneyPerEnergy,
    PerYear,
};
use crate::year::{Interpolation, interpolate_year, is_sorted_and_unique};
use anyhow::{Result, ensure};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Cost components for one year
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct CostPoint {
    /// Specific investment cost
    pub capex: MoneyPerCapacity,
    /// Fixed operating cost
    pub opex: MoneyPerCapacityPerYear,
    /// Fuel cost per unit of electricity
    pub fuel_cost: MoneyPerEnergy,
}

/// Interpolation method for each cost component
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CostInterpolation {
    /// Method for capex
    #[serde(default)]
    pub capex: Interpolation,
    /// Method for opex
    #[serde(default)]
    pub opex: Interpolation,
    /// Method for fuel cost
    #[serde(default)]
    pub fuel_cost: Interpolation,
}

/// Cost data for a technology, indexed by year
#[derive(Debug, Clone, PartialEq)]
pub struct CostCurve {
    years: Vec<u32>,
    points: Vec<CostPoint>,
}

impl CostCurve {
    /// Create a cost curve from `(year, point)` pairs.
    ///
    /// Years must be strictly increasing and at least one point must be given.
    pub fn new(points: Vec<(u32, CostPoint)>) -> Result<Self> {
        ensure!(!points.is_empty(), "Cost curve must have at least one point");
        let (years, points): (Vec<_>, Vec<_>) = points.into_iter().unzip();
        ensure!(
            is_sorted_and_unique(&years),
            "Cost curve years must be strictly increasing"
        );

        Ok(Self { years, points })
    }

    /// The first year with data
    pub fn first_year(&self) -> u32 {
        self.years[0]
    }

    /// The last year with data
    pub fn last_year(&self) -> u32 {
        self.years[self.years.len() - 1]
    }

    /// Whether the curve's years overlap `start_year..=end_year`
    pub fn overlaps(&self, start_year: u32, end_year: u32) -> bool {
        start_year <= self.last_year() && end_year >= self.first_year()
    }

    fn component(&self, year: u32, method: Interpolation, f: impl Fn(&CostPoint) -> f64) -> f64 {
        let points: Vec<_> = self
            .years
            .iter()
            .zip(&self.points)
            .map(|(year, point)| (*year, f(point)))
            .collect();

        interpolate_year(&points, year, method).unwrap_or_default()
    }

    /// The costs for the given year.
    ///
    /// Between breakpoints each component is derived with its own interpolation method. Outside
    /// the breakpoints the nearest breakpoint's values are used.
    pub fn at(&self, year: u32, interpolation: &CostInterpolation) -> CostPoint {
        CostPoint {
            capex: MoneyPerCapacity(self.component(year, interpolation.capex, |p| p.capex.0)),
            opex: MoneyPerCapacityPerYear(self.component(year, interpolation.opex, |p| p.opex.0)),
            fuel_cost: MoneyPerEnergy(
                self.component(year, interpolation.fuel_cost, |p| p.fuel_cost.0),
            ),
        }
    }
}

/// Financial parameters of a technology
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TechnologyFinance {
    /// Economic lifetime in years
    pub lifetime: u32,
    /// Weighted average cost of capital
    pub wacc: Dimensionless,
    /// Annual full load hours
    pub full_load_hours: FullLoadHours,
}

/// The cost data of a technology
#[derive(Debug, Clone, PartialEq)]
pub struct TechnologyCosts {
    /// Financial parameters
    pub finance: TechnologyFinance,
    /// Costs by year
    pub curve: CostCurve,
}

impl TechnologyCosts {
    /// The cost components and levelised cost for a year
    pub fn at(&self, year: u32, interpolation: &CostInterpolation) -> (CostPoint, MoneyPerEnergy) {
        let costs = self.curve.at(year, interpolation);
        (costs, levelised_cost(&costs, &self.finance))
    }
}

/// Cost data by technology
pub type TechnologyCostsMap = HashMap<Technology, TechnologyCosts>;

/// Calculates the capital recovery factor (CRF) for a given lifetime and discount rate.
///
/// The CRF is used to annualise capital costs over the lifetime of a plant.
pub fn capital_recovery_factor(lifetime: u32, discount_rate: Dimensionless) -> PerYear {
    if lifetime == 0 {
        return PerYear(0.0);
    }
    if discount_rate == Dimensionless(0.0) {
        return PerYear(1.0 / f64::from(lifetime));
    }
    let factor = (Dimensionless(1.0) + discount_rate).powi(lifetime as i32);
    PerYear(((discount_rate * factor) / (factor - Dimensionless(1.0))).value())
}

/// Calculates the levelised cost of electricity for the given costs
pub fn levelised_cost(costs: &CostPoint, finance: &TechnologyFinance) -> MoneyPerEnergy {
    let crf = capital_recovery_factor(finance.lifetime, finance.wacc);
    let annual_cost = costs.capex * crf + costs.opex;
    annual_cost / finance.full_load_hours + costs.fuel_cost
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixture::{assert_error, cost_curve};
    use float_cmp::assert_approx_eq;
    use rstest::rstest;

    #[rstest]
    #[case(0, 0.05, 0.0)] // Edge case: lifetime==0
    #[case(10, 0.0, 0.1)] // Other edge case: discount_rate==0
    #[case(10, 0.05, 0.1295045749654567)]
    #[case(5, 0.03, 0.2183545714005762)]
    fn test_capital_recovery_factor(
        #[case] lifetime: u32,
        #[case] discount_rate: f64,
        #[case] expected: f64,
    ) {
        let result = capital_recovery_factor(lifetime, Dimensionless(discount_rate));
        assert_approx_eq!(f64, result.value(), expected, epsilon = 1e-10);
    }

    #[test]
    fn test_levelised_cost() {
        let costs = CostPoint {
            capex: MoneyPerCapacity(1_000_000.0),
            opex: MoneyPerCapacityPerYear(20_000.0),
            fuel_cost: MoneyPerEnergy(30.0),
        };
        let finance = TechnologyFinance {
            lifetime: 10,
            wacc: Dimensionless(0.0),
            full_load_hours: FullLoadHours(2000.0),
        };
        // (1e6 / 10 + 2e4) / 2000 + 30
        assert_approx_eq!(f64, levelised_cost(&costs, &finance).value(), 90.0);
    }

    #[rstest]
    fn test_cost_curve_at(cost_curve: CostCurve) {
        let linear = CostInterpolation::default();
        let point = cost_curve.at(2025, &linear);
        assert_approx_eq!(f64, point.capex.value(), 750.0);
        assert_approx_eq!(f64, point.opex.value(), 15.0);
        assert_approx_eq!(f64, point.fuel_cost.value(), 25.0);

        let step = CostInterpolation {
            capex: Interpolation::Step,
            ..Default::default()
        };
        let point = cost_curve.at(2025, &step);
        assert_approx_eq!(f64, point.capex.value(), 1000.0);
        assert_approx_eq!(f64, point.opex.value(), 15.0);

        // Clamped outside the breakpoints
        assert_eq!(cost_curve.at(2010, &linear), cost_curve.at(2020, &linear));
        assert_eq!(cost_curve.at(2040, &linear), cost_curve.at(2030, &linear));
    }

    #[rstest]
    fn test_cost_curve_overlaps(cost_curve: CostCurve) {
        assert_eq!(cost_curve.first_year(), 2020);
        assert_eq!(cost_curve.last_year(), 2030);
        assert!(cost_curve.overlaps(2030, 2040));
        assert!(cost_curve.overlaps(2000, 2020));
        assert!(cost_curve.overlaps(2022, 2025));
        assert!(!cost_curve.overlaps(2031, 2050));
    }

    #[test]
    fn test_cost_curve_new_invalid() {
        let point = CostPoint {
            capex: MoneyPerCapacity(1.0),
            opex: MoneyPerCapacityPerYear(1.0),
            fuel_cost: MoneyPerEnergy(1.0),
        };
        assert_error!(
            CostCurve::new(vec![]),
            "Cost curve must have at least one point"
        );
        assert_error!(
            CostCurve::new(vec![(2030, point), (2020, point)]),
            "Cost curve years must be strictly increasing"
        );
    }
}
