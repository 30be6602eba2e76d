//! Fixtures for tests

use crate::cluster::ClusterConfig;
use crate::cost::{
    CostCurve, CostInterpolation, CostPoint, TechnologyCosts, TechnologyCostsMap, TechnologyFinance,
};
use crate::normalise::{
    DecimalSeparator, EfficiencyDefaults, Field, RawSource, RawTable, SourceMapping,
};
use crate::ntc::LinkMap;
use crate::scenario::ScenarioInputs;
use crate::scenario::parameters::{NtcParameters, ResamplingParameters, ScenarioParameters};
use crate::technology::Technology;
use crate::time_series::TIMESTAMP_FORMAT;
use crate::unit::UnitRecord;
use crate::units::{
    Capacity, Dimensionless, FullLoadHours, MoneyPerCapacity, MoneyPerCapacityPerYear,
    MoneyPerEnergy,
};
use chrono::NaiveDateTime;
use rstest::fixture;
use std::collections::BTreeMap;
use strum::IntoEnumIterator;

/// Assert that an error with the given message occurs
macro_rules! assert_error {
    ($result:expr, $msg:expr) => {
        assert_eq!(
            $result.unwrap_err().chain().next().unwrap().to_string(),
            $msg
        );
    };
}
pub(crate) use assert_error;

/// Parse a timestamp in the input file format
pub fn time(s: &str) -> NaiveDateTime {
    NaiveDateTime::parse_from_str(s, TIMESTAMP_FORMAT).unwrap()
}

/// A unit in region DE with no efficiency, costs or decommissioning year
pub fn unit(id: &str, technology: Technology, capacity: f64, year: u32) -> UnitRecord {
    let fuel_type = match technology {
        Technology::Gas => "natural_gas",
        Technology::Nuclear => "uranium",
        Technology::WindOnshore | Technology::WindOffshore => "wind",
        _ => "other",
    };

    UnitRecord {
        id: id.into(),
        technology,
        fuel_type: fuel_type.into(),
        region: "DE".into(),
        net_capacity_mw: Capacity(capacity),
        efficiency: None,
        commissioning_year: year,
        decommissioning_year: None,
        variable_cost: MoneyPerEnergy(0.0),
        fixed_cost: MoneyPerCapacityPerYear(0.0),
        min_load_factor: None,
        load_gradient: None,
    }
}

#[fixture]
pub fn units() -> Vec<UnitRecord> {
    vec![
        UnitRecord {
            efficiency: Some(Dimensionless(0.5)),
            variable_cost: MoneyPerEnergy(4.0),
            ..unit("u1", Technology::Gas, 500.0, 2005)
        },
        UnitRecord {
            variable_cost: MoneyPerEnergy(8.0),
            decommissioning_year: Some(2035),
            ..unit("u2", Technology::Gas, 300.0, 2007)
        },
        unit("u3", Technology::WindOnshore, 200.0, 2010),
    ]
}

#[fixture]
pub fn cost_curve() -> CostCurve {
    CostCurve::new(vec![
        (
            2020,
            CostPoint {
                capex: MoneyPerCapacity(1000.0),
                opex: MoneyPerCapacityPerYear(10.0),
                fuel_cost: MoneyPerEnergy(20.0),
            },
        ),
        (
            2030,
            CostPoint {
                capex: MoneyPerCapacity(500.0),
                opex: MoneyPerCapacityPerYear(20.0),
                fuel_cost: MoneyPerEnergy(30.0),
            },
        ),
    ])
    .unwrap()
}

#[fixture]
pub fn technology_costs(cost_curve: CostCurve) -> TechnologyCostsMap {
    let finance = TechnologyFinance {
        lifetime: 20,
        wacc: Dimensionless(0.05),
        full_load_hours: FullLoadHours(4000.0),
    };

    [Technology::Gas, Technology::WindOnshore]
        .into_iter()
        .map(|technology| {
            let costs = TechnologyCosts {
                finance,
                curve: cost_curve.clone(),
            };
            (technology, costs)
        })
        .collect()
}

/// The value of a field of a unit, as written in a source file
fn field_value(unit: &UnitRecord, field: Field) -> String {
    match field {
        Field::Id => unit.id.to_string(),
        Field::Technology => unit.technology.to_string(),
        Field::FuelType => unit.fuel_type.to_string(),
        Field::Region => unit.region.to_string(),
        Field::NetCapacityMw => unit.net_capacity_mw.value().to_string(),
        Field::Efficiency => unit
            .efficiency
            .map(|efficiency| efficiency.value().to_string())
            .unwrap_or_default(),
        Field::CommissioningYear => unit.commissioning_year.to_string(),
        Field::DecommissioningYear => unit
            .decommissioning_year
            .map(|year| year.to_string())
            .unwrap_or_default(),
        Field::VariableCost => unit.variable_cost.value().to_string(),
        Field::FixedCost => unit.fixed_cost.value().to_string(),
        Field::MinLoadFactor => unit
            .min_load_factor
            .map(|factor| factor.value().to_string())
            .unwrap_or_default(),
        // Sources give gradients per minute
        Field::LoadGradient => unit
            .load_gradient
            .map(|gradient| (gradient.value() / 60.0).to_string())
            .unwrap_or_default(),
    }
}

/// A source whose columns are named after the canonical fields, holding the given units
pub fn source_of(name: &str, units: &[UnitRecord]) -> RawSource {
    let rows = units
        .iter()
        .map(|unit| Field::iter().map(|field| field_value(unit, field)).collect())
        .collect();

    RawSource {
        mapping: SourceMapping {
            name: name.into(),
            file: format!("{name}.csv").into(),
            columns: Field::iter().map(|field| (field, field.to_string())).collect(),
            constants: BTreeMap::new(),
            technology_aliases: BTreeMap::new(),
            conversions: BTreeMap::new(),
            decimal_separator: DecimalSeparator::default(),
        },
        table: RawTable {
            headers: Field::iter().map(|field| field.to_string()).collect(),
            rows,
        },
    }
}

#[fixture]
pub fn scenario_parameters() -> ScenarioParameters {
    ScenarioParameters {
        base_year: 2020,
        start_year: 2025,
        end_year: 2030,
        fail_fast: false,
        clustering: ClusterConfig::default(),
        cost_interpolation: CostInterpolation::default(),
        resampling: ResamplingParameters::default(),
        ntc: NtcParameters::default(),
    }
}

#[fixture]
pub fn scenario_inputs(
    scenario_parameters: ScenarioParameters,
    units: Vec<UnitRecord>,
    technology_costs: TechnologyCostsMap,
) -> ScenarioInputs {
    ScenarioInputs {
        parameters: scenario_parameters,
        sources: vec![source_of("register", &units)],
        efficiency_defaults: EfficiencyDefaults::default(),
        technology_costs,
        schedule: Vec::new(),
        series: Vec::new(),
        links: LinkMap::new(),
        ntc_observations: Vec::new(),
    }
}
