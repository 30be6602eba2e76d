//! Integration tests which run all stages on the example scenario.
use float_cmp::assert_approx_eq;
use powerprep::ntc::Direction;
use powerprep::pipeline::{self, PipelineOutput, Severity};
use powerprep::projection::{ProjectedSeries, ProjectionKey};
use powerprep::resolution::Resolution;
use powerprep::scenario::ScenarioInputs;
use powerprep::technology::Technology;
use powerprep::units::Capacity;
use rstest::{fixture, rstest};

#[fixture]
fn inputs() -> ScenarioInputs {
    ScenarioInputs::from_path("demos/simple").unwrap()
}

#[fixture]
fn output(inputs: ScenarioInputs) -> PipelineOutput {
    pipeline::run(&inputs).unwrap()
}

fn projection(output: &PipelineOutput, technology: Technology) -> &ProjectedSeries {
    let key = ProjectionKey {
        technology,
        region: "DE".into(),
    };
    &output.projections[&key]
}

fn capacity_in(series: &ProjectedSeries, year: u32) -> f64 {
    series
        .iter()
        .find(|projected| projected.year == year)
        .unwrap()
        .capacity_mw
        .value()
}

#[rstest]
fn test_scenario_normalise(output: PipelineOutput) {
    assert_eq!(output.units.len(), 11);

    let conventional = &output.reports[0];
    assert_eq!(conventional.records_read, 8);
    assert_eq!(conventional.dropped_total(), 2);
    assert_eq!(conventional.corrected, 2);

    let renewables = &output.reports[1];
    assert_eq!(renewables.records_read, 5);
    assert_eq!(renewables.dropped_total(), 0);

    // Converted from kW with a decimal comma
    let wind = output
        .units
        .iter()
        .find(|unit| unit.id == "SEE0001".into())
        .unwrap();
    assert_eq!(wind.technology, Technology::WindOnshore);
    assert_approx_eq!(f64, wind.net_capacity_mw.value(), 3.5005);
}

#[rstest]
fn test_scenario_clusters(output: PipelineOutput) {
    assert_eq!(output.clusters.len(), 7);

    let unit_total: Capacity = output.units.iter().map(|unit| unit.net_capacity_mw).sum();
    let cluster_total: Capacity = output
        .clusters
        .values()
        .map(|cluster| cluster.total_capacity_mw)
        .sum();
    assert_approx_eq!(f64, unit_total.value(), cluster_total.value(), epsilon = 1e-9);

    let (key, gas) = output
        .clusters
        .iter()
        .find(|(key, _)| key.technology == Technology::Gas)
        .unwrap();
    assert_eq!(key.label(), "gas_DE_natural_gas_2005");
    assert_eq!(gas.total_capacity_mw, Capacity(800.0));
    assert_eq!(gas.member_count, 2);
    // (500 * 0.4 + 300 * 0.5) / 800
    assert_approx_eq!(f64, gas.min_load_factor.unwrap().value(), 0.4375);
    // Only the first unit gives a gradient: 0.02 per minute is 1.2 per hour, capped at 1
    assert_approx_eq!(f64, gas.load_gradient.unwrap().value(), 1.0);
}

#[rstest]
fn test_scenario_projection(output: PipelineOutput) {
    assert_eq!(output.projections.len(), 7);

    let gas = projection(&output, Technology::Gas);
    assert_eq!(gas.len(), 11);
    assert_approx_eq!(f64, capacity_in(gas, 2023), 800.0);
    assert_approx_eq!(f64, capacity_in(gas, 2024), 1400.0);

    // Scheduled retirement of the whole hard coal cohort
    let hardcoal = projection(&output, Technology::Hardcoal);
    assert_approx_eq!(f64, capacity_in(hardcoal, 2025), 750.0);
    assert_approx_eq!(f64, capacity_in(hardcoal, 2026), 0.0);

    // Decommissioning years of the register
    let lignite = projection(&output, Technology::Lignite);
    assert_approx_eq!(f64, capacity_in(lignite, 2027), 1750.0);
    assert_approx_eq!(f64, capacity_in(lignite, 2028), 0.0);

    let offshore = projection(&output, Technology::WindOffshore);
    assert_approx_eq!(f64, capacity_in(offshore, 2025), 2188.0);
}

#[rstest]
fn test_scenario_resample(inputs: ScenarioInputs, output: PipelineOutput) {
    assert_eq!(output.series.len(), 2);

    let inflow = &output.series[0];
    assert_eq!(inflow.resolution, Resolution::Month);
    assert_eq!(inflow.points().len(), 2);
    let (complete, anomaly) = inputs.series[0].complete().unwrap();
    assert!(anomaly.is_some());
    assert_approx_eq!(f64, inflow.total(), complete.total(), epsilon = 1e-6);

    let load = &output.series[1];
    assert_eq!(load.resolution, Resolution::Fixed(24 * 60));
    assert_eq!(load.points().len(), 2);
}

#[rstest]
fn test_scenario_ntc(output: PipelineOutput) {
    // Two links, both directions, monthly for 11 years
    assert_eq!(output.ntc.len(), 2 * 2 * 11 * 12);

    let capacity_at = |link: &str, direction: Direction, year: i32, month: u32| {
        output
            .ntc
            .iter()
            .find(|entry| {
                entry.link_id == link.into()
                    && entry.direction == direction
                    && entry.timestamp
                        == chrono::NaiveDate::from_ymd_opt(year, month, 1)
                            .unwrap()
                            .and_hms_opt(0, 0, 0)
                            .unwrap()
            })
            .unwrap()
            .capacity_mw
    };
    assert_eq!(capacity_at("DE-FR", Direction::Backward, 2024, 12), Capacity(3000.0));
    assert_eq!(capacity_at("DE-FR", Direction::Backward, 2025, 1), Capacity(4800.0));
    assert_eq!(capacity_at("DE-PL", Direction::Backward, 2026, 12), Capacity(1500.0));
    assert_eq!(capacity_at("DE-PL", Direction::Backward, 2027, 1), Capacity(2500.0));
    assert_eq!(capacity_at("DE-PL", Direction::Forward, 2030, 12), Capacity(2000.0));
}

#[rstest]
fn test_scenario_issues(output: PipelineOutput) {
    assert_eq!(output.count_issues(Severity::Error), 0);
    // Two drop reasons and a correction for the conventional register, gap filling for both series
    assert_eq!(output.count_issues(Severity::Warning), 5);
}
