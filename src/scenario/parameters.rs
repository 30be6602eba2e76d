//! Defines the `ScenarioParameters` struct, which represents the contents of `scenario.toml`.
use crate::cluster::ClusterConfig;
use crate::cost::CostInterpolation;
use crate::input::{input_err_msg, read_toml};
use crate::ntc::NtcRange;
use crate::projection::ProjectionYears;
use crate::resolution::Resolution;
use anyhow::{Context, Result, anyhow, ensure};
use serde::Deserialize;
use std::path::Path;

const SCENARIO_PARAMETERS_FILE_NAME: &str = "scenario.toml";

macro_rules! define_param_default {
    ($name:ident, $type: ty, $value: expr) => {
        fn $name() -> $type {
            $value
        }
    };
}

define_param_default!(default_resolution, Resolution, Resolution::HOURLY);

/// Parameters of the resampler
#[derive(Debug, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct ResamplingParameters {
    /// Resolution series are resampled to unless they specify their own
    #[serde(default = "default_resolution")]
    pub target_resolution: Resolution,
}

impl Default for ResamplingParameters {
    fn default() -> Self {
        Self {
            target_resolution: default_resolution(),
        }
    }
}

/// Parameters of the interconnector capacity assigner
#[derive(Debug, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct NtcParameters {
    /// Spacing of the output timestamps
    #[serde(default = "default_resolution")]
    pub resolution: Resolution,
}

impl Default for NtcParameters {
    fn default() -> Self {
        Self {
            resolution: default_resolution(),
        }
    }
}

/// Represents the contents of the entire scenario file.
#[derive(Debug, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct ScenarioParameters {
    /// The year described by the unit registers
    pub base_year: u32,
    /// First year of the projection and interconnector outputs
    pub start_year: u32,
    /// Last year of the projection and interconnector outputs
    pub end_year: u32,
    /// Whether to abort on the first per-key error instead of collecting them
    #[serde(default)]
    pub fail_fast: bool,
    /// How units are grouped into clusters
    #[serde(default)]
    pub clustering: ClusterConfig,
    /// How costs are interpolated between cost-curve years
    #[serde(default)]
    pub cost_interpolation: CostInterpolation,
    /// Resampling of time series
    #[serde(default)]
    pub resampling: ResamplingParameters,
    /// Interconnector capacities
    #[serde(default)]
    pub ntc: NtcParameters,
}

/// Check that the target year range is valid
fn check_year_range(start_year: u32, end_year: u32) -> Result<()> {
    ensure!(
        start_year <= end_year,
        "start_year ({start_year}) cannot be after end_year ({end_year})"
    );
    ensure!(
        end_year < 10_000,
        "end_year must be a four-digit year, not {end_year}"
    );

    Ok(())
}

impl ScenarioParameters {
    /// Read a scenario file from the specified directory.
    ///
    /// # Arguments
    ///
    /// * `scenario_dir` - Folder containing scenario files
    ///
    /// # Returns
    ///
    /// The scenario file contents as a [`ScenarioParameters`] struct or an error if the file is
    /// invalid
    pub fn from_path<P: AsRef<Path>>(scenario_dir: P) -> Result<ScenarioParameters> {
        let file_path = scenario_dir.as_ref().join(SCENARIO_PARAMETERS_FILE_NAME);
        let params: ScenarioParameters = read_toml(&file_path)?;

        params
            .validate()
            .with_context(|| input_err_msg(file_path))?;

        Ok(params)
    }

    /// Validate parameters after reading in file
    fn validate(&self) -> Result<()> {
        // start_year and end_year
        check_year_range(self.start_year, self.end_year)?;

        // clustering
        self.clustering
            .validate()
            .context("Invalid [clustering] parameters")?;

        // ntc
        self.ntc
            .resolution
            .check_divides_year()
            .map_err(|message| anyhow!("Invalid [ntc] resolution: {message}"))?;

        Ok(())
    }

    /// The years covered by projections
    pub fn projection_years(&self) -> ProjectionYears {
        ProjectionYears {
            base_year: self.base_year,
            start_year: self.start_year,
            end_year: self.end_year,
        }
    }

    /// The time range of the interconnector output
    pub fn ntc_range(&self) -> NtcRange {
        NtcRange {
            start_year: self.start_year,
            end_year: self.end_year,
            resolution: self.ntc.resolution,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cluster::KeyField;
    use crate::year::Interpolation;
    use rstest::rstest;
    use std::fs::File;
    use std::io::Write;
    use tempfile::tempdir;

    fn write_scenario_file(dir: &Path, contents: &str) {
        let mut file = File::create(dir.join(SCENARIO_PARAMETERS_FILE_NAME)).unwrap();
        writeln!(file, "{contents}").unwrap();
    }

    #[test]
    fn test_scenario_params_from_path_defaults() {
        let dir = tempdir().unwrap();
        write_scenario_file(dir.path(), "base_year = 2020\nstart_year = 2020\nend_year = 2030");

        let params = ScenarioParameters::from_path(dir.path()).unwrap();
        assert_eq!(params.start_year, 2020);
        assert!(!params.fail_fast);
        assert_eq!(params.clustering, ClusterConfig::default());
        assert_eq!(params.cost_interpolation, CostInterpolation::default());
        assert_eq!(params.resampling.target_resolution, Resolution::HOURLY);
        assert_eq!(params.ntc.resolution, Resolution::HOURLY);
    }

    #[test]
    fn test_scenario_params_from_path() {
        let dir = tempdir().unwrap();
        write_scenario_file(
            dir.path(),
            r#"
base_year = 2019
start_year = 2020
end_year = 2050
fail_fast = true

[clustering]
cohort_width = 10
cohort_origin = 2001
key_fields = ["cohort"]
efficiency_band = 0.05

[cost_interpolation]
fuel_cost = "step"

[resampling]
target_resolution = "1d"

[ntc]
resolution = "month"
"#,
        );

        let params = ScenarioParameters::from_path(dir.path()).unwrap();
        assert!(params.fail_fast);
        assert_eq!(params.clustering.cohort_width, 10);
        assert_eq!(params.clustering.key_fields, [KeyField::Cohort]);
        assert_eq!(params.clustering.efficiency_band, Some(0.05));
        assert_eq!(params.cost_interpolation.capex, Interpolation::Linear);
        assert_eq!(params.cost_interpolation.fuel_cost, Interpolation::Step);
        assert_eq!(params.resampling.target_resolution, Resolution::Fixed(1440));
        assert_eq!(params.ntc_range().resolution, Resolution::Month);
        assert_eq!(params.projection_years().base_year, 2019);
    }

    #[rstest]
    #[case("base_year = 2020\nstart_year = 2030\nend_year = 2020")]
    #[case("base_year = 2020\nstart_year = 2020\nend_year = 2030\n[clustering]\ncohort_width = 0")]
    #[case("base_year = 2020\nstart_year = 2020\nend_year = 2030\nunknown = 1")]
    #[case("base_year = 2020\nstart_year = 2020\nend_year = 2030\n[ntc]\nresolution = \"fortnight\"")]
    #[case("base_year = 2020\nstart_year = 2020\nend_year = 2030\n[ntc]\nresolution = \"1w\"")]
    #[case("base_year = 2020\nstart_year = 2020\nend_year = 2030\n[ntc]\nresolution = \"7h\"")]
    #[case("start_year = 2020\nend_year = 2030")]
    fn test_scenario_params_from_path_invalid(#[case] contents: &str) {
        let dir = tempdir().unwrap();
        write_scenario_file(dir.path(), contents);
        assert!(ScenarioParameters::from_path(dir.path()).is_err());
    }

    #[rstest]
    #[case(2020, 2020, true)]
    #[case(2020, 2050, true)]
    #[case(2021, 2020, false)]
    #[case(2020, 10_000, false)]
    fn test_check_year_range(#[case] start_year: u32, #[case] end_year: u32, #[case] valid: bool) {
        assert_eq!(check_year_range(start_year, end_year).is_ok(), valid);
    }
}
