//! The module responsible for writing output data to disk.
use crate::cluster::{Cluster, ClusterKey};
use crate::ntc::NtcEntry;
use crate::pipeline::{Issue, PipelineOutput};
use crate::projection::{ProjectedYear, ProjectionKey};
use crate::technology::Technology;
use crate::time_series::{SeriesID, TimeSeries, timestamp_format};
use crate::unit::{FuelID, RegionID};
use anyhow::{Context, Result, ensure};
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use std::fs;
use std::fs::File;
use std::path::{Path, PathBuf};

pub mod metadata;
pub use metadata::write_metadata;

/// The output file name for clusters
const CLUSTERS_FILE_NAME: &str = "clusters.csv";

/// The output file name for projected capacities and costs
const PROJECTED_SERIES_FILE_NAME: &str = "projected_series.csv";

/// The output file name for resampled time series
const RESAMPLED_SERIES_FILE_NAME: &str = "resampled_series.csv";

/// The output file name for interconnector capacities
const NTC_FILE_NAME: &str = "ntc.csv";

/// The output file name for warnings and errors
const ISSUES_FILE_NAME: &str = "issues.csv";

/// Get the default output directory for the specified scenario directory, under `output_root`
pub fn get_output_dir(output_root: &Path, scenario_dir: &Path) -> Result<PathBuf> {
    let scenario_dir = scenario_dir
        .canonicalize() // canonicalise in case the user has specified "."
        .context("Could not resolve path to scenario")?;

    let scenario_name = scenario_dir
        .file_name()
        .context("Scenario cannot be in root folder")?
        .to_str()
        .context("Invalid chars in scenario dir name")?;

    Ok(output_root.join(scenario_name))
}

/// Create a new output directory, emptying it first if it already has contents.
///
/// # Returns
///
/// Whether an existing folder with contents is being overwritten, or an error if it has contents
/// and `allow_overwrite` is false.
pub fn create_output_directory(output_dir: &Path, allow_overwrite: bool) -> Result<bool> {
    let overwrite = if output_dir.is_dir() {
        let is_empty = output_dir.read_dir()?.next().is_none();
        if !is_empty {
            ensure!(
                allow_overwrite,
                "Output folder already exists and is not empty. Use --overwrite to replace it."
            );
            fs::remove_dir_all(output_dir)?;
        }
        !is_empty
    } else {
        false
    };

    fs::create_dir_all(output_dir)?;

    Ok(overwrite)
}

/// Represents a row in the clusters CSV file
#[derive(Serialize, Deserialize, Debug, PartialEq)]
struct ClusterRow {
    label: String,
    technology: Technology,
    region: RegionID,
    fuel_type: Option<FuelID>,
    cohort_start: Option<u32>,
    cohort_end: Option<u32>,
    efficiency_band: Option<String>,
    total_capacity_mw: f64,
    weighted_efficiency: Option<f64>,
    representative_commissioning_year: u32,
    variable_cost: f64,
    fixed_cost: f64,
    min_load_factor: Option<f64>,
    grad_pos: Option<f64>,
    grad_neg: Option<f64>,
    member_count: usize,
}

impl ClusterRow {
    fn new(key: &ClusterKey, cluster: &Cluster) -> Self {
        Self {
            label: key.label(),
            technology: key.technology,
            region: key.region.clone(),
            fuel_type: key.fuel_type.clone(),
            cohort_start: key.cohort.map(|cohort| cohort.start),
            cohort_end: key.cohort.map(|cohort| cohort.end),
            efficiency_band: key.efficiency_band.map(|band| band.to_string()),
            total_capacity_mw: cluster.total_capacity_mw.value(),
            weighted_efficiency: cluster.weighted_efficiency.map(|e| e.value()),
            representative_commissioning_year: cluster.representative_commissioning_year,
            variable_cost: cluster.variable_cost.value(),
            fixed_cost: cluster.fixed_cost.value(),
            min_load_factor: cluster.min_load_factor.map(|factor| factor.value()),
            // Ramping is symmetric
            grad_pos: cluster.load_gradient.map(|gradient| gradient.value()),
            grad_neg: cluster.load_gradient.map(|gradient| gradient.value()),
            member_count: cluster.member_count,
        }
    }
}

/// Represents a row in the projected series CSV file
#[derive(Serialize, Deserialize, Debug, PartialEq)]
struct ProjectedYearRow {
    technology: Technology,
    region: RegionID,
    year: u32,
    capacity_mw: f64,
    capex: f64,
    opex: f64,
    fuel_cost: f64,
    levelized_cost: f64,
}

impl ProjectedYearRow {
    fn new(key: &ProjectionKey, projected: &ProjectedYear) -> Self {
        Self {
            technology: key.technology,
            region: key.region.clone(),
            year: projected.year,
            capacity_mw: projected.capacity_mw.value(),
            capex: projected.costs.capex.value(),
            opex: projected.costs.opex.value(),
            fuel_cost: projected.costs.fuel_cost.value(),
            levelized_cost: projected.levelised_cost.value(),
        }
    }
}

/// Represents a row in the resampled series CSV file
#[derive(Serialize, Deserialize, Debug, PartialEq)]
struct SeriesValueRow {
    series_id: SeriesID,
    #[serde(with = "timestamp_format")]
    timestamp: NaiveDateTime,
    value: f64,
}

/// An object for writing the output tables to file
pub struct DataWriter {
    clusters_writer: csv::Writer<File>,
    projected_series_writer: csv::Writer<File>,
    resampled_series_writer: csv::Writer<File>,
    ntc_writer: csv::Writer<File>,
    issues_writer: csv::Writer<File>,
}

impl DataWriter {
    /// Open CSV files to write output data to
    ///
    /// # Arguments
    ///
    /// * `output_path` - Folder where files will be saved
    pub fn create(output_path: &Path) -> Result<Self> {
        let new_writer = |file_name| {
            let file_path = output_path.join(file_name);
            csv::Writer::from_path(file_path)
        };

        Ok(Self {
            clusters_writer: new_writer(CLUSTERS_FILE_NAME)?,
            projected_series_writer: new_writer(PROJECTED_SERIES_FILE_NAME)?,
            resampled_series_writer: new_writer(RESAMPLED_SERIES_FILE_NAME)?,
            ntc_writer: new_writer(NTC_FILE_NAME)?,
            issues_writer: new_writer(ISSUES_FILE_NAME)?,
        })
    }

    /// Write all outputs of a pipeline run
    pub fn write_all(&mut self, output: &PipelineOutput) -> Result<()> {
        self.write_clusters(output.clusters.iter())?;
        self.write_projected_series(
            output
                .projections
                .iter()
                .flat_map(|(key, series)| series.iter().map(move |projected| (key, projected))),
        )?;
        self.write_resampled_series(output.series.iter())?;
        self.write_ntc(output.ntc.iter())?;
        self.write_issues(output.issues.iter())?;

        Ok(())
    }

    /// Write clusters to a CSV file
    pub fn write_clusters<'a, I>(&mut self, clusters: I) -> Result<()>
    where
        I: Iterator<Item = (&'a ClusterKey, &'a Cluster)>,
    {
        for (key, cluster) in clusters {
            self.clusters_writer
                .serialize(ClusterRow::new(key, cluster))?;
        }

        Ok(())
    }

    /// Write projected capacities and costs to a CSV file
    pub fn write_projected_series<'a, I>(&mut self, rows: I) -> Result<()>
    where
        I: Iterator<Item = (&'a ProjectionKey, &'a ProjectedYear)>,
    {
        for (key, projected) in rows {
            self.projected_series_writer
                .serialize(ProjectedYearRow::new(key, projected))?;
        }

        Ok(())
    }

    /// Write resampled time series to a CSV file
    pub fn write_resampled_series<'a, I>(&mut self, series: I) -> Result<()>
    where
        I: Iterator<Item = &'a TimeSeries>,
    {
        for ts in series {
            for (timestamp, value) in ts.points() {
                let row = SeriesValueRow {
                    series_id: ts.id.clone(),
                    timestamp: *timestamp,
                    value: *value,
                };
                self.resampled_series_writer.serialize(row)?;
            }
        }

        Ok(())
    }

    /// Write interconnector capacities to a CSV file
    pub fn write_ntc<'a, I>(&mut self, entries: I) -> Result<()>
    where
        I: Iterator<Item = &'a NtcEntry>,
    {
        for entry in entries {
            self.ntc_writer.serialize(entry)?;
        }

        Ok(())
    }

    /// Write warnings and errors to a CSV file
    pub fn write_issues<'a, I>(&mut self, issues: I) -> Result<()>
    where
        I: Iterator<Item = &'a Issue>,
    {
        for issue in issues {
            self.issues_writer.serialize(issue)?;
        }

        Ok(())
    }

    /// Flush the underlying streams
    pub fn flush(&mut self) -> Result<()> {
        self.clusters_writer.flush()?;
        self.projected_series_writer.flush()?;
        self.resampled_series_writer.flush()?;
        self.ntc_writer.flush()?;
        self.issues_writer.flush()?;

        Ok(())
    }
}

/// Write all outputs of a pipeline run to the specified folder
pub fn write_outputs(output_path: &Path, output: &PipelineOutput) -> Result<()> {
    let mut writer = DataWriter::create(output_path)?;
    writer.write_all(output)?;
    writer.flush()
}
