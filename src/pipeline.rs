//! Runs the transformation stages on the inputs of a scenario.
//!
//! The normaliser feeds the clustering engine, whose clusters feed the projection engine. Time
//! series and interconnectors are processed independently. Errors for one source, key, series or
//! link are recorded as issues without affecting the others, unless fail-fast mode is enabled.
use crate::cluster::{ClusterMap, cluster_units};
use crate::error::{Anomaly, PrepError, Stage};
use crate::normalise::{AuditReport, normalise_sources};
use crate::ntc::{NtcEntry, assign_ntc};
use crate::projection::{ProjectedSeries, ProjectionKey, project};
use crate::resample::resample;
use crate::resolution::Resolution;
use crate::scenario::ScenarioInputs;
use crate::time_series::{RawSeries, TimeSeries};
use crate::unit::UnitRecord;
use anyhow::{Context, Result};
use log::{error, info, warn};
use serde::Serialize;
use serde_string_enum::SerializeLabeledStringEnum;
use std::collections::BTreeMap;

/// How serious an issue is
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, SerializeLabeledStringEnum)]
pub enum Severity {
    /// A non-fatal anomaly
    #[string = "warning"]
    Warning,
    /// An error which excluded a source, key, series or link from the outputs
    #[string = "error"]
    Error,
}

/// A problem found while running the stages
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Issue {
    /// The stage which found the problem
    pub stage: Stage,
    /// The source, group, series or link concerned
    pub key: String,
    /// Warning or error
    pub severity: Severity,
    /// Description of the problem
    pub message: String,
}

impl From<Anomaly> for Issue {
    fn from(anomaly: Anomaly) -> Self {
        Self {
            stage: anomaly.stage,
            key: anomaly.key,
            severity: Severity::Warning,
            message: anomaly.message,
        }
    }
}

/// The outputs of all stages
#[derive(Debug, Clone, PartialEq, Default)]
pub struct PipelineOutput {
    /// Normalised unit records
    pub units: Vec<UnitRecord>,
    /// One audit report per normalised source
    pub reports: Vec<AuditReport>,
    /// Clusters in key order
    pub clusters: ClusterMap,
    /// Projected capacity and costs by (technology, region)
    pub projections: BTreeMap<ProjectionKey, ProjectedSeries>,
    /// Resampled time series, in input order
    pub series: Vec<TimeSeries>,
    /// Interconnector capacities
    pub ntc: Vec<NtcEntry>,
    /// Warnings and errors of all stages
    pub issues: Vec<Issue>,
}

impl PipelineOutput {
    /// The number of issues with the given severity
    pub fn count_issues(&self, severity: Severity) -> usize {
        self.issues
            .iter()
            .filter(|issue| issue.severity == severity)
            .count()
    }
}

/// Collects issues, logging each as it is recorded
struct IssueLog {
    issues: Vec<Issue>,
    fail_fast: bool,
}

impl IssueLog {
    fn warn(&mut self, anomaly: Anomaly) {
        warn!("{anomaly}");
        self.issues.push(anomaly.into());
    }

    fn warn_all(&mut self, anomalies: impl IntoIterator<Item = Anomaly>) {
        for anomaly in anomalies {
            self.warn(anomaly);
        }
    }

    /// Record an error, failing instead if in fail-fast mode
    fn error(&mut self, stage: Stage, err: PrepError) -> Result<()> {
        if self.fail_fast {
            return Err(err).with_context(|| format!("Stage '{stage}' failed"));
        }

        error!("[{stage}] {err}");
        self.issues.push(Issue {
            stage,
            key: err.key().to_string(),
            severity: Severity::Error,
            message: err.to_string(),
        });

        Ok(())
    }

    fn error_all(&mut self, stage: Stage, errors: impl IntoIterator<Item = PrepError>) -> Result<()> {
        for err in errors {
            self.error(stage, err)?;
        }

        Ok(())
    }
}

/// Run all stages on the scenario inputs.
///
/// # Returns
///
/// The outputs of all stages, or an error if capacity was not conserved by the clustering engine
/// or, in fail-fast mode, on the first per-key error.
pub fn run(inputs: &ScenarioInputs) -> Result<PipelineOutput> {
    let params = &inputs.parameters;
    let mut issue_log = IssueLog {
        issues: Vec::new(),
        fail_fast: params.fail_fast,
    };

    // Normalise
    let normalised = normalise_sources(&inputs.sources, &inputs.efficiency_defaults);
    issue_log.error_all(Stage::Normalise, normalised.errors)?;
    for report in &normalised.reports {
        issue_log.warn_all(report.anomalies());
    }
    info!(
        "Normalised {} unit(s) from {} source(s)",
        normalised.units.len(),
        normalised.reports.len()
    );

    // Cluster
    let (clusters, anomalies) =
        cluster_units(&normalised.units, &params.clustering).context("Clustering failed")?;
    issue_log.warn_all(anomalies);
    info!("Formed {} cluster(s)", clusters.len());

    // Project
    let projection = project(
        &clusters,
        &inputs.schedule,
        &inputs.technology_costs,
        &params.projection_years(),
        &params.cost_interpolation,
    );
    issue_log.error_all(Stage::Projection, projection.errors)?;
    info!(
        "Projected {} (technology, region) pair(s) over {}-{}",
        projection.series.len(),
        params.start_year,
        params.end_year
    );

    // Resample
    let mut series = Vec::new();
    for raw in &inputs.series {
        let target = raw
            .target_resolution
            .unwrap_or(params.resampling.target_resolution);
        match complete_and_resample(raw, target) {
            Ok((resampled, anomaly)) => {
                issue_log.warn_all(anomaly);
                series.push(resampled);
            }
            Err(err) => issue_log.error(Stage::Resample, err)?,
        }
    }
    info!("Resampled {} series", series.len());

    // Assign interconnector capacities
    let ntc = assign_ntc(&inputs.links, &inputs.ntc_observations, &params.ntc_range());
    issue_log.error_all(Stage::Ntc, ntc.errors)?;
    info!("Assigned {} NTC value(s)", ntc.entries.len());

    Ok(PipelineOutput {
        units: normalised.units,
        reports: normalised.reports,
        clusters,
        projections: projection.series,
        series,
        ntc: ntc.entries,
        issues: issue_log.issues,
    })
}

fn complete_and_resample(
    raw: &RawSeries,
    target: Resolution,
) -> Result<(TimeSeries, Option<Anomaly>), PrepError> {
    let (series, anomaly) = raw.complete()?;
    Ok((resample(&series, target)?, anomaly))
}
