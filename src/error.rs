//! The error taxonomy shared by the transformation stages.
//!
//! Fatal errors are [`PrepError`]s, each carrying the key of the source, group, series or link it
//! concerns. Non-fatal problems (dropped records, filled gaps, empty clusters) are [`Anomaly`]
//! records which are logged and written alongside the outputs.
use serde::Serialize;
use serde_string_enum::SerializeLabeledStringEnum;
use std::fmt;
use thiserror::Error;

/// A fatal error raised by one of the transformation stages
#[derive(Debug, Clone, Error, PartialEq)]
pub enum PrepError {
    /// Source records are malformed or a required field/unit conversion is missing
    #[error("Schema error in source '{source_name}': {message}")]
    Schema {
        /// The name of the offending source
        source_name: String,
        /// What went wrong
        message: String,
    },
    /// The target year range does not overlap any cost-curve data
    #[error("No cost-curve data for {key} overlaps the target years {start_year}-{end_year}")]
    ProjectionRange {
        /// The (technology, region) key lacking cost data
        key: String,
        /// First year of the target range
        start_year: u32,
        /// Last year of the target range
        end_year: u32,
    },
    /// A capacity schedule contradicts itself
    #[error("Inconsistent schedule for {key}: {message}")]
    InconsistentSchedule {
        /// The (technology, region) key of the schedule
        key: String,
        /// What went wrong
        message: String,
    },
    /// The requested resolution is not an integer divisor or multiple of the input resolution
    #[error("Cannot resample series {series_id} from {from} to {to}: {message}")]
    Resolution {
        /// The series being resampled
        series_id: String,
        /// The input resolution
        from: String,
        /// The target resolution
        to: String,
        /// What went wrong
        message: String,
    },
    /// A declared interconnector has no observations in the target range
    #[error("No NTC observations for link {link_id} ({direction}) in {start_year}-{end_year}")]
    MissingLinkData {
        /// The link lacking data
        link_id: String,
        /// The direction lacking data
        direction: String,
        /// First year of the target range
        start_year: u32,
        /// Last year of the target range
        end_year: u32,
    },
    /// A time series is malformed (unordered, duplicated or off-grid timestamps)
    #[error("Invalid time series {series_id}: {message}")]
    Series {
        /// The offending series
        series_id: String,
        /// What went wrong
        message: String,
    },
}

impl PrepError {
    /// Shorthand for constructing a [`PrepError::Schema`]
    pub fn schema(source_name: &str, message: impl Into<String>) -> Self {
        Self::Schema {
            source_name: source_name.into(),
            message: message.into(),
        }
    }

    /// The identifier of the source, group, series or link the error concerns
    pub fn key(&self) -> &str {
        match self {
            Self::Schema { source_name, .. } => source_name,
            Self::ProjectionRange { key, .. } | Self::InconsistentSchedule { key, .. } => key,
            Self::Resolution { series_id, .. } | Self::Series { series_id, .. } => series_id,
            Self::MissingLinkData { link_id, .. } => link_id,
        }
    }
}

/// The transformation stage an issue was raised in
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, SerializeLabeledStringEnum)]
pub enum Stage {
    /// Unit registry normalisation
    #[string = "normalise"]
    Normalise,
    /// Clustering of units
    #[string = "cluster"]
    Cluster,
    /// Capacity and cost projection
    #[string = "projection"]
    Projection,
    /// Time series resampling
    #[string = "resample"]
    Resample,
    /// Interconnector capacity assignment
    #[string = "ntc"]
    Ntc,
}

/// A non-fatal problem found while transforming the inputs
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Anomaly {
    /// The stage which found the problem
    pub stage: Stage,
    /// The source, group, series or link concerned
    pub key: String,
    /// Description of the problem
    pub message: String,
}

impl Anomaly {
    /// Create a new [`Anomaly`]
    pub fn new(stage: Stage, key: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            stage,
            key: key.into(),
            message: message.into(),
        }
    }
}

impl fmt::Display for Anomaly {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}: {}", self.stage, self.key, self.message)
    }
}
