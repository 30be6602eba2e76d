//! Code for reading unit register sources and their field mappings.
use super::*;
use crate::normalise::{RawSource, RawTable, SourceMapping};
use anyhow::{Context, Result, ensure};
use itertools::Itertools;
use serde::Deserialize;
use std::path::Path;

const SOURCES_FILE_NAME: &str = "sources.toml";

/// Represents the contents of the sources file
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct SourcesFile {
    source: Vec<SourceMapping>,
}

/// Read the source mappings and the raw tables they describe.
///
/// # Arguments
///
/// * `scenario_dir` - Folder containing scenario files
///
/// # Returns
///
/// One [`RawSource`] per `[[source]]` table, in file order
pub fn read_sources(scenario_dir: &Path) -> Result<Vec<RawSource>> {
    let file_path = scenario_dir.join(SOURCES_FILE_NAME);
    let sources_file: SourcesFile = read_toml(&file_path)?;
    check_source_names(&sources_file.source).with_context(|| input_err_msg(&file_path))?;

    sources_file
        .source
        .into_iter()
        .map(|mapping| {
            let table = read_raw_table(&scenario_dir.join(&mapping.file))?;
            Ok(RawSource { mapping, table })
        })
        .try_collect()
}

/// Check that there is at least one source and that names are unique
fn check_source_names(mappings: &[SourceMapping]) -> Result<()> {
    ensure!(!mappings.is_empty(), "At least one source must be given");
    if let Some(name) = mappings.iter().map(|m| &m.name).duplicates().next() {
        anyhow::bail!("Duplicate source name: {name}");
    }

    Ok(())
}

/// Read a CSV file as strings, keeping its header
fn read_raw_table(file_path: &Path) -> Result<RawTable> {
    let mut reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_path(file_path)
        .with_context(|| input_err_msg(file_path))?;
    let headers = reader
        .headers()
        .with_context(|| input_err_msg(file_path))?
        .iter()
        .map(ToString::to_string)
        .collect();
    let rows = reader
        .records()
        .map_ok(|record| record.iter().map(ToString::to_string).collect())
        .try_collect()
        .with_context(|| input_err_msg(file_path))?;

    Ok(RawTable { headers, rows })
}
