//! Common functionality for powerprep.
#![warn(missing_docs)]
use std::path::PathBuf;

pub mod cli;
pub mod cluster;
pub mod cost;
pub mod error;
pub mod id;
pub mod input;
pub mod log;
pub mod normalise;
pub mod ntc;
pub mod output;
pub mod pipeline;
pub mod projection;
pub mod resample;
pub mod resolution;
pub mod scenario;
pub mod settings;
pub mod technology;
pub mod time_series;
pub mod unit;
pub mod units;
pub mod year;

#[cfg(test)]
mod fixture;

/// Get the directory where the program's config files live.
///
/// Falls back to the current directory if the platform has no user config directory.
pub fn get_powerprep_config_dir() -> PathBuf {
    let mut path = dirs::config_dir().unwrap_or_default();
    path.push("powerprep");
    path
}
