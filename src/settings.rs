//! Program settings, read from `settings.toml` in the user's config directory.
//!
//! Settings are defaults for every run on this machine. Command-line flags take precedence over
//! them, and anything describing the data itself belongs in a scenario's `scenario.toml`.
use crate::get_powerprep_config_dir;
use crate::input::read_toml;
use crate::log::{DEFAULT_LOG_LEVEL, parse_log_level};
use anyhow::{Context, Result, anyhow};
use documented::DocumentedFields;
use serde::{Deserialize, Serialize};
use std::fmt::Write;
use std::path::{Path, PathBuf};

const SETTINGS_FILE_NAME: &str = "settings.toml";

/// Where results are written if neither `--output-dir` nor the settings say otherwise
pub const DEFAULT_OUTPUT_ROOT: &str = "powerprep_results";

const DEFAULT_SETTINGS_FILE_HEADER: &str = "# powerprep settings. Uncomment a setting to change it.
# Options describing a scenario belong in its scenario.toml instead.
";

/// Get the path to where the settings file will be read from
pub fn get_settings_file_path() -> PathBuf {
    get_powerprep_config_dir().join(SETTINGS_FILE_NAME)
}

/// Program settings from config file
#[derive(Debug, Clone, DocumentedFields, Serialize, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct Settings {
    /// Log level if POWERPREP_LOG_LEVEL is unset: off, error, warn, info, debug or trace
    pub log_level: String,
    /// Folder holding one results folder per scenario, used when no output directory is given
    pub output_root: PathBuf,
    /// Whether to replace a non-empty output folder without passing --overwrite
    pub overwrite: bool,
    /// Whether to abort on the first failing source, key, series or link without passing
    /// --fail-fast
    pub fail_fast: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            log_level: DEFAULT_LOG_LEVEL.to_string(),
            output_root: DEFAULT_OUTPUT_ROOT.into(),
            overwrite: false,
            fail_fast: false,
        }
    }
}

impl Settings {
    /// Read the contents of the user's settings file.
    ///
    /// If the file is not present, default values for settings will be used
    pub fn load() -> Result<Settings> {
        Self::load_from_path(&get_settings_file_path())
    }

    /// Read and check settings, falling back on defaults if the file doesn't exist
    fn load_from_path(file_path: &Path) -> Result<Settings> {
        if !file_path.is_file() {
            return Ok(Settings::default());
        }

        let settings: Settings = read_toml(file_path)?;
        parse_log_level(&settings.log_level)
            .with_context(|| format!("Invalid log_level in {}", file_path.display()))?;

        Ok(settings)
    }

    /// The settings as TOML, each preceded by its description.
    ///
    /// `prefix` is put in front of every line, e.g. `"# "` to comment the settings out.
    pub fn to_documented_toml(&self, prefix: &str) -> Result<String> {
        let table = toml::Table::try_from(self)?;

        let mut out = String::new();
        for (field, value) in &table {
            let docs = Settings::get_field_docs(field)
                .map_err(|_| anyhow!("Setting {field} has no description"))?;
            out.push('\n');
            for line in docs.lines() {
                writeln!(out, "{prefix}# {}", line.trim())?;
            }
            writeln!(out, "{prefix}{field} = {value}")?;
        }

        Ok(out)
    }

    /// The contents of a placeholder settings file, with every setting at its default
    pub fn default_file_contents() -> Result<String> {
        let settings = Settings::default().to_documented_toml("# ")?;

        Ok(format!("{DEFAULT_SETTINGS_FILE_HEADER}{settings}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use itertools::Itertools;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn test_settings_load_from_path_no_file() {
        let dir = tempdir().unwrap();
        let file_path = dir.path().join(SETTINGS_FILE_NAME); // NB: doesn't exist
        assert_eq!(
            Settings::load_from_path(&file_path).unwrap(),
            Settings::default()
        );
    }

    #[test]
    fn test_settings_load_from_path() {
        let dir = tempdir().unwrap();
        let file_path = dir.path().join(SETTINGS_FILE_NAME);
        fs::write(
            &file_path,
            "log_level = \"warn\"\noutput_root = \"/data/results\"\nfail_fast = true\n",
        )
        .unwrap();

        assert_eq!(
            Settings::load_from_path(&file_path).unwrap(),
            Settings {
                log_level: "warn".to_string(),
                output_root: "/data/results".into(),
                overwrite: false,
                fail_fast: true,
            }
        );
    }

    #[test]
    fn test_settings_load_from_path_invalid() {
        let dir = tempdir().unwrap();
        let file_path = dir.path().join(SETTINGS_FILE_NAME);

        fs::write(&file_path, "log_level = \"loud\"\n").unwrap();
        assert!(Settings::load_from_path(&file_path).is_err());

        fs::write(&file_path, "output_dir = \"results\"\n").unwrap();
        assert!(Settings::load_from_path(&file_path).is_err());
    }

    #[test]
    fn test_default_file_contents() {
        let contents = Settings::default_file_contents().unwrap();
        assert!(contents.starts_with(DEFAULT_SETTINGS_FILE_HEADER));
        assert!(contents.contains("# log_level = \"info\""));
        assert!(contents.contains("# output_root = \"powerprep_results\""));
        assert!(contents.contains("# # Whether to replace a non-empty output folder"));

        // Uncommenting every setting gives the defaults back
        let uncommented = contents
            .lines()
            .filter_map(|line| line.strip_prefix("# "))
            .filter(|line| !line.starts_with('#') && line.contains(" = "))
            .join("\n");
        let settings: Settings = toml::from_str(&uncommented).unwrap();
        assert_eq!(settings, Settings::default());
    }

    #[test]
    fn test_to_documented_toml() {
        let settings = Settings {
            fail_fast: true,
            ..Settings::default()
        };
        let contents = settings.to_documented_toml("").unwrap();
        assert!(contents.contains("\nfail_fast = true\n"));
        assert!(contents.contains("# Folder holding one results folder per scenario"));
        assert_eq!(toml::from_str::<Settings>(&contents).unwrap(), settings);
    }
}
