//! The `settings` command, for inspecting and changing the program settings file.
use crate::settings::{Settings, get_settings_file_path};
use anyhow::{Context, Result};
use clap::Subcommand;
use std::fs;
use std::path::Path;

/// Subcommands for settings
#[derive(Subcommand)]
pub enum SettingsSubcommands {
    /// Open the settings file in a text editor, creating it first if needed
    Edit,
    /// Print the path the settings file is read from
    Path,
    /// Print the settings every run uses, including defaults for anything not in the file
    Show,
    /// Print a settings file with every setting at its default, commented out
    DumpDefault,
}

impl SettingsSubcommands {
    /// Execute the supplied settings subcommand
    pub fn execute(self) -> Result<()> {
        match self {
            Self::Edit => handle_edit_command(),
            Self::Path => {
                println!("{}", get_settings_file_path().display());
                Ok(())
            }
            Self::Show => handle_show_command(),
            Self::DumpDefault => {
                print!("{}", Settings::default_file_contents()?);
                Ok(())
            }
        }
    }
}

/// Write a placeholder settings file unless one exists.
///
/// Returns whether a file was written.
fn write_default_file(file_path: &Path) -> Result<bool> {
    if file_path.is_file() {
        return Ok(false);
    }

    if let Some(dir_path) = file_path.parent() {
        fs::create_dir_all(dir_path)
            .with_context(|| format!("Failed to create directory: {}", dir_path.display()))?;
    }
    fs::write(file_path, Settings::default_file_contents()?)
        .with_context(|| format!("Failed to write {}", file_path.display()))?;

    Ok(true)
}

/// Handle the `edit` command
fn handle_edit_command() -> Result<()> {
    let file_path = get_settings_file_path();
    if write_default_file(&file_path)? {
        println!("Created settings file: {}", file_path.display());
    }

    println!("Opening settings file for editing: {}", file_path.display());
    edit::edit_file(&file_path)?;

    // Catch mistakes now rather than at the next run
    Settings::load().context("The edited settings file is invalid")?;

    Ok(())
}

/// Handle the `show` command
fn handle_show_command() -> Result<()> {
    let file_path = get_settings_file_path();
    let settings = Settings::load().context("Failed to load settings.")?;

    if file_path.is_file() {
        println!("# Read from {}", file_path.display());
    } else {
        println!("# No settings file at {}; using defaults", file_path.display());
    }
    print!("{}", settings.to_documented_toml("")?);

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_write_default_file() {
        let dir = tempdir().unwrap();
        let file_path = dir.path().join("powerprep").join("settings.toml");

        assert!(write_default_file(&file_path).unwrap());
        assert_eq!(
            fs::read_to_string(&file_path).unwrap(),
            Settings::default_file_contents().unwrap()
        );

        // An existing file is left alone
        fs::write(&file_path, "fail_fast = true\n").unwrap();
        assert!(!write_default_file(&file_path).unwrap());
        assert_eq!(fs::read_to_string(&file_path).unwrap(), "fail_fast = true\n");
    }
}
