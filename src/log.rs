//! Logging for powerprep runs.
//!
//! Messages go to the console and, for runs which write results, to two log files in the output
//! folder: one with the progress of the run and one with its warnings and errors. The level comes
//! from the `POWERPREP_LOG_LEVEL` environment variable or, failing that, from the settings file.
use anyhow::{Context, Result, anyhow};
use chrono::Local;
use fern::colors::{Color, ColoredLevelConfig};
use fern::{Dispatch, FormatCallback};
use log::{LevelFilter, Record};
use std::env;
use std::fmt::{Arguments, Display};
use std::fs::{File, OpenOptions};
use std::io::IsTerminal;
use std::path::Path;
use std::str::FromStr;
use std::sync::OnceLock;

/// A flag indicating whether the logger has been initialised
static LOGGER_INIT: OnceLock<()> = OnceLock::new();

/// The log level used if neither the environment nor the settings give one
pub const DEFAULT_LOG_LEVEL: &str = "info";

/// The environment variable which overrides the log level
const LOG_LEVEL_ENV_VAR: &str = "POWERPREP_LOG_LEVEL";

/// Progress messages of a run
const LOG_INFO_FILE_NAME: &str = "powerprep_info.log";

/// Warnings and errors of a run
const LOG_ERROR_FILE_NAME: &str = "powerprep_error.log";

/// Whether the program logger has been initialised
pub fn is_logger_initialised() -> bool {
    LOGGER_INIT.get().is_some()
}

/// Parse a log level name, ignoring case
pub fn parse_log_level(log_level: &str) -> Result<LevelFilter> {
    LevelFilter::from_str(log_level.trim()).map_err(|_| {
        anyhow!("Unknown log level: {log_level}. Expected off, error, warn, info, debug or trace")
    })
}

/// The level to log at: the environment variable if set, otherwise the given setting
fn resolve_log_level(log_level_from_settings: &str) -> Result<LevelFilter> {
    match env::var(LOG_LEVEL_ENV_VAR) {
        Ok(log_level) => {
            parse_log_level(&log_level).with_context(|| format!("Invalid {LOG_LEVEL_ENV_VAR}"))
        }
        Err(_) => parse_log_level(log_level_from_settings),
    }
}

/// Initialise the program logger.
///
/// # Arguments
///
/// * `log_level_from_settings`: The log level given in `settings.toml`
/// * `log_dir`: The folder to write log files to, if any
pub fn init(log_level_from_settings: &str, log_dir: Option<&Path>) -> Result<()> {
    let log_level = resolve_log_level(log_level_from_settings)?;

    let mut dispatch = console_dispatch(log_level);
    if let Some(log_dir) = log_dir {
        dispatch = dispatch.chain(file_dispatch(log_level, log_dir)?);
    }

    dispatch.apply().context("Logger already initialised")?;
    LOGGER_INIT.get_or_init(|| ());

    Ok(())
}

/// Progress to stdout, warnings and errors to stderr, coloured if writing to a terminal
fn console_dispatch(log_level: LevelFilter) -> Dispatch {
    let colours = ColoredLevelConfig::new()
        .error(Color::Red)
        .warn(Color::Yellow)
        .info(Color::Green)
        .debug(Color::Blue)
        .trace(Color::Magenta);
    let use_colour_stdout = std::io::stdout().is_terminal();
    let use_colour_stderr = std::io::stderr().is_terminal();

    Dispatch::new()
        .chain(
            Dispatch::new()
                .filter(|metadata| metadata.level() > LevelFilter::Warn)
                .format(move |out, message, record| {
                    write_log_colour(out, message, record, use_colour_stdout, &colours);
                })
                .level(log_level)
                .chain(std::io::stdout()),
        )
        .chain(
            Dispatch::new()
                .format(move |out, message, record| {
                    write_log_colour(out, message, record, use_colour_stderr, &colours);
                })
                .level(log_level.min(LevelFilter::Warn))
                .chain(std::io::stderr()),
        )
}

/// The two log files in `log_dir`.
///
/// The info file records at least `info` messages whatever the console level, so that a quiet run
/// still leaves a record of what it did.
fn file_dispatch(log_level: LevelFilter, log_dir: &Path) -> Result<Dispatch> {
    let create = |file_name: &str| -> Result<File> {
        let file_path = log_dir.join(file_name);
        OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(true)
            .open(&file_path)
            .with_context(|| format!("Could not create log file {}", file_path.display()))
    };

    Ok(Dispatch::new()
        .format(write_log_plain)
        .chain(
            Dispatch::new()
                .filter(|metadata| metadata.level() > LevelFilter::Warn)
                .level(log_level.max(LevelFilter::Info))
                .chain(create(LOG_INFO_FILE_NAME)?),
        )
        .chain(
            Dispatch::new()
                .level(LevelFilter::Warn)
                .chain(create(LOG_ERROR_FILE_NAME)?),
        ))
}

/// Format a log line as `[time level target] message`
fn write_log<T: Display>(out: FormatCallback, level: T, target: &str, message: &Arguments) {
    let timestamp = Local::now().format("%H:%M:%S");

    out.finish(format_args!("[{timestamp} {level} {target}] {message}"));
}

fn write_log_plain(out: FormatCallback, message: &Arguments, record: &Record) {
    write_log(out, record.level(), record.target(), message);
}

fn write_log_colour(
    out: FormatCallback,
    message: &Arguments,
    record: &Record,
    use_colour: bool,
    colours: &ColoredLevelConfig,
) {
    if use_colour {
        write_log(out, colours.color(record.level()), record.target(), message);
    } else {
        write_log_plain(out, message, record);
    }
}
