//! # Logger
//!
//! Every executable logs through the `log` facade into `fern`, which writes each line to stdout
//! and to the session's `<exec>.log`. Lines look like
//!
//! ```text
//! [  12.345678 WRN] Could not read the IMU, assuming no drift: ...
//! ```
//!
//! with the record's target added after the level tag for debug and trace lines.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use colored::{ColoredString, Colorize};
use log::{info, Level, Record};
use std::fmt;
use thiserror::Error;

use crate::session;

pub use log::LevelFilter;

// ------------------------------------------------------------------------------------------------
// CONSTANTS
// ------------------------------------------------------------------------------------------------

/// Dependencies whose debug output would drown the drive loop's, capped at `Info`.
const QUIET_TARGETS: [&str; 2] = ["zmq", "gilrs"];

// ------------------------------------------------------------------------------------------------
// ENUMS
// ------------------------------------------------------------------------------------------------

#[derive(Debug, Error)]
pub enum LoggerInitError {
    #[error("The log level must be `Info` or more verbose, found `{0}`")]
    InvalidMinLogLevel(LevelFilter),

    #[error("Could not open the log file: {0}")]
    LogFileInitError(std::io::Error),

    #[error("A logger is already set: {0}")]
    FernInitError(log::SetLoggerError),
}

// ------------------------------------------------------------------------------------------------
// PUBLIC FUNCTIONS
// ------------------------------------------------------------------------------------------------

/// Start logging for this session. Must only be called once per process.
///
/// `min_level` may not be less verbose than `Info`, since the drive loop's state changes are
/// logged at `Info` and must reach the log file.
pub fn logger_init(
    min_level: LevelFilter,
    session: &session::Session,
) -> Result<(), LoggerInitError> {
    check_min_level(min_level)?;

    let log_file =
        fern::log_file(&session.log_file_path).map_err(LoggerInitError::LogFileInitError)?;

    let mut dispatch = fern::Dispatch::new()
        .format(|out, message, record| {
            out.finish(format_args!(
                "{}",
                Line::new(session::get_elapsed_seconds(), record, message)
            ))
        })
        .level(min_level);

    for target in QUIET_TARGETS.iter() {
        dispatch = dispatch.level_for(*target, LevelFilter::Info);
    }

    dispatch
        .chain(std::io::stdout())
        .chain(log_file)
        .apply()
        .map_err(LoggerInitError::FernInitError)?;

    info!("Logging to {:?} at {:?}", session.log_file_path, min_level);
    info!("Session epoch {}", session::get_epoch());

    Ok(())
}

// ------------------------------------------------------------------------------------------------
// PRIVATE
// ------------------------------------------------------------------------------------------------

fn check_min_level(min_level: LevelFilter) -> Result<(), LoggerInitError> {
    if min_level < Level::Info {
        Err(LoggerInitError::InvalidMinLogLevel(min_level))
    } else {
        Ok(())
    }
}

/// One formatted log line.
struct Line<'a> {
    elapsed_s: f64,
    level: Level,
    target: &'a str,
    message: &'a fmt::Arguments<'a>,
}

impl<'a> Line<'a> {
    fn new(elapsed_s: f64, record: &'a Record, message: &'a fmt::Arguments<'a>) -> Self {
        Self {
            elapsed_s,
            level: record.level(),
            target: record.target(),
            message,
        }
    }
}

impl<'a> fmt::Display for Line<'a> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "[{:10.6} {}] ", self.elapsed_s, level_tag(self.level))?;

        if self.level > Level::Info {
            write!(f, "{}: ", self.target)?;
        }

        write!(f, "{}", self.message)
    }
}

fn level_tag(level: Level) -> ColoredString {
    match level {
        Level::Trace => "TRC".dimmed().italic(),
        Level::Debug => "DBG".dimmed(),
        Level::Info => "INF".normal(),
        Level::Warn => "WRN".yellow(),
        Level::Error => "ERR".red().bold(),
    }
}
