//! # Logger
//!
//! Log lines go to the terminal and to the session log file. Every line is stamped with the time
//! since the session epoch and the control tick it was emitted during, so that a line in the log
//! can be matched to a row of the telemetry archive.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External imports
use colored::{ColoredString, Colorize};
use log::{self, info};
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use thiserror::Error;

// Internal imports
use crate::session;

// Re-exports
pub use log::LevelFilter;

// ---------------------------------------------------------------------------
// STATICS
// ---------------------------------------------------------------------------

/// Control tick shown in each log line.
static CURRENT_TICK: AtomicU64 = AtomicU64::new(0);

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

/// Errors associated with initialising the logger.
#[derive(Debug, Error)]
pub enum LoggerInitError {
    #[error("Expected a log level at least as verbose as `INFO`, found `{0}`")]
    InvalidMinLogLevel(log::LevelFilter),

    #[error("Error initialising the log file: {0}")]
    LogFileInitError(std::io::Error),

    #[error("A logger has already been set: {0}")]
    FernInitError(log::SetLoggerError),
}

// ---------------------------------------------------------------------------
// PUBLIC FUNCTIONS
// ---------------------------------------------------------------------------

/// Initialise the logger for this execution.
///
/// `min_level` must be at least as verbose as `INFO`. Only the first call in a process can
/// succeed.
pub fn logger_init(
    min_level: LevelFilter,
    session: &session::Session,
) -> Result<(), LoggerInitError> {
    if min_level < log::Level::Info {
        return Err(LoggerInitError::InvalidMinLogLevel(min_level));
    }

    let log_file = fern::log_file(&session.log_file_path)
        .map_err(LoggerInitError::LogFileInitError)?;

    // Colour codes only make sense on the terminal
    let console = fern::Dispatch::new()
        .format(|out, message, record| {
            out.finish(format_args!("{}", Line::new(message, record, true)))
        })
        .chain(std::io::stdout());
    let file = fern::Dispatch::new()
        .format(|out, message, record| {
            out.finish(format_args!("{}", Line::new(message, record, false)))
        })
        .chain(log_file);

    fern::Dispatch::new()
        .level(min_level)
        .chain(console)
        .chain(file)
        .apply()
        .map_err(LoggerInitError::FernInitError)?;

    info!("Logging initialised");
    if let Some(epoch) = session::get_epoch() {
        info!("    Session epoch: {}", epoch);
    }
    info!("    Log level: {:?}", min_level);
    info!("    Log file path: {:?}", session.log_file_path);

    Ok(())
}

/// Set the control tick reported in subsequent log lines.
pub fn set_tick(tick: u64) {
    CURRENT_TICK.store(tick, Ordering::Relaxed);
}

// ---------------------------------------------------------------------------
// PRIVATE ITEMS
// ---------------------------------------------------------------------------

/// One formatted log line.
struct Line<'a> {
    time_s: f64,
    tick: u64,
    level: log::Level,
    target: &'a str,
    message: &'a fmt::Arguments<'a>,
    colour: bool,
}

impl<'a> Line<'a> {
    fn new(message: &'a fmt::Arguments<'a>, record: &'a log::Record, colour: bool) -> Self {
        Self {
            time_s: session::get_elapsed_seconds(),
            tick: CURRENT_TICK.load(Ordering::Relaxed),
            level: record.level(),
            target: record.target(),
            message,
            colour,
        }
    }
}

impl<'a> fmt::Display for Line<'a> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{:10.6} #{:06} {}] ",
            self.time_s,
            self.tick,
            level_tag(self.level, self.colour)
        )?;

        // Debug and trace lines name the module they came from
        if self.level > log::Level::Info {
            write!(f, "{}: ", self.target)?;
        }

        write!(f, "{}", self.message)
    }
}

/// Short tag for a log level.
fn level_tag(level: log::Level, colour: bool) -> ColoredString {
    let tag = match level {
        log::Level::Trace => "TRC",
        log::Level::Debug => "DBG",
        log::Level::Info => "INF",
        log::Level::Warn => "WRN",
        log::Level::Error => "ERR",
    };

    if !colour {
        return tag.normal();
    }

    match level {
        log::Level::Trace => tag.dimmed().italic(),
        log::Level::Debug => tag.dimmed(),
        log::Level::Info => tag.normal(),
        log::Level::Warn => tag.yellow(),
        log::Level::Error => tag.red().bold(),
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_plain_line() {
        let line = Line {
            time_s: 1.5,
            tick: 75,
            level: log::Level::Info,
            target: "swerve_lib::robot",
            message: &format_args!("Mode change"),
            colour: false,
        }
        .to_string();

        assert_eq!(line, "[  1.500000 #000075 INF] Mode change");
    }

    #[test]
    fn test_debug_line_has_target() {
        let line = Line {
            time_s: 0.0,
            tick: 3,
            level: log::Level::Debug,
            target: "swerve_lib::loco_ctrl",
            message: &format_args!("Module speeds desaturated"),
            colour: false,
        }
        .to_string();

        assert_eq!(
            line,
            "[  0.000000 #000003 DBG] swerve_lib::loco_ctrl: Module speeds desaturated"
        );
    }
}
