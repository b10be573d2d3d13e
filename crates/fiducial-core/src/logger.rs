//! Process-wide logging for the detector crates and the CLI.
//!
//! [`init_with_level`] installs a stderr logger writing
//! `[elapsed LEVEL crate] message`. Records from the `fiducial*` crates pass
//! at the requested level; records from any other crate are held to `warn`
//! or quieter. The level can also come from the `FIDUCIAL_LOG` environment
//! variable (`error`, `warn`, `info`, `debug`, `trace`, `off`).

use std::fmt;
use std::io::Write;
use std::sync::OnceLock;
use std::time::Instant;

use log::{Level, LevelFilter, Log, Metadata, Record};
use thiserror::Error;

#[cfg(feature = "tracing")]
use tracing_subscriber::fmt::format::FmtSpan;
#[cfg(feature = "tracing")]
use tracing_subscriber::util::SubscriberInitExt;
#[cfg(feature = "tracing")]
use tracing_subscriber::{fmt as tracing_fmt, EnvFilter};

pub const LOG_ENV: &str = "FIDUCIAL_LOG";

/// Targets starting with this prefix get the requested level.
const OWN_TARGET_PREFIX: &str = "fiducial";

#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum LoggerError {
    #[error("another global logger is already installed")]
    AlreadyInstalled,
}

struct StderrLogger {
    level: LevelFilter,
    started: Instant,
}

impl StderrLogger {
    fn new(level: LevelFilter) -> Self {
        Self {
            level,
            started: Instant::now(),
        }
    }

    fn threshold(&self, target: &str) -> LevelFilter {
        if target.starts_with(OWN_TARGET_PREFIX) {
            self.level
        } else {
            self.level.min(LevelFilter::Warn)
        }
    }
}

/// First path segment of a log target: `fiducial_aruco::detector` -> `fiducial_aruco`.
fn crate_of(target: &str) -> &str {
    target.split("::").next().unwrap_or(target)
}

fn format_line(elapsed: f64, level: Level, target: &str, args: &fmt::Arguments<'_>) -> String {
    format!("[{:7.3}s {:>5} {}] {}", elapsed, level, crate_of(target), args)
}

impl Log for StderrLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= self.threshold(metadata.target())
    }

    fn log(&self, record: &Record) {
        if !self.enabled(record.metadata()) {
            return;
        }
        let line = format_line(
            self.started.elapsed().as_secs_f64(),
            record.level(),
            record.target(),
            record.args(),
        );
        let _ = writeln!(std::io::stderr().lock(), "{line}");
    }

    fn flush(&self) {
        let _ = std::io::stderr().flush();
    }
}

static LOGGER: OnceLock<StderrLogger> = OnceLock::new();

/// Install the stderr logger. Repeated calls keep the first level and succeed;
/// a logger installed by someone else is an error.
pub fn init_with_level(level: LevelFilter) -> Result<(), LoggerError> {
    if LOGGER.get().is_some() {
        return Ok(());
    }
    let logger = LOGGER.get_or_init(|| StderrLogger::new(level));
    log::set_logger(logger).map_err(|_| LoggerError::AlreadyInstalled)?;
    log::set_max_level(logger.level);
    Ok(())
}

/// Parse a level name; unknown names yield `None`.
pub fn parse_level(name: &str) -> Option<LevelFilter> {
    name.trim().parse().ok()
}

/// Level from `FIDUCIAL_LOG`, `Info` when unset or unparsable.
pub fn level_from_env() -> LevelFilter {
    std::env::var(LOG_ENV)
        .ok()
        .and_then(|v| parse_level(&v))
        .unwrap_or(LevelFilter::Info)
}

/// `tracing` subscriber filtered by `FIDUCIAL_LOG` (an `EnvFilter` directive),
/// with span close events so per-frame timings show up.
#[cfg(feature = "tracing")]
pub fn init_tracing(json: bool) {
    let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = tracing_fmt()
        .with_env_filter(filter)
        .with_span_events(FmtSpan::CLOSE);
    let _ = if json {
        builder.json().flatten_event(true).finish().try_init()
    } else {
        builder.with_timer(tracing_fmt::time::Uptime::default()).finish().try_init()
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    fn meta(level: Level, target: &str) -> Metadata<'_> {
        Metadata::builder().level(level).target(target).build()
    }

    #[test]
    fn level_names_parse_case_insensitively() {
        assert_eq!(parse_level("debug"), Some(LevelFilter::Debug));
        assert_eq!(parse_level(" WARN "), Some(LevelFilter::Warn));
        assert_eq!(parse_level("off"), Some(LevelFilter::Off));
        assert_eq!(parse_level("loud"), None);
    }

    #[test]
    fn foreign_targets_are_capped_at_warn() {
        let logger = StderrLogger::new(LevelFilter::Debug);
        assert!(logger.enabled(&meta(Level::Debug, "fiducial_aruco::detector")));
        assert!(logger.enabled(&meta(Level::Info, "fiducial")));
        assert!(!logger.enabled(&meta(Level::Info, "png::decoder")));
        assert!(logger.enabled(&meta(Level::Warn, "png::decoder")));
        assert!(!logger.enabled(&meta(Level::Trace, "fiducial_core")));

        let quiet = StderrLogger::new(LevelFilter::Error);
        assert!(!quiet.enabled(&meta(Level::Warn, "png::decoder")));
    }

    #[test]
    fn lines_carry_elapsed_level_and_crate() {
        let line = format_line(0.25, Level::Warn, "fiducial_board::detector", &format_args!("{} markers", 3));
        assert_eq!(line, "[  0.250s  WARN fiducial_board] 3 markers");
        assert_eq!(crate_of("fiducial"), "fiducial");
    }
}
