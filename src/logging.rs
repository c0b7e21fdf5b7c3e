/// Structured logging for the scraper and report pipelines.
///
/// A `log::Log` backend that tags every message with its data source and,
/// where there is one, the unit of work (a year or a file path). Supports
/// console output and an append-only log file for batch runs.
///
/// Library code logs through the `log` macros with one of the `target`s
/// below (`log::info!(target: "sun", ...)`) or through the helpers in this
/// module; the binary installs the backend once with [`init_logger`].

use chrono::Utc;
use log::{Level, LevelFilter, Log, Metadata, Record};
use std::fmt;
use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use crate::model::ErrorKind;

// ---------------------------------------------------------------------------
// Data Source Types
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DataSource {
    /// Sunrise/sunset almanac scraping.
    Sun,
    /// Rain measurement reading and classification.
    Rain,
    /// PostgreSQL rain store.
    Database,
    /// Report assembly and output.
    Report,
    System,
}

impl DataSource {
    /// The `log` target used for this source.
    pub fn target(&self) -> &'static str {
        match self {
            DataSource::Sun => "sun",
            DataSource::Rain => "rain",
            DataSource::Database => "db",
            DataSource::Report => "report",
            DataSource::System => "sys",
        }
    }

    pub fn from_target(target: &str) -> Option<DataSource> {
        match target {
            "sun" => Some(DataSource::Sun),
            "rain" => Some(DataSource::Rain),
            "db" => Some(DataSource::Database),
            "report" => Some(DataSource::Report),
            "sys" => Some(DataSource::System),
            _ => None,
        }
    }
}

impl fmt::Display for DataSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DataSource::Sun => write!(f, "SUN"),
            DataSource::Rain => write!(f, "RAIN"),
            DataSource::Database => write!(f, "DB"),
            DataSource::Report => write!(f, "REPORT"),
            DataSource::System => write!(f, "SYS"),
        }
    }
}

// ---------------------------------------------------------------------------
// Logger Configuration
// ---------------------------------------------------------------------------

pub struct Logger {
    /// Minimum log level to display
    min_level: LevelFilter,
    /// Optional file path for logging
    log_file: Option<PathBuf>,
    /// Whether to include timestamps in console output
    console_timestamps: bool,
    /// Serializes appends to `log_file`
    file_lock: Mutex<()>,
}

impl Logger {
    pub fn new(min_level: LevelFilter, log_file: Option<PathBuf>, console_timestamps: bool) -> Self {
        Logger {
            min_level,
            log_file,
            console_timestamps,
            file_lock: Mutex::new(()),
        }
    }

    /// The single-line form written to the log file.
    fn format_entry(level: Level, source: &str, message: &str) -> String {
        format!(
            "{} {:<5} {}: {}",
            Utc::now().format("%Y-%m-%d %H:%M:%S UTC"),
            level,
            source,
            message
        )
    }

    fn append_to_file(&self, path: &Path, entry: &str) -> std::io::Result<()> {
        let _guard = self.file_lock.lock().unwrap_or_else(|e| e.into_inner());
        let mut file = OpenOptions::new().create(true).append(true).open(path)?;
        writeln!(file, "{}", entry)?;
        Ok(())
    }
}

impl Log for Logger {
    fn enabled(&self, metadata: &Metadata<'_>) -> bool {
        if metadata.level() > self.min_level {
            return false;
        }
        // Dependency crates only get through with warnings and errors.
        DataSource::from_target(metadata.target()).is_some() || metadata.level() <= Level::Warn
    }

    fn log(&self, record: &Record<'_>) {
        if !self.enabled(record.metadata()) {
            return;
        }

        let level = record.level();
        let source = DataSource::from_target(record.target())
            .map(|s| s.to_string())
            .unwrap_or_else(|| record.target().to_string());
        let message = record.args().to_string();
        let entry = Self::format_entry(level, &source, &message);

        // Console output
        if self.console_timestamps {
            match level {
                Level::Error | Level::Warn => eprintln!("{}", entry),
                _ => println!("{}", entry),
            }
        } else {
            match level {
                Level::Error => eprintln!("   ✗ {}: {}", source, message),
                Level::Warn => eprintln!("   ⚠ {}: {}", source, message),
                Level::Info => println!("   {}", message),
                Level::Debug | Level::Trace => println!("   [DEBUG] {}: {}", source, message),
            }
        }

        // File output
        if let Some(ref path) = self.log_file {
            if let Err(e) = self.append_to_file(path, &entry) {
                eprintln!("Failed to write to log file {}: {}", path.display(), e);
            }
        }
    }

    fn flush(&self) {}
}

// ---------------------------------------------------------------------------
// Public Logging Functions
// ---------------------------------------------------------------------------

/// Installs the service logger. Fails if a logger is already installed.
pub fn init_logger(
    min_level: LevelFilter,
    log_file: Option<&Path>,
    console_timestamps: bool,
) -> Result<(), log::SetLoggerError> {
    let logger = Logger::new(min_level, log_file.map(Path::to_path_buf), console_timestamps);
    log::set_boxed_logger(Box::new(logger))?;
    log::set_max_level(min_level);
    Ok(())
}

/// Prefixes `message` with the unit of work, if any: `[2015] message`.
pub fn with_key(key: Option<&str>, message: &str) -> String {
    match key {
        Some(key) => format!("[{}] {}", key, message),
        None => message.to_string(),
    }
}

/// Log a general informational message
pub fn info(source: DataSource, key: Option<&str>, message: &str) {
    log::info!(target: source.target(), "{}", with_key(key, message));
}

/// Log a warning message
pub fn warn(source: DataSource, key: Option<&str>, message: &str) {
    log::warn!(target: source.target(), "{}", with_key(key, message));
}

/// Log an error message
pub fn error(source: DataSource, key: Option<&str>, message: &str) {
    log::error!(target: source.target(), "{}", with_key(key, message));
}

/// Log a debug message
pub fn debug(source: DataSource, key: Option<&str>, message: &str) {
    log::debug!(target: source.target(), "{}", with_key(key, message));
}

// ---------------------------------------------------------------------------
// Structured Failure Logging
// ---------------------------------------------------------------------------

/// Renders an error with its whole `source()` chain.
pub fn error_chain(err: &dyn std::error::Error) -> String {
    let mut message = err.to_string();
    let mut cause = err.source();
    while let Some(inner) = cause {
        let text = inner.to_string();
        // thiserror messages often embed their source already.
        if !message.contains(&text) {
            message.push_str(": ");
            message.push_str(&text);
        }
        cause = inner.source();
    }
    message
}

/// Formats a failure line: `<operation> failed [<KIND>]: <error chain>`.
pub fn failure_message(operation: &str, kind: ErrorKind, err: &dyn std::error::Error) -> String {
    format!("{} failed [{}]: {}", operation, kind, error_chain(err))
}

/// Log a failed unit of work with its classification.
///
/// Transport failures are usually transient and logged as warnings; every
/// other kind points at bad data or a bad setup and is logged as an error.
pub fn log_failure(
    source: DataSource,
    key: Option<&str>,
    operation: &str,
    kind: ErrorKind,
    err: &dyn std::error::Error,
) {
    let message = failure_message(operation, kind, err);
    match failure_level(kind) {
        Level::Warn => warn(source, key, &message),
        _ => error(source, key, &message),
    }
}

pub fn failure_level(kind: ErrorKind) -> Level {
    match kind {
        ErrorKind::Transport => Level::Warn,
        ErrorKind::Parse | ErrorKind::DataIntegrity | ErrorKind::Io | ErrorKind::Config => {
            Level::Error
        }
    }
}

// ---------------------------------------------------------------------------
// Run Summary Logging
// ---------------------------------------------------------------------------

/// Log a summary of a batch run
pub fn log_run_summary(source: DataSource, total: usize, successful: usize, failed: usize) {
    let message = format!(
        "Run complete: {}/{} successful, {} failed",
        successful, total, failed
    );

    if failed == 0 {
        info(source, None, &message);
    } else if successful == 0 {
        error(source, None, &message);
    } else {
        warn(source, None, &message);
    }
}
