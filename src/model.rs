/// Core data types for the sunrise/sunset scraper and the rain report.
///
/// This module defines the shared domain model imported by all other modules:
/// measurement and day types, the per-year aggregate, the scraped almanac row,
/// and the error enums for each pipeline stage. It performs no I/O.

use std::fmt;
use std::path::PathBuf;

use chrono::{DateTime, NaiveDate, Utc, Weekday};
use chrono_tz::Tz;

// ---------------------------------------------------------------------------
// Rain constants
// ---------------------------------------------------------------------------

/// A day counts as rained when its summed measurements exceed this amount.
pub const DEFAULT_RAIN_THRESHOLD_MM: f64 = 0.1;

/// First local hour counted in daytime-only mode (inclusive).
pub const DEFAULT_DAYTIME_START_HOUR: u32 = 7;

/// First local hour no longer counted in daytime-only mode (exclusive).
pub const DEFAULT_DAYTIME_END_HOUR: u32 = 23;

// ---------------------------------------------------------------------------
// Measurement windows
// ---------------------------------------------------------------------------

/// Which part of each day contributes to the day's rain sum.
///
/// The report is always computed twice, once per window, and the two results
/// are joined per year only when the report rows are assembled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DayWindow {
    /// All measurements of the local calendar day.
    WholeDay,
    /// Only measurements inside [`DaytimeHours`]; the rest count as zero.
    Daytime,
}

impl DayWindow {
    pub const ALL: [DayWindow; 2] = [DayWindow::WholeDay, DayWindow::Daytime];
}

impl fmt::Display for DayWindow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DayWindow::WholeDay => write!(f, "whole-day"),
            DayWindow::Daytime => write!(f, "daytime"),
        }
    }
}

/// Local hour range `[start_hour, end_hour)` treated as daytime.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DaytimeHours {
    pub start_hour: u32,
    pub end_hour: u32,
}

impl DaytimeHours {
    /// `true` if a measurement taken at local `hour` counts as daytime.
    pub fn contains(&self, hour: u32) -> bool {
        hour >= self.start_hour && hour < self.end_hour
    }
}

impl Default for DaytimeHours {
    fn default() -> Self {
        DaytimeHours {
            start_hour: DEFAULT_DAYTIME_START_HOUR,
            end_hour: DEFAULT_DAYTIME_END_HOUR,
        }
    }
}

/// The two weekdays that make up the weekend.
///
/// Bucket keys number weekdays from Sunday (Sunday = 0 … Saturday = 6); this
/// type keeps the weekend membership explicit instead of relying on that
/// numbering.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WeekendDays(pub [Weekday; 2]);

impl WeekendDays {
    pub fn contains(&self, day: Weekday) -> bool {
        self.0.contains(&day)
    }
}

impl Default for WeekendDays {
    fn default() -> Self {
        WeekendDays([Weekday::Sat, Weekday::Sun])
    }
}

// ---------------------------------------------------------------------------
// Rain types
// ---------------------------------------------------------------------------

/// One raw rain gauge measurement.
#[derive(Debug, Clone, PartialEq)]
pub struct RainMeasurement {
    pub timestamp: DateTime<Utc>,
    pub value_mm: f64,
}

/// A local calendar day with its summed rain and the rained flag.
#[derive(Debug, Clone, PartialEq)]
pub struct DailyRainRecord {
    pub date: NaiveDate,
    pub sum_mm: f64,
    pub rained: bool,
}

/// Day count for one `(year, weekday, rained)` group.
///
/// `year_weekday` has the shape `"<YYYY>-<w>"` where `w` is the number of
/// days from Sunday. This is what the rain store returns; the in-memory
/// classifier produces the same shape via `analysis::weekday::bucket_days`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct BucketRow {
    pub year_weekday: String,
    pub rained: bool,
    pub number_of_days: i64,
}

/// Finalized week vs. weekend figures for one calendar year.
///
/// Only built by `analysis::weekday::YearTally::finalize`, after every bucket
/// of the year has been counted. A chance is `NaN` when its day count is 0.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct YearAggregate {
    pub wet_days_week: u64,
    pub total_days_week: u64,
    pub wet_days_weekend: u64,
    pub total_days_weekend: u64,
    pub chance_of_rain: f64,
    pub chance_of_rain_week: f64,
    pub chance_of_rain_weekend: f64,
    pub weekend_more_wet: bool,
}

impl YearAggregate {
    pub fn total_days(&self) -> u64 {
        self.total_days_week + self.total_days_weekend
    }

    pub fn total_wet_days(&self) -> u64 {
        self.wet_days_week + self.wet_days_weekend
    }
}

/// Wet days over total days. `NaN` for an empty bucket; never coerced to 0.
pub fn chance_of_rain(wet_days: u64, total_days: u64) -> f64 {
    wet_days as f64 / total_days as f64
}

// ---------------------------------------------------------------------------
// Sunrise / sunset types
// ---------------------------------------------------------------------------

/// One day of the almanac table, all times in the configured local zone.
#[derive(Debug, Clone, PartialEq)]
pub struct SunRow {
    pub date: DateTime<Tz>,
    pub sunrise_start: DateTime<Tz>,
    pub sunrise_end: DateTime<Tz>,
    pub sunset_start: DateTime<Tz>,
    pub sunset_end: DateTime<Tz>,
    pub duration_minutes: u32,
}

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

/// Coarse classification of every failure, used for logging and by callers
/// deciding whether to continue with the next unit of work.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Network failure or non-2xx response, database connection failure.
    Transport,
    /// Unexpected page shape, unparseable value, out-of-range duration.
    Parse,
    /// Malformed bucket key or mismatched year sets.
    DataIntegrity,
    /// Output file could not be created or written.
    Io,
    /// Invalid or unreadable configuration.
    Config,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ErrorKind::Transport => write!(f, "TRANSPORT"),
            ErrorKind::Parse => write!(f, "PARSE"),
            ErrorKind::DataIntegrity => write!(f, "DATA-INTEGRITY"),
            ErrorKind::Io => write!(f, "IO"),
            ErrorKind::Config => write!(f, "CONFIG"),
        }
    }
}

/// Failures writing a CSV output file.
#[derive(Debug, thiserror::Error)]
pub enum OutputError {
    #[error("cannot write {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("cannot write CSV {}: {source}", .path.display())]
    Csv {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },
}

/// Failures fetching or parsing one year of the almanac.
#[derive(Debug, thiserror::Error)]
pub enum ScrapeError {
    #[error("request to {url} failed: {source}")]
    Http {
        url: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("{url} returned HTTP {status}")]
    HttpStatus { url: String, status: u16, body: String },
    #[error("invalid CSS selector '{0}'")]
    Selector(String),
    #[error("cannot parse {field} '{value}': {reason} (row: {fragment})")]
    InvalidField {
        field: &'static str,
        value: String,
        reason: String,
        fragment: String,
    },
    #[error("duration of {minutes} minutes outside allowed range of 1 to 120 (row: {fragment})")]
    DurationOutOfRange { minutes: u32, fragment: String },
    #[error(transparent)]
    Output(#[from] OutputError),
}

impl ScrapeError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            ScrapeError::Http { .. } | ScrapeError::HttpStatus { .. } => ErrorKind::Transport,
            ScrapeError::Selector(_)
            | ScrapeError::InvalidField { .. }
            | ScrapeError::DurationOutOfRange { .. } => ErrorKind::Parse,
            ScrapeError::Output(_) => ErrorKind::Io,
        }
    }
}

/// Failures reading day buckets from a rain store.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] postgres::Error),
    #[error("cannot read {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("cannot parse {}: {source}", .path.display())]
    Csv {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },
    #[error("invalid measurement on line {line}: {reason} ('{value}')")]
    InvalidMeasurement {
        line: u64,
        value: String,
        reason: String,
    },
}

impl StoreError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            StoreError::Database(_) => ErrorKind::Transport,
            StoreError::Io { .. } => ErrorKind::Io,
            StoreError::Csv { .. } | StoreError::InvalidMeasurement { .. } => ErrorKind::Parse,
        }
    }
}

/// Failures turning day buckets into per-year aggregates.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AnalysisError {
    #[error("format year-weekday expected, got '{0}'")]
    MalformedYearWeekday(String),
    #[error("negative day count {count} for bucket '{key}'")]
    NegativeDayCount { key: String, count: i64 },
}

impl AnalysisError {
    pub fn kind(&self) -> ErrorKind {
        ErrorKind::DataIntegrity
    }
}

/// Failures building or writing the week vs. weekend report.
#[derive(Debug, thiserror::Error)]
pub enum ReportError {
    #[error("failed to fetch {window} rain data: {source}")]
    Store {
        window: DayWindow,
        #[source]
        source: StoreError,
    },
    #[error("failed to aggregate {window} rain data: {source}")]
    Analysis {
        window: DayWindow,
        #[source]
        source: AnalysisError,
    },
    #[error("year {year} is missing from the {missing_from} aggregate")]
    MissingYear { year: i32, missing_from: DayWindow },
    #[error(transparent)]
    Output(#[from] OutputError),
}

impl ReportError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            ReportError::Store { source, .. } => source.kind(),
            ReportError::Analysis { source, .. } => source.kind(),
            ReportError::MissingYear { .. } => ErrorKind::DataIntegrity,
            ReportError::Output(_) => ErrorKind::Io,
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
