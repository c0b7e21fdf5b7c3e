/// Service configuration.
///
/// Loaded from a TOML file (default `sunrain.toml`). Every field has a
/// built-in default, so a missing file or a partial file is fine:
///
/// ```toml
/// timezone = "Europe/Brussels"
///
/// [sun]
/// from_year = 2011
/// to_year = 2022
/// output_dir = "./data/sunrise_sunset"
///
/// [rain]
/// threshold_mm = 0.1
/// weekend = ["Saturday", "Sunday"]
/// source = "postgres"
///
/// [report]
/// output_dir = "./reports"
/// locale = "en"
/// ```
///
/// The database connection string is never stored in the file; it comes from
/// `DATABASE_URL` (a `.env` file is honoured).

use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use chrono::Weekday;
use chrono_tz::Tz;
use serde::Deserialize;

use crate::ingest::sun::DEFAULT_URL_TEMPLATE;
use crate::model::{
    DaytimeHours, ErrorKind, WeekendDays, DEFAULT_DAYTIME_END_HOUR, DEFAULT_DAYTIME_START_HOUR,
    DEFAULT_RAIN_THRESHOLD_MM,
};
use crate::report::ReportLocale;
use crate::store::DEFAULT_RAIN_TABLE;

pub const DEFAULT_CONFIG_PATH: &str = "sunrain.toml";
pub const DEFAULT_TIMEZONE: &str = "Europe/Brussels";
pub const DATABASE_URL_VAR: &str = "DATABASE_URL";

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("cannot read config {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid config {}: {source}", .path.display())]
    Toml {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
    #[error("invalid config: {0}")]
    Invalid(String),
    #[error("environment variable {0} must be set")]
    MissingEnv(&'static str),
}

impl ConfigError {
    pub fn kind(&self) -> ErrorKind {
        ErrorKind::Config
    }
}

// ---------------------------------------------------------------------------
// File layout
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// IANA timezone used for local dates and hours in both pipelines.
    pub timezone: String,
    pub sun: SunConfig,
    pub rain: RainConfig,
    pub report: ReportConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SunConfig {
    /// Page URL with a `{year}` placeholder.
    pub url_template: String,
    pub from_year: i32,
    pub to_year: i32,
    pub output_dir: PathBuf,
    pub request_timeout_secs: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum SourceKind {
    Postgres,
    Csv,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RainConfig {
    pub threshold_mm: f64,
    pub daytime_start_hour: u32,
    pub daytime_end_hour: u32,
    /// Weekday names, e.g. `["Saturday", "Sunday"]` or `["Sat", "Sun"]`.
    pub weekend: Vec<String>,
    pub source: SourceKind,
    /// Table read by the postgres source.
    pub table: String,
    /// File read by the csv source.
    pub measurements_path: PathBuf,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ReportConfig {
    pub output_dir: PathBuf,
    pub file_name: String,
    pub locale: ReportLocale,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            timezone: DEFAULT_TIMEZONE.to_string(),
            sun: SunConfig::default(),
            rain: RainConfig::default(),
            report: ReportConfig::default(),
        }
    }
}

impl Default for SunConfig {
    fn default() -> Self {
        SunConfig {
            url_template: DEFAULT_URL_TEMPLATE.to_string(),
            from_year: 2011,
            to_year: 2022,
            output_dir: PathBuf::from("./data/sunrise_sunset"),
            request_timeout_secs: 30,
        }
    }
}

impl Default for RainConfig {
    fn default() -> Self {
        RainConfig {
            threshold_mm: DEFAULT_RAIN_THRESHOLD_MM,
            daytime_start_hour: DEFAULT_DAYTIME_START_HOUR,
            daytime_end_hour: DEFAULT_DAYTIME_END_HOUR,
            weekend: vec!["Saturday".to_string(), "Sunday".to_string()],
            source: SourceKind::Postgres,
            table: DEFAULT_RAIN_TABLE.to_string(),
            measurements_path: PathBuf::from("./data/rain.csv"),
        }
    }
}

impl Default for ReportConfig {
    fn default() -> Self {
        ReportConfig {
            output_dir: PathBuf::from("./reports"),
            file_name: "week_vs_weekend.csv".to_string(),
            locale: ReportLocale::En,
        }
    }
}

// ---------------------------------------------------------------------------
// Loading
// ---------------------------------------------------------------------------

impl Config {
    /// Loads and validates the config at `path`. A missing file yields the
    /// defaults; an unreadable or invalid one is an error.
    pub fn load(path: &Path) -> Result<Config, ConfigError> {
        if !path.exists() {
            log::info!(
                target: "sys",
                "[{}] no config file, using defaults",
                path.display()
            );
            return Ok(Config::default());
        }

        let text = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let config: Config = toml::from_str(&text).map_err(|source| ConfigError::Toml {
            path: path.to_path_buf(),
            source,
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Checks every field that cannot be expressed in the TOML types alone.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.tz()?;
        self.weekend_days()?;
        self.daytime_hours()?;

        if self.sun.from_year > self.sun.to_year {
            return Err(ConfigError::Invalid(format!(
                "sun.from_year ({}) is after sun.to_year ({})",
                self.sun.from_year, self.sun.to_year
            )));
        }
        if !self.sun.url_template.contains("{year}") {
            return Err(ConfigError::Invalid(
                "sun.url_template must contain a {year} placeholder".to_string(),
            ));
        }
        if !self.rain.threshold_mm.is_finite() || self.rain.threshold_mm < 0.0 {
            return Err(ConfigError::Invalid(format!(
                "rain.threshold_mm must be a non-negative number, got {}",
                self.rain.threshold_mm
            )));
        }
        if !is_plain_identifier(&self.rain.table) {
            return Err(ConfigError::Invalid(format!(
                "rain.table '{}' must be a plain SQL identifier",
                self.rain.table
            )));
        }
        if self.report.file_name.trim().is_empty() {
            return Err(ConfigError::Invalid("report.file_name is empty".to_string()));
        }
        Ok(())
    }

    pub fn tz(&self) -> Result<Tz, ConfigError> {
        self.timezone.parse::<Tz>().map_err(|e| {
            ConfigError::Invalid(format!("unknown timezone '{}': {}", self.timezone, e))
        })
    }

    pub fn weekend_days(&self) -> Result<WeekendDays, ConfigError> {
        let days = self
            .rain
            .weekend
            .iter()
            .map(|name| {
                name.parse::<Weekday>().map_err(|_| {
                    ConfigError::Invalid(format!("rain.weekend: unknown weekday '{}'", name))
                })
            })
            .collect::<Result<Vec<_>, _>>()?;

        match days.as_slice() {
            [first, second] if first != second => Ok(WeekendDays([*first, *second])),
            _ => Err(ConfigError::Invalid(format!(
                "rain.weekend must name two different weekdays, got {:?}",
                self.rain.weekend
            ))),
        }
    }

    pub fn daytime_hours(&self) -> Result<DaytimeHours, ConfigError> {
        let hours = DaytimeHours {
            start_hour: self.rain.daytime_start_hour,
            end_hour: self.rain.daytime_end_hour,
        };
        if hours.start_hour >= hours.end_hour || hours.end_hour > 24 {
            return Err(ConfigError::Invalid(format!(
                "daytime hours must satisfy start < end <= 24, got {}..{}",
                hours.start_hour, hours.end_hour
            )));
        }
        Ok(hours)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.sun.request_timeout_secs)
    }

    pub fn report_path(&self) -> PathBuf {
        self.report.output_dir.join(&self.report.file_name)
    }
}

/// Reads `DATABASE_URL`, loading `.env` first if present.
pub fn database_url() -> Result<String, ConfigError> {
    dotenv::dotenv().ok();
    env::var(DATABASE_URL_VAR).map_err(|_| ConfigError::MissingEnv(DATABASE_URL_VAR))
}

fn is_plain_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    matches!(chars.next(), Some(c) if c.is_ascii_alphabetic() || c == '_')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
