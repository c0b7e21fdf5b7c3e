/// End-to-end runs behind the two binary subcommands.
///
/// `scrape-sun`: for each year, fetch the almanac page, parse it, and write
/// `<output_dir>/sun_<year>.csv`.
///
/// `rain-report`: query a [`RainSource`] for both day windows, aggregate,
/// join, and write the week vs. weekend CSV.
///
/// Each unit of work either finishes completely or leaves no output file.

use std::ops::RangeInclusive;
use std::path::{Path, PathBuf};

use chrono_tz::Tz;

use crate::config::{self, Config, ConfigError, SourceKind};
use crate::ingest::sun;
use crate::logging::{self, DataSource};
use crate::model::{ErrorKind, ReportError, ScrapeError, StoreError};
use crate::output;
use crate::report::week_vs_weekend::{self, RainReportSettings, ReportLocale};
use crate::store::{MeasurementFile, PostgresRainStore, RainSource};

// ---------------------------------------------------------------------------
// Sunrise / sunset
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct SunScrapeJob {
    pub url_template: String,
    pub years: RangeInclusive<i32>,
    pub output_dir: PathBuf,
    pub timezone: Tz,
}

impl SunScrapeJob {
    pub fn from_config(config: &Config) -> Result<Self, ConfigError> {
        Ok(SunScrapeJob {
            url_template: config.sun.url_template.clone(),
            years: config.sun.from_year..=config.sun.to_year,
            output_dir: config.sun.output_dir.clone(),
            timezone: config.tz()?,
        })
    }

    pub fn output_path(&self, year: i32) -> PathBuf {
        self.output_dir.join(format!("sun_{}.csv", year))
    }
}

/// Outcome of a multi-year scrape.
#[derive(Debug, Default)]
pub struct RunSummary {
    pub written: Vec<PathBuf>,
    pub failed: Vec<(i32, ErrorKind)>,
}

impl RunSummary {
    pub fn total(&self) -> usize {
        self.written.len() + self.failed.len()
    }

    pub fn is_success(&self) -> bool {
        self.failed.is_empty()
    }
}

/// Scrapes one year and writes its CSV. Returns the written path.
pub fn scrape_year(
    client: &reqwest::blocking::Client,
    job: &SunScrapeJob,
    year: i32,
) -> Result<PathBuf, ScrapeError> {
    let url = sun::build_year_url(&job.url_template, year);
    logging::debug(DataSource::Sun, Some(&year.to_string()), &format!("GET {}", url));

    let html = sun::fetch_year_page(client, &url)?;
    write_sun_year(&html, job, year)
}

/// Parses an already fetched page for `year` and writes its CSV.
pub fn write_sun_year(html: &str, job: &SunScrapeJob, year: i32) -> Result<PathBuf, ScrapeError> {
    let rows = sun::parse_sun_page(html, job.timezone)?;
    if rows.is_empty() {
        logging::warn(DataSource::Sun, Some(&year.to_string()), "page contained no data rows");
    }

    let path = job.output_path(year);
    output::write_csv_atomically(&path, sun::sun_csv_records(&rows))?;

    logging::info(
        DataSource::Sun,
        Some(&year.to_string()),
        &format!("wrote {} rows to {}", rows.len(), path.display()),
    );
    Ok(path)
}

/// Scrapes every year of the job in ascending order.
///
/// Without `keep_going` the first failure is returned as-is; with it, the
/// failure is logged and recorded in the summary and the next year starts.
pub fn run_sun_scrape(
    client: &reqwest::blocking::Client,
    job: &SunScrapeJob,
    keep_going: bool,
) -> Result<RunSummary, ScrapeError> {
    let mut summary = RunSummary::default();

    for year in job.years.clone() {
        let key = year.to_string();
        match scrape_year(client, job, year) {
            Ok(path) => summary.written.push(path),
            Err(e) => {
                logging::log_failure(DataSource::Sun, Some(&key), "Scraping sun table", e.kind(), &e);
                if !keep_going {
                    return Err(e);
                }
                summary.failed.push((year, e.kind()));
            }
        }
    }

    logging::log_run_summary(
        DataSource::Sun,
        summary.total(),
        summary.written.len(),
        summary.failed.len(),
    );
    Ok(summary)
}

// ---------------------------------------------------------------------------
// Rain report
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct RainReportJob {
    pub settings: RainReportSettings,
    pub locale: ReportLocale,
    pub output_path: PathBuf,
}

impl RainReportJob {
    pub fn from_config(config: &Config) -> Result<Self, ConfigError> {
        Ok(RainReportJob {
            settings: RainReportSettings {
                threshold_mm: config.rain.threshold_mm,
                hours: config.daytime_hours()?,
                weekend: config.weekend_days()?,
            },
            locale: config.report.locale,
            output_path: config.report_path(),
        })
    }
}

/// Builds the report from `source` and writes it. Returns the written path.
///
/// Nothing is written when any step fails.
pub fn run_rain_report(
    job: &RainReportJob,
    source: &mut dyn RainSource,
) -> Result<PathBuf, ReportError> {
    let rows = week_vs_weekend::build_report(source, &job.settings)?;
    if rows.is_empty() {
        logging::warn(DataSource::Report, None, "no rain data; writing header only");
    }

    let records = week_vs_weekend::report_records(&rows, job.locale);
    output::write_csv_atomically(&job.output_path, records)?;

    logging::info(
        DataSource::Report,
        Some(&job.output_path.display().to_string()),
        &format!("wrote {} years", rows.len()),
    );
    Ok(job.output_path.clone())
}

/// Failures opening the configured rain source.
#[derive(Debug, thiserror::Error)]
pub enum OpenSourceError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("cannot connect to rain store: {0}")]
    Store(#[from] StoreError),
}

impl OpenSourceError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            OpenSourceError::Config(e) => e.kind(),
            OpenSourceError::Store(e) => e.kind(),
        }
    }
}

/// Opens the rain source of the given kind. `measurements` overrides the
/// configured measurement file for [`SourceKind::Csv`].
pub fn open_rain_source(
    config: &Config,
    kind: SourceKind,
    measurements: Option<&Path>,
) -> Result<Box<dyn RainSource>, OpenSourceError> {
    let timezone = config.tz()?;
    match kind {
        SourceKind::Postgres => {
            let url = config::database_url()?;
            let store = PostgresRainStore::connect(&url, &config.rain.table, timezone)?;
            logging::debug(DataSource::Database, Some(&config.rain.table), "connected");
            Ok(Box::new(store))
        }
        SourceKind::Csv => {
            let path = measurements.unwrap_or(config.rain.measurements_path.as_path());
            Ok(Box::new(MeasurementFile::new(path, timezone)))
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
