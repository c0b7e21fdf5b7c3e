/// Integration tests for the week vs. weekend rain report
///
/// Tests verify:
/// 1. Measurement file → daily classification → buckets → report CSV
/// 2. Daytime window zeroes night measurements but keeps their day
/// 3. Mismatched year sets abort the run without writing a report
///
/// No database or network access is needed; the PostgreSQL store has its
/// own ignored tests in `postgres_rain_store.rs`.

use std::fs;
use std::path::Path;

use chrono_tz::Europe::Brussels;
use sunrain_service::config::Config;
use sunrain_service::model::{BucketRow, DayWindow, DaytimeHours, ReportError, StoreError};
use sunrain_service::pipeline::{self, RainReportJob};
use sunrain_service::report::ReportLocale;
use sunrain_service::store::{MeasurementFile, RainSource};

// ---------------------------------------------------------------------------
// Test Helpers
// ---------------------------------------------------------------------------

/// Brussels is UTC+1 in January.
///
/// - Sat 2020-01-04 11:00 local, 0.5 mm: wet in both windows
/// - Sun 2020-01-05 06:30 local, 0.4 mm: wet whole-day, dry daytime
/// - Mon 2020-01-06 13:00 local, 0.1 mm + 23:30 local, 0.05 mm:
///   0.15 mm whole-day (wet), 0.1 mm daytime (not above threshold)
/// - Tue 2021-06-15 12:00 local, 2.0 mm: wet, no weekend days that year
const MEASUREMENTS: &str = "\
timestamp,value
2020-01-04T10:00:00Z,0.5
2020-01-05T05:30:00Z,0.4
2020-01-06T12:00:00Z,0.1
2020-01-06T22:30:00Z,0.05
2021-06-15T10:00:00Z,2.0
";

fn report_job(dir: &Path, locale: ReportLocale) -> RainReportJob {
    let mut config = Config::default();
    config.report.output_dir = dir.join("reports");
    config.report.locale = locale;
    RainReportJob::from_config(&config).expect("default config is valid")
}

fn write_measurements(dir: &Path) -> std::path::PathBuf {
    let path = dir.join("rain.csv");
    fs::write(&path, MEASUREMENTS).expect("write measurements");
    path
}

// ---------------------------------------------------------------------------
// End-to-end
// ---------------------------------------------------------------------------

#[test]
fn test_report_from_measurement_file() {
    let dir = tempfile::tempdir().unwrap();
    let measurements = write_measurements(dir.path());
    let job = report_job(dir.path(), ReportLocale::En);

    let mut source = MeasurementFile::new(&measurements, Brussels);
    let path = pipeline::run_rain_report(&job, &mut source).expect("report should succeed");

    assert_eq!(path, dir.path().join("reports").join("week_vs_weekend.csv"));
    let content = fs::read_to_string(&path).unwrap();
    let lines: Vec<&str> = content.lines().collect();
    assert_eq!(
        lines,
        vec![
            "year,chance_of_rain_total,chance_of_rain_week,chance_of_rain_weekend,more_rain_on_weekend,\
             daytime_chance_of_rain_total,daytime_chance_of_rain_week,daytime_chance_of_rain_weekend,\
             daytime_more_rain_on_weekend",
            "2020,1.00,1.00,1.00,no,0.33,0.00,0.50,yes",
            "2021,1.00,1.00,NaN,no,1.00,1.00,NaN,no",
        ]
    );
    assert!(!path.with_file_name("week_vs_weekend.csv.part").exists());
}

#[test]
fn test_dutch_report_labels() {
    let dir = tempfile::tempdir().unwrap();
    let measurements = write_measurements(dir.path());
    let job = report_job(dir.path(), ReportLocale::Nl);

    let mut source = MeasurementFile::new(&measurements, Brussels);
    let path = pipeline::run_rain_report(&job, &mut source).unwrap();

    let content = fs::read_to_string(&path).unwrap();
    let lines: Vec<&str> = content.lines().collect();
    assert!(lines[0].starts_with("jaar,"));
    assert_eq!(lines[1], "2020,1.00,1.00,1.00,nee,0.33,0.00,0.50,ja");
}

#[test]
fn test_empty_measurement_file_writes_header_only() {
    let dir = tempfile::tempdir().unwrap();
    let measurements = dir.path().join("rain.csv");
    fs::write(&measurements, "timestamp,value\n").unwrap();
    let job = report_job(dir.path(), ReportLocale::En);

    let mut source = MeasurementFile::new(&measurements, Brussels);
    let path = pipeline::run_rain_report(&job, &mut source).unwrap();

    assert_eq!(fs::read_to_string(&path).unwrap().lines().count(), 1);
}

// ---------------------------------------------------------------------------
// Failures
// ---------------------------------------------------------------------------

/// Returns a year in the whole-day window that the daytime window lacks.
struct MismatchedYears;

impl RainSource for MismatchedYears {
    fn day_buckets(
        &mut self,
        window: DayWindow,
        _hours: DaytimeHours,
        _threshold_mm: f64,
    ) -> Result<Vec<BucketRow>, StoreError> {
        let bucket = |key: &str| BucketRow {
            year_weekday: key.to_string(),
            rained: true,
            number_of_days: 3,
        };
        Ok(match window {
            DayWindow::WholeDay => vec![bucket("2019-3"), bucket("2020-3")],
            DayWindow::Daytime => vec![bucket("2020-3")],
        })
    }
}

#[test]
fn test_mismatched_years_write_nothing() {
    let dir = tempfile::tempdir().unwrap();
    let job = report_job(dir.path(), ReportLocale::En);

    let err = pipeline::run_rain_report(&job, &mut MismatchedYears).unwrap_err();
    match err {
        ReportError::MissingYear { year, missing_from } => {
            assert_eq!(year, 2019);
            assert_eq!(missing_from, DayWindow::Daytime);
        }
        other => panic!("expected MissingYear, got {:?}", other),
    }
    assert!(!job.output_path.exists());
}

#[test]
fn test_invalid_measurement_aborts_report() {
    let dir = tempfile::tempdir().unwrap();
    let measurements = dir.path().join("rain.csv");
    fs::write(&measurements, "timestamp,value\n2020-01-04T10:00:00Z,-0.5\n").unwrap();
    let job = report_job(dir.path(), ReportLocale::En);

    let mut source = MeasurementFile::new(&measurements, Brussels);
    let err = pipeline::run_rain_report(&job, &mut source).unwrap_err();
    assert!(matches!(err, ReportError::Store { window: DayWindow::WholeDay, .. }));
    assert!(!job.output_path.exists());
}
