/// Rain data stores for the week vs. weekend report.
///
/// The report only needs one capability from a store: "for a day window,
/// group measurements by local calendar date, flag rain days against the
/// threshold, and count days per (year, weekday, rained)". [`RainSource`]
/// captures that; where the grouping happens is up to the implementation.
///
/// - [`PostgresRainStore`] pushes the whole grouping into SQL.
/// - [`MeasurementFile`] reads a CSV export and groups in memory with the
///   `analysis` functions.

use std::path::{Path, PathBuf};

use chrono_tz::Tz;
use postgres::{Client, NoTls};

use crate::analysis::{daily, weekday};
use crate::ingest::measurements;
use crate::model::{BucketRow, DayWindow, DaytimeHours, RainMeasurement, StoreError};

/// Default table holding raw measurements: `(timestamp timestamptz, value double precision)`.
pub const DEFAULT_RAIN_TABLE: &str = "rain";

pub trait RainSource {
    /// Day counts per `(year-weekday, rained)` for the given window.
    fn day_buckets(
        &mut self,
        window: DayWindow,
        hours: DaytimeHours,
        threshold_mm: f64,
    ) -> Result<Vec<BucketRow>, StoreError>;
}

// ---------------------------------------------------------------------------
// PostgreSQL
// ---------------------------------------------------------------------------

pub struct PostgresRainStore {
    client: Client,
    table: String,
    timezone: Tz,
}

impl PostgresRainStore {
    /// Connects to `database_url`. `table` must already be validated as a
    /// plain identifier; it is spliced into the query text.
    pub fn connect(database_url: &str, table: &str, timezone: Tz) -> Result<Self, StoreError> {
        let client = Client::connect(database_url, NoTls)?;
        Ok(Self::with_client(client, table, timezone))
    }

    pub fn with_client(client: Client, table: &str, timezone: Tz) -> Self {
        PostgresRainStore {
            client,
            table: table.to_string(),
            timezone,
        }
    }
}

/// Builds the grouping query for `table`.
///
/// Parameters:
///   $1 timezone name, $2 threshold (mm), $3 daytime-only flag,
///   $4 first daytime hour, $5 first hour after daytime.
///
/// Out-of-window measurements are zeroed rather than filtered so their day
/// still exists. `EXTRACT(DOW …)` counts from Sunday = 0, matching the
/// bucket key format.
pub fn day_bucket_query(table: &str) -> String {
    format!(
        r#"
        SELECT to_char(d.day, 'YYYY') || '-' || EXTRACT(DOW FROM d.day)::int AS year_weekday,
               d.rained,
               COUNT(*) AS number_of_days
        FROM (
            SELECT (r."timestamp" AT TIME ZONE $1::text)::date AS day,
                   COALESCE(SUM(r.value), 0) > $2::float8 AS rained
            FROM (
                SELECT "timestamp",
                       CASE
                           WHEN $3::bool
                                AND (EXTRACT(HOUR FROM "timestamp" AT TIME ZONE $1::text)::int < $4::int
                                     OR EXTRACT(HOUR FROM "timestamp" AT TIME ZONE $1::text)::int >= $5::int)
                           THEN 0
                           ELSE value
                       END AS value
                FROM {table}
            ) r
            GROUP BY 1
        ) d
        GROUP BY 1, 2
        ORDER BY 1, 2
        "#
    )
}

impl RainSource for PostgresRainStore {
    fn day_buckets(
        &mut self,
        window: DayWindow,
        hours: DaytimeHours,
        threshold_mm: f64,
    ) -> Result<Vec<BucketRow>, StoreError> {
        let query = day_bucket_query(&self.table);
        let timezone = self.timezone.name();
        let daytime_only = window == DayWindow::Daytime;
        let start_hour = hours.start_hour as i32;
        let end_hour = hours.end_hour as i32;

        let rows = self.client.query(
            &query,
            &[&timezone, &threshold_mm, &daytime_only, &start_hour, &end_hour],
        )?;

        let mut buckets = Vec::with_capacity(rows.len());
        for row in rows {
            buckets.push(BucketRow {
                year_weekday: row.try_get(0)?,
                rained: row.try_get(1)?,
                number_of_days: row.try_get(2)?,
            });
        }

        Ok(buckets)
    }
}

// ---------------------------------------------------------------------------
// Measurement file
// ---------------------------------------------------------------------------

/// A CSV export of raw measurements, grouped in memory.
///
/// The file is read on the first query and reused for the second window.
pub struct MeasurementFile {
    path: PathBuf,
    timezone: Tz,
    measurements: Option<Vec<RainMeasurement>>,
}

impl MeasurementFile {
    pub fn new(path: &Path, timezone: Tz) -> Self {
        MeasurementFile {
            path: path.to_path_buf(),
            timezone,
            measurements: None,
        }
    }

    /// Wraps measurements already in memory.
    pub fn from_measurements(measurements: Vec<RainMeasurement>, timezone: Tz) -> Self {
        MeasurementFile {
            path: PathBuf::new(),
            timezone,
            measurements: Some(measurements),
        }
    }

    fn measurements(&mut self) -> Result<&[RainMeasurement], StoreError> {
        if self.measurements.is_none() {
            let loaded = measurements::read_measurements(&self.path)?;
            log::debug!(
                target: "rain",
                "[{}] loaded {} measurements",
                self.path.display(),
                loaded.len()
            );
            self.measurements = Some(loaded);
        }
        Ok(self.measurements.as_deref().unwrap_or_default())
    }
}

impl RainSource for MeasurementFile {
    fn day_buckets(
        &mut self,
        window: DayWindow,
        hours: DaytimeHours,
        threshold_mm: f64,
    ) -> Result<Vec<BucketRow>, StoreError> {
        let timezone = self.timezone;
        let days = daily::classify_days(self.measurements()?, window, hours, threshold_mm, timezone);
        Ok(weekday::bucket_days(&days))
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
