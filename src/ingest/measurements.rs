/// Rain gauge measurement files.
///
/// A measurement file is a CSV export of the `rain` table with a header row:
///
/// ```text
/// timestamp,value
/// 2020-01-04T10:00:00+00:00,0.5
/// 2020-01-04 10:10:00+00:00,0.2
/// ```
///
/// Timestamps must carry an offset (RFC 3339, or the space-separated form
/// SQLite exports). An empty value is read as 0 mm so the measurement still
/// marks its day as observed.

use std::fs::File;
use std::io::Read;
use std::path::Path;

use chrono::{DateTime, FixedOffset, Utc};
use serde::Deserialize;

use crate::model::{RainMeasurement, StoreError};

const SQLITE_TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S%:z";

#[derive(Debug, Deserialize)]
struct MeasurementRecord {
    timestamp: String,
    value: Option<f64>,
}

/// Reads every measurement in the file at `path`.
pub fn read_measurements(path: &Path) -> Result<Vec<RainMeasurement>, StoreError> {
    let file = File::open(path).map_err(|source| StoreError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    parse_measurements(file, path)
}

/// Parses measurements from any reader; `path` is only used in errors.
pub fn parse_measurements<R: Read>(
    reader: R,
    path: &Path,
) -> Result<Vec<RainMeasurement>, StoreError> {
    let mut reader = csv::ReaderBuilder::new().trim(csv::Trim::All).from_reader(reader);

    let mut measurements = Vec::new();
    for (index, result) in reader.deserialize::<MeasurementRecord>().enumerate() {
        // +1 for the header, +1 for 1-based lines.
        let line = index as u64 + 2;
        let record = result.map_err(|source| StoreError::Csv {
            path: path.to_path_buf(),
            source,
        })?;

        let timestamp = parse_timestamp(&record.timestamp).ok_or_else(|| {
            StoreError::InvalidMeasurement {
                line,
                value: record.timestamp.clone(),
                reason: "timestamp must include a UTC offset".to_string(),
            }
        })?;

        let value_mm = record.value.unwrap_or(0.0);
        if !value_mm.is_finite() || value_mm < 0.0 {
            return Err(StoreError::InvalidMeasurement {
                line,
                value: value_mm.to_string(),
                reason: "rain amount must be a non-negative number".to_string(),
            });
        }

        measurements.push(RainMeasurement {
            timestamp,
            value_mm,
        });
    }

    Ok(measurements)
}

fn parse_timestamp(text: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(text)
        .or_else(|_| DateTime::<FixedOffset>::parse_from_str(text, SQLITE_TIMESTAMP_FORMAT))
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}

// ============================================================================
// Tests
// ============================================================================
