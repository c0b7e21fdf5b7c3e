/// Daily rain classification.
///
/// Raw measurements are grouped by their *local* calendar date (the
/// configured timezone, never UTC) and summed. In daytime-only mode a
/// measurement outside the daytime hours still belongs to its day but
/// contributes zero, so a day with only night-time readings is reported as a
/// dry day instead of disappearing.

use std::collections::BTreeMap;

use chrono::{NaiveDate, Timelike};
use chrono_tz::Tz;

use crate::model::{DailyRainRecord, DayWindow, DaytimeHours, RainMeasurement};

/// Returns `true` if a day with `sum_mm` of rain counts as a rain day.
///
/// Strictly greater than the threshold:
///   sum >  threshold → rained
///   sum == threshold → dry
pub fn is_rain_day(sum_mm: f64, threshold_mm: f64) -> bool {
    sum_mm > threshold_mm
}

/// The amount a single measurement adds to its day's sum under `window`.
pub fn counted_value(
    measurement: &RainMeasurement,
    window: DayWindow,
    hours: DaytimeHours,
    tz: Tz,
) -> f64 {
    match window {
        DayWindow::WholeDay => measurement.value_mm,
        DayWindow::Daytime => {
            let local_hour = measurement.timestamp.with_timezone(&tz).hour();
            if hours.contains(local_hour) {
                measurement.value_mm
            } else {
                0.0
            }
        }
    }
}

/// Sums `measurements` per local calendar date and flags rain days.
///
/// Input order does not matter. Output has one record per distinct local
/// date, sorted ascending.
pub fn classify_days(
    measurements: &[RainMeasurement],
    window: DayWindow,
    hours: DaytimeHours,
    threshold_mm: f64,
    tz: Tz,
) -> Vec<DailyRainRecord> {
    let mut sums: BTreeMap<NaiveDate, f64> = BTreeMap::new();

    for measurement in measurements {
        let date = measurement.timestamp.with_timezone(&tz).date_naive();
        *sums.entry(date).or_insert(0.0) += counted_value(measurement, window, hours, tz);
    }

    sums.into_iter()
        .map(|(date, sum_mm)| DailyRainRecord {
            date,
            sum_mm,
            rained: is_rain_day(sum_mm, threshold_mm),
        })
        .collect()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
