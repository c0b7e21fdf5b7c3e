/// Year / weekday grouping and the per-year week vs. weekend figures.
///
/// Aggregation is two-phase:
///
/// 1. [`tally_buckets`] adds every bucket's day counts into a [`YearTally`].
///    Nothing but raw counts is touched, so the order buckets arrive in has
///    no effect on the result.
/// 2. [`YearTally::finalize`] derives the chances once, after the last bucket
///    of the year has been counted.

use std::collections::BTreeMap;

use chrono::{Datelike, NaiveDate, Weekday};

use crate::model::{
    chance_of_rain, AnalysisError, BucketRow, DailyRainRecord, WeekendDays, YearAggregate,
};

// ---------------------------------------------------------------------------
// Bucket keys
// ---------------------------------------------------------------------------

/// Formats the `"<YYYY>-<w>"` bucket key for `date`, with `w` counted from
/// Sunday (Sunday = 0 … Saturday = 6).
pub fn year_weekday_key(date: NaiveDate) -> String {
    format!("{:04}-{}", date.year(), date.weekday().num_days_from_sunday())
}

/// Splits a `"<YYYY>-<w>"` key into its calendar year and weekday.
///
/// Anything else (missing separator, extra parts, non-numeric parts,
/// weekday outside 0..=6) is a data-integrity error: skipping the bucket
/// would silently corrupt the year's totals.
pub fn parse_year_weekday(key: &str) -> Result<(i32, Weekday), AnalysisError> {
    let malformed = || AnalysisError::MalformedYearWeekday(key.to_string());

    let (year, weekday) = key.split_once('-').ok_or_else(malformed)?;
    if !is_ascii_number(year) || !is_ascii_number(weekday) {
        return Err(malformed());
    }
    let year: i32 = year.parse().map_err(|_| malformed())?;
    let weekday: u8 = weekday.parse().map_err(|_| malformed())?;
    let weekday = weekday_from_sunday(weekday).ok_or_else(malformed)?;

    Ok((year, weekday))
}

/// Digits only: no sign, no whitespace.
fn is_ascii_number(text: &str) -> bool {
    !text.is_empty() && text.bytes().all(|b| b.is_ascii_digit())
}

fn weekday_from_sunday(n: u8) -> Option<Weekday> {
    match n {
        0 => Some(Weekday::Sun),
        1 => Some(Weekday::Mon),
        2 => Some(Weekday::Tue),
        3 => Some(Weekday::Wed),
        4 => Some(Weekday::Thu),
        5 => Some(Weekday::Fri),
        6 => Some(Weekday::Sat),
        _ => None,
    }
}

/// Groups classified days into `(year-weekday, rained)` buckets.
///
/// In-memory equivalent of the rain store's SQL grouping. Rows come out
/// sorted by key, then `rained`.
pub fn bucket_days(days: &[DailyRainRecord]) -> Vec<BucketRow> {
    let mut counts: BTreeMap<(String, bool), i64> = BTreeMap::new();
    for day in days {
        *counts
            .entry((year_weekday_key(day.date), day.rained))
            .or_insert(0) += 1;
    }

    counts
        .into_iter()
        .map(|((year_weekday, rained), number_of_days)| BucketRow {
            year_weekday,
            rained,
            number_of_days,
        })
        .collect()
}

// ---------------------------------------------------------------------------
// Tally
// ---------------------------------------------------------------------------

/// Raw day counts for one year. No ratios live here.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct YearTally {
    pub wet_days_week: u64,
    pub total_days_week: u64,
    pub wet_days_weekend: u64,
    pub total_days_weekend: u64,
}

impl YearTally {
    /// Adds `days` days of one bucket.
    pub fn add(&mut self, is_weekend: bool, rained: bool, days: u64) {
        if is_weekend {
            self.total_days_weekend += days;
            if rained {
                self.wet_days_weekend += days;
            }
        } else {
            self.total_days_week += days;
            if rained {
                self.wet_days_week += days;
            }
        }
    }

    /// Derives the chances from the final counts.
    pub fn finalize(&self) -> YearAggregate {
        let chance_of_rain_week = chance_of_rain(self.wet_days_week, self.total_days_week);
        let chance_of_rain_weekend =
            chance_of_rain(self.wet_days_weekend, self.total_days_weekend);

        YearAggregate {
            wet_days_week: self.wet_days_week,
            total_days_week: self.total_days_week,
            wet_days_weekend: self.wet_days_weekend,
            total_days_weekend: self.total_days_weekend,
            chance_of_rain: chance_of_rain(
                self.wet_days_week + self.wet_days_weekend,
                self.total_days_week + self.total_days_weekend,
            ),
            chance_of_rain_week,
            chance_of_rain_weekend,
            weekend_more_wet: chance_of_rain_weekend > chance_of_rain_week,
        }
    }
}

/// Adds all bucket rows into per-year tallies.
///
/// Fails on the first malformed key or negative day count.
pub fn tally_buckets(
    rows: &[BucketRow],
    weekend: WeekendDays,
) -> Result<BTreeMap<i32, YearTally>, AnalysisError> {
    let mut tallies: BTreeMap<i32, YearTally> = BTreeMap::new();

    for row in rows {
        let (year, weekday) = parse_year_weekday(&row.year_weekday)?;
        let days = u64::try_from(row.number_of_days).map_err(|_| {
            AnalysisError::NegativeDayCount {
                key: row.year_weekday.clone(),
                count: row.number_of_days,
            }
        })?;

        tallies
            .entry(year)
            .or_default()
            .add(weekend.contains(weekday), row.rained, days);
    }

    Ok(tallies)
}

/// Tallies all bucket rows, then finalizes every year.
pub fn aggregate_years(
    rows: &[BucketRow],
    weekend: WeekendDays,
) -> Result<BTreeMap<i32, YearAggregate>, AnalysisError> {
    let tallies = tally_buckets(rows, weekend)?;

    Ok(tallies
        .into_iter()
        .map(|(year, tally)| (year, tally.finalize()))
        .collect())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn day(y: i32, m: u32, d: u32, rained: bool) -> DailyRainRecord {
        DailyRainRecord {
            date: NaiveDate::from_ymd_opt(y, m, d).unwrap(),
            sum_mm: if rained { 1.0 } else { 0.0 },
            rained,
        }
    }

    fn bucket(key: &str, rained: bool, number_of_days: i64) -> BucketRow {
        BucketRow {
            year_weekday: key.to_string(),
            rained,
            number_of_days,
        }
    }

    // --- Keys ---------------------------------------------------------------

    #[test]
    fn test_year_weekday_key_counts_from_sunday() {
        assert_eq!(year_weekday_key(NaiveDate::from_ymd_opt(2020, 1, 5).unwrap()), "2020-0"); // Sunday
        assert_eq!(year_weekday_key(NaiveDate::from_ymd_opt(2020, 1, 6).unwrap()), "2020-1"); // Monday
        assert_eq!(year_weekday_key(NaiveDate::from_ymd_opt(2020, 1, 4).unwrap()), "2020-6"); // Saturday
    }

    #[test]
    fn test_parse_year_weekday_valid() {
        assert_eq!(parse_year_weekday("2020-0"), Ok((2020, Weekday::Sun)));
        assert_eq!(parse_year_weekday("2011-6"), Ok((2011, Weekday::Sat)));
        assert_eq!(parse_year_weekday("1999-3"), Ok((1999, Weekday::Wed)));
    }

    #[test]
    fn test_parse_year_weekday_rejects_malformed_keys() {
        for key in ["2020", "2020-", "-3", "2020-7", "2020-1-1", "year-1", "2020-x", "",
                    " 2020- 1", "+2020-1", "2020-+1", "2020 -1"] {
            assert_eq!(
                parse_year_weekday(key),
                Err(AnalysisError::MalformedYearWeekday(key.to_string())),
                "key '{}' must be rejected",
                key
            );
        }
    }

    // --- Grouping -----------------------------------------------------------

    #[test]
    fn test_saturday_sunday_monday_scenario() {
        let days = [
            day(2020, 1, 4, true),  // Saturday
            day(2020, 1, 5, false), // Sunday
            day(2020, 1, 6, true),  // Monday
        ];
        let years = aggregate_years(&bucket_days(&days), WeekendDays::default()).unwrap();
        let agg = years[&2020];

        assert_eq!(agg.wet_days_weekend, 1);
        assert_eq!(agg.total_days_weekend, 2);
        assert_eq!(agg.chance_of_rain_weekend, 0.5);
        assert_eq!(agg.wet_days_week, 1);
        assert_eq!(agg.total_days_week, 1);
        assert_eq!(agg.chance_of_rain_week, 1.0);
        assert!(!agg.weekend_more_wet);
        assert_eq!(agg.total_days(), 3);
        assert_eq!(agg.total_wet_days(), 2);
    }

    #[test]
    fn test_bucket_days_counts_per_key_and_flag() {
        let days = [
            day(2020, 1, 6, true),  // Monday
            day(2020, 1, 13, true), // Monday
            day(2020, 1, 20, false), // Monday
        ];
        assert_eq!(
            bucket_days(&days),
            vec![bucket("2020-1", false, 1), bucket("2020-1", true, 2)]
        );
    }

    #[test]
    fn test_years_are_kept_apart() {
        let rows = [bucket("2020-1", true, 3), bucket("2021-1", false, 4)];
        let years = aggregate_years(&rows, WeekendDays::default()).unwrap();
        assert_eq!(years.len(), 2);
        assert_eq!(years[&2020].total_days(), 3);
        assert_eq!(years[&2021].total_days(), 4);
        assert_eq!(years[&2021].total_wet_days(), 0);
    }

    #[test]
    fn test_bucket_order_does_not_change_result() {
        let rows = vec![
            bucket("2020-0", true, 20),
            bucket("2020-0", false, 32),
            bucket("2020-3", true, 15),
            bucket("2020-3", false, 37),
            bucket("2020-6", false, 40),
            bucket("2020-6", true, 12),
        ];
        let mut reversed = rows.clone();
        reversed.reverse();

        let forward = aggregate_years(&rows, WeekendDays::default()).unwrap();
        let backward = aggregate_years(&reversed, WeekendDays::default()).unwrap();
        assert_eq!(forward, backward);

        let again = aggregate_years(&rows, WeekendDays::default()).unwrap();
        assert_eq!(forward, again, "aggregation must be repeatable");
    }

    #[test]
    fn test_totals_always_add_up() {
        let rows = [
            bucket("2019-0", true, 5),
            bucket("2019-2", false, 9),
            bucket("2019-5", true, 7),
            bucket("2019-6", false, 2),
        ];
        let agg = aggregate_years(&rows, WeekendDays::default()).unwrap()[&2019];
        assert_eq!(agg.total_days(), agg.total_days_week + agg.total_days_weekend);
        assert_eq!(agg.total_wet_days(), agg.wet_days_week + agg.wet_days_weekend);
        assert_eq!(agg.total_days(), 23);
        assert_eq!(agg.total_wet_days(), 12);
    }

    #[test]
    fn test_year_without_weekend_days_has_nan_weekend_chance() {
        let rows = [bucket("2022-2", true, 1)];
        let agg = aggregate_years(&rows, WeekendDays::default()).unwrap()[&2022];
        assert!(agg.chance_of_rain_weekend.is_nan());
        assert_eq!(agg.chance_of_rain_week, 1.0);
        assert_eq!(agg.chance_of_rain, 1.0);
        assert!(!agg.weekend_more_wet, "NaN never compares greater");
    }

    #[test]
    fn test_custom_weekend_days() {
        // Friday/Saturday weekend: the Friday bucket moves to the weekend side.
        let rows = [bucket("2020-5", true, 1), bucket("2020-0", false, 1)];
        let weekend = WeekendDays([Weekday::Fri, Weekday::Sat]);
        let agg = aggregate_years(&rows, weekend).unwrap()[&2020];
        assert_eq!(agg.total_days_weekend, 1);
        assert_eq!(agg.wet_days_weekend, 1);
        assert_eq!(agg.total_days_week, 1);
        assert!(agg.weekend_more_wet);
    }

    // --- Errors -------------------------------------------------------------

    #[test]
    fn test_malformed_key_aborts_aggregation() {
        let rows = [bucket("2020-1", true, 1), bucket("20201", false, 1)];
        assert_eq!(
            aggregate_years(&rows, WeekendDays::default()),
            Err(AnalysisError::MalformedYearWeekday("20201".to_string()))
        );
    }

    #[test]
    fn test_negative_day_count_rejected() {
        let rows = [bucket("2020-1", true, -2)];
        assert_eq!(
            tally_buckets(&rows, WeekendDays::default()),
            Err(AnalysisError::NegativeDayCount {
                key: "2020-1".to_string(),
                count: -2
            })
        );
    }
}
