/// Week vs. weekend chance-of-rain report.
///
/// Joins the whole-day and daytime-only aggregates per year and projects
/// them onto the report's nine CSV columns.

use std::collections::BTreeMap;

use serde::Deserialize;

use crate::analysis::weekday;
use crate::model::{DayWindow, DaytimeHours, ReportError, WeekendDays, YearAggregate};
use crate::store::RainSource;

/// Language of the report header and yes/no tokens.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReportLocale {
    #[default]
    En,
    Nl,
}

impl ReportLocale {
    pub fn header(&self) -> [&'static str; 9] {
        match self {
            ReportLocale::En => [
                "year",
                "chance_of_rain_total",
                "chance_of_rain_week",
                "chance_of_rain_weekend",
                "more_rain_on_weekend",
                "daytime_chance_of_rain_total",
                "daytime_chance_of_rain_week",
                "daytime_chance_of_rain_weekend",
                "daytime_more_rain_on_weekend",
            ],
            ReportLocale::Nl => [
                "jaar",
                "kans_op_regen_totaal",
                "kans_op_regen_week",
                "kans_op_regen_weekend",
                "meer_kans_op_regen_weekend",
                "dag_kans_op_regen_totaal",
                "dag_kans_op_regen_week",
                "dag_kans_op_regen_weekend",
                "dag_meer_kans_op_regen_weekend",
            ],
        }
    }

    pub fn yes_no(&self, value: bool) -> &'static str {
        match (self, value) {
            (ReportLocale::En, true) => "yes",
            (ReportLocale::En, false) => "no",
            (ReportLocale::Nl, true) => "ja",
            (ReportLocale::Nl, false) => "nee",
        }
    }
}

/// Parameters shared by both window runs of one report.
#[derive(Debug, Clone, Copy)]
pub struct RainReportSettings {
    pub threshold_mm: f64,
    pub hours: DaytimeHours,
    pub weekend: WeekendDays,
}

/// One output line: a year with its whole-day and daytime figures.
#[derive(Debug, Clone, PartialEq)]
pub struct ReportRow {
    pub year: i32,
    pub whole_day: YearAggregate,
    pub daytime: YearAggregate,
}

impl ReportRow {
    pub fn to_record(&self, locale: ReportLocale) -> Vec<String> {
        let mut record = Vec::with_capacity(9);
        record.push(self.year.to_string());
        for agg in [&self.whole_day, &self.daytime] {
            record.push(format_chance(agg.chance_of_rain));
            record.push(format_chance(agg.chance_of_rain_week));
            record.push(format_chance(agg.chance_of_rain_weekend));
            record.push(locale.yes_no(agg.weekend_more_wet).to_string());
        }
        record
    }
}

/// Two decimals; an undefined chance is written as `NaN`.
pub fn format_chance(chance: f64) -> String {
    format!("{:.2}", chance)
}

/// Joins the two aggregates year by year, ascending.
///
/// Both maps must cover exactly the same years. A year on one side only is a
/// data-integrity fault, never filled with a default.
pub fn assemble_rows(
    whole_day: &BTreeMap<i32, YearAggregate>,
    daytime: &BTreeMap<i32, YearAggregate>,
) -> Result<Vec<ReportRow>, ReportError> {
    if let Some(year) = daytime.keys().find(|year| !whole_day.contains_key(year)) {
        return Err(ReportError::MissingYear {
            year: *year,
            missing_from: DayWindow::WholeDay,
        });
    }

    whole_day
        .iter()
        .map(|(&year, whole)| {
            let day = daytime.get(&year).ok_or(ReportError::MissingYear {
                year,
                missing_from: DayWindow::Daytime,
            })?;
            Ok(ReportRow {
                year,
                whole_day: *whole,
                daytime: *day,
            })
        })
        .collect()
}

/// Header plus one record per row.
pub fn report_records(rows: &[ReportRow], locale: ReportLocale) -> Vec<Vec<String>> {
    let mut records = Vec::with_capacity(rows.len() + 1);
    records.push(locale.header().iter().map(|h| h.to_string()).collect());
    records.extend(rows.iter().map(|row| row.to_record(locale)));
    records
}

/// Queries `store` for both windows, aggregates each, and joins them.
///
/// The whole-day query runs first; a failure in either aborts the report.
pub fn build_report(
    store: &mut dyn RainSource,
    settings: &RainReportSettings,
) -> Result<Vec<ReportRow>, ReportError> {
    let mut aggregates = Vec::with_capacity(DayWindow::ALL.len());
    for window in DayWindow::ALL {
        let buckets = store
            .day_buckets(window, settings.hours, settings.threshold_mm)
            .map_err(|source| ReportError::Store { window, source })?;
        log::debug!(target: "report", "[{}] {} day buckets", window, buckets.len());

        let years = weekday::aggregate_years(&buckets, settings.weekend)
            .map_err(|source| ReportError::Analysis { window, source })?;
        aggregates.push(years);
    }

    assemble_rows(&aggregates[0], &aggregates[1])
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
