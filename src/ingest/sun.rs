/// Royal Observatory of Belgium sunrise/sunset almanac scraper.
///
/// Retrieves one HTML page per year and turns its table into typed
/// [`SunRow`]s in the configured local timezone.
///
/// Page: https://www.astro.oma.be/GENERAL/INFO/nzon/zon_2020.html
///
/// Data rows have exactly six `<td>` cells in this order:
///   date | sunrise end | sunset end | duration | sunrise start | sunset start
/// Every other row (headers, month separators) is skipped.

use chrono::{DateTime, NaiveDate, NaiveTime, TimeZone};
use chrono_tz::Tz;
use scraper::{ElementRef, Html, Selector};

use crate::model::{ScrapeError, SunRow};

pub const DEFAULT_URL_TEMPLATE: &str = "https://www.astro.oma.be/GENERAL/INFO/nzon/zon_{year}.html";

const ROW_COLUMNS: usize = 6;
const COL_DATE: usize = 0;
const COL_SUNRISE_END: usize = 1;
const COL_SUNSET_END: usize = 2;
const COL_DURATION: usize = 3;
const COL_SUNRISE_START: usize = 4;
const COL_SUNSET_START: usize = 5;

const DATE_FORMAT: &str = "%d %m %Y";
const TIME_FORMAT: &str = "%H:%M";

const MIN_DURATION_MINUTES: u32 = 1;
const MAX_DURATION_MINUTES: u32 = 120;

// ============================================================================
// Fetching
// ============================================================================

/// Substitutes `{year}` in the URL template.
pub fn build_year_url(template: &str, year: i32) -> String {
    template.replace("{year}", &year.to_string())
}

/// Fetches the almanac page at `url` and returns its body.
///
/// A non-2xx response is a transport error carrying the response body so
/// the failure can be diagnosed from the log alone.
pub fn fetch_year_page(
    client: &reqwest::blocking::Client,
    url: &str,
) -> Result<String, ScrapeError> {
    let http_error = |source| ScrapeError::Http {
        url: url.to_string(),
        source,
    };

    let response = client.get(url).send().map_err(http_error)?;

    let status = response.status();
    if !status.is_success() {
        let body = status_body(response.text());
        return Err(ScrapeError::HttpStatus {
            url: url.to_string(),
            status: status.as_u16(),
            body,
        });
    }

    response.text().map_err(http_error)
}

/// The body of an error response, or a note saying why it could not be read.
fn status_body<E: std::fmt::Display>(body: Result<String, E>) -> String {
    body.unwrap_or_else(|e| format!("<body unreadable: {}>", e))
}

// ============================================================================
// Parsing
// ============================================================================

/// Parses every six-column table row of an almanac page.
///
/// Any malformed data row fails the whole page; nothing partial is returned.
pub fn parse_sun_page(html: &str, tz: Tz) -> Result<Vec<SunRow>, ScrapeError> {
    let document = Html::parse_document(html);
    let row_selector = selector("tr")?;
    let cell_selector = selector("td")?;

    let mut rows = Vec::new();
    for html_row in document.select(&row_selector) {
        let cells: Vec<String> = html_row
            .select(&cell_selector)
            .map(|cell| cell_text(&cell))
            .collect();
        if cells.len() != ROW_COLUMNS {
            continue;
        }
        rows.push(parse_sun_row(&cells, &html_row.html(), tz)?);
    }

    Ok(rows)
}

fn parse_sun_row(cells: &[String], fragment: &str, tz: Tz) -> Result<SunRow, ScrapeError> {
    let invalid = |field: &'static str, value: &str, reason: String| ScrapeError::InvalidField {
        field,
        value: value.to_string(),
        reason,
        fragment: fragment.to_string(),
    };

    let date_text = &cells[COL_DATE];
    let day = NaiveDate::parse_from_str(date_text, DATE_FORMAT)
        .map_err(|e| invalid("date", date_text, e.to_string()))?;
    let date = local_datetime(tz, day, NaiveTime::MIN)
        .ok_or_else(|| invalid("date", date_text, "midnight does not exist locally".to_string()))?;

    let time_on_day = |field: &'static str, column: usize| -> Result<DateTime<Tz>, ScrapeError> {
        let text = &cells[column];
        let time = NaiveTime::parse_from_str(text, TIME_FORMAT)
            .map_err(|e| invalid(field, text, e.to_string()))?;
        local_datetime(tz, day, time)
            .ok_or_else(|| invalid(field, text, "time does not exist locally".to_string()))
    };

    let sunrise_start = time_on_day("sunrise start", COL_SUNRISE_START)?;
    let sunrise_end = time_on_day("sunrise end", COL_SUNRISE_END)?;
    let sunset_start = time_on_day("sunset start", COL_SUNSET_START)?;
    let sunset_end = time_on_day("sunset end", COL_SUNSET_END)?;

    let duration_text = &cells[COL_DURATION];
    let duration_minutes = parse_minutes(duration_text)
        .ok_or_else(|| invalid("duration", duration_text, "no number found".to_string()))?;
    if !(MIN_DURATION_MINUTES..=MAX_DURATION_MINUTES).contains(&duration_minutes) {
        return Err(ScrapeError::DurationOutOfRange {
            minutes: duration_minutes,
            fragment: fragment.to_string(),
        });
    }

    Ok(SunRow {
        date,
        sunrise_start,
        sunrise_end,
        sunset_start,
        sunset_end,
        duration_minutes,
    })
}

/// Drops every non-digit character and parses what remains,
/// e.g. `"38 min"` → 38. `None` if no digits are left or the value overflows.
pub fn parse_minutes(text: &str) -> Option<u32> {
    let digits: String = text.chars().filter(|c| c.is_ascii_digit()).collect();
    digits.parse().ok()
}

/// Combines a local date and time; DST gaps yield `None`, overlaps take the
/// earlier instant.
fn local_datetime(tz: Tz, day: NaiveDate, time: NaiveTime) -> Option<DateTime<Tz>> {
    tz.from_local_datetime(&day.and_time(time)).earliest()
}

fn cell_text(cell: &ElementRef<'_>) -> String {
    cell.text().collect::<String>().trim().to_string()
}

fn selector(css: &str) -> Result<Selector, ScrapeError> {
    Selector::parse(css).map_err(|_| ScrapeError::Selector(css.to_string()))
}

// ============================================================================
// CSV projection
// ============================================================================

pub const SUN_CSV_HEADER: [&str; 6] = [
    "date",
    "sunrise_start",
    "sunrise_end",
    "sunset_start",
    "sunset_end",
    "duration_minutes",
];

/// Header plus one record per row, timestamps in RFC 3339 with offset.
pub fn sun_csv_records(rows: &[SunRow]) -> Vec<Vec<String>> {
    let mut records = Vec::with_capacity(rows.len() + 1);
    records.push(SUN_CSV_HEADER.iter().map(|h| h.to_string()).collect());
    for row in rows {
        records.push(vec![
            row.date.to_rfc3339(),
            row.sunrise_start.to_rfc3339(),
            row.sunrise_end.to_rfc3339(),
            row.sunset_start.to_rfc3339(),
            row.sunset_end.to_rfc3339(),
            row.duration_minutes.to_string(),
        ]);
    }
    records
}

// ============================================================================
// Tests
// ============================================================================
