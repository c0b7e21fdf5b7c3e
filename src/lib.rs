/// Sunrise/sunset scraper and rain week vs. weekend report.
///
/// - `ingest`: almanac page fetching/parsing, measurement files
/// - `analysis`: daily rain classification and year/weekday grouping
/// - `store`: rain sources (PostgreSQL, measurement file)
/// - `report`: week vs. weekend report rows
/// - `pipeline`: the end-to-end runs behind the binary

pub mod analysis;
pub mod config;
pub mod ingest;
pub mod logging;
pub mod model;
pub mod output;
pub mod pipeline;
pub mod report;
pub mod store;
