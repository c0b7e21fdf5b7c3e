/// Rain-day analysis for the week vs. weekend report.
///
/// The aggregation runs in two steps that mirror what the rain store does in
/// SQL, so the same code path can also serve a plain measurement file.
///
/// Submodules:
/// - `daily`: sums raw measurements per local calendar day and flags rain days.
/// - `weekday`: counts rain days per (year, weekday-or-weekend) and derives
///   the per-year chances once all buckets of a year are in.

pub mod daily;
pub mod weekday;
