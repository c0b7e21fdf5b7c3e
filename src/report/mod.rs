/// Report generation.
///
/// Submodules:
/// - `week_vs_weekend`: chance of rain on weekdays vs. weekends, per year,
///   for the whole day and for daytime only.

pub mod week_vs_weekend;

pub use week_vs_weekend::{ReportLocale, ReportRow};
