/// Data sources read from outside the service.
///
/// - `sun`: yearly sunrise/sunset pages from the ROB almanac.
/// - `measurements`: raw rain gauge measurements exported as CSV.

pub mod measurements;
pub mod sun;
