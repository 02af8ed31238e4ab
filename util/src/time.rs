//! General time utility functions

use chrono;

/// Number of nanoseconds in a second
pub const NANOS_PER_SECOND: i64 = 1_000_000_000;

/// Convert a duration into a number of seconds, or `None` if overflow
pub fn duration_to_seconds(duration: chrono::Duration) -> Option<f64> {
    duration
        .num_nanoseconds()
        .map(|ns| ns as f64 / NANOS_PER_SECOND as f64)
}

/// Number of whole ticks of the given period needed to cover `duration_s`.
///
/// Always at least zero, rounded to the nearest tick so that `0.5 s` at a
/// `0.02 s` period is exactly 25 ticks.
pub fn seconds_to_ticks(duration_s: f64, period_s: f64) -> u64 {
    if duration_s <= 0.0 || period_s <= 0.0 {
        return 0
    }

    (duration_s / period_s).round() as u64
}
