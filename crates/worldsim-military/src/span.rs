//! Conversions between fractional hours and simulated instants.

use std::time::Duration;

use chrono::{DateTime, TimeDelta, Utc};

/// `hours` as a [`TimeDelta`]. Negative, non-finite or unrepresentable
/// values become zero.
pub fn hours(hours: f64) -> TimeDelta {
    Duration::try_from_secs_f64(hours * 3600.0)
        .ok()
        .and_then(|d| TimeDelta::from_std(d).ok())
        .unwrap_or_else(TimeDelta::zero)
}

/// `start + hours`, saturating at the latest representable instant.
pub fn after(start: DateTime<Utc>, span_hours: f64) -> DateTime<Utc> {
    start
        .checked_add_signed(hours(span_hours))
        .unwrap_or(DateTime::<Utc>::MAX_UTC)
}

/// Hours from `from` to `to`; zero when `to` is not after `from`.
pub fn elapsed_hours(from: DateTime<Utc>, to: DateTime<Utc>) -> f64 {
    to.signed_duration_since(from)
        .to_std()
        .map(|d| d.as_secs_f64() / 3600.0)
        .unwrap_or(0.0)
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;

    #[test]
    fn round_trip() {
        let start = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).single().unwrap_or_default();
        let end = after(start, 1.5);
        assert!((elapsed_hours(start, end) - 1.5).abs() < 1e-9);
        assert!(elapsed_hours(end, start).abs() < f64::EPSILON);
    }

    #[test]
    fn bad_input_is_zero() {
        assert_eq!(hours(-3.0), TimeDelta::zero());
        assert_eq!(hours(f64::NAN), TimeDelta::zero());
    }
}
