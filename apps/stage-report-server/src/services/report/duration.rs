use serde::{Serialize, Serializer};
use std::fmt;

const MILLIS_PER_MINUTE: f64 = 60_000.0;

/// A quantity that always renders with exactly two decimals ("1.00", "-0.02").
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Default)]
pub struct TwoDecimals(pub f64);

impl TwoDecimals {
    pub fn value(self) -> f64 {
        self.0
    }
}

impl fmt::Display for TwoDecimals {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&format_two_decimals(self.0))
    }
}

impl Serialize for TwoDecimals {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// Rounds like the dashboard's `toFixed(2)`: the exact binary value is rounded, so 0.015
/// (stored as 0.01499...) gives "0.01". The sign is split off first, so exact ties round away
/// from zero and a negative value that rounds to nothing renders as "-0.00".
pub fn format_two_decimals(value: f64) -> String {
    if !value.is_finite() {
        return value.to_string();
    }
    let sign = if value < 0.0 { "-" } else { "" };
    let magnitude = value.abs();
    if is_exact_cent_tie(magnitude) {
        let cents = (magnitude * 100.0 + 0.5).floor() as u64;
        return format!("{sign}{}.{:02}", cents / 100, cents % 100);
    }
    format!("{sign}{magnitude:.2}")
}

// A binary float sits exactly halfway between two cents only when it is an odd multiple of 1/8.
fn is_exact_cent_tie(magnitude: f64) -> bool {
    let eighths = magnitude * 8.0;
    eighths.fract() == 0.0 && eighths % 2.0 == 1.0
}

/// Elapsed time of one interval. Negative when the end precedes the start.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StageDuration {
    pub minutes: TwoDecimals,
    pub hours: TwoDecimals,
}

impl StageDuration {
    pub fn between(start_millis: f64, end_millis: f64) -> Self {
        let minutes = (end_millis - start_millis) / MILLIS_PER_MINUTE;
        Self {
            minutes: TwoDecimals(minutes),
            hours: TwoDecimals(minutes / 60.0),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn renders_whole_minutes_with_two_decimals() {
        let duration = StageDuration::between(1000.0, 61_000.0);
        assert_eq!(duration.minutes.to_string(), "1.00");
        assert_eq!(duration.hours.to_string(), "0.02");

        let duration = StageDuration::between(1000.0, 301_000.0);
        assert_eq!(duration.minutes.to_string(), "5.00");
        assert_eq!(duration.hours.to_string(), "0.08");
    }

    #[test]
    fn zero_length_interval_is_unsigned_zero() {
        let duration = StageDuration::between(61_000.0, 61_000.0);
        assert_eq!(duration.minutes.to_string(), "0.00");
        assert_eq!(duration.hours.to_string(), "0.00");
    }

    #[test]
    fn negative_durations_propagate() {
        let duration = StageDuration::between(2000.0, 1000.0);
        assert_eq!(duration.minutes.to_string(), "-0.02");
        assert_eq!(duration.hours.to_string(), "-0.00");
        assert!(duration.minutes.value() < 0.0);
    }

    #[test]
    fn hours_come_from_unrounded_minutes() {
        let duration = StageDuration::between(0.0, 5_399_760.0);
        assert_eq!(duration.minutes.to_string(), "90.00");
        assert_eq!(duration.hours.to_string(), "1.50");
    }

    #[test]
    fn ties_round_away_from_zero() {
        assert_eq!(format_two_decimals(0.125), "0.13");
        assert_eq!(format_two_decimals(-0.125), "-0.13");
        assert_eq!(format_two_decimals(2.5), "2.50");
        assert_eq!(format_two_decimals(1234.5678), "1234.57");
        assert_eq!(format_two_decimals(0.625), "0.63");
        assert_eq!(format_two_decimals(-0.375), "-0.38");
    }

    #[test]
    fn rounds_the_stored_binary_value() {
        // 0.015, 0.045 and 0.155 are all stored slightly below the half cent.
        assert_eq!(StageDuration::between(0.0, 900.0).minutes.to_string(), "0.01");
        assert_eq!(StageDuration::between(0.0, 2_700.0).minutes.to_string(), "0.04");
        assert_eq!(StageDuration::between(0.0, 9_300.0).minutes.to_string(), "0.15");
        assert_eq!(StageDuration::between(9_300.0, 0.0).minutes.to_string(), "-0.15");
        assert_eq!(format_two_decimals(1.005), "1.00");
    }

    #[test]
    fn serializes_as_string() {
        let json = serde_json::to_string(&TwoDecimals(6.0)).expect("serialize");
        assert_eq!(json, "\"6.00\"");
    }
}
