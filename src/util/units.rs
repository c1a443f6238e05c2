//! Time formatting utilities
//!
//! Provides the human-readable renderings of wall-clock timestamps and
//! durations used by the console report.

use chrono::{DateTime, Local};
use std::time::Duration;

/// Duration as fractional milliseconds
///
/// # Examples
/// ```
/// use std::time::Duration;
/// use tickertest::util::units::millis;
///
/// assert_eq!(millis(Duration::from_micros(1500)), 1.5);
/// ```
pub fn millis(duration: Duration) -> f64 {
    duration.as_nanos() as f64 / 1_000_000.0
}

/// Format a duration as milliseconds with microsecond precision
///
/// # Examples
/// ```
/// use std::time::Duration;
/// use tickertest::util::units::format_millis;
///
/// assert_eq!(format_millis(Duration::from_millis(250)), "250.000000ms");
/// ```
pub fn format_millis(duration: Duration) -> String {
    format!("{:.6}ms", millis(duration))
}

/// Format a wall-clock timestamp the way every report line prints it
pub fn format_timestamp(at: &DateTime<Local>) -> String {
    at.format("%Y-%m-%d %H:%M:%S%.6f %z").to_string()
}

/// Compact duration for log fields and config summaries, e.g. "1s 500ms"
///
/// # Examples
/// ```
/// use std::time::Duration;
/// use tickertest::util::units::format_span;
///
/// assert_eq!(format_span(Duration::from_millis(1500)), "1s 500ms");
/// ```
pub fn format_span(duration: Duration) -> String {
    humantime::format_duration(duration).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_millis() {
        assert_eq!(millis(Duration::ZERO), 0.0);
        assert_eq!(millis(Duration::from_millis(100)), 100.0);
        assert!((millis(Duration::from_nanos(1_234_567)) - 1.234567).abs() < 1e-9);
    }

    #[test]
    fn test_format_millis() {
        assert_eq!(format_millis(Duration::ZERO), "0.000000ms");
        assert_eq!(format_millis(Duration::from_micros(100_250)), "100.250000ms");
    }

    #[test]
    fn test_format_timestamp() {
        let at = Local.with_ymd_and_hms(2024, 3, 9, 14, 5, 7).unwrap();
        let rendered = format_timestamp(&at);
        assert!(rendered.starts_with("2024-03-09 14:05:07.000000 "));
    }

    #[test]
    fn test_format_span() {
        assert_eq!(format_span(Duration::from_millis(100)), "100ms");
        assert_eq!(format_span(Duration::from_secs(90)), "1m 30s");
    }
}
