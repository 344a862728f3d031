//! Time utilities for playclockd
//!
//! Provides the mockable wall clock, the daily reset time-of-day, the time
//! zone selector, and duration formatting.
//!
//! # Mock Time for Development
//!
//! In debug builds, the `PLAYCLOCK_MOCK_TIME` environment variable can be set
//! to override the system time for all time-sensitive operations. This is useful
//! for exercising daily resets without waiting for the real boundary.
//!
//! Format: `YYYY-MM-DD HH:MM:SS` (e.g., `2025-12-25 03:59:30`)
//!
//! Example:
//! ```bash
//! PLAYCLOCK_MOCK_TIME="2025-12-25 03:59:30" ./playclockd
//! ```

use chrono::{DateTime, Local, NaiveDateTime, NaiveTime, TimeZone, Timelike};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::OnceLock;
use std::time::Duration;

use crate::{PlayclockError, Result};

/// Environment variable name for mock time (debug builds only)
pub const MOCK_TIME_ENV_VAR: &str = "PLAYCLOCK_MOCK_TIME";

/// Format accepted by `PLAYCLOCK_MOCK_TIME`
const MOCK_TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Cached mock time offset from the real time when the process started.
/// This allows mock time to advance naturally.
static MOCK_TIME_OFFSET: OnceLock<Option<chrono::Duration>> = OnceLock::new();

/// Initialize the mock time offset based on the environment variable.
/// Returns the offset between mock time and real time at process start.
fn get_mock_time_offset() -> Option<chrono::Duration> {
    *MOCK_TIME_OFFSET.get_or_init(|| {
        #[cfg(debug_assertions)]
        {
            if let Ok(mock_time_str) = std::env::var(MOCK_TIME_ENV_VAR) {
                if let Ok(naive_dt) = NaiveDateTime::parse_from_str(&mock_time_str, MOCK_TIME_FORMAT) {
                    if let Some(mock_dt) = Local.from_local_datetime(&naive_dt).single() {
                        let offset = mock_dt.signed_duration_since(Local::now());
                        tracing::info!(
                            mock_time = %mock_time_str,
                            offset_secs = offset.num_seconds(),
                            "Mock time enabled"
                        );
                        return Some(offset);
                    } else {
                        tracing::warn!(
                            mock_time = %mock_time_str,
                            "Failed to convert mock time to local timezone"
                        );
                    }
                } else {
                    tracing::warn!(
                        mock_time = %mock_time_str,
                        expected_format = MOCK_TIME_FORMAT,
                        "Invalid mock time format"
                    );
                }
            }
            None
        }
        #[cfg(not(debug_assertions))]
        {
            None
        }
    })
}

/// Returns whether mock time is currently active.
pub fn is_mock_time_active() -> bool {
    get_mock_time_offset().is_some()
}

/// Get the current local time, respecting mock time settings in debug builds.
///
/// In release builds, this always returns the real system time.
/// In debug builds, if `PLAYCLOCK_MOCK_TIME` is set, this returns a time
/// that advances from the mock time at the same rate as real time.
pub fn now() -> DateTime<Local> {
    let real_now = Local::now();

    if let Some(offset) = get_mock_time_offset() {
        real_now + offset
    } else {
        real_now
    }
}

/// Format a DateTime for display with full date and time.
pub fn format_datetime_full<Z: TimeZone>(dt: &DateTime<Z>) -> String
where
    Z::Offset: fmt::Display,
{
    dt.format("%Y-%m-%d %H:%M:%S").to_string()
}

/// Time of day at which the daily tracking window rolls over
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct TimeOfDay {
    pub hour: u32,
    pub minute: u32,
    pub second: u32,
}

impl TimeOfDay {
    pub const MIDNIGHT: TimeOfDay = TimeOfDay {
        hour: 0,
        minute: 0,
        second: 0,
    };

    pub fn new(hour: u32, minute: u32, second: u32) -> Result<Self> {
        if hour < 24 && minute < 60 && second < 60 {
            Ok(Self {
                hour,
                minute,
                second,
            })
        } else {
            Err(PlayclockError::InvalidTimeOfDay {
                hour,
                minute,
                second,
            })
        }
    }

    pub fn to_naive_time(self) -> NaiveTime {
        // Fields are range-checked on construction
        NaiveTime::from_hms_opt(self.hour, self.minute, self.second).unwrap_or(NaiveTime::MIN)
    }

    pub fn from_naive_time(time: NaiveTime) -> Self {
        Self {
            hour: time.hour(),
            minute: time.minute(),
            second: time.second(),
        }
    }
}

impl Default for TimeOfDay {
    fn default() -> Self {
        Self::MIDNIGHT
    }
}

impl fmt::Display for TimeOfDay {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02}:{:02}:{:02}", self.hour, self.minute, self.second)
    }
}

/// Time zone the daily window is measured in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Zone {
    /// The zone of the machine running the daemon
    #[default]
    Local,
    /// A named IANA zone, e.g. `Europe/Amsterdam`
    Named(Tz),
}

impl Zone {
    /// Parse an IANA zone name. `"local"` selects the system zone.
    pub fn parse(name: &str) -> Result<Self> {
        let name = name.trim();
        if name.eq_ignore_ascii_case("local") {
            return Ok(Zone::Local);
        }

        Tz::from_str(name)
            .map(Zone::Named)
            .map_err(|_| PlayclockError::UnknownTimeZone(name.to_string()))
    }
}

impl fmt::Display for Zone {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Zone::Local => write!(f, "local"),
            Zone::Named(tz) => write!(f, "{}", tz.name()),
        }
    }
}

/// Helper to format durations in human-readable form
pub fn format_duration(d: Duration) -> String {
    let total_secs = d.as_secs();
    let hours = total_secs / 3600;
    let minutes = (total_secs % 3600) / 60;
    let seconds = total_secs % 60;

    if hours > 0 {
        format!("{}h {}m {}s", hours, minutes, seconds)
    } else if minutes > 0 {
        format!("{}m {}s", minutes, seconds)
    } else {
        format!("{}s", seconds)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Datelike;

    #[test]
    fn test_time_of_day_ordering() {
        let early = TimeOfDay::new(4, 0, 0).unwrap();
        let noon = TimeOfDay::new(12, 0, 0).unwrap();
        let late = TimeOfDay::new(23, 59, 59).unwrap();

        assert!(TimeOfDay::MIDNIGHT < early);
        assert!(early < noon);
        assert!(noon < late);
    }

    #[test]
    fn test_time_of_day_range_checks() {
        assert!(TimeOfDay::new(24, 0, 0).is_err());
        assert!(TimeOfDay::new(0, 60, 0).is_err());
        assert!(TimeOfDay::new(0, 0, 60).is_err());
        assert_eq!(
            TimeOfDay::new(25, 0, 0),
            Err(PlayclockError::InvalidTimeOfDay {
                hour: 25,
                minute: 0,
                second: 0
            })
        );
    }

    #[test]
    fn test_time_of_day_naive_round_trip() {
        let tod = TimeOfDay::new(7, 30, 15).unwrap();
        assert_eq!(TimeOfDay::from_naive_time(tod.to_naive_time()), tod);
        assert_eq!(tod.to_string(), "07:30:15");
    }

    #[test]
    fn test_zone_parse() {
        assert_eq!(Zone::parse("local").unwrap(), Zone::Local);
        assert_eq!(
            Zone::parse("Europe/Amsterdam").unwrap(),
            Zone::Named(chrono_tz::Europe::Amsterdam)
        );
        assert!(matches!(
            Zone::parse("Mars/Olympus_Mons"),
            Err(PlayclockError::UnknownTimeZone(_))
        ));
        assert_eq!(Zone::parse("America/New_York").unwrap().to_string(), "America/New_York");
    }

    #[test]
    fn test_format_duration() {
        assert_eq!(format_duration(Duration::from_secs(30)), "30s");
        assert_eq!(format_duration(Duration::from_secs(90)), "1m 30s");
        assert_eq!(format_duration(Duration::from_secs(3661)), "1h 1m 1s");
    }

    #[test]
    fn test_format_datetime_full() {
        let dt = Local.with_ymd_and_hms(2025, 12, 25, 14, 30, 45).unwrap();
        assert_eq!(format_datetime_full(&dt), "2025-12-25 14:30:45");
    }

    #[test]
    fn test_now_returns_time() {
        let t = now();
        assert!(t.year() >= 2020);
        assert!(t.year() <= 2100);
    }

    #[test]
    fn test_parse_mock_time_format() {
        let valid_formats = ["2025-12-25 14:30:00", "2025-01-01 00:00:00", "2025-12-31 23:59:59"];

        for format_str in &valid_formats {
            let result = NaiveDateTime::parse_from_str(format_str, MOCK_TIME_FORMAT);
            assert!(result.is_ok(), "Expected '{}' to parse", format_str);
        }

        let invalid_formats = ["2025-12-25", "14:30:00", "2025-12-25T14:30:00", ""];

        for format_str in &invalid_formats {
            let result = NaiveDateTime::parse_from_str(format_str, MOCK_TIME_FORMAT);
            assert!(result.is_err(), "Expected '{}' to fail parsing", format_str);
        }
    }

    #[test]
    #[cfg(debug_assertions)]
    fn test_is_mock_time_active_in_debug() {
        // OnceLock makes the env var a process-wide setting; just make sure it doesn't panic
        let _ = is_mock_time_active();
    }
}
