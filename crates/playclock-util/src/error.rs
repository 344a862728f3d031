//! Error types for playclockd

use thiserror::Error;

/// Errors from parsing shared time values
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PlayclockError {
    #[error("Invalid time of day {hour:02}:{minute:02}:{second:02}")]
    InvalidTimeOfDay { hour: u32, minute: u32, second: u32 },

    #[error("Unknown time zone: {0}")]
    UnknownTimeZone(String),
}

pub type Result<T> = std::result::Result<T, PlayclockError>;
