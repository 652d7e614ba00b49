//! Programme timestamp handling
//!
//! Sources send programme times either with an offset or without one. Times
//! without an offset are kept naive: they are never converted to a guessed
//! zone, and are written back without an offset suffix.
//!
//! # Usage
//!
//! ```rust
//! use iptv_manager::utils::datetime::DateTimeParser;
//!
//! let zoned = DateTimeParser::parse_program_time("2024-01-01T10:00:00+01:00").unwrap();
//! assert_eq!(zoned.to_xmltv(), "20240101100000 +0100");
//!
//! let naive = DateTimeParser::parse_program_time("2024-01-01 10:00:00").unwrap();
//! assert_eq!(naive.to_xmltv(), "20240101100000");
//! ```

use chrono::{DateTime, FixedOffset, NaiveDateTime};
use thiserror::Error;

const XMLTV_FORMAT: &str = "%Y%m%d%H%M%S";

/// Formats tried for timestamps that carry an offset
const ZONED_FORMATS: [&str; 4] = [
    "%Y-%m-%dT%H:%M:%S%z",
    "%Y-%m-%d %H:%M:%S%z",
    "%Y-%m-%d %H:%M:%S %z",
    "%Y%m%d%H%M%S %z",
];

/// Formats tried for timestamps without an offset
const NAIVE_FORMATS: [&str; 4] = [
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
    "%Y%m%d%H%M%S",
];

#[derive(Error, Debug)]
pub enum DateTimeError {
    #[error("Invalid datetime format: '{input}'")]
    InvalidFormat { input: String },
}

/// A programme start or stop time
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProgramTime {
    Zoned(DateTime<FixedOffset>),
    Naive(NaiveDateTime),
}

impl ProgramTime {
    /// `YYYYMMDDHHMMSS ±ZZZZ`, or without the offset for naive times
    pub fn to_xmltv(&self) -> String {
        match self {
            ProgramTime::Zoned(time) => time.format(&format!("{XMLTV_FORMAT} %z")).to_string(),
            ProgramTime::Naive(time) => time.format(XMLTV_FORMAT).to_string(),
        }
    }

    /// ISO-8601 representation, keeping the offset when there is one
    pub fn to_iso8601(&self) -> String {
        match self {
            ProgramTime::Zoned(time) => time.to_rfc3339(),
            ProgramTime::Naive(time) => time.format("%Y-%m-%dT%H:%M:%S").to_string(),
        }
    }
}

pub struct DateTimeParser;

impl DateTimeParser {
    /// Parse a programme timestamp in any of the accepted layouts
    pub fn parse_program_time(input: &str) -> Result<ProgramTime, DateTimeError> {
        let trimmed = input.trim();

        if let Ok(time) = DateTime::parse_from_rfc3339(trimmed) {
            return Ok(ProgramTime::Zoned(time));
        }

        for format in ZONED_FORMATS {
            if let Ok(time) = DateTime::parse_from_str(trimmed, format) {
                return Ok(ProgramTime::Zoned(time));
            }
        }

        for format in NAIVE_FORMATS {
            if let Ok(time) = NaiveDateTime::parse_from_str(trimmed, format) {
                return Ok(ProgramTime::Naive(time));
            }
        }

        Err(DateTimeError::InvalidFormat {
            input: input.to_string(),
        })
    }
}
