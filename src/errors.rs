use std::{fmt::Display, num::ParseIntError};

use crate::color;
use homedir::GetHomeError;

/// What went wrong, so callers can tell a bad date string from a bad zone
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// The date/time expression could not be understood
    Parse,
    /// The timezone identifier is not in the zone database
    InvalidTimezone,
    /// The arithmetic left the range chrono can represent
    OutOfRange,
    Io,
    Config,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Error {
    pub kind: ErrorKind,
    pub message: String,
    pub source: String,
}

impl Error {
    pub fn is_parse(&self) -> bool {
        self.kind == ErrorKind::Parse
    }

    pub fn is_invalid_timezone(&self) -> bool {
        self.kind == ErrorKind::InvalidTimezone
    }
}

impl Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let Error {
            source, message, ..
        } = self;
        write!(
            f,
            "Error from {}:\n{}",
            color::yellow_string(source),
            color::red_string(message)
        )
    }
}

impl std::error::Error for Error {}

impl From<std::io::Error> for Error {
    fn from(value: std::io::Error) -> Self {
        new(ErrorKind::Io, "io", &format!("{value}"))
    }
}

impl From<ParseIntError> for Error {
    fn from(value: ParseIntError) -> Self {
        new(ErrorKind::Parse, "ParseIntError", &format!("{value}"))
    }
}

impl From<chrono_tz::ParseError> for Error {
    fn from(value: chrono_tz::ParseError) -> Self {
        new(ErrorKind::InvalidTimezone, "chrono_tz", &format!("{value}"))
    }
}

impl From<chrono::ParseError> for Error {
    fn from(value: chrono::ParseError) -> Self {
        new(ErrorKind::Parse, "chrono", &format!("{value}"))
    }
}

impl From<GetHomeError> for Error {
    fn from(value: GetHomeError) -> Self {
        new(ErrorKind::Io, "homedir", &format!("{value}"))
    }
}

impl From<serde_json::Error> for Error {
    fn from(value: serde_json::Error) -> Self {
        new(ErrorKind::Config, "serde_json", &format!("{value}"))
    }
}

pub fn new(kind: ErrorKind, source: &str, message: &str) -> Error {
    Error {
        kind,
        source: source.into(),
        message: message.into(),
    }
}

/// The expression could not be turned into an instant
pub fn parse(expression: &str) -> Error {
    new(
        ErrorKind::Parse,
        "parse",
        &format!("Could not parse date/time: {expression:?}"),
    )
}

pub fn invalid_timezone(name: &str) -> Error {
    new(
        ErrorKind::InvalidTimezone,
        "timezone",
        &format!("Unknown or invalid timezone: {name:?}"),
    )
}

pub fn out_of_range(what: &str) -> Error {
    new(
        ErrorKind::OutOfRange,
        "chrono",
        &format!("{what} is out of the supported date range"),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn can_format() {
        let error = new(ErrorKind::Config, "hello", "there");
        assert_eq!(error.to_string(), String::from("Error from hello:\nthere"))
    }

    #[test]
    fn kinds_are_distinguishable() {
        assert!(parse("blah").is_parse());
        assert!(!parse("blah").is_invalid_timezone());
        assert!(invalid_timezone("Mars/Olympus").is_invalid_timezone());
        assert_eq!(out_of_range("year").kind, ErrorKind::OutOfRange);
    }

    #[test]
    fn chrono_tz_errors_are_timezone_errors() {
        let error: Error = "Not/AZone".parse::<chrono_tz::Tz>().unwrap_err().into();
        assert_eq!(error.kind, ErrorKind::InvalidTimezone);
        assert_eq!(error.source, "chrono_tz");
    }
}
