use std::fmt;

use crate::types::DayOfWeek;

#[derive(Debug)]
pub enum Error {
    Http(reqwest::Error),
    Protocol(String),
    EmptySchedule,
    DuplicateEntry { day: DayOfWeek, minutes: u16 },
    InvalidClock(String),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Http(e) => write!(f, "HTTP error: {e}"),
            Error::Protocol(msg) => write!(f, "protocol error: {msg}"),
            Error::EmptySchedule => write!(f, "switch program has no switch points"),
            Error::DuplicateEntry { day, minutes } => {
                write!(f, "duplicate switch point: {} {minutes}min", day.as_bosch_str())
            }
            Error::InvalidClock(raw) => write!(f, "unparseable gateway clock: {raw}"),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Http(e) => Some(e),
            _ => None,
        }
    }
}

impl From<reqwest::Error> for Error {
    fn from(e: reqwest::Error) -> Self {
        Error::Http(e)
    }
}

pub type Result<T> = std::result::Result<T, Error>;
