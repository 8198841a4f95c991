use std::{fmt, str::FromStr};

/**
The severity of a [`crate::LogEntry`].
*/
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Level {
    /**
    Very fine-grained tracing output.
    */
    Trace,
    /**
    Diagnostic output for developers.
    */
    Debug,
    /**
    Normal operational output.
    */
    Info,
    /**
    Something unexpected that didn't prevent progress.
    */
    Warn,
    /**
    Something failed.
    */
    Error,
}

impl fmt::Debug for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "\"{}\"", self)
    }
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Level::Trace => "TRACE",
            Level::Debug => "DEBUG",
            Level::Info => "INFO",
            Level::Warn => "WARN",
            Level::Error => "ERROR",
        })
    }
}

impl FromStr for Level {
    type Err = ParseLevelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();

        [
            Level::Trace,
            Level::Debug,
            Level::Info,
            Level::Warn,
            Level::Error,
        ]
        .into_iter()
        .find(|lvl| lvl.to_string().eq_ignore_ascii_case(s))
        .or_else(|| s.eq_ignore_ascii_case("warning").then_some(Level::Warn))
        .ok_or(ParseLevelError {})
    }
}

impl Default for Level {
    fn default() -> Self {
        Level::Info
    }
}

/**
An error attempting to parse a [`Level`] from text.
*/
#[derive(Debug)]
pub struct ParseLevelError {}

impl fmt::Display for ParseLevelError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("the input was not a valid level")
    }
}

impl std::error::Error for ParseLevelError {}
