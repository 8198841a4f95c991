/*!
The [`Format`] type.

A format renders a [`LogEntry`] into text before it's encoded with the writer's charset. Records are always terminated by a line feed.
*/

use std::fmt::{self, Write as _};

use crate::{
    date::DatePattern,
    diagnostics::Diagnostics,
    entry::{Field, Fields, LogEntry},
    error::{Error, ErrorKind},
};

/**
The line pattern used when none is configured.
*/
pub const DEFAULT_PATTERN: &str = "{message}{exception}";

/**
The date pattern used by `{date}` without an argument.
*/
pub const DEFAULT_DATE_PATTERN: &str = "yyyy-MM-dd HH:mm:ss";

/**
How entries are rendered.
*/
#[derive(Debug, Clone, PartialEq)]
pub enum Format {
    /**
    Plain text following a pattern.
    */
    Line(LinePattern),
    /**
    One JSON object per line.
    */
    #[cfg(feature = "json")]
    Json,
}

impl Default for Format {
    fn default() -> Self {
        Format::Line(LinePattern::default())
    }
}

impl Format {
    /**
    Find a format by name, like `line` or `json`.

    Line formats use `pattern`, or [`DEFAULT_PATTERN`] if there isn't one.
    */
    pub fn lookup(name: &str, pattern: Option<&str>, diagnostics: impl Diagnostics) -> Option<Format> {
        match &*name.trim().to_ascii_lowercase() {
            "line" | "pattern" | "text" => Some(Format::Line(
                pattern
                    .map(|pattern| LinePattern::parse(pattern, &diagnostics))
                    .unwrap_or_default(),
            )),
            #[cfg(feature = "json")]
            "json" | "ndjson" | "structured" => Some(Format::Json),
            _ => None,
        }
    }

    /**
    The fields of an entry this format reads.
    */
    pub fn required_fields(&self) -> Fields {
        match self {
            Format::Line(pattern) => pattern.required_fields(),
            #[cfg(feature = "json")]
            Format::Json => Fields::all(),
        }
    }

    /**
    Render `entry` onto the end of `out`.
    */
    pub fn render(&self, entry: &LogEntry, out: &mut String) -> Result<(), Error> {
        match self {
            Format::Line(pattern) => {
                pattern.render(entry, out);
                Ok(())
            }
            #[cfg(feature = "json")]
            Format::Json => json::render(entry, out),
        }
    }
}

/**
A parsed line pattern, like `{date} [{thread}] {level}: {message}`.

Supported placeholders are `{date}` (or `{date: pattern}`), `{level}`, `{thread}`, `{class}`, `{method}`, `{message}`, and `{exception}`. An exception is rendered on its own line, and nothing is rendered if the entry doesn't have one.
*/
#[derive(Debug, Clone, PartialEq)]
pub struct LinePattern {
    tokens: Vec<Token>,
}

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Literal(String),
    Date(DatePattern),
    Level,
    Thread,
    Class,
    Method,
    Message,
    Exception,
}

impl Default for LinePattern {
    fn default() -> Self {
        LinePattern::parse(DEFAULT_PATTERN, crate::diagnostics::Discard)
    }
}

impl LinePattern {
    /**
    Parse a line pattern.

    A line feed is appended if the pattern doesn't end with one. Unknown placeholders and unterminated braces are reported to `diagnostics` and rendered as-is.
    */
    pub fn parse(pattern: &str, diagnostics: impl Diagnostics) -> Self {
        let mut tokens = Vec::new();
        let mut literal = String::new();

        let mut rest = pattern;

        while let Some(open) = rest.find('{') {
            literal.push_str(&rest[..open]);

            let Some(close) = rest[open..].find('}').map(|close| open + close) else {
                diagnostics.error(format_args!(
                    "the pattern {pattern:?} has an unterminated placeholder"
                ));

                literal.push_str(&rest[open..]);
                rest = "";
                break;
            };

            let placeholder = &rest[open + 1..close];

            let (name, argument) = match placeholder.split_once(':') {
                Some((name, argument)) => (name.trim(), Some(argument.trim())),
                None => (placeholder.trim(), None),
            };

            let token = match name {
                "date" => match DatePattern::new(argument.unwrap_or(DEFAULT_DATE_PATTERN)) {
                    Ok(date) => Some(Token::Date(date)),
                    Err(err) => {
                        diagnostics.error(format_args!("{err}"));
                        None
                    }
                },
                "level" => Some(Token::Level),
                "thread" => Some(Token::Thread),
                "class" => Some(Token::Class),
                "method" => Some(Token::Method),
                "message" => Some(Token::Message),
                "exception" => Some(Token::Exception),
                _ => {
                    diagnostics.error(format_args!(
                        "unknown placeholder {{{name}}} in the pattern {pattern:?}"
                    ));
                    None
                }
            };

            match token {
                Some(token) => {
                    if !literal.is_empty() {
                        tokens.push(Token::Literal(std::mem::take(&mut literal)));
                    }

                    tokens.push(token);
                }
                None => literal.push_str(&rest[open..=close]),
            }

            rest = &rest[close + 1..];
        }

        literal.push_str(rest);

        if !pattern.ends_with('\n') {
            literal.push('\n');
        }

        tokens.push(Token::Literal(literal));

        LinePattern { tokens }
    }

    /**
    The fields of an entry this pattern reads.
    */
    pub fn required_fields(&self) -> Fields {
        self.tokens
            .iter()
            .filter_map(|token| match token {
                Token::Literal(_) => None,
                Token::Date(_) => Some(Field::Timestamp),
                Token::Level => Some(Field::Level),
                Token::Thread => Some(Field::Thread),
                Token::Class => Some(Field::Class),
                Token::Method => Some(Field::Method),
                Token::Message => Some(Field::Message),
                Token::Exception => Some(Field::Exception),
            })
            .collect()
    }

    /**
    Render `entry` onto the end of `out`.
    */
    pub fn render(&self, entry: &LogEntry, out: &mut String) {
        for token in &self.tokens {
            match token {
                Token::Literal(text) => out.push_str(text),
                Token::Date(pattern) => {
                    if let Some(timestamp) = entry.timestamp() {
                        pattern.format_into(timestamp, out);
                    }
                }
                Token::Level => {
                    let _ = write!(out, "{}", entry.level());
                }
                Token::Thread => out.push_str(entry.thread().unwrap_or_default()),
                Token::Class => out.push_str(entry.class().unwrap_or_default()),
                Token::Method => out.push_str(entry.method().unwrap_or_default()),
                Token::Message => out.push_str(entry.message().unwrap_or_default()),
                Token::Exception => {
                    if let Some(exception) = entry.exception() {
                        out.push('\n');
                        out.push_str(exception.trim_end_matches('\n'));
                    }
                }
            }
        }
    }
}

impl fmt::Display for LinePattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for token in &self.tokens {
            match token {
                Token::Literal(text) => f.write_str(text)?,
                Token::Date(pattern) => write!(f, "{{date: {}}}", pattern.pattern())?,
                Token::Level => f.write_str("{level}")?,
                Token::Thread => f.write_str("{thread}")?,
                Token::Class => f.write_str("{class}")?,
                Token::Method => f.write_str("{method}")?,
                Token::Message => f.write_str("{message}")?,
                Token::Exception => f.write_str("{exception}")?,
            }
        }

        Ok(())
    }
}

#[cfg(feature = "json")]
mod json {
    use std::fmt;

    use chrono::SecondsFormat;

    use super::*;

    struct EntryValue<'a, 'b>(&'a LogEntry<'b>);

    fn stream_field<'sval, S: sval::Stream<'sval> + ?Sized>(
        stream: &mut S,
        label: &'static str,
        value: impl fmt::Display,
    ) -> sval::Result {
        stream.record_value_begin(None, &sval::Label::new(label))?;
        sval::stream_display(&mut *stream, value)?;
        stream.record_value_end(None, &sval::Label::new(label))
    }

    impl<'a, 'b> sval::Value for EntryValue<'a, 'b> {
        fn stream<'sval, S: sval::Stream<'sval> + ?Sized>(
            &'sval self,
            stream: &mut S,
        ) -> sval::Result {
            let entry = self.0;

            stream.record_begin(None, None, None, None)?;

            if let Some(timestamp) = entry.timestamp() {
                stream_field(
                    &mut *stream,
                    "time",
                    timestamp.to_rfc3339_opts(SecondsFormat::Millis, true),
                )?;
            }

            stream_field(&mut *stream, "level", entry.level())?;

            for (label, value) in [
                ("thread", entry.thread()),
                ("class", entry.class()),
                ("method", entry.method()),
                ("message", entry.message()),
                ("exception", entry.exception()),
            ] {
                if let Some(value) = value {
                    stream_field(&mut *stream, label, value)?;
                }
            }

            stream.record_end(None, None, None)
        }
    }

    pub(super) fn render(entry: &LogEntry, out: &mut String) -> Result<(), Error> {
        let mut buf = Vec::new();

        sval_json::stream_to_io_write(&mut buf, EntryValue(entry))
            .map_err(|e| Error::new(ErrorKind::Format, e))?;

        let json = std::str::from_utf8(&buf).map_err(|e| Error::new(ErrorKind::Format, e))?;

        out.push_str(json);
        out.push('\n');

        Ok(())
    }
}
