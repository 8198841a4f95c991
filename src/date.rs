/*!
The [`DatePattern`] type.

Date patterns use the letters familiar from logging configuration files, like `yyyy-MM-dd_HH-mm`, and are compiled into `chrono` format strings. The same pattern is used to render timestamps into file names and to parse them back out again when resuming an existing set of files.

Supported letters are:

| Letter | Meaning | Examples |
|---|---|---|
| `y`, `u` | year | `yyyy` → `2024`, `yy` → `24` |
| `M`, `L` | month | `M` → `3`, `MM` → `03`, `MMM` → `Mar`, `MMMM` → `March` |
| `d` | day of month | `d` → `7`, `dd` → `07` |
| `D` | day of year | `DDD` → `067` |
| `w` | ISO week of year | `w` → `9`, `ww` → `09` |
| `E` | day of week | `EEE` → `Mon`, `EEEE` → `Monday` |
| `a` | AM/PM marker | `PM` |
| `H`, `h` | hour (0-23, 1-12) | `HH` → `17`, `hh` → `05` |
| `m`, `s` | minute, second | `mm` → `04` |
| `S` | fraction of second | `SSS`, `SSSSSS`, `SSSSSSSSS` |
| `X`, `x`, `Z` | offset | `X` → `+0100`, `XXX` → `+01:00` |

Text in single quotes is copied verbatim, with `''` producing one quote. Optional sections in square brackets are rejected because a value rendered from them can't be parsed back unambiguously.
*/

use std::{cmp::Ordering, fmt::Write as _};

use chrono::{
    format::{Item, Parsed, StrftimeItems},
    FixedOffset, NaiveDate, NaiveDateTime, NaiveTime, TimeDelta, TimeZone,
};

use crate::{error::Error, Timestamp};

/**
A compiled date-time pattern.
*/
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DatePattern {
    pattern: String,
    strftime: String,
}

impl DatePattern {
    /**
    Compile a pattern.

    Fails if the pattern contains optional sections, unterminated quotes, or unsupported letters.
    */
    pub fn new(pattern: &str) -> Result<Self, Error> {
        let strftime = compile(pattern)?;

        if StrftimeItems::new(&strftime).any(|item| matches!(item, Item::Error)) {
            return Err(Error::config(format!(
                "the date pattern {pattern:?} can't be formatted"
            )));
        }

        Ok(DatePattern {
            pattern: pattern.to_owned(),
            strftime,
        })
    }

    /**
    The pattern as it was originally written.
    */
    pub fn pattern(&self) -> &str {
        &self.pattern
    }

    /**
    Whether values produced by this pattern may contain a path separator.
    */
    pub fn contains_separator(&self) -> bool {
        self.pattern.contains(['/', '\\'])
    }

    /**
    Render `ts` onto the end of `out`.
    */
    pub fn format_into(&self, ts: &Timestamp, out: &mut String) {
        // The items were validated when the pattern was compiled
        let _ = write!(out, "{}", ts.format(&self.strftime));
    }

    /**
    Render `ts` into a new string.
    */
    pub fn format(&self, ts: &Timestamp) -> String {
        let mut out = String::new();
        self.format_into(ts, &mut out);
        out
    }

    /**
    Parse a value from the start of `text`.

    Returns the parsed moment along with the number of bytes of `text` it covers. Trailing text, such as a file extension, is left unparsed.
    */
    pub fn parse_prefix(&self, text: &str) -> Option<(Moment, usize)> {
        let mut parsed = Parsed::new();
        let remainder =
            chrono::format::parse_and_remainder(&mut parsed, text, StrftimeItems::new(&self.strftime))
                .ok()?;

        let moment = Moment::from_parsed(&parsed)?;

        Some((moment, text.len() - remainder.len()))
    }
}

fn compile(pattern: &str) -> Result<String, Error> {
    let unsupported = |what: &str| {
        Error::config(format!(
            "the date pattern {pattern:?} contains {what}, which is not supported"
        ))
    };

    let mut strftime = String::with_capacity(pattern.len() * 2);
    let mut chars = pattern.chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            '\'' => {
                if chars.peek() == Some(&'\'') {
                    chars.next();
                    strftime.push('\'');
                    continue;
                }

                let mut terminated = false;

                while let Some(c) = chars.next() {
                    if c == '\'' {
                        if chars.peek() == Some(&'\'') {
                            chars.next();
                            strftime.push('\'');
                        } else {
                            terminated = true;
                            break;
                        }
                    } else {
                        push_literal(&mut strftime, c);
                    }
                }

                if !terminated {
                    return Err(unsupported("an unterminated quote"));
                }
            }
            '[' | ']' => return Err(unsupported("an optional section")),
            c if c.is_ascii_alphabetic() => {
                let mut count = 1;
                while chars.peek() == Some(&c) {
                    chars.next();
                    count += 1;
                }

                let directive = match (c, count) {
                    ('y' | 'u', 2) => "%y",
                    ('y' | 'u', _) => "%Y",
                    ('M' | 'L', 1) => "%-m",
                    ('M' | 'L', 2) => "%m",
                    ('M' | 'L', 3) => "%b",
                    ('M' | 'L', _) => "%B",
                    ('d', 1) => "%-d",
                    ('d', 2) => "%d",
                    ('D', 1) => "%-j",
                    ('D', 2 | 3) => "%j",
                    ('w', 1) => "%-V",
                    ('w', 2) => "%V",
                    ('E', 1..=3) => "%a",
                    ('E', _) => "%A",
                    ('a', 1) => "%p",
                    ('H', 1) => "%-H",
                    ('H', 2) => "%H",
                    ('h', 1) => "%-I",
                    ('h', 2) => "%I",
                    ('m', 1) => "%-M",
                    ('m', 2) => "%M",
                    ('s', 1) => "%-S",
                    ('s', 2) => "%S",
                    ('S', 3) => "%3f",
                    ('S', 6) => "%6f",
                    ('S', 9) => "%9f",
                    ('X' | 'x', 1 | 2) | ('Z', 1..=3) => "%z",
                    ('X' | 'x', 3) | ('Z', 5) => "%:z",
                    (c, count) => {
                        return Err(unsupported(&format!(
                            "the letter {:?}",
                            c.to_string().repeat(count)
                        )))
                    }
                };

                strftime.push_str(directive);
            }
            c => push_literal(&mut strftime, c),
        }
    }

    Ok(strftime)
}

fn push_literal(strftime: &mut String, c: char) {
    if c == '%' {
        strftime.push_str("%%");
    } else {
        strftime.push(c);
    }
}

/**
A value parsed from a [`DatePattern`].

Moments are only comparable when they were parsed into the same shape. A full date-time with an offset can't be ordered against one without, and a year-month can't be ordered against a day of the week.
*/
#[derive(Debug, Clone, PartialEq)]
pub enum Moment {
    /**
    A date and time with an offset.
    */
    Instant(chrono::DateTime<FixedOffset>),
    /**
    A date and time without an offset.
    */
    Local(NaiveDateTime),
    /**
    A date.
    */
    Date(NaiveDate),
    /**
    A time with an offset, normalized to UTC.
    */
    OffsetTime(NaiveTime),
    /**
    A time.
    */
    Time(NaiveTime),
    /**
    Some subset of calendar fields, like a year-month or a day of the week.
    */
    Partial(Partial),
}

/**
Calendar fields that don't form a full date or time.
*/
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Partial {
    year: Option<i32>,
    month: Option<u32>,
    isoweek: Option<u32>,
    day: Option<u32>,
    weekday: Option<u32>,
}

impl Partial {
    fn shape(&self) -> [bool; 5] {
        [
            self.year.is_some(),
            self.month.is_some(),
            self.isoweek.is_some(),
            self.day.is_some(),
            self.weekday.is_some(),
        ]
    }

    fn is_empty(&self) -> bool {
        self.shape().iter().all(|set| !set)
    }
}

impl Moment {
    fn from_parsed(parsed: &Parsed) -> Option<Moment> {
        let hour = match (parsed.hour_div_12(), parsed.hour_mod_12()) {
            (Some(div), Some(rem)) => Some(div * 12 + rem),
            _ => None,
        };

        let date = parsed.to_naive_date().ok();
        // Patterns like `yyyy-MM-dd_HH` don't carry minutes
        let time = parsed
            .to_naive_time()
            .ok()
            .or_else(|| NaiveTime::from_hms_opt(hour?, 0, 0));
        let offset = parsed.offset();

        match (date, time, offset) {
            (Some(date), Some(time), Some(offset)) => {
                let offset = FixedOffset::east_opt(offset)?;

                offset
                    .from_local_datetime(&date.and_time(time))
                    .single()
                    .map(Moment::Instant)
            }
            (Some(date), Some(time), None) => Some(Moment::Local(date.and_time(time))),
            (Some(date), None, _) => Some(Moment::Date(date)),
            (None, Some(time), Some(offset)) => {
                let (utc, _) = time.overflowing_sub_signed(TimeDelta::seconds(i64::from(offset)));

                Some(Moment::OffsetTime(utc))
            }
            (None, Some(time), None) => Some(Moment::Time(time)),
            (None, None, _) => {
                let partial = Partial {
                    year: parsed.year(),
                    month: parsed.month(),
                    isoweek: parsed.isoweek(),
                    day: parsed.day(),
                    weekday: parsed.weekday().map(|wd| wd.num_days_from_monday()),
                };

                // A bare offset doesn't identify a point in time
                if partial.is_empty() {
                    None
                } else {
                    Some(Moment::Partial(partial))
                }
            }
        }
    }
}

impl PartialOrd for Moment {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        match (self, other) {
            (Moment::Instant(a), Moment::Instant(b)) => Some(a.cmp(b)),
            (Moment::Local(a), Moment::Local(b)) => Some(a.cmp(b)),
            (Moment::Date(a), Moment::Date(b)) => Some(a.cmp(b)),
            (Moment::OffsetTime(a), Moment::OffsetTime(b)) => Some(a.cmp(b)),
            (Moment::Time(a), Moment::Time(b)) => Some(a.cmp(b)),
            (Moment::Partial(a), Moment::Partial(b)) if a.shape() == b.shape() => Some(
                (a.year, a.month, a.isoweek, a.day, a.weekday)
                    .cmp(&(b.year, b.month, b.isoweek, b.day, b.weekday)),
            ),
            _ => None,
        }
    }
}
