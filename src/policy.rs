/*!
The [`Policy`] type.

A policy decides two things: whether a file left behind by a previous run may be continued when a writer starts, and whether the next record must start a new file.

Date-based policies start a new file once a [`Rollover`] boundary has passed. A daily boundary falls every day at the rollover time, a weekly one every Monday, and a monthly one on the first day of every month.
*/

use std::fmt;

use chrono::{Datelike, Days, FixedOffset, Local, Months, NaiveDate, NaiveDateTime, NaiveTime, Timelike};

use crate::{clock::Timestamp, diagnostics::Diagnostics, error::Error};

/**
A rotation policy.
*/
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Policy {
    /**
    Never start a new file.
    */
    Endless,
    /**
    Start a new file each time a writer starts.
    */
    Startup,
    /**
    Start a new file before one would grow past the given number of bytes.
    */
    Size(u64),
    /**
    Start a new file every day at the rollover time.
    */
    Daily(Rollover),
    /**
    Start a new file every Monday at the rollover time.
    */
    Weekly(Rollover),
    /**
    Start a new file on the first day of every month at the rollover time.
    */
    Monthly(Rollover),
    /**
    Continue only if every member allows it, and rotate as soon as any member requires it.
    */
    Composite(Vec<Policy>),
}

impl Default for Policy {
    fn default() -> Self {
        Policy::Endless
    }
}

impl Policy {
    /**
    Combine a set of policies.

    A single policy is returned as-is, and an empty set behaves like [`Policy::Endless`].
    */
    pub fn composite(policies: impl IntoIterator<Item = Policy>) -> Policy {
        let mut policies = policies.into_iter().collect::<Vec<_>>();

        match policies.len() {
            0 => Policy::Endless,
            1 => policies.remove(0),
            _ => Policy::Composite(policies),
        }
    }

    /**
    Whether an existing file with `existing` bytes, last modified at `modified`, may be appended to at `now`.

    Date-based policies refuse files whose modification time is unknown.
    */
    pub fn can_continue(&self, existing: u64, modified: Option<&Timestamp>, now: &Timestamp) -> bool {
        match self {
            Policy::Endless => true,
            Policy::Startup => false,
            Policy::Size(max) => existing < *max,
            Policy::Daily(rollover) => {
                modified.is_some_and(|modified| !rollover.passed(Period::Daily, modified, now))
            }
            Policy::Weekly(rollover) => {
                modified.is_some_and(|modified| !rollover.passed(Period::Weekly, modified, now))
            }
            Policy::Monthly(rollover) => {
                modified.is_some_and(|modified| !rollover.passed(Period::Monthly, modified, now))
            }
            Policy::Composite(policies) => policies
                .iter()
                .all(|p| p.can_continue(existing, modified, now)),
        }
    }

    /**
    Whether writing `incoming` more bytes at `now` to a file of `current` bytes, opened at `opened`, requires a new file.
    */
    pub fn would_exceed(&self, current: u64, incoming: u64, opened: &Timestamp, now: &Timestamp) -> bool {
        match self {
            Policy::Endless | Policy::Startup => false,
            Policy::Size(max) => current.saturating_add(incoming) > *max,
            Policy::Daily(rollover) => rollover.passed(Period::Daily, opened, now),
            Policy::Weekly(rollover) => rollover.passed(Period::Weekly, opened, now),
            Policy::Monthly(rollover) => rollover.passed(Period::Monthly, opened, now),
            Policy::Composite(policies) => policies
                .iter()
                .any(|p| p.would_exceed(current, incoming, opened, now)),
        }
    }

    /**
    Parse a single policy, like `startup` or `size: 10MB`.
    */
    pub fn parse(text: &str) -> Result<Policy, Error> {
        let (name, argument) = match text.split_once(':') {
            Some((name, argument)) => (name.trim(), Some(argument.trim())),
            None => (text.trim(), None),
        };

        match (&*name.to_ascii_lowercase(), argument) {
            ("endless", None) => Ok(Policy::Endless),
            ("startup", None) => Ok(Policy::Startup),
            ("size", Some(argument)) => match parse_size(argument) {
                Some(max) => Ok(Policy::Size(max)),
                None => Err(Error::config(format!(
                    "invalid size {argument:?} for the size policy"
                ))),
            },
            ("size", None) => Err(Error::config("the size policy requires a maximum size")),
            ("daily", argument) => Ok(Policy::Daily(Rollover::parse_argument(argument)?)),
            ("weekly", argument) => Ok(Policy::Weekly(Rollover::parse_argument(argument)?)),
            ("monthly", argument) => Ok(Policy::Monthly(Rollover::parse_argument(argument)?)),
            ("endless" | "startup", Some(argument)) => Err(Error::config(format!(
                "the {name} policy does not accept an argument, but got {argument:?}"
            ))),
            _ => Err(Error::config(format!("unknown policy {name:?}"))),
        }
    }

    /**
    Parse a comma-separated list of policies.

    Policies that can't be parsed are reported to `diagnostics` and skipped; the rest still apply.
    */
    pub fn parse_list(text: &str, diagnostics: impl Diagnostics) -> Policy {
        Policy::composite(
            text.split(',')
                .map(str::trim)
                .filter(|policy| !policy.is_empty())
                .filter_map(|policy| match Policy::parse(policy) {
                    Ok(policy) => Some(policy),
                    Err(err) => {
                        diagnostics.error(format_args!("{err}; ignoring {policy:?}"));
                        None
                    }
                }),
        )
    }
}

impl fmt::Display for Policy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Policy::Endless => f.write_str("endless"),
            Policy::Startup => f.write_str("startup"),
            Policy::Size(max) => write!(f, "size: {max}"),
            Policy::Daily(rollover) => write!(f, "daily: {rollover}"),
            Policy::Weekly(rollover) => write!(f, "weekly: {rollover}"),
            Policy::Monthly(rollover) => write!(f, "monthly: {rollover}"),
            Policy::Composite(policies) => {
                let mut first = true;

                for policy in policies {
                    if !first {
                        f.write_str(", ")?;
                    }
                    first = false;

                    fmt::Display::fmt(policy, f)?;
                }

                Ok(())
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Period {
    Daily,
    Weekly,
    Monthly,
}

/**
The time of day a date-based [`Policy`] starts a new file at.

Without an offset, boundaries are computed in the system's local time.
*/
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rollover {
    time: NaiveTime,
    offset: Option<FixedOffset>,
}

impl Default for Rollover {
    fn default() -> Self {
        Rollover::midnight()
    }
}

impl Rollover {
    /**
    Roll over at 00:00 local time.
    */
    pub const fn midnight() -> Self {
        Rollover {
            time: NaiveTime::MIN,
            offset: None,
        }
    }

    /**
    Roll over at the given time of day.
    */
    pub fn at(time: NaiveTime) -> Self {
        Rollover { time, offset: None }
    }

    /**
    Compute boundaries at a fixed offset from UTC instead of local time.
    */
    pub fn with_offset(mut self, offset: FixedOffset) -> Self {
        self.offset = Some(offset);
        self
    }

    pub fn time(&self) -> NaiveTime {
        self.time
    }

    pub fn offset(&self) -> Option<FixedOffset> {
        self.offset
    }

    /**
    Parse a rollover like `6`, `06:30`, `23h15@UTC`, or `@+01:00`.

    The hour comes first, optionally followed by minutes after any non-digit separator. A zone follows `@`, either `UTC`/`GMT`/`Z` or an offset like `+01:00`, `-0530`, or `UTC+2`.
    */
    pub fn parse(text: &str) -> Result<Rollover, Error> {
        let text = text.trim();

        let (time, zone) = match text.split_once('@') {
            Some((time, zone)) => (time.trim(), Some(zone.trim())),
            None => (text, None),
        };

        let time = if time.is_empty() {
            NaiveTime::MIN
        } else {
            parse_time(time)
                .ok_or_else(|| Error::config(format!("invalid rollover time {time:?}")))?
        };

        let offset = match zone {
            Some(zone) => Some(parse_offset(zone).ok_or_else(|| {
                Error::config(format!(
                    "unsupported time zone {zone:?}; only UTC and fixed offsets are supported"
                ))
            })?),
            None => None,
        };

        Ok(Rollover { time, offset })
    }

    fn parse_argument(argument: Option<&str>) -> Result<Rollover, Error> {
        argument.map_or(Ok(Rollover::midnight()), Rollover::parse)
    }

    fn local(&self, ts: &Timestamp) -> NaiveDateTime {
        match self.offset {
            Some(offset) => ts.with_timezone(&offset).naive_local(),
            None => ts.with_timezone(&Local).naive_local(),
        }
    }

    /**
    The most recent boundary at or before `now`.
    */
    fn last_boundary(&self, period: Period, now: NaiveDateTime) -> NaiveDateTime {
        let date = now.date();

        let start = match period {
            Period::Daily => date,
            Period::Weekly => date
                .checked_sub_days(Days::new(date.weekday().num_days_from_monday().into()))
                .unwrap_or(date),
            Period::Monthly => date.with_day(1).unwrap_or(date),
        };

        let boundary = start.and_time(self.time);
        if boundary <= now {
            return boundary;
        }

        let previous: Option<NaiveDate> = match period {
            Period::Daily => start.checked_sub_days(Days::new(1)),
            Period::Weekly => start.checked_sub_days(Days::new(7)),
            Period::Monthly => start.checked_sub_months(Months::new(1)),
        };

        previous.unwrap_or(start).and_time(self.time)
    }

    /**
    Whether a boundary falls after `since` and at or before `now`.
    */
    fn passed(&self, period: Period, since: &Timestamp, now: &Timestamp) -> bool {
        self.last_boundary(period, self.local(now)) > self.local(since)
    }
}

impl fmt::Display for Rollover {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02}:{:02}", self.time.hour(), self.time.minute())?;

        if let Some(offset) = self.offset {
            write!(f, "@{offset}")?;
        }

        Ok(())
    }
}

fn parse_time(text: &str) -> Option<NaiveTime> {
    let hour_len = text
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(text.len());

    if hour_len == 0 || hour_len > 2 {
        return None;
    }

    let (hour, rest) = text.split_at(hour_len);
    let hour = hour.parse::<u32>().ok()?;

    let minute = if rest.is_empty() {
        0
    } else {
        let minute = rest.trim_start_matches(|c: char| !c.is_ascii_digit());

        if minute.is_empty() || minute.len() > 2 || !minute.bytes().all(|b| b.is_ascii_digit()) {
            return None;
        }

        minute.parse::<u32>().ok()?
    };

    NaiveTime::from_hms_opt(hour, minute, 0)
}

fn parse_offset(zone: &str) -> Option<FixedOffset> {
    if zone.eq_ignore_ascii_case("z") {
        return FixedOffset::east_opt(0);
    }

    let rest = match zone.get(..3) {
        Some(prefix) if prefix.eq_ignore_ascii_case("utc") || prefix.eq_ignore_ascii_case("gmt") => {
            &zone[3..]
        }
        _ => zone,
    };

    if rest.is_empty() {
        return FixedOffset::east_opt(0);
    }

    let (sign, digits) = match rest.as_bytes()[0] {
        b'+' => (1, &rest[1..]),
        b'-' => (-1, &rest[1..]),
        _ => return None,
    };

    let digits = digits.replace(':', "");
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }

    let (hours, minutes) = match digits.len() {
        1 | 2 => (digits.parse::<i32>().ok()?, 0),
        3 | 4 => {
            let (hours, minutes) = digits.split_at(digits.len() - 2);
            (hours.parse::<i32>().ok()?, minutes.parse::<i32>().ok()?)
        }
        _ => return None,
    };

    if hours > 23 || minutes > 59 {
        return None;
    }

    FixedOffset::east_opt(sign * (hours * 3600 + minutes * 60))
}

/**
Parse a positive number of bytes with an optional `KB`, `MB`, or `GB` suffix.

Suffixes are multiples of 1024 and are matched ignoring case.
*/
pub fn parse_size(text: &str) -> Option<u64> {
    let text = text.trim();

    let digits = text
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(text.len());

    let (number, unit) = text.split_at(digits);

    let number = number.parse::<u64>().ok()?;

    let multiplier = match &*unit.trim().to_ascii_lowercase() {
        "" | "b" => 1,
        "kb" => 1024,
        "mb" => 1024 * 1024,
        "gb" => 1024 * 1024 * 1024,
        _ => return None,
    };

    match number.checked_mul(multiplier)? {
        0 => None,
        size => Some(size),
    }
}
