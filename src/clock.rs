use std::sync::Arc;

use chrono::{DateTime, FixedOffset, Local};

/**
A point in time with a known offset from UTC.

Date segments in file names are rendered from values of this type.
*/
pub type Timestamp = DateTime<FixedOffset>;

/**
A source of the current time.
*/
pub trait Clock {
    fn now(&self) -> Timestamp;
}

impl<'a, T: Clock + ?Sized> Clock for &'a T {
    fn now(&self) -> Timestamp {
        (**self).now()
    }
}

impl<'a, T: Clock + ?Sized + 'a> Clock for Box<T> {
    fn now(&self) -> Timestamp {
        (**self).now()
    }
}

impl<'a, T: Clock + ?Sized + 'a> Clock for Arc<T> {
    fn now(&self) -> Timestamp {
        (**self).now()
    }
}

impl Clock for Timestamp {
    fn now(&self) -> Timestamp {
        *self
    }
}

/**
A [`Clock`] based on the system's local time.
*/
#[derive(Default, Debug, Clone, Copy)]
pub struct SystemClock {}

impl SystemClock {
    pub const fn new() -> Self {
        SystemClock {}
    }
}

impl Clock for SystemClock {
    fn now(&self) -> Timestamp {
        Local::now().fixed_offset()
    }
}
