/*!
The [`LogEntry`] type.

Entries are produced by the logging pipeline upstream of a writer. Only the fields a writer declares through [`crate::Writer::required_fields`] need to be populated; everything else may be left empty.
*/

use std::{fmt, ops::BitOr};

use crate::{level::Level, Timestamp};

/**
A single log record handed to a [`crate::Writer`].
*/
#[derive(Debug, Clone)]
pub struct LogEntry<'a> {
    timestamp: Option<Timestamp>,
    thread: Option<&'a str>,
    level: Level,
    class: Option<&'a str>,
    method: Option<&'a str>,
    message: Option<&'a str>,
    exception: Option<&'a str>,
}

impl<'a> LogEntry<'a> {
    /**
    Create an entry with the given level and message.
    */
    pub fn new(level: Level, message: &'a str) -> Self {
        LogEntry {
            timestamp: None,
            thread: None,
            level,
            class: None,
            method: None,
            message: Some(message),
            exception: None,
        }
    }

    /**
    Set the time the entry was issued.
    */
    pub fn with_timestamp(mut self, timestamp: Timestamp) -> Self {
        self.timestamp = Some(timestamp);
        self
    }

    /**
    Set the name of the thread that issued the entry.
    */
    pub fn with_thread(mut self, thread: &'a str) -> Self {
        self.thread = Some(thread);
        self
    }

    /**
    Set the class (or module) and method that issued the entry.
    */
    pub fn with_location(mut self, class: &'a str, method: &'a str) -> Self {
        self.class = Some(class);
        self.method = Some(method);
        self
    }

    /**
    Set a rendered exception or error chain.
    */
    pub fn with_exception(mut self, exception: &'a str) -> Self {
        self.exception = Some(exception);
        self
    }

    pub fn timestamp(&self) -> Option<&Timestamp> {
        self.timestamp.as_ref()
    }

    pub fn thread(&self) -> Option<&'a str> {
        self.thread
    }

    pub fn level(&self) -> Level {
        self.level
    }

    pub fn class(&self) -> Option<&'a str> {
        self.class
    }

    pub fn method(&self) -> Option<&'a str> {
        self.method
    }

    pub fn message(&self) -> Option<&'a str> {
        self.message
    }

    pub fn exception(&self) -> Option<&'a str> {
        self.exception
    }
}

/**
A field of a [`LogEntry`] that a writer may consume.
*/
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Field {
    Timestamp,
    Thread,
    Level,
    Class,
    Method,
    Message,
    Exception,
}

impl Field {
    const ALL: [Field; 7] = [
        Field::Timestamp,
        Field::Thread,
        Field::Level,
        Field::Class,
        Field::Method,
        Field::Message,
        Field::Exception,
    ];

    fn bit(self) -> u8 {
        1 << (self as u8)
    }
}

/**
A set of [`Field`]s.

Upstream stages use this set to skip computing values (such as the caller location) that no writer will consume.
*/
#[derive(Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct Fields(u8);

impl Fields {
    pub const fn empty() -> Self {
        Fields(0)
    }

    pub fn all() -> Self {
        Field::ALL.into_iter().collect()
    }

    pub fn insert(&mut self, field: Field) {
        self.0 |= field.bit();
    }

    pub fn contains(&self, field: Field) -> bool {
        self.0 & field.bit() != 0
    }

    pub fn is_empty(&self) -> bool {
        self.0 == 0
    }

    pub fn iter(&self) -> impl Iterator<Item = Field> + '_ {
        Field::ALL.into_iter().filter(|field| self.contains(*field))
    }
}

impl From<Field> for Fields {
    fn from(field: Field) -> Self {
        Fields(field.bit())
    }
}

impl BitOr for Fields {
    type Output = Fields;

    fn bitor(self, rhs: Fields) -> Fields {
        Fields(self.0 | rhs.0)
    }
}

impl BitOr<Field> for Fields {
    type Output = Fields;

    fn bitor(self, rhs: Field) -> Fields {
        self | Fields::from(rhs)
    }
}

impl FromIterator<Field> for Fields {
    fn from_iter<I: IntoIterator<Item = Field>>(iter: I) -> Self {
        let mut fields = Fields::empty();

        for field in iter {
            fields.insert(field);
        }

        fields
    }
}

impl fmt::Debug for Fields {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.iter()).finish()
    }
}
