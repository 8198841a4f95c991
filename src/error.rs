use std::{fmt, io};

/**
An error attempting to create or use a [`crate::FileWriter`].
*/
pub struct Error {
    kind: ErrorKind,
    inner: Box<dyn std::error::Error + Send + Sync>,
}

/**
The broad category of an [`Error`].
*/
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /**
    The writer could not be constructed from its configuration.
    */
    Config,
    /**
    Reading or writing the underlying file failed.
    */
    Io,
    /**
    The writer has already been closed.
    */
    Closed,
    /**
    An entry could not be rendered into bytes.
    */
    Format,
}

impl Error {
    pub(crate) fn new(
        kind: ErrorKind,
        e: impl Into<Box<dyn std::error::Error + Send + Sync>>,
    ) -> Self {
        Error {
            kind,
            inner: e.into(),
        }
    }

    pub(crate) fn config(e: impl Into<Box<dyn std::error::Error + Send + Sync>>) -> Self {
        Error::new(ErrorKind::Config, e)
    }

    pub(crate) fn closed() -> Self {
        Error::new(ErrorKind::Closed, "the writer is closed")
    }

    /**
    The category of this error.
    */
    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    /**
    Get the underlying IO error, if this error was caused by one.
    */
    pub fn as_io(&self) -> Option<&io::Error> {
        self.inner.downcast_ref()
    }
}

impl From<io::Error> for Error {
    fn from(err: io::Error) -> Self {
        Error::new(ErrorKind::Io, err)
    }
}

impl fmt::Debug for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Error")
            .field("kind", &self.kind)
            .field("inner", &self.inner)
            .finish()
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.inner, f)
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(&*self.inner)
    }
}
