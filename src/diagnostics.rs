/*!
The [`Diagnostics`] sink.

Writers report problems they can recover from, such as an unknown charset name or a backup that couldn't be deleted, to a diagnostics sink instead of failing. The sink is passed in explicitly when a writer is built; by default it's [`Internal`], which forwards reports to `emit`'s internal runtime.
*/

use std::{
    fmt,
    sync::{Arc, Mutex},
};

use crate::level::Level;

/**
A destination for internal reports.
*/
pub trait Diagnostics {
    /**
    Report a message at the given level.
    */
    fn report(&self, level: Level, msg: fmt::Arguments);

    /**
    Report a debug message.
    */
    fn debug(&self, msg: fmt::Arguments) {
        self.report(Level::Debug, msg)
    }

    /**
    Report a warning.
    */
    fn warn(&self, msg: fmt::Arguments) {
        self.report(Level::Warn, msg)
    }

    /**
    Report an error.
    */
    fn error(&self, msg: fmt::Arguments) {
        self.report(Level::Error, msg)
    }
}

impl<'a, T: Diagnostics + ?Sized> Diagnostics for &'a T {
    fn report(&self, level: Level, msg: fmt::Arguments) {
        (**self).report(level, msg)
    }
}

impl<'a, T: Diagnostics + ?Sized + 'a> Diagnostics for Box<T> {
    fn report(&self, level: Level, msg: fmt::Arguments) {
        (**self).report(level, msg)
    }
}

impl<'a, T: Diagnostics + ?Sized + 'a> Diagnostics for Arc<T> {
    fn report(&self, level: Level, msg: fmt::Arguments) {
        (**self).report(level, msg)
    }
}

/**
A [`Diagnostics`] sink that discards everything.
*/
#[derive(Debug, Default, Clone, Copy)]
pub struct Discard;

impl Diagnostics for Discard {
    fn report(&self, _: Level, _: fmt::Arguments) {}
}

/**
A [`Diagnostics`] sink that forwards to `emit`'s internal runtime.

Nothing is observable unless the application has configured `emit`'s internal runtime, such as through `emit::setup().init_internal()`.
*/
#[derive(Debug, Default, Clone, Copy)]
pub struct Internal;

impl Diagnostics for Internal {
    fn report(&self, level: Level, msg: fmt::Arguments) {
        let report = msg.to_string();

        match level {
            Level::Trace | Level::Debug => {
                emit::debug!(rt: emit::runtime::internal(), "{report}", report)
            }
            Level::Info => emit::info!(rt: emit::runtime::internal(), "{report}", report),
            Level::Warn => emit::warn!(rt: emit::runtime::internal(), "{report}", report),
            Level::Error => emit::error!(rt: emit::runtime::internal(), "{report}", report),
        }
    }
}

/**
A report collected by [`Captured`].
*/
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Report {
    pub level: Level,
    pub message: String,
}

/**
A [`Diagnostics`] sink that keeps every report in memory.

Clones share the same set of reports.
*/
#[derive(Debug, Default, Clone)]
pub struct Captured(Arc<Mutex<Vec<Report>>>);

impl Captured {
    pub fn new() -> Self {
        Captured::default()
    }

    /**
    Get a copy of all reports collected so far.
    */
    pub fn reports(&self) -> Vec<Report> {
        self.0
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    /**
    Take all reports collected so far, leaving the sink empty.
    */
    pub fn take(&self) -> Vec<Report> {
        std::mem::take(
            &mut *self
                .0
                .lock()
                .unwrap_or_else(|poisoned| poisoned.into_inner()),
        )
    }

    /**
    Get the reports at or above the given level.
    */
    pub fn at_least(&self, level: Level) -> Vec<Report> {
        self.reports()
            .into_iter()
            .filter(|report| report.level >= level)
            .collect()
    }
}

impl Diagnostics for Captured {
    fn report(&self, level: Level, msg: fmt::Arguments) {
        self.0
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push(Report {
                level,
                message: msg.to_string(),
            });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn captured_collects_reports() {
        let captured = Captured::new();
        let sink: Arc<dyn Diagnostics + Send + Sync> = Arc::new(captured.clone());

        sink.error(format_args!("invalid charset {:?}", "bogus"));
        sink.debug(format_args!("created {}", "a.log"));

        assert_eq!(1, captured.at_least(Level::Warn).len());
        assert_eq!(
            Report {
                level: Level::Error,
                message: "invalid charset \"bogus\"".into(),
            },
            captured.take()[0]
        );
        assert!(captured.reports().is_empty());
    }

    #[test]
    fn internal_does_not_panic_without_a_runtime() {
        Internal.warn(format_args!("nobody is listening"));
    }
}
