/*!
The [`Writer`] trait and the [`FileWriter`] implementation.
*/

use std::{
    fmt, fs, io,
    path::{Path, PathBuf},
    sync::{Arc, Mutex, MutexGuard},
};

use chrono::{DateTime, Utc};

use crate::{
    charset::Charset,
    clock::{Clock, SystemClock, Timestamp},
    diagnostics::{Diagnostics, Internal},
    entry::{Fields, LogEntry},
    error::Error,
    format::Format,
    internal_metrics::{FileWriterMetrics, InternalMetrics},
    log_file::{LogFile, LogFileOptions, DEFAULT_BLOCK_SIZE},
    path::{DynamicPath, GenerationKind},
    policy::Policy,
    raw::OpenMode,
};

/**
A destination for log entries.

All methods take `&self` so a writer can be shared between threads. Implementations serialize calls internally.
*/
pub trait Writer: Send + Sync {
    /**
    The fields of an entry this writer reads.

    Upstream stages can skip computing anything not in this set.
    */
    fn required_fields(&self) -> Fields;

    /**
    Write an entry.
    */
    fn log(&self, entry: &LogEntry) -> Result<(), Error>;

    /**
    Write any buffered entries through to durable storage.
    */
    fn flush(&self) -> Result<(), Error>;

    /**
    Flush and release any resources held by the writer.

    Any further calls will fail with [`crate::ErrorKind::Closed`].
    */
    fn close(&self) -> Result<(), Error>;
}

impl<'a, T: Writer + ?Sized> Writer for &'a T {
    fn required_fields(&self) -> Fields {
        (**self).required_fields()
    }

    fn log(&self, entry: &LogEntry) -> Result<(), Error> {
        (**self).log(entry)
    }

    fn flush(&self) -> Result<(), Error> {
        (**self).flush()
    }

    fn close(&self) -> Result<(), Error> {
        (**self).close()
    }
}

impl<'a, T: Writer + ?Sized + 'a> Writer for Box<T> {
    fn required_fields(&self) -> Fields {
        (**self).required_fields()
    }

    fn log(&self, entry: &LogEntry) -> Result<(), Error> {
        (**self).log(entry)
    }

    fn flush(&self) -> Result<(), Error> {
        (**self).flush()
    }

    fn close(&self) -> Result<(), Error> {
        (**self).close()
    }
}

impl<'a, T: Writer + ?Sized + 'a> Writer for Arc<T> {
    fn required_fields(&self) -> Fields {
        (**self).required_fields()
    }

    fn log(&self, entry: &LogEntry) -> Result<(), Error> {
        (**self).log(entry)
    }

    fn flush(&self) -> Result<(), Error> {
        (**self).flush()
    }

    fn close(&self) -> Result<(), Error> {
        (**self).close()
    }
}

/**
Start building a [`FileWriter`] for the given path template.

See [`crate::path`] for the template syntax.
*/
pub fn file(template: impl Into<String>) -> FileWriterBuilder {
    FileWriterBuilder::new(template)
}

/**
A builder for a [`FileWriter`].
*/
pub struct FileWriterBuilder {
    template: String,
    policy: Policy,
    charset: Charset,
    format: Format,
    block_size: usize,
    shared: bool,
    backups: Option<usize>,
    latest: Option<PathBuf>,
    clock: Box<dyn Clock + Send + Sync>,
    diagnostics: Arc<dyn Diagnostics + Send + Sync>,
}

impl FileWriterBuilder {
    /**
    Create a builder with the default configuration:

    - Files are never rotated.
    - Text is encoded as UTF-8.
    - Entries are rendered with [`crate::format::DEFAULT_PATTERN`].
    - Writes go through to disk in 64KiB blocks.
    - Problems are reported to `emit`'s internal runtime.
    */
    pub fn new(template: impl Into<String>) -> Self {
        FileWriterBuilder {
            template: template.into(),
            policy: Policy::Endless,
            charset: Charset::default(),
            format: Format::default(),
            block_size: DEFAULT_BLOCK_SIZE,
            shared: false,
            backups: None,
            latest: None,
            clock: Box::new(SystemClock::new()),
            diagnostics: Arc::new(Internal),
        }
    }

    /**
    Set the rotation policy.
    */
    pub fn policy(mut self, policy: Policy) -> Self {
        self.policy = policy;
        self
    }

    /**
    Set the charset used to encode entries.
    */
    pub fn charset(mut self, charset: Charset) -> Self {
        self.charset = charset;
        self
    }

    /**
    Set the format used to render entries.
    */
    pub fn format(mut self, format: Format) -> Self {
        self.format = format;
        self
    }

    /**
    Set the number of bytes to buffer before writing through to disk.

    Shared files always write every entry through immediately.
    */
    pub fn block_size(mut self, block_size: usize) -> Self {
        self.block_size = block_size;
        self
    }

    /**
    Specify whether other processes may write to the same files.

    Shared files are locked for each individual write, so entries from different processes are never interleaved.
    */
    pub fn shared(mut self, shared: bool) -> Self {
        self.shared = shared;
        self
    }

    /**
    Keep at most this many previous files when starting a new one.

    Older files are deleted, newest first by modification time.
    */
    pub fn backups(mut self, backups: usize) -> Self {
        self.backups = Some(backups);
        self
    }

    /**
    Maintain a hard link at `path` that always points to the current file.
    */
    pub fn latest(mut self, path: impl Into<PathBuf>) -> Self {
        self.latest = Some(path.into());
        self
    }

    /**
    Set the clock used to resolve dates in file names and to check date-based policies.
    */
    pub fn clock(mut self, clock: impl Clock + Send + Sync + 'static) -> Self {
        self.clock = Box::new(clock);
        self
    }

    /**
    Set the sink for problems the writer can recover from.
    */
    pub fn diagnostics(mut self, diagnostics: impl Diagnostics + Send + Sync + 'static) -> Self {
        self.diagnostics = Arc::new(diagnostics);
        self
    }

    /**
    Find the latest existing file and open it, or a new one, ready for writing.
    */
    pub fn build(self) -> Result<FileWriter, Error> {
        let path = DynamicPath::parse(&self.template, &*self.diagnostics)?;

        let options = LogFileOptions {
            block_size: if self.shared { 1 } else { self.block_size },
            shared: self.shared,
            header: self.charset.header(),
        };

        let writer = FileWriter {
            session: Mutex::new(None),
            path,
            policy: self.policy,
            charset: self.charset,
            format: self.format,
            options,
            backups: self.backups,
            latest: self.latest,
            clock: self.clock,
            diagnostics: self.diagnostics,
            metrics: Arc::new(InternalMetrics::default()),
        };

        let session = writer.start()?;
        *writer.lock() = Some(session);

        Ok(writer)
    }
}

/**
A [`Writer`] that writes to a rotating set of files.

The writer is either open or closed. While it's open every operation runs under one mutex, so entries are written in the order their calls acquire it.
*/
pub struct FileWriter {
    session: Mutex<Option<Session>>,
    path: DynamicPath,
    policy: Policy,
    charset: Charset,
    format: Format,
    options: LogFileOptions,
    backups: Option<usize>,
    latest: Option<PathBuf>,
    clock: Box<dyn Clock + Send + Sync>,
    diagnostics: Arc<dyn Diagnostics + Send + Sync>,
    metrics: Arc<InternalMetrics>,
}

struct Session {
    // `None` after a rotation failed; the next entry tries again
    file: Option<LogFile>,
    current: PathBuf,
    opened: Timestamp,
    written: u64,
    text: String,
    bytes: Vec<u8>,
}

impl fmt::Debug for FileWriter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FileWriter")
            .field("path", &self.path)
            .field("policy", &self.policy)
            .field(
                "current",
                &self
                    .session
                    .try_lock()
                    .ok()
                    .and_then(|session| session.as_ref().map(|session| session.current.clone())),
            )
            .finish_non_exhaustive()
    }
}

impl FileWriter {
    /**
    The path of the file currently being written, or `None` if the writer is closed.
    */
    pub fn current_path(&self) -> Option<PathBuf> {
        self.lock().as_ref().map(|session| session.current.clone())
    }

    /**
    The path template files are resolved from.
    */
    pub fn dynamic_path(&self) -> &DynamicPath {
        &self.path
    }

    /**
    Get a handle to the writer's internal metrics.
    */
    pub fn metrics(&self) -> FileWriterMetrics {
        FileWriterMetrics {
            metrics: self.metrics.clone(),
        }
    }

    /**
    Sample the writer's internal metrics.
    */
    pub fn sample_metrics(
        &self,
    ) -> impl Iterator<Item = emit::metric::Metric<'static, emit::empty::Empty>> + 'static {
        self.metrics.sample()
    }

    fn lock(&self) -> MutexGuard<'_, Option<Session>> {
        self.session
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn start(&self) -> Result<Session, Error> {
        let now = self.clock.now();

        let (path, mode) = match self.path.latest() {
            Some(latest) => {
                let metadata = fs::metadata(latest).ok();

                let size = metadata.as_ref().map(|metadata| metadata.len()).unwrap_or(0);
                let modified = metadata
                    .and_then(|metadata| metadata.modified().ok())
                    .map(|modified| DateTime::<Utc>::from(modified).fixed_offset());

                if self.policy.can_continue(size, modified.as_ref(), &now) {
                    (latest.to_owned(), OpenMode::Continue)
                } else {
                    (
                        self.path.next_generation(&now, Some(latest)).path,
                        OpenMode::Overwrite,
                    )
                }
            }
            None => {
                let mode = if self.policy.can_continue(0, Some(&now), &now) {
                    OpenMode::Continue
                } else {
                    OpenMode::Overwrite
                };

                (self.path.resolve_next(&now), mode)
            }
        };

        let file = self.open(&path, mode)?;

        // Backups left over from previous runs are trimmed straight away
        self.apply_retention(&path, &now);

        Ok(Session {
            file: Some(file),
            current: path,
            opened: now,
            written: 0,
            text: String::new(),
            bytes: Vec::new(),
        })
    }

    fn open(&self, path: &Path, mode: OpenMode) -> Result<LogFile, Error> {
        let mut file = match LogFile::open(path, mode, self.options) {
            Ok(file) => file,
            Err(err) => {
                self.metrics.file_open_failed.increment();
                self.diagnostics
                    .error(format_args!("failed to open {}: {err}", path.display()));

                return Err(err.into());
            }
        };

        if file.is_new_file() {
            self.metrics.file_create.increment();
            self.diagnostics
                .debug(format_args!("created {}", path.display()));
        } else {
            self.metrics.file_continue.increment();
            self.diagnostics
                .debug(format_args!("continuing {}", path.display()));

            self.recover(&mut file)?;
        }

        self.link_latest(path);

        Ok(file)
    }

    /**
    Terminate a partially written record left behind by a previous run.
    */
    fn recover(&self, file: &mut LogFile) -> Result<(), Error> {
        // The file holds nothing but the charset header
        if file.size() <= self.charset.header().len() as u64 {
            return Ok(());
        }

        let newline = self.charset.newline();

        let mut tail = vec![0; newline.len()];
        let read = file.read_tail(&mut tail)?;

        if tail[..read] != newline[..] {
            self.diagnostics.debug(format_args!(
                "terminating an incomplete record at the end of {}",
                file.path().display()
            ));

            file.write(&newline, 0)?;
        }

        Ok(())
    }

    fn link_latest(&self, target: &Path) {
        let Some(link) = &self.latest else {
            return;
        };

        let linked = match fs::remove_file(link) {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(err) => Err(err),
        }
        .and_then(|()| fs::hard_link(target, link));

        if let Err(err) = linked {
            self.diagnostics.warn(format_args!(
                "failed to link {} to {}: {err}",
                link.display(),
                target.display()
            ));
        }
    }

    fn rotate(&self, session: &mut Session) -> Result<(), Error> {
        if let Some(file) = session.file.take() {
            if let Err(err) = file.close() {
                self.metrics.file_write_failed.increment();
                self.diagnostics.error(format_args!(
                    "failed to close {}: {err}",
                    session.current.display()
                ));

                return Err(err.into());
            }
        }

        let now = self.clock.now();
        let generation = self.path.next_generation(&now, Some(session.current.as_path()));

        self.diagnostics.debug(format_args!(
            "rotating from {} to {}",
            session.current.display(),
            generation.path.display()
        ));

        let file = self.open(&generation.path, OpenMode::Overwrite)?;
        self.metrics.file_rotate.increment();

        session.file = Some(file);
        session.current = generation.path;
        session.opened = now;
        session.written = 0;

        if generation.kind == GenerationKind::Fresh {
            self.apply_retention(&session.current, &now);
        }

        Ok(())
    }

    fn apply_retention(&self, current: &Path, now: &Timestamp) {
        let Some(backups) = self.backups else {
            return;
        };

        let mut generations = self
            .path
            .generations(now)
            .into_iter()
            .filter(|(path, _)| path != current && Some(path) != self.latest.as_ref())
            .collect::<Vec<_>>();

        // Newest first; files without a modification time sort last
        generations.sort_by(|(a_path, a), (b_path, b)| b.cmp(a).then_with(|| b_path.cmp(a_path)));

        for (path, _) in generations.into_iter().skip(backups) {
            if let Err(err) = fs::remove_file(&path) {
                self.metrics.file_delete_failed.increment();
                self.diagnostics
                    .warn(format_args!("failed to delete {}: {err}", path.display()));
            } else {
                self.metrics.file_delete.increment();
                self.diagnostics
                    .debug(format_args!("deleted {}", path.display()));
            }
        }
    }
}

impl Writer for FileWriter {
    fn required_fields(&self) -> Fields {
        self.format.required_fields()
    }

    fn log(&self, entry: &LogEntry) -> Result<(), Error> {
        let mut session = self.lock();
        let session = session.as_mut().ok_or_else(Error::closed)?;

        session.text.clear();
        if let Err(err) = self.format.render(entry, &mut session.text) {
            self.metrics.entry_format_failed.increment();
            return Err(err);
        }

        session.bytes.clear();
        self.charset.encode(&session.text, &mut session.bytes);

        // The preamble is stripped by the file, so it doesn't count towards its size
        let header = self.charset.header();
        let preamble = if !header.is_empty() && session.bytes.starts_with(header) {
            header.len()
        } else {
            0
        };
        let incoming = (session.bytes.len() - preamble) as u64;

        let now = self.clock.now();

        let must_rotate = match &session.file {
            // An empty generation can't be made any smaller
            Some(file) => {
                (session.written > 0 || !file.is_new_file())
                    && self
                        .policy
                        .would_exceed(file.size(), incoming, &session.opened, &now)
            }
            None => true,
        };

        if must_rotate {
            self.rotate(session)?;
        }

        let Some(file) = session.file.as_mut() else {
            return Err(Error::closed());
        };

        if let Err(err) = file.write(&session.bytes, 0) {
            self.metrics.file_write_failed.increment();
            return Err(err.into());
        }

        session.written += incoming;

        Ok(())
    }

    fn flush(&self) -> Result<(), Error> {
        let mut session = self.lock();
        let session = session.as_mut().ok_or_else(Error::closed)?;

        if let Some(file) = session.file.as_mut() {
            if let Err(err) = file.flush() {
                self.metrics.file_write_failed.increment();
                return Err(err.into());
            }
        }

        Ok(())
    }

    fn close(&self) -> Result<(), Error> {
        let session = self.lock().take().ok_or_else(Error::closed)?;

        if let Some(file) = session.file {
            if let Err(err) = file.close() {
                self.metrics.file_write_failed.increment();
                return Err(err.into());
            }
        }

        Ok(())
    }
}

impl Drop for FileWriter {
    fn drop(&mut self) {
        let session = self
            .session
            .get_mut()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .take();

        if let Some(Session {
            file: Some(file),
            current,
            ..
        }) = session
        {
            if let Err(err) = file.close() {
                self.diagnostics.error(format_args!(
                    "failed to close {} while dropping the writer: {err}",
                    current.display()
                ));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use chrono::{FixedOffset, TimeZone};

    use crate::{
        diagnostics::{Captured, Discard},
        error::ErrorKind,
        level::Level,
        policy::Rollover,
    };

    fn on(day: u32, hour: u32) -> Timestamp {
        FixedOffset::east_opt(0)
            .unwrap()
            .with_ymd_and_hms(2000, 1, day, hour, 0, 0)
            .unwrap()
    }

    struct ManualClock(Mutex<Timestamp>);

    impl ManualClock {
        fn new(now: Timestamp) -> Arc<Self> {
            Arc::new(ManualClock(Mutex::new(now)))
        }

        fn set(&self, now: Timestamp) {
            *self.0.lock().unwrap() = now;
        }
    }

    impl Clock for ManualClock {
        fn now(&self) -> Timestamp {
            *self.0.lock().unwrap()
        }
    }

    fn daily_utc() -> Policy {
        Policy::Daily(Rollover::midnight().with_offset(FixedOffset::east_opt(0).unwrap()))
    }

    fn builder(template: impl AsRef<Path>) -> FileWriterBuilder {
        file(template.as_ref().to_string_lossy()).diagnostics(Discard)
    }

    fn log(writer: &FileWriter, message: &str) {
        writer.log(&LogEntry::new(Level::Info, message)).unwrap();
    }

    #[test]
    fn continues_existing_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("app.log");

        fs::write(&path, b"a\n").unwrap();

        let writer = builder(&path).build().unwrap();
        log(&writer, "b");
        writer.close().unwrap();

        assert_eq!("a\nb\n", fs::read_to_string(&path).unwrap());
        assert_eq!(1, writer.metrics().file_continue());
    }

    #[test]
    fn terminates_torn_records() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("app.log");

        fs::write(&path, b"a\npartial").unwrap();

        let writer = builder(&path).build().unwrap();
        log(&writer, "b");
        writer.close().unwrap();

        assert_eq!("a\npartial\nb\n", fs::read_to_string(&path).unwrap());
    }

    #[test]
    fn startup_policy_overwrites() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("app.log");

        fs::write(&path, b"old\n").unwrap();

        let writer = builder(&path).policy(Policy::Startup).build().unwrap();
        log(&writer, "new");
        writer.close().unwrap();

        assert_eq!("new\n", fs::read_to_string(&path).unwrap());
        assert_eq!(1, writer.metrics().file_create());
    }

    #[test]
    fn size_policy_refuses_to_grow() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("app.log");

        fs::write(&path, b"a").unwrap();

        let writer = builder(&path)
            .policy(Policy::Size(3))
            .format(Format::lookup("line", Some("{message}"), Discard).unwrap())
            .build()
            .unwrap();

        // The continued file is terminated with a line feed, leaving room for nothing more
        log(&writer, "bc");
        writer.close().unwrap();

        assert_eq!("bc\n", fs::read_to_string(&path).unwrap());
        assert_eq!(1, writer.metrics().file_rotate());
    }

    #[test]
    fn rotation_moves_to_the_next_count() {
        let dir = tempfile::tempdir().unwrap();
        let template = dir.path().join("app_{count}.log");

        let writer = builder(&template)
            .policy(Policy::Size(4))
            .build()
            .unwrap();

        for message in ["a", "b", "c", "d", "e"] {
            log(&writer, message);
        }

        writer.close().unwrap();

        assert_eq!("a\nb\n", fs::read_to_string(dir.path().join("app_0.log")).unwrap());
        assert_eq!("c\nd\n", fs::read_to_string(dir.path().join("app_1.log")).unwrap());
        assert_eq!("e\n", fs::read_to_string(dir.path().join("app_2.log")).unwrap());
    }

    #[test]
    fn oversized_entries_do_not_rotate_empty_files() {
        let dir = tempfile::tempdir().unwrap();
        let template = dir.path().join("app_{count}.log");

        let writer = builder(&template).policy(Policy::Size(2)).build().unwrap();

        log(&writer, "too long");
        writer.close().unwrap();

        assert_eq!(
            "too long\n",
            fs::read_to_string(dir.path().join("app_0.log")).unwrap()
        );
        assert!(!dir.path().join("app_1.log").exists());
    }

    #[test]
    fn date_templates_use_the_clock() {
        let dir = tempfile::tempdir().unwrap();
        let template = dir.path().join("{date: yyyy-MM-dd_HH}.log");

        let writer = builder(&template).clock(on(1, 13)).build().unwrap();
        log(&writer, "a");

        assert_eq!(
            Some(dir.path().join("2000-01-01_13.log")),
            writer.current_path()
        );

        writer.close().unwrap();
    }

    #[test]
    fn backups_are_limited() {
        let dir = tempfile::tempdir().unwrap();
        let template = dir.path().join("app_{count}.log");

        let writer = builder(&template)
            .policy(Policy::Size(2))
            .backups(1)
            .build()
            .unwrap();

        for message in ["a", "b", "c", "d"] {
            log(&writer, message);
            writer.flush().unwrap();
        }

        writer.close().unwrap();

        assert!(!dir.path().join("app_0.log").exists());
        assert!(!dir.path().join("app_1.log").exists());
        assert!(dir.path().join("app_2.log").exists());
        assert!(dir.path().join("app_3.log").exists());
        assert_eq!(2, writer.metrics().file_delete());
    }

    #[test]
    fn backups_are_limited_when_starting() {
        let dir = tempfile::tempdir().unwrap();
        let template = dir.path().join("app_{count}.log");

        for count in 0..4 {
            fs::write(dir.path().join(format!("app_{count}.log")), b"old\n").unwrap();
        }

        let writer = builder(&template)
            .policy(Policy::Startup)
            .backups(1)
            .build()
            .unwrap();

        log(&writer, "new");
        writer.close().unwrap();

        for count in 0..3 {
            assert!(!dir.path().join(format!("app_{count}.log")).exists());
        }
        assert!(dir.path().join("app_3.log").exists());
        assert_eq!("new\n", fs::read_to_string(dir.path().join("app_4.log")).unwrap());
        assert_eq!(3, writer.metrics().file_delete());
    }

    #[test]
    fn daily_policy_rotates_when_the_day_changes() {
        let dir = tempfile::tempdir().unwrap();
        let template = dir.path().join("app_{date: yyyy-MM-dd}.log");
        let clock = ManualClock::new(on(1, 13));

        let writer = builder(&template)
            .policy(daily_utc())
            .clock(clock.clone())
            .build()
            .unwrap();

        log(&writer, "a");

        clock.set(on(1, 23));
        log(&writer, "b");

        clock.set(on(2, 0));
        log(&writer, "c");

        writer.close().unwrap();

        assert_eq!(
            "a\nb\n",
            fs::read_to_string(dir.path().join("app_2000-01-01.log")).unwrap()
        );
        assert_eq!(
            "c\n",
            fs::read_to_string(dir.path().join("app_2000-01-02.log")).unwrap()
        );
        assert_eq!(1, writer.metrics().file_rotate());
    }

    #[test]
    fn daily_policy_only_continues_files_from_today() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("app.log");

        for (modified, expected) in [(on(2, 1), "old\nnew\n"), (on(1, 23), "new\n")] {
            fs::write(&path, b"old\n").unwrap();
            fs::File::options()
                .write(true)
                .open(&path)
                .unwrap()
                .set_modified(modified.into())
                .unwrap();

            let writer = builder(&path)
                .policy(daily_utc())
                .clock(on(2, 12))
                .build()
                .unwrap();

            log(&writer, "new");
            writer.close().unwrap();

            assert_eq!(expected, fs::read_to_string(&path).unwrap());
        }
    }

    #[test]
    fn debug_shows_the_current_file() {
        let dir = tempfile::tempdir().unwrap();

        let writer = builder(dir.path().join("app.log")).build().unwrap();

        let debug = format!("{writer:?}");
        assert!(debug.starts_with("FileWriter"), "{debug}");
        assert!(debug.contains("app.log"), "{debug}");

        writer.close().unwrap();
    }

    #[test]
    fn latest_link_follows_rotation() {
        let dir = tempfile::tempdir().unwrap();
        let template = dir.path().join("app_{count}.log");
        let latest = dir.path().join("latest.log");

        let writer = builder(&template)
            .policy(Policy::Size(2))
            .latest(&latest)
            .build()
            .unwrap();

        log(&writer, "a");
        log(&writer, "b");
        writer.flush().unwrap();

        assert_eq!("b\n", fs::read_to_string(&latest).unwrap());

        writer.close().unwrap();
    }

    #[test]
    fn closed_writers_fail() {
        let dir = tempfile::tempdir().unwrap();

        let writer = builder(dir.path().join("app.log")).build().unwrap();
        writer.close().unwrap();

        let err = writer.log(&LogEntry::new(Level::Info, "a")).unwrap_err();
        assert_eq!(ErrorKind::Closed, err.kind());
        assert_eq!(ErrorKind::Closed, writer.flush().unwrap_err().kind());
        assert_eq!(ErrorKind::Closed, writer.close().unwrap_err().kind());
        assert_eq!(None, writer.current_path());
    }

    #[test]
    fn dropping_flushes_pending_entries() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("app.log");

        {
            let writer = builder(&path).build().unwrap();
            log(&writer, "a");
        }

        assert_eq!("a\n", fs::read_to_string(&path).unwrap());
    }

    #[test]
    fn operations_are_reported() {
        let dir = tempfile::tempdir().unwrap();
        let diagnostics = Captured::new();

        let writer = file(dir.path().join("app.log").to_string_lossy())
            .diagnostics(diagnostics.clone())
            .build()
            .unwrap();
        writer.close().unwrap();

        let reports = diagnostics.reports();
        assert!(reports
            .iter()
            .any(|report| report.level == Level::Debug && report.message.starts_with("created")));
    }

    #[test]
    fn sample_metrics_names_every_counter() {
        let dir = tempfile::tempdir().unwrap();

        let writer = builder(dir.path().join("app.log")).build().unwrap();

        let sampled = writer
            .sample_metrics()
            .map(|metric| {
                assert_eq!(emit::well_known::METRIC_AGG_COUNT, metric.agg().to_string());
                assert_eq!("logroll", metric.mdl().to_string());

                (metric.name().to_string(), metric.value().to_string())
            })
            .collect::<Vec<_>>();

        assert_eq!(8, sampled.len());
        assert!(sampled.contains(&("file_create".to_owned(), "1".to_owned())));
        assert!(sampled.contains(&("file_rotate".to_owned(), "0".to_owned())));

        writer.close().unwrap();
    }
}
