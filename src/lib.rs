/*!
Rotating, crash-tolerant log files.

`logroll` turns a stream of log entries into files on disk. Files are named from a template that can include dates, counters, and process ids, and a writer that restarts picks up where the last one left off by inspecting the files it finds. Rotation is driven by [`Policy`], and writes are buffered in fixed-size blocks so only the last partial block is at risk if the process crashes.

```no_run
use logroll::{Level, LogEntry, Policy, Writer};

let writer = logroll::file("logs/app_{count}.log")
    .policy(Policy::composite([Policy::Startup, Policy::Size(10 * 1024 * 1024)]))
    .backups(5)
    .build()?;

writer.log(&LogEntry::new(Level::Info, "Hello, world"))?;

writer.close()?;
# Ok::<(), logroll::Error>(())
```

# Configuration

Writers can also be built from key-value configuration, as it might be loaded from a properties file. See [`config`] for the supported keys.

# Sharing files between processes

Several processes can write to the same file when they're built with [`FileWriterBuilder::shared`]. Each entry is then written in one operation under an advisory lock on the whole file, after finding the current end of the file.

# Diagnostics

Problems a writer can recover from, like an unknown charset name, are reported through [`Diagnostics`] rather than failing. By default, reports go to `emit`'s internal runtime, which can be initialized with `emit::setup().emit_to(..).init_internal()`. Use [`Captured`] to inspect them directly.
*/

mod charset;
mod clock;
pub mod config;
mod date;
mod diagnostics;
mod entry;
mod error;
pub mod format;
mod internal_metrics;
mod level;
mod log_file;
pub mod path;
mod policy;
pub mod raw;
mod writer;

pub use self::{
    charset::Charset,
    clock::{Clock, SystemClock, Timestamp},
    date::{DatePattern, Moment, Partial},
    diagnostics::{Captured, Diagnostics, Discard, Internal, Report},
    entry::{Field, Fields, LogEntry},
    error::{Error, ErrorKind},
    format::Format,
    internal_metrics::FileWriterMetrics,
    level::{Level, ParseLevelError},
    log_file::{LogFile, LogFileOptions, DEFAULT_BLOCK_SIZE},
    path::{DynamicPath, PathSegment},
    policy::{parse_size, Policy, Rollover},
    raw::OpenMode,
    writer::{file, FileWriter, FileWriterBuilder, Writer},
};
