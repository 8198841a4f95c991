/*!
Byte-level storage for log files.

A [`RawWriter`] appends bytes to some storage and can read back or discard the bytes at its end. [`PlainFile`] and [`LockedFile`] are the two storage variants; the rest of the types in this module are decorators that wrap another writer:

- [`CharsetAdjusted`] strips a charset preamble, like a byte-order mark, from every record so it only appears once at the start of the file.
- [`Buffered`] holds bytes back until the file reaches a block boundary.
- [`Synchronized`] shares one writer between several owners through a mutex.

A [`crate::LogFile`] composes these as `CharsetAdjusted<Buffered<Box<dyn RawWriter + Send>>>`.
*/

use std::{
    fs::{self, File},
    io::{self, Read, Seek, SeekFrom, Write},
    path::{Path, PathBuf},
    sync::{Arc, Mutex},
};

/**
A byte sink that can also inspect and shrink its own tail.
*/
pub trait RawWriter {
    /**
    Append `data[skip..]`.
    */
    fn write(&mut self, data: &[u8], skip: usize) -> io::Result<()>;

    /**
    Fill the end of `buf` with the last bytes written, returning how many were read.

    If fewer than `buf.len()` bytes exist, they're all read into the front of `buf`.
    */
    fn read_tail(&mut self, buf: &mut [u8]) -> io::Result<usize>;

    /**
    Discard the last `count` bytes.
    */
    fn truncate(&mut self, count: u64) -> io::Result<()>;

    /**
    Push written bytes through to durable storage.
    */
    fn flush(&mut self) -> io::Result<()>;

    /**
    Flush and release the underlying handle.

    Any further operations will fail.
    */
    fn close(&mut self) -> io::Result<()>;
}

impl<'a, W: RawWriter + ?Sized> RawWriter for &'a mut W {
    fn write(&mut self, data: &[u8], skip: usize) -> io::Result<()> {
        (**self).write(data, skip)
    }

    fn read_tail(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        (**self).read_tail(buf)
    }

    fn truncate(&mut self, count: u64) -> io::Result<()> {
        (**self).truncate(count)
    }

    fn flush(&mut self) -> io::Result<()> {
        (**self).flush()
    }

    fn close(&mut self) -> io::Result<()> {
        (**self).close()
    }
}

impl<W: RawWriter + ?Sized> RawWriter for Box<W> {
    fn write(&mut self, data: &[u8], skip: usize) -> io::Result<()> {
        (**self).write(data, skip)
    }

    fn read_tail(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        (**self).read_tail(buf)
    }

    fn truncate(&mut self, count: u64) -> io::Result<()> {
        (**self).truncate(count)
    }

    fn flush(&mut self) -> io::Result<()> {
        (**self).flush()
    }

    fn close(&mut self) -> io::Result<()> {
        (**self).close()
    }
}

/**
How to treat a file that already has content when it's opened.
*/
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OpenMode {
    /**
    Keep existing content and append after it.
    */
    Continue,
    /**
    Discard existing content.
    */
    Overwrite,
}

fn open_file(path: &Path) -> io::Result<File> {
    fs::OpenOptions::new()
        .create(true)
        .read(true)
        .write(true)
        .truncate(false)
        .open(path)
}

fn closed() -> io::Error {
    io::Error::other("the file is closed")
}

/**
Prepare a freshly opened file, returning the number of bytes it held beforehand.
*/
fn prepare(mut file: &File, mode: OpenMode, header: &[u8]) -> io::Result<u64> {
    let existing = match mode {
        OpenMode::Continue => file.seek(SeekFrom::End(0))?,
        OpenMode::Overwrite => {
            file.set_len(0)?;
            file.seek(SeekFrom::Start(0))?;
            0
        }
    };

    if existing == 0 && !header.is_empty() {
        file.write_all(header)?;
    }

    Ok(existing)
}

fn read_tail_at(mut file: &File, end: u64, buf: &mut [u8]) -> io::Result<usize> {
    let len = (buf.len() as u64).min(end) as usize;

    file.seek(SeekFrom::Start(end - len as u64))?;
    file.read_exact(&mut buf[..len])?;
    file.seek(SeekFrom::Start(end))?;

    Ok(len)
}

fn truncate_at(mut file: &File, end: u64, count: u64) -> io::Result<()> {
    let len = end.saturating_sub(count);

    file.set_len(len)?;
    file.seek(SeekFrom::Start(len))?;

    Ok(())
}

/**
A local file owned by a single process.
*/
#[derive(Debug)]
pub struct PlainFile {
    file: Option<File>,
    path: PathBuf,
    existing_len: u64,
}

impl PlainFile {
    /**
    Open or create the file at `path`.

    If the file is empty after applying `mode` then `header` is written to it.
    */
    pub fn open(path: impl AsRef<Path>, mode: OpenMode, header: &[u8]) -> io::Result<Self> {
        let path = path.as_ref();

        let file = open_file(path)?;
        let existing_len = prepare(&file, mode, header)?;

        Ok(PlainFile {
            file: Some(file),
            path: path.into(),
            existing_len,
        })
    }

    /**
    The number of bytes the file held before it was opened.

    This is always `0` for files opened with [`OpenMode::Overwrite`].
    */
    pub fn existing_len(&self) -> u64 {
        self.existing_len
    }

    /**
    The current size of the file.
    */
    pub fn len(&mut self) -> io::Result<u64> {
        let mut file = self.file.as_ref().ok_or_else(closed)?;

        file.seek(SeekFrom::End(0))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl RawWriter for PlainFile {
    fn write(&mut self, data: &[u8], skip: usize) -> io::Result<()> {
        let mut file = self.file.as_ref().ok_or_else(closed)?;

        file.write_all(&data[skip..])
    }

    fn read_tail(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let mut file = self.file.as_ref().ok_or_else(closed)?;

        let end = file.stream_position()?;
        read_tail_at(file, end, buf)
    }

    fn truncate(&mut self, count: u64) -> io::Result<()> {
        let mut file = self.file.as_ref().ok_or_else(closed)?;

        let end = file.stream_position()?;
        truncate_at(file, end, count)
    }

    fn flush(&mut self) -> io::Result<()> {
        let mut file = self.file.as_ref().ok_or_else(closed)?;

        file.flush()?;
        file.sync_data()
    }

    fn close(&mut self) -> io::Result<()> {
        let file = self.file.take().ok_or_else(closed)?;

        file.sync_all()
    }
}

/**
A local file that may be shared with other processes.

Every operation runs under an exclusive advisory lock on the whole file. The end of the file is read again after the lock is acquired, so bytes appended by other processes in the meantime are never overwritten.
*/
#[derive(Debug)]
pub struct LockedFile {
    file: Option<File>,
    path: PathBuf,
    existing_len: u64,
}

impl LockedFile {
    /**
    Open or create the file at `path`.

    Preparing the file, including writing `header` to an empty file, happens under the lock.
    */
    pub fn open(path: impl AsRef<Path>, mode: OpenMode, header: &[u8]) -> io::Result<Self> {
        let path = path.as_ref();

        let file = open_file(path)?;

        let existing_len = {
            let _guard = lock::FileLock::acquire(&file)?;

            prepare(&file, mode, header)?
        };

        Ok(LockedFile {
            file: Some(file),
            path: path.into(),
            existing_len,
        })
    }

    /**
    The number of bytes the file held before it was opened.
    */
    pub fn existing_len(&self) -> u64 {
        self.existing_len
    }

    /**
    The current size of the file, including content written by other processes.
    */
    pub fn len(&mut self) -> io::Result<u64> {
        let file = self.file.as_ref().ok_or_else(closed)?;

        let _guard = lock::FileLock::acquire(file)?;
        Ok(file.metadata()?.len())
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn locked<T>(&mut self, op: impl FnOnce(&File, u64) -> io::Result<T>) -> io::Result<T> {
        let mut file = self.file.as_ref().ok_or_else(closed)?;

        let _guard = lock::FileLock::acquire(file)?;

        // Another process may have appended since our last operation
        let end = file.seek(SeekFrom::End(0))?;

        op(file, end)
    }
}

impl RawWriter for LockedFile {
    fn write(&mut self, data: &[u8], skip: usize) -> io::Result<()> {
        self.locked(|mut file, _| file.write_all(&data[skip..]))
    }

    fn read_tail(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.locked(|file, end| read_tail_at(file, end, buf))
    }

    fn truncate(&mut self, count: u64) -> io::Result<()> {
        self.locked(|file, end| truncate_at(file, end, count))
    }

    fn flush(&mut self) -> io::Result<()> {
        let mut file = self.file.as_ref().ok_or_else(closed)?;

        file.flush()?;
        file.sync_data()
    }

    fn close(&mut self) -> io::Result<()> {
        let file = self.file.take().ok_or_else(closed)?;

        file.sync_all()
    }
}

#[cfg(unix)]
mod lock {
    use std::{fs::File, io, os::fd::AsRawFd};

    pub(super) struct FileLock<'a> {
        file: &'a File,
    }

    impl<'a> FileLock<'a> {
        pub(super) fn acquire(file: &'a File) -> io::Result<Self> {
            loop {
                // SAFETY: The descriptor is owned by `file`, which outlives the lock
                if unsafe { libc::flock(file.as_raw_fd(), libc::LOCK_EX) } == 0 {
                    return Ok(FileLock { file });
                }

                let err = io::Error::last_os_error();
                if err.kind() != io::ErrorKind::Interrupted {
                    return Err(err);
                }
            }
        }
    }

    impl<'a> Drop for FileLock<'a> {
        fn drop(&mut self) {
            // SAFETY: The descriptor is owned by `file`, which outlives the lock
            unsafe {
                libc::flock(self.file.as_raw_fd(), libc::LOCK_UN);
            }
        }
    }
}

#[cfg(not(unix))]
mod lock {
    use std::{fs::File, io, marker::PhantomData};

    pub(super) struct FileLock<'a>(PhantomData<&'a File>);

    impl<'a> FileLock<'a> {
        pub(super) fn acquire(_: &'a File) -> io::Result<Self> {
            Err(io::Error::new(
                io::ErrorKind::Unsupported,
                "shared files need advisory locks, which aren't available on this platform",
            ))
        }
    }
}

/**
A decorator that strips a charset preamble from the start of each write.

Encoders emit the preamble, such as a UTF-16 byte-order mark, every time they encode a record. It's written once when the file is created, so it's dropped from everything written afterwards.
*/
#[derive(Debug)]
pub struct CharsetAdjusted<W> {
    inner: W,
    header: &'static [u8],
}

impl<W> CharsetAdjusted<W> {
    pub fn new(inner: W, header: &'static [u8]) -> Self {
        CharsetAdjusted { inner, header }
    }

    pub fn get_ref(&self) -> &W {
        &self.inner
    }

    pub fn get_mut(&mut self) -> &mut W {
        &mut self.inner
    }
}

impl<W: RawWriter> RawWriter for CharsetAdjusted<W> {
    fn write(&mut self, data: &[u8], skip: usize) -> io::Result<()> {
        if !self.header.is_empty() && data[skip..].starts_with(self.header) {
            self.inner.write(data, skip + self.header.len())
        } else {
            self.inner.write(data, skip)
        }
    }

    fn read_tail(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.inner.read_tail(buf)
    }

    fn truncate(&mut self, count: u64) -> io::Result<()> {
        self.inner.truncate(count)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.inner.flush()
    }

    fn close(&mut self) -> io::Result<()> {
        self.inner.close()
    }
}

/**
A decorator that only writes through to its inner writer at block boundaries.

Bytes are held in memory until the total size of the file crosses a multiple of the block size, then exactly enough are written to land on that boundary. Calling [`RawWriter::flush`] writes everything.
*/
#[derive(Debug)]
pub struct Buffered<W> {
    inner: W,
    block_size: u64,
    confirmed: u64,
    pending: Vec<u8>,
}

impl<W> Buffered<W> {
    /**
    Wrap `inner`, which already holds `confirmed` bytes.

    A `block_size` of `0` is treated as `1`, which writes everything through immediately.
    */
    pub fn new(inner: W, block_size: usize, confirmed: u64) -> Self {
        let block_size = block_size.max(1) as u64;

        Buffered {
            inner,
            block_size,
            confirmed,
            pending: Vec::new(),
        }
    }

    /**
    The number of bytes written through to the inner writer.
    */
    pub fn confirmed(&self) -> u64 {
        self.confirmed
    }

    /**
    The bytes held back waiting for a block boundary.
    */
    pub fn pending(&self) -> &[u8] {
        &self.pending
    }

    /**
    The total number of bytes written, including pending ones.
    */
    pub fn logical_len(&self) -> u64 {
        self.confirmed + self.pending.len() as u64
    }

    pub fn block_size(&self) -> u64 {
        self.block_size
    }

    pub fn get_ref(&self) -> &W {
        &self.inner
    }
}

impl<W: RawWriter> Buffered<W> {
    fn write_pending(&mut self) -> io::Result<()> {
        if !self.pending.is_empty() {
            self.inner.write(&self.pending, 0)?;

            self.confirmed += self.pending.len() as u64;
            self.pending.clear();
        }

        Ok(())
    }
}

impl<W: RawWriter> RawWriter for Buffered<W> {
    fn write(&mut self, data: &[u8], skip: usize) -> io::Result<()> {
        let incoming = &data[skip..];

        let logical = self.logical_len() + incoming.len() as u64;
        let target = logical / self.block_size * self.block_size;

        if target <= self.confirmed {
            self.pending.extend_from_slice(incoming);
            return Ok(());
        }

        let through = (target - self.confirmed) as usize;

        if self.pending.is_empty() {
            self.inner.write(&data[..skip + through], skip)?;
        } else {
            let held = self.pending.len();
            let from_incoming = through.saturating_sub(held);

            self.pending.extend_from_slice(&incoming[..from_incoming]);

            // A failed record must not stay behind in the buffer
            if let Err(err) = self.inner.write(&self.pending[..through], 0) {
                self.pending.truncate(held);
                return Err(err);
            }

            self.pending.drain(..through);

            self.confirmed = target;
            self.pending.extend_from_slice(&incoming[from_incoming..]);

            return Ok(());
        }

        self.confirmed = target;
        self.pending.extend_from_slice(&incoming[through..]);

        Ok(())
    }

    fn read_tail(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let pending = self.pending.len();

        if pending >= buf.len() {
            buf.copy_from_slice(&self.pending[pending - buf.len()..]);
            return Ok(buf.len());
        }

        let from_inner = buf.len() - pending;
        let read = self.inner.read_tail(&mut buf[..from_inner])?;

        buf[read..read + pending].copy_from_slice(&self.pending);

        Ok(read + pending)
    }

    fn truncate(&mut self, count: u64) -> io::Result<()> {
        let pending = self.pending.len() as u64;

        if count <= pending {
            self.pending.truncate((pending - count) as usize);
            return Ok(());
        }

        self.pending.clear();

        let from_inner = (count - pending).min(self.confirmed);
        self.inner.truncate(from_inner)?;
        self.confirmed -= from_inner;

        Ok(())
    }

    fn flush(&mut self) -> io::Result<()> {
        self.write_pending()?;
        self.inner.flush()
    }

    fn close(&mut self) -> io::Result<()> {
        // The inner writer is closed even if the pending bytes can't be written
        let written = self.write_pending();
        let closed = self.inner.close();

        written.and(closed)
    }
}

/**
A decorator that serializes access to a shared writer.

Clones of a `Synchronized` share the same inner writer, and each operation holds its mutex for the duration of the call.
*/
#[derive(Debug)]
pub struct Synchronized<W>(Arc<Mutex<W>>);

impl<W> Clone for Synchronized<W> {
    fn clone(&self) -> Self {
        Synchronized(self.0.clone())
    }
}

impl<W> Synchronized<W> {
    pub fn new(inner: W) -> Self {
        Synchronized(Arc::new(Mutex::new(inner)))
    }

    fn with<T>(&self, op: impl FnOnce(&mut W) -> T) -> T {
        let mut inner = self.0.lock().unwrap_or_else(|poisoned| poisoned.into_inner());

        op(&mut inner)
    }
}

impl<W: RawWriter> RawWriter for Synchronized<W> {
    fn write(&mut self, data: &[u8], skip: usize) -> io::Result<()> {
        self.with(|inner| inner.write(data, skip))
    }

    fn read_tail(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.with(|inner| inner.read_tail(buf))
    }

    fn truncate(&mut self, count: u64) -> io::Result<()> {
        self.with(|inner| inner.truncate(count))
    }

    fn flush(&mut self) -> io::Result<()> {
        self.with(|inner| inner.flush())
    }

    fn close(&mut self) -> io::Result<()> {
        self.with(|inner| inner.close())
    }
}
