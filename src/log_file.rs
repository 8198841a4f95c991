/*!
The [`LogFile`] type.
*/

use std::{
    fs, io,
    path::{Path, PathBuf},
};

use crate::raw::{Buffered, CharsetAdjusted, LockedFile, OpenMode, PlainFile, RawWriter};

/**
The default number of bytes buffered before writing through to disk.
*/
pub const DEFAULT_BLOCK_SIZE: usize = 64 * 1024;

/**
Options for opening a [`LogFile`].
*/
#[derive(Debug, Clone, Copy)]
pub struct LogFileOptions {
    /**
    Writes go through to disk whenever the file size crosses a multiple of this many bytes.
    */
    pub block_size: usize,
    /**
    Whether other processes may write to the same file.

    Shared files are locked for each individual operation.
    */
    pub shared: bool,
    /**
    A charset preamble written once to the start of an empty file and stripped from every record.
    */
    pub header: &'static [u8],
}

impl Default for LogFileOptions {
    fn default() -> Self {
        LogFileOptions {
            block_size: DEFAULT_BLOCK_SIZE,
            shared: false,
            header: &[],
        }
    }
}

/**
An open, block-buffered log file.

A log file tracks how many bytes have been written to disk separately from how many are held in memory waiting for the next block boundary. Only the bytes that are still pending are at risk if the process crashes.
*/
pub struct LogFile {
    path: PathBuf,
    writer: CharsetAdjusted<Buffered<Box<dyn RawWriter + Send>>>,
    is_new_file: bool,
}

impl LogFile {
    /**
    Open the file at `path`, creating it and any missing parent directories.
    */
    pub fn open(path: impl AsRef<Path>, mode: OpenMode, options: LogFileOptions) -> io::Result<Self> {
        let path = path.as_ref();

        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }

        let (raw, existing_len, len): (Box<dyn RawWriter + Send>, _, _) = if options.shared {
            let mut file = LockedFile::open(path, mode, options.header)?;

            let existing_len = file.existing_len();
            let len = file.len()?;

            (Box::new(file), existing_len, len)
        } else {
            let mut file = PlainFile::open(path, mode, options.header)?;

            let existing_len = file.existing_len();
            let len = file.len()?;

            (Box::new(file), existing_len, len)
        };

        Ok(LogFile {
            path: path.into(),
            writer: CharsetAdjusted::new(Buffered::new(raw, options.block_size, len), options.header),
            is_new_file: existing_len == 0,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /**
    Whether the file had no content when it was opened.

    Files opened with [`OpenMode::Overwrite`] are always new.
    */
    pub fn is_new_file(&self) -> bool {
        self.is_new_file
    }

    /**
    The number of bytes written through to disk.
    */
    pub fn confirmed_size(&self) -> u64 {
        self.writer.get_ref().confirmed()
    }

    /**
    The number of bytes written, including ones still waiting in memory.
    */
    pub fn size(&self) -> u64 {
        self.writer.get_ref().logical_len()
    }

    /**
    Append `data[skip..]`.
    */
    pub fn write(&mut self, data: &[u8], skip: usize) -> io::Result<()> {
        self.writer.write(data, skip)
    }

    /**
    Fill `buf` with the last bytes of the file, including pending ones.
    */
    pub fn read_tail(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.writer.read_tail(buf)
    }

    /**
    Discard the last `count` bytes.
    */
    pub fn truncate(&mut self, count: u64) -> io::Result<()> {
        self.writer.truncate(count)
    }

    /**
    Write all pending bytes and sync them to disk.
    */
    pub fn flush(&mut self) -> io::Result<()> {
        self.writer.flush()
    }

    /**
    Flush and release the file handle.

    The handle is released even if flushing fails.
    */
    pub fn close(mut self) -> io::Result<()> {
        self.writer.close()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn options(block_size: usize) -> LogFileOptions {
        LogFileOptions {
            block_size,
            ..Default::default()
        }
    }

    #[test]
    fn writes_are_aligned_to_blocks() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("test.log");

        fs::write(&path, b"123456").unwrap();

        let mut file = LogFile::open(&path, OpenMode::Continue, options(8)).unwrap();
        assert!(!file.is_new_file());

        file.write(b"a", 0).unwrap();
        assert_eq!(6, fs::metadata(&path).unwrap().len());
        assert_eq!(6, file.confirmed_size());
        assert_eq!(7, file.size());

        file.write(b"b", 0).unwrap();
        assert_eq!(8, fs::metadata(&path).unwrap().len());

        file.write(b"c", 0).unwrap();
        assert_eq!(8, fs::metadata(&path).unwrap().len());

        file.close().unwrap();
        assert_eq!(b"123456abc", &*fs::read(&path).unwrap());
    }

    #[test]
    fn oversized_writes_go_straight_to_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("test.log");

        let mut file = LogFile::open(&path, OpenMode::Continue, options(8)).unwrap();
        assert!(file.is_new_file());

        file.write(&[b'x'; 17], 0).unwrap();
        assert_eq!(16, fs::metadata(&path).unwrap().len());

        file.close().unwrap();
        assert_eq!(17, fs::metadata(&path).unwrap().len());
    }

    #[test]
    fn overwrite_discards_existing_content() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("test.log");

        fs::write(&path, b"old").unwrap();

        let mut file = LogFile::open(&path, OpenMode::Overwrite, options(8)).unwrap();
        assert!(file.is_new_file());
        assert_eq!(0, file.size());

        file.write(b"new", 0).unwrap();
        file.flush().unwrap();
        assert_eq!(b"new", &*fs::read(&path).unwrap());

        file.close().unwrap();
    }

    #[test]
    fn charset_header_is_written_once() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("utf16.log");

        let options = LogFileOptions {
            block_size: 4,
            header: &[0xFE, 0xFF],
            ..Default::default()
        };

        let mut file = LogFile::open(&path, OpenMode::Continue, options).unwrap();
        assert_eq!(2, file.confirmed_size());

        file.write(&[0xFE, 0xFF, 0x00, b'a'], 0).unwrap();
        file.write(&[0xFE, 0xFF, 0x00, b'b'], 0).unwrap();
        file.close().unwrap();

        let mut file = LogFile::open(&path, OpenMode::Continue, options).unwrap();
        file.write(&[0xFE, 0xFF, 0x00, b'c'], 0).unwrap();

        let mut tail = [0; 2];
        file.read_tail(&mut tail).unwrap();
        assert_eq!([0x00, b'c'], tail);

        file.close().unwrap();

        assert_eq!(
            &[0xFE, 0xFF, 0x00, b'a', 0x00, b'b', 0x00, b'c'],
            &*fs::read(&path).unwrap()
        );
    }

    #[test]
    #[cfg(unix)]
    fn shared_files_write_every_record() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("shared.log");

        let options = LogFileOptions {
            block_size: 1,
            shared: true,
            ..Default::default()
        };

        let mut a = LogFile::open(&path, OpenMode::Continue, options).unwrap();
        let mut b = LogFile::open(&path, OpenMode::Continue, options).unwrap();

        a.write(b"a\n", 0).unwrap();
        b.write(b"b\n", 0).unwrap();

        assert_eq!(b"a\nb\n", &*fs::read(&path).unwrap());

        a.close().unwrap();
        b.close().unwrap();
    }
}
