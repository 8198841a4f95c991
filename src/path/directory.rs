use std::{
    collections::BTreeMap,
    fs, io,
    path::{Path, PathBuf},
    sync::Arc,
    time::SystemTime,
};

/**
An entry in a directory listing.
*/
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirEntry {
    name: String,
    is_file: bool,
    modified: Option<SystemTime>,
}

impl DirEntry {
    pub fn file(name: impl Into<String>) -> Self {
        DirEntry {
            name: name.into(),
            is_file: true,
            modified: None,
        }
    }

    pub fn dir(name: impl Into<String>) -> Self {
        DirEntry {
            name: name.into(),
            is_file: false,
            modified: None,
        }
    }

    pub fn with_modified(mut self, modified: SystemTime) -> Self {
        self.modified = Some(modified);
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn is_file(&self) -> bool {
        self.is_file
    }

    pub fn modified(&self) -> Option<SystemTime> {
        self.modified
    }
}

/**
The ability to list the contents of a directory.

Discovering previous generations of a file only ever goes through this trait, so it can be exercised without touching a real filesystem.
*/
pub trait Directory {
    /**
    List the entries in `dir`.

    A directory that doesn't exist has no entries.
    */
    fn list(&self, dir: &Path) -> io::Result<Vec<DirEntry>>;

    /**
    Whether `path` names an existing file.
    */
    fn is_file(&self, path: &Path) -> bool {
        let Some(name) = path.file_name().and_then(|name| name.to_str()) else {
            return false;
        };

        let parent = match path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };

        self.list(parent)
            .map(|entries| {
                entries
                    .iter()
                    .any(|entry| entry.is_file() && entry.name() == name)
            })
            .unwrap_or(false)
    }
}

impl<'a, T: Directory + ?Sized> Directory for &'a T {
    fn list(&self, dir: &Path) -> io::Result<Vec<DirEntry>> {
        (**self).list(dir)
    }

    fn is_file(&self, path: &Path) -> bool {
        (**self).is_file(path)
    }
}

impl<'a, T: Directory + ?Sized + 'a> Directory for Box<T> {
    fn list(&self, dir: &Path) -> io::Result<Vec<DirEntry>> {
        (**self).list(dir)
    }

    fn is_file(&self, path: &Path) -> bool {
        (**self).is_file(path)
    }
}

impl<'a, T: Directory + ?Sized + 'a> Directory for Arc<T> {
    fn list(&self, dir: &Path) -> io::Result<Vec<DirEntry>> {
        (**self).list(dir)
    }

    fn is_file(&self, path: &Path) -> bool {
        (**self).is_file(path)
    }
}

/**
A [`Directory`] backed by the local filesystem.
*/
#[derive(Debug, Default, Clone, Copy)]
pub struct FsDirectory;

impl Directory for FsDirectory {
    fn list(&self, dir: &Path) -> io::Result<Vec<DirEntry>> {
        let read_dir = match fs::read_dir(dir) {
            Ok(read_dir) => read_dir,
            Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(err) => return Err(err),
        };

        let mut entries = Vec::new();

        for entry in read_dir {
            let Ok(entry) = entry else {
                continue;
            };

            let Ok(name) = entry.file_name().into_string() else {
                continue;
            };

            let Ok(metadata) = entry.metadata() else {
                continue;
            };

            entries.push(DirEntry {
                name,
                is_file: metadata.is_file(),
                modified: metadata.modified().ok(),
            });
        }

        Ok(entries)
    }

    fn is_file(&self, path: &Path) -> bool {
        path.is_file()
    }
}

/**
A [`Directory`] that lists a fixed set of paths held in memory.

Parent directories of added files are listed automatically.
*/
#[derive(Debug, Default, Clone)]
pub struct MemoryDirectory {
    entries: BTreeMap<PathBuf, BTreeMap<String, DirEntry>>,
}

impl MemoryDirectory {
    pub fn new() -> Self {
        MemoryDirectory::default()
    }

    /**
    Add a file at `path`.
    */
    pub fn with_file(mut self, path: impl AsRef<Path>) -> Self {
        self.insert(path.as_ref(), None);
        self
    }

    /**
    Add a file at `path` with the given modification time.
    */
    pub fn with_file_modified(mut self, path: impl AsRef<Path>, modified: SystemTime) -> Self {
        self.insert(path.as_ref(), Some(modified));
        self
    }

    fn insert(&mut self, path: &Path, modified: Option<SystemTime>) {
        let mut entry = match path.file_name().and_then(|name| name.to_str()) {
            Some(name) => DirEntry::file(name),
            None => return,
        };
        entry.modified = modified;

        let mut current = path;

        while let Some(parent) = current.parent() {
            let parent_key = if parent.as_os_str().is_empty() {
                PathBuf::from(".")
            } else {
                parent.to_owned()
            };

            let listing = self.entries.entry(parent_key).or_default();

            if entry.is_file {
                listing.insert(entry.name.clone(), entry);
            } else {
                listing.entry(entry.name.clone()).or_insert(entry);
            }

            match parent.file_name().and_then(|name| name.to_str()) {
                Some(name) => entry = DirEntry::dir(name),
                None => break,
            }

            current = parent;
        }
    }
}

impl Directory for MemoryDirectory {
    fn list(&self, dir: &Path) -> io::Result<Vec<DirEntry>> {
        let key = if dir.as_os_str().is_empty() {
            Path::new(".")
        } else {
            dir
        };

        Ok(self
            .entries
            .get(key)
            .map(|entries| entries.values().cloned().collect())
            .unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn memory_directory_lists_parents() {
        let dir = MemoryDirectory::new()
            .with_file("logs/2000/app.log")
            .with_file("top.log");

        let root = dir.list(Path::new(".")).unwrap();
        assert_eq!(vec![DirEntry::dir("logs"), DirEntry::file("top.log")], root);

        let logs = dir.list(Path::new("logs")).unwrap();
        assert_eq!(vec![DirEntry::dir("2000")], logs);

        assert!(dir.is_file(Path::new("logs/2000/app.log")));
        assert!(!dir.is_file(Path::new("logs/2000")));
        assert!(dir.list(Path::new("missing")).unwrap().is_empty());
    }

    #[test]
    fn fs_directory_treats_missing_dirs_as_empty() {
        let dir = tempfile::tempdir().unwrap();

        fs::write(dir.path().join("a.log"), b"a").unwrap();
        fs::create_dir(dir.path().join("sub")).unwrap();

        let mut entries = FsDirectory.list(dir.path()).unwrap();
        entries.sort_by(|a, b| a.name().cmp(b.name()));

        assert_eq!("a.log", entries[0].name());
        assert!(entries[0].is_file());
        assert!(entries[0].modified().is_some());
        assert_eq!("sub", entries[1].name());
        assert!(!entries[1].is_file());

        assert!(FsDirectory
            .list(&dir.path().join("missing"))
            .unwrap()
            .is_empty());
    }
}
