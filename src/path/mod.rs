/*!
Dynamic file paths.

A [`DynamicPath`] is built from a template like `logs/{date: yyyy-MM-dd}_{count}.log`. Each time a new file is needed it resolves to a new concrete path, and when a writer starts it can find the path it most recently resolved to purely by listing directories.
*/

use std::{
    fmt,
    path::{Path, PathBuf},
    sync::Arc,
    time::SystemTime,
};

use crate::{diagnostics::Diagnostics, error::Error, Timestamp};

mod directory;
mod segment;
mod template;

pub use self::{
    directory::{DirEntry, Directory, FsDirectory, MemoryDirectory},
    segment::PathSegment,
    template::{parse as parse_template, DEFAULT_DATE_PATTERN},
};

/**
A path template along with the means to inspect the files it has produced.
*/
#[derive(Clone)]
pub struct DynamicPath {
    template: String,
    root: PathSegment,
    directory: Arc<dyn Directory + Send + Sync>,
    latest: Option<PathBuf>,
}

/**
A concrete path chosen for a new file.
*/
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Generation {
    pub path: PathBuf,
    pub kind: GenerationKind,
}

/**
Whether a new [`Generation`] is a different file from the current one.
*/
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GenerationKind {
    /**
    The path is different from the current file's.
    */
    Fresh,
    /**
    The path is the same as the current file's, so its content will be replaced.
    */
    Overwrite,
}

impl DynamicPath {
    /**
    Parse a template and find its latest existing file on the local filesystem.
    */
    pub fn parse(template: &str, diagnostics: impl Diagnostics) -> Result<Self, Error> {
        DynamicPath::parse_in(template, FsDirectory, diagnostics)
    }

    /**
    Parse a template and find its latest existing file in `directory`.
    */
    pub fn parse_in(
        template: &str,
        directory: impl Directory + Send + Sync + 'static,
        diagnostics: impl Diagnostics,
    ) -> Result<Self, Error> {
        let segments = template::parse(template, diagnostics)?;

        if segments.is_empty() {
            return Err(Error::config("the path template is empty"));
        }

        Ok(DynamicPath::from_segments(template, segments, directory))
    }

    /**
    Build a path from segments that have already been parsed.
    */
    pub fn from_segments(
        template: impl Into<String>,
        segments: Vec<PathSegment>,
        directory: impl Directory + Send + Sync + 'static,
    ) -> Self {
        let mut path = DynamicPath {
            template: template.into(),
            root: PathSegment::Bundle(segments),
            directory: Arc::new(directory),
            latest: None,
        };

        path.latest = path.find_latest();
        path
    }

    pub fn template(&self) -> &str {
        &self.template
    }

    /**
    The segments of the template, in order.
    */
    pub fn segments(&self) -> &[PathSegment] {
        match &self.root {
            PathSegment::Bundle(segments) => segments,
            segment => std::slice::from_ref(segment),
        }
    }

    /**
    Whether every generation resolves to the same path.
    */
    pub fn is_static(&self) -> bool {
        self.root.is_static()
    }

    /**
    The most recent existing file produced by this template, as found when the path was built.

    This is `None` if no file exists, or if the latest one can't be determined.
    */
    pub fn latest(&self) -> Option<&Path> {
        self.latest.as_deref()
    }

    fn find_latest(&self) -> Option<PathBuf> {
        let latest = PathBuf::from(self.root.find_latest(&*self.directory, "")?);

        if self.directory.is_file(&latest) {
            Some(latest)
        } else {
            None
        }
    }

    /**
    Resolve a path for a brand new generation.
    */
    pub fn resolve_next(&self, now: &Timestamp) -> PathBuf {
        let mut path = String::new();
        self.root.resolve(&mut path, now, &*self.directory);

        PathBuf::from(path)
    }

    /**
    Resolve the path for the generation that follows `current`.

    The result says whether the new path is a different file, or whether `current` itself will be replaced, as happens with templates that have no dynamic segments.
    */
    pub fn next_generation(&self, now: &Timestamp, current: Option<&Path>) -> Generation {
        let path = self.resolve_next(now);

        let kind = if current == Some(&*path) {
            GenerationKind::Overwrite
        } else {
            GenerationKind::Fresh
        };

        Generation { path, kind }
    }

    /**
    Whether `path` could have been produced by this template.
    */
    pub fn matches(&self, path: &Path) -> bool {
        let Some(path) = path.to_str() else {
            return false;
        };

        let mut segments = Vec::new();
        flatten(&self.root, &mut segments);

        matches_segments(&segments, path)
    }

    /**
    All existing files produced by this template, with their modification times.

    Files are found by walking down from the deepest directory named by the fixed start of the template.
    */
    pub fn generations(&self, now: &Timestamp) -> Vec<(PathBuf, Option<SystemTime>)> {
        let mut segments = Vec::new();
        flatten(&self.root, &mut segments);

        let mut fixed = String::new();
        for segment in &segments {
            match segment {
                PathSegment::Static(text) => fixed.push_str(text),
                _ => break,
            }
        }

        let (root, _) = segment::split_prefix(&fixed);
        let root_text = if fixed.contains(std::path::is_separator) {
            root.to_string_lossy().into_owned()
        } else {
            String::new()
        };

        // Every generation has the same number of components as a freshly resolved one
        let depth = |path: &Path| path.components().count();
        let target_depth = depth(&self.resolve_next(now));

        let mut found = Vec::new();
        let mut pending = vec![root_text];

        while let Some(dir) = pending.pop() {
            let dir_path = if dir.is_empty() { Path::new(".") } else { Path::new(&dir) };

            let Ok(entries) = self.directory.list(dir_path) else {
                continue;
            };

            for entry in entries {
                let path = if dir.is_empty() {
                    entry.name().to_owned()
                } else if dir.ends_with(std::path::is_separator) {
                    format!("{dir}{}", entry.name())
                } else {
                    format!("{dir}{}{}", std::path::MAIN_SEPARATOR, entry.name())
                };

                let current_depth = depth(Path::new(&path));

                if entry.is_file() {
                    if current_depth == target_depth && matches_segments(&segments, &path) {
                        found.push((PathBuf::from(path), entry.modified()));
                    }
                } else if current_depth < target_depth {
                    pending.push(path);
                }
            }
        }

        found
    }
}

fn flatten<'a>(segment: &'a PathSegment, out: &mut Vec<&'a PathSegment>) {
    match segment {
        PathSegment::Bundle(segments) => {
            for segment in segments {
                flatten(segment, out);
            }
        }
        segment => out.push(segment),
    }
}

fn matches_segments(segments: &[&PathSegment], text: &str) -> bool {
    let Some((first, rest)) = segments.split_first() else {
        return text.is_empty();
    };

    match first {
        PathSegment::Static(literal) => text
            .strip_prefix(literal.as_str())
            .map(|text| matches_segments(rest, text))
            .unwrap_or(false),
        PathSegment::Count | PathSegment::ProcessId => {
            let digits = text
                .find(|c: char| !c.is_ascii_digit())
                .unwrap_or(text.len());

            (1..=digits).any(|len| matches_segments(rest, &text[len..]))
        }
        PathSegment::DateTime(pattern) => match pattern.parse_prefix(text) {
            Some((_, len)) if len > 0 => matches_segments(rest, &text[len..]),
            _ => false,
        },
        PathSegment::Bundle(_) => {
            let mut flattened = Vec::new();
            flatten(first, &mut flattened);
            flattened.extend_from_slice(rest);

            matches_segments(&flattened, text)
        }
    }
}

impl fmt::Debug for DynamicPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DynamicPath")
            .field("template", &self.template)
            .field("segments", &self.segments())
            .field("latest", &self.latest)
            .finish()
    }
}
