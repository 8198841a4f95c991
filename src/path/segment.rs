use std::{
    fmt::Write as _,
    path::{self, Path},
};

use crate::{
    date::{DatePattern, Moment},
    path::directory::Directory,
    Timestamp,
};

/**
One part of a path template.

A segment can produce text for a new file, and can recover the text it produced for the most recent existing file by inspecting the directory that file would live in.
*/
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PathSegment {
    /**
    Fixed text.
    */
    Static(String),
    /**
    A number one greater than the largest found on disk, or `0`.
    */
    Count,
    /**
    The current date and time.
    */
    DateTime(DatePattern),
    /**
    The identifier of the current process.
    */
    ProcessId,
    /**
    A sequence of segments treated as one.
    */
    Bundle(Vec<PathSegment>),
}

impl PathSegment {
    /**
    Append the text for a new generation onto `out`.

    `out` holds the text produced by all previous segments in the template.
    */
    pub fn resolve(&self, out: &mut String, now: &Timestamp, dir: &dyn Directory) {
        match self {
            PathSegment::Static(text) => out.push_str(text),
            PathSegment::Count => {
                let next = self
                    .find_latest(dir, out)
                    .and_then(|latest| latest.parse::<u64>().ok())
                    .map(|latest| latest.checked_add(1).unwrap_or(0))
                    .unwrap_or(0);

                let _ = write!(out, "{next}");
            }
            PathSegment::DateTime(pattern) => pattern.format_into(now, out),
            PathSegment::ProcessId => {
                let _ = write!(out, "{}", std::process::id());
            }
            PathSegment::Bundle(segments) => {
                for segment in segments {
                    segment.resolve(out, now, dir);
                }
            }
        }
    }

    /**
    Find the text this segment produced for the latest existing generation.

    `prefix` is the text already recovered for the previous segments in the template. `None` means the latest value can't be determined.
    */
    pub fn find_latest(&self, dir: &dyn Directory, prefix: &str) -> Option<String> {
        match self {
            PathSegment::Static(text) => Some(text.clone()),
            PathSegment::Count => candidates(dir, prefix)
                .into_iter()
                .filter_map(|suffix| leading_number(&suffix))
                .max()
                .map(|latest| latest.to_string()),
            PathSegment::DateTime(pattern) => {
                let mut latest: Option<(Moment, String)> = None;

                for suffix in candidates(dir, prefix) {
                    let Some((moment, len)) = pattern.parse_prefix(&suffix) else {
                        continue;
                    };

                    // Values of different shapes can't be ordered, so there's no way to tell which is newest
                    let is_latest = match &latest {
                        None => true,
                        Some((current, _)) => moment.partial_cmp(current)?.is_gt(),
                    };

                    if is_latest {
                        latest = Some((moment, suffix[..len].to_owned()));
                    }
                }

                latest.map(|(_, text)| text)
            }
            PathSegment::ProcessId => None,
            PathSegment::Bundle(segments) => {
                let mut full = prefix.to_owned();

                for segment in segments {
                    let text = segment.find_latest(dir, &full)?;
                    full.push_str(&text);
                }

                Some(full.split_off(prefix.len()))
            }
        }
    }

    /**
    Whether this segment produces the same text for every generation.
    */
    pub fn is_static(&self) -> bool {
        match self {
            PathSegment::Static(_) => true,
            PathSegment::Bundle(segments) => segments.iter().all(|segment| segment.is_static()),
            _ => false,
        }
    }
}

/**
Split `prefix` into the directory to list and the start of the names to look for in it.
*/
pub(super) fn split_prefix(prefix: &str) -> (&Path, &str) {
    match prefix.rfind(path::is_separator) {
        Some(0) => (Path::new(&prefix[..1]), &prefix[1..]),
        Some(i) => (Path::new(&prefix[..i]), &prefix[i + 1..]),
        None => (Path::new("."), prefix),
    }
}

/**
The remainders of all entry names that start with the last component of `prefix`.
*/
fn candidates(dir: &dyn Directory, prefix: &str) -> Vec<String> {
    let (parent, name_prefix) = split_prefix(prefix);

    dir.list(parent)
        .unwrap_or_default()
        .into_iter()
        .filter_map(|entry| {
            entry
                .name()
                .strip_prefix(name_prefix)
                .map(|suffix| suffix.to_owned())
        })
        .collect()
}

fn leading_number(text: &str) -> Option<u64> {
    let digits = text
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(text.len());

    text[..digits].parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    use chrono::{FixedOffset, TimeZone};

    use crate::path::directory::MemoryDirectory;

    fn now() -> Timestamp {
        FixedOffset::east_opt(0)
            .unwrap()
            .with_ymd_and_hms(2000, 1, 1, 12, 0, 0)
            .unwrap()
    }

    fn date(pattern: &str) -> PathSegment {
        PathSegment::DateTime(DatePattern::new(pattern).unwrap())
    }

    #[test]
    fn static_segment() {
        let segment = PathSegment::Static("foo".into());
        let dir = MemoryDirectory::new();

        let mut out = String::from("logs/");
        segment.resolve(&mut out, &now(), &dir);

        assert_eq!("logs/foo", out);
        assert_eq!(Some("foo".into()), segment.find_latest(&dir, "logs/"));
    }

    #[test]
    fn count_finds_largest_number() {
        let dir = MemoryDirectory::new()
            .with_file("foo8/30/42")
            .with_file("logs/foo8.log")
            .with_file("logs/foo30.log")
            .with_file("logs/foo42.log")
            .with_file("logs/foobar.log")
            .with_file("logs/bar99.log");

        assert_eq!(Some("42".into()), PathSegment::Count.find_latest(&dir, "logs/foo"));
        assert_eq!(Some("8".into()), PathSegment::Count.find_latest(&dir, "foo"));
        assert_eq!(None, PathSegment::Count.find_latest(&dir, "logs/baz"));

        let mut out = String::from("logs/foo");
        PathSegment::Count.resolve(&mut out, &now(), &dir);
        assert_eq!("logs/foo43", out);
    }

    #[test]
    fn count_starts_at_zero() {
        let dir = MemoryDirectory::new();

        let mut out = String::from("missing/foo");
        PathSegment::Count.resolve(&mut out, &now(), &dir);

        assert_eq!("missing/foo0", out);
    }

    #[test]
    fn count_wraps_around() {
        let dir = MemoryDirectory::new().with_file(format!("foo{}.log", u64::MAX));

        assert_eq!(
            Some(u64::MAX.to_string()),
            PathSegment::Count.find_latest(&dir, "foo")
        );

        let mut out = String::from("foo");
        PathSegment::Count.resolve(&mut out, &now(), &dir);
        assert_eq!("foo0", out);
    }

    #[test]
    fn date_finds_chronologically_latest() {
        let dir = MemoryDirectory::new()
            .with_file("logs/31-01-2000.log")
            .with_file("logs/01-02-2000.log")
            .with_file("logs/01-01-2000.log")
            .with_file("logs/BAR.log");

        assert_eq!(
            Some("01-02-2000".into()),
            date("dd-MM-yyyy").find_latest(&dir, "logs/")
        );
    }

    #[test]
    fn date_without_moments_is_undetermined() {
        let dir = MemoryDirectory::new()
            .with_file("logZ.log")
            .with_file("log+01.log");

        assert_eq!(None, date("X").find_latest(&dir, "log"));
    }

    #[test]
    fn date_with_incomparable_values_is_undetermined() {
        // An impossible date only parses to its separate calendar fields
        let dir = MemoryDirectory::new()
            .with_file("logs/2000-01-01.log")
            .with_file("logs/2000-02-30.log");

        assert_eq!(None, date("yyyy-MM-dd").find_latest(&dir, "logs/"));

        let dir = MemoryDirectory::new()
            .with_file("logs/2000-01-01.log")
            .with_file("logs/2000-01-02.log");

        assert_eq!(
            Some("2000-01-02".into()),
            date("yyyy-MM-dd").find_latest(&dir, "logs/")
        );
    }

    #[test]
    fn date_resolves_now() {
        let mut out = String::new();
        date("yyyy-MM-dd").resolve(&mut out, &now(), &MemoryDirectory::new());

        assert_eq!("2000-01-01", out);
    }

    #[test]
    fn process_id_is_never_continued() {
        let dir = MemoryDirectory::new().with_file(format!("{}.log", std::process::id()));

        assert_eq!(None, PathSegment::ProcessId.find_latest(&dir, ""));

        let mut out = String::new();
        PathSegment::ProcessId.resolve(&mut out, &now(), &dir);
        assert_eq!(std::process::id().to_string(), out);
    }

    #[test]
    fn bundle_concatenates_children() {
        let bundle = PathSegment::Bundle(vec![
            PathSegment::Static("app_".into()),
            PathSegment::Count,
        ]);

        let dir = MemoryDirectory::new()
            .with_file("logs/app_3.log")
            .with_file("logs/app_11.log");

        assert_eq!(Some("app_11".into()), bundle.find_latest(&dir, "logs/"));

        let mut out = String::from("logs/");
        bundle.resolve(&mut out, &now(), &dir);
        assert_eq!("logs/app_12", out);

        assert!(!bundle.is_static());
        assert!(PathSegment::Bundle(vec![PathSegment::Static("a".into())]).is_static());
    }

    #[test]
    fn split_prefix_separates_dir_and_name() {
        assert_eq!((Path::new("logs"), "app_"), split_prefix("logs/app_"));
        assert_eq!((Path::new("."), "app_"), split_prefix("app_"));
        assert_eq!((Path::new("/"), "app_"), split_prefix("/app_"));
        assert_eq!((Path::new("logs"), ""), split_prefix("logs/"));
    }
}
