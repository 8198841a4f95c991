#![cfg(unix)]

use std::{
    collections::HashMap,
    env, fs,
    path::Path,
    process::{Command, Stdio},
};

use logroll::{file, Discard, Format, Level, LogEntry, Writer};

const CHILD_PATH: &str = "LOGROLL_SHARED_TEST_PATH";
const CHILD_ID: &str = "LOGROLL_SHARED_TEST_ID";

const PROCESSES: usize = 4;
const LINES: usize = 200;

fn append_lines(path: &Path, id: usize) {
    let writer = file(path.to_string_lossy())
        .shared(true)
        .format(Format::lookup("line", Some("{message}"), Discard).unwrap())
        .diagnostics(Discard)
        .build()
        .unwrap();

    for line in 0..LINES {
        let message = format!("{id:02}:{line:05}:{}", "x".repeat(32));
        writer.log(&LogEntry::new(Level::Info, &message)).unwrap();
    }

    writer.close().unwrap();
}

#[test]
fn processes_append_whole_lines() {
    // Re-run as a child writing to the file chosen by the parent
    if let (Ok(path), Ok(id)) = (env::var(CHILD_PATH), env::var(CHILD_ID)) {
        append_lines(Path::new(&path), id.parse().unwrap());
        return;
    }

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("shared.log");

    let exe = env::current_exe().unwrap();

    let children = (0..PROCESSES)
        .map(|id| {
            Command::new(&exe)
                .args(["processes_append_whole_lines", "--exact", "--nocapture"])
                .env(CHILD_PATH, &path)
                .env(CHILD_ID, id.to_string())
                .stdout(Stdio::null())
                .spawn()
                .unwrap()
        })
        .collect::<Vec<_>>();

    for mut child in children {
        assert!(child.wait().unwrap().success());
    }

    let content = fs::read_to_string(&path).unwrap();
    assert!(content.ends_with('\n'));

    let mut next = HashMap::new();

    for line in content.lines() {
        let mut parts = line.splitn(3, ':');

        let id = parts.next().unwrap().parse::<usize>().unwrap();
        let number = parts.next().unwrap().parse::<usize>().unwrap();

        assert_eq!(Some("x".repeat(32).as_str()), parts.next(), "{line:?}");

        // Each process writes its own lines in order
        let expected = next.entry(id).or_insert(0);
        assert_eq!(*expected, number);
        *expected += 1;
    }

    assert_eq!(PROCESSES, next.len());
    assert!(next.values().all(|count| *count == LINES));
}
