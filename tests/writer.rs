use std::{fs, path::Path};

use logroll::{
    file, Captured, Charset, Discard, Field, FileWriter, FileWriterBuilder, Format, Level,
    LogEntry, Policy, Writer,
};

fn builder(template: impl AsRef<Path>) -> FileWriterBuilder {
    file(template.as_ref().to_string_lossy()).diagnostics(Discard)
}

fn messages(count: usize) -> Vec<String> {
    (0..count).map(|i| format!("entry {i}")).collect()
}

fn generations(dir: &Path) -> Vec<(u32, String)> {
    let mut files = fs::read_dir(dir)
        .unwrap()
        .map(|entry| entry.unwrap().file_name().to_string_lossy().into_owned())
        .filter_map(|name| {
            let count = name.strip_prefix("app_")?.strip_suffix(".log")?;

            Some((count.parse::<u32>().ok()?, name))
        })
        .collect::<Vec<_>>();

    files.sort();

    files
        .into_iter()
        .map(|(count, name)| (count, fs::read_to_string(dir.join(name)).unwrap()))
        .collect()
}

#[test]
fn rotated_files_concatenate_to_the_unrotated_output() {
    let rotated = tempfile::tempdir().unwrap();
    let single = tempfile::tempdir().unwrap();

    let rotating = builder(rotated.path().join("app_{count}.log"))
        .policy(Policy::Size(40))
        .block_size(16)
        .build()
        .unwrap();

    let endless = builder(single.path().join("app.log")).build().unwrap();

    for message in messages(50) {
        let entry = LogEntry::new(Level::Info, &message);

        rotating.log(&entry).unwrap();
        endless.log(&entry).unwrap();
    }

    rotating.close().unwrap();
    endless.close().unwrap();

    let generations = generations(rotated.path());
    assert!(generations.len() > 1);

    for (_, content) in &generations {
        assert!(content.len() <= 40);
        assert!(content.ends_with('\n'));
    }

    let concatenated = generations
        .into_iter()
        .map(|(_, content)| content)
        .collect::<String>();

    assert_eq!(
        fs::read_to_string(single.path().join("app.log")).unwrap(),
        concatenated
    );
}

#[test]
fn restarts_continue_the_latest_generation() {
    let dir = tempfile::tempdir().unwrap();
    let template = dir.path().join("app_{count}.log");

    for count in [8, 30, 42] {
        fs::write(dir.path().join(format!("app_{count}.log")), b"").unwrap();
    }

    let writer = builder(&template).build().unwrap();
    writer.log(&LogEntry::new(Level::Info, "a")).unwrap();

    assert_eq!(Some(dir.path().join("app_42.log")), writer.current_path());

    writer.close().unwrap();

    let writer = builder(&template).build().unwrap();
    writer.log(&LogEntry::new(Level::Info, "b")).unwrap();
    writer.close().unwrap();

    assert_eq!(
        "a\nb\n",
        fs::read_to_string(dir.path().join("app_42.log")).unwrap()
    );
}

#[test]
fn startup_rotation_moves_to_a_new_generation() {
    let dir = tempfile::tempdir().unwrap();
    let template = dir.path().join("app_{count}.log");

    for message in ["a", "b"] {
        let writer = builder(&template).policy(Policy::Startup).build().unwrap();
        writer.log(&LogEntry::new(Level::Info, message)).unwrap();
        writer.close().unwrap();
    }

    assert_eq!(
        vec![(0, "a\n".to_owned()), (1, "b\n".to_owned())],
        generations(dir.path())
    );
}

#[test]
fn size_policy_discards_a_full_file_on_restart() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("app.log");

    fs::write(&path, b"a").unwrap();

    let writer = builder(&path).policy(Policy::Size(2)).build().unwrap();
    writer.log(&LogEntry::new(Level::Info, "b")).unwrap();
    writer.close().unwrap();

    assert_eq!("b\n", fs::read_to_string(&path).unwrap());
}

#[test]
fn unknown_charsets_fall_back_with_one_report() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("app.log");
    let diagnostics = Captured::new();

    let writer = FileWriter::from_config(
        [
            ("file", path.to_string_lossy().into_owned()),
            ("charset", "klingon".to_owned()),
        ],
        diagnostics.clone(),
    )
    .unwrap();

    writer.log(&LogEntry::new(Level::Info, "qapla'")).unwrap();
    writer.close().unwrap();

    assert_eq!("qapla'\n", fs::read_to_string(&path).unwrap());

    let reports = diagnostics.at_least(Level::Warn);
    assert_eq!(1, reports.len());
    assert!(reports[0].message.contains("klingon"));
}

#[test]
fn entries_are_encoded_with_the_charset() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("app.log");

    let writer = builder(&path)
        .charset(Charset::lookup("ISO-8859-1").unwrap())
        .build()
        .unwrap();

    writer.log(&LogEntry::new(Level::Info, "café")).unwrap();
    writer.close().unwrap();

    assert_eq!(b"caf\xe9\n".to_vec(), fs::read(&path).unwrap());
}

#[test]
fn utf16_files_carry_one_byte_order_mark_across_restarts() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("app.log");

    for message in ["a", "b"] {
        let writer = builder(&path)
            .charset(Charset::lookup("UTF-16").unwrap())
            .build()
            .unwrap();

        writer.log(&LogEntry::new(Level::Info, message)).unwrap();
        writer.close().unwrap();
    }

    assert_eq!(
        vec![0xfe, 0xff, 0, b'a', 0, b'\n', 0, b'b', 0, b'\n'],
        fs::read(&path).unwrap()
    );
}

#[test]
fn required_fields_follow_the_pattern() {
    let dir = tempfile::tempdir().unwrap();

    let writer = builder(dir.path().join("app.log"))
        .format(Format::lookup("line", Some("{date} [{thread}] {message}"), Discard).unwrap())
        .build()
        .unwrap();

    let fields = writer.required_fields();

    assert!(fields.contains(Field::Timestamp));
    assert!(fields.contains(Field::Thread));
    assert!(fields.contains(Field::Message));
    assert!(!fields.contains(Field::Exception));

    writer.close().unwrap();
}

#[test]
fn writers_can_be_shared_between_threads() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("app.log");

    let writer = builder(&path).block_size(7).build().unwrap();

    std::thread::scope(|scope| {
        for thread in 0..4 {
            let writer = &writer;

            scope.spawn(move || {
                for line in 0..100 {
                    let message = format!("{thread}:{line:03}");
                    writer.log(&LogEntry::new(Level::Info, &message)).unwrap();
                }
            });
        }
    });

    writer.close().unwrap();

    let content = fs::read_to_string(&path).unwrap();
    let lines = content.lines().collect::<Vec<_>>();

    assert_eq!(400, lines.len());
    assert!(lines.iter().all(|line| line.len() == 5));
}
