//! Crash/resume behaviour of the whole-file deserializer over real files.
//!
//! A "crash" is simulated by dropping a deserializer without closing it;
//! only what was committed through `mark` survives into the next instance.

use ingest_deserializer::{
    Context, Error, EventDeserializer, EventDeserializerFactory, FileDeserializer,
    FileDeserializerConfig,
};
use ingest_file::ResettableFileSource;
use position_tracker::{read_tracker_file, DurablePositionTracker};
use std::path::{Path, PathBuf};
use tempfile::TempDir;

fn setup(contents: &[u8]) -> (TempDir, PathBuf, PathBuf) {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("input.txt");
    std::fs::write(&path, contents).unwrap();
    let tracker_path = temp_dir.path().join(".input.txt.position.json");
    (temp_dir, path, tracker_path)
}

fn open(path: &Path, tracker_path: &Path, suffix: &str) -> FileDeserializer {
    let tracker = DurablePositionTracker::open(tracker_path, path.display().to_string()).unwrap();
    let source = ResettableFileSource::open(path, Box::new(tracker)).unwrap();
    let config = FileDeserializerConfig {
        file_suffix: suffix.to_string(),
        ..Default::default()
    };
    FileDeserializer::new(config, Box::new(source))
}

#[test]
fn test_crash_before_commit_replays_record() {
    let (_dir, path, tracker_path) = setup(b"whole file");

    {
        let mut d = open(&path, &tracker_path, "<X>");
        let event = d.read_event().unwrap().unwrap();
        assert_eq!(event.body(), b"whole file<X>");
        // Dropped without mark or close
    }

    let mut d = open(&path, &tracker_path, "<X>");
    let event = d.read_event().unwrap().unwrap();
    assert_eq!(event.body(), b"whole file<X>");
}

#[test]
fn test_commit_then_crash_skips_record() {
    let (_dir, path, tracker_path) = setup(b"whole file");

    {
        let mut d = open(&path, &tracker_path, "<X>");
        assert!(d.read_event().unwrap().is_some());
        d.mark().unwrap();
    }

    let stored = read_tracker_file(&tracker_path).unwrap().unwrap();
    assert_eq!(stored.position, 10);

    let mut d = open(&path, &tracker_path, "<X>");
    assert!(d.read_event().unwrap().is_none());
    assert!(d.read_events(5).unwrap().is_empty());
}

#[test]
fn test_close_rewinds_uncommitted_progress() {
    let (_dir, path, tracker_path) = setup(b"abc");

    let mut d = open(&path, &tracker_path, "!");
    d.mark().unwrap();
    assert!(d.read_event().unwrap().is_some());
    d.close().unwrap();
    assert!(matches!(d.read_event(), Err(Error::InvalidState)));

    let stored = read_tracker_file(&tracker_path).unwrap().unwrap();
    assert_eq!(stored.position, 0);

    let mut d = open(&path, &tracker_path, "!");
    assert_eq!(d.read_event().unwrap().unwrap().body(), b"abc!");
}

#[test]
fn test_mark_reset_reproduces_identical_record() {
    let (_dir, path, tracker_path) = setup("multi\nline\nübung".as_bytes());

    let mut d = open(&path, &tracker_path, "\r\nflumeFileSuffix");
    d.mark().unwrap();
    let first = d.read_event().unwrap().unwrap();
    d.reset().unwrap();
    let second = d.read_event().unwrap().unwrap();

    assert_eq!(first, second);
    assert_eq!(
        first.body(),
        "multi\nline\nübung\r\nflumeFileSuffix".as_bytes()
    );
}

#[test]
fn test_factory_over_file_source() {
    let (_dir, path, tracker_path) = setup(b"ab");

    let tracker = DurablePositionTracker::open(&tracker_path, path.display().to_string()).unwrap();
    let source = ResettableFileSource::open(&path, Box::new(tracker)).unwrap();
    let context: Context = [("fileSuffix", "<X>")].into_iter().collect();

    let mut d = EventDeserializerFactory::new()
        .get_instance("FILE", &context, Box::new(source))
        .unwrap();
    let events = d.read_events(3).unwrap();
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].body(), b"ab<X>");
    assert!(d.read_events(3).unwrap().is_empty());
    d.close().unwrap();
    d.close().unwrap();
}
