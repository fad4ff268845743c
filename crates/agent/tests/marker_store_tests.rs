//! Filesystem tests for [`FileMarkerStore`].

use assert_matches::assert_matches;
use chrono::NaiveDate;

use loadshield_agent::marker_store::{FileMarkerStore, MarkerIoError, MarkerStore};
use loadshield_core::marker::{MarkerState, ShieldMarker};

fn marker() -> ShieldMarker {
    ShieldMarker::new(
        NaiveDate::from_ymd_opt(2024, 11, 2)
            .unwrap()
            .and_hms_opt(23, 59, 1)
            .unwrap(),
    )
}

/// No file on disk means no marker.
#[test]
fn missing_file_is_absent() {
    let dir = tempfile::tempdir().unwrap();
    let store = FileMarkerStore::new(dir.path().join("cloudflare.txt"));

    assert_eq!(store.load().unwrap(), MarkerState::Absent);
}

/// `save` writes the bare `YYYY-MM-DD HH:MM:SS` text that `load` reads back.
#[test]
fn save_writes_fixed_format_and_load_reads_it_back() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("cloudflare.txt");
    let store = FileMarkerStore::new(&path);

    store.save(&marker()).unwrap();

    assert_eq!(std::fs::read_to_string(&path).unwrap(), "2024-11-02 23:59:01");
    assert_eq!(store.load().unwrap(), MarkerState::Present(marker()));
}

/// Saving overwrites whatever the file held before.
#[test]
fn save_replaces_previous_marker() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("cloudflare.txt");
    std::fs::write(&path, "2020-01-01 00:00:00 plus some trailing junk").unwrap();
    let store = FileMarkerStore::new(&path);

    store.save(&marker()).unwrap();

    assert_eq!(std::fs::read_to_string(&path).unwrap(), "2024-11-02 23:59:01");
}

/// An empty file is an invalid marker, not an I/O error.
#[test]
fn empty_file_is_invalid() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("cloudflare.txt");
    std::fs::write(&path, "").unwrap();

    let store = FileMarkerStore::new(&path);
    assert_matches!(store.load().unwrap(), MarkerState::Invalid(_));
}

/// Binary garbage is reported as an invalid marker rather than a read failure.
#[test]
fn non_utf8_content_is_invalid_not_an_error() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("cloudflare.txt");
    std::fs::write(&path, [0xff, 0xfe, 0x00]).unwrap();

    let store = FileMarkerStore::new(&path);
    assert_matches!(store.load().unwrap(), MarkerState::Invalid(_));
}

/// A trailing newline (e.g. from `echo`) does not invalidate the marker.
#[test]
fn marker_written_by_hand_with_newline_is_accepted() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("cloudflare.txt");
    std::fs::write(&path, "2024-11-02 23:59:01\n").unwrap();

    let store = FileMarkerStore::new(&path);
    assert_eq!(store.load().unwrap(), MarkerState::Present(marker()));
}

/// `clear` deletes the file and succeeds again when nothing is left.
#[test]
fn clear_removes_file_and_is_idempotent() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("cloudflare.txt");
    let store = FileMarkerStore::new(&path);
    store.save(&marker()).unwrap();

    store.clear().unwrap();
    assert!(!path.exists());

    store.clear().unwrap();
    assert_eq!(store.load().unwrap(), MarkerState::Absent);
}

/// Writing under a missing directory surfaces as `MarkerIoError::Write`.
#[test]
fn save_into_missing_directory_fails_with_write_error() {
    let dir = tempfile::tempdir().unwrap();
    let store = FileMarkerStore::new(dir.path().join("no-such-dir").join("cloudflare.txt"));

    assert_matches!(store.save(&marker()), Err(MarkerIoError::Write { .. }));
}

/// A directory at the marker path surfaces as `MarkerIoError::Read`.
#[test]
fn directory_in_place_of_file_fails_with_read_error() {
    let dir = tempfile::tempdir().unwrap();
    let store = FileMarkerStore::new(dir.path());

    assert_matches!(store.load(), Err(MarkerIoError::Read { .. }));
}
