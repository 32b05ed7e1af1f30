//! Tests for Log Recovery
//!
//! These tests verify:
//! - Recovery from an empty or clean log
//! - Tombstones remove keys during replay
//! - Strict mode refuses a partial tail
//! - Truncate mode cuts a partial tail and keeps earlier records
//! - Structural corruption is fatal in every mode
//! - Verify mode reports without modifying the file

use std::fs::{self, File, OpenOptions};
use std::io::Write;
use std::path::PathBuf;

use logkv::config::{RecoveryMode, SyncPolicy};
use logkv::log::{LogRecovery, LogWriter};
use logkv::LogError;
use tempfile::TempDir;

// =============================================================================
// Helper Functions
// =============================================================================

fn setup_temp_log() -> (TempDir, PathBuf) {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("test.log");
    (temp_dir, path)
}

/// Write entries using LogWriter (produces a well-formed log)
fn write_entries_via_writer(path: &PathBuf, count: usize) {
    let mut writer = LogWriter::open(path, 0o600, SyncPolicy::EveryWrite).unwrap();
    for i in 0..count {
        let key = format!("key{}", i).into_bytes();
        let value = format!("value{}", i).into_bytes();
        writer.append(&key, Some(value.as_slice())).unwrap();
    }
}

/// Append raw bytes directly to the file (for crafting corruption)
fn append_raw(path: &PathBuf, bytes: &[u8]) {
    let mut file = OpenOptions::new().append(true).open(path).unwrap();
    file.write_all(bytes).unwrap();
    file.sync_all().unwrap();
}

// =============================================================================
// Recover: Clean Log Tests
// =============================================================================

#[test]
fn test_recover_empty_file() {
    let (_temp, path) = setup_temp_log();
    File::create(&path).unwrap();

    let (index, stats) = LogRecovery::recover(&path, RecoveryMode::Strict).unwrap();

    assert!(index.is_empty());
    assert_eq!(stats.records_scanned, 0);
    assert_eq!(stats.valid_bytes, 0);
    assert!(stats.is_clean());
    assert!(!stats.was_truncated);
}

#[test]
fn test_recover_clean_log() {
    let (_temp, path) = setup_temp_log();
    write_entries_via_writer(&path, 50);

    let (index, stats) = LogRecovery::recover(&path, RecoveryMode::Strict).unwrap();

    assert_eq!(index.len(), 50);
    assert_eq!(stats.records_scanned, 50);
    assert_eq!(stats.live_keys, 50);
    assert_eq!(stats.tombstones, 0);
    assert_eq!(stats.valid_bytes, fs::metadata(&path).unwrap().len());
    assert!(stats.is_clean());
}

#[test]
fn test_recover_keeps_latest_offset() {
    let (_temp, path) = setup_temp_log();
    let mut writer = LogWriter::open(&path, 0o600, SyncPolicy::EveryWrite).unwrap();
    writer.append(b"key1", Some(b"bob".as_slice())).unwrap();
    let latest = writer.append(b"key1", Some(b"alice".as_slice())).unwrap();
    drop(writer);

    let (index, stats) = LogRecovery::recover(&path, RecoveryMode::Strict).unwrap();

    assert_eq!(stats.records_scanned, 2);
    assert_eq!(index.len(), 1);
    assert_eq!(index.lookup(b"key1"), Some(latest));
}

#[test]
fn test_recover_tombstone_removes_key() {
    let (_temp, path) = setup_temp_log();
    let mut writer = LogWriter::open(&path, 0o600, SyncPolicy::EveryWrite).unwrap();
    writer.append(b"key1", Some(b"bob".as_slice())).unwrap();
    writer.append(b"key2", Some(b"carol".as_slice())).unwrap();
    writer.append(b"key1", None).unwrap();
    drop(writer);

    let (index, stats) = LogRecovery::recover(&path, RecoveryMode::Strict).unwrap();

    assert_eq!(stats.records_scanned, 3);
    assert_eq!(stats.tombstones, 1);
    assert_eq!(stats.live_keys, 1);
    assert!(!index.contains(b"key1"));
    assert!(index.contains(b"key2"));
}

// =============================================================================
// Recover: Partial Tail Tests
// =============================================================================

#[test]
fn test_strict_mode_rejects_partial_tail() {
    let (_temp, path) = setup_temp_log();
    write_entries_via_writer(&path, 3);
    let clean_len = fs::metadata(&path).unwrap().len();
    append_raw(&path, &[0x00, 4, 5, b'k']);

    let err = LogRecovery::recover(&path, RecoveryMode::Strict).unwrap_err();

    match err {
        LogError::Corruption { offset, .. } => assert_eq!(offset, clean_len),
        other => panic!("expected corruption, got {:?}", other),
    }
    // Strict mode never touches the file
    assert_eq!(fs::metadata(&path).unwrap().len(), clean_len + 4);
}

#[test]
fn test_strict_mode_rejects_lone_meta_byte() {
    let (_temp, path) = setup_temp_log();
    write_entries_via_writer(&path, 1);
    append_raw(&path, &[0x00]);

    let err = LogRecovery::recover(&path, RecoveryMode::Strict).unwrap_err();

    assert!(err.is_corruption());
}

#[test]
fn test_truncate_mode_drops_partial_tail() {
    let (_temp, path) = setup_temp_log();
    write_entries_via_writer(&path, 3);
    let clean_len = fs::metadata(&path).unwrap().len();
    append_raw(&path, &[0x00, 4, 5, b'k']);

    let (index, stats) = LogRecovery::recover(&path, RecoveryMode::TruncatePartialTail).unwrap();

    assert_eq!(index.len(), 3);
    assert_eq!(stats.records_scanned, 3);
    assert_eq!(stats.partial_tail_bytes, 4);
    assert!(stats.was_truncated);
    assert_eq!(fs::metadata(&path).unwrap().len(), clean_len);

    // A second recovery finds a clean log
    let (_, stats) = LogRecovery::recover(&path, RecoveryMode::Strict).unwrap();
    assert!(stats.is_clean());
}

#[test]
fn test_varint_overflow_is_fatal_in_truncate_mode() {
    let (_temp, path) = setup_temp_log();
    write_entries_via_writer(&path, 2);
    append_raw(&path, &[0x00, 0xFF, 0xFF, 0xFF, 0xFF, 0x7F, 0x00]);

    let err = LogRecovery::recover(&path, RecoveryMode::TruncatePartialTail).unwrap_err();

    assert!(err.is_corruption());
}

// =============================================================================
// Verify / Repair Tests
// =============================================================================

#[test]
fn test_verify_reports_without_modifying() {
    let (_temp, path) = setup_temp_log();
    write_entries_via_writer(&path, 5);
    append_raw(&path, &[0x00, 2]);
    let len_before = fs::metadata(&path).unwrap().len();

    let stats = LogRecovery::verify(&path).unwrap();

    assert_eq!(stats.records_scanned, 5);
    assert_eq!(stats.partial_tail_bytes, 2);
    assert!(!stats.is_clean());
    assert!(!stats.was_truncated);
    assert_eq!(fs::metadata(&path).unwrap().len(), len_before);
}

#[test]
fn test_repair_truncates_partial_tail() {
    let (_temp, path) = setup_temp_log();
    write_entries_via_writer(&path, 5);
    let clean_len = fs::metadata(&path).unwrap().len();
    append_raw(&path, &[0x00, 2, 0, b'a']);

    let dropped = LogRecovery::repair(&path).unwrap();

    assert_eq!(dropped, 4);
    assert_eq!(fs::metadata(&path).unwrap().len(), clean_len);
}

#[test]
fn test_repair_clean_log_is_noop() {
    let (_temp, path) = setup_temp_log();
    write_entries_via_writer(&path, 5);
    let len_before = fs::metadata(&path).unwrap().len();

    assert_eq!(LogRecovery::repair(&path).unwrap(), 0);
    assert_eq!(fs::metadata(&path).unwrap().len(), len_before);
}

#[test]
fn test_recover_missing_file_is_io_error() {
    let (_temp, path) = setup_temp_log();

    let err = LogRecovery::recover(&path, RecoveryMode::Strict).unwrap_err();

    assert!(matches!(err, LogError::IoContext { .. }));
}

// =============================================================================
// Corrupted Length Tests
// =============================================================================

/// Records a/b/c, 5 bytes each, with the first key length overwritten so
/// that record 0 claims to run past the end of the file
fn write_log_with_bad_first_klen(path: &PathBuf) -> u64 {
    let mut writer = LogWriter::open(path, 0o600, SyncPolicy::EveryWrite).unwrap();
    for (key, value) in [(b"a", b"1"), (b"b", b"2"), (b"c", b"3")] {
        writer.append(key, Some(value.as_slice())).unwrap();
    }
    drop(writer);

    let mut bytes = fs::read(path).unwrap();
    assert_eq!(bytes.len(), 15);
    bytes[1] = 0x7F;
    fs::write(path, &bytes).unwrap();
    15
}

#[test]
fn test_strict_mode_rejects_corrupted_first_length() {
    let (_temp, path) = setup_temp_log();
    let len = write_log_with_bad_first_klen(&path);

    let err = LogRecovery::recover(&path, RecoveryMode::Strict).unwrap_err();

    assert!(matches!(err, LogError::Corruption { offset: 0, .. }));
    assert_eq!(fs::metadata(&path).unwrap().len(), len);
}

#[test]
fn test_truncate_mode_drops_everything_after_corrupted_length() {
    let (_temp, path) = setup_temp_log();
    let len = write_log_with_bad_first_klen(&path);

    // Verify reports the loss before anything is cut
    let stats = LogRecovery::verify(&path).unwrap();
    assert_eq!(stats.records_scanned, 0);
    assert_eq!(stats.partial_tail_bytes, len);

    let (index, stats) = LogRecovery::recover(&path, RecoveryMode::TruncatePartialTail).unwrap();

    assert!(index.is_empty());
    assert!(stats.was_truncated);
    assert_eq!(stats.partial_tail_bytes, len);
    assert_eq!(fs::metadata(&path).unwrap().len(), 0);
}
