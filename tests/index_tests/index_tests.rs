//! Tests for the in-memory Index
//!
//! These tests verify:
//! - Key hashing is deterministic and raw-byte based
//! - Insert/lookup/remove semantics (last write wins)
//! - Replay semantics: tombstones remove keys
//! - Size accounting

use logkv::index::{hash_key, Index};
use logkv::record::Header;

// =============================================================================
// Helper Functions
// =============================================================================

fn header_at(klen: u32, vlen: u32, offset: u64) -> Header {
    let mut header = Header::live(klen, vlen);
    header.offset = offset;
    header
}

// =============================================================================
// Hashing Tests
// =============================================================================

#[test]
fn test_hash_is_deterministic() {
    assert_eq!(hash_key(b"key1"), hash_key(b"key1"));
    assert_ne!(hash_key(b"key1"), hash_key(b"key2"));
}

#[test]
fn test_hash_handles_empty_key() {
    // Empty keys are legal and must hash consistently
    assert_eq!(hash_key(b""), hash_key(&[]));
}

// =============================================================================
// Mutation Tests
// =============================================================================

#[test]
fn test_insert_and_lookup() {
    let mut index = Index::new();
    let header = header_at(4, 3, 3);

    assert!(index.insert(b"key1", header).is_none());
    assert_eq!(index.lookup(b"key1"), Some(header));
    assert!(index.contains(b"key1"));
    assert_eq!(index.len(), 1);
}

#[test]
fn test_lookup_missing_key() {
    let index = Index::new();

    assert_eq!(index.lookup(b"not exist"), None);
    assert!(!index.contains(b"not exist"));
    assert!(index.is_empty());
}

#[test]
fn test_insert_overwrites() {
    let mut index = Index::new();
    let first = header_at(4, 3, 3);
    let second = header_at(4, 5, 13);

    index.insert(b"key1", first);
    let previous = index.insert(b"key1", second);

    assert_eq!(previous, Some(first));
    assert_eq!(index.lookup(b"key1"), Some(second));
    assert_eq!(index.len(), 1);
}

#[test]
fn test_remove() {
    let mut index = Index::new();
    let header = header_at(4, 3, 3);
    index.insert(b"key1", header);

    assert_eq!(index.remove(b"key1"), Some(header));
    assert_eq!(index.remove(b"key1"), None);
    assert!(index.is_empty());
}

#[test]
fn test_clear() {
    let mut index = Index::new();
    index.insert(b"a", header_at(1, 1, 3));
    index.insert(b"b", header_at(1, 1, 8));

    index.clear();

    assert!(index.is_empty());
    assert_eq!(index.lookup(b"a"), None);
}

// =============================================================================
// Replay Tests
// =============================================================================

#[test]
fn test_apply_live_record_inserts() {
    let mut index = Index::new();

    let was_tombstone = index.apply(b"key1", header_at(4, 3, 3));

    assert!(!was_tombstone);
    assert!(index.contains(b"key1"));
}

#[test]
fn test_apply_tombstone_removes() {
    let mut index = Index::new();
    index.apply(b"key1", header_at(4, 3, 3));

    let mut tombstone = Header::tombstone(4);
    tombstone.offset = 13;
    let was_tombstone = index.apply(b"key1", tombstone);

    assert!(was_tombstone);
    assert!(!index.contains(b"key1"));
}

#[test]
fn test_apply_set_after_tombstone_revives() {
    let mut index = Index::new();
    index.apply(b"key1", header_at(4, 3, 3));
    index.apply(b"key1", Header::tombstone(4));
    index.apply(b"key1", header_at(4, 5, 20));

    assert_eq!(index.lookup(b"key1"), Some(header_at(4, 5, 20)));
}

// =============================================================================
// Accounting Tests
// =============================================================================

#[test]
fn test_live_bytes() {
    let mut index = Index::new();
    index.insert(b"key1", header_at(4, 3, 3));
    index.insert(b"k2", header_at(2, 10, 13));

    assert_eq!(index.live_bytes(), 7 + 12);
    assert_eq!(index.headers().count(), 2);
}
