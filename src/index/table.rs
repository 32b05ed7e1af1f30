//! Index implementation
//!
//! HashMap keyed by key hash. Not synchronized; the engine wraps it in a
//! RwLock.

use std::collections::HashMap;

use super::hash_key;
use crate::record::Header;

/// Key hash → header of the most recent live record
#[derive(Debug, Default, Clone)]
pub struct Index {
    entries: HashMap<u64, Header>,
}

impl Index {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or overwrite the entry for `key`
    pub fn insert(&mut self, key: &[u8], header: Header) -> Option<Header> {
        self.entries.insert(hash_key(key), header)
    }

    /// Drop the entry for `key`, returning it if present
    pub fn remove(&mut self, key: &[u8]) -> Option<Header> {
        self.entries.remove(&hash_key(key))
    }

    /// Header of the latest live record for `key`
    pub fn lookup(&self, key: &[u8]) -> Option<Header> {
        self.entries.get(&hash_key(key)).copied()
    }

    pub fn contains(&self, key: &[u8]) -> bool {
        self.entries.contains_key(&hash_key(key))
    }

    /// Replay a scanned record: tombstones remove, live records insert.
    ///
    /// Returns true when the record was a tombstone.
    pub fn apply(&mut self, key: &[u8], header: Header) -> bool {
        if header.is_tombstone() {
            self.remove(key);
            true
        } else {
            self.insert(key, header);
            false
        }
    }

    /// Number of live keys
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Body bytes (key + value) still referenced by the index. Everything
    /// else in the log is headers or dead records.
    pub fn live_bytes(&self) -> u64 {
        self.entries.values().map(Header::body_len).sum()
    }

    /// Iterate over all live headers in no particular order
    pub fn headers(&self) -> impl Iterator<Item = &Header> {
        self.entries.values()
    }
}
