//! Index Module
//!
//! In-memory map from key hash to the location of the key's latest record.
//!
//! ## Responsibilities
//! - O(1) lookups for `get`
//! - Incremental maintenance by `set`/`delete`
//! - Replaying scanned records during recovery
//!
//! ## Key Identity
//! Entries are keyed by the 64-bit xxHash of the raw key bytes; the key
//! itself is not kept in memory. Two keys with the same hash share a slot,
//! and the later write wins. The engine compares the on-disk key bytes on
//! every read so a collision surfaces as `KeyNotFound`, never as another
//! key's value.

mod table;

pub use table::Index;

use xxhash_rust::xxh64::xxh64;

/// Seed used for key hashing. Changing it changes nothing on disk, only
/// which keys collide in memory.
pub const HASH_SEED: u64 = 0;

/// Hash raw key bytes into an index slot
pub fn hash_key(key: &[u8]) -> u64 {
    xxh64(key, HASH_SEED)
}
