//! Record Codec Module
//!
//! Binary framing for the records that make up the log.
//!
//! ## Responsibilities
//! - Encode a header (meta byte + varint key/value lengths)
//! - Decode headers and entries from any `Read` stream
//! - Distinguish a clean end of log from a truncated record
//!
//! ## Record Format
//! ```text
//! ┌──────────┬─────────────┬─────────────┬───────────┬─────────────┐
//! │ Meta (1) │ KLen (1..5) │ VLen (1..5) │ Key (var) │ Value (var) │
//! └──────────┴─────────────┴─────────────┴───────────┴─────────────┘
//! ```
//! - Meta bit 0 is the tombstone flag; the other bits are written as zero
//!   and ignored on read.
//! - KLen/VLen are unsigned LEB128 varints bounded to 32 bits.
//! - The value is not written for a tombstone.
//!
//! The log has no file header, magic or checksum: it is a raw
//! concatenation of records, oldest first.

mod entry;
mod header;
mod varint;

pub use entry::{decode_entry, encode_record, Entry};
pub use header::{decode_header, encode_header, encode_header_into, Header};
pub use varint::{put_uvarint, read_uvarint, uvarint_len, MAX_VARINT_LEN};

use thiserror::Error;

use crate::error::LogError;

// =============================================================================
// Shared Constants
// =============================================================================

/// Smallest encoded header: meta + two one-byte varints
pub const MIN_HEADER_SIZE: usize = 3;

/// Largest encoded header: meta + two five-byte varints
pub const MAX_HEADER_SIZE: usize = 1 + 2 * MAX_VARINT_LEN;

/// Meta bit marking a record as deleted
pub const TOMBSTONE_FLAG: u8 = 0x01;

// =============================================================================
// Decode Errors
// =============================================================================

/// Failure while decoding a single record from a stream
///
/// Carries no position; the log reader that owns the stream attaches the
/// byte offset with [`DecodeError::at`].
#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("unexpected end of log while reading {field}")]
    UnexpectedEof { field: &'static str },

    #[error("varint for {field} exceeds 32 bits")]
    VarintOverflow { field: &'static str },

    #[error("read failed: {0}")]
    Io(#[from] std::io::Error),
}

impl DecodeError {
    /// Convert into an engine error located at `offset`
    pub fn at(self, offset: u64) -> LogError {
        match self {
            DecodeError::Io(e) => LogError::io(format!("read at offset {}", offset), e),
            other => LogError::corruption(offset, other.to_string()),
        }
    }
}
