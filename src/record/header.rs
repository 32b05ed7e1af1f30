//! Record header encoding and decoding

use std::io::Read;

use bytes::BufMut;

use super::varint::{put_uvarint, read_byte, read_uvarint, uvarint_len};
use super::{DecodeError, MAX_HEADER_SIZE, TOMBSTONE_FLAG};

/// Decoded record header plus the position of its key in the log
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Header {
    /// Flags byte; only bit 0 (tombstone) is meaningful
    pub meta: u8,
    /// Key length in bytes
    pub klen: u32,
    /// Value length in bytes (zero for tombstones)
    pub vlen: u32,
    /// Absolute file position of the first key byte. Never persisted,
    /// recomputed on every scan.
    pub offset: u64,
}

impl Header {
    /// Header for a live record
    pub fn live(klen: u32, vlen: u32) -> Self {
        Self {
            meta: 0,
            klen,
            vlen,
            offset: 0,
        }
    }

    /// Header for a tombstone record
    pub fn tombstone(klen: u32) -> Self {
        Self {
            meta: TOMBSTONE_FLAG,
            klen,
            vlen: 0,
            offset: 0,
        }
    }

    /// Whether bit 0 of meta is set. Reserved bits are ignored.
    pub fn is_tombstone(&self) -> bool {
        self.meta & TOMBSTONE_FLAG == TOMBSTONE_FLAG
    }

    /// Size of this header once encoded (3..=11)
    pub fn encoded_len(&self) -> usize {
        1 + uvarint_len(self.klen) + uvarint_len(self.vlen)
    }

    /// Bytes following the header on disk. Tombstones are written with
    /// `vlen == 0`, so this is the key length alone for them.
    pub fn body_len(&self) -> u64 {
        u64::from(self.klen) + u64::from(self.vlen)
    }

    /// Position just past this record's last byte
    pub fn end_offset(&self) -> u64 {
        self.offset + self.body_len()
    }
}

/// Encode a header into a fresh buffer
pub fn encode_header(meta: u8, klen: u32, vlen: u32) -> Vec<u8> {
    let mut buf = Vec::with_capacity(MAX_HEADER_SIZE);
    encode_header_into(&mut buf, meta, klen, vlen);
    buf
}

/// Append an encoded header to `buf`, returning its length
pub fn encode_header_into<B: BufMut>(buf: &mut B, meta: u8, klen: u32, vlen: u32) -> usize {
    buf.put_u8(meta);
    1 + put_uvarint(buf, klen) + put_uvarint(buf, vlen)
}

/// Decode the next header from `reader`.
///
/// Returns `Ok(None)` when the stream ends before any byte of a new record,
/// which is the normal end of the log. The returned header's `offset` is
/// left at zero for the caller to fill in.
pub fn decode_header<R: Read>(reader: &mut R) -> Result<Option<Header>, DecodeError> {
    let meta = match read_byte(reader)? {
        Some(b) => b,
        None => return Ok(None),
    };

    let klen = read_uvarint(reader, "key length")?;
    let vlen = read_uvarint(reader, "value length")?;

    Ok(Some(Header {
        meta,
        klen,
        vlen,
        offset: 0,
    }))
}
