//! Record bodies: key and value bytes following a header

use std::io::{self, Read};

use bytes::BufMut;

use crate::error::{LogError, Result};

use super::header::{encode_header_into, Header};
use super::{DecodeError, TOMBSTONE_FLAG};

/// Upper bound on the buffer reserved before any body bytes arrive
const PREALLOC_LIMIT: u64 = 64 * 1024;

/// A decoded record body
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Entry {
    pub key: Vec<u8>,
    /// `None` for tombstones or when the value was skipped
    pub value: Option<Vec<u8>>,
    /// Body bytes consumed from the stream (key + value, header excluded)
    pub bytes_consumed: u64,
}

/// Read the body described by `header`.
///
/// The key is always read. The value is skipped without allocating when the
/// header is a tombstone or `want_value` is false.
pub fn decode_entry<R: Read>(
    reader: &mut R,
    header: &Header,
    want_value: bool,
) -> std::result::Result<Entry, DecodeError> {
    let key = read_field(reader, header.klen, "key")?;
    let mut consumed = u64::from(header.klen);

    let vlen = u64::from(header.vlen);
    let value = if header.is_tombstone() || !want_value {
        let skipped = io::copy(&mut reader.by_ref().take(vlen), &mut io::sink())?;
        if skipped != vlen {
            return Err(DecodeError::UnexpectedEof { field: "value" });
        }
        None
    } else {
        Some(read_field(reader, header.vlen, "value")?)
    };
    consumed += vlen;

    Ok(Entry {
        key,
        value,
        bytes_consumed: consumed,
    })
}

/// Append one complete record to `buf`. `value == None` writes a tombstone.
///
/// Returns the header length, i.e. the distance from the record start to
/// its first key byte.
pub fn encode_record<B: BufMut>(buf: &mut B, key: &[u8], value: Option<&[u8]>) -> Result<usize> {
    let klen = checked_len(key.len(), "key")?;

    let header_len = match value {
        Some(v) => {
            let vlen = checked_len(v.len(), "value")?;
            let n = encode_header_into(buf, 0, klen, vlen);
            buf.put_slice(key);
            buf.put_slice(v);
            n
        }
        None => {
            let n = encode_header_into(buf, TOMBSTONE_FLAG, klen, 0);
            buf.put_slice(key);
            n
        }
    };

    Ok(header_len)
}

/// Lengths are stored as 32-bit varints
pub(crate) fn checked_len(len: usize, what: &str) -> Result<u32> {
    u32::try_from(len).map_err(|_| {
        LogError::InvalidArgument(format!(
            "{} length {} exceeds the 32-bit limit",
            what, len
        ))
    })
}

/// Read exactly `len` bytes. Lengths come from disk, so the buffer grows
/// with the data actually read instead of trusting `len` up front.
fn read_field<R: Read>(
    reader: &mut R,
    len: u32,
    field: &'static str,
) -> std::result::Result<Vec<u8>, DecodeError> {
    let len = u64::from(len);
    let mut buf = Vec::with_capacity(len.min(PREALLOC_LIMIT) as usize);
    let read = reader.by_ref().take(len).read_to_end(&mut buf)?;
    if read as u64 != len {
        return Err(DecodeError::UnexpectedEof { field });
    }
    Ok(buf)
}
