//! Unsigned LEB128 varints bounded to 32 bits.

use std::io::{ErrorKind, Read};

use bytes::BufMut;

use super::DecodeError;

/// A u32 needs at most five 7-bit groups
pub const MAX_VARINT_LEN: usize = 5;

/// Number of bytes `value` occupies once encoded
pub fn uvarint_len(value: u32) -> usize {
    let mut len = 1;
    let mut v = value >> 7;
    while v != 0 {
        len += 1;
        v >>= 7;
    }
    len
}

/// Append `value` to `buf`, least-significant group first.
///
/// Returns the number of bytes written.
pub fn put_uvarint<B: BufMut>(buf: &mut B, value: u32) -> usize {
    let mut v = value;
    let mut written = 1;
    while v >= 0x80 {
        buf.put_u8((v as u8 & 0x7F) | 0x80);
        v >>= 7;
        written += 1;
    }
    buf.put_u8(v as u8);
    written
}

/// Read one varint. Running out of bytes at any point is an unexpected end:
/// callers only reach a varint after the record's meta byte was read.
pub fn read_uvarint<R: Read>(reader: &mut R, field: &'static str) -> Result<u32, DecodeError> {
    let mut value: u32 = 0;

    for i in 0..MAX_VARINT_LEN {
        let byte = match read_byte(reader)? {
            Some(b) => b,
            None => return Err(DecodeError::UnexpectedEof { field }),
        };

        // Fifth group may only carry the top four bits of a u32
        if i == MAX_VARINT_LEN - 1 && byte > 0x0F {
            return Err(DecodeError::VarintOverflow { field });
        }

        value |= u32::from(byte & 0x7F) << (7 * i);
        if byte & 0x80 == 0 {
            return Ok(value);
        }
    }

    Err(DecodeError::VarintOverflow { field })
}

/// Read a single byte, `None` at end of stream
pub(crate) fn read_byte<R: Read>(reader: &mut R) -> Result<Option<u8>, DecodeError> {
    let mut buf = [0u8; 1];
    loop {
        match reader.read(&mut buf) {
            Ok(0) => return Ok(None),
            Ok(_) => return Ok(Some(buf[0])),
            Err(e) if e.kind() == ErrorKind::Interrupted => continue,
            Err(e) => return Err(DecodeError::Io(e)),
        }
    }
}
