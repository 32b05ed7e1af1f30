//! Log Reader
//!
//! Sequential record scanning and positional reads.

use std::fs::File;
use std::io::{self, BufReader, Read};
use std::path::Path;

use crate::error::{IoResultExt, LogError, Result};
use crate::record::{decode_entry, decode_header, DecodeError, Header};

/// One record produced by a scan
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScannedRecord {
    /// Header with `offset` set to the first key byte
    pub header: Header,
    pub key: Vec<u8>,
    /// Only populated when the reader was asked for values
    pub value: Option<Vec<u8>>,
}

/// Scans records from the start of a log
///
/// Tracks how many bytes have been consumed so every record's position can
/// be derived without seeking.
pub struct LogReader<R> {
    inner: CountingReader<R>,
    want_values: bool,
    finished: bool,
}

impl LogReader<BufReader<File>> {
    /// Open a log file for scanning from byte 0
    pub fn open(path: &Path) -> Result<Self> {
        let file = File::open(path).context(|| format!("open file {}", path.display()))?;
        Ok(Self::new(BufReader::new(file)))
    }
}

impl<R: Read> LogReader<R> {
    /// Wrap a stream positioned at the first byte of a record
    pub fn new(inner: R) -> Self {
        Self {
            inner: CountingReader {
                inner,
                position: 0,
            },
            want_values: false,
            finished: false,
        }
    }

    /// Also read value bytes instead of skipping them
    pub fn with_values(mut self, want_values: bool) -> Self {
        self.want_values = want_values;
        self
    }

    /// Bytes consumed so far; after a clean record this is where the next
    /// record starts
    pub fn position(&self) -> u64 {
        self.inner.position
    }

    /// Read the next record.
    ///
    /// `Ok(None)` marks a clean end of log. Errors carry the offset of the
    /// record that failed to decode.
    pub fn next_record(&mut self) -> Result<Option<ScannedRecord>> {
        self.try_next().map_err(|(offset, e)| e.at(offset))
    }

    /// Like `next_record`, but keeps the raw decode error together with the
    /// offset of the failing record so callers can tell a truncated tail
    /// from other failures.
    pub fn try_next(&mut self) -> std::result::Result<Option<ScannedRecord>, (u64, DecodeError)> {
        let record_start = self.inner.position;

        let mut header = match decode_header(&mut self.inner) {
            Ok(Some(h)) => h,
            Ok(None) => return Ok(None),
            Err(e) => return Err((record_start, e)),
        };
        header.offset = self.inner.position;

        let entry = decode_entry(&mut self.inner, &header, self.want_values)
            .map_err(|e| (record_start, e))?;

        Ok(Some(ScannedRecord {
            header,
            key: entry.key,
            value: entry.value,
        }))
    }
}

impl<R: Read> Iterator for LogReader<R> {
    type Item = Result<ScannedRecord>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.finished {
            return None;
        }
        match self.next_record() {
            Ok(Some(record)) => Some(Ok(record)),
            Ok(None) => {
                self.finished = true;
                None
            }
            Err(e) => {
                self.finished = true;
                Some(Err(e))
            }
        }
    }
}

/// `Read` adapter counting consumed bytes
struct CountingReader<R> {
    inner: R,
    position: u64,
}

impl<R: Read> Read for CountingReader<R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let n = self.inner.read(buf)?;
        self.position += n as u64;
        Ok(n)
    }
}

/// Read the body of the record behind `header`: the key, followed by the
/// value when `with_value` is set.
pub fn read_body_at(file: &File, header: &Header, with_value: bool) -> Result<Vec<u8>> {
    let len = if with_value {
        header.body_len()
    } else {
        u64::from(header.klen)
    };
    let mut buf = vec![0u8; len as usize];

    read_exact_at(file, &mut buf, header.offset).map_err(|e| {
        if e.kind() == io::ErrorKind::UnexpectedEof {
            LogError::corruption(
                header.offset,
                format!("record body of {} bytes runs past end of log", len),
            )
        } else {
            LogError::io(format!("read {} bytes at offset {}", len, header.offset), e)
        }
    })?;

    Ok(buf)
}

/// Whether the record behind `header` was written for exactly `key`.
///
/// The index only stores key hashes, so two keys can share an entry.
pub fn key_matches_at(file: &File, header: &Header, key: &[u8]) -> Result<bool> {
    if header.klen as usize != key.len() {
        return Ok(false);
    }
    Ok(read_body_at(file, header, false)? == key)
}

/// Fill `buf` from `file` starting at `offset` without moving any shared
/// cursor, so concurrent readers never disturb each other.
#[cfg(unix)]
pub fn read_exact_at(file: &File, buf: &mut [u8], offset: u64) -> io::Result<()> {
    use std::os::unix::fs::FileExt;
    file.read_exact_at(buf, offset)
}

#[cfg(windows)]
pub fn read_exact_at(file: &File, mut buf: &mut [u8], mut offset: u64) -> io::Result<()> {
    use std::os::windows::fs::FileExt;
    while !buf.is_empty() {
        match file.seek_read(buf, offset) {
            Ok(0) => {
                return Err(io::Error::new(
                    io::ErrorKind::UnexpectedEof,
                    "failed to fill whole buffer",
                ))
            }
            Ok(n) => {
                buf = &mut buf[n..];
                offset += n as u64;
            }
            Err(e) if e.kind() == io::ErrorKind::Interrupted => {}
            Err(e) => return Err(e),
        }
    }
    Ok(())
}
