//! Log Writer
//!
//! Appends records at the end of the log file.

use std::fs::{File, OpenOptions};
use std::io::{self, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use bytes::BytesMut;

use crate::config::SyncPolicy;
use crate::error::{IoResultExt, LogError, Result};
use crate::record::{encode_record, Header, MAX_HEADER_SIZE};

/// File operations the writer relies on beyond `Write + Seek`
pub trait LogFile: Write + Seek {
    /// Flush data and metadata to durable storage
    fn sync_all(&self) -> io::Result<()>;

    /// Truncate or extend the file to `len` bytes
    fn set_len(&self, len: u64) -> io::Result<()>;

    /// Current size in bytes
    fn len(&self) -> io::Result<u64>;
}

impl LogFile for File {
    fn sync_all(&self) -> io::Result<()> {
        File::sync_all(self)
    }

    fn set_len(&self, len: u64) -> io::Result<()> {
        File::set_len(self, len)
    }

    fn len(&self) -> io::Result<u64> {
        Ok(self.metadata()?.len())
    }
}

/// Appends records to the log file
///
/// Not internally synchronized: the engine keeps it behind a mutex so that
/// "find end → write → sync" runs as one unit.
///
/// If a failed append cannot be rolled back, the writer refuses every later
/// append: anything written after a torn record would be unreachable.
pub struct LogWriter<F = File> {
    /// Read/write handle positioned at the end before every append
    file: F,
    /// Path of the log (for error context)
    path: PathBuf,
    /// When to fsync
    sync_policy: SyncPolicy,
    /// Reused encode buffer
    buffer: BytesMut,
    /// Start of a torn append that could not be removed
    poisoned_at: Option<u64>,
}

impl LogWriter {
    /// Open or create the log file for appending
    ///
    /// `file_mode` applies only when the file is created (Unix).
    pub fn open(path: &Path, file_mode: u32, sync_policy: SyncPolicy) -> Result<Self> {
        let mut options = OpenOptions::new();
        options.read(true).write(true).create(true);

        #[cfg(unix)]
        {
            use std::os::unix::fs::OpenOptionsExt;
            options.mode(file_mode);
        }
        #[cfg(not(unix))]
        let _ = file_mode;

        let file = options
            .open(path)
            .context(|| format!("create file {}", path.display()))?;

        Ok(Self::with_file(file, path, sync_policy))
    }
}

impl<F: LogFile> LogWriter<F> {
    /// Append through an already opened handle
    pub fn with_file(file: F, path: impl Into<PathBuf>, sync_policy: SyncPolicy) -> Self {
        Self {
            file,
            path: path.into(),
            sync_policy,
            buffer: BytesMut::with_capacity(4096),
            poisoned_at: None,
        }
    }

    /// Append one record. `value == None` appends a tombstone.
    ///
    /// Returns the header of the written record with `offset` pointing at
    /// its first key byte.
    pub fn append(&mut self, key: &[u8], value: Option<&[u8]>) -> Result<Header> {
        self.buffer.clear();
        self.buffer
            .reserve(MAX_HEADER_SIZE + key.len() + value.map_or(0, <[u8]>::len));
        let header_len = encode_record(&mut self.buffer, key, value)?;

        let start = self.write_buffer()?;

        // Encoding already validated both lengths
        let mut header = match value {
            Some(v) => Header::live(key.len() as u32, v.len() as u32),
            None => Header::tombstone(key.len() as u32),
        };
        header.offset = start + header_len as u64;
        Ok(header)
    }

    /// Append many live records with a single write and at most one fsync.
    ///
    /// On failure the file is cut back to its length before the call, so a
    /// failed batch leaves no partial records behind.
    pub fn append_batch(&mut self, items: &[(&[u8], &[u8])]) -> Result<Vec<Header>> {
        self.buffer.clear();

        // (relative record start, header length) per item
        let mut layout = Vec::with_capacity(items.len());
        for (key, value) in items {
            let rel = self.buffer.len() as u64;
            let header_len = encode_record(&mut self.buffer, key, Some(*value))?;
            layout.push((rel, header_len as u64));
        }

        let start = self.write_buffer()?;

        let headers = items
            .iter()
            .zip(layout)
            .map(|((key, value), (rel, header_len))| {
                let mut header = Header::live(key.len() as u32, value.len() as u32);
                header.offset = start + rel + header_len;
                header
            })
            .collect();

        Ok(headers)
    }

    /// Force all appended bytes to durable storage
    pub fn sync(&mut self) -> Result<()> {
        self.file
            .sync_all()
            .context(|| format!("sync {}", self.path.display()))
    }

    /// Current size of the log in bytes
    pub fn len(&self) -> Result<u64> {
        self.file
            .len()
            .context(|| format!("stat {}", self.path.display()))
    }

    pub fn is_empty(&self) -> Result<bool> {
        Ok(self.len()? == 0)
    }

    /// Path of the log file
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// The configured sync policy
    pub fn sync_policy(&self) -> SyncPolicy {
        self.sync_policy
    }

    /// True once a failed append could not be rolled back
    pub fn is_poisoned(&self) -> bool {
        self.poisoned_at.is_some()
    }

    // =========================================================================
    // Private Helpers
    // =========================================================================

    /// Write the encode buffer at the end of the file and sync per policy.
    /// Returns the offset the buffer was written at.
    fn write_buffer(&mut self) -> Result<u64> {
        if let Some(offset) = self.poisoned_at {
            return Err(LogError::corruption(
                offset,
                "earlier append could not be rolled back; refusing further appends",
            ));
        }

        let start = self
            .file
            .seek(SeekFrom::End(0))
            .context(|| format!("seek to end of {}", self.path.display()))?;

        let mut written = self.file.write_all(&self.buffer);
        if written.is_ok() && self.sync_policy == SyncPolicy::EveryWrite {
            written = self.file.sync_all();
        }

        if let Err(e) = written {
            self.rollback(start);
            return Err(LogError::io(
                format!(
                    "append {} bytes at offset {} of {}",
                    self.buffer.len(),
                    start,
                    self.path.display()
                ),
                e,
            ));
        }

        Ok(start)
    }

    /// Cut a torn append off the file, poisoning the writer if that fails
    fn rollback(&mut self, len: u64) {
        if let Err(e) = self.file.set_len(len) {
            tracing::error!(
                path = %self.path.display(),
                offset = len,
                error = %e,
                "failed to roll back partial append"
            );
            self.poisoned_at = Some(len);
        }
    }
}
