//! Log Recovery
//!
//! Rebuilds the index by replaying the log from byte 0.

use std::fs::OpenOptions;
use std::path::Path;

use crate::config::RecoveryMode;
use crate::error::{IoResultExt, LogError, Result};
use crate::index::Index;
use crate::record::DecodeError;

use super::{LogReader, ScannedRecord};

/// Rebuilds the index from a log file and checks log integrity
pub struct LogRecovery;

/// Result of a recovery or verification scan
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RecoveryStats {
    /// Records decoded successfully, tombstones included
    pub records_scanned: u64,

    /// Tombstones among the scanned records
    pub tombstones: u64,

    /// Live keys left in the index after replay
    pub live_keys: u64,

    /// End of the last complete record
    pub valid_bytes: u64,

    /// Bytes of a partial record found after `valid_bytes`
    pub partial_tail_bytes: u64,

    /// Whether the partial tail was cut off the file
    pub was_truncated: bool,
}

impl RecoveryStats {
    /// True when the log decodes cleanly to its last byte
    pub fn is_clean(&self) -> bool {
        self.partial_tail_bytes == 0
    }
}

impl LogRecovery {
    /// Replay every record of the log into a fresh index.
    ///
    /// Tombstones remove their key, so a key deleted before a close stays
    /// deleted after reopening.
    ///
    /// In `Strict` mode any decode error aborts. In `TruncatePartialTail`
    /// mode a record cut short by the end of the file is removed from disk
    /// and replay ends at the previous record. Everything from that record
    /// on is dropped, so a corrupted length early in the log loses every
    /// later record too. An oversized varint still aborts.
    pub fn recover(path: &Path, mode: RecoveryMode) -> Result<(Index, RecoveryStats)> {
        let mut index = Index::new();
        let mut stats = Self::scan(path, |record| {
            index.apply(&record.key, record.header);
        })?;
        stats.live_keys = index.len() as u64;

        if stats.partial_tail_bytes > 0 {
            match mode {
                RecoveryMode::Strict => {
                    return Err(LogError::corruption(
                        stats.valid_bytes,
                        format!(
                            "partial record of {} bytes at end of log",
                            stats.partial_tail_bytes
                        ),
                    ));
                }
                RecoveryMode::TruncatePartialTail => {
                    Self::truncate(path, stats.valid_bytes)?;
                    tracing::warn!(
                        path = %path.display(),
                        offset = stats.valid_bytes,
                        dropped = stats.partial_tail_bytes,
                        "truncated partial record at end of log"
                    );
                    stats.was_truncated = true;
                }
            }
        }

        Ok((index, stats))
    }

    /// Scan a log without modifying it.
    ///
    /// A partial final record is reported through `partial_tail_bytes`
    /// rather than as an error; structural corruption is an error.
    pub fn verify(path: &Path) -> Result<RecoveryStats> {
        let mut index = Index::new();
        let mut stats = Self::scan(path, |record| {
            index.apply(&record.key, record.header);
        })?;
        stats.live_keys = index.len() as u64;
        Ok(stats)
    }

    /// Cut a partial final record off the log. Returns the bytes removed.
    ///
    /// Same caveat as `TruncatePartialTail`: the cut starts at the first
    /// record that runs past the end of the file.
    pub fn repair(path: &Path) -> Result<u64> {
        let stats = Self::verify(path)?;
        if stats.partial_tail_bytes > 0 {
            Self::truncate(path, stats.valid_bytes)?;
        }
        Ok(stats.partial_tail_bytes)
    }

    // =========================================================================
    // Private Helpers
    // =========================================================================

    /// Decode every record, handing each to `on_record`.
    ///
    /// Stops quietly at a clean end of log or at a record truncated by the
    /// end of the file; any other error propagates.
    fn scan<F>(path: &Path, mut on_record: F) -> Result<RecoveryStats>
    where
        F: FnMut(&ScannedRecord),
    {
        let file_len = std::fs::metadata(path)
            .context(|| format!("stat {}", path.display()))?
            .len();
        let mut reader = LogReader::open(path)?;
        let mut stats = RecoveryStats::default();

        loop {
            match reader.try_next() {
                Ok(Some(record)) => {
                    stats.records_scanned += 1;
                    if record.header.is_tombstone() {
                        stats.tombstones += 1;
                    }
                    on_record(&record);
                    stats.valid_bytes = reader.position();
                }
                Ok(None) => break,
                Err((offset, DecodeError::UnexpectedEof { .. })) => {
                    stats.partial_tail_bytes = file_len.saturating_sub(offset);
                    break;
                }
                Err((offset, e)) => return Err(e.at(offset)),
            }
        }

        Ok(stats)
    }

    fn truncate(path: &Path, len: u64) -> Result<()> {
        let file = OpenOptions::new()
            .write(true)
            .open(path)
            .context(|| format!("open {} for truncation", path.display()))?;
        file.set_len(len)
            .context(|| format!("truncate {} to {} bytes", path.display(), len))?;
        file.sync_all()
            .context(|| format!("sync {}", path.display()))
    }
}
