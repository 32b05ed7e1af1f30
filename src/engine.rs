//! Engine Module
//!
//! The storage engine that owns the log file and its index.
//!
//! ## Responsibilities
//! - Open the log and rebuild the index on startup
//! - Serialize appends so records never interleave
//! - Serve point reads concurrently through positional I/O
//! - Keep the index in step with the log

use std::fs::{self, File};
use std::path::Path;

use parking_lot::{Mutex, RwLock};
use tracing::{debug, info};

use crate::config::{Config, SyncPolicy};
use crate::error::{IoResultExt, LogError, Result};
use crate::index::Index;
use crate::log::{key_matches_at, read_body_at, LogReader, LogRecovery, LogWriter, RecoveryStats};

/// The main storage engine
///
/// ## Concurrency Model: Single-Writer / Multiple-Reader (SWMR)
///
/// - **Writes** (set/delete/batch_set): Serialized by the `writer` mutex
///   - The mutex is held across "find end → write → sync → update index"
///   - The index write lock is taken inside it, only for the update
///   - Lock order is always writer → index
///
/// - **Reads** (get): Take the index read lock for the lookup only
///   - The record is then read with a positional read on `reader`,
///     which never moves a shared cursor
///   - Bytes behind an index entry are never rewritten, so a read that
///     raced with an append still sees a complete record
pub struct Engine {
    /// Engine configuration
    config: Config,

    /// Append handle (exclusive access needed)
    writer: Mutex<LogWriter>,

    /// Read-only handle used for positional reads (shared)
    reader: File,

    /// Key hash → latest live record
    index: RwLock<Index>,

    /// What the open-time scan found
    recovery: RecoveryStats,
}

/// Point-in-time engine statistics
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineStats {
    /// Live keys in the index
    pub keys: u64,
    /// Size of the log file in bytes
    pub log_size: u64,
    /// Key and value bytes still referenced by the index
    pub live_bytes: u64,
}

impl Engine {
    /// Open or create an engine with the given config
    ///
    /// On startup:
    /// 1. Create the parent directory if it doesn't exist
    /// 2. Open/create the log file
    /// 3. Replay the log to rebuild the index
    /// 4. Ready to serve requests
    pub fn open(config: Config) -> Result<Self> {
        config.validate()?;
        let path = config.path.clone();

        // Step 1: Parent directory
        if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
            create_dir(dir, config.dir_mode)?;
        }

        // Step 2: Log file (created here if missing)
        let writer = LogWriter::open(&path, config.file_mode, config.sync_policy)?;

        // Step 3: Rebuild index
        let (index, recovery) = LogRecovery::recover(&path, config.recovery_mode)?;

        let reader = File::open(&path).context(|| format!("open file {}", path.display()))?;

        info!(
            path = %path.display(),
            records = recovery.records_scanned,
            tombstones = recovery.tombstones,
            keys = recovery.live_keys,
            bytes = recovery.valid_bytes,
            "opened log"
        );

        Ok(Self {
            config,
            writer: Mutex::new(writer),
            reader,
            index: RwLock::new(index),
            recovery,
        })
    }

    /// Open with a path (convenience method)
    ///
    /// Uses default config with the specified log file
    pub fn open_path(path: impl AsRef<Path>) -> Result<Self> {
        let config = Config::builder().path(path.as_ref()).build();
        Self::open(config)
    }

    /// Get the value stored for `key`
    ///
    /// Fails with `KeyNotFound` if the key was never set or has been deleted.
    pub fn get(&self, key: &[u8]) -> Result<Vec<u8>> {
        let header = self.index.read().lookup(key).ok_or(LogError::KeyNotFound)?;

        let mut buf = read_body_at(&self.reader, &header, true)?;

        let klen = header.klen as usize;
        if buf[..klen] != *key {
            // Another key with the same hash owns this slot
            debug!(offset = header.offset, "hash collision on get");
            return Err(LogError::KeyNotFound);
        }

        Ok(buf.split_off(klen))
    }

    /// Whether `key` currently has a value
    pub fn contains(&self, key: &[u8]) -> Result<bool> {
        match self.index.read().lookup(key) {
            Some(header) => key_matches_at(&self.reader, &header, key),
            None => Ok(false),
        }
    }

    /// Set `key` to `value`, replacing any previous value
    ///
    /// Steps (all under the writer mutex):
    /// 1. Append the record at the end of the log
    /// 2. fsync (per sync policy)
    /// 3. Point the index at the new record
    pub fn set(&self, key: &[u8], value: &[u8]) -> Result<()> {
        let mut writer = self.writer.lock();

        let header = writer.append(key, Some(value))?;
        self.index.write().insert(key, header);

        debug!(
            klen = header.klen,
            vlen = header.vlen,
            offset = header.offset,
            "set"
        );
        Ok(())
    }

    /// Delete `key`
    ///
    /// Fails with `KeyNotFound` if the key has no value. Otherwise appends
    /// a tombstone, fsyncs (per sync policy) and drops the index entry. The
    /// old value bytes stay in the log.
    pub fn delete(&self, key: &[u8]) -> Result<()> {
        let mut writer = self.writer.lock();

        // Looked up under the writer mutex so no append can slip in between
        let existing = self.index.read().lookup(key).ok_or(LogError::KeyNotFound)?;
        if !key_matches_at(&self.reader, &existing, key)? {
            return Err(LogError::KeyNotFound);
        }

        let header = writer.append(key, None)?;
        self.index.write().remove(key);

        debug!(klen = header.klen, offset = header.offset, "delete");
        Ok(())
    }

    /// Set many keys with a single append and a single fsync
    ///
    /// - Every item is validated before anything is written; a count
    ///   mismatch or an over-long key/value fails with `InvalidArgument`
    ///   naming the first bad item and leaves the log untouched.
    /// - If the write or fsync fails, the log is cut back to its previous
    ///   length and no index entry changes.
    /// - Only after the whole batch is written (and synced) does the index
    ///   see any of it. Items later in the batch win over earlier ones with
    ///   the same key.
    ///
    /// A crash in the middle of the write can still leave a prefix of the
    /// batch in the log.
    pub fn batch_set<K, V>(&self, keys: &[K], values: &[V]) -> Result<()>
    where
        K: AsRef<[u8]>,
        V: AsRef<[u8]>,
    {
        if keys.len() != values.len() {
            return Err(LogError::InvalidArgument(format!(
                "batch has {} keys but {} values",
                keys.len(),
                values.len()
            )));
        }
        if keys.is_empty() {
            return Ok(());
        }

        let mut items = Vec::with_capacity(keys.len());
        for (i, (key, value)) in keys.iter().zip(values).enumerate() {
            let (key, value) = (key.as_ref(), value.as_ref());
            if u32::try_from(key.len()).is_err() || u32::try_from(value.len()).is_err() {
                return Err(LogError::InvalidArgument(format!(
                    "batch item {} exceeds the 32-bit length limit",
                    i
                )));
            }
            items.push((key, value));
        }

        let mut writer = self.writer.lock();
        let headers = writer.append_batch(&items)?;

        {
            let mut index = self.index.write();
            for ((key, _), header) in items.iter().zip(&headers) {
                index.insert(key, *header);
            }
        }

        debug!(
            items = headers.len(),
            first_offset = ?headers.first().map(|h| h.offset),
            "batch set"
        );
        Ok(())
    }

    /// Find the latest value for `key` by scanning the whole log, without
    /// the index
    ///
    /// Slow; meant for diagnostics and for cross-checking the index.
    pub fn find(&self, key: &[u8]) -> Result<Vec<u8>> {
        // Only scan what was fully written when the call started
        let end = self.writer.lock().len()?;

        let file = File::open(self.path())
            .context(|| format!("open file {}", self.path().display()))?;
        let stream = std::io::Read::take(std::io::BufReader::new(file), end);

        let mut found = None;
        for record in LogReader::new(stream).with_values(true) {
            let record = record?;
            if record.key == key {
                found = if record.header.is_tombstone() {
                    None
                } else {
                    record.value
                };
            }
        }

        found.ok_or(LogError::KeyNotFound)
    }

    /// Force all appended records to durable storage
    pub fn sync(&self) -> Result<()> {
        self.writer.lock().sync()
    }

    /// Close the engine gracefully
    ///
    /// Syncs the log to disk, then releases the file handles
    pub fn close(self) -> Result<()> {
        self.writer.lock().sync()?;
        info!(path = %self.path().display(), "closed log");
        Ok(())
    }

    // =========================================================================
    // Accessors (for testing and debugging)
    // =========================================================================

    /// Number of live keys
    pub fn len(&self) -> usize {
        self.index.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.index.read().is_empty()
    }

    /// Path of the log file
    pub fn path(&self) -> &Path {
        &self.config.path
    }

    /// Current size of the log file in bytes
    pub fn log_size(&self) -> Result<u64> {
        self.writer.lock().len()
    }

    /// What the open-time scan found
    pub fn recovery_stats(&self) -> &RecoveryStats {
        &self.recovery
    }

    /// Snapshot of key count and space usage
    pub fn stats(&self) -> Result<EngineStats> {
        let writer = self.writer.lock();
        let index = self.index.read();
        Ok(EngineStats {
            keys: index.len() as u64,
            log_size: writer.len()?,
            live_bytes: index.live_bytes(),
        })
    }

    /// The configured sync policy
    pub fn sync_policy(&self) -> SyncPolicy {
        self.config.sync_policy
    }

    /// Get the configuration
    pub fn config(&self) -> &Config {
        &self.config
    }
}

/// Create `dir` and any missing parents
fn create_dir(dir: &Path, mode: u32) -> Result<()> {
    let mut builder = fs::DirBuilder::new();
    builder.recursive(true);

    #[cfg(unix)]
    {
        use std::os::unix::fs::DirBuilderExt;
        builder.mode(mode);
    }
    #[cfg(not(unix))]
    let _ = mode;

    builder
        .create(dir)
        .context(|| format!("create dir {}", dir.display()))
}
