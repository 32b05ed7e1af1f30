//! Configuration for logkv
//!
//! Centralized configuration with sensible defaults.

use std::path::PathBuf;

use crate::error::{LogError, Result};

/// Main configuration for a logkv instance
#[derive(Debug, Clone)]
pub struct Config {
    // -------------------------------------------------------------------------
    // Storage Configuration
    // -------------------------------------------------------------------------
    /// Path of the single log file. Its parent directory is created on open.
    pub path: PathBuf,

    /// Permission bits for a newly created parent directory (Unix only)
    pub dir_mode: u32,

    /// Permission bits for a newly created log file (Unix only)
    pub file_mode: u32,

    // -------------------------------------------------------------------------
    // Durability Configuration
    // -------------------------------------------------------------------------
    /// When appended records are fsync'd
    pub sync_policy: SyncPolicy,

    // -------------------------------------------------------------------------
    // Recovery Configuration
    // -------------------------------------------------------------------------
    /// How the open-time scan treats a partial record at the end of the log
    pub recovery_mode: RecoveryMode,
}

/// Log sync policy
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncPolicy {
    /// fsync after every set/delete/batch (safest, slowest)
    EveryWrite,

    /// Never fsync on the write path; only `sync()` and `close()` flush
    Manual,
}

/// Open-time handling of a trailing partial record
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecoveryMode {
    /// Any decode error aborts the open
    Strict,

    /// A record cut short by the end of the file is treated as a crash
    /// mid-append and truncated away, together with every byte after the
    /// last complete record.
    ///
    /// A scan cannot tell a torn append from a corrupted length field: a
    /// damaged length anywhere in the log that points past the end of the
    /// file drops that record and everything after it. Check
    /// `RecoveryStats::partial_tail_bytes` (or run `logkv-check` first) when
    /// that matters. An oversized varint still aborts.
    TruncatePartialTail,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            path: PathBuf::from("./logkv_data/data.log"),
            dir_mode: 0o700,
            file_mode: 0o600,
            sync_policy: SyncPolicy::EveryWrite,
            recovery_mode: RecoveryMode::Strict,
        }
    }
}

impl Config {
    /// Create a new config builder
    pub fn builder() -> ConfigBuilder {
        ConfigBuilder::default()
    }

    /// Check the configuration before any file is touched
    pub fn validate(&self) -> Result<()> {
        if self.path.as_os_str().is_empty() {
            return Err(LogError::Config("log path must not be empty".to_string()));
        }
        if self.path.file_name().is_none() {
            return Err(LogError::Config(format!(
                "log path {} does not name a file",
                self.path.display()
            )));
        }
        if self.dir_mode > 0o777 || self.file_mode > 0o777 {
            return Err(LogError::Config(format!(
                "permission bits out of range: dir={:o} file={:o}",
                self.dir_mode, self.file_mode
            )));
        }
        Ok(())
    }
}

/// Builder for Config
#[derive(Default)]
pub struct ConfigBuilder {
    config: Config,
}

impl ConfigBuilder {
    /// Set the log file path
    pub fn path(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.path = path.into();
        self
    }

    /// Set the sync policy
    pub fn sync_policy(mut self, policy: SyncPolicy) -> Self {
        self.config.sync_policy = policy;
        self
    }

    /// Set the recovery mode
    pub fn recovery_mode(mut self, mode: RecoveryMode) -> Self {
        self.config.recovery_mode = mode;
        self
    }

    /// Set the mode used when creating the parent directory
    pub fn dir_mode(mut self, mode: u32) -> Self {
        self.config.dir_mode = mode;
        self
    }

    /// Set the mode used when creating the log file
    pub fn file_mode(mut self, mode: u32) -> Self {
        self.config.file_mode = mode;
        self
    }

    pub fn build(self) -> Config {
        self.config
    }
}
