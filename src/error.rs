//! Error types for logkv
//!
//! Provides a unified error type for all operations.

use thiserror::Error;

/// Result type alias using LogError
pub type Result<T> = std::result::Result<T, LogError>;

/// Unified error type for logkv operations
#[derive(Debug, Error)]
pub enum LogError {
    // -------------------------------------------------------------------------
    // I/O Errors
    // -------------------------------------------------------------------------
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Filesystem failure with the operation, path and/or offset that caused it
    #[error("IO error during {context}: {source}")]
    IoContext {
        context: String,
        #[source]
        source: std::io::Error,
    },

    // -------------------------------------------------------------------------
    // Log Format Errors
    // -------------------------------------------------------------------------
    #[error("Log corruption at offset {offset}: {reason}")]
    Corruption { offset: u64, reason: String },

    // -------------------------------------------------------------------------
    // Lookup Errors
    // -------------------------------------------------------------------------
    #[error("Key not found")]
    KeyNotFound,

    // -------------------------------------------------------------------------
    // Caller Errors
    // -------------------------------------------------------------------------
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    // -------------------------------------------------------------------------
    // Configuration Errors
    // -------------------------------------------------------------------------
    #[error("Configuration error: {0}")]
    Config(String),
}

impl LogError {
    /// Wrap an I/O error with a description of what was being done
    pub fn io(context: impl Into<String>, source: std::io::Error) -> Self {
        LogError::IoContext {
            context: context.into(),
            source,
        }
    }

    /// Build a corruption error anchored at a byte offset in the log
    pub fn corruption(offset: u64, reason: impl Into<String>) -> Self {
        LogError::Corruption {
            offset,
            reason: reason.into(),
        }
    }

    /// True for `KeyNotFound`
    pub fn is_not_found(&self) -> bool {
        matches!(self, LogError::KeyNotFound)
    }

    /// True for `Corruption`
    pub fn is_corruption(&self) -> bool {
        matches!(self, LogError::Corruption { .. })
    }
}

/// Attach context to `std::io::Result` values
pub(crate) trait IoResultExt<T> {
    fn context<F, S>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> S,
        S: Into<String>;
}

impl<T> IoResultExt<T> for std::io::Result<T> {
    fn context<F, S>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> S,
        S: Into<String>,
    {
        self.map_err(|e| LogError::io(f(), e))
    }
}
