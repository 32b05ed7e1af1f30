//! # logkv
//!
//! An embedded, single-file, log-structured key-value store:
//! - Values are appended to one log file, never rewritten in place
//! - An in-memory hash index points at each key's latest record
//! - The index is rebuilt on open by replaying the log
//! - Single-writer/multi-reader concurrency model
//!
//! ## Architecture Overview
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                         Engine                              │
//! │        get / set / delete / batch_set / find / close        │
//! └──────────────┬─────────────────────────────┬────────────────┘
//!                │                             │
//!                ▼                             ▼
//!   ┌───────────────────────┐       ┌─────────────────────┐
//!   │   Log (Mutex writer,  │       │   Index (RwLock)    │
//!   │   positional reader)  │       │  xxh64(key) → Header│
//!   └───────────┬───────────┘       └──────────▲──────────┘
//!               │                              │
//!               ▼                              │
//!   ┌───────────────────────┐   replay on open │
//!   │     Record Codec      │──────────────────┘
//!   │ meta | klen | vlen |  │
//!   │ key | value           │
//!   └───────────────────────┘
//! ```
//!
//! ## Example
//!
//! ```no_run
//! use logkv::Engine;
//!
//! let engine = Engine::open_path("/tmp/logkv/data.log")?;
//! engine.set(b"name", b"alice")?;
//! assert_eq!(engine.get(b"name")?, b"alice");
//! engine.delete(b"name")?;
//! engine.close()?;
//! # Ok::<(), logkv::LogError>(())
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod config;

pub mod record;
pub mod log;
pub mod index;
pub mod engine;

// =============================================================================
// Public API Re-exports
// =============================================================================

pub use error::{LogError, Result};
pub use config::{Config, RecoveryMode, SyncPolicy};
pub use engine::{Engine, EngineStats};

// =============================================================================
// Version Info
// =============================================================================

/// Current version of logkv
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
