//! Log Module
//!
//! The single append-only data file and everything that touches it.
//!
//! ## Responsibilities
//! - Append encoded records at the end of the file (writer)
//! - Sequentially scan records from the start (reader)
//! - Positional reads of a known record body (reader)
//! - Rebuild the index on open and verify/repair a log (recovery)
//!
//! ## File Layout
//! ```text
//! ┌──────────┬──────────┬──────────┬─────┬──────────┐
//! │ Record 1 │ Record 2 │ Record 3 │ ... │ Record N │
//! └──────────┴──────────┴──────────┴─────┴──────────┘
//! offset 0                                   end of file
//! ```
//! Records are never rewritten; a newer record for the same key shadows
//! older ones and a tombstone shadows everything before it.

mod reader;
mod recovery;
mod writer;

pub use reader::{key_matches_at, read_body_at, read_exact_at, LogReader, ScannedRecord};
pub use recovery::{LogRecovery, RecoveryStats};
pub use writer::{LogFile, LogWriter};
