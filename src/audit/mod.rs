//! Deletion history for the cache cleaner
//!
//! Every deletion operation records its start, per-file failures, any
//! safety checks that were skipped under force, and its completion in an
//! append-only history log.
//!
//! # Architecture
//!
//! - `DeletionLogEntry`: one record with timestamp, level, message, and
//!   optional operation, file, structured details, and error.
//! - `DeletionLog`: writes entries to `deletion_history.jsonl` using a
//!   line-delimited JSON format (JSONL) and reads them back.
//!
//! # Example
//!
//! ```rust,ignore
//! use cache_cleaner::audit::{DeletionLog, DeletionLogEntry};
//!
//! let history = DeletionLog::new(paths.deletion_log());
//! history.record(
//!     DeletionLogEntry::warning("Deleting without a successful backup")
//!         .with_operation("manual_deletion")
//!         .with_file(&path),
//! );
//! let recent = history.read_recent(50)?;
//! ```

mod entry;
mod logger;

pub use entry::{DeletionLogEntry, LogLevel};
pub use logger::DeletionLog;
