//! Backup system for the cache cleaner
//!
//! # Architecture
//!
//! - `BackupStore`: creates, persists, and looks up backup sessions; owns the
//!   on-disk payload layout
//! - `RetentionManager`: ages out finished sessions by policy
//! - `checksum`: SHA-256 over payload bytes, computed during the copy and
//!   recomputed at verify and restore time
//!
//! # Session Format
//!
//! Each session is a JSON document at `backups/metadata/<session_id>.json`
//! holding its status, counters, and ordered entries. Payloads live under
//! `backups/files/<session_id>/`, one file per successful entry, named with a
//! random prefix plus the original file name. An entry's `backup_path` points
//! at its payload, which makes the payload addressable by
//! `(session_id, original_path)`.
//!
//! # Example
//!
//! ```rust,ignore
//! use cache_cleaner::backup::{BackupStore, RetentionManager};
//! use cache_cleaner::config::CleanerPaths;
//! use cache_cleaner::models::SessionStatus;
//!
//! let store = Arc::new(BackupStore::open(CleanerPaths::new()?)?);
//! let id = store.create_session("manual_deletion")?;
//! let entry = store.backup_file(&id, Path::new("/tmp/cache/blob"))?;
//! store.finalize_session(&id, SessionStatus::Completed, None)?;
//!
//! let report = store.verify_integrity(&id)?;
//! RetentionManager::new(store).cleanup_by_age(30)?;
//! ```

pub mod checksum;
mod retention;
mod store;

pub use checksum::ChecksumCheck;
pub use retention::{CleanupReport, RetentionManager};
pub use store::{verify_entry, BackupStore, BackupSummary, IntegrityReport, SweepOutcome};
