//! Core data models for the cache cleaner
//!
//! Scanned file records and their safety verdicts, backup sessions and
//! entries, deletion progress records, and restore outcomes.

pub mod file_record;
pub mod ids;
pub mod operation;
pub mod restore;
pub mod safety;
pub mod session;

pub use file_record::FileRecord;
pub use ids::{OperationId, SessionId};
pub use operation::{DeletionOperation, OperationPhase, OperationStatus};
pub use restore::{RestoreFailure, RestoreFailureKind, RestoreOptions, RestorePreview, RestoreResult};
pub use safety::{SafetyClassification, SafetyLevel};
pub use session::{BackupEntry, BackupSession, SessionStatus};
