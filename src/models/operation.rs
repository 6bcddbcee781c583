//! In-memory progress record for a deletion operation

use std::fmt;
use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::ids::{OperationId, SessionId};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OperationStatus {
    Started,
    Running,
    Completed,
    Failed,
    Cancelled,
}

impl OperationStatus {
    /// Whether the operation will never change again
    pub fn is_finished(&self) -> bool {
        matches!(
            self,
            OperationStatus::Completed | OperationStatus::Failed | OperationStatus::Cancelled
        )
    }
}

impl fmt::Display for OperationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            OperationStatus::Started => "started",
            OperationStatus::Running => "running",
            OperationStatus::Completed => "completed",
            OperationStatus::Failed => "failed",
            OperationStatus::Cancelled => "cancelled",
        };
        f.write_str(s)
    }
}

/// Where in the validate/backup/delete pipeline an operation is
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OperationPhase {
    Validating,
    BackingUp,
    Deleting,
    Done,
}

/// Progress of one asynchronous deletion
///
/// Never persisted. Pollers always receive a full clone taken under the
/// record's lock, so they never see a half-applied update.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeletionOperation {
    pub operation_id: OperationId,
    pub operation: String,
    pub status: OperationStatus,
    pub phase: OperationPhase,
    /// 0-100, share of target files attempted
    pub progress: u8,
    /// Files deleted (or, in a dry run, that would be deleted)
    pub files_processed: usize,
    pub total_files: usize,
    /// Bytes deleted so far
    pub current_size: u64,
    pub message: String,
    pub session_id: Option<SessionId>,
    pub dry_run: bool,
    pub deleted_files: Vec<PathBuf>,
    pub failed_files: Vec<PathBuf>,
    /// Paths never attempted: blocked or unforced risky paths from
    /// validation, plus targets left over when the operation was cancelled
    pub skipped_files: Vec<PathBuf>,
    pub warnings: Vec<String>,
    pub started_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl DeletionOperation {
    pub fn new(operation: impl Into<String>, total_files: usize, dry_run: bool) -> Self {
        let now = Utc::now();
        Self {
            operation_id: OperationId::new(),
            operation: operation.into(),
            status: OperationStatus::Started,
            phase: OperationPhase::Validating,
            progress: 0,
            files_processed: 0,
            total_files,
            current_size: 0,
            message: "Deletion started".to_string(),
            session_id: None,
            dry_run,
            deleted_files: Vec::new(),
            failed_files: Vec::new(),
            skipped_files: Vec::new(),
            warnings: Vec::new(),
            started_at: now,
            updated_at: now,
        }
    }

    /// Recompute `progress` from the number of files attempted
    pub fn set_attempted(&mut self, attempted: usize) {
        self.progress = if self.total_files == 0 {
            100
        } else {
            ((attempted.min(self.total_files) * 100) / self.total_files) as u8
        };
    }

    /// Seconds since the operation started
    pub fn elapsed_secs(&self) -> i64 {
        (self.updated_at - self.started_at).num_seconds()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_operation() {
        let op = DeletionOperation::new("manual_deletion", 4, false);
        assert_eq!(op.status, OperationStatus::Started);
        assert_eq!(op.phase, OperationPhase::Validating);
        assert_eq!(op.progress, 0);
        assert!(!op.status.is_finished());
    }

    #[test]
    fn test_progress_percentage() {
        let mut op = DeletionOperation::new("op", 4, false);
        op.set_attempted(1);
        assert_eq!(op.progress, 25);
        op.set_attempted(4);
        assert_eq!(op.progress, 100);
        op.set_attempted(9);
        assert_eq!(op.progress, 100);
    }

    #[test]
    fn test_empty_operation_is_fully_progressed() {
        let mut op = DeletionOperation::new("op", 0, true);
        op.set_attempted(0);
        assert_eq!(op.progress, 100);
    }

    #[test]
    fn test_wire_names() {
        let op = DeletionOperation::new("op", 1, false);
        let value = serde_json::to_value(&op).unwrap();
        assert_eq!(value["status"], "started");
        assert_eq!(value["phase"], "validating");
        assert!(value.get("files_processed").is_some());
        assert!(value.get("current_size").is_some());
    }
}
