//! Backup sessions and their per-file entries

use std::fmt;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::ids::SessionId;
use crate::error::{CleanerError, CleanerResult};

/// Lifecycle of a backup session
///
/// Moves `in_progress -> {completed, failed, cancelled}` and never back.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionStatus {
    InProgress,
    Completed,
    Failed,
    Cancelled,
}

impl SessionStatus {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, SessionStatus::InProgress)
    }
}

impl fmt::Display for SessionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            SessionStatus::InProgress => "in_progress",
            SessionStatus::Completed => "completed",
            SessionStatus::Failed => "failed",
            SessionStatus::Cancelled => "cancelled",
        };
        f.write_str(s)
    }
}

/// One file's backup record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BackupEntry {
    pub original_path: PathBuf,
    /// Where the payload lives; absent when the copy never happened
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub backup_path: Option<PathBuf>,
    pub size: u64,
    pub backup_time: DateTime<Utc>,
    pub success: bool,
    /// Hex SHA-256 of the file content at backup time; empty on failure
    #[serde(default)]
    pub checksum: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl BackupEntry {
    pub fn succeeded(
        original_path: impl Into<PathBuf>,
        backup_path: impl Into<PathBuf>,
        size: u64,
        checksum: impl Into<String>,
    ) -> Self {
        Self {
            original_path: original_path.into(),
            backup_path: Some(backup_path.into()),
            size,
            backup_time: Utc::now(),
            success: true,
            checksum: checksum.into(),
            error: None,
        }
    }

    pub fn failed(original_path: impl Into<PathBuf>, size: u64, error: impl Into<String>) -> Self {
        Self {
            original_path: original_path.into(),
            backup_path: None,
            size,
            backup_time: Utc::now(),
            success: false,
            checksum: String::new(),
            error: Some(error.into()),
        }
    }
}

/// A single logical operation's backup set
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackupSession {
    pub session_id: SessionId,
    /// Free-form tag, e.g. "manual_deletion"
    pub operation: String,
    pub status: SessionStatus,
    pub start_time: DateTime<Utc>,
    #[serde(default)]
    pub end_time: Option<DateTime<Utc>>,
    pub total_files: usize,
    pub success_count: usize,
    pub failure_count: usize,
    pub total_size: u64,
    /// Bytes actually stored as payload
    pub backup_size: u64,
    #[serde(default)]
    pub entries: Vec<BackupEntry>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl BackupSession {
    pub fn new(operation: impl Into<String>) -> Self {
        Self {
            session_id: SessionId::new(),
            operation: operation.into(),
            status: SessionStatus::InProgress,
            start_time: Utc::now(),
            end_time: None,
            total_files: 0,
            success_count: 0,
            failure_count: 0,
            total_size: 0,
            backup_size: 0,
            entries: Vec::new(),
            error: None,
        }
    }

    /// Append an entry and update the running counters
    pub fn push_entry(&mut self, entry: BackupEntry) -> CleanerResult<()> {
        if self.status.is_terminal() {
            return Err(CleanerError::SessionClosed {
                session_id: self.session_id.to_string(),
                status: self.status.to_string(),
            });
        }

        self.total_files += 1;
        self.total_size += entry.size;
        if entry.success {
            self.success_count += 1;
            self.backup_size += entry.size;
        } else {
            self.failure_count += 1;
        }
        self.entries.push(entry);

        Ok(())
    }

    /// Move to a terminal state
    ///
    /// Returns `false` without touching anything when the session is already
    /// terminal.
    pub fn finish(&mut self, outcome: SessionStatus, error: Option<String>) -> bool {
        if self.status.is_terminal() || !outcome.is_terminal() {
            return false;
        }

        self.status = outcome;
        self.end_time = Some(Utc::now());
        if error.is_some() {
            self.error = error;
        }
        true
    }

    /// The most recent entry recorded for `path`
    pub fn entry_for(&self, path: &Path) -> Option<&BackupEntry> {
        self.entries.iter().rev().find(|e| e.original_path == path)
    }

    /// Paths that have a usable payload
    pub fn restorable_paths(&self) -> Vec<PathBuf> {
        let mut seen = std::collections::HashSet::new();
        self.entries
            .iter()
            .filter(|e| e.success)
            .filter(|e| seen.insert(e.original_path.clone()))
            .map(|e| e.original_path.clone())
            .collect()
    }

    /// `success_count + failure_count == total_files == entries.len()`
    pub fn counters_consistent(&self) -> bool {
        self.success_count + self.failure_count == self.total_files
            && self.total_files == self.entries.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_push_updates_counters() {
        let mut session = BackupSession::new("manual_deletion");
        session
            .push_entry(BackupEntry::succeeded("/tmp/a", "/b/a", 10, "abc"))
            .unwrap();
        session
            .push_entry(BackupEntry::failed("/tmp/b", 5, "permission denied"))
            .unwrap();

        assert_eq!(session.total_files, 2);
        assert_eq!(session.success_count, 1);
        assert_eq!(session.failure_count, 1);
        assert_eq!(session.total_size, 15);
        assert_eq!(session.backup_size, 10);
        assert!(session.counters_consistent());
    }

    #[test]
    fn test_finish_is_one_way() {
        let mut session = BackupSession::new("op");
        assert!(session.finish(SessionStatus::Completed, None));
        let end = session.end_time;

        assert!(!session.finish(SessionStatus::Failed, Some("late".into())));
        assert_eq!(session.status, SessionStatus::Completed);
        assert_eq!(session.end_time, end);
        assert!(session.error.is_none());
    }

    #[test]
    fn test_finish_rejects_non_terminal_outcome() {
        let mut session = BackupSession::new("op");
        assert!(!session.finish(SessionStatus::InProgress, None));
        assert_eq!(session.status, SessionStatus::InProgress);
    }

    #[test]
    fn test_closed_session_rejects_entries() {
        let mut session = BackupSession::new("op");
        session.finish(SessionStatus::Cancelled, None);

        let err = session
            .push_entry(BackupEntry::failed("/tmp/x", 0, "x"))
            .unwrap_err();
        assert!(matches!(err, CleanerError::SessionClosed { .. }));
        assert!(session.entries.is_empty());
    }

    #[test]
    fn test_status_wire_format() {
        let json = serde_json::to_string(&SessionStatus::InProgress).unwrap();
        assert_eq!(json, "\"in_progress\"");
    }

    #[test]
    fn test_restorable_paths_skip_failures_and_duplicates() {
        let mut session = BackupSession::new("op");
        session
            .push_entry(BackupEntry::succeeded("/tmp/a", "/b/1", 1, "x"))
            .unwrap();
        session
            .push_entry(BackupEntry::failed("/tmp/b", 1, "x"))
            .unwrap();
        session
            .push_entry(BackupEntry::succeeded("/tmp/a", "/b/2", 1, "y"))
            .unwrap();

        assert_eq!(session.restorable_paths(), vec![PathBuf::from("/tmp/a")]);
        assert_eq!(
            session.entry_for(Path::new("/tmp/a")).unwrap().checksum,
            "y"
        );
    }
}
