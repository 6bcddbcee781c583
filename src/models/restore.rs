//! Restore previews and results

use std::fmt;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use super::ids::SessionId;

/// Why a single entry could not be (or would not be) restored
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RestoreFailureKind {
    /// Destination exists with different content and overwrite is off
    Conflict,
    /// Stored payload no longer matches its checksum, or the written copy didn't
    Integrity,
    /// Requested path has no entry in the session, or the payload is gone
    Missing,
    /// The entry recorded a failed backup; there is nothing to restore
    BackupFailed,
    /// Filesystem error while writing the destination
    Io,
}

impl fmt::Display for RestoreFailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            RestoreFailureKind::Conflict => "conflict",
            RestoreFailureKind::Integrity => "integrity",
            RestoreFailureKind::Missing => "missing",
            RestoreFailureKind::BackupFailed => "backup_failed",
            RestoreFailureKind::Io => "io",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RestoreFailure {
    pub path: PathBuf,
    pub kind: RestoreFailureKind,
    pub detail: String,
}

impl RestoreFailure {
    pub fn new(path: impl Into<PathBuf>, kind: RestoreFailureKind, detail: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            kind,
            detail: detail.into(),
        }
    }
}

/// What a restore would do, computed without touching the filesystem
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RestorePreview {
    pub session_id: Option<SessionId>,
    pub total_files: usize,
    pub success_count: usize,
    pub failure_count: usize,
    pub restored_files: Vec<PathBuf>,
    pub failed_files: Vec<PathBuf>,
    pub restored_size: u64,
    pub failures: Vec<RestoreFailure>,
}

impl RestorePreview {
    pub(crate) fn ok(&mut self, path: PathBuf, size: u64) {
        self.total_files += 1;
        self.success_count += 1;
        self.restored_size += size;
        self.restored_files.push(path);
    }

    pub(crate) fn fail(&mut self, failure: RestoreFailure) {
        self.total_files += 1;
        self.failure_count += 1;
        self.failed_files.push(failure.path.clone());
        self.failures.push(failure);
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RestoreOptions {
    /// Replace destinations that already exist with different content
    pub overwrite: bool,
    /// Snapshot files about to be overwritten into a `pre_restore` session
    pub backup_existing: bool,
}

/// Outcome of a restore that actually wrote files
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RestoreResult {
    pub session_id: Option<SessionId>,
    pub total_files: usize,
    pub success_count: usize,
    pub failure_count: usize,
    pub restored_files: Vec<PathBuf>,
    pub failed_files: Vec<PathBuf>,
    pub restored_size: u64,
    pub failures: Vec<RestoreFailure>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pre_restore_session_id: Option<SessionId>,
}

impl RestoreResult {
    pub(crate) fn ok(&mut self, path: PathBuf, size: u64) {
        self.total_files += 1;
        self.success_count += 1;
        self.restored_size += size;
        self.restored_files.push(path);
    }

    pub(crate) fn fail(&mut self, failure: RestoreFailure) {
        self.total_files += 1;
        self.failure_count += 1;
        self.failed_files.push(failure.path.clone());
        self.failures.push(failure);
    }

    /// Failures of one kind
    pub fn failures_of(&self, kind: RestoreFailureKind) -> impl Iterator<Item = &RestoreFailure> {
        self.failures.iter().filter(move |f| f.kind == kind)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_result_bookkeeping() {
        let mut result = RestoreResult::default();
        result.ok(PathBuf::from("/a"), 4);
        result.fail(RestoreFailure::new("/b", RestoreFailureKind::Conflict, "exists"));
        result.fail(RestoreFailure::new("/c", RestoreFailureKind::Integrity, "bad"));

        assert_eq!(result.total_files, 3);
        assert_eq!(result.success_count, 1);
        assert_eq!(result.failure_count, 2);
        assert_eq!(result.restored_size, 4);
        assert_eq!(result.failures_of(RestoreFailureKind::Integrity).count(), 1);
        assert_eq!(result.failed_files, vec![PathBuf::from("/b"), PathBuf::from("/c")]);
    }

    #[test]
    fn test_failure_kind_wire_name() {
        let json = serde_json::to_string(&RestoreFailureKind::BackupFailed).unwrap();
        assert_eq!(json, "\"backup_failed\"");
    }
}
