//! Durable backup session store
//!
//! Every session is one metadata document plus one payload directory, both
//! keyed by the session id. Sessions are locked individually, so an operation
//! appending to its own session never blocks readers of other sessions.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use chrono::{DateTime, Utc};
use dashmap::{DashMap, DashSet};
use serde::Serialize;
use tracing::{debug, info, warn};
use uuid::Uuid;

use super::checksum::{copy_with_checksum, verify_file, ChecksumCheck};
use crate::config::paths::CleanerPaths;
use crate::error::{CleanerError, CleanerResult};
use crate::models::{BackupEntry, BackupSession, SessionId, SessionStatus};
use crate::storage::file_io::{is_temp_file, read_json_required, remove_path, write_json_atomic};

type SessionCell = Arc<RwLock<BackupSession>>;

/// Aggregate numbers over every stored session
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct BackupSummary {
    pub total_sessions: usize,
    pub total_files: usize,
    pub total_size: u64,
    pub oldest_session: Option<DateTime<Utc>>,
    pub newest_session: Option<DateTime<Utc>>,
}

/// Outcome of `verify_integrity`
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct IntegrityReport {
    pub valid: bool,
    pub checked: usize,
    pub errors: Vec<String>,
    /// Original paths whose payload failed verification
    pub failed_paths: Vec<PathBuf>,
}

/// Sessions deleted (and skipped) by an age sweep
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SweepOutcome {
    pub deleted: Vec<SessionId>,
    pub skipped_in_progress: Vec<SessionId>,
}

pub struct BackupStore {
    paths: CleanerPaths,
    sessions: DashMap<SessionId, SessionCell>,
    /// Sessions created by this process that are still being written to
    live: DashSet<SessionId>,
}

impl BackupStore {
    /// Open the store, loading every readable session document
    pub fn open(paths: CleanerPaths) -> CleanerResult<Self> {
        paths.ensure_directories()?;

        let store = Self {
            paths,
            sessions: DashMap::new(),
            live: DashSet::new(),
        };
        store.load()?;

        Ok(store)
    }

    fn load(&self) -> CleanerResult<()> {
        let dir = self.paths.metadata_dir();
        let entries = fs::read_dir(&dir).map_err(|e| {
            CleanerError::Storage(format!("Failed to read {}: {}", dir.display(), e))
        })?;

        for entry in entries {
            let path = match entry {
                Ok(entry) => entry.path(),
                Err(e) => {
                    warn!(error = %e, "Skipping unreadable metadata entry");
                    continue;
                }
            };

            if is_temp_file(&path) || path.extension().map_or(true, |ext| ext != "json") {
                continue;
            }

            match read_json_required::<BackupSession, _>(&path) {
                Ok(session) => {
                    if session.status == SessionStatus::InProgress {
                        warn!(
                            session_id = %session.session_id,
                            "Loaded a session that never finished; leaving it for inspection"
                        );
                    }
                    self.sessions
                        .insert(session.session_id, Arc::new(RwLock::new(session)));
                }
                Err(e) => warn!(path = %path.display(), error = %e, "Skipping corrupt session metadata"),
            }
        }

        debug!(count = self.sessions.len(), "Loaded backup sessions");
        Ok(())
    }

    pub fn paths(&self) -> &CleanerPaths {
        &self.paths
    }

    /// Allocate a new in-progress session and persist it
    pub fn create_session(&self, operation: &str) -> CleanerResult<SessionId> {
        let session = BackupSession::new(operation);
        let id = session.session_id;

        let files_dir = self.paths.session_files_dir(&id.to_string());
        fs::create_dir_all(&files_dir).map_err(|e| {
            CleanerError::Storage(format!(
                "Failed to create session directory {}: {}",
                files_dir.display(),
                e
            ))
        })?;
        if let Err(e) = self.persist(&session) {
            let _ = fs::remove_dir(&files_dir);
            return Err(e);
        }

        self.sessions.insert(id, Arc::new(RwLock::new(session)));
        self.live.insert(id);

        info!(session_id = %id, operation, "Created backup session");
        Ok(id)
    }

    /// Append a finished entry to an open session
    pub fn append_entry(&self, id: &SessionId, entry: BackupEntry) -> CleanerResult<()> {
        let cell = self.cell(id)?;
        let mut session = write_lock(&cell)?;

        // Memory only changes once the document is on disk
        let mut updated = session.clone();
        updated.push_entry(entry)?;
        self.persist(&updated)?;
        *session = updated;
        Ok(())
    }

    /// Copy `path` into the session's payload directory and record the entry
    ///
    /// Per-file problems come back as an entry with `success == false`; `Err`
    /// is reserved for failures of the store itself (unknown or closed
    /// session, unwritable metadata, missing payload directory).
    pub fn backup_file(&self, id: &SessionId, path: &Path) -> CleanerResult<BackupEntry> {
        {
            let cell = self.cell(id)?;
            let session = read_lock(&cell)?;
            if session.status.is_terminal() {
                return Err(CleanerError::SessionClosed {
                    session_id: id.to_string(),
                    status: session.status.to_string(),
                });
            }
        }

        let entry = self.copy_into_session(id, path)?;
        if let Some(error) = &entry.error {
            warn!(session_id = %id, path = %path.display(), error = %error, "Backup failed");
        } else {
            debug!(session_id = %id, path = %path.display(), size = entry.size, "Backed up file");
        }

        // A finalize can land between the status check and here
        if let Err(e) = self.append_entry(id, entry.clone()) {
            if let Some(payload) = &entry.backup_path {
                if let Err(cleanup) = fs::remove_file(payload) {
                    warn!(path = %payload.display(), error = %cleanup, "Failed to remove orphaned payload");
                }
            }
            return Err(e);
        }
        Ok(entry)
    }

    fn copy_into_session(&self, id: &SessionId, path: &Path) -> CleanerResult<BackupEntry> {
        let metadata = match fs::metadata(path) {
            Ok(m) => m,
            Err(e) => {
                return Ok(BackupEntry::failed(
                    path,
                    0,
                    format!("failed to get file info: {}", e),
                ))
            }
        };

        if metadata.is_dir() {
            return Ok(BackupEntry::failed(
                path,
                0,
                "directories cannot be backed up",
            ));
        }

        let files_dir = self.paths.session_files_dir(&id.to_string());
        if !files_dir.is_dir() {
            return Err(CleanerError::Storage(format!(
                "Payload directory missing for session {}: {}",
                id,
                files_dir.display()
            )));
        }

        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "file".to_string());
        let payload = files_dir.join(format!("{}_{}", Uuid::new_v4().simple(), name));

        let (copied, checksum) = match copy_with_checksum(path, &payload) {
            Ok(result) => result,
            Err(e) => {
                let _ = fs::remove_file(&payload);
                return Ok(BackupEntry::failed(
                    path,
                    metadata.len(),
                    format!("failed to copy file: {}", e),
                ));
            }
        };

        // Read the payload back; an entry is only successful if the stored
        // bytes hash to what was read from the source
        match verify_file(&payload, &checksum) {
            Ok(ChecksumCheck::Match) => Ok(BackupEntry::succeeded(path, payload, copied, checksum)),
            Ok(ChecksumCheck::Mismatch { expected, actual }) => {
                let _ = fs::remove_file(&payload);
                Ok(BackupEntry::failed(
                    path,
                    copied,
                    format!(
                        "checksum mismatch for {}: expected {}, got {}",
                        payload.display(),
                        expected,
                        actual
                    ),
                ))
            }
            Err(e) => {
                let _ = fs::remove_file(&payload);
                Ok(BackupEntry::failed(
                    path,
                    copied,
                    format!("failed to calculate checksum: {}", e),
                ))
            }
        }
    }

    /// Move a session to a terminal state
    ///
    /// Finalizing an already-terminal session changes nothing and returns
    /// the status it already had.
    pub fn finalize_session(
        &self,
        id: &SessionId,
        outcome: SessionStatus,
        error: Option<String>,
    ) -> CleanerResult<SessionStatus> {
        let cell = self.cell(id)?;
        let mut session = write_lock(&cell)?;

        if session.finish(outcome, error) {
            self.persist(&session)?;
            info!(
                session_id = %id,
                status = %session.status,
                files = session.total_files,
                failures = session.failure_count,
                "Finalized backup session"
            );
        } else {
            debug!(session_id = %id, status = %session.status, "Session already finalized");
        }
        self.live.remove(id);

        Ok(session.status)
    }

    pub fn get_session(&self, id: &SessionId) -> CleanerResult<BackupSession> {
        let cell = self.cell(id)?;
        let session = read_lock(&cell)?;
        Ok(session.clone())
    }

    /// All sessions, newest first
    pub fn list_sessions(&self) -> CleanerResult<Vec<BackupSession>> {
        let cells: Vec<SessionCell> = self.sessions.iter().map(|r| Arc::clone(r.value())).collect();

        let mut sessions = Vec::with_capacity(cells.len());
        for cell in cells {
            sessions.push(read_lock(&cell)?.clone());
        }
        sessions.sort_by(|a, b| b.start_time.cmp(&a.start_time));

        Ok(sessions)
    }

    pub fn summary(&self) -> CleanerResult<BackupSummary> {
        let sessions = self.list_sessions()?;

        Ok(BackupSummary {
            total_sessions: sessions.len(),
            total_files: sessions.iter().map(|s| s.total_files).sum(),
            total_size: sessions.iter().map(|s| s.total_size).sum(),
            oldest_session: sessions.iter().map(|s| s.start_time).min(),
            newest_session: sessions.iter().map(|s| s.start_time).max(),
        })
    }

    /// Recompute every successful entry's payload checksum
    pub fn verify_integrity(&self, id: &SessionId) -> CleanerResult<IntegrityReport> {
        let session = self.get_session(id)?;
        let mut report = IntegrityReport::default();

        for entry in session.entries.iter().filter(|e| e.success) {
            report.checked += 1;
            if let Err(error) = verify_entry(entry) {
                report.errors.push(error);
                report.failed_paths.push(entry.original_path.clone());
            }
        }
        report.valid = report.errors.is_empty();

        if !report.valid {
            warn!(session_id = %id, errors = report.errors.len(), "Backup integrity check failed");
        }
        Ok(report)
    }

    /// Remove a session's metadata and payload
    ///
    /// A session still being written by this process is refused; an
    /// `in_progress` session loaded from disk is a leftover and may go.
    pub fn delete_session(&self, id: &SessionId) -> CleanerResult<()> {
        let cell = self.cell(id)?;
        {
            let session = read_lock(&cell)?;
            if session.status == SessionStatus::InProgress && self.live.contains(id) {
                return Err(CleanerError::Validation(format!(
                    "Backup session is still in progress: {}",
                    id
                )));
            }
        }

        let key = id.to_string();
        let files_dir = self.paths.session_files_dir(&key);
        remove_path(&files_dir).map_err(|e| {
            CleanerError::Storage(format!(
                "Failed to remove session directory {}: {}",
                files_dir.display(),
                e
            ))
        })?;

        let metadata = self.paths.session_metadata_file(&key);
        remove_path(&metadata).map_err(|e| {
            CleanerError::Storage(format!(
                "Failed to remove session metadata {}: {}",
                metadata.display(),
                e
            ))
        })?;

        self.sessions.remove(id);
        info!(session_id = %id, "Deleted backup session");
        Ok(())
    }

    /// Delete every finished session that started before `cutoff`
    ///
    /// `in_progress` sessions are never touched, however old; past the
    /// cutoff they point at a stuck operation, not a stale backup.
    pub fn delete_started_before(&self, cutoff: DateTime<Utc>) -> CleanerResult<SweepOutcome> {
        let mut outcome = SweepOutcome::default();

        for session in self.list_sessions()? {
            if session.start_time >= cutoff {
                continue;
            }
            if session.status == SessionStatus::InProgress {
                warn!(
                    session_id = %session.session_id,
                    started = %session.start_time,
                    "Skipping in-progress session during cleanup"
                );
                outcome.skipped_in_progress.push(session.session_id);
                continue;
            }

            match self.delete_session(&session.session_id) {
                Ok(()) => outcome.deleted.push(session.session_id),
                // Raced with another delete
                Err(e) if e.is_not_found() => {}
                Err(e) => return Err(e),
            }
        }

        Ok(outcome)
    }

    /// Payload location for `(session_id, original_path)`
    pub fn payload_path(&self, id: &SessionId, original_path: &Path) -> CleanerResult<Option<PathBuf>> {
        let cell = self.cell(id)?;
        let session = read_lock(&cell)?;

        Ok(session
            .entries
            .iter()
            .rev()
            .find(|e| e.success && e.original_path == original_path)
            .and_then(|e| e.backup_path.clone()))
    }

    pub fn contains(&self, id: &SessionId) -> bool {
        self.sessions.contains_key(id)
    }

    fn cell(&self, id: &SessionId) -> CleanerResult<SessionCell> {
        self.sessions
            .get(id)
            .map(|r| Arc::clone(r.value()))
            .ok_or_else(|| CleanerError::session_not_found(id.to_string()))
    }

    fn persist(&self, session: &BackupSession) -> CleanerResult<()> {
        let path = self
            .paths
            .session_metadata_file(&session.session_id.to_string());
        write_json_atomic(path, session)
    }
}

/// Check one entry's payload against its recorded checksum
///
/// Returns a human-readable reason on failure.
pub fn verify_entry(entry: &BackupEntry) -> Result<(), String> {
    let payload = match &entry.backup_path {
        Some(p) => p,
        None => {
            return Err(format!(
                "backup file missing: no payload recorded for {}",
                entry.original_path.display()
            ))
        }
    };

    if !payload.exists() {
        return Err(format!("backup file missing: {}", payload.display()));
    }

    match verify_file(payload, &entry.checksum) {
        Ok(ChecksumCheck::Match) => Ok(()),
        Ok(ChecksumCheck::Mismatch { expected, actual }) => Err(format!(
            "checksum mismatch for {}: expected {}, got {}",
            payload.display(),
            expected,
            actual
        )),
        Err(e) => Err(format!(
            "failed to calculate checksum for {}: {}",
            payload.display(),
            e
        )),
    }
}

fn read_lock(cell: &SessionCell) -> CleanerResult<RwLockReadGuard<'_, BackupSession>> {
    cell.read()
        .map_err(|e| CleanerError::Storage(format!("Failed to acquire read lock: {}", e)))
}

fn write_lock(cell: &SessionCell) -> CleanerResult<RwLockWriteGuard<'_, BackupSession>> {
    cell.write()
        .map_err(|e| CleanerError::Storage(format!("Failed to acquire write lock: {}", e)))
}
