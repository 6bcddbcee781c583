//! Writes backup payloads back to their original locations

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::backup::checksum::{checksum_file, copy_with_checksum, verify_file, ChecksumCheck};
use crate::backup::{verify_entry, BackupStore};
use crate::error::CleanerResult;
use crate::models::{
    BackupEntry, BackupSession, RestoreFailure, RestoreFailureKind, RestoreOptions,
    RestorePreview, RestoreResult, SessionId, SessionStatus,
};

/// Operation tag for sessions holding files a restore overwrote
pub const PRE_RESTORE_OPERATION: &str = "pre_restore";

/// What one requested path resolves to inside a session
enum Target {
    Entry(BackupEntry),
    Missing(PathBuf),
}

/// State of a restore destination
enum Destination {
    Absent,
    Identical,
    Different,
    Blocked(String),
}

pub struct RestoreEngine {
    store: Arc<BackupStore>,
}

impl RestoreEngine {
    pub fn new(store: Arc<BackupStore>) -> Self {
        Self { store }
    }

    /// Report what `restore` would do without writing anything
    pub fn preview(&self, id: &SessionId, paths: &[PathBuf]) -> CleanerResult<RestorePreview> {
        let session = self.store.get_session(id)?;
        let mut preview = RestorePreview {
            session_id: Some(*id),
            ..RestorePreview::default()
        };

        for target in targets(&session, paths) {
            let entry = match restorable(target) {
                Ok(entry) => entry,
                Err(failure) => {
                    preview.fail(failure);
                    continue;
                }
            };

            if let Err(reason) = verify_entry(&entry) {
                preview.fail(RestoreFailure::new(
                    &entry.original_path,
                    RestoreFailureKind::Integrity,
                    reason,
                ));
                continue;
            }

            match destination(&entry) {
                Destination::Absent | Destination::Identical => {
                    preview.ok(entry.original_path, entry.size)
                }
                Destination::Different => preview.fail(RestoreFailure::new(
                    &entry.original_path,
                    RestoreFailureKind::Conflict,
                    "destination exists with different content",
                )),
                Destination::Blocked(reason) => preview.fail(RestoreFailure::new(
                    &entry.original_path,
                    RestoreFailureKind::Conflict,
                    reason,
                )),
            }
        }

        Ok(preview)
    }

    /// Restore the requested paths (all of the session's files when empty)
    ///
    /// Each entry succeeds or fails on its own; only an unknown session
    /// returns `Err`. A store failure while saving an overwritten file fails
    /// that entry and leaves its destination alone. The session itself is
    /// never modified, so every entry stays restorable afterwards.
    pub fn restore(
        &self,
        id: &SessionId,
        paths: &[PathBuf],
        options: RestoreOptions,
    ) -> CleanerResult<RestoreResult> {
        let session = self.store.get_session(id)?;
        let mut result = RestoreResult {
            session_id: Some(*id),
            ..RestoreResult::default()
        };
        let mut pre_restore = PreRestore::default();

        info!(
            session_id = %id,
            requested = paths.len(),
            overwrite = options.overwrite,
            backup_existing = options.backup_existing,
            "Starting restore"
        );

        for target in targets(&session, paths) {
            let entry = match restorable(target) {
                Ok(entry) => entry,
                Err(failure) => {
                    warn!(path = %failure.path.display(), kind = %failure.kind, "{}", failure.detail);
                    result.fail(failure);
                    continue;
                }
            };

            match self.restore_entry(&entry, options, &mut pre_restore) {
                Ok(()) => result.ok(entry.original_path, entry.size),
                Err(failure) => {
                    warn!(path = %failure.path.display(), kind = %failure.kind, "{}", failure.detail);
                    result.fail(failure);
                }
            }
        }

        result.pre_restore_session_id = pre_restore.finish(&self.store);

        info!(
            session_id = %id,
            restored = result.success_count,
            failed = result.failure_count,
            bytes = result.restored_size,
            "Restore finished"
        );

        Ok(result)
    }

    fn restore_entry(
        &self,
        entry: &BackupEntry,
        options: RestoreOptions,
        pre_restore: &mut PreRestore,
    ) -> Result<(), RestoreFailure> {
        let dest = &entry.original_path;
        let fail = |kind, detail: String| Err(RestoreFailure::new(dest, kind, detail));

        if let Err(reason) = verify_entry(entry) {
            return fail(RestoreFailureKind::Integrity, reason);
        }

        match destination(entry) {
            Destination::Identical => {
                debug!(path = %dest.display(), "Destination already matches backup");
                return Ok(());
            }
            Destination::Blocked(reason) => return fail(RestoreFailureKind::Conflict, reason),
            Destination::Different if !options.overwrite => {
                return fail(
                    RestoreFailureKind::Conflict,
                    format!("destination exists: {}", dest.display()),
                );
            }
            Destination::Different if options.backup_existing => {
                if let Err(reason) = pre_restore.snapshot(&self.store, dest) {
                    return fail(
                        RestoreFailureKind::Io,
                        format!("failed to back up existing file: {}", reason),
                    );
                }
            }
            Destination::Different | Destination::Absent => {}
        }

        // verify_entry guaranteed a payload path
        let Some(payload) = &entry.backup_path else {
            return fail(
                RestoreFailureKind::Missing,
                format!("backup file missing: {}", dest.display()),
            );
        };

        if let Err(e) = write_payload(payload, dest) {
            return fail(
                RestoreFailureKind::Io,
                format!("failed to restore {}: {}", dest.display(), e),
            );
        }

        match verify_file(dest, &entry.checksum) {
            Ok(ChecksumCheck::Match) => {
                debug!(path = %dest.display(), size = entry.size, "Restored file");
                Ok(())
            }
            Ok(ChecksumCheck::Mismatch { expected, actual }) => fail(
                RestoreFailureKind::Integrity,
                format!(
                    "checksum mismatch for {}: expected {}, got {}",
                    dest.display(),
                    expected,
                    actual
                ),
            ),
            Err(e) => fail(
                RestoreFailureKind::Integrity,
                format!("failed to calculate checksum for {}: {}", dest.display(), e),
            ),
        }
    }
}

/// The session collecting files a restore is about to overwrite
///
/// Created on the first overwrite. A store failure is remembered so the
/// session ends `failed` instead of staying `in_progress` forever.
#[derive(Default)]
struct PreRestore {
    session: Option<SessionId>,
    error: Option<String>,
}

impl PreRestore {
    /// Copy `dest` into the session; `Err` carries the reason it was not saved
    fn snapshot(&mut self, store: &BackupStore, dest: &Path) -> Result<(), String> {
        let session = match self.session {
            Some(id) => id,
            None => {
                let id = store
                    .create_session(PRE_RESTORE_OPERATION)
                    .map_err(|e| e.to_string())?;
                self.session = Some(id);
                id
            }
        };

        match store.backup_file(&session, dest) {
            Ok(entry) if entry.success => Ok(()),
            Ok(entry) => Err(entry.error.unwrap_or_else(|| "unknown error".to_string())),
            Err(e) => {
                let reason = e.to_string();
                self.error.get_or_insert_with(|| reason.clone());
                Err(reason)
            }
        }
    }

    fn finish(self, store: &BackupStore) -> Option<SessionId> {
        let id = self.session?;
        let outcome = if self.error.is_some() {
            SessionStatus::Failed
        } else {
            SessionStatus::Completed
        };
        if let Err(e) = store.finalize_session(&id, outcome, self.error) {
            warn!(session_id = %id, error = %e, "Failed to finalize pre-restore session");
        }
        Some(id)
    }
}

/// Resolve requested paths against a session
///
/// An empty request means every path in the session. A path backed up more
/// than once resolves to its latest successful entry.
fn targets(session: &BackupSession, paths: &[PathBuf]) -> Vec<Target> {
    let requested: Vec<PathBuf> = if paths.is_empty() {
        let mut seen = Vec::new();
        for entry in &session.entries {
            if !seen.contains(&entry.original_path) {
                seen.push(entry.original_path.clone());
            }
        }
        seen
    } else {
        crate::deletion::dedup(paths)
    };

    requested
        .into_iter()
        .map(|path| {
            let found = latest_entry(session, &path).cloned();
            match found {
                Some(entry) => Target::Entry(entry),
                None => Target::Missing(path),
            }
        })
        .collect()
}

fn latest_entry<'a>(session: &'a BackupSession, path: &Path) -> Option<&'a BackupEntry> {
    let mut matching = session
        .entries
        .iter()
        .rev()
        .filter(|e| e.original_path == path);
    let newest = matching.clone().next();
    matching.find(|e| e.success).or(newest)
}

fn restorable(target: Target) -> Result<BackupEntry, RestoreFailure> {
    let entry = match target {
        Target::Entry(entry) => entry,
        Target::Missing(path) => {
            let detail = format!("no backup entry for {}", path.display());
            return Err(RestoreFailure::new(path, RestoreFailureKind::Missing, detail));
        }
    };

    if !entry.success {
        let detail = entry
            .error
            .clone()
            .unwrap_or_else(|| "backup failed".to_string());
        return Err(RestoreFailure::new(
            entry.original_path,
            RestoreFailureKind::BackupFailed,
            detail,
        ));
    }

    match &entry.backup_path {
        Some(payload) if payload.is_file() => Ok(entry),
        Some(payload) => {
            let detail = format!("backup file missing: {}", payload.display());
            Err(RestoreFailure::new(entry.original_path, RestoreFailureKind::Missing, detail))
        }
        None => {
            let detail = format!("backup file missing: no payload recorded for {}", entry.original_path.display());
            Err(RestoreFailure::new(entry.original_path, RestoreFailureKind::Missing, detail))
        }
    }
}

fn destination(entry: &BackupEntry) -> Destination {
    let dest = &entry.original_path;

    match fs::symlink_metadata(dest) {
        Ok(m) if m.is_dir() => {
            return Destination::Blocked(format!("destination is a directory: {}", dest.display()))
        }
        Ok(_) => {
            return match checksum_file(dest) {
                Ok(sum) if sum == entry.checksum => Destination::Identical,
                _ => Destination::Different,
            }
        }
        Err(_) => {}
    }

    // Nearest existing ancestor must be a directory for create_dir_all to work
    let mut ancestor = dest.parent();
    while let Some(dir) = ancestor {
        if dir.exists() {
            return if dir.is_dir() {
                Destination::Absent
            } else {
                Destination::Blocked(format!(
                    "parent directory cannot be created: {} is not a directory",
                    dir.display()
                ))
            };
        }
        ancestor = dir.parent();
    }

    Destination::Absent
}

/// Copy `payload` over `dest` through a temporary sibling and a rename
fn write_payload(payload: &Path, dest: &Path) -> io::Result<()> {
    if let Some(parent) = dest.parent() {
        fs::create_dir_all(parent)?;
    }

    let name = dest
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    let temp = dest.with_file_name(format!(".{}.restore-{}.tmp", name, Uuid::new_v4().simple()));

    let written = copy_with_checksum(payload, &temp).and_then(|_| fs::rename(&temp, dest));
    if written.is_err() {
        let _ = fs::remove_file(&temp);
    }
    written
}
