//! Backup-then-delete orchestration
//!
//! `start` validates synchronously, registers an operation record, and hands
//! the work to a background thread; the caller only ever polls. Per file the
//! worker checks the cancel flag, backs the file up, then deletes it. A file
//! whose backup failed is kept unless the caller forced the deletion.

use std::fs::{self, File};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::thread;

use chrono::Utc;
use serde_json::json;
use tracing::{debug, error, info, warn};

use super::confirmation::ValidationResult;
use super::progress::{OperationHandle, OperationTracker};
use super::validation::{dedup, ValidationReport, Validator};
use crate::audit::{DeletionLog, DeletionLogEntry};
use crate::backup::BackupStore;
use crate::config::Settings;
use crate::error::{CleanerError, CleanerResult};
use crate::models::{
    DeletionOperation, OperationId, OperationPhase, OperationStatus, SessionId, SessionStatus,
};
use crate::safety::SafetyClassifier;
use crate::storage::remove_path;

/// What the caller asked to delete, and how
#[derive(Debug, Clone)]
pub struct DeletionRequest {
    pub paths: Vec<PathBuf>,
    pub operation: String,
    pub require_backup: bool,
    pub force: bool,
    pub dry_run: bool,
}

impl DeletionRequest {
    /// Backup required, no force, real run
    pub fn new(paths: Vec<PathBuf>, operation: impl Into<String>) -> Self {
        Self {
            paths,
            operation: operation.into(),
            require_backup: true,
            force: false,
            dry_run: false,
        }
    }
}

pub struct DeletionEngine {
    store: Arc<BackupStore>,
    tracker: Arc<OperationTracker>,
    validator: Validator,
    settings: Arc<Settings>,
    history: Arc<DeletionLog>,
}

impl DeletionEngine {
    pub fn new(
        store: Arc<BackupStore>,
        classifier: Arc<dyn SafetyClassifier>,
        settings: Arc<Settings>,
        history: Arc<DeletionLog>,
    ) -> Self {
        Self {
            tracker: Arc::new(OperationTracker::new(settings.max_finished_operations)),
            validator: Validator::new(Arc::clone(&settings), classifier),
            store,
            settings,
            history,
        }
    }

    /// Validate paths and build the confirmation document
    pub fn validate(&self, paths: &[PathBuf], operation: &str) -> ValidationResult {
        let requested = dedup(paths);
        let report = self.validator.validate(&requested);

        info!(
            operation,
            requested = requested.len(),
            deletable = report.deletable().len(),
            risky = report.risky().len(),
            blocked = report.blocked().len(),
            "Deletion validation completed"
        );

        ValidationResult::from_report(
            operation,
            &requested,
            &report,
            self.settings.confirmation_ttl_secs,
        )
    }

    /// Start an asynchronous deletion and return its operation id
    pub fn start(&self, request: DeletionRequest) -> CleanerResult<OperationId> {
        let requested = dedup(&request.paths);
        if requested.is_empty() {
            return Err(CleanerError::Validation(
                "No files specified for deletion".to_string(),
            ));
        }

        let report = self.validator.validate(&requested);
        self.launch(request, report)
    }

    /// Start a deletion the user confirmed
    ///
    /// Rejects the confirmation if it expired, or if the path set or its
    /// validation outcome changed since the user saw it.
    pub fn confirm(
        &self,
        confirmation: &ValidationResult,
        request: DeletionRequest,
    ) -> CleanerResult<OperationId> {
        let requested = dedup(&request.paths);
        if requested.is_empty() {
            return Err(CleanerError::Validation(
                "No files specified for deletion".to_string(),
            ));
        }

        let report = self.validator.validate(&requested);
        if let Err(e) = confirmation.check(&requested, &report, Utc::now()) {
            warn!(operation = %request.operation, reason = %e, "Rejected deletion confirmation");
            self.history.record(
                DeletionLogEntry::warning("Deletion confirmation rejected")
                    .with_operation(request.operation.as_str())
                    .with_details(json!({ "reason": e.to_string() })),
            );
            return Err(e);
        }

        self.launch(request, report)
    }

    pub fn progress(&self, id: &OperationId) -> CleanerResult<DeletionOperation> {
        self.tracker.get(id)
    }

    pub fn cancel(&self, id: &OperationId) -> CleanerResult<bool> {
        self.tracker.cancel(id)
    }

    pub fn clear(&self, id: &OperationId) -> CleanerResult<()> {
        self.tracker.clear(id)
    }

    pub fn operations(&self) -> Vec<DeletionOperation> {
        self.tracker.list()
    }

    fn launch(&self, request: DeletionRequest, report: ValidationReport) -> CleanerResult<OperationId> {
        let target_paths = report.targets(request.force);
        let targets: Vec<(PathBuf, u64)> = report
            .verdicts
            .iter()
            .filter(|v| target_paths.contains(&v.path))
            .map(|v| (v.path.clone(), v.size))
            .collect();

        let mut op = DeletionOperation::new(request.operation.as_str(), targets.len(), request.dry_run);
        op.warnings = report.warnings.clone();
        op.skipped_files = report
            .verdicts
            .iter()
            .map(|v| v.path.clone())
            .filter(|p| !targets.iter().any(|(t, _)| t == p))
            .collect();
        let id = op.operation_id;

        let handle = self.tracker.register(op);
        let worker = Worker {
            id,
            store: Arc::clone(&self.store),
            history: Arc::clone(&self.history),
            handle: Arc::clone(&handle),
            risky_forced: if request.force { report.risky() } else { Vec::new() },
            request,
            targets,
        };

        let spawned = thread::Builder::new()
            .name(format!("delete-{}", id.short()))
            .spawn(move || worker.run());

        if let Err(e) = spawned {
            let message = format!("Failed to start deletion worker: {}", e);
            handle.update(|op| {
                op.status = OperationStatus::Failed;
                op.phase = OperationPhase::Done;
                op.message = message.clone();
            })?;
            return Err(CleanerError::Io(message));
        }

        Ok(id)
    }
}

/// Everything one background deletion needs
struct Worker {
    id: OperationId,
    store: Arc<BackupStore>,
    history: Arc<DeletionLog>,
    handle: Arc<OperationHandle>,
    request: DeletionRequest,
    targets: Vec<(PathBuf, u64)>,
    risky_forced: Vec<PathBuf>,
}

impl Worker {
    fn entry(&self, entry: DeletionLogEntry) -> DeletionLogEntry {
        entry.with_operation(format!("{} ({})", self.request.operation, self.id))
    }

    fn update<F: FnOnce(&mut DeletionOperation)>(&self, f: F) {
        if let Err(e) = self.handle.update(f) {
            error!(operation_id = %self.id, error = %e, "Failed to update operation record");
        }
    }

    fn warn_loudly(&self, message: String, file: Option<&PathBuf>) {
        warn!(operation_id = %self.id, "{}", message);
        let mut entry = self.entry(DeletionLogEntry::warning(message.as_str()));
        if let Some(path) = file {
            entry = entry.with_file(path);
        }
        self.history.record(entry);
        self.update(|op| op.warnings.push(message));
    }

    fn run(self) {
        let request = &self.request;
        info!(
            operation_id = %self.id,
            operation = %request.operation,
            files = self.targets.len(),
            force = request.force,
            dry_run = request.dry_run,
            require_backup = request.require_backup,
            "Starting deletion operation"
        );
        self.history.record(
            self.entry(DeletionLogEntry::info("Starting deletion operation")).with_details(json!({
                "file_count": self.targets.len(),
                "force": request.force,
                "dry_run": request.dry_run,
                "require_backup": request.require_backup,
            })),
        );

        for path in &self.risky_forced {
            self.warn_loudly(
                format!("Force delete: safety classification skipped for risky file {}", path.display()),
                Some(path),
            );
        }
        if !request.require_backup && !request.dry_run {
            self.warn_loudly(
                "Backup disabled: files will be deleted without a restorable copy".to_string(),
                None,
            );
        }

        if request.dry_run {
            self.run_dry();
            return;
        }

        let session = if request.require_backup {
            match self.store.create_session(&request.operation) {
                Ok(id) => Some(id),
                Err(e) => {
                    self.fail(None, format!("Failed to create backup session: {}", e));
                    return;
                }
            }
        } else {
            None
        };

        self.update(|op| {
            op.status = OperationStatus::Running;
            op.phase = if session.is_some() {
                OperationPhase::BackingUp
            } else {
                OperationPhase::Deleting
            };
            op.session_id = session;
            op.message = "Processing files...".to_string();
        });

        let total = self.targets.len();
        let mut cancelled = false;

        for (index, (path, size)) in self.targets.iter().enumerate() {
            if self.handle.is_cancelled() {
                cancelled = true;
                let remaining: Vec<PathBuf> =
                    self.targets[index..].iter().map(|(p, _)| p.clone()).collect();
                self.update(|op| op.skipped_files.extend(remaining));
                break;
            }

            if let Some(session_id) = &session {
                self.update(|op| {
                    op.phase = OperationPhase::BackingUp;
                    op.message = format!("Backing up file {} of {}", index + 1, total);
                });

                match self.store.backup_file(session_id, path) {
                    Ok(entry) if entry.success => {}
                    Ok(entry) => {
                        let reason = entry.error.unwrap_or_else(|| "unknown error".to_string());
                        if request.force {
                            self.warn_loudly(
                                format!(
                                    "Force delete: deleting {} without a successful backup ({})",
                                    path.display(),
                                    reason
                                ),
                                Some(path),
                            );
                        } else {
                            warn!(path = %path.display(), reason = %reason, "Skipped deletion due to backup failure");
                            self.history.record(
                                self.entry(DeletionLogEntry::warning("Skipped deletion due to backup failure"))
                                    .with_file(path)
                                    .with_details(json!({ "reason": reason })),
                            );
                            self.update(|op| {
                                op.failed_files.push(path.clone());
                                op.set_attempted(index + 1);
                            });
                            continue;
                        }
                    }
                    Err(e) => {
                        self.fail(session, format!("Backup store failure: {}", e));
                        return;
                    }
                }
            }

            self.update(|op| {
                op.phase = OperationPhase::Deleting;
                op.message = format!("Deleting file {} of {}", index + 1, total);
            });

            match remove_path(path) {
                Ok(()) => {
                    debug!(path = %path.display(), size, "Deleted file");
                    self.update(|op| {
                        op.deleted_files.push(path.clone());
                        op.files_processed += 1;
                        op.current_size += size;
                        op.set_attempted(index + 1);
                    });
                }
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "Failed to delete file");
                    self.history.record(
                        self.entry(DeletionLogEntry::error("Failed to delete file", e.to_string()))
                            .with_file(path),
                    );
                    self.update(|op| {
                        op.failed_files.push(path.clone());
                        op.set_attempted(index + 1);
                    });
                }
            }
        }

        // Cancellation leaves the session completed with the entries it has
        if let Some(session_id) = &session {
            if let Err(e) = self
                .store
                .finalize_session(session_id, SessionStatus::Completed, None)
            {
                warn!(session_id = %session_id, error = %e, "Failed to finalize backup session");
            }
        }

        self.finish(cancelled);
    }

    fn run_dry(&self) {
        let total = self.targets.len();
        self.update(|op| {
            op.status = OperationStatus::Running;
            op.phase = OperationPhase::BackingUp;
            op.message = "Dry run: checking files...".to_string();
        });

        let mut cancelled = false;
        for (index, (path, size)) in self.targets.iter().enumerate() {
            if self.handle.is_cancelled() {
                cancelled = true;
                let remaining: Vec<PathBuf> =
                    self.targets[index..].iter().map(|(p, _)| p.clone()).collect();
                self.update(|op| op.skipped_files.extend(remaining));
                break;
            }

            // A real run keeps files it cannot back up unless forced
            if self.request.require_backup {
                if let Some(reason) = backup_blocker(path) {
                    let keep = !self.request.force;
                    self.update(|op| {
                        op.warnings
                            .push(format!("Backup would fail for {}: {}", path.display(), reason));
                        if keep {
                            op.failed_files.push(path.clone());
                            op.set_attempted(index + 1);
                        }
                    });
                    if keep {
                        continue;
                    }
                }
            }

            self.update(|op| {
                op.deleted_files.push(path.clone());
                op.files_processed += 1;
                op.current_size += size;
                op.set_attempted(index + 1);
                op.message = format!("Dry run: would delete file {} of {}", index + 1, total);
            });
        }

        self.finish(cancelled);
    }

    fn finish(&self, cancelled: bool) {
        let (deleted, failed, bytes) = match self.handle.snapshot() {
            Ok(op) => (op.files_processed, op.failed_files.len(), op.current_size),
            Err(_) => (0, 0, 0),
        };

        info!(
            operation_id = %self.id,
            deleted,
            failed,
            bytes,
            cancelled,
            "Deletion operation finished"
        );

        // History goes first: pollers may exit as soon as they see a final status
        self.history.record(
            self.entry(DeletionLogEntry::info(if cancelled {
                "Deletion cancelled by user"
            } else {
                "Deletion operation completed"
            }))
            .with_details(json!({
                "deleted_count": deleted,
                "failed_count": failed,
                "deleted_size": bytes,
                "dry_run": self.request.dry_run,
            })),
        );

        self.update(|op| {
            op.phase = OperationPhase::Done;
            if !cancelled {
                op.progress = 100;
            }
            op.status = if cancelled {
                OperationStatus::Cancelled
            } else {
                OperationStatus::Completed
            };
            let verb = if op.dry_run { "Would delete" } else { "Deleted" };
            op.message = if cancelled {
                format!(
                    "Cancelled after {} of {} files",
                    op.files_processed, op.total_files
                )
            } else {
                format!(
                    "{} {} of {} files ({} failed)",
                    verb,
                    op.files_processed,
                    op.total_files,
                    op.failed_files.len()
                )
            };
        });
    }

    fn fail(&self, session: Option<SessionId>, message: String) {
        error!(operation_id = %self.id, "{}", message);
        self.history.record(self.entry(DeletionLogEntry::error(
            "Deletion operation failed",
            message.as_str(),
        )));

        if let Some(session_id) = session {
            if let Err(e) =
                self.store
                    .finalize_session(&session_id, SessionStatus::Failed, Some(message.clone()))
            {
                warn!(session_id = %session_id, error = %e, "Failed to finalize backup session");
            }
        }

        self.update(|op| {
            op.status = OperationStatus::Failed;
            op.phase = OperationPhase::Done;
            op.message = message;
        });
    }
}

/// Why backing up `path` would fail, if it would
fn backup_blocker(path: &Path) -> Option<String> {
    match fs::metadata(path) {
        Ok(m) if m.is_dir() => Some("directories cannot be backed up".to_string()),
        Ok(_) => File::open(path).err().map(|e| e.to_string()),
        Err(e) => Some(e.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backup::checksum::checksum_bytes;
    use crate::config::CleanerPaths;
    use crate::models::{FileRecord, SafetyClassification, SafetyLevel};
    use std::time::{Duration, Instant};
    use tempfile::TempDir;

    struct NameClassifier;

    impl SafetyClassifier for NameClassifier {
        fn classify(&self, file: &FileRecord) -> SafetyClassification {
            if file.name.contains("risky") {
                SafetyClassification::new(SafetyLevel::Risky, 80, "looks important", vec![])
            } else {
                SafetyClassification::new(SafetyLevel::Safe, 90, "cache", vec![])
            }
        }
    }

    struct Fixture {
        temp: TempDir,
        store: Arc<BackupStore>,
        engine: DeletionEngine,
        history: Arc<DeletionLog>,
    }

    fn fixture() -> Fixture {
        let temp = TempDir::new().unwrap();
        let paths = CleanerPaths::with_base_dir(temp.path().join("data"));
        let store = Arc::new(BackupStore::open(paths.clone()).unwrap());
        let settings = Arc::new(Settings {
            protected_paths: Vec::new(),
            detect_open_files: false,
            ..Settings::default()
        });
        let history = Arc::new(DeletionLog::new(paths.deletion_log()));
        let engine = DeletionEngine::new(
            Arc::clone(&store),
            Arc::new(NameClassifier),
            settings,
            Arc::clone(&history),
        );
        fs::create_dir_all(temp.path().join("cache")).unwrap();
        Fixture {
            temp,
            store,
            engine,
            history,
        }
    }

    impl Fixture {
        fn file(&self, name: &str, content: &str) -> PathBuf {
            let path = self.temp.path().join("cache").join(name);
            fs::write(&path, content).unwrap();
            path
        }

        fn wait(&self, id: &OperationId) -> DeletionOperation {
            let deadline = Instant::now() + Duration::from_secs(10);
            loop {
                let op = self.engine.progress(id).unwrap();
                if op.status.is_finished() {
                    return op;
                }
                assert!(Instant::now() < deadline, "operation did not finish");
                thread::sleep(Duration::from_millis(10));
            }
        }
    }

    #[test]
    fn test_backup_precedes_delete() {
        let fx = fixture();
        let a = fx.file("a.bin", "alpha");
        let b = fx.file("b.bin", "beta");

        let id = fx
            .engine
            .start(DeletionRequest::new(vec![a.clone(), b.clone()], "cache_cleanup"))
            .unwrap();
        let op = fx.wait(&id);

        assert_eq!(op.status, OperationStatus::Completed);
        assert_eq!(op.files_processed, 2);
        assert_eq!(op.current_size, 9);
        assert_eq!(op.progress, 100);
        assert!(!a.exists());
        assert!(!b.exists());

        let session = fx.store.get_session(&op.session_id.unwrap()).unwrap();
        assert_eq!(session.status, SessionStatus::Completed);
        assert_eq!(session.success_count, 2);
        assert_eq!(session.entry_for(&a).unwrap().checksum, checksum_bytes(b"alpha"));
        assert_eq!(session.entry_for(&b).unwrap().checksum, checksum_bytes(b"beta"));
    }

    #[test]
    fn test_failed_backup_keeps_file() {
        let fx = fixture();
        let good = fx.file("good.bin", "data");
        let dir = fx.temp.path().join("cache").join("subdir");
        fs::create_dir_all(&dir).unwrap();

        let id = fx
            .engine
            .start(DeletionRequest::new(vec![good.clone(), dir.clone()], "manual_deletion"))
            .unwrap();
        let op = fx.wait(&id);

        assert_eq!(op.files_processed, 1);
        assert_eq!(op.failed_files, vec![dir.clone()]);
        assert!(dir.exists());
        assert!(!good.exists());

        let session = fx.store.get_session(&op.session_id.unwrap()).unwrap();
        assert_eq!(session.failure_count, 1);
        assert_eq!(session.success_count, 1);
    }

    #[test]
    fn test_force_deletes_despite_backup_failure_and_warns() {
        let fx = fixture();
        let dir = fx.temp.path().join("cache").join("subdir");
        fs::create_dir_all(&dir).unwrap();
        fs::write(dir.join("inner"), "x").unwrap();

        let mut request = DeletionRequest::new(vec![dir.clone()], "manual_deletion");
        request.force = true;
        let op = fx.wait(&fx.engine.start(request).unwrap());

        assert_eq!(op.files_processed, 1);
        assert!(!dir.exists());
        assert!(op.warnings.iter().any(|w| w.contains("without a successful backup")));

        let history = fx.history.read_all().unwrap();
        assert!(history.iter().any(|e| e.message.contains("without a successful backup")));
    }

    #[test]
    fn test_risky_needs_force() {
        let fx = fixture();
        let safe = fx.file("safe.bin", "1");
        let risky = fx.file("risky.db", "2");

        let op = fx.wait(
            &fx.engine
                .start(DeletionRequest::new(vec![safe.clone(), risky.clone()], "op"))
                .unwrap(),
        );
        assert!(risky.exists());
        assert!(!safe.exists());
        assert_eq!(op.skipped_files, vec![risky.clone()]);

        let mut forced = DeletionRequest::new(vec![risky.clone()], "op");
        forced.force = true;
        let op = fx.wait(&fx.engine.start(forced).unwrap());
        assert!(!risky.exists());
        assert!(op.warnings.iter().any(|w| w.starts_with("Force delete")));
    }

    #[test]
    fn test_dry_run_touches_nothing() {
        let fx = fixture();
        let a = fx.file("a", "1");
        let b = fx.file("b", "22");
        let sessions_before = fx.store.list_sessions().unwrap().len();

        let mut request = DeletionRequest::new(vec![a.clone(), b.clone()], "op");
        request.dry_run = true;
        let op = fx.wait(&fx.engine.start(request).unwrap());

        assert!(a.exists() && b.exists());
        assert_eq!(op.deleted_files, vec![a, b]);
        assert_eq!(op.files_processed, 2);
        assert_eq!(op.current_size, 3);
        assert!(op.session_id.is_none());
        assert_eq!(fx.store.list_sessions().unwrap().len(), sessions_before);
    }

    #[test]
    fn test_dry_run_reports_what_a_real_run_deletes() {
        let fx = fixture();
        let file = fx.file("f.bin", "data");
        let dir = fx.temp.path().join("cache").join("sub");
        fs::create_dir_all(&dir).unwrap();
        let paths = vec![file.clone(), dir.clone()];

        let mut request = DeletionRequest::new(paths.clone(), "op");
        request.dry_run = true;
        let dry = fx.wait(&fx.engine.start(request).unwrap());

        assert_eq!(dry.deleted_files, vec![file.clone()]);
        assert_eq!(dry.failed_files, vec![dir.clone()]);
        assert_eq!(dry.files_processed, 1);
        assert_eq!(dry.current_size, 4);
        assert_eq!(dry.progress, 100);
        assert!(dry.warnings.iter().any(|w| w.starts_with("Backup would fail")));
        assert!(file.exists() && dir.exists());

        let real = fx.wait(&fx.engine.start(DeletionRequest::new(paths, "op")).unwrap());
        assert_eq!(real.deleted_files, dry.deleted_files);
        assert_eq!(real.failed_files, dry.failed_files);
        assert!(dir.exists());
    }

    #[test]
    fn test_forced_dry_run_counts_unbackable_files() {
        let fx = fixture();
        let dir = fx.temp.path().join("cache").join("sub");
        fs::create_dir_all(&dir).unwrap();

        let mut request = DeletionRequest::new(vec![dir.clone()], "op");
        request.dry_run = true;
        request.force = true;
        let op = fx.wait(&fx.engine.start(request).unwrap());

        assert_eq!(op.deleted_files, vec![dir.clone()]);
        assert!(op.failed_files.is_empty());
        assert!(op.warnings.iter().any(|w| w.starts_with("Backup would fail")));
        assert!(dir.exists());
    }

    #[test]
    fn test_no_backup_warns() {
        let fx = fixture();
        let a = fx.file("a", "1");
        let mut request = DeletionRequest::new(vec![a.clone()], "op");
        request.require_backup = false;

        let op = fx.wait(&fx.engine.start(request).unwrap());
        assert!(!a.exists());
        assert!(op.session_id.is_none());
        assert!(op.warnings.iter().any(|w| w.starts_with("Backup disabled")));
    }

    #[test]
    fn test_empty_request_rejected() {
        let fx = fixture();
        let err = fx.engine.start(DeletionRequest::new(vec![], "op")).unwrap_err();
        assert!(err.is_validation());
    }

    #[test]
    fn test_confirm_accepts_matching_document() {
        let fx = fixture();
        let a = fx.file("a", "1");
        let b = fx.file("b", "2");

        let confirmation = fx.engine.validate(&[b.clone(), a.clone()], "manual_deletion");
        assert_eq!(confirmation.title, "Delete Selected Files (2 files)");

        let id = fx
            .engine
            .confirm(&confirmation, DeletionRequest::new(vec![a.clone(), b.clone()], "manual_deletion"))
            .unwrap();
        fx.wait(&id);
        assert!(!a.exists() && !b.exists());
    }

    #[test]
    fn test_confirm_rejects_different_paths() {
        let fx = fixture();
        let a = fx.file("a", "1");
        let b = fx.file("b", "2");

        let confirmation = fx.engine.validate(&[a.clone()], "op");
        let err = fx
            .engine
            .confirm(&confirmation, DeletionRequest::new(vec![a.clone(), b.clone()], "op"))
            .unwrap_err();
        assert!(matches!(err, CleanerError::ConfirmationMismatch(_)));
        assert!(a.exists());
    }

    #[test]
    fn test_confirm_rejects_stale_validation() {
        let fx = fixture();
        let a = fx.file("a", "1");
        let b = fx.file("b", "2");

        let confirmation = fx.engine.validate(&[a.clone(), b.clone()], "op");
        fs::remove_file(&b).unwrap();

        let err = fx
            .engine
            .confirm(&confirmation, DeletionRequest::new(vec![a.clone(), b], "op"))
            .unwrap_err();
        assert!(matches!(err, CleanerError::ConfirmationMismatch(_)));
        assert!(a.exists());
    }

    #[test]
    fn test_confirm_rejects_expired() {
        let fx = fixture();
        let a = fx.file("a", "1");

        let mut confirmation = fx.engine.validate(&[a.clone()], "op");
        confirmation.expires_at = Utc::now() - chrono::Duration::seconds(1);

        let err = fx
            .engine
            .confirm(&confirmation, DeletionRequest::new(vec![a.clone()], "op"))
            .unwrap_err();
        assert!(matches!(err, CleanerError::ConfirmationExpired(_)));
        assert!(a.exists());
    }

    /// Cancels while the worker is blocked backing up the second file
    ///
    /// The second target is a FIFO: opening it for reading blocks until the
    /// test opens the write end, which happens only after the cancel flag is
    /// set. The file in flight still completes; the third is never touched.
    #[cfg(unix)]
    #[test]
    fn test_cancel_stops_between_files() {
        use std::io::Write;
        use std::process::Command;

        let fx = fixture();
        let first = fx.file("first", "one");
        let pipe = fx.temp.path().join("cache").join("pipe");
        let last = fx.file("last", "three");
        let made = Command::new("mkfifo").arg(&pipe).status().unwrap();
        assert!(made.success());

        let id = fx
            .engine
            .start(DeletionRequest::new(
                vec![first.clone(), pipe.clone(), last.clone()],
                "op",
            ))
            .unwrap();

        let deadline = Instant::now() + Duration::from_secs(10);
        while fx.engine.progress(&id).unwrap().message != "Backing up file 2 of 3" {
            assert!(Instant::now() < deadline, "worker never reached the second file");
            thread::sleep(Duration::from_millis(5));
        }
        assert!(fx.engine.cancel(&id).unwrap());

        let mut writer = fs::OpenOptions::new().write(true).open(&pipe).unwrap();
        writer.write_all(b"two").unwrap();
        drop(writer);

        let op = fx.wait(&id);
        assert_eq!(op.status, OperationStatus::Cancelled);
        assert_eq!(op.deleted_files, vec![first.clone(), pipe.clone()]);
        assert_eq!(op.skipped_files, vec![last.clone()]);
        assert_eq!(op.files_processed, 2);
        assert!(op.message.starts_with("Cancelled after 2 of 3"));
        assert!(!first.exists());
        assert!(!pipe.exists());
        assert_eq!(fs::read_to_string(&last).unwrap(), "three");

        // No rollback: the session keeps the two entries it has
        let session = fx.store.get_session(&op.session_id.unwrap()).unwrap();
        assert_eq!(session.status, SessionStatus::Completed);
        assert_eq!(session.total_files, 2);
        assert_eq!(session.entry_for(&pipe).unwrap().checksum, checksum_bytes(b"two"));
        assert!(session.entry_for(&last).is_none());

        let history = fx.history.read_all().unwrap();
        assert!(history.iter().any(|e| e.message == "Deletion cancelled by user"));
    }

    #[test]
    fn test_history_records_lifecycle() {
        let fx = fixture();
        let a = fx.file("a", "1");
        fx.wait(&fx.engine.start(DeletionRequest::new(vec![a], "op")).unwrap());

        let messages: Vec<String> = fx
            .history
            .read_all()
            .unwrap()
            .into_iter()
            .map(|e| e.message)
            .collect();
        assert!(messages.contains(&"Starting deletion operation".to_string()));
        assert!(messages.contains(&"Deletion operation completed".to_string()));
    }
}
