//! The application facade
//!
//! `CleanerApp` wires the backup store, deletion and restore engines,
//! retention, and history together, and exposes the boundary calls. Path
//! lists and confirmation documents arrive as JSON strings; responses are
//! typed structures that serialize to the `snake_case` wire shapes (see
//! `wire::to_json`).
//!
//! # Example
//!
//! ```rust,ignore
//! use cache_cleaner::api::CleanerApp;
//!
//! let app = CleanerApp::open(paths, settings)?;
//! let confirmation = app.validate_files_for_deletion(r#"["/home/me/.cache/x"]"#, "cache_cleanup")?;
//! let started = app.confirm_deletion(&wire::to_json(&confirmation)?, r#"["/home/me/.cache/x"]"#, true, false, false)?;
//! let progress = app.get_deletion_progress(&started.operation_id.unwrap().to_string())?;
//! ```

pub mod wire;

use std::path::PathBuf;
use std::sync::Arc;

use tracing::{info, warn};

use crate::audit::{DeletionLog, DeletionLogEntry};
use crate::backup::{BackupStore, CleanupReport, IntegrityReport, RetentionManager};
use crate::config::{CleanerPaths, Settings};
use crate::deletion::{DeletionEngine, DeletionRequest, ValidationResult};
use crate::error::{CleanerError, CleanerResult};
use crate::models::{DeletionOperation, RestoreOptions, RestorePreview, RestoreResult};
use crate::restore::RestoreEngine;
use crate::safety::{RuleClassifier, SafetyClassifier};

use wire::{
    parse_confirmation, parse_operation_id, parse_paths, parse_session_id, AvailableBackup,
    BrowserData, CallStatus, SessionDetails,
};

pub struct CleanerApp {
    paths: CleanerPaths,
    settings: Arc<Settings>,
    store: Arc<BackupStore>,
    deletion: DeletionEngine,
    restore: RestoreEngine,
    retention: RetentionManager,
    history: Arc<DeletionLog>,
}

impl CleanerApp {
    /// Open with the built-in rule classifier
    pub fn open(paths: CleanerPaths, settings: Settings) -> CleanerResult<Self> {
        let classifier = Arc::new(RuleClassifier::new(settings.classifier.clone()));
        Self::with_classifier(paths, settings, classifier)
    }

    pub fn with_classifier(
        paths: CleanerPaths,
        settings: Settings,
        classifier: Arc<dyn SafetyClassifier>,
    ) -> CleanerResult<Self> {
        let settings = Arc::new(settings);
        let store = Arc::new(BackupStore::open(paths.clone())?);
        let history = Arc::new(DeletionLog::new(paths.deletion_log()));

        Ok(Self {
            deletion: DeletionEngine::new(
                Arc::clone(&store),
                classifier,
                Arc::clone(&settings),
                Arc::clone(&history),
            ),
            restore: RestoreEngine::new(Arc::clone(&store)),
            retention: RetentionManager::new(Arc::clone(&store)),
            paths,
            settings,
            store,
            history,
        })
    }

    pub fn paths(&self) -> &CleanerPaths {
        &self.paths
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn store(&self) -> &BackupStore {
        &self.store
    }

    pub fn deletion(&self) -> &DeletionEngine {
        &self.deletion
    }

    // Deletion

    pub fn validate_files_for_deletion(
        &self,
        paths_json: &str,
        operation: &str,
    ) -> CleanerResult<ValidationResult> {
        let paths = required_paths(paths_json)?;
        Ok(self.deletion.validate(&paths, operation))
    }

    /// Start a deletion without a confirmation round-trip
    pub fn delete_files_with_confirmation(
        &self,
        paths_json: &str,
        operation: &str,
        require_backup: bool,
        force: bool,
        dry_run: bool,
    ) -> CleanerResult<CallStatus> {
        let request = DeletionRequest {
            paths: required_paths(paths_json)?,
            operation: operation.to_string(),
            require_backup,
            force,
            dry_run,
        };
        let id = self.deletion.start(request)?;
        Ok(CallStatus::started(id))
    }

    /// Start a deletion the user confirmed
    ///
    /// A stale or mismatched confirmation is answered with status `failed`
    /// rather than an error.
    pub fn confirm_deletion(
        &self,
        confirmation_json: &str,
        paths_json: &str,
        require_backup: bool,
        force: bool,
        dry_run: bool,
    ) -> CleanerResult<CallStatus> {
        let confirmation = parse_confirmation(confirmation_json)?;
        let request = DeletionRequest {
            paths: required_paths(paths_json)?,
            operation: confirmation.operation.clone(),
            require_backup,
            force,
            dry_run,
        };

        match self.deletion.confirm(&confirmation, request) {
            Ok(id) => Ok(CallStatus::started(id)),
            Err(e @ (CleanerError::ConfirmationExpired(_) | CleanerError::ConfirmationMismatch(_))) => {
                Ok(CallStatus::failed(e.to_string()))
            }
            Err(e) => Err(e),
        }
    }

    pub fn get_deletion_progress(&self, operation_id: &str) -> CleanerResult<DeletionOperation> {
        self.deletion.progress(&parse_operation_id(operation_id)?)
    }

    pub fn stop_deletion(&self, operation_id: &str) -> CleanerResult<CallStatus> {
        let id = parse_operation_id(operation_id)?;
        if self.deletion.cancel(&id)? {
            info!(operation_id = %id, "Deletion stop requested");
            Ok(CallStatus::success().with_message("Cancellation requested"))
        } else {
            Ok(CallStatus::failed("Operation already finished"))
        }
    }

    pub fn clear_operation(&self, operation_id: &str) -> CleanerResult<CallStatus> {
        self.deletion.clear(&parse_operation_id(operation_id)?)?;
        Ok(CallStatus::success())
    }

    pub fn get_deletion_history(&self, limit: usize) -> CleanerResult<Vec<DeletionLogEntry>> {
        self.history.read_recent(limit)
    }

    // Backups

    pub fn get_available_backups(&self) -> CleanerResult<Vec<AvailableBackup>> {
        Ok(self
            .store
            .list_sessions()?
            .iter()
            .map(AvailableBackup::from)
            .collect())
    }

    pub fn get_backup_browser_data(&self) -> CleanerResult<BrowserData> {
        Ok(BrowserData {
            summary: self.store.summary()?,
            sessions: self.store.list_sessions()?,
        })
    }

    pub fn get_backup_session_details(&self, session_id: &str) -> CleanerResult<SessionDetails> {
        let id = parse_session_id(session_id)?;
        let session = self.store.get_session(&id)?;

        let (integrity_valid, integrity_errors) = match self.store.verify_integrity(&id) {
            Ok(report) => (report.valid, report.errors),
            Err(e) => {
                warn!(session_id = %id, error = %e, "Failed to verify backup integrity");
                (false, vec!["Integrity check failed".to_string()])
            }
        };

        let restorable_files: Vec<PathBuf> = session
            .entries
            .iter()
            .filter(|e| e.success && e.backup_path.as_ref().is_some_and(|p| p.is_file()))
            .map(|e| e.original_path.clone())
            .fold(Vec::new(), |mut acc, path| {
                if !acc.contains(&path) {
                    acc.push(path);
                }
                acc
            });

        Ok(SessionDetails {
            can_restore: !restorable_files.is_empty(),
            session,
            integrity_valid,
            integrity_errors,
            restorable_files,
        })
    }

    pub fn verify_backup_integrity(&self, session_id: &str) -> CleanerResult<IntegrityReport> {
        self.store.verify_integrity(&parse_session_id(session_id)?)
    }

    pub fn delete_backup_session(&self, session_id: &str) -> CleanerResult<CallStatus> {
        let id = parse_session_id(session_id)?;
        self.store.delete_session(&id)?;
        let mut status = CallStatus::success();
        status.session_id = Some(id);
        Ok(status)
    }

    pub fn cleanup_backups_by_age(&self, days: i64) -> CleanerResult<CleanupReport> {
        self.retention.cleanup(days)
    }

    /// Apply `retention_days` from settings
    pub fn enforce_retention(&self) -> CleanerResult<CleanupReport> {
        self.retention.enforce(self.settings.retention_days)
    }

    // Restore

    pub fn preview_restore_operation(
        &self,
        session_id: &str,
        paths_json: &str,
    ) -> CleanerResult<RestorePreview> {
        let id = parse_session_id(session_id)?;
        self.restore.preview(&id, &parse_paths(paths_json)?)
    }

    pub fn restore_from_backup(
        &self,
        session_id: &str,
        paths_json: &str,
        overwrite: bool,
    ) -> CleanerResult<RestoreResult> {
        self.restore_from_backup_with_options(
            session_id,
            paths_json,
            RestoreOptions {
                overwrite,
                backup_existing: false,
            },
        )
    }

    pub fn restore_from_backup_with_options(
        &self,
        session_id: &str,
        paths_json: &str,
        options: RestoreOptions,
    ) -> CleanerResult<RestoreResult> {
        let id = parse_session_id(session_id)?;
        self.restore.restore(&id, &parse_paths(paths_json)?, options)
    }
}

fn required_paths(paths_json: &str) -> CleanerResult<Vec<PathBuf>> {
    let paths = parse_paths(paths_json)?;
    if paths.is_empty() {
        return Err(CleanerError::Validation(
            "No files specified for deletion".to_string(),
        ));
    }
    Ok(paths)
}
