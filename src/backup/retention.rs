//! Age-based retention for backup sessions
//!
//! A session's age is measured from `start_time`: the moment it began
//! protecting files, not when its operation finished.

use std::sync::Arc;

use chrono::{Duration, Utc};
use serde::Serialize;
use tracing::info;

use super::store::BackupStore;
use crate::error::{CleanerError, CleanerResult};
use crate::models::SessionId;

/// Result of an age sweep
#[derive(Debug, Clone, Serialize)]
pub struct CleanupReport {
    pub deleted_count: usize,
    pub sessions_before: usize,
    pub sessions_after: usize,
    pub older_than_days: u32,
    pub deleted_sessions: Vec<SessionId>,
    /// Old sessions left alone because they never finished
    pub skipped_in_progress: Vec<SessionId>,
}

pub struct RetentionManager {
    store: Arc<BackupStore>,
}

impl RetentionManager {
    pub fn new(store: Arc<BackupStore>) -> Self {
        Self { store }
    }

    /// Delete every finished session that started more than `days` ago
    ///
    /// `days == 0` targets everything that has already started.
    pub fn cleanup_by_age(&self, days: u32) -> CleanerResult<CleanupReport> {
        let cutoff = Duration::try_days(i64::from(days))
            .and_then(|age| Utc::now().checked_sub_signed(age))
            .ok_or_else(|| CleanerError::Validation(format!("Retention period too large: {} days", days)))?;
        let before = self.store.list_sessions()?.len();

        let outcome = self.store.delete_started_before(cutoff)?;
        let after = self.store.list_sessions()?.len();

        info!(
            older_than_days = days,
            deleted = outcome.deleted.len(),
            skipped = outcome.skipped_in_progress.len(),
            "Backup cleanup finished"
        );

        Ok(CleanupReport {
            deleted_count: outcome.deleted.len(),
            sessions_before: before,
            sessions_after: after,
            older_than_days: days,
            deleted_sessions: outcome.deleted,
            skipped_in_progress: outcome.skipped_in_progress,
        })
    }

    /// Entry point for callers supplying a signed day count
    pub fn cleanup(&self, days: i64) -> CleanerResult<CleanupReport> {
        let days = u32::try_from(days).map_err(|_| {
            CleanerError::Validation(format!("Retention days must be between 0 and {}: {}", u32::MAX, days))
        })?;
        self.cleanup_by_age(days)
    }

    /// Apply the configured retention period
    pub fn enforce(&self, retention_days: u32) -> CleanerResult<CleanupReport> {
        self.cleanup_by_age(retention_days)
    }
}
