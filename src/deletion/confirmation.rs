//! Confirmation documents handed back by validation
//!
//! A caller validates, shows the document to the user, and passes it back to
//! `confirm`. The document is rejected once it expires, or when either the
//! requested path set or the freshly re-validated deletable set no longer
//! matches what the user saw.

use std::collections::BTreeSet;
use std::path::PathBuf;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use super::validation::ValidationReport;
use crate::display::format_size;
use crate::error::{CleanerError, CleanerResult};

const LISTED_FILES: usize = 10;
const MAX_TTL_SECS: u64 = 365 * 24 * 60 * 60;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidationResult {
    pub title: String,
    pub message: String,
    pub warnings: Vec<String>,
    pub details: Vec<String>,
    pub operation: String,
    /// Files that will be deleted without force
    pub file_count: usize,
    pub total_size: u64,
    /// Every requested path, sorted
    pub files: Vec<PathBuf>,
    #[serde(default)]
    pub deletable_files: Vec<PathBuf>,
    #[serde(default)]
    pub risky_files: Vec<PathBuf>,
    #[serde(default)]
    pub blocked_files: Vec<PathBuf>,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl ValidationResult {
    pub fn from_report(
        operation: &str,
        requested: &[PathBuf],
        report: &ValidationReport,
        ttl_secs: u64,
    ) -> Self {
        let deletable = sorted(report.deletable());
        let total_size = report.deletable_size();
        let created_at = Utc::now();
        let ttl = Duration::seconds(ttl_secs.min(MAX_TTL_SECS) as i64);

        let mut details = summary_details(&deletable, total_size);
        details.extend(report.details.iter().cloned());

        Self {
            title: title_for(operation, deletable.len()),
            message: message_for(operation, deletable.len(), total_size),
            warnings: report.warnings.clone(),
            details,
            operation: operation.to_string(),
            file_count: deletable.len(),
            total_size,
            files: sorted(requested.to_vec()),
            deletable_files: deletable,
            risky_files: sorted(report.risky()),
            blocked_files: sorted(report.blocked()),
            created_at,
            expires_at: created_at + ttl,
        }
    }

    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now > self.expires_at
    }

    /// Check that this document still describes `requested` and `current`
    pub fn check(&self, requested: &[PathBuf], current: &ValidationReport, now: DateTime<Utc>) -> CleanerResult<()> {
        if self.is_expired(now) {
            return Err(CleanerError::ConfirmationExpired(self.expires_at.to_rfc3339()));
        }

        let confirmed: BTreeSet<&PathBuf> = self.files.iter().collect();
        let requested_set: BTreeSet<&PathBuf> = requested.iter().collect();
        if confirmed != requested_set {
            return Err(CleanerError::ConfirmationMismatch(format!(
                "confirmed {} files but {} were requested",
                confirmed.len(),
                requested_set.len()
            )));
        }

        let now_deletable = sorted(current.deletable());
        if now_deletable != self.deletable_files {
            return Err(CleanerError::ConfirmationMismatch(
                "files changed since validation; validate again".to_string(),
            ));
        }

        Ok(())
    }
}

fn sorted(mut paths: Vec<PathBuf>) -> Vec<PathBuf> {
    paths.sort();
    paths.dedup();
    paths
}

pub fn title_for(operation: &str, count: usize) -> String {
    match operation {
        "cache_cleanup" => format!("Clean Cache Files ({} files)", count),
        "manual_deletion" => format!("Delete Selected Files ({} files)", count),
        "bulk_deletion" => format!("Bulk Delete Files ({} files)", count),
        "system_cleanup" => format!("System Cleanup ({} files)", count),
        _ => format!("Delete Files ({} files)", count),
    }
}

pub fn message_for(operation: &str, count: usize, total_size: u64) -> String {
    let base = format!(
        "You are about to delete {} files ({}).",
        count,
        format_size(total_size)
    );
    let suffix = match operation {
        "cache_cleanup" => " This will clean up cache files to free up disk space.",
        "manual_deletion" => " These files were manually selected for deletion.",
        "bulk_deletion" => " This is a bulk deletion operation.",
        "system_cleanup" => " This will clean up system files.",
        _ => "",
    };
    format!("{}{} A backup will be created before deletion.", base, suffix)
}

fn summary_details(files: &[PathBuf], total_size: u64) -> Vec<String> {
    let mut details = vec![
        format!("Total files: {}", files.len()),
        format!("Total size: {}", format_size(total_size)),
        String::new(),
        "Safety measures:".to_string(),
        "• A backup will be created before deletion".to_string(),
        "• Files can be restored from backup if needed".to_string(),
        "• System critical files are protected".to_string(),
        String::new(),
        "Files to be deleted:".to_string(),
    ];

    for file in files.iter().take(LISTED_FILES) {
        details.push(format!("• {}", file.display()));
    }
    if files.len() > LISTED_FILES {
        details.push(format!("• ... and {} more files", files.len() - LISTED_FILES));
    }

    details
}
