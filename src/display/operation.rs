//! Deletion and restore display formatting

use super::{format_duration, format_size};
use crate::deletion::ValidationResult;
use crate::models::{DeletionOperation, RestoreResult};

/// Confirmation document as the user should read it before confirming
pub fn format_validation(result: &ValidationResult) -> String {
    let mut output = String::new();
    output.push_str(&result.title);
    output.push('\n');
    output.push_str(&"=".repeat(result.title.len()));
    output.push('\n');
    output.push_str(&result.message);
    output.push('\n');

    if !result.warnings.is_empty() {
        output.push_str("\nWarnings:\n");
        for warning in &result.warnings {
            output.push_str(&format!("  ! {}\n", warning));
        }
    }

    if !result.details.is_empty() {
        output.push_str("\nDetails:\n");
        for detail in &result.details {
            output.push_str(&format!("  {}\n", detail));
        }
    }

    output.push_str(&format!(
        "\nExpires: {}",
        result.expires_at.format("%Y-%m-%d %H:%M:%S UTC")
    ));
    output
}

/// Single status line for a polled operation
pub fn format_progress_line(op: &DeletionOperation) -> String {
    format!(
        "[{:>3}%] {} ({}/{} files, {}, {}) {}",
        op.progress,
        op.status,
        op.files_processed,
        op.total_files,
        format_size(op.current_size),
        format_duration(chrono::Duration::seconds(op.elapsed_secs())),
        op.message
    )
}

pub fn format_restore_result(result: &RestoreResult) -> String {
    let mut output = format!(
        "Restored {} of {} file(s) ({})",
        result.success_count,
        result.total_files,
        format_size(result.restored_size)
    );

    for failure in &result.failures {
        output.push_str(&format!(
            "\n  {} [{}] {}",
            failure.path.display(),
            failure.kind,
            failure.detail
        ));
    }

    if let Some(pre) = &result.pre_restore_session_id {
        output.push_str(&format!("\nOverwritten files saved in session {}", pre));
    }
    output
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{RestoreFailure, RestoreFailureKind};
    use std::path::PathBuf;

    #[test]
    fn test_progress_line() {
        let mut op = DeletionOperation::new("cache_cleanup", 4, false);
        op.files_processed = 1;
        op.current_size = 2048;
        op.set_attempted(2);

        let line = format_progress_line(&op);
        assert!(line.starts_with("[ 50%]"));
        assert!(line.contains("1/4 files, 2.0 KB, 0s"));
    }

    #[test]
    fn test_restore_result_lists_failures() {
        let mut result = RestoreResult::default();
        result.ok(PathBuf::from("/a"), 10);
        result.fail(RestoreFailure::new(
            "/b",
            RestoreFailureKind::Integrity,
            "checksum mismatch",
        ));

        let text = format_restore_result(&result);
        assert!(text.starts_with("Restored 1 of 2 file(s) (10 B)"));
        assert!(text.contains("/b [integrity] checksum mismatch"));
    }
}
