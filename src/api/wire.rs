//! Request parsing and response shapes for the JSON boundary
//!
//! Field names here are the contract callers parse; keep them `snake_case`.

use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::backup::BackupSummary;
use crate::deletion::ValidationResult;
use crate::error::{CleanerError, CleanerResult};
use crate::models::{BackupSession, OperationId, SessionId, SessionStatus};

/// Second failure channel next to `Err`: the call went through but the
/// action was refused or only acknowledged
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CallState {
    Started,
    Success,
    Failed,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CallStatus {
    pub status: CallState,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub operation_id: Option<OperationId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session_id: Option<SessionId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl CallStatus {
    pub fn started(operation_id: OperationId) -> Self {
        Self {
            status: CallState::Started,
            operation_id: Some(operation_id),
            session_id: None,
            message: None,
        }
    }

    pub fn success() -> Self {
        Self {
            status: CallState::Success,
            operation_id: None,
            session_id: None,
            message: None,
        }
    }

    pub fn failed(message: impl Into<String>) -> Self {
        Self {
            status: CallState::Failed,
            operation_id: None,
            session_id: None,
            message: Some(message.into()),
        }
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }
}

/// One row of `GetAvailableBackups`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AvailableBackup {
    pub session_id: SessionId,
    pub operation: String,
    pub status: SessionStatus,
    pub total_files: usize,
    pub total_size: u64,
    pub created_at: DateTime<Utc>,
}

impl From<&BackupSession> for AvailableBackup {
    fn from(session: &BackupSession) -> Self {
        Self {
            session_id: session.session_id,
            operation: session.operation.clone(),
            status: session.status,
            total_files: session.total_files,
            total_size: session.total_size,
            created_at: session.start_time,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct BrowserData {
    pub summary: BackupSummary,
    pub sessions: Vec<BackupSession>,
}

#[derive(Debug, Clone, Serialize)]
pub struct SessionDetails {
    pub session: BackupSession,
    pub integrity_valid: bool,
    pub integrity_errors: Vec<String>,
    pub restorable_files: Vec<PathBuf>,
    pub can_restore: bool,
}

/// Parse a JSON array of paths
///
/// An empty string or `null` means no paths; restore calls read that as
/// "every file in the session".
pub fn parse_paths(json: &str) -> CleanerResult<Vec<PathBuf>> {
    let trimmed = json.trim();
    if trimmed.is_empty() {
        return Ok(Vec::new());
    }

    let paths: Option<Vec<PathBuf>> = serde_json::from_str(trimmed)
        .map_err(|e| CleanerError::Validation(format!("invalid files JSON: {}", e)))?;
    Ok(paths.unwrap_or_default())
}

pub fn parse_confirmation(json: &str) -> CleanerResult<ValidationResult> {
    serde_json::from_str(json)
        .map_err(|e| CleanerError::Validation(format!("invalid confirmation JSON: {}", e)))
}

/// A handle that is not one of ours cannot name a session, so it is not found
pub fn parse_session_id(raw: &str) -> CleanerResult<SessionId> {
    raw.trim()
        .parse()
        .map_err(|_| CleanerError::session_not_found(raw))
}

pub fn parse_operation_id(raw: &str) -> CleanerResult<OperationId> {
    raw.trim()
        .parse()
        .map_err(|_| CleanerError::operation_not_found(raw))
}

/// Serialize a response for the boundary
pub fn to_json<T: Serialize>(value: &T) -> CleanerResult<String> {
    serde_json::to_string(value)
        .map_err(|e| CleanerError::Json(format!("Failed to serialize response: {}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_paths() {
        assert!(parse_paths("").unwrap().is_empty());
        assert!(parse_paths("  null ").unwrap().is_empty());
        assert!(parse_paths("[]").unwrap().is_empty());
        assert_eq!(
            parse_paths(r#"["/a/b", "/c"]"#).unwrap(),
            vec![PathBuf::from("/a/b"), PathBuf::from("/c")]
        );
    }

    #[test]
    fn test_malformed_paths_are_validation_errors() {
        assert!(parse_paths("{not json").unwrap_err().is_validation());
        assert!(parse_paths(r#"{"files": []}"#).unwrap_err().is_validation());
    }

    #[test]
    fn test_call_status_shape() {
        let id = OperationId::new();
        let value = serde_json::to_value(CallStatus::started(id)).unwrap();
        assert_eq!(value["status"], "started");
        assert_eq!(value["operation_id"], id.to_string());
        assert!(value.get("message").is_none());

        let value = serde_json::to_value(CallStatus::failed("expired")).unwrap();
        assert_eq!(value["status"], "failed");
        assert_eq!(value["message"], "expired");
    }

    #[test]
    fn test_id_parsing() {
        let id = SessionId::new();
        assert_eq!(parse_session_id(&id.to_string()).unwrap(), id);
        assert_eq!(parse_session_id(&format!(" {} ", id)).unwrap(), id);
    }

    #[test]
    fn test_foreign_ids_are_not_found() {
        let err = parse_session_id("backup_1700000000").unwrap_err();
        assert!(err.is_not_found());
        assert!(err.to_string().contains("backup_1700000000"));

        assert!(parse_operation_id("").unwrap_err().is_not_found());
        assert!(parse_operation_id("op-42").unwrap_err().is_not_found());
    }
}
