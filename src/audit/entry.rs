//! Deletion history entries

use std::path::Path;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Info,
    Warning,
    Error,
    Debug,
}

impl std::fmt::Display for LogLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LogLevel::Info => write!(f, "INFO"),
            LogLevel::Warning => write!(f, "WARNING"),
            LogLevel::Error => write!(f, "ERROR"),
            LogLevel::Debug => write!(f, "DEBUG"),
        }
    }
}

/// A single deletion history record
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeletionLogEntry {
    pub timestamp: DateTime<Utc>,
    pub level: LogLevel,
    pub message: String,

    /// Operation tag or id the record belongs to
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub operation: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl DeletionLogEntry {
    pub fn new(level: LogLevel, message: impl Into<String>) -> Self {
        Self {
            timestamp: Utc::now(),
            level,
            message: message.into(),
            operation: None,
            file: None,
            details: None,
            error: None,
        }
    }

    pub fn info(message: impl Into<String>) -> Self {
        Self::new(LogLevel::Info, message)
    }

    pub fn warning(message: impl Into<String>) -> Self {
        Self::new(LogLevel::Warning, message)
    }

    pub fn error(message: impl Into<String>, error: impl Into<String>) -> Self {
        let mut entry = Self::new(LogLevel::Error, message);
        entry.error = Some(error.into());
        entry
    }

    pub fn with_operation(mut self, operation: impl Into<String>) -> Self {
        self.operation = Some(operation.into());
        self
    }

    pub fn with_file(mut self, file: &Path) -> Self {
        self.file = Some(file.display().to_string());
        self
    }

    pub fn with_details(mut self, details: serde_json::Value) -> Self {
        self.details = Some(details);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_optional_fields_are_omitted() {
        let entry = DeletionLogEntry::info("Deletion started");
        let value = serde_json::to_value(&entry).unwrap();

        assert_eq!(value["level"], "info");
        assert!(value.get("file").is_none());
        assert!(value.get("error").is_none());
    }

    #[test]
    fn test_builder() {
        let entry = DeletionLogEntry::error("Failed to delete file", "permission denied")
            .with_operation("manual_deletion")
            .with_file(Path::new("/tmp/x"))
            .with_details(json!({"size": 10}));

        assert_eq!(entry.level, LogLevel::Error);
        assert_eq!(entry.file.as_deref(), Some("/tmp/x"));
        assert_eq!(entry.error.as_deref(), Some("permission denied"));
        assert_eq!(entry.details.unwrap()["size"], 10);
    }
}
