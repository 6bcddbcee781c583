//! Custom error types for the cache cleaner
//!
//! Hard failures travel as `CleanerError`. Per-file problems inside a batch
//! (one backup or delete failing) are recorded on the entry or result
//! instead, so a single bad file never aborts the whole operation.

use thiserror::Error;

/// The main error type for cache cleaner operations
#[derive(Error, Debug)]
pub enum CleanerError {
    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// File I/O errors
    #[error("I/O error: {0}")]
    Io(String),

    /// JSON serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(String),

    /// Bad or malformed input; the operation never starts
    #[error("Validation error: {0}")]
    Validation(String),

    /// Entity not found errors (sessions, operations)
    #[error("{entity_type} not found: {identifier}")]
    NotFound {
        entity_type: &'static str,
        identifier: String,
    },

    /// Attempted to append to a session that already reached a terminal state
    #[error("Backup session is closed: {session_id} ({status})")]
    SessionClosed { session_id: String, status: String },

    /// Backup store failures (metadata persistence, payload directories)
    #[error("Storage error: {0}")]
    Storage(String),

    /// Checksum mismatch or missing payload
    #[error("Integrity error: {0}")]
    Integrity(String),

    /// Restore destination already exists and overwrite was not requested
    #[error("Conflict: {0}")]
    Conflict(String),

    /// A confirmation payload outlived its expiry
    #[error("Confirmation expired at {0}")]
    ConfirmationExpired(String),

    /// The confirmed file set no longer matches the requested one
    #[error("Confirmation mismatch: {0}")]
    ConfirmationMismatch(String),
}

impl CleanerError {
    /// Create a "not found" error for backup sessions
    pub fn session_not_found(identifier: impl Into<String>) -> Self {
        Self::NotFound {
            entity_type: "Backup session",
            identifier: identifier.into(),
        }
    }

    /// Create a "not found" error for deletion operations
    pub fn operation_not_found(identifier: impl Into<String>) -> Self {
        Self::NotFound {
            entity_type: "Operation",
            identifier: identifier.into(),
        }
    }

    /// Check if this is a "not found" error
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }

    /// Check if this is a validation error
    pub fn is_validation(&self) -> bool {
        matches!(self, Self::Validation(_))
    }
}

impl From<std::io::Error> for CleanerError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err.to_string())
    }
}

impl From<serde_json::Error> for CleanerError {
    fn from(err: serde_json::Error) -> Self {
        Self::Json(err.to_string())
    }
}

/// Result type alias for cache cleaner operations
pub type CleanerResult<T> = Result<T, CleanerError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = CleanerError::Config("test error".into());
        assert_eq!(err.to_string(), "Configuration error: test error");
    }

    #[test]
    fn test_not_found_errors() {
        let err = CleanerError::session_not_found("abc");
        assert_eq!(err.to_string(), "Backup session not found: abc");
        assert!(err.is_not_found());

        let err = CleanerError::operation_not_found("op-1");
        assert_eq!(err.to_string(), "Operation not found: op-1");
        assert!(err.is_not_found());
        assert!(!err.is_validation());
    }

    #[test]
    fn test_session_closed_display() {
        let err = CleanerError::SessionClosed {
            session_id: "abc".into(),
            status: "completed".into(),
        };
        assert_eq!(err.to_string(), "Backup session is closed: abc (completed)");
    }

    #[test]
    fn test_from_io_error() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let err: CleanerError = io_err.into();
        assert!(matches!(err, CleanerError::Io(_)));
    }

    #[test]
    fn test_from_json_error() {
        let json_err = serde_json::from_str::<Vec<String>>("not json").unwrap_err();
        let err: CleanerError = json_err.into();
        assert!(matches!(err, CleanerError::Json(_)));
    }
}
