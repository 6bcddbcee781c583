//! Path management for the cache cleaner
//!
//! ## Path Resolution Order
//!
//! 1. `CACHE_CLEANER_DATA_DIR` environment variable (if set)
//! 2. The platform data directory from `directories::ProjectDirs`
//!    (`~/.local/share/cache-cleaner`, `~/Library/Application Support/...`,
//!    `%APPDATA%\...`)
//!
//! ## Layout
//!
//! ```text
//! <base>/
//!   config.json
//!   deletion_history.jsonl
//!   backups/
//!     files/<session_id>/...     payloads, one file per entry
//!     metadata/<session_id>.json session documents
//!   logs/
//! ```

use std::path::{Path, PathBuf};

use directories::ProjectDirs;

use crate::error::CleanerError;

/// Environment variable overriding the base directory
pub const DATA_DIR_ENV: &str = "CACHE_CLEANER_DATA_DIR";

/// Manages all paths used by the cache cleaner
#[derive(Debug, Clone)]
pub struct CleanerPaths {
    base_dir: PathBuf,
}

impl CleanerPaths {
    /// Resolve the base directory from the environment or the platform default
    ///
    /// # Errors
    ///
    /// Returns an error if no home directory can be determined.
    pub fn new() -> Result<Self, CleanerError> {
        let base_dir = match std::env::var_os(DATA_DIR_ENV) {
            Some(custom) if !custom.is_empty() => PathBuf::from(custom),
            _ => resolve_default_path()?,
        };

        Ok(Self { base_dir })
    }

    /// Create CleanerPaths with a custom base directory (useful for testing)
    pub fn with_base_dir(base_dir: impl Into<PathBuf>) -> Self {
        Self {
            base_dir: base_dir.into(),
        }
    }

    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    /// Root of everything backup-related
    pub fn backup_dir(&self) -> PathBuf {
        self.base_dir.join("backups")
    }

    /// Payload root; each session owns one subdirectory
    pub fn files_dir(&self) -> PathBuf {
        self.backup_dir().join("files")
    }

    /// Session metadata documents
    pub fn metadata_dir(&self) -> PathBuf {
        self.backup_dir().join("metadata")
    }

    /// Payload directory for one session
    pub fn session_files_dir(&self, session_id: &str) -> PathBuf {
        self.files_dir().join(session_id)
    }

    /// Metadata document for one session
    pub fn session_metadata_file(&self, session_id: &str) -> PathBuf {
        self.metadata_dir().join(format!("{}.json", session_id))
    }

    pub fn logs_dir(&self) -> PathBuf {
        self.base_dir.join("logs")
    }

    pub fn settings_file(&self) -> PathBuf {
        self.base_dir.join("config.json")
    }

    /// Append-only deletion history (JSON lines)
    pub fn deletion_log(&self) -> PathBuf {
        self.base_dir.join("deletion_history.jsonl")
    }

    /// Ensure all required directories exist
    pub fn ensure_directories(&self) -> Result<(), CleanerError> {
        for dir in [
            self.base_dir.clone(),
            self.files_dir(),
            self.metadata_dir(),
            self.logs_dir(),
        ] {
            std::fs::create_dir_all(&dir).map_err(|e| {
                CleanerError::Io(format!("Failed to create directory {}: {}", dir.display(), e))
            })?;
        }

        Ok(())
    }
}

fn resolve_default_path() -> Result<PathBuf, CleanerError> {
    ProjectDirs::from("", "", "cache-cleaner")
        .map(|dirs| dirs.data_dir().to_path_buf())
        .ok_or_else(|| CleanerError::Config("Could not determine a home directory".into()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::env;
    use tempfile::TempDir;

    #[test]
    fn test_custom_base_dir() {
        let temp_dir = TempDir::new().unwrap();
        let paths = CleanerPaths::with_base_dir(temp_dir.path());

        assert_eq!(paths.base_dir(), temp_dir.path());
        assert_eq!(paths.backup_dir(), temp_dir.path().join("backups"));
        assert_eq!(
            paths.session_metadata_file("abc"),
            temp_dir.path().join("backups").join("metadata").join("abc.json")
        );
        assert_eq!(
            paths.session_files_dir("abc"),
            temp_dir.path().join("backups").join("files").join("abc")
        );
    }

    #[test]
    fn test_env_var_override() {
        let temp_dir = TempDir::new().unwrap();

        env::set_var(DATA_DIR_ENV, temp_dir.path());
        let paths = CleanerPaths::new().unwrap();
        env::remove_var(DATA_DIR_ENV);

        assert_eq!(paths.base_dir(), temp_dir.path());
    }

    #[test]
    fn test_ensure_directories() {
        let temp_dir = TempDir::new().unwrap();
        let paths = CleanerPaths::with_base_dir(temp_dir.path().join("nested"));

        paths.ensure_directories().unwrap();

        assert!(paths.files_dir().is_dir());
        assert!(paths.metadata_dir().is_dir());
        assert!(paths.logs_dir().is_dir());
    }
}
