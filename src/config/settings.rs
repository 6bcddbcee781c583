//! User settings for the cache cleaner
//!
//! Retention, deletion guard rails, and classifier thresholds. Every field
//! has a default so a partial `config.json` still loads.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use super::paths::CleanerPaths;
use crate::error::CleanerError;
use crate::safety::ClassifierConfig;

/// User settings for the cache cleaner
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Schema version for migration support
    pub schema_version: u32,

    /// Sessions older than this many days are removed by `backups cleanup`
    pub retention_days: u32,

    /// Roots that deletion candidates must live under; empty allows any root
    pub allowed_roots: Vec<PathBuf>,

    /// System-critical prefixes that are never deleted, even with force
    pub protected_paths: Vec<PathBuf>,

    /// How long a validation result stays valid for `ConfirmDeletion`
    pub confirmation_ttl_secs: u64,

    /// Finished operation records kept in memory before the oldest are evicted
    pub max_finished_operations: usize,

    /// Reject candidates that another process holds open (Linux only)
    pub detect_open_files: bool,

    /// Thresholds for the built-in rule classifier
    pub classifier: ClassifierConfig,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            schema_version: 1,
            retention_days: 30,
            allowed_roots: Vec::new(),
            protected_paths: default_protected_paths(),
            confirmation_ttl_secs: 300,
            max_finished_operations: 100,
            detect_open_files: true,
            classifier: ClassifierConfig::default(),
        }
    }
}

fn default_protected_paths() -> Vec<PathBuf> {
    [
        "/System",
        "/usr",
        "/bin",
        "/sbin",
        "/etc",
        "/var",
        "/Library/System",
        "/Applications",
    ]
    .iter()
    .map(PathBuf::from)
    .collect()
}

impl Settings {
    /// Load settings from disk, or return defaults if the file doesn't exist
    pub fn load_or_create(paths: &CleanerPaths) -> Result<Self, CleanerError> {
        let settings_path = paths.settings_file();

        if !settings_path.exists() {
            // Don't save yet - let caller decide when to persist
            return Ok(Settings::default());
        }

        let contents = std::fs::read_to_string(&settings_path)
            .map_err(|e| CleanerError::Io(format!("Failed to read settings file: {}", e)))?;

        serde_json::from_str(&contents)
            .map_err(|e| CleanerError::Config(format!("Failed to parse settings file: {}", e)))
    }

    /// Save settings to disk
    pub fn save(&self, paths: &CleanerPaths) -> Result<(), CleanerError> {
        paths.ensure_directories()?;

        let contents = serde_json::to_string_pretty(self)
            .map_err(|e| CleanerError::Config(format!("Failed to serialize settings: {}", e)))?;

        std::fs::write(paths.settings_file(), contents)
            .map_err(|e| CleanerError::Io(format!("Failed to write settings file: {}", e)))?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_default_settings() {
        let settings = Settings::default();
        assert_eq!(settings.retention_days, 30);
        assert_eq!(settings.confirmation_ttl_secs, 300);
        assert!(settings.allowed_roots.is_empty());
        assert!(settings.protected_paths.contains(&PathBuf::from("/usr")));
    }

    #[test]
    fn test_save_and_load() {
        let temp_dir = TempDir::new().unwrap();
        let paths = CleanerPaths::with_base_dir(temp_dir.path());

        let mut settings = Settings::default();
        settings.retention_days = 7;
        settings.allowed_roots = vec![PathBuf::from("/tmp")];
        settings.save(&paths).unwrap();

        let loaded = Settings::load_or_create(&paths).unwrap();
        assert_eq!(loaded.retention_days, 7);
        assert_eq!(loaded.allowed_roots, vec![PathBuf::from("/tmp")]);
    }

    #[test]
    fn test_partial_file_fills_defaults() {
        let temp_dir = TempDir::new().unwrap();
        let paths = CleanerPaths::with_base_dir(temp_dir.path());
        std::fs::write(paths.settings_file(), r#"{"protected_paths": []}"#).unwrap();

        let loaded = Settings::load_or_create(&paths).unwrap();
        assert!(loaded.protected_paths.is_empty());
        assert_eq!(loaded.retention_days, 30);
        assert_eq!(loaded.max_finished_operations, 100);
    }

    #[test]
    fn test_malformed_file_is_config_error() {
        let temp_dir = TempDir::new().unwrap();
        let paths = CleanerPaths::with_base_dir(temp_dir.path());
        std::fs::write(paths.settings_file(), "not json").unwrap();

        let err = Settings::load_or_create(&paths).unwrap_err();
        assert!(matches!(err, CleanerError::Config(_)));
    }
}
