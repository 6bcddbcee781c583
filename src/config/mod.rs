//! Configuration module for the cache cleaner
//!
//! - Platform-aware path resolution for settings, backups, and logs
//! - User settings persistence

pub mod paths;
pub mod settings;

pub use paths::CleanerPaths;
pub use settings::Settings;
