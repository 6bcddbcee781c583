//! CLI command handlers
//!
//! This module contains the implementation of CLI commands, bridging the
//! clap argument parsing with the `CleanerApp` boundary calls.

pub mod backup;
pub mod delete;
pub mod restore;

pub use backup::{handle_backup_command, BackupCommands};
pub use delete::{handle_delete_command, handle_validate_command, DeleteArgs, ValidateArgs};
pub use restore::{handle_restore_command, RestoreCommands};

use std::path::{Path, PathBuf};

use serde::Serialize;

use crate::api::wire::to_json;
use crate::error::{CleanerError, CleanerResult};

/// Pretty-print a boundary response to stdout
pub(crate) fn print_json<T: Serialize>(value: &T) -> CleanerResult<()> {
    let json = serde_json::to_string_pretty(value)
        .map_err(|e| CleanerError::Json(format!("Failed to serialize output: {}", e)))?;
    println!("{}", json);
    Ok(())
}

/// Resolve command-line paths against the working directory and encode
/// them the way the boundary expects
pub(crate) fn paths_json(paths: &[PathBuf]) -> CleanerResult<String> {
    let cwd = std::env::current_dir()?;
    let absolute: Vec<PathBuf> = paths.iter().map(|p| absolutize(&cwd, p)).collect();
    to_json(&absolute)
}

fn absolutize(cwd: &Path, path: &Path) -> PathBuf {
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        cwd.join(path)
    }
}
