//! Validate and delete commands
//!
//! `delete` starts the operation and then polls it in-process until it
//! finishes, printing each change of progress to stderr.

use std::path::PathBuf;
use std::thread;
use std::time::Duration;

use clap::Args;

use super::{paths_json, print_json};
use crate::api::wire::{to_json, CallState};
use crate::api::CleanerApp;
use crate::display::{format_progress_line, format_validation};
use crate::error::{CleanerError, CleanerResult};
use crate::models::OperationStatus;

const POLL_INTERVAL: Duration = Duration::from_millis(100);

#[derive(Args)]
pub struct ValidateArgs {
    /// Files or directories to check
    #[arg(required = true)]
    pub paths: Vec<PathBuf>,

    /// Operation tag (cache_cleanup, manual_deletion, bulk_deletion, system_cleanup)
    #[arg(short, long, default_value = "manual_deletion")]
    pub operation: String,

    /// Write the confirmation document to this file for `delete --confirmation`
    #[arg(long)]
    pub save: Option<PathBuf>,

    /// Human-readable summary instead of JSON
    #[arg(long)]
    pub text: bool,
}

#[derive(Args)]
pub struct DeleteArgs {
    /// Files or directories to delete
    #[arg(required = true)]
    pub paths: Vec<PathBuf>,

    /// Operation tag recorded on the backup session
    #[arg(short, long, default_value = "manual_deletion")]
    pub operation: String,

    /// Confirmation document produced by `validate --save`
    #[arg(short, long)]
    pub confirmation: Option<PathBuf>,

    /// Delete without creating a backup first
    #[arg(long)]
    pub no_backup: bool,

    /// Delete risky files and files whose backup failed
    #[arg(short, long)]
    pub force: bool,

    /// Report what would be deleted without touching anything
    #[arg(long)]
    pub dry_run: bool,

    /// Suppress progress lines
    #[arg(short, long)]
    pub quiet: bool,
}

pub fn handle_validate_command(app: &CleanerApp, args: ValidateArgs) -> CleanerResult<()> {
    let result = app.validate_files_for_deletion(&paths_json(&args.paths)?, &args.operation)?;

    if let Some(target) = &args.save {
        std::fs::write(target, to_json(&result)?).map_err(|e| {
            CleanerError::Io(format!(
                "Failed to write confirmation to {}: {}",
                target.display(),
                e
            ))
        })?;
    }

    if args.text {
        println!("{}", format_validation(&result));
        Ok(())
    } else {
        print_json(&result)
    }
}

pub fn handle_delete_command(app: &CleanerApp, args: DeleteArgs) -> CleanerResult<()> {
    let paths = paths_json(&args.paths)?;
    let require_backup = !args.no_backup;

    let started = match &args.confirmation {
        Some(file) => {
            let confirmation = std::fs::read_to_string(file).map_err(|e| {
                CleanerError::Io(format!(
                    "Failed to read confirmation {}: {}",
                    file.display(),
                    e
                ))
            })?;
            app.confirm_deletion(&confirmation, &paths, require_backup, args.force, args.dry_run)?
        }
        None => app.delete_files_with_confirmation(
            &paths,
            &args.operation,
            require_backup,
            args.force,
            args.dry_run,
        )?,
    };

    let operation_id = match (started.status, started.operation_id) {
        (CallState::Started, Some(id)) => id.to_string(),
        _ => {
            print_json(&started)?;
            return Err(CleanerError::Validation(
                started
                    .message
                    .unwrap_or_else(|| "Deletion was not started".to_string()),
            ));
        }
    };

    let mut last_line = String::new();
    let op = loop {
        let op = app.get_deletion_progress(&operation_id)?;
        if !args.quiet {
            let line = format_progress_line(&op);
            if line != last_line {
                eprintln!("{}", line);
                last_line = line;
            }
        }
        if op.status.is_finished() {
            break op;
        }
        thread::sleep(POLL_INTERVAL);
    };

    print_json(&op)?;

    if op.status == OperationStatus::Failed {
        return Err(CleanerError::Storage(op.message));
    }
    Ok(())
}
