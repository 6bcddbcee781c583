//! Restore CLI commands

use std::path::PathBuf;

use clap::Subcommand;

use super::{paths_json, print_json};
use crate::api::CleanerApp;
use crate::display::format_restore_result;
use crate::error::CleanerResult;
use crate::models::RestoreOptions;

#[derive(Subcommand)]
pub enum RestoreCommands {
    /// Show what a restore would write, without writing anything
    Preview {
        /// Session ID
        session: String,

        /// Original paths to restore (all files when omitted)
        paths: Vec<PathBuf>,
    },

    /// Write backed-up files back to their original locations
    Run {
        /// Session ID
        session: String,

        /// Original paths to restore (all files when omitted)
        paths: Vec<PathBuf>,

        /// Replace existing files whose content differs
        #[arg(long)]
        overwrite: bool,

        /// Save files about to be overwritten into a new session first
        #[arg(long, requires = "overwrite")]
        backup_existing: bool,

        /// Human-readable summary instead of JSON
        #[arg(long)]
        text: bool,
    },
}

pub fn handle_restore_command(app: &CleanerApp, cmd: RestoreCommands) -> CleanerResult<()> {
    match cmd {
        RestoreCommands::Preview { session, paths } => {
            let preview = app.preview_restore_operation(&session, &selection(&paths)?)?;
            print_json(&preview)
        }

        RestoreCommands::Run {
            session,
            paths,
            overwrite,
            backup_existing,
            text,
        } => {
            let options = RestoreOptions {
                overwrite,
                backup_existing,
            };
            let result =
                app.restore_from_backup_with_options(&session, &selection(&paths)?, options)?;

            if text {
                println!("{}", format_restore_result(&result));
                Ok(())
            } else {
                print_json(&result)
            }
        }
    }
}

/// Empty selection means the whole session
fn selection(paths: &[PathBuf]) -> CleanerResult<String> {
    if paths.is_empty() {
        Ok(String::new())
    } else {
        paths_json(paths)
    }
}
