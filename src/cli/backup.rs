//! Backup CLI commands
//!
//! Browse, verify, and prune backup sessions.

use clap::Subcommand;

use super::print_json;
use crate::api::CleanerApp;
use crate::display::{format_session_details, format_session_list, format_session_table, format_size};
use crate::error::{CleanerError, CleanerResult};

/// Backup subcommands
#[derive(Subcommand)]
pub enum BackupCommands {
    /// List backup sessions, newest first
    List {
        /// Render a table instead of JSON
        #[arg(short, long)]
        table: bool,

        /// Numbered list instead of JSON
        #[arg(short, long, conflicts_with = "table")]
        verbose: bool,
    },

    /// Show one session with its entries and integrity check
    Show {
        /// Session ID
        session: String,

        /// Human-readable output instead of JSON
        #[arg(long)]
        text: bool,
    },

    /// Summary plus every session
    Browse,

    /// Recompute payload checksums for a session
    Verify {
        /// Session ID
        session: String,
    },

    /// Delete a session and its payloads
    Delete {
        /// Session ID
        session: String,

        /// Skip confirmation prompt
        #[arg(short, long)]
        force: bool,
    },

    /// Delete finished sessions older than a number of days
    Cleanup {
        /// Age threshold in days (defaults to the configured retention)
        #[arg(short, long, allow_negative_numbers = true)]
        days: Option<i64>,
    },
}

/// Handle a backup command
pub fn handle_backup_command(app: &CleanerApp, cmd: BackupCommands) -> CleanerResult<()> {
    match cmd {
        BackupCommands::List { table, verbose } => {
            if table || verbose {
                let sessions = app.store().list_sessions()?;
                if table {
                    println!("{}", format_session_table(&sessions));
                } else {
                    println!("{}", format_session_list(&sessions));
                }
            } else {
                print_json(&app.get_available_backups()?)?;
            }
        }

        BackupCommands::Show { session, text } => {
            let details = app.get_backup_session_details(&session)?;
            if text {
                println!("{}", format_session_details(&details));
            } else {
                print_json(&details)?;
            }
        }

        BackupCommands::Browse => {
            print_json(&app.get_backup_browser_data()?)?;
        }

        BackupCommands::Verify { session } => {
            let report = app.verify_backup_integrity(&session)?;
            print_json(&report)?;
            if !report.valid {
                return Err(CleanerError::Integrity(format!(
                    "{} of {} entries failed verification",
                    report.errors.len(),
                    report.checked
                )));
            }
        }

        BackupCommands::Delete { session, force } => {
            if !force {
                let details = app.get_backup_session_details(&session)?;
                println!(
                    "Session {} holds {} file(s) ({}).",
                    details.session.session_id,
                    details.session.total_files,
                    format_size(details.session.total_size)
                );
                println!("To delete it, run again with --force flag:");
                println!("  cachecleaner backups delete {} --force", session);
                return Ok(());
            }

            print_json(&app.delete_backup_session(&session)?)?;
        }

        BackupCommands::Cleanup { days } => {
            let report = match days {
                Some(days) => app.cleanup_backups_by_age(days)?,
                None => app.enforce_retention()?,
            };
            print_json(&report)?;
        }
    }

    Ok(())
}
