use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};

use cache_cleaner::api::CleanerApp;
use cache_cleaner::cli::{
    handle_backup_command, handle_delete_command, handle_restore_command,
    handle_validate_command, BackupCommands, DeleteArgs, RestoreCommands, ValidateArgs,
};
use cache_cleaner::config::{CleanerPaths, Settings};
use cache_cleaner::logging::init_logging;

#[derive(Parser)]
#[command(
    name = "cachecleaner",
    author = "Kaylee Beyene",
    version,
    about = "Backup-first cache cleaner with integrity-verified restore",
    long_about = "cachecleaner deletes cache files only after copying them into a \
                  checksummed backup session, and restores any session back to \
                  the original locations on demand."
)]
struct Cli {
    /// Data directory (defaults to CACHE_CLEANER_DATA_DIR or the platform data dir)
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    /// Log debug events to stderr
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Classify files and produce a confirmation document
    Validate(ValidateArgs),

    /// Back up and delete files
    #[command(alias = "rm")]
    Delete(DeleteArgs),

    /// Backup session management commands
    #[command(subcommand)]
    Backups(BackupCommands),

    /// Restore files from a backup session
    #[command(subcommand)]
    Restore(RestoreCommands),

    /// Show recent deletion history
    History {
        /// Number of entries to show
        #[arg(short, long, default_value = "20")]
        limit: usize,
    },

    /// Show current configuration and paths
    Config {
        /// Write the effective settings to config.json
        #[arg(long)]
        init: bool,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize paths and settings
    let paths = match cli.data_dir {
        Some(dir) => CleanerPaths::with_base_dir(dir),
        None => CleanerPaths::new()?,
    };
    paths.ensure_directories()?;
    let settings = Settings::load_or_create(&paths)?;

    let _log_guard = init_logging(&paths, if cli.verbose { "debug" } else { "warn" })?;

    let Some(command) = cli.command else {
        println!("cachecleaner - backup-first cache cleaner");
        println!();
        println!("Run 'cachecleaner --help' for usage information.");
        return Ok(());
    };

    if let Commands::Config { init } = command {
        if init {
            settings.save(&paths)?;
            println!("Settings written to {}", paths.settings_file().display());
        }
        println!("Cache Cleaner Configuration");
        println!("===========================");
        println!("Data directory:   {}", paths.base_dir().display());
        println!("Backup directory: {}", paths.backup_dir().display());
        println!("Log directory:    {}", paths.logs_dir().display());
        println!("History file:     {}", paths.deletion_log().display());
        println!();
        println!("Settings:");
        println!("  Retention days:       {}", settings.retention_days);
        println!("  Confirmation TTL (s): {}", settings.confirmation_ttl_secs);
        println!("  Detect open files:    {}", settings.detect_open_files);
        println!(
            "  Allowed roots:        {}",
            if settings.allowed_roots.is_empty() {
                "(any)".to_string()
            } else {
                join_paths(&settings.allowed_roots)
            }
        );
        println!("  Protected paths:      {}", join_paths(&settings.protected_paths));
        return Ok(());
    }

    let app = CleanerApp::open(paths, settings)?;

    match command {
        Commands::Validate(args) => handle_validate_command(&app, args)?,
        Commands::Delete(args) => handle_delete_command(&app, args)?,
        Commands::Backups(cmd) => handle_backup_command(&app, cmd)?,
        Commands::Restore(cmd) => handle_restore_command(&app, cmd)?,
        Commands::History { limit } => {
            let entries = app.get_deletion_history(limit)?;
            println!("{}", serde_json::to_string_pretty(&entries)?);
        }
        Commands::Config { .. } => {}
    }

    Ok(())
}

fn join_paths(paths: &[PathBuf]) -> String {
    paths
        .iter()
        .map(|p| p.display().to_string())
        .collect::<Vec<_>>()
        .join(", ")
}
