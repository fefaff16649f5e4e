//! CLI argument parsing with clap

use camino::Utf8PathBuf;
use clap::{Parser, Subcommand};

// Re-export command types for convenience
pub use crate::commands::backup::{ListArgs, RolloverArgs, SaveArgs};
pub use crate::commands::restore::RestoreArgs;

/// mineserver - Minecraft server instance manager
#[derive(Parser, Debug)]
#[command(name = "mineserver")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Increase verbosity (-v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Only log errors
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Path to a config file (defaults to ~/.mineserver/config.yaml)
    #[arg(short, long, global = true)]
    pub config: Option<Utf8PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Back up, restore and prune server instances
    #[command(subcommand)]
    Backup(BackupCommands),
}

#[derive(Subcommand, Debug)]
pub enum BackupCommands {
    /// Create a backup of an instance folder
    Save(SaveArgs),

    /// Restore a backup into an instance folder
    Restore(RestoreArgs),

    /// Delete the oldest backups of an instance beyond a maximum count
    Rollover(RolloverArgs),

    /// List backups grouped by instance
    List(ListArgs),
}
