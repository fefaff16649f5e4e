//! Restore command
//!
//! Connects the CLI restore UI to the mineserver-backup restore library.

use anyhow::{Context, Result};
use clap::Args;
use dialoguer::Confirm;
use mineserver_backup::{BackupService, BackupSettings, MANIFEST_FILENAME};
use mineserver_core::AppConfig;

use super::run_cancellable;
use crate::output;

#[derive(Args, Debug)]
pub struct RestoreArgs {
    /// Backup archive to restore
    #[arg(short = 'f', long)]
    pub backup_file: String,

    /// Instance folder to restore into (created if missing)
    #[arg(short, long, default_value = ".")]
    pub instance_folder: String,

    /// Check every restored file against the backup's checksum manifest
    #[arg(long)]
    pub verify: bool,

    /// Do not show progress bars
    #[arg(long)]
    pub no_progress: bool,

    /// Skip the confirmation prompt
    #[arg(short, long)]
    pub yes: bool,
}

pub async fn run(args: RestoreArgs, config: &AppConfig) -> Result<()> {
    output::header("Restore Instance");

    let mut settings = BackupSettings::from(&config.backup);
    settings.verify_on_restore |= args.verify;
    if args.no_progress {
        settings.show_progress = false;
    }

    output::kv("Backup", &args.backup_file);
    output::kv("Instance", &args.instance_folder);
    let verify = if settings.verify_on_restore { "yes" } else { "no" };
    output::kv("Verify", verify);
    println!();

    if !args.yes {
        output::warning("Files in the instance folder that are also in the backup are overwritten");
        let proceed = Confirm::new()
            .with_prompt("Proceed with restore?")
            .default(false)
            .interact()?;
        if !proceed {
            output::info("Restore cancelled");
            return Ok(());
        }
    }

    let instance = args.instance_folder.clone();
    let backup_file = args.backup_file.clone();
    let result = run_cancellable(move |cancel| {
        BackupService::with_cancel(settings, cancel).restore(&instance, &backup_file)
    })
    .await?
    .with_context(|| format!("Failed to restore {}", args.backup_file))?;

    output::success(&format!(
        "Restored {} files ({}) into {}",
        result.restored,
        output::format_bytes(result.bytes_written),
        args.instance_folder
    ));
    if result.verified > 0 {
        output::success(&format!(
            "Verified {} files against {}",
            result.verified, MANIFEST_FILENAME
        ));
    }

    Ok(())
}
