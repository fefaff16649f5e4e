//! Backup commands: save, rollover and list

use anyhow::{Context, Result};
use clap::Args;
use mineserver_backup::{BackupService, BackupSettings, BackupsMapping};
use mineserver_core::AppConfig;
use std::fs;
use tabled::{settings::Style, Table, Tabled};

use super::run_cancellable;
use crate::output;

#[derive(Args, Debug)]
pub struct SaveArgs {
    /// Instance folder to back up
    #[arg(short, long, default_value = ".")]
    pub instance_folder: String,

    /// Folder to write the backup to (defaults to backup.folder from config)
    #[arg(short, long)]
    pub backup_folder: Option<String>,

    /// Keep at most this many backups of the instance (0 or less disables rollover)
    #[arg(short, long, allow_negative_numbers = true)]
    pub max_backup_files: Option<i64>,

    /// Compression level (1-9)
    #[arg(long, value_parser = clap::value_parser!(u32).range(1..=9))]
    pub compression: Option<u32>,

    /// Do not show progress bars
    #[arg(long)]
    pub no_progress: bool,
}

#[derive(Args, Debug)]
pub struct RolloverArgs {
    /// Folder holding the backups (defaults to backup.folder from config)
    #[arg(short, long)]
    pub backup_folder: Option<String>,

    /// Instance name whose backups are pruned
    #[arg(short = 'n', long)]
    pub instance: String,

    /// Number of backups to keep (0 or less disables rollover)
    #[arg(short, long, allow_negative_numbers = true)]
    pub max_backup_files: Option<i64>,
}

#[derive(Args, Debug)]
pub struct ListArgs {
    /// Folder holding the backups (defaults to backup.folder from config)
    #[arg(short, long)]
    pub backup_folder: Option<String>,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

pub async fn save(args: SaveArgs, config: &AppConfig) -> Result<()> {
    output::header("Backup Instance");

    let backup_folder = args
        .backup_folder
        .clone()
        .unwrap_or_else(|| config.backup.folder.clone());
    let limit = rollover_limit(args.max_backup_files, config);

    let mut settings = BackupSettings::from(&config.backup);
    if let Some(level) = args.compression {
        settings.compression_level = level;
    }
    if args.no_progress {
        settings.show_progress = false;
    }

    output::kv("Instance", &args.instance_folder);
    output::kv("Backup folder", &backup_folder);
    output::kv("Compression", &settings.compression_level.to_string());
    println!();

    let instance = args.instance_folder.clone();
    let folder = backup_folder.clone();
    let backup_settings = settings.clone();
    let backup = run_cancellable(move |cancel| {
        BackupService::with_cancel(backup_settings, cancel).backup(&instance, &folder)
    })
    .await?
    .with_context(|| format!("Failed to back up {}", args.instance_folder))?;

    output::success(&format!("Backup created: {}", backup.path.display()));
    if let Ok(metadata) = fs::metadata(&backup.path) {
        output::kv("Size", &output::format_bytes(metadata.len()));
    }
    if let Some(versions) = &backup.versions {
        output::kv("Minecraft", &versions.mine_version);
        output::kv("Java", &versions.java_version.to_string());
    }

    if let Some(max_backup_files) = limit {
        let name = backup.name.clone();
        let result = run_cancellable(move |cancel| {
            BackupService::with_cancel(settings, cancel).rollover_backup_files(
                &backup_folder,
                &name,
                max_backup_files,
            )
        })
        .await?
        .context("Backup created but rollover failed")?;

        if !result.deleted.is_empty() {
            output::info(&format!(
                "Removed {} old backup(s), keeping {}",
                result.deleted.len(),
                result.kept.len()
            ));
        }
    }

    Ok(())
}

pub async fn rollover(args: RolloverArgs, config: &AppConfig) -> Result<()> {
    let Some(max_backup_files) = rollover_limit(args.max_backup_files, config) else {
        output::info("Rollover disabled (max-backup-files is 0 or less)");
        return Ok(());
    };

    let backup_folder = args
        .backup_folder
        .unwrap_or_else(|| config.backup.folder.clone());
    let settings = BackupSettings::from(&config.backup);

    let folder = backup_folder.clone();
    let instance = args.instance.clone();
    let result = run_cancellable(move |cancel| {
        BackupService::with_cancel(settings, cancel).rollover_backup_files(
            &folder,
            &instance,
            max_backup_files,
        )
    })
    .await?
    .with_context(|| format!("Failed to roll over backups in {backup_folder}"))?;

    if result.deleted.is_empty() {
        output::info(&format!(
            "Nothing to remove: {} has {} backup(s)",
            args.instance,
            result.kept.len()
        ));
    } else {
        output::info("Deleted:");
        for path in &result.deleted {
            output::item(&path.display().to_string());
        }
        output::success(&format!(
            "Removed {} backup(s) of {}, {} kept",
            result.deleted.len(),
            args.instance,
            result.kept.len()
        ));
    }

    Ok(())
}

#[derive(Tabled)]
struct BackupRow {
    instance: String,
    created: String,
    size: String,
    file: String,
}

pub fn list(args: ListArgs, config: &AppConfig) -> Result<()> {
    let backup_folder = args
        .backup_folder
        .unwrap_or_else(|| config.backup.folder.clone());

    let service = BackupService::new(BackupSettings::from(&config.backup));
    let mapping = service
        .list_backups(&backup_folder)
        .with_context(|| format!("Failed to list backups in {backup_folder}"))?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&mapping)?);
        return Ok(());
    }

    if mapping.is_empty() {
        output::warning(&format!("No backups found in {backup_folder}"));
        return Ok(());
    }

    let mut table = Table::new(backup_rows(&mapping));
    table.with(Style::sharp());
    println!("{}", table);

    Ok(())
}

fn backup_rows(mapping: &BackupsMapping) -> Vec<BackupRow> {
    mapping
        .iter()
        .flat_map(|(instance, backups)| {
            backups.iter().map(move |backup| BackupRow {
                instance: instance.to_string(),
                created: backup.timestamp.format("%Y-%m-%d %H:%M:%S").to_string(),
                size: fs::metadata(&backup.path)
                    .map(|m| output::format_bytes(m.len()))
                    .unwrap_or_else(|_| "-".to_string()),
                file: backup.file_name(),
            })
        })
        .collect()
}

/// The `--max-backup-files` flag overrides the configured limit.
fn rollover_limit(flag: Option<i64>, config: &AppConfig) -> Option<usize> {
    let mut backup = config.backup.clone();
    if let Some(max) = flag {
        backup.max_backup_files = max;
    }
    backup.rollover_limit()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_rollover_limit_prefers_flag() {
        let mut config = AppConfig::default();
        config.backup.max_backup_files = 7;
        assert_eq!(rollover_limit(None, &config), Some(7));
        assert_eq!(rollover_limit(Some(2), &config), Some(2));
        assert_eq!(rollover_limit(Some(0), &config), None);
        assert_eq!(rollover_limit(Some(-1), &config), None);

        config.backup.max_backup_files = -3;
        assert_eq!(rollover_limit(None, &config), None);
    }

    #[test]
    fn test_backup_rows() {
        let temp_dir = TempDir::new().unwrap();
        fs::write(
            temp_dir.path().join("survival_2024-05-01_10-00-00_backup.zip"),
            vec![0u8; 2048],
        )
        .unwrap();
        fs::write(
            temp_dir.path().join("creative_2024-05-02_10-00-00_backup.zip"),
            b"",
        )
        .unwrap();

        let mapping = mineserver_backup::scan_backup_dir(temp_dir.path()).unwrap();
        let rows = backup_rows(&mapping);

        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].instance, "creative");
        assert_eq!(rows[1].instance, "survival");
        assert_eq!(rows[1].created, "2024-05-01 10:00:00");
        assert_eq!(rows[1].size, "2.00 KB");
        assert_eq!(rows[1].file, "survival_2024-05-01_10-00-00_backup.zip");
    }
}
