//! Backup retention: keeps the newest `max` backups of an instance.

use crate::cancel;
use crate::error::{BackupError, Result};
use crate::naming::{self, BackupInfo};
use std::fs;
use std::path::{Path, PathBuf};
use tokio_util::sync::CancellationToken;
use tracing::info;

/// Outcome of a rollover.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RolloverResult {
    /// Removed archives, oldest first
    pub deleted: Vec<PathBuf>,

    /// Archives left on disk for the instance, oldest first
    pub kept: Vec<PathBuf>,
}

/// Splits an oldest-first list into the backups to delete and to keep.
///
/// `max_backup_files == 0` disables retention and keeps everything.
pub fn select_for_deletion(
    backups: &[BackupInfo],
    max_backup_files: usize,
) -> (&[BackupInfo], &[BackupInfo]) {
    if max_backup_files == 0 {
        return (&[], backups);
    }
    let delete_count = backups.len().saturating_sub(max_backup_files);
    backups.split_at(delete_count)
}

/// Deletes the oldest backups of `instance_name` in `backup_dir` until at
/// most `max_backup_files` remain.
///
/// Deletion stops at the first failure; files already removed stay removed.
pub fn rollover(
    backup_dir: &Path,
    instance_name: &str,
    max_backup_files: usize,
    cancel: &CancellationToken,
) -> Result<RolloverResult> {
    let mapping = naming::scan_backup_dir(backup_dir)?;

    if max_backup_files == 0 {
        info!(instance = instance_name, "rollover disabled");
        return Ok(RolloverResult {
            deleted: Vec::new(),
            kept: paths(mapping.get(instance_name)),
        });
    }

    let (to_delete, to_keep) = select_for_deletion(mapping.get(instance_name), max_backup_files);

    info!(
        instance = instance_name,
        found = to_delete.len() + to_keep.len(),
        max = max_backup_files,
        deleting = to_delete.len(),
        "rolling over backups"
    );

    Ok(RolloverResult {
        deleted: delete_backups(to_delete, cancel)?,
        kept: paths(to_keep),
    })
}

/// Removes `backups` in order, stopping at the first failure.
pub fn delete_backups(backups: &[BackupInfo], cancel: &CancellationToken) -> Result<Vec<PathBuf>> {
    let mut deleted = Vec::with_capacity(backups.len());
    for backup in backups {
        cancel::check(cancel)?;
        fs::remove_file(&backup.path).map_err(|e| BackupError::Deletion {
            path: backup.path.clone(),
            source: e,
        })?;
        info!(path = %backup.path.display(), "deleted old backup");
        deleted.push(backup.path.clone());
    }
    Ok(deleted)
}

fn paths(backups: &[BackupInfo]) -> Vec<PathBuf> {
    backups.iter().map(|b| b.path.clone()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn create_backups(dir: &Path, instance: &str, days: &[u32]) {
        for day in days {
            let name = format!("{instance}_2024-12-{day:02}_00-00-00_backup.zip");
            fs::write(dir.join(name), b"zip").unwrap();
        }
    }

    fn remaining(dir: &Path) -> Vec<String> {
        let mut names: Vec<String> = fs::read_dir(dir)
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        names.sort();
        names
    }

    #[test]
    fn test_deletes_oldest_first() {
        let temp_dir = TempDir::new().unwrap();
        create_backups(temp_dir.path(), "app", &[1, 2, 3, 4, 5]);

        let result = rollover(temp_dir.path(), "app", 2, &CancellationToken::new()).unwrap();

        assert_eq!(result.deleted.len(), 3);
        assert!(result.deleted[0].ends_with("app_2024-12-01_00-00-00_backup.zip"));
        assert_eq!(
            remaining(temp_dir.path()),
            vec![
                "app_2024-12-04_00-00-00_backup.zip",
                "app_2024-12-05_00-00-00_backup.zip"
            ]
        );
        assert_eq!(result.kept.len(), 2);
    }

    #[test]
    fn test_other_instances_untouched() {
        let temp_dir = TempDir::new().unwrap();
        create_backups(temp_dir.path(), "app", &[1, 2, 3]);
        create_backups(temp_dir.path(), "other", &[1, 2, 3]);
        fs::write(temp_dir.path().join("notes.txt"), "keep me").unwrap();

        rollover(temp_dir.path(), "app", 1, &CancellationToken::new()).unwrap();

        let left = remaining(temp_dir.path());
        assert_eq!(left.iter().filter(|n| n.starts_with("other_")).count(), 3);
        assert_eq!(left.iter().filter(|n| n.starts_with("app_")).count(), 1);
        assert!(left.contains(&"notes.txt".to_string()));
    }

    #[test]
    fn test_no_op_when_under_limit_or_disabled() {
        let temp_dir = TempDir::new().unwrap();
        create_backups(temp_dir.path(), "app", &[1, 2, 3]);
        let token = CancellationToken::new();

        for max in [0, 3, 10] {
            let result = rollover(temp_dir.path(), "app", max, &token).unwrap();
            assert!(result.deleted.is_empty(), "max={max}");
            assert_eq!(result.kept.len(), 3);
        }
        assert_eq!(remaining(temp_dir.path()).len(), 3);
    }

    #[test]
    fn test_unknown_instance_is_no_op() {
        let temp_dir = TempDir::new().unwrap();
        create_backups(temp_dir.path(), "app", &[1, 2]);

        let result = rollover(temp_dir.path(), "missing", 1, &CancellationToken::new()).unwrap();
        assert_eq!(result, RolloverResult::default());
    }

    #[test]
    fn test_invalid_directory() {
        let temp_dir = TempDir::new().unwrap();
        let token = CancellationToken::new();

        let err = rollover(&temp_dir.path().join("missing"), "app", 1, &token).unwrap_err();
        assert!(matches!(err, BackupError::DirectoryNotFound { .. }));

        let file = temp_dir.path().join("plain-file");
        fs::write(&file, b"").unwrap();
        let err = rollover(&file, "app", 1, &token).unwrap_err();
        assert!(matches!(err, BackupError::NotADirectory { .. }));
    }

    #[test]
    fn test_cancelled_before_deleting() {
        let temp_dir = TempDir::new().unwrap();
        create_backups(temp_dir.path(), "app", &[1, 2, 3]);
        let token = CancellationToken::new();
        token.cancel();

        let err = rollover(temp_dir.path(), "app", 1, &token).unwrap_err();
        assert!(err.is_cancelled());
        assert_eq!(remaining(temp_dir.path()).len(), 3);
    }

    #[test]
    fn test_deletion_failure_stops_remaining_deletions() {
        let temp_dir = TempDir::new().unwrap();
        create_backups(temp_dir.path(), "app", &[1, 2, 3, 4]);
        let mapping = naming::scan_backup_dir(temp_dir.path()).unwrap();
        let (to_delete, _) = select_for_deletion(mapping.get("app"), 1);
        assert_eq!(to_delete.len(), 3);

        // Second archive vanishes between scan and delete
        fs::remove_file(&to_delete[1].path).unwrap();

        let err = delete_backups(to_delete, &CancellationToken::new()).unwrap_err();
        assert!(matches!(err, BackupError::Deletion { ref path, .. } if *path == to_delete[1].path));
        assert_eq!(
            remaining(temp_dir.path()),
            vec![
                "app_2024-12-03_00-00-00_backup.zip",
                "app_2024-12-04_00-00-00_backup.zip"
            ]
        );
    }

    #[test]
    fn test_select_for_deletion() {
        let temp_dir = TempDir::new().unwrap();
        create_backups(temp_dir.path(), "app", &[1, 2, 3, 4]);
        let mapping = naming::scan_backup_dir(temp_dir.path()).unwrap();
        let backups = mapping.get("app");

        let (delete, keep) = select_for_deletion(backups, 3);
        assert_eq!(delete.len(), 1);
        assert_eq!(keep.len(), 3);
        assert_eq!(delete[0].timestamp.format("%d").to_string(), "01");

        let (delete, keep) = select_for_deletion(backups, 0);
        assert!(delete.is_empty());
        assert_eq!(keep.len(), 4);
    }
}
