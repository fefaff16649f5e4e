//! High level backup operations on user supplied paths.
//!
//! [`BackupService`] resolves paths, names archives and ties the archiver,
//! the restore manager and the retention engine together. Settings are
//! passed in explicitly; nothing here reads global configuration.

use crate::archive::{ArchiveBuilder, ArchiveConfig, DEFAULT_COMPRESSION_LEVEL};
use crate::checksum::calculate_checksum;
use crate::error::{BackupError, Result};
use crate::naming::{self, BackupInfo, BackupsMapping};
use crate::restore::{RestoreManager, RestoreOptions, RestoreResult};
use crate::retention::{self, RolloverResult};
use chrono::{Local, NaiveDateTime};
use mineserver_core::{absolute_path, BackupConfig, VersionsInfo};
use std::fs;
use std::path::Path;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

/// Settings consumed by [`BackupService`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackupSettings {
    pub compression_level: u32,
    pub show_progress: bool,
    pub verify_on_restore: bool,
}

impl Default for BackupSettings {
    fn default() -> Self {
        Self {
            compression_level: DEFAULT_COMPRESSION_LEVEL,
            show_progress: false,
            verify_on_restore: false,
        }
    }
}

impl From<&BackupConfig> for BackupSettings {
    fn from(config: &BackupConfig) -> Self {
        Self {
            compression_level: config.compression_level,
            show_progress: config.show_progress,
            verify_on_restore: config.verify_on_restore,
        }
    }
}

pub struct BackupService {
    settings: BackupSettings,
    cancel: CancellationToken,
}

impl BackupService {
    pub fn new(settings: BackupSettings) -> Self {
        Self::with_cancel(settings, CancellationToken::new())
    }

    /// Creates a service whose operations abort once `cancel` fires.
    pub fn with_cancel(settings: BackupSettings, cancel: CancellationToken) -> Self {
        Self { settings, cancel }
    }

    pub fn settings(&self) -> &BackupSettings {
        &self.settings
    }

    /// Backs up `instance_path` into `backup_folder`, named with the current
    /// local time.
    pub fn backup(&self, instance_path: &str, backup_folder: &str) -> Result<BackupInfo> {
        self.backup_at(instance_path, backup_folder, Local::now().naive_local())
    }

    /// Backs up `instance_path` into `backup_folder` using `timestamp` for the
    /// archive name. A backup of the same instance within the same second
    /// replaces the earlier archive.
    pub fn backup_at(
        &self,
        instance_path: &str,
        backup_folder: &str,
        timestamp: NaiveDateTime,
    ) -> Result<BackupInfo> {
        let instance = absolute_path(instance_path)?;
        let folder = absolute_path(backup_folder)?;

        naming::check_directory(&instance)?;
        let name = instance_name(&instance)?;

        let versions = load_versions(&instance);

        fs::create_dir_all(&folder)
            .map_err(|e| BackupError::archive_write(&folder, "creating backup folder", e))?;

        if folder.starts_with(&instance) {
            warn!(
                folder = %folder.display(),
                "backup folder is inside the instance; earlier backups will be included"
            );
        }

        let archive_path = folder.join(naming::encode_backup_file_name(&name, &timestamp));

        info!(
            instance = %instance.display(),
            backup = %archive_path.display(),
            "creating backup"
        );

        let config = ArchiveConfig::new()
            .with_compression_level(self.settings.compression_level)
            .with_progress(self.settings.show_progress);
        let packed = ArchiveBuilder::with_cancel(config, self.cancel.clone())
            .create(&instance, &archive_path)?;

        let checksum = calculate_checksum(&archive_path)
            .map_err(|e| BackupError::archive_read(&archive_path, "computing checksum", e))?;

        info!(
            backup = %archive_path.display(),
            files = packed.file_count,
            size_bytes = packed.size_bytes,
            sha256 = %checksum,
            duration_secs = packed.duration_seconds,
            "backup created"
        );

        Ok(BackupInfo {
            timestamp,
            name,
            path: archive_path,
            versions,
        })
    }

    /// Unpacks `backup_file` over `instance_path`, creating it if needed.
    pub fn restore(&self, instance_path: &str, backup_file: &str) -> Result<RestoreResult> {
        let instance = absolute_path(instance_path)?;
        let archive = absolute_path(backup_file)?;

        let options = RestoreOptions::new()
            .with_verify(self.settings.verify_on_restore)
            .with_progress(self.settings.show_progress);

        RestoreManager::with_cancel(options, self.cancel.clone()).restore(&archive, &instance)
    }

    /// Deletes the oldest backups of `instance_name` beyond `max_backup_files`.
    /// Zero disables rollover.
    pub fn rollover_backup_files(
        &self,
        backup_folder: &str,
        instance_name: &str,
        max_backup_files: usize,
    ) -> Result<RolloverResult> {
        let folder = absolute_path(backup_folder)?;
        retention::rollover(&folder, instance_name, max_backup_files, &self.cancel)
    }

    /// Lists the backups in `backup_folder`, grouped by instance.
    pub fn list_backups(&self, backup_folder: &str) -> Result<BackupsMapping> {
        let folder = absolute_path(backup_folder)?;
        naming::scan_backup_dir(&folder)
    }
}

/// The instance name is the last component of its absolute path.
pub fn instance_name(instance: &Path) -> Result<String> {
    instance
        .file_name()
        .and_then(|n| n.to_str())
        .map(str::to_string)
        .ok_or_else(|| BackupError::PathResolution {
            path: instance.display().to_string(),
            message: "cannot derive an instance name from this path".to_string(),
        })
}

fn load_versions(instance: &Path) -> Option<VersionsInfo> {
    match VersionsInfo::load(instance) {
        Ok(Some(versions)) => {
            info!(
                java_version = versions.java_version,
                mine_version = %versions.mine_version,
                cli_version = %versions.cli_version.version,
                "instance versions"
            );
            Some(versions)
        }
        Ok(None) => None,
        Err(e) => {
            warn!(instance = %instance.display(), error = %e, "ignoring unreadable versions.json");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use std::path::PathBuf;
    use tempfile::TempDir;

    fn path_str(path: &Path) -> &str {
        path.to_str().unwrap()
    }

    fn create_instance(base: &Path) -> PathBuf {
        let instance = base.join("survival");
        fs::create_dir_all(instance.join("world")).unwrap();
        fs::write(instance.join("server.properties"), "motd=hi\n").unwrap();
        fs::write(instance.join("world/level.dat"), [9u8; 16]).unwrap();
        instance
    }

    #[test]
    fn test_backup_names_archive_after_instance() {
        let temp_dir = TempDir::new().unwrap();
        let instance = create_instance(temp_dir.path());
        let folder = temp_dir.path().join("backups/nested");
        let timestamp = NaiveDate::from_ymd_opt(2024, 6, 1)
            .unwrap()
            .and_hms_opt(8, 30, 0)
            .unwrap();

        let service = BackupService::new(BackupSettings::default());
        let info = service
            .backup_at(path_str(&instance), path_str(&folder), timestamp)
            .unwrap();

        assert_eq!(info.name, "survival");
        assert_eq!(info.timestamp, timestamp);
        assert_eq!(info.path, folder.join("survival_2024-06-01_08-30-00_backup.zip"));
        assert!(info.path.exists());
        assert!(info.versions.is_none());
    }

    #[test]
    fn test_backup_reads_versions_file() {
        let temp_dir = TempDir::new().unwrap();
        let instance = create_instance(temp_dir.path());
        fs::write(
            instance.join("versions.json"),
            r#"{"java_version":21,"mine_version":"1.21.4"}"#,
        )
        .unwrap();

        let service = BackupService::new(BackupSettings::default());
        let info = service
            .backup(path_str(&instance), path_str(&temp_dir.path().join("b")))
            .unwrap();
        let versions = info.versions.unwrap();
        assert_eq!(versions.java_version, 21);
        assert_eq!(versions.mine_version, "1.21.4");
    }

    #[test]
    fn test_malformed_versions_file_is_ignored() {
        let temp_dir = TempDir::new().unwrap();
        let instance = create_instance(temp_dir.path());
        fs::write(instance.join("versions.json"), "{broken").unwrap();

        let service = BackupService::new(BackupSettings::default());
        let info = service
            .backup(path_str(&instance), path_str(&temp_dir.path().join("b")))
            .unwrap();
        assert!(info.versions.is_none());
    }

    #[test]
    fn test_backup_missing_instance() {
        let temp_dir = TempDir::new().unwrap();
        let service = BackupService::new(BackupSettings::default());
        let err = service
            .backup(
                path_str(&temp_dir.path().join("missing")),
                path_str(temp_dir.path()),
            )
            .unwrap_err();
        assert!(matches!(err, BackupError::DirectoryNotFound { .. }));
    }

    #[test]
    fn test_empty_path_is_resolution_error() {
        let service = BackupService::new(BackupSettings::default());
        assert!(matches!(
            service.list_backups(""),
            Err(BackupError::PathResolution { .. })
        ));
    }

    #[test]
    fn test_list_and_rollover() {
        let temp_dir = TempDir::new().unwrap();
        let instance = create_instance(temp_dir.path());
        let folder = temp_dir.path().join("backups");
        let service = BackupService::new(BackupSettings::default());

        for hour in 1..=4 {
            let ts = NaiveDate::from_ymd_opt(2024, 6, 1)
                .unwrap()
                .and_hms_opt(hour, 0, 0)
                .unwrap();
            service
                .backup_at(path_str(&instance), path_str(&folder), ts)
                .unwrap();
        }

        let mapping = service.list_backups(path_str(&folder)).unwrap();
        assert_eq!(mapping.get("survival").len(), 4);

        let result = service
            .rollover_backup_files(path_str(&folder), "survival", 1)
            .unwrap();
        assert_eq!(result.deleted.len(), 3);

        let mapping = service.list_backups(path_str(&folder)).unwrap();
        assert_eq!(mapping.get("survival").len(), 1);
        assert_eq!(
            mapping.newest("survival").unwrap().timestamp.format("%H").to_string(),
            "04"
        );
    }

    #[test]
    fn test_settings_from_config() {
        let config = BackupConfig {
            compression_level: 9,
            verify_on_restore: true,
            ..BackupConfig::default()
        };
        let settings = BackupSettings::from(&config);
        assert_eq!(settings.compression_level, 9);
        assert!(settings.verify_on_restore);
    }

    #[test]
    fn test_instance_name() {
        assert_eq!(instance_name(Path::new("/srv/mine")).unwrap(), "mine");
        assert!(instance_name(Path::new("/")).is_err());
    }
}
