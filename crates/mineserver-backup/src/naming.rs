//! Backup file naming.
//!
//! Backups are stored as `{instance}_{YYYY-MM-DD_hh-mm-ss}_backup.zip`. The
//! timestamp and suffix have a fixed width, so a name is decoded from the
//! right: everything before `_{timestamp}_backup.zip` is the instance name,
//! which may itself contain underscores.

use crate::error::{BackupError, Result};
use chrono::NaiveDateTime;
use mineserver_core::VersionsInfo;
use regex::Regex;
use serde::Serialize;
use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;
use tracing::{debug, warn};

/// Suffix shared by every backup archive.
pub const BACKUP_FILE_SUFFIX: &str = "_backup.zip";

/// `chrono` format of the timestamp segment.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d_%H-%M-%S";

static BACKUP_NAME_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"[0-9]{4}-[0-9]{2}-[0-9]{2}_[0-9]{2}-[0-9]{2}-[0-9]{2}_backup\.zip$")
        .expect("Invalid backup name regex")
});

/// One backup archive, either just written or found by a directory scan.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BackupInfo {
    pub timestamp: NaiveDateTime,
    pub name: String,
    pub path: PathBuf,

    /// Contents of the instance's `versions.json` at backup time
    #[serde(skip_serializing_if = "Option::is_none")]
    pub versions: Option<VersionsInfo>,
}

impl BackupInfo {
    pub fn file_name(&self) -> String {
        encode_backup_file_name(&self.name, &self.timestamp)
    }
}

/// Builds the archive file name for an instance and creation time.
pub fn encode_backup_file_name(instance_name: &str, timestamp: &NaiveDateTime) -> String {
    format!(
        "{}_{}{}",
        instance_name,
        timestamp.format(TIMESTAMP_FORMAT),
        BACKUP_FILE_SUFFIX
    )
}

/// Result of decoding one directory entry name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DecodedName {
    Backup {
        name: String,
        timestamp: NaiveDateTime,
    },
    /// Does not have the backup name shape; ignored by scans.
    NotABackup,
    /// Has the shape but the timestamp is not a real date/time.
    InvalidTimestamp { raw: String, reason: String },
}

/// Decodes a file name produced by [`encode_backup_file_name`].
pub fn decode_backup_file_name(file_name: &str) -> DecodedName {
    let Some(found) = BACKUP_NAME_PATTERN.find(file_name) else {
        return DecodedName::NotABackup;
    };

    let matched = found.as_str();
    let Some(name) = file_name[..found.start()].strip_suffix('_') else {
        return DecodedName::NotABackup;
    };

    let raw = &matched[..matched.len() - BACKUP_FILE_SUFFIX.len()];
    match NaiveDateTime::parse_from_str(raw, TIMESTAMP_FORMAT) {
        Ok(timestamp) => DecodedName::Backup {
            name: name.to_string(),
            timestamp,
        },
        Err(e) => DecodedName::InvalidTimestamp {
            raw: raw.to_string(),
            reason: e.to_string(),
        },
    }
}

/// Backups grouped by instance name, each list sorted oldest first.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct BackupsMapping(BTreeMap<String, Vec<BackupInfo>>);

impl BackupsMapping {
    /// Backups of one instance, oldest first. Empty if there are none.
    pub fn get(&self, instance_name: &str) -> &[BackupInfo] {
        self.0.get(instance_name).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Number of instances with at least one backup.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn instance_names(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &[BackupInfo])> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_slice()))
    }

    /// Total number of backups across all instances.
    pub fn backup_count(&self) -> usize {
        self.0.values().map(Vec::len).sum()
    }

    pub fn newest(&self, instance_name: &str) -> Option<&BackupInfo> {
        self.get(instance_name).last()
    }

    pub fn into_inner(self) -> BTreeMap<String, Vec<BackupInfo>> {
        self.0
    }
}

/// Groups backup file names found in `dir` by instance.
///
/// Entries without the backup name shape are ignored. Entries with a
/// malformed timestamp are logged and skipped. Backups sharing a timestamp
/// keep file name order.
pub fn scan_backup_dir(dir: &Path) -> Result<BackupsMapping> {
    check_directory(dir)?;

    let walk_error = |source: io::Error| BackupError::FilesystemWalk {
        path: dir.to_path_buf(),
        source,
    };

    let mut names = Vec::new();
    for entry in fs::read_dir(dir).map_err(walk_error)? {
        let entry = entry.map_err(walk_error)?;
        if entry.file_type().map_err(walk_error)?.is_dir() {
            continue;
        }
        if let Some(name) = entry.file_name().to_str() {
            names.push(name.to_string());
        }
    }
    names.sort();

    let mut mapping: BTreeMap<String, Vec<BackupInfo>> = BTreeMap::new();
    for file_name in names {
        match decode_backup_file_name(&file_name) {
            DecodedName::Backup { name, timestamp } => {
                let path = dir.join(&file_name);
                mapping.entry(name.clone()).or_default().push(BackupInfo {
                    timestamp,
                    name,
                    path,
                    versions: None,
                });
            }
            DecodedName::InvalidTimestamp { raw, reason } => {
                warn!(file = %file_name, timestamp = %raw, %reason, "skipping backup with unparsable timestamp");
            }
            DecodedName::NotABackup => {
                debug!(file = %file_name, "ignoring non-backup file");
            }
        }
    }

    // Stable sort keeps file name order among equal timestamps.
    for backups in mapping.values_mut() {
        backups.sort_by_key(|b| b.timestamp);
    }

    Ok(BackupsMapping(mapping))
}

/// Fails unless `dir` exists and is a directory.
pub(crate) fn check_directory(dir: &Path) -> Result<()> {
    match fs::metadata(dir) {
        Ok(metadata) if metadata.is_dir() => Ok(()),
        Ok(_) => Err(BackupError::NotADirectory {
            path: dir.to_path_buf(),
        }),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Err(BackupError::DirectoryNotFound {
            path: dir.to_path_buf(),
        }),
        Err(e) => Err(BackupError::FilesystemWalk {
            path: dir.to_path_buf(),
            source: e,
        }),
    }
}
