//! Common test utilities for mineserver-backup
//!
//! Fixture builders for instance trees and backup folders.

#![allow(dead_code)]

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// A throwaway workspace holding an instance and a backup folder.
pub struct Workspace {
    pub temp_dir: TempDir,
    pub instance: PathBuf,
    pub backups: PathBuf,
}

impl Workspace {
    pub fn new(instance_name: &str) -> Self {
        let temp_dir = TempDir::new().unwrap();
        let instance = temp_dir.path().join(instance_name);
        let backups = temp_dir.path().join("backups");
        fs::create_dir_all(&instance).unwrap();
        Self {
            temp_dir,
            instance,
            backups,
        }
    }

    /// Writes a file below the instance root, creating parents.
    pub fn write(&self, relative: &str, content: &[u8]) -> &Self {
        let path = self.instance.join(relative);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, content).unwrap();
        self
    }

    pub fn instance_str(&self) -> &str {
        self.instance.to_str().unwrap()
    }

    pub fn backups_str(&self) -> &str {
        self.backups.to_str().unwrap()
    }

    /// A fresh, not yet existing directory inside the workspace.
    pub fn scratch(&self, name: &str) -> PathBuf {
        self.temp_dir.path().join(name)
    }
}

/// Every regular file below `root` as relative `/`-joined name to content.
pub fn read_tree(root: &Path) -> BTreeMap<String, Vec<u8>> {
    let mut files = BTreeMap::new();
    for entry in walkdir::WalkDir::new(root) {
        let entry = entry.unwrap();
        if entry.file_type().is_file() {
            let relative = entry
                .path()
                .strip_prefix(root)
                .unwrap()
                .components()
                .map(|c| c.as_os_str().to_string_lossy().into_owned())
                .collect::<Vec<_>>()
                .join("/");
            files.insert(relative, fs::read(entry.path()).unwrap());
        }
    }
    files
}

/// Creates empty files named like backups for `instance` on the given days.
pub fn create_backup_files(dir: &Path, instance: &str, days: &[u32]) {
    fs::create_dir_all(dir).unwrap();
    for day in days {
        let name = format!("{instance}_2024-12-{day:02}_00-00-00_backup.zip");
        fs::write(dir.join(name), b"").unwrap();
    }
}

/// File names in `dir`, sorted.
pub fn list_names(dir: &Path) -> Vec<String> {
    let mut names: Vec<String> = fs::read_dir(dir)
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
        .collect();
    names.sort();
    names
}
