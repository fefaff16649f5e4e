//! Instance metadata written by the installer

use crate::error::Result;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Name of the versions file stored at the root of every installed instance.
pub const VERSIONS_FILE_NAME: &str = "versions.json";

/// Version of the CLI that installed an instance.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct CliVersion {
    pub version: String,
    pub commit: String,
    pub build_date: String,
}

/// Versions recorded for an installed instance.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct VersionsInfo {
    pub java_version: u32,
    pub mine_version: String,
    #[serde(default)]
    pub cli_version: CliVersion,
}

impl VersionsInfo {
    /// Reads `versions.json` from an instance root.
    ///
    /// Returns `Ok(None)` when the instance has no versions file.
    pub fn load(instance_root: &Path) -> Result<Option<Self>> {
        let path = instance_root.join(VERSIONS_FILE_NAME);
        if !path.is_file() {
            return Ok(None);
        }

        let content = fs::read_to_string(&path)?;
        let info: VersionsInfo = serde_json::from_str(&content)?;
        Ok(Some(info))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_load_versions_file() {
        let temp_dir = TempDir::new().unwrap();
        fs::write(
            temp_dir.path().join(VERSIONS_FILE_NAME),
            r#"{"java_version":21,"mine_version":"1.21.4","cli_version":{"version":"0.3.0","commit":"abc123","build_date":"2024-12-01"}}"#,
        )
        .unwrap();

        let info = VersionsInfo::load(temp_dir.path()).unwrap().unwrap();
        assert_eq!(info.java_version, 21);
        assert_eq!(info.mine_version, "1.21.4");
        assert_eq!(info.cli_version.commit, "abc123");
    }

    #[test]
    fn test_missing_versions_file() {
        let temp_dir = TempDir::new().unwrap();
        assert!(VersionsInfo::load(temp_dir.path()).unwrap().is_none());
    }

    #[test]
    fn test_malformed_versions_file() {
        let temp_dir = TempDir::new().unwrap();
        fs::write(temp_dir.path().join(VERSIONS_FILE_NAME), "not json").unwrap();
        assert!(VersionsInfo::load(temp_dir.path()).is_err());
    }
}
