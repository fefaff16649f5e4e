//! Hierarchical configuration loader with precedence
//!
//! Loads configuration from multiple sources with the following precedence (low to high):
//! 1. Embedded defaults (built into binary)
//! 2. Global config (~/.mineserver/config.yaml) or an explicit `--config` file
//! 3. Environment variables (MINESERVER_* prefix)
//! 4. CLI flags (handled by caller)

use crate::error::{Error, Result};
use crate::types::{AppConfig, LogFormat};
use crate::utils::get_app_dir;
use camino::{Utf8Path, Utf8PathBuf};
use rust_embed::RustEmbed;
use serde::de::DeserializeOwned;
use std::env;
use std::fs;

/// Embedded configuration files
#[derive(RustEmbed)]
#[folder = "$CARGO_MANIFEST_DIR/../../embedded/config/"]
#[prefix = ""]
struct EmbeddedConfigs;

/// Name of the global configuration file inside the config directory
pub const CONFIG_FILE_NAME: &str = "config.yaml";

/// Configuration hierarchy loader
pub struct HierarchicalConfigLoader {
    /// Base directory for configuration files
    config_dir: Utf8PathBuf,
}

impl HierarchicalConfigLoader {
    /// Create a loader rooted at the standard config directory (~/.mineserver)
    pub fn new() -> Result<Self> {
        let app_dir = get_app_dir()?;
        let config_dir = Utf8PathBuf::from_path_buf(app_dir).map_err(|p| {
            Error::invalid_config(format!("Config directory is not valid UTF-8: {:?}", p))
        })?;
        Ok(Self { config_dir })
    }

    /// Create a loader with a custom config directory
    pub fn with_dir(config_dir: Utf8PathBuf) -> Self {
        Self { config_dir }
    }

    /// Load the application configuration.
    ///
    /// A config file replaces the embedded defaults as a whole; keys it omits
    /// fall back to the serde defaults, which mirror `defaults.yaml`. When
    /// `explicit` is given the file must exist; otherwise the global config
    /// file is used only if present.
    pub fn load(&self, explicit: Option<&Utf8Path>) -> Result<AppConfig> {
        let mut config = Self::load_embedded_config::<AppConfig>("defaults.yaml")?;

        match explicit {
            Some(path) => {
                if !path.is_file() {
                    return Err(Error::config_not_found(path.as_str()));
                }
                config = self.load_yaml_file::<AppConfig>(path)?;
            }
            None => {
                let global_path = self.config_dir.join(CONFIG_FILE_NAME);
                if global_path.is_file() {
                    config = self.load_yaml_file::<AppConfig>(&global_path)?;
                }
            }
        }

        config = self.apply_env_overrides(config)?;
        config.backup.compression_level = config.backup.compression_level.clamp(1, 9);

        tracing::debug!(config_dir = %self.config_dir, "configuration loaded");
        Ok(config)
    }

    /// Load an embedded configuration file
    fn load_embedded_config<T: DeserializeOwned>(filename: &str) -> Result<T> {
        let embedded_file = EmbeddedConfigs::get(filename).ok_or_else(|| {
            Error::config_not_found(format!("Embedded config not found: {}", filename))
        })?;

        let content = std::str::from_utf8(&embedded_file.data).map_err(|_| {
            Error::invalid_config(format!("Invalid UTF-8 in embedded config: {}", filename))
        })?;

        let config: T = serde_yaml_ng::from_str(content).map_err(|e| {
            Error::invalid_config(format!(
                "Failed to parse embedded config {}: {}",
                filename, e
            ))
        })?;

        Ok(config)
    }

    /// Load a YAML file and parse it
    fn load_yaml_file<T: DeserializeOwned>(&self, path: &Utf8Path) -> Result<T> {
        let content = fs::read_to_string(path)?;
        let config: T = serde_yaml_ng::from_str(&content)
            .map_err(|e| Error::invalid_config(format!("Failed to parse {}: {}", path, e)))?;
        Ok(config)
    }

    /// Apply environment variable overrides
    fn apply_env_overrides(&self, mut config: AppConfig) -> Result<AppConfig> {
        if let Ok(val) = env::var("MINESERVER_BACKUP_FOLDER") {
            config.backup.folder = val;
        }

        if let Ok(val) = env::var("MINESERVER_MAX_BACKUP_FILES") {
            config.backup.max_backup_files = val.parse().map_err(|_| {
                Error::invalid_config("MINESERVER_MAX_BACKUP_FILES must be a valid number")
            })?;
        }

        if let Ok(val) = env::var("MINESERVER_COMPRESSION_LEVEL") {
            config.backup.compression_level = val.parse().map_err(|_| {
                Error::invalid_config("MINESERVER_COMPRESSION_LEVEL must be a valid number")
            })?;
        }

        if let Ok(val) = env::var("MINESERVER_VERIFY_ON_RESTORE") {
            config.backup.verify_on_restore = val.parse().map_err(|_| {
                Error::invalid_config("MINESERVER_VERIFY_ON_RESTORE must be true or false")
            })?;
        }

        if let Ok(val) = env::var("MINESERVER_LOG_LEVEL") {
            config.logging.level = val;
        }

        if let Ok(val) = env::var("MINESERVER_LOG_FORMAT") {
            config.logging.format = LogFormat::parse(&val).ok_or_else(|| {
                Error::invalid_config("MINESERVER_LOG_FORMAT must be 'text' or 'json'")
            })?;
        }

        Ok(config)
    }

    /// Get the config directory path
    pub fn config_dir(&self) -> &Utf8Path {
        &self.config_dir
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use tempfile::TempDir;

    fn create_temp_loader() -> (HierarchicalConfigLoader, TempDir) {
        let temp_dir = TempDir::new().unwrap();
        let config_dir =
            Utf8PathBuf::from_path_buf(temp_dir.path().to_path_buf()).expect("Invalid UTF-8 path");
        let loader = HierarchicalConfigLoader::with_dir(config_dir);
        (loader, temp_dir)
    }

    #[test]
    #[serial]
    fn test_load_defaults() {
        let (loader, _temp) = create_temp_loader();
        let config = loader.load(None).unwrap();
        assert_eq!(config.backup.folder, ".backups");
        assert_eq!(config.backup.max_backup_files, 0);
        assert_eq!(config.backup.compression_level, 6);
        assert_eq!(config.logging.format, LogFormat::Text);
    }

    #[test]
    #[serial]
    fn test_load_from_global_file() {
        let (loader, _temp) = create_temp_loader();

        let config_content = r#"
backup:
  folder: "/srv/backups"
  max-backup-files: 7
  compression-level: 42
logging:
  level: "debug"
  format: "json"
"#;
        fs::write(loader.config_dir().join(CONFIG_FILE_NAME), config_content).unwrap();

        let config = loader.load(None).unwrap();
        assert_eq!(config.backup.folder, "/srv/backups");
        assert_eq!(config.backup.max_backup_files, 7);
        assert_eq!(config.backup.compression_level, 9);
        assert_eq!(config.logging.level, "debug");
        assert_eq!(config.logging.format, LogFormat::Json);
    }

    #[test]
    #[serial]
    fn test_explicit_file_must_exist() {
        let (loader, temp) = create_temp_loader();
        let missing = Utf8PathBuf::from_path_buf(temp.path().join("nope.yaml")).unwrap();
        let err = loader.load(Some(&missing)).unwrap_err();
        assert!(matches!(err, Error::ConfigNotFound { .. }));
    }

    #[test]
    #[serial]
    fn test_explicit_file_overrides_global() {
        let (loader, temp) = create_temp_loader();
        fs::write(
            loader.config_dir().join(CONFIG_FILE_NAME),
            "backup:\n  folder: global\n",
        )
        .unwrap();
        let explicit = Utf8PathBuf::from_path_buf(temp.path().join("custom.yaml")).unwrap();
        fs::write(&explicit, "backup:\n  folder: custom\n").unwrap();

        let config = loader.load(Some(&explicit)).unwrap();
        assert_eq!(config.backup.folder, "custom");
    }

    #[test]
    #[serial]
    fn test_invalid_yaml() {
        let (loader, _temp) = create_temp_loader();
        fs::write(
            loader.config_dir().join(CONFIG_FILE_NAME),
            "backup: [not, a, map",
        )
        .unwrap();
        assert!(loader.load(None).is_err());
    }

    #[test]
    #[serial]
    fn test_env_overrides() {
        let (loader, _temp) = create_temp_loader();

        env::set_var("MINESERVER_BACKUP_FOLDER", "/tmp/env-backups");
        env::set_var("MINESERVER_MAX_BACKUP_FILES", "5");
        env::set_var("MINESERVER_VERIFY_ON_RESTORE", "true");
        env::set_var("MINESERVER_LOG_FORMAT", "json");

        let config = loader.load(None).unwrap();
        assert_eq!(config.backup.folder, "/tmp/env-backups");
        assert_eq!(config.backup.max_backup_files, 5);
        assert!(config.backup.verify_on_restore);
        assert_eq!(config.logging.format, LogFormat::Json);

        env::remove_var("MINESERVER_BACKUP_FOLDER");
        env::remove_var("MINESERVER_MAX_BACKUP_FILES");
        env::remove_var("MINESERVER_VERIFY_ON_RESTORE");
        env::remove_var("MINESERVER_LOG_FORMAT");
    }

    #[test]
    #[serial]
    fn test_invalid_env_override() {
        let (loader, _temp) = create_temp_loader();

        env::set_var("MINESERVER_MAX_BACKUP_FILES", "lots");
        let result = loader.load(None);
        env::remove_var("MINESERVER_MAX_BACKUP_FILES");

        let err = result.unwrap_err();
        assert!(matches!(err, Error::InvalidConfig { .. }));
    }

    #[test]
    #[serial]
    fn test_negative_max_backup_files_from_env() {
        let (loader, _temp) = create_temp_loader();

        env::set_var("MINESERVER_MAX_BACKUP_FILES", "-1");
        let result = loader.load(None);
        env::remove_var("MINESERVER_MAX_BACKUP_FILES");

        let config = result.unwrap();
        assert_eq!(config.backup.max_backup_files, -1);
        assert_eq!(config.backup.rollover_limit(), None);
    }
}
