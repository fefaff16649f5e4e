//! Application configuration types
//!
//! Defines the settings that drive backups, restores and logging.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Complete application configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "kebab-case")]
pub struct AppConfig {
    /// Backup, restore and retention settings
    #[serde(default)]
    pub backup: BackupConfig,

    /// Logging settings
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Backup configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "kebab-case")]
pub struct BackupConfig {
    /// Folder backups are written to and scanned from
    #[serde(default = "default_backup_folder")]
    pub folder: String,

    /// Maximum number of backups kept per instance (0 or less disables rollover)
    #[serde(default)]
    pub max_backup_files: i64,

    /// Deflate compression level (1-9)
    #[serde(default = "default_compression_level")]
    pub compression_level: u32,

    /// Verify restored files against the archive manifest
    #[serde(default)]
    pub verify_on_restore: bool,

    /// Show progress bars for long operations
    #[serde(default = "default_show_progress")]
    pub show_progress: bool,
}

impl Default for BackupConfig {
    fn default() -> Self {
        Self {
            folder: default_backup_folder(),
            max_backup_files: 0,
            compression_level: default_compression_level(),
            verify_on_restore: false,
            show_progress: default_show_progress(),
        }
    }
}

impl BackupConfig {
    /// Number of backups to keep, or `None` when rollover is off.
    pub fn rollover_limit(&self) -> Option<usize> {
        usize::try_from(self.max_backup_files).ok().filter(|n| *n > 0)
    }
}

fn default_backup_folder() -> String {
    ".backups".to_string()
}
fn default_compression_level() -> u32 {
    6
}
fn default_show_progress() -> bool {
    true
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "kebab-case")]
pub struct LoggingConfig {
    /// Default level filter (error, warn, info, debug, trace)
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Output format
    #[serde(default)]
    pub format: LogFormat,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: LogFormat::default(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

/// Log output format
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Human readable lines
    #[default]
    Text,
    /// One JSON object per event
    Json,
}

impl LogFormat {
    /// Parse a format name, case-insensitively.
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "text" => Some(Self::Text),
            "json" => Some(Self::Json),
            _ => None,
        }
    }
}

impl fmt::Display for LogFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Text => write!(f, "text"),
            Self::Json => write!(f, "json"),
        }
    }
}
