//! Type definitions shared across mineserver crates

mod app_config;
mod instance;

pub use app_config::{AppConfig, BackupConfig, LogFormat, LoggingConfig};
pub use instance::{CliVersion, VersionsInfo, VERSIONS_FILE_NAME};
