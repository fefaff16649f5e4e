//! # mineserver-core
//!
//! Core library for the mineserver CLI providing:
//! - Layered configuration loading (embedded defaults, config file, environment)
//! - Path resolution with tilde expansion
//! - Instance metadata types shared by the installer and the backup system

pub mod config;
pub mod error;
pub mod types;
pub mod utils;

pub use config::HierarchicalConfigLoader;
pub use error::{Error, Result};
pub use types::{AppConfig, BackupConfig, LogFormat, VersionsInfo};
pub use utils::{absolute_path, expand_path, get_home_dir};
