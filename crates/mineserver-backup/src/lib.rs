//! Minecraft server instance backups
//!
//! This crate backs up, restores and prunes Minecraft server instances.
//! A backup is a single zip archive holding every eligible instance file plus
//! a `backup.sha256` manifest with the SHA-256 digest of each file.
//!
//! # Features
//!
//! ## Backup
//! - **Fixed exclusion policy**: logs, the bundled Java runtime, downloaded
//!   libraries and server jars, crash reports and `server.pid` are skipped
//! - **Streaming**: files are hashed while they are compressed
//! - **Self-describing names**: `{instance}_{YYYY-MM-DD_hh-mm-ss}_backup.zip`
//!
//! ## Restore
//! - **Overlay semantics**: existing files are overwritten, nothing is deleted
//! - **Traversal safety**: members escaping the destination are rejected
//! - **Optional strict mode**: restored files are checked against the manifest
//!
//! ## Retention
//! - **Per-instance rollover**: keeps the newest `N` backups, deleting oldest first
//!
//! # Examples
//!
//! ```no_run
//! use mineserver_backup::{BackupService, BackupSettings};
//!
//! fn main() -> mineserver_backup::Result<()> {
//!     let service = BackupService::new(BackupSettings::default());
//!
//!     let backup = service.backup("~/servers/survival", "~/backups")?;
//!     println!("Backup created: {}", backup.path.display());
//!
//!     service.rollover_backup_files("~/backups", &backup.name, 5)?;
//!     Ok(())
//! }
//! ```

mod cancel;

pub mod archive;
pub mod checksum;
pub mod error;
pub mod filters;
pub mod manifest;
pub mod naming;
pub mod progress;
pub mod restore;
pub mod retention;
pub mod service;

// Re-export commonly used types
pub use archive::{ArchiveBuilder, ArchiveConfig, FileToBackup, PackResult, DEFAULT_COMPRESSION_LEVEL};
pub use checksum::calculate_checksum;
pub use error::{BackupError, Result};
pub use filters::{classify, is_eligible, Classification, EntryInfo, ExclusionRule, EXCLUSION_RULES};
pub use manifest::{Manifest, ManifestEntry, MANIFEST_FILENAME};
pub use naming::{
    decode_backup_file_name, encode_backup_file_name, scan_backup_dir, BackupInfo,
    BackupsMapping, DecodedName, BACKUP_FILE_SUFFIX, TIMESTAMP_FORMAT,
};
pub use progress::{BackupProgress, RestoreProgress};
pub use restore::{RestoreManager, RestoreOptions, RestoreResult};
pub use retention::{delete_backups, rollover, select_for_deletion, RolloverResult};
pub use service::{BackupService, BackupSettings};

/// Re-exported so callers can build cancellable services without a direct dependency.
pub use tokio_util::sync::CancellationToken;

/// Library version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
