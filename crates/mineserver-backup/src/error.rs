//! Error types for backup, restore and rollover operations.

use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Result type alias using mineserver-backup's error type
pub type Result<T> = std::result::Result<T, BackupError>;

/// Errors produced by the backup subsystem.
///
/// Every I/O variant carries the path involved and the phase that failed,
/// and keeps the underlying cause reachable through `source()`.
#[derive(Error, Debug)]
pub enum BackupError {
    /// A user supplied path could not be expanded or made absolute
    #[error("Failed to resolve path '{path}': {message}")]
    PathResolution { path: String, message: String },

    /// Creating, writing or closing the output archive failed
    #[error("Failed to write archive {archive} ({context})")]
    ArchiveWrite {
        archive: PathBuf,
        context: String,
        #[source]
        source: io::Error,
    },

    /// Opening or reading the source archive failed
    #[error("Failed to read archive {archive} ({context})")]
    ArchiveRead {
        archive: PathBuf,
        context: String,
        #[source]
        source: io::Error,
    },

    /// Listing or stat-ing an entry of the instance tree failed
    #[error("Failed to walk {path}")]
    FilesystemWalk {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// Writing a restored file below the destination root failed
    #[error("Failed to restore {path} ({context})")]
    DestinationWrite {
        path: PathBuf,
        context: String,
        #[source]
        source: io::Error,
    },

    /// A required directory does not exist
    #[error("Directory not found: {path}")]
    DirectoryNotFound { path: PathBuf },

    /// A path that must be a directory is something else
    #[error("Not a directory: {path}")]
    NotADirectory { path: PathBuf },

    /// A backup file could not be removed during rollover
    #[error("Failed to delete backup {path}")]
    Deletion {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// An archive member would be written outside the destination root
    #[error("Refusing to restore unsafe archive member '{name}'")]
    UnsafeMemberName { name: String },

    /// Strict verification was requested but the archive has no manifest
    #[error("Archive {archive} has no checksum manifest")]
    ManifestMissing { archive: PathBuf },

    /// A restored file does not match its manifest digest
    #[error("Checksum mismatch for '{member}': expected {expected}, got {actual}")]
    ManifestMismatch {
        member: String,
        expected: String,
        actual: String,
    },

    /// The operation was cancelled by the caller
    #[error("Operation cancelled")]
    Cancelled,
}

impl BackupError {
    /// Create an archive write error
    pub fn archive_write(
        archive: impl Into<PathBuf>,
        context: impl Into<String>,
        source: io::Error,
    ) -> Self {
        Self::ArchiveWrite {
            archive: archive.into(),
            context: context.into(),
            source,
        }
    }

    /// Create an archive read error
    pub fn archive_read(
        archive: impl Into<PathBuf>,
        context: impl Into<String>,
        source: io::Error,
    ) -> Self {
        Self::ArchiveRead {
            archive: archive.into(),
            context: context.into(),
            source,
        }
    }

    /// Create a destination write error
    pub fn destination_write(
        path: impl Into<PathBuf>,
        context: impl Into<String>,
        source: io::Error,
    ) -> Self {
        Self::DestinationWrite {
            path: path.into(),
            context: context.into(),
            source,
        }
    }

    /// Returns true if this error is the result of cancellation.
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled)
    }
}

impl From<mineserver_core::Error> for BackupError {
    fn from(err: mineserver_core::Error) -> Self {
        match err {
            mineserver_core::Error::PathResolution { path, message } => {
                Self::PathResolution { path, message }
            }
            other => Self::PathResolution {
                path: String::new(),
                message: other.to_string(),
            },
        }
    }
}

/// Flattens a zip error into an `io::Error`, keeping I/O causes intact.
pub(crate) fn zip_to_io(err: zip::result::ZipError) -> io::Error {
    match err {
        zip::result::ZipError::Io(e) => e,
        other => io::Error::new(io::ErrorKind::InvalidData, other),
    }
}
