//! Restore system
//!
//! Unpacks a backup archive onto an instance directory. Restore is an
//! overlay: existing files are overwritten, files absent from the archive
//! are left alone. The `backup.sha256` member is restored like any other
//! file and only checked when strict verification is requested.

use crate::cancel::{self, CancellableReader};
use crate::checksum::ChecksumWriter;
use crate::error::{zip_to_io, BackupError, Result};
use crate::manifest::{Manifest, MANIFEST_FILENAME};
use crate::progress::RestoreProgress;
use std::fs::{self, File};
use std::io::{BufReader, BufWriter, ErrorKind, Read, Seek, Write};
use std::path::Path;
use std::time::{Duration, Instant};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use zip::ZipArchive;

pub mod validation;

pub use validation::{
    member_relative_path, normalize_member_name, validate_restore_preconditions,
    ManifestVerifier, RestoreOptions,
};

const COPY_BUFFER_SIZE: usize = 64 * 1024;

const S_IFMT: u32 = 0o170000;
const S_IFLNK: u32 = 0o120000;

#[derive(Debug, Clone)]
pub struct RestoreResult {
    /// Members written to the destination, the manifest included
    pub restored: usize,

    /// Members checked against the manifest (0 unless verifying)
    pub verified: usize,

    pub bytes_written: u64,
    pub duration: Duration,
}

pub struct RestoreManager {
    options: RestoreOptions,
    cancel: CancellationToken,
}

impl RestoreManager {
    pub fn new(options: RestoreOptions) -> Self {
        Self::with_cancel(options, CancellationToken::new())
    }

    pub fn with_cancel(options: RestoreOptions, cancel: CancellationToken) -> Self {
        Self { options, cancel }
    }

    /// Extracts every member of `archive_path` below `destination`.
    ///
    /// Stops at the first failure; members already written stay on disk.
    pub fn restore(&self, archive_path: &Path, destination: &Path) -> Result<RestoreResult> {
        let start = Instant::now();

        info!(
            archive = %archive_path.display(),
            destination = %destination.display(),
            verify = self.options.verify,
            "starting restore"
        );

        validate_restore_preconditions(archive_path, destination)?;

        let file = File::open(archive_path)
            .map_err(|e| BackupError::archive_read(archive_path, "opening archive", e))?;
        let mut archive = ZipArchive::new(BufReader::new(file)).map_err(|e| {
            BackupError::archive_read(archive_path, "reading central directory", zip_to_io(e))
        })?;

        fs::create_dir_all(destination).map_err(|e| {
            BackupError::destination_write(destination, "creating destination root", e)
        })?;

        let verifier = if self.options.verify {
            Some(ManifestVerifier::new(read_manifest(&mut archive, archive_path)?))
        } else {
            None
        };

        let mut progress = self.options.show_progress.then(|| {
            let mut p = RestoreProgress::new();
            p.start_extract(archive.len() as u64, "Unpacking...");
            p
        });

        let extracted =
            self.extract_all(&mut archive, archive_path, destination, verifier, &mut progress);

        if let Some(ref progress) = progress {
            progress.finish_all();
        }

        let (restored, verified, bytes_written) = extracted?;
        let duration = start.elapsed();

        info!(
            restored,
            verified,
            bytes_written,
            duration_ms = duration.as_millis() as u64,
            "restore complete"
        );

        Ok(RestoreResult {
            restored,
            verified,
            bytes_written,
            duration,
        })
    }

    fn extract_all<R: Read + Seek>(
        &self,
        archive: &mut ZipArchive<R>,
        archive_path: &Path,
        destination: &Path,
        mut verifier: Option<ManifestVerifier>,
        progress: &mut Option<RestoreProgress>,
    ) -> Result<(usize, usize, u64)> {
        let mut restored = 0;
        let mut bytes_written = 0;

        for i in 0..archive.len() {
            cancel::check(&self.cancel)?;

            let mut member = archive.by_index(i).map_err(|e| {
                BackupError::archive_read(archive_path, format!("reading member #{i}"), zip_to_io(e))
            })?;
            let name = member.name().to_string();

            if member.is_dir() && normalize_member_name(&name).is_empty() {
                continue;
            }
            let relative = member_relative_path(&name)
                .ok_or_else(|| BackupError::UnsafeMemberName { name: name.clone() })?;
            let target = destination.join(relative);

            if member.is_dir() {
                fs::create_dir_all(&target).map_err(|e| {
                    BackupError::destination_write(&target, "creating directory", e)
                })?;
                continue;
            }

            let mode = member.unix_mode();
            if is_symlink(mode) {
                warn!(member = %name, "skipping symlink member");
                continue;
            }

            let (digest, bytes) = self
                .extract_member(&mut member, mode, archive_path, &name, &target)
                .map_err(|e| cancel::or_cancelled(&self.cancel, e))?;

            if let Some(ref mut verifier) = verifier {
                if normalize_member_name(&name) != MANIFEST_FILENAME {
                    verifier.check(&name, &digest)?;
                }
            }

            debug!(member = %name, bytes, "restored");
            restored += 1;
            bytes_written += bytes;

            if let Some(progress) = progress.as_ref() {
                progress.inc_extract();
            }
        }

        let verified = match verifier {
            Some(verifier) => verifier.finish()?,
            None => 0,
        };

        if let Some(progress) = progress.as_ref() {
            progress.finish_extract(&format!("Restored {restored} files"));
        }

        Ok((restored, verified, bytes_written))
    }

    /// Streams one member to `target`, returning its digest and size.
    fn extract_member<M: Read>(
        &self,
        member: M,
        mode: Option<u32>,
        archive_path: &Path,
        name: &str,
        target: &Path,
    ) -> Result<(String, u64)> {
        if let Some(parent) = target.parent() {
            fs::create_dir_all(parent).map_err(|e| {
                BackupError::destination_write(parent, "creating parent directories", e)
            })?;
        }

        let output = File::create(target)
            .map_err(|e| BackupError::destination_write(target, "creating file", e))?;
        let mut writer = ChecksumWriter::new(BufWriter::new(output));
        let mut reader = CancellableReader::new(member, &self.cancel);

        let mut buf = vec![0u8; COPY_BUFFER_SIZE];
        loop {
            let n = match reader.read(&mut buf) {
                Ok(0) => break,
                Ok(n) => n,
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) => {
                    return Err(BackupError::archive_read(
                        archive_path,
                        format!("reading member {name}"),
                        e,
                    ))
                }
            };
            writer
                .write_all(&buf[..n])
                .map_err(|e| BackupError::destination_write(target, "writing file", e))?;
        }

        let bytes = writer.bytes_written();
        let digest = writer
            .finish()
            .map_err(|e| BackupError::destination_write(target, "flushing file", e))?;

        #[cfg(not(unix))]
        let _ = mode;
        #[cfg(unix)]
        if let Some(mode) = mode.map(|m| m & 0o777).filter(|m| *m != 0) {
            use std::os::unix::fs::PermissionsExt;
            fs::set_permissions(target, fs::Permissions::from_mode(mode)).map_err(|e| {
                BackupError::destination_write(target, "setting permissions", e)
            })?;
        }

        Ok((digest, bytes))
    }
}

/// Reads and parses the manifest member without extracting it.
fn read_manifest<R: Read + Seek>(
    archive: &mut ZipArchive<R>,
    archive_path: &Path,
) -> Result<Manifest> {
    let mut member = match archive.by_name(MANIFEST_FILENAME) {
        Ok(member) => member,
        Err(zip::result::ZipError::FileNotFound) => {
            return Err(BackupError::ManifestMissing {
                archive: archive_path.to_path_buf(),
            })
        }
        Err(e) => {
            return Err(BackupError::archive_read(
                archive_path,
                "reading manifest",
                zip_to_io(e),
            ))
        }
    };

    let mut text = String::new();
    member
        .read_to_string(&mut text)
        .map_err(|e| BackupError::archive_read(archive_path, "reading manifest", e))?;

    Manifest::parse(&text).map_err(|e| {
        BackupError::archive_read(
            archive_path,
            "parsing manifest",
            std::io::Error::new(ErrorKind::InvalidData, e),
        )
    })
}

/// Archives written by other tools may store symlinks as members.
fn is_symlink(mode: Option<u32>) -> bool {
    mode.is_some_and(|mode| mode & S_IFMT == S_IFLNK)
}
