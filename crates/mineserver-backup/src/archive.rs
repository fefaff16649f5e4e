//! Archive creation for instance backups.
//!
//! This module walks an instance directory, applies the eligibility rules
//! from [`crate::filters`], and streams every eligible file into a zip
//! archive while hashing it. The checksum manifest is written as the final
//! member.

use crate::cancel::{self, CancellableReader};
use crate::checksum::ChecksumWriter;
use crate::error::{zip_to_io, BackupError, Result};
use crate::filters::{self, Classification, EntryInfo};
use crate::manifest::{Manifest, MANIFEST_FILENAME};
use crate::progress::BackupProgress;
use std::fs::{self, File};
use std::io::{self, BufReader, BufWriter, Write};
use std::path::{Component, Path, PathBuf};
use std::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use walkdir::WalkDir;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

/// Default compression level (6 = balanced speed/ratio).
pub const DEFAULT_COMPRESSION_LEVEL: u32 = 6;

/// Members at least this large need zip64 headers.
const LARGE_FILE_THRESHOLD: u64 = u32::MAX as u64;

/// A file selected for backup and the archive member it becomes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileToBackup {
    /// Absolute path of the source file
    pub source: PathBuf,

    /// Root-relative, `/`-separated member name
    pub member_name: String,

    /// Size in bytes at scan time
    pub size: u64,
}

/// Result of a pack operation.
#[derive(Debug, Clone)]
pub struct PackResult {
    /// Path to the created archive
    pub archive_path: PathBuf,

    /// Number of files archived (the manifest is not counted)
    pub file_count: usize,

    /// Sum of the archived files' sizes
    pub total_size_bytes: u64,

    /// Size of the archive on disk
    pub size_bytes: u64,

    /// Per-file digests, in member order
    pub manifest: Manifest,

    /// Duration of the operation in seconds
    pub duration_seconds: f64,
}

/// Configuration for archive creation.
#[derive(Debug, Clone)]
pub struct ArchiveConfig {
    /// Deflate compression level (1-9)
    pub compression_level: u32,

    /// Whether to show progress bars
    pub show_progress: bool,
}

impl Default for ArchiveConfig {
    fn default() -> Self {
        Self {
            compression_level: DEFAULT_COMPRESSION_LEVEL,
            show_progress: false,
        }
    }
}

impl ArchiveConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the compression level.
    pub fn with_compression_level(mut self, level: u32) -> Self {
        self.compression_level = level.clamp(1, 9);
        self
    }

    /// Sets whether to show progress.
    pub fn with_progress(mut self, show_progress: bool) -> Self {
        self.show_progress = show_progress;
        self
    }
}

/// Archive builder for creating backups.
pub struct ArchiveBuilder {
    config: ArchiveConfig,
    cancel: CancellationToken,
}

impl ArchiveBuilder {
    /// Creates an archive builder without cancellation support.
    pub fn new(config: ArchiveConfig) -> Self {
        Self::with_cancel(config, CancellationToken::new())
    }

    /// Creates an archive builder that aborts once `cancel` fires.
    pub fn with_cancel(config: ArchiveConfig, cancel: CancellationToken) -> Self {
        Self { config, cancel }
    }

    /// Packs `source_dir` into a new archive at `output_path`.
    ///
    /// An existing file at `output_path` is truncated. On failure the
    /// partially written archive is left on disk.
    pub fn create(&self, source_dir: &Path, output_path: &Path) -> Result<PackResult> {
        let start_time = Instant::now();

        info!(
            source = %source_dir.display(),
            archive = %output_path.display(),
            "packing instance"
        );

        let mut progress = if self.config.show_progress {
            let mut p = BackupProgress::new();
            p.start_scan("Scanning instance files...");
            Some(p)
        } else {
            None
        };

        let packed = self.pack(source_dir, output_path, &mut progress);

        if let Some(ref progress) = progress {
            progress.finish_all();
        }

        let (file_count, total_size_bytes, manifest) = packed?;

        let size_bytes = fs::metadata(output_path)
            .map_err(|e| BackupError::archive_write(output_path, "reading archive size", e))?
            .len();
        let duration_seconds = start_time.elapsed().as_secs_f64();

        info!(
            archive = %output_path.display(),
            files = file_count,
            size_bytes,
            "archive written"
        );

        Ok(PackResult {
            archive_path: output_path.to_path_buf(),
            file_count,
            total_size_bytes,
            size_bytes,
            manifest,
            duration_seconds,
        })
    }

    fn pack(
        &self,
        source_dir: &Path,
        output_path: &Path,
        progress: &mut Option<BackupProgress>,
    ) -> Result<(usize, u64, Manifest)> {
        let mut files = self.scan_directory(source_dir)?;

        // The archive cannot contain itself when written inside the instance.
        files.retain(|f| {
            let is_output = f.source == output_path;
            if is_output {
                debug!(path = %f.source.display(), "skipping the archive being written");
            }
            !is_output
        });

        if let Some(progress) = progress.as_mut() {
            progress.finish_scan(&format!("Found {} files to back up", files.len()));
            progress.start_archive(files.len() as u64, "Packing...");
        }

        let (total_size, manifest) = self.write_archive(output_path, &files, progress)?;

        if let Some(progress) = progress.as_ref() {
            progress.finish_archive(&format!("Packed {} files", files.len()));
        }

        Ok((files.len(), total_size, manifest))
    }

    /// Walks `source_dir` and returns the eligible files in walk order.
    ///
    /// Entries are visited sorted by file name, so the order is stable for
    /// a given tree.
    pub fn scan_directory(&self, source_dir: &Path) -> Result<Vec<FileToBackup>> {
        let mut files = Vec::new();

        let walker = WalkDir::new(source_dir)
            .follow_links(false)
            .sort_by_file_name()
            .into_iter()
            .filter_entry(|e| {
                !(e.file_type().is_dir() && filters::prunes_subtree(source_dir, e.path()))
            });

        for entry in walker {
            cancel::check(&self.cancel)?;

            let entry = entry.map_err(|e| walk_error(source_dir, e))?;
            let name = entry.file_name().to_string_lossy();
            let info = EntryInfo::new(source_dir, entry.path(), &name, entry.file_type().is_dir());

            if let Classification::Exclude(rule) = filters::classify(&info) {
                if !entry.file_type().is_dir() {
                    debug!(path = %entry.path().display(), reason = %rule, "excluded from backup");
                }
                continue;
            }

            // Follows symlinks: a link to a regular file is archived as that file.
            let metadata = fs::metadata(entry.path()).map_err(|e| BackupError::FilesystemWalk {
                path: entry.path().to_path_buf(),
                source: e,
            })?;
            if !metadata.is_file() {
                warn!(path = %entry.path().display(), "skipping entry that is not a regular file");
                continue;
            }

            let member_name = member_name(source_dir, entry.path()).ok_or_else(|| {
                BackupError::FilesystemWalk {
                    path: entry.path().to_path_buf(),
                    source: io::Error::new(
                        io::ErrorKind::InvalidData,
                        "path is not valid UTF-8 or not below the instance root",
                    ),
                }
            })?;

            files.push(FileToBackup {
                source: entry.path().to_path_buf(),
                member_name,
                size: metadata.len(),
            });
        }

        Ok(files)
    }

    /// Writes the members and the manifest. Returns the total bytes archived.
    fn write_archive(
        &self,
        output_path: &Path,
        files: &[FileToBackup],
        progress: &mut Option<BackupProgress>,
    ) -> Result<(u64, Manifest)> {
        let file = File::create(output_path)
            .map_err(|e| BackupError::archive_write(output_path, "creating archive file", e))?;

        // On early return the writer is dropped, which still writes the
        // central directory and closes the file.
        let mut zip = ZipWriter::new(BufWriter::new(file));
        let mut manifest = Manifest::new();
        let mut total_size = 0u64;

        for file in files {
            cancel::check(&self.cancel)?;

            let (digest, bytes) = self
                .append_file(&mut zip, file, output_path)
                .map_err(|e| cancel::or_cancelled(&self.cancel, e))?;

            manifest.push(file.member_name.as_str(), digest);
            total_size += bytes;

            if let Some(progress) = progress.as_ref() {
                progress.inc_archive();
            }
        }

        zip.start_file(MANIFEST_FILENAME, self.file_options(false))
            .map_err(|e| BackupError::archive_write(output_path, "adding manifest", zip_to_io(e)))?;
        zip.write_all(manifest.render().as_bytes())
            .map_err(|e| BackupError::archive_write(output_path, "writing manifest", e))?;

        let writer = zip
            .finish()
            .map_err(|e| BackupError::archive_write(output_path, "finalizing archive", zip_to_io(e)))?;
        let file = writer
            .into_inner()
            .map_err(|e| BackupError::archive_write(output_path, "flushing archive", e.into_error()))?;
        file.sync_all()
            .map_err(|e| BackupError::archive_write(output_path, "syncing archive", e))?;

        Ok((total_size, manifest))
    }

    /// Streams one file into a new member, returning its digest and size.
    fn append_file(
        &self,
        zip: &mut ZipWriter<BufWriter<File>>,
        file: &FileToBackup,
        archive: &Path,
    ) -> Result<(String, u64)> {
        let input = File::open(&file.source).map_err(|e| {
            BackupError::archive_write(archive, format!("opening {}", file.source.display()), e)
        })?;

        #[allow(unused_mut)]
        let mut options = self.file_options(file.size >= LARGE_FILE_THRESHOLD);
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            if let Ok(metadata) = input.metadata() {
                options = options.unix_permissions(metadata.permissions().mode() & 0o777);
            }
        }

        zip.start_file(file.member_name.as_str(), options)
            .map_err(|e| {
                BackupError::archive_write(
                    archive,
                    format!("adding member {}", file.member_name),
                    zip_to_io(e),
                )
            })?;

        let mut reader = CancellableReader::new(BufReader::new(input), &self.cancel);
        let mut writer = ChecksumWriter::new(&mut *zip);
        io::copy(&mut reader, &mut writer).map_err(|e| {
            BackupError::archive_write(
                archive,
                format!("copying {} into {}", file.source.display(), file.member_name),
                e,
            )
        })?;

        let bytes = writer.bytes_written();
        let digest = writer.finish().map_err(|e| {
            BackupError::archive_write(archive, format!("flushing member {}", file.member_name), e)
        })?;

        debug!(member = %file.member_name, bytes, "added to archive");
        Ok((digest, bytes))
    }

    fn file_options(&self, large_file: bool) -> SimpleFileOptions {
        SimpleFileOptions::default()
            .compression_method(CompressionMethod::Deflated)
            .compression_level(Some(self.config.compression_level as _))
            .large_file(large_file)
    }
}

/// Member name for `path` below `root`: relative, `/`-separated, no leading
/// separator. Returns `None` for the root itself, paths outside it, and
/// non UTF-8 names.
pub fn member_name(root: &Path, path: &Path) -> Option<String> {
    let relative = path.strip_prefix(root).ok()?;
    let mut parts = Vec::new();
    for component in relative.components() {
        match component {
            Component::Normal(part) => parts.push(part.to_str()?),
            Component::CurDir => {}
            _ => return None,
        }
    }

    if parts.is_empty() {
        None
    } else {
        Some(parts.join("/"))
    }
}

fn walk_error(root: &Path, err: walkdir::Error) -> BackupError {
    let path = err
        .path()
        .map(Path::to_path_buf)
        .unwrap_or_else(|| root.to_path_buf());
    BackupError::FilesystemWalk {
        path,
        source: err.into(),
    }
}
