//! Pre-flight checks and manifest verification for restore operations

use crate::error::{BackupError, Result};
use crate::manifest::Manifest;
use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::io;
use std::path::{Component, Path, PathBuf};
use tracing::{debug, info};

/// Digest placeholder for members absent on one side of the comparison.
pub const MISSING_DIGEST: &str = "<missing>";

#[derive(Debug, Clone, Default)]
pub struct RestoreOptions {
    /// Recompute every restored file's digest and compare it to `backup.sha256`
    pub verify: bool,

    /// Whether to show progress bars
    pub show_progress: bool,
}

impl RestoreOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_verify(mut self, verify: bool) -> Self {
        self.verify = verify;
        self
    }

    pub fn with_progress(mut self, show_progress: bool) -> Self {
        self.show_progress = show_progress;
        self
    }
}

/// Checks the archive is an existing regular file and the destination, if it
/// exists, is a directory.
pub fn validate_restore_preconditions(archive: &Path, destination: &Path) -> Result<()> {
    info!(archive = %archive.display(), "validating restore preconditions");

    let metadata = fs::metadata(archive)
        .map_err(|e| BackupError::archive_read(archive, "opening archive", e))?;
    if !metadata.is_file() {
        return Err(BackupError::archive_read(
            archive,
            "opening archive",
            io::Error::new(io::ErrorKind::InvalidInput, "not a regular file"),
        ));
    }
    debug!("backup file exists");

    if destination.exists() && !destination.is_dir() {
        return Err(BackupError::NotADirectory {
            path: destination.to_path_buf(),
        });
    }
    debug!("destination usable");

    Ok(())
}

/// Strips leading `/` and `\` so root-anchored member names resolve
/// below the destination like relative ones.
pub fn normalize_member_name(name: &str) -> &str {
    name.trim_start_matches(['/', '\\'])
}

/// Maps a member name to a path relative to the destination root.
///
/// Returns `None` for names that would escape the root: `..` components,
/// drive prefixes or an empty path.
pub fn member_relative_path(name: &str) -> Option<PathBuf> {
    let normalized = normalize_member_name(name);
    let mut relative = PathBuf::new();
    for part in normalized.split(['/', '\\']) {
        if part.is_empty() || part == "." {
            continue;
        }
        if part == ".." || part.contains(':') {
            return None;
        }
        match Path::new(part).components().next() {
            Some(Component::Normal(c)) => relative.push(c),
            _ => return None,
        }
    }
    (!relative.as_os_str().is_empty()).then_some(relative)
}

/// Tracks strict verification of restored members against the manifest.
#[derive(Debug)]
pub struct ManifestVerifier {
    /// Normalized member name to digest
    expected: BTreeMap<String, String>,
    seen: BTreeSet<String>,
}

impl ManifestVerifier {
    pub fn new(manifest: Manifest) -> Self {
        let expected = manifest
            .entries()
            .iter()
            .map(|e| (normalize_member_name(&e.member_name).to_string(), e.digest.clone()))
            .collect();
        Self {
            expected,
            seen: BTreeSet::new(),
        }
    }

    /// Compares one restored member's digest with the manifest. Leading
    /// separators are ignored on both sides.
    pub fn check(&mut self, member: &str, actual: &str) -> Result<()> {
        let member = normalize_member_name(member);
        let expected = self
            .expected
            .get(member)
            .map(String::as_str)
            .unwrap_or(MISSING_DIGEST);
        if !expected.eq_ignore_ascii_case(actual) {
            return Err(BackupError::ManifestMismatch {
                member: member.to_string(),
                expected: expected.to_string(),
                actual: actual.to_string(),
            });
        }
        self.seen.insert(member.to_string());
        Ok(())
    }

    /// Fails if the manifest lists a member that was not restored.
    /// Returns the number of verified members.
    pub fn finish(self) -> Result<usize> {
        if let Some((member, digest)) = self
            .expected
            .iter()
            .find(|(member, _)| !self.seen.contains(*member))
        {
            return Err(BackupError::ManifestMismatch {
                member: member.clone(),
                expected: digest.clone(),
                actual: MISSING_DIGEST.to_string(),
            });
        }
        Ok(self.seen.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    const DIGEST: &str = "b94d27b9934d3e08a52e52d7da7dabfac484efe37a5380ee9088f7ace2efcde9";

    #[test]
    fn test_preconditions_missing_archive() {
        let temp_dir = TempDir::new().unwrap();
        let err = validate_restore_preconditions(
            &temp_dir.path().join("missing_2024-01-01_00-00-00_backup.zip"),
            temp_dir.path(),
        )
        .unwrap_err();
        assert!(matches!(err, BackupError::ArchiveRead { .. }));
    }

    #[test]
    fn test_preconditions_archive_is_directory() {
        let temp_dir = TempDir::new().unwrap();
        let err = validate_restore_preconditions(temp_dir.path(), temp_dir.path()).unwrap_err();
        assert!(matches!(err, BackupError::ArchiveRead { .. }));
    }

    #[test]
    fn test_preconditions_destination_is_file() {
        let temp_dir = TempDir::new().unwrap();
        let archive = temp_dir.path().join("a.zip");
        fs::write(&archive, b"zip").unwrap();

        let err = validate_restore_preconditions(&archive, &archive).unwrap_err();
        assert!(matches!(err, BackupError::NotADirectory { .. }));

        validate_restore_preconditions(&archive, &temp_dir.path().join("new-instance")).unwrap();
    }

    #[test]
    fn test_verifier_accepts_matching_members() {
        let mut manifest = Manifest::new();
        manifest.push("server.properties", DIGEST);
        let mut verifier = ManifestVerifier::new(manifest);

        verifier.check("server.properties", DIGEST).unwrap();
        assert_eq!(verifier.finish().unwrap(), 1);
    }

    #[test]
    fn test_verifier_rejects_changed_content() {
        let mut manifest = Manifest::new();
        manifest.push("server.properties", DIGEST);
        let mut verifier = ManifestVerifier::new(manifest);

        let err = verifier.check("server.properties", &"0".repeat(64)).unwrap_err();
        assert!(matches!(err, BackupError::ManifestMismatch { ref member, .. } if member == "server.properties"));
    }

    #[test]
    fn test_verifier_rejects_unlisted_member() {
        let mut verifier = ManifestVerifier::new(Manifest::new());
        let err = verifier.check("extra.txt", DIGEST).unwrap_err();
        assert!(matches!(err, BackupError::ManifestMismatch { ref expected, .. } if expected == MISSING_DIGEST));
    }

    #[test]
    fn test_verifier_ignores_leading_separator() {
        let mut manifest = Manifest::new();
        manifest.push("/server.properties", DIGEST);
        let mut verifier = ManifestVerifier::new(manifest);

        verifier.check("server.properties", DIGEST).unwrap();
        assert_eq!(verifier.finish().unwrap(), 1);
    }

    #[test]
    fn test_member_relative_path() {
        assert_eq!(
            member_relative_path("/server.properties"),
            Some(PathBuf::from("server.properties"))
        );
        assert_eq!(
            member_relative_path("\\world\\level.dat"),
            Some(PathBuf::from("world").join("level.dat"))
        );
        assert_eq!(
            member_relative_path("world/./region/r.0.0.mca"),
            Some(PathBuf::from("world/region/r.0.0.mca"))
        );
        assert_eq!(member_relative_path("../escape.txt"), None);
        assert_eq!(member_relative_path("/world/../../escape.txt"), None);
        assert_eq!(member_relative_path("C:/Windows/evil.dll"), None);
        assert_eq!(member_relative_path("/"), None);
    }

    #[test]
    fn test_verifier_reports_missing_member() {
        let mut manifest = Manifest::new();
        manifest.push("world/level.dat", DIGEST);
        let verifier = ManifestVerifier::new(manifest);

        let err = verifier.finish().unwrap_err();
        assert!(matches!(err, BackupError::ManifestMismatch { ref actual, .. } if actual == MISSING_DIGEST));
    }
}
