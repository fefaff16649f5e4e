//! Checksum manifest stored inside every backup archive.
//!
//! The manifest is the last member of the archive, named [`MANIFEST_FILENAME`].
//! It holds one line per archived file, in `sha256sum` layout:
//!
//! ```text
//! server.properties  3a7bd3e2360a3d29eea436fcfb7e44c735d117c42d1c1835420b6b9942dd4f1b
//! world/level.dat  e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855
//! ```
//!
//! Note the member name comes first, then two spaces, then the hex digest.

use std::collections::BTreeMap;
use std::fmt;

/// Name of the manifest member in the backup archive.
pub const MANIFEST_FILENAME: &str = "backup.sha256";

/// Separator between member name and digest.
const SEPARATOR: &str = "  ";

/// One manifest line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ManifestEntry {
    pub member_name: String,
    pub digest: String,
}

/// Ordered list of per-file digests, in archive write order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Manifest {
    entries: Vec<ManifestEntry>,
}

/// A manifest line that could not be parsed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ManifestParseError {
    pub line_number: usize,
    pub line: String,
}

impl fmt::Display for ManifestParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "malformed manifest line {}: {:?}",
            self.line_number, self.line
        )
    }
}

impl std::error::Error for ManifestParseError {}

impl Manifest {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends an entry for one archived file.
    pub fn push(&mut self, member_name: impl Into<String>, digest: impl Into<String>) {
        self.entries.push(ManifestEntry {
            member_name: member_name.into(),
            digest: digest.into(),
        });
    }

    pub fn entries(&self) -> &[ManifestEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Looks up the digest recorded for a member.
    pub fn digest_of(&self, member_name: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|e| e.member_name == member_name)
            .map(|e| e.digest.as_str())
    }

    /// Member name to digest map, for set comparisons.
    pub fn to_map(&self) -> BTreeMap<&str, &str> {
        self.entries
            .iter()
            .map(|e| (e.member_name.as_str(), e.digest.as_str()))
            .collect()
    }

    /// Renders the manifest in its on-disk text form.
    pub fn render(&self) -> String {
        let mut out = String::new();
        for entry in &self.entries {
            out.push_str(&entry.member_name);
            out.push_str(SEPARATOR);
            out.push_str(&entry.digest);
            out.push('\n');
        }
        out
    }

    /// Parses the on-disk text form. Blank lines are ignored.
    ///
    /// The digest is taken after the last separator so member names that
    /// contain two spaces still parse.
    pub fn parse(text: &str) -> Result<Self, ManifestParseError> {
        let mut manifest = Self::new();
        for (idx, line) in text.lines().enumerate() {
            if line.trim().is_empty() {
                continue;
            }
            let malformed = || ManifestParseError {
                line_number: idx + 1,
                line: line.to_string(),
            };
            let (name, digest) = line.rsplit_once(SEPARATOR).ok_or_else(malformed)?;
            if name.is_empty() || !is_hex_digest(digest) {
                return Err(malformed());
            }
            manifest.push(name, digest);
        }
        Ok(manifest)
    }
}

fn is_hex_digest(s: &str) -> bool {
    s.len() == 64 && s.bytes().all(|b| b.is_ascii_hexdigit())
}
