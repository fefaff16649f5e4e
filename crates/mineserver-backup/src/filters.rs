//! Backup eligibility rules for instance files.
//!
//! The exclusion policy is an ordered rule table. Each rule is a pure
//! predicate over one filesystem entry, so the policy can be tested without
//! walking a real tree. The first matching rule wins.

use std::fmt;
use std::path::Path;

/// Instance subdirectories that are regenerable and never backed up.
pub const EXCLUDED_SUBTREES: &[&str] = &["java", "libraries", "versions", "crash-reports"];

/// File name suffixes treated as logs.
pub const LOG_SUFFIXES: &[&str] = &[".log", ".log.gz"];

/// Process id file written by the start script.
pub const PID_FILE_NAME: &str = "server.pid";

/// One exclusion rule of the backup policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExclusionRule {
    /// The instance root itself
    Root,
    /// Directories (implied by member names)
    Directory,
    /// `*.log` and `*.log.gz`
    LogFile,
    /// Embedded Java runtime under `java/`
    JavaRuntime,
    /// Downloaded libraries under `libraries/`
    Libraries,
    /// Server jars under `versions/`
    Versions,
    /// Crash reports under `crash-reports/`
    CrashReports,
    /// `server.pid`
    ProcessId,
}

/// The complete exclusion policy, in evaluation order.
pub const EXCLUSION_RULES: &[ExclusionRule] = &[
    ExclusionRule::Root,
    ExclusionRule::Directory,
    ExclusionRule::LogFile,
    ExclusionRule::JavaRuntime,
    ExclusionRule::Libraries,
    ExclusionRule::Versions,
    ExclusionRule::CrashReports,
    ExclusionRule::ProcessId,
];

/// A filesystem entry under an instance root, as seen by the classifier.
#[derive(Debug, Clone, Copy)]
pub struct EntryInfo<'a> {
    pub root: &'a Path,
    pub path: &'a Path,
    pub name: &'a str,
    pub is_dir: bool,
}

impl<'a> EntryInfo<'a> {
    pub fn new(root: &'a Path, path: &'a Path, name: &'a str, is_dir: bool) -> Self {
        Self {
            root,
            path,
            name,
            is_dir,
        }
    }
}

impl ExclusionRule {
    /// Returns true if this rule excludes the entry.
    pub fn matches(&self, entry: &EntryInfo<'_>) -> bool {
        match self {
            Self::Root => entry.path == entry.root,
            Self::Directory => entry.is_dir,
            Self::LogFile => LOG_SUFFIXES.iter().any(|s| entry.name.ends_with(s)),
            Self::JavaRuntime => under(entry, "java"),
            Self::Libraries => under(entry, "libraries"),
            Self::Versions => under(entry, "versions"),
            Self::CrashReports => under(entry, "crash-reports"),
            Self::ProcessId => entry.name == PID_FILE_NAME,
        }
    }

    /// Short human readable reason, used in debug logs.
    pub fn reason(&self) -> &'static str {
        match self {
            Self::Root => "instance root",
            Self::Directory => "directory",
            Self::LogFile => "log file",
            Self::JavaRuntime => "java runtime",
            Self::Libraries => "libraries",
            Self::Versions => "server versions",
            Self::CrashReports => "crash report",
            Self::ProcessId => "pid file",
        }
    }
}

impl fmt::Display for ExclusionRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.reason())
    }
}

/// Raw prefix check against `root/<subtree>`. Not component-wise, so
/// `javascript.txt` and `versions.json` at the root also match.
fn under(entry: &EntryInfo<'_>, subtree: &str) -> bool {
    has_prefix(entry.path, &entry.root.join(subtree))
}

fn has_prefix(path: &Path, prefix: &Path) -> bool {
    path.as_os_str()
        .as_encoded_bytes()
        .starts_with(prefix.as_os_str().as_encoded_bytes())
}

/// Outcome of classifying one entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Classification {
    Include,
    Exclude(ExclusionRule),
}

impl Classification {
    pub fn is_included(&self) -> bool {
        matches!(self, Self::Include)
    }
}

/// Classifies an entry against [`EXCLUSION_RULES`].
pub fn classify(entry: &EntryInfo<'_>) -> Classification {
    EXCLUSION_RULES
        .iter()
        .find(|rule| rule.matches(entry))
        .map(|rule| Classification::Exclude(*rule))
        .unwrap_or(Classification::Include)
}

/// Returns true if the entry becomes an archive member.
pub fn is_eligible(root: &Path, path: &Path, name: &str, is_dir: bool) -> bool {
    classify(&EntryInfo::new(root, path, name, is_dir)).is_included()
}

/// Returns true for directories whose whole subtree is excluded, letting the
/// walker skip them without changing which files are selected.
pub fn prunes_subtree(root: &Path, dir: &Path) -> bool {
    EXCLUDED_SUBTREES
        .iter()
        .any(|subtree| has_prefix(dir, &root.join(subtree)))
}
