//! Shared utility functions for mineserver crates

use crate::error::{Error, Result};
use std::path::{Path, PathBuf};

/// Get the user's home directory
///
/// Prefers the HOME environment variable over dirs::home_dir() so that
/// service wrappers overriding HOME are respected.
pub fn get_home_dir() -> Result<PathBuf> {
    if let Ok(home) = std::env::var("HOME") {
        if !home.is_empty() {
            return Ok(PathBuf::from(home));
        }
    }

    dirs::home_dir().ok_or_else(|| Error::path_resolution("~", "Could not determine home directory"))
}

/// Get the mineserver application directory (~/.mineserver)
pub fn get_app_dir() -> Result<PathBuf> {
    Ok(get_home_dir()?.join(".mineserver"))
}

/// Expands a leading `~` to the user's home directory.
///
/// Only `~` and `~/...` are expanded; `~user` forms are returned unchanged.
pub fn expand_path(path: &str) -> Result<PathBuf> {
    if path == "~" {
        return get_home_dir();
    }

    match path.strip_prefix("~/") {
        Some(rest) => Ok(get_home_dir()?.join(rest)),
        None => Ok(PathBuf::from(path)),
    }
}

/// Expands `~` and makes the path absolute against the current directory.
///
/// The path is not required to exist and symlinks are not resolved.
pub fn absolute_path(path: &str) -> Result<PathBuf> {
    if path.is_empty() {
        return Err(Error::path_resolution(path, "path is empty"));
    }

    let expanded = expand_path(path)?;
    std::path::absolute(&expanded)
        .map(|p| normalize(&p))
        .map_err(|e| Error::path_resolution(path, e.to_string()))
}

/// Removes `.` components and trailing separators without touching the filesystem.
fn normalize(path: &Path) -> PathBuf {
    path.components()
        .filter(|c| !matches!(c, std::path::Component::CurDir))
        .collect()
}
