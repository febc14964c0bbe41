//! Utility functions for string formatting and file system operations.
//!
//! This module provides helper functions used throughout the application:
//! - String truncation for logging
//! - Title casing for report names
//! - Directory listing by file-name pattern
//! - File system validation for output directories

use crate::error::{Error, Result};
use std::fs as stdfs;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{debug, info, instrument};

/// Truncate a string for logging purposes.
///
/// Long strings are truncated to at most `max` bytes (on a character
/// boundary) with an ellipsis and byte count indicator appended.
///
/// # Examples
///
/// ```ignore
/// assert_eq!(truncate_for_log("short", 100), "short");
/// assert_eq!(truncate_for_log(&"a".repeat(500), 10), "aaaaaaaaaa…(+490 bytes)");
/// ```
pub fn truncate_for_log(s: &str, max: usize) -> String {
    if s.len() <= max {
        return s.to_string();
    }
    let mut cut = max;
    while !s.is_char_boundary(cut) {
        cut -= 1;
    }
    format!("{}…(+{} bytes)", &s[..cut], s.len() - cut)
}

/// Capitalize the first character of every whitespace-separated word and
/// lowercase the rest.
///
/// # Examples
///
/// ```ignore
/// assert_eq!(title_case("aggregate report"), "Aggregate Report");
/// assert_eq!(title_case("AGGREGATE"), "Aggregate");
/// ```
pub fn title_case(s: &str) -> String {
    s.split(' ')
        .map(|word| {
            let mut c = word.chars();
            match c.next() {
                None => String::new(),
                Some(f) => f.to_uppercase().collect::<String>() + &c.as_str().to_lowercase(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

/// List the files in `dir` whose name starts with `prefix` and ends with
/// `.{extension}`, sorted by name.
///
/// # Errors
///
/// [`Error::MissingInput`] if `dir` does not exist.
#[instrument(level = "debug", skip(dir), fields(dir = %dir.display()))]
pub async fn list_files(dir: &Path, prefix: &str, extension: &str) -> Result<Vec<PathBuf>> {
    if !fs::try_exists(dir).await? {
        return Err(Error::MissingInput(dir.to_path_buf()));
    }
    let suffix = format!(".{extension}");
    let mut entries = fs::read_dir(dir).await?;
    let mut files = Vec::new();
    while let Some(entry) = entries.next_entry().await? {
        let name = entry.file_name();
        let Some(name) = name.to_str() else { continue };
        if name.starts_with(prefix) && name.ends_with(&suffix) && entry.file_type().await?.is_file() {
            files.push(entry.path());
        }
    }
    files.sort();
    debug!(count = files.len(), "Listed files");
    Ok(files)
}

/// Fail with [`Error::MissingInput`] unless `path` exists.
pub async fn require_exists(path: &Path) -> Result<()> {
    if fs::try_exists(path).await? {
        Ok(())
    } else {
        Err(Error::MissingInput(path.to_path_buf()))
    }
}

/// Create the parent directory of `path` if needed.
pub async fn ensure_parent_dir(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent).await?;
        }
    }
    Ok(())
}

/// Ensure a directory exists and is writable.
///
/// This function creates the directory if it doesn't exist, then performs
/// a write test by creating and immediately deleting a probe file.
///
/// # Errors
///
/// Returns an error if:
/// - The directory cannot be created
/// - The directory is not writable (permission denied, read-only filesystem, etc.)
#[instrument(level = "info", skip_all, fields(path = %path.display()))]
pub async fn ensure_writable_dir(path: &Path) -> Result<()> {
    fs::create_dir_all(path).await?;
    // Try a small sync write using std fs (simpler error surface)
    let probe_path = path.join("..__probe_write__");
    stdfs::File::create(&probe_path)?;
    let _ = stdfs::remove_file(&probe_path);
    info!("Output directory is writable");
    Ok(())
}
