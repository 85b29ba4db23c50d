use crate::config::SUPPORTED_IMAGE_EXTENSIONS;
use crate::error::{AppError, Result};
use std::fs;
use std::path::{Path, PathBuf};

/// Formatting helpers for paths in log output.
pub trait PathExt {
    fn format_for_log(&self) -> String;
}

impl PathExt for Path {
    fn format_for_log(&self) -> String {
        format!("\"{}\"", self.display())
    }
}

impl PathExt for PathBuf {
    fn format_for_log(&self) -> String {
        self.as_path().format_for_log()
    }
}

/// Returns true when the path has one of the supported image extensions.
///
/// Matching ignores ASCII case, so `photo.JPG` is accepted.
pub fn is_supported_image(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext_str| {
            SUPPORTED_IMAGE_EXTENSIONS
                .iter()
                .any(|supported| supported.eq_ignore_ascii_case(ext_str))
        })
        .unwrap_or(false)
}

/// Dot-files are treated as invisible.
fn is_hidden(path: &Path) -> bool {
    path.file_name()
        .and_then(|name| name.to_str())
        .is_some_and(|name| name.starts_with('.'))
}

/// Lists the supported, visible image files directly inside `dir`.
///
/// Files are returned in the order the file system enumerates them. Entries that
/// cannot be read individually are skipped; failing to open the directory itself
/// is an error.
pub fn scan_directory(dir: &Path) -> Result<Vec<PathBuf>> {
    if dir.exists() && !dir.is_dir() {
        return Err(AppError::NotADirectory(dir.to_path_buf()));
    }

    let entries = fs::read_dir(dir).map_err(|source| AppError::DirectoryScan {
        path: dir.to_path_buf(),
        source,
    })?;

    let image_files = entries
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.path())
        .filter(|path| path.is_file() && !is_hidden(path) && is_supported_image(path))
        .collect();

    Ok(image_files)
}

/// Validates a drag-and-drop payload: exactly one item, and it must be a directory.
pub fn validate_dropped_paths(paths: &[PathBuf]) -> Result<PathBuf> {
    match paths {
        [single] if single.is_dir() => Ok(single.clone()),
        [single] => Err(AppError::InvalidDrop(format!(
            "{} is not a directory",
            single.format_for_log()
        ))),
        _ => Err(AppError::InvalidDrop(format!(
            "expected exactly one directory, got {} items",
            paths.len()
        ))),
    }
}

/// File name shown under a thumbnail.
pub fn display_name(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.to_string_lossy().into_owned())
}
