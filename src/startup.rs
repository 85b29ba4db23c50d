//! Decides which directory to open when the application starts.

use crate::config::ConfigStore;
use crate::file_utils::PathExt;
use crate::services::LoadingService;
use log::{info, warn};
use std::ffi::OsString;
use std::path::PathBuf;

/// First non-flag argument, if it names a directory.
fn startup_directory_from_args(args: impl IntoIterator<Item = OsString>) -> Option<PathBuf> {
    args.into_iter()
        .filter(|arg| !arg.to_string_lossy().starts_with('-'))
        .map(PathBuf::from)
        .find(|path| path.is_dir())
}

/// Directory to open at startup: the command line wins over the remembered one.
pub fn startup_directory(
    args: impl IntoIterator<Item = OsString>,
    config: &ConfigStore,
) -> Option<PathBuf> {
    startup_directory_from_args(args).or_else(|| {
        config
            .last_opened_dir()
            .filter(|dir| dir.is_dir())
            .inspect(|dir| info!("Reopening last directory {}", dir.format_for_log()))
    })
}

pub fn configure_startup_opening(loading: &LoadingService, config: &ConfigStore) {
    let Some(dir) = startup_directory(std::env::args_os().skip(1), config) else {
        return;
    };
    if let Err(e) = loading.open_directory(&dir) {
        warn!("Failed to open startup directory: {}", e);
    }
}
