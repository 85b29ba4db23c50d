//! Application configuration constants and the persisted configuration record.

use crate::error::{AppError, Result};
use crate::file_utils::PathExt;
use log::{debug, warn};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

/// Supported image file extensions for scanning directories.
pub const SUPPORTED_IMAGE_EXTENSIONS: [&str; 6] = ["jpg", "jpeg", "png", "gif", "bmp", "webp"];

/// Edge length of the square box thumbnails are fitted into.
pub const THUMBNAIL_SIZE: u32 = 180;

/// Number of decoded full-size images kept for the preview pane.
pub const PREVIEW_CACHE_CAPACITY: usize = 10;

/// Display name of the collection that always exists and cannot be closed.
pub const DEFAULT_COLLECTION_NAME: &str = "[Default Collection]";

/// Prefix used for the main window title.
pub const TITLE_PREFIX: &str = "thumbsort - image gallery organizer";

const CONFIG_FILE_NAME: &str = ".thumbsort.json";

/// Settings that survive restarts.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AppConfig {
    pub last_opened_dir: Option<PathBuf>,
}

impl AppConfig {
    /// Location of the configuration file in the user's home directory.
    pub fn default_path() -> Option<PathBuf> {
        directories::BaseDirs::new().map(|dirs| dirs.home_dir().join(CONFIG_FILE_NAME))
    }

    /// Reads the configuration, falling back to defaults when the file
    /// is missing or unreadable.
    pub fn load_from(path: &Path) -> Self {
        match Self::try_load_from(path) {
            Ok(config) => config,
            Err(e) => {
                debug!("Using default configuration: {}", e);
                Self::default()
            }
        }
    }

    fn try_load_from(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&content)?)
    }

    /// Writes the configuration as pretty-printed JSON, creating the parent directory.
    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                fs::create_dir_all(parent)?;
            }
        }
        let content = serde_json::to_string_pretty(self)?;
        fs::write(path, content).map_err(AppError::from)
    }
}

/// Holds the live configuration and where it is persisted.
///
/// An in-memory store (no path) never touches the file system.
pub struct ConfigStore {
    path: Option<PathBuf>,
    config: Mutex<AppConfig>,
}

impl ConfigStore {
    /// Loads the store from the default per-user location.
    pub fn load_default() -> Self {
        match AppConfig::default_path() {
            Some(path) => Self::load(path),
            None => {
                warn!("Could not determine home directory; settings will not be saved");
                Self::in_memory(AppConfig::default())
            }
        }
    }

    pub fn load(path: PathBuf) -> Self {
        let config = AppConfig::load_from(&path);
        Self {
            path: Some(path),
            config: Mutex::new(config),
        }
    }

    pub fn in_memory(config: AppConfig) -> Self {
        Self {
            path: None,
            config: Mutex::new(config),
        }
    }

    pub fn snapshot(&self) -> AppConfig {
        self.config
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    pub fn last_opened_dir(&self) -> Option<PathBuf> {
        self.snapshot().last_opened_dir
    }

    /// Records a successfully opened directory and persists it.
    ///
    /// Save failures are logged and otherwise ignored.
    pub fn remember_directory(&self, dir: &Path) {
        let config = {
            let mut config = self.config.lock().unwrap_or_else(|e| e.into_inner());
            config.last_opened_dir = Some(dir.to_path_buf());
            config.clone()
        };

        if let Some(path) = &self.path {
            if let Err(e) = config.save_to(path) {
                warn!("Failed to save configuration to {}: {}", path.format_for_log(), e);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_file_yields_default() {
        let dir = tempfile::tempdir().unwrap();
        let config = AppConfig::load_from(&dir.path().join("absent.json"));
        assert_eq!(config, AppConfig::default());
    }

    #[test]
    fn corrupt_file_yields_default() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        fs::write(&path, "{ not json").unwrap();
        assert_eq!(AppConfig::load_from(&path), AppConfig::default());
    }

    #[test]
    fn remembered_directory_survives_reload() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.json");

        let store = ConfigStore::load(path.clone());
        store.remember_directory(Path::new("/photos/holiday"));

        let content = fs::read_to_string(&path).unwrap();
        assert!(content.contains("lastOpenedDir"));

        let reloaded = ConfigStore::load(path);
        assert_eq!(
            reloaded.last_opened_dir(),
            Some(PathBuf::from("/photos/holiday"))
        );
    }

    #[test]
    fn unknown_fields_are_ignored() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        fs::write(&path, r#"{"lastOpenedDir":"/a","windowWidth":1200}"#).unwrap();
        assert_eq!(
            AppConfig::load_from(&path).last_opened_dir,
            Some(PathBuf::from("/a"))
        );
    }

    #[test]
    fn save_failure_is_swallowed() {
        let dir = tempfile::tempdir().unwrap();
        // A directory where the file should be makes the write fail.
        let path = dir.path().join("config.json");
        fs::create_dir(&path).unwrap();

        let store = ConfigStore::load(path);
        store.remember_directory(Path::new("/x"));
        assert_eq!(store.last_opened_dir(), Some(PathBuf::from("/x")));
    }
}
