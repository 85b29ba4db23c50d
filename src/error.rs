//! Unified error types for the gallery organizer.

use crate::state::CollectionKey;
use std::path::PathBuf;
use thiserror::Error;

/// Application-specific errors.
#[derive(Debug, Error)]
pub enum AppError {
    /// The directory could not be enumerated (vanished, no permission, ...)
    #[error("Failed to scan directory {path:?}: {source}")]
    DirectoryScan {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Not a directory: {0:?}")]
    NotADirectory(PathBuf),
    /// Error loading or decoding an image file
    #[error("Failed to load image {path:?}: {message}")]
    ImageLoad { path: PathBuf, message: String },
    #[error("Collection {0} cannot load directories")]
    NotLoadable(CollectionKey),
    #[error("Unknown collection {0}")]
    UnknownCollection(CollectionKey),
    #[error("Collection {0} cannot be closed")]
    CannotClose(CollectionKey),
    #[error("Dropped payload rejected: {0}")]
    InvalidDrop(String),
    #[error("Configuration I/O error: {0}")]
    ConfigIo(#[from] std::io::Error),
    #[error("Configuration format error: {0}")]
    ConfigFormat(#[from] serde_json::Error),
}

impl AppError {
    pub fn image_load(path: impl Into<PathBuf>, err: impl std::fmt::Display) -> Self {
        AppError::ImageLoad {
            path: path.into(),
            message: err.to_string(),
        }
    }
}

/// Type alias for Results in this application.
pub type Result<T> = std::result::Result<T, AppError>;
