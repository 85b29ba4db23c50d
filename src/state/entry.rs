//! A single image within a collection.

use crate::file_utils;
use crate::image_loader::{self, Thumbnail};
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, RwLock};

/// Shared handle to an entry. The owning collection's list is the only place
/// an entry lives; other holders (events, the loading task) just refer to it.
pub type EntryRef = Arc<ImageEntry>;

pub struct ImageEntry {
    path: PathBuf,
    thumbnail: RwLock<Arc<Thumbnail>>,
    active: AtomicBool,
}

impl ImageEntry {
    /// Creates an inactive entry showing the placeholder thumbnail.
    pub fn new(path: impl Into<PathBuf>) -> EntryRef {
        Arc::new(Self {
            path: path.into(),
            thumbnail: RwLock::new(image_loader::placeholder()),
            active: AtomicBool::new(false),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn label(&self) -> String {
        file_utils::display_name(&self.path)
    }

    pub fn thumbnail(&self) -> Arc<Thumbnail> {
        self.thumbnail
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    pub fn has_placeholder(&self) -> bool {
        self.thumbnail().is_placeholder()
    }

    /// Replaces the thumbnail. Must only be called from the UI loop.
    pub fn set_thumbnail(&self, thumbnail: Arc<Thumbnail>) {
        *self.thumbnail.write().unwrap_or_else(|e| e.into_inner()) = thumbnail;
    }

    pub fn is_active(&self) -> bool {
        self.active.load(Ordering::Acquire)
    }

    pub(crate) fn set_active(&self, active: bool) {
        self.active.store(active, Ordering::Release);
    }
}

impl fmt::Debug for ImageEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ImageEntry")
            .field("path", &self.path)
            .field("active", &self.is_active())
            .finish()
    }
}
