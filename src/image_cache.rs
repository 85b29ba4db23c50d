//! Preview cache for fast navigation.
//!
//! Keeps recently decoded full-size previews under an LRU policy so stepping
//! back and forth through a collection shows them instantly.

use crate::file_utils::PathExt;
use crate::image_loader::Thumbnail;
use lru::LruCache;
use std::num::NonZeroUsize;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// LRU cache of decoded preview images keyed by file path.
pub struct ImageCache {
    cache: LruCache<PathBuf, Arc<Thumbnail>>,
}

impl ImageCache {
    /// Creates a cache holding at most `capacity` images (at least one).
    pub fn new(capacity: usize) -> Self {
        Self {
            cache: LruCache::new(NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN)),
        }
    }

    pub fn get(&mut self, path: &Path) -> Option<Arc<Thumbnail>> {
        let result = self.cache.get(path).cloned();
        if result.is_some() {
            log::debug!("Cache HIT: {}", path.format_for_log());
        } else {
            log::debug!("Cache MISS: {}", path.format_for_log());
        }
        result
    }

    pub fn put(&mut self, path: PathBuf, image: Arc<Thumbnail>) {
        log::debug!(
            "Cache PUT: {} ({}x{})",
            path.format_for_log(),
            image.width,
            image.height
        );
        self.cache.put(path, image);
    }

    pub fn contains(&self, path: &Path) -> bool {
        self.cache.contains(path)
    }

    pub fn len(&self) -> usize {
        self.cache.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cache.is_empty()
    }
}
