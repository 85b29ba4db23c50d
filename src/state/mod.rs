//! State management for the gallery organizer.

use crate::config::{ConfigStore, PREVIEW_CACHE_CAPACITY};
use crate::events::EventBus;
use crate::image_cache::ImageCache;
use crate::image_loader::{ImageCodec, ImageCrateCodec};
use crate::ui::{GridViewport, UiDispatcher};
use std::sync::{Arc, Mutex};

pub mod collection;
pub mod entry;
pub mod registry;

pub use collection::{Collection, CollectionKey, GenerationMarker};
pub use entry::{EntryRef, ImageEntry};
pub use registry::{CollectionRegistry, TransferOutcome};

/// Application-wide state container.
#[derive(Clone)]
pub struct AppState {
    pub bus: EventBus,
    pub registry: Arc<Mutex<CollectionRegistry>>,
    /// Queue for work that must run on the UI loop.
    pub ui: UiDispatcher,
    pub config: Arc<ConfigStore>,
    pub codec: Arc<dyn ImageCodec>,
    /// LRU cache for decoded preview images.
    pub image_cache: Arc<Mutex<ImageCache>>,
    pub viewport: Arc<GridViewport>,
}

impl AppState {
    pub fn new(ui: UiDispatcher, config: ConfigStore) -> Self {
        Self::with_codec(ui, config, Arc::new(ImageCrateCodec))
    }

    pub fn with_codec(ui: UiDispatcher, config: ConfigStore, codec: Arc<dyn ImageCodec>) -> Self {
        Self {
            bus: EventBus::new(),
            registry: Arc::new(Mutex::new(CollectionRegistry::new())),
            ui,
            config: Arc::new(config),
            codec,
            image_cache: Arc::new(Mutex::new(ImageCache::new(PREVIEW_CACHE_CAPACITY))),
            viewport: Arc::new(GridViewport::default()),
        }
    }
}
