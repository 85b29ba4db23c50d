//! Preview pane model and full-size image loading.
//!
//! Uses `rayon::spawn` for decoding and [`UiDispatcher`] to hand results back
//! to the UI loop, checking the LRU cache first for instant display.

use crate::error::Result;
use crate::events::{ActiveEntryChanged, EventBus, PreviewFailed, PreviewLoaded};
use crate::file_utils::PathExt;
use crate::image_cache::ImageCache;
use crate::image_loader::{ImageCodec, Thumbnail, load_image_blocking};
use crate::state::{AppState, CollectionRegistry};
use crate::ui::UiDispatcher;
use log::{debug, error};
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};

/// How the preview image is sized.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DisplayMode {
    /// Fit the viewport, following its size.
    #[default]
    Dynamic,
    /// Fixed zoom given by the current [`ScaleRatio`].
    Fixed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub enum ScaleRatio {
    Scale25,
    Scale50,
    Scale75,
    #[default]
    Scale100,
    Scale125,
    Scale150,
    Scale200,
    Scale300,
    Scale400,
}

impl ScaleRatio {
    pub const ALL: [ScaleRatio; 9] = [
        ScaleRatio::Scale25,
        ScaleRatio::Scale50,
        ScaleRatio::Scale75,
        ScaleRatio::Scale100,
        ScaleRatio::Scale125,
        ScaleRatio::Scale150,
        ScaleRatio::Scale200,
        ScaleRatio::Scale300,
        ScaleRatio::Scale400,
    ];

    pub fn ratio(self) -> f64 {
        match self {
            ScaleRatio::Scale25 => 0.25,
            ScaleRatio::Scale50 => 0.5,
            ScaleRatio::Scale75 => 0.75,
            ScaleRatio::Scale100 => 1.0,
            ScaleRatio::Scale125 => 1.25,
            ScaleRatio::Scale150 => 1.5,
            ScaleRatio::Scale200 => 2.0,
            ScaleRatio::Scale300 => 3.0,
            ScaleRatio::Scale400 => 4.0,
        }
    }

    /// Next larger ratio, wrapping from 400% back to 25%.
    pub fn next(self) -> Self {
        let index = Self::ALL.iter().position(|r| *r == self).unwrap_or(0);
        Self::ALL[(index + 1) % Self::ALL.len()]
    }

    /// Parses a percentage such as `"150"` or `"150%"`.
    pub fn from_percent(text: &str) -> Option<Self> {
        let percent: u32 = text.trim().trim_end_matches('%').parse().ok()?;
        Self::ALL
            .into_iter()
            .find(|r| (r.ratio() * 100.0).round() as u32 == percent)
    }
}

impl fmt::Display for ScaleRatio {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}%", (self.ratio() * 100.0).round() as u32)
    }
}

/// Size and origin of the image shown in the preview pane.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PreviewImage {
    pub path: PathBuf,
    pub width: u32,
    pub height: u32,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct PreviewState {
    mode: DisplayMode,
    scale: ScaleRatio,
    image: Option<PreviewImage>,
}

impl PreviewState {
    pub fn mode(&self) -> DisplayMode {
        self.mode
    }

    pub fn scale(&self) -> ScaleRatio {
        self.scale
    }

    pub fn image(&self) -> Option<&PreviewImage> {
        self.image.as_ref()
    }

    pub fn set_mode(&mut self, mode: DisplayMode) {
        self.mode = mode;
    }

    pub fn set_scale(&mut self, scale: ScaleRatio) {
        self.scale = scale;
    }

    pub fn set_image(&mut self, image: Option<PreviewImage>) {
        self.image = image;
    }

    /// Double click: dynamic switches to fixed at 100%, fixed goes back to dynamic.
    pub fn toggle_display_mode(&mut self) {
        match self.mode {
            DisplayMode::Dynamic => {
                self.mode = DisplayMode::Fixed;
                self.scale = ScaleRatio::Scale100;
            }
            DisplayMode::Fixed => self.mode = DisplayMode::Dynamic,
        }
    }

    /// On-screen size of the current image for a viewport of the given size.
    pub fn displayed_size(&self, viewport_width: f64, viewport_height: f64) -> Option<(f64, f64)> {
        let image = self.image.as_ref()?;
        if image.width == 0 || image.height == 0 {
            return Some((0.0, 0.0));
        }
        let (width, height) = (image.width as f64, image.height as f64);

        match self.mode {
            DisplayMode::Dynamic => {
                let factor = (viewport_width / width).min(viewport_height / height).max(0.0);
                Some((width * factor, height * factor))
            }
            DisplayMode::Fixed => {
                let ratio = self.scale.ratio();
                Some((width * ratio, height * ratio))
            }
        }
    }
}

/// Keeps the preview pane in step with the focused collection's active entry.
pub struct PreviewService {
    registry: Arc<Mutex<CollectionRegistry>>,
    bus: EventBus,
    ui: UiDispatcher,
    codec: Arc<dyn ImageCodec>,
    cache: Arc<Mutex<ImageCache>>,
    state: Mutex<PreviewState>,
    current: Mutex<Option<Arc<Thumbnail>>>,
    requested: Mutex<Option<PathBuf>>,
}

impl PreviewService {
    pub fn install(app: &AppState) -> Arc<Self> {
        let service = Arc::new(Self {
            registry: app.registry.clone(),
            bus: app.bus.clone(),
            ui: app.ui.clone(),
            codec: app.codec.clone(),
            cache: app.image_cache.clone(),
            state: Mutex::new(PreviewState::default()),
            current: Mutex::new(None),
            requested: Mutex::new(None),
        });

        let weak = Arc::downgrade(&service);
        app.bus.subscribe(move |event: &ActiveEntryChanged| {
            if let Some(service) = weak.upgrade() {
                service.on_active_changed(event);
            }
        });
        service
    }

    fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
        mutex.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn state(&self) -> PreviewState {
        Self::lock(&self.state).clone()
    }

    /// Decoded pixels of the image currently shown.
    pub fn current_image(&self) -> Option<Arc<Thumbnail>> {
        Self::lock(&self.current).clone()
    }

    pub fn toggle_display_mode(&self) -> DisplayMode {
        let mut state = Self::lock(&self.state);
        state.toggle_display_mode();
        state.mode()
    }

    pub fn set_scale(&self, scale: ScaleRatio) {
        let mut state = Self::lock(&self.state);
        state.set_mode(DisplayMode::Fixed);
        state.set_scale(scale);
    }

    pub fn next_scale(&self) -> ScaleRatio {
        let mut state = Self::lock(&self.state);
        let next = state.scale().next();
        state.set_mode(DisplayMode::Fixed);
        state.set_scale(next);
        next
    }

    fn on_active_changed(self: &Arc<Self>, event: &ActiveEntryChanged) {
        let neighbours = {
            let registry = Self::lock(&self.registry);
            if registry.current_key() != event.collection {
                return;
            }
            registry
                .get(event.collection)
                .map(|collection| {
                    let entries = collection.entries();
                    let prev = event.index.checked_sub(1).and_then(|i| entries.get(i));
                    let next = entries.get(event.index + 1);
                    prev.into_iter()
                        .chain(next)
                        .map(|entry| entry.path().to_path_buf())
                        .collect::<Vec<_>>()
                })
                .unwrap_or_default()
        };

        self.show(event.entry.path());
        self.preload(neighbours);
    }

    /// Shows `path` in the preview pane, decoding it in the background on a cache miss.
    pub fn show(self: &Arc<Self>, path: &Path) {
        *Self::lock(&self.requested) = Some(path.to_path_buf());

        let cached = Self::lock(&self.cache).get(path);
        if let Some(image) = cached {
            self.apply(path.to_path_buf(), Ok(image));
            return;
        }

        let service = self.clone();
        let path = path.to_path_buf();
        rayon::spawn(move || {
            debug!("Decoding preview {}", path.format_for_log());
            let result = load_image_blocking(service.codec.as_ref(), &path).map(Arc::new);
            let ui_service = service.clone();
            service.ui.invoke_from_ui_loop(move || {
                if let Ok(image) = &result {
                    Self::lock(&ui_service.cache).put(path.clone(), image.clone());
                }
                ui_service.apply(path, result);
            });
        });
    }

    fn apply(&self, path: PathBuf, result: Result<Arc<Thumbnail>>) {
        if Self::lock(&self.requested).as_deref() != Some(path.as_path()) {
            debug!("Dropping stale preview {}", path.format_for_log());
            return;
        }

        match result {
            Ok(image) => {
                let (width, height) = (image.width, image.height);
                Self::lock(&self.state).set_image(Some(PreviewImage {
                    path: path.clone(),
                    width,
                    height,
                }));
                *Self::lock(&self.current) = Some(image);
                self.bus.publish(PreviewLoaded {
                    path,
                    width,
                    height,
                });
            }
            Err(e) => {
                error!("Failed to load preview: {}", e);
                Self::lock(&self.state).set_image(None);
                *Self::lock(&self.current) = None;
                self.bus.publish(PreviewFailed {
                    path,
                    message: e.to_string(),
                });
            }
        }
    }

    /// Decodes neighbouring images into the cache. Errors are ignored.
    fn preload(&self, paths: Vec<PathBuf>) {
        for path in paths {
            if Self::lock(&self.cache).contains(&path) {
                continue;
            }
            let cache = self.cache.clone();
            let codec = self.codec.clone();
            rayon::spawn(move || {
                if let Ok(image) = load_image_blocking(codec.as_ref(), &path) {
                    Self::lock(&cache).put(path, Arc::new(image));
                }
            });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::testing::{FakeCodec, app_state, pump_until, record};
    use crate::state::{CollectionKey, EntryRef, ImageEntry};
    use crate::ui::UiLoop;

    #[test]
    fn scale_cycles_and_defaults_to_100() {
        assert_eq!(ScaleRatio::default(), ScaleRatio::Scale100);
        assert_eq!(ScaleRatio::Scale100.next(), ScaleRatio::Scale125);
        assert_eq!(ScaleRatio::Scale400.next(), ScaleRatio::Scale25);
        assert_eq!(ScaleRatio::Scale150.to_string(), "150%");
        assert_eq!(ScaleRatio::from_percent("75%"), Some(ScaleRatio::Scale75));
        assert_eq!(ScaleRatio::from_percent("80"), None);
    }

    #[test]
    fn double_click_toggles_mode() {
        let mut state = PreviewState::default();
        state.set_scale(ScaleRatio::Scale300);
        state.toggle_display_mode();
        assert_eq!(state.mode(), DisplayMode::Fixed);
        assert_eq!(state.scale(), ScaleRatio::Scale100);
        state.toggle_display_mode();
        assert_eq!(state.mode(), DisplayMode::Dynamic);
    }

    #[test]
    fn displayed_size_follows_mode() {
        let mut state = PreviewState::default();
        assert_eq!(state.displayed_size(800.0, 600.0), None);

        state.set_image(Some(PreviewImage {
            path: PathBuf::from("/a.png"),
            width: 400,
            height: 200,
        }));
        assert_eq!(state.displayed_size(800.0, 600.0), Some((800.0, 400.0)));
        assert_eq!(state.displayed_size(200.0, 600.0), Some((200.0, 100.0)));

        state.set_mode(DisplayMode::Fixed);
        state.set_scale(ScaleRatio::Scale50);
        assert_eq!(state.displayed_size(800.0, 600.0), Some((200.0, 100.0)));
    }

    fn setup(names: &[&str]) -> (AppState, UiLoop, Arc<PreviewService>, Vec<EntryRef>) {
        let (state, ui_loop) = app_state(Arc::new(FakeCodec));
        let service = PreviewService::install(&state);
        let entries: Vec<EntryRef> = names
            .iter()
            .map(|name| ImageEntry::new(format!("/pics/{}", name)))
            .collect();
        {
            let mut registry = state.registry.lock().unwrap();
            let default = registry.get_mut(CollectionKey::Default).unwrap();
            for entry in &entries {
                default.add(entry.clone(), false);
            }
        }
        (state, ui_loop, service, entries)
    }

    fn activate(state: &AppState, key: CollectionKey, entry: &EntryRef) {
        let change = {
            let mut registry = state.registry.lock().unwrap();
            registry.get_mut(key).unwrap().set_active(entry)
        };
        if let Some(change) = change {
            state.bus.publish(change);
        }
    }

    #[test]
    fn active_change_loads_preview() {
        let (state, ui_loop, service, entries) = setup(&["a.png", "b.png"]);
        let loaded = record::<PreviewLoaded>(&state.bus);

        activate(&state, CollectionKey::Default, &entries[0]);
        pump_until(&ui_loop, || !loaded.lock().unwrap().is_empty());

        let loaded = loaded.lock().unwrap();
        assert_eq!(loaded[0].path, PathBuf::from("/pics/a.png"));
        assert_eq!((loaded[0].width, loaded[0].height), (4, 2));
        assert_eq!(service.state().image().unwrap().width, 4);
        assert!(service.current_image().is_some());
    }

    #[test]
    fn cached_preview_is_shown_immediately() {
        let (state, _ui_loop, service, entries) = setup(&["a.png"]);
        state.image_cache.lock().unwrap().put(
            PathBuf::from("/pics/a.png"),
            Arc::new(Thumbnail::new(vec![0; 3], 1, 1)),
        );
        let loaded = record::<PreviewLoaded>(&state.bus);

        activate(&state, CollectionKey::Default, &entries[0]);
        assert_eq!(loaded.lock().unwrap().len(), 1);
        assert_eq!(service.state().image().unwrap().width, 1);
    }

    #[test]
    fn decode_failure_publishes_preview_failed() {
        let (state, ui_loop, service, entries) = setup(&["corrupt.png"]);
        let failed = record::<PreviewFailed>(&state.bus);

        activate(&state, CollectionKey::Default, &entries[0]);
        pump_until(&ui_loop, || !failed.lock().unwrap().is_empty());
        assert!(service.state().image().is_none());
    }

    #[test]
    fn only_latest_request_is_applied() {
        let (state, ui_loop, _service, entries) = setup(&["a.png", "b.png"]);
        let loaded = record::<PreviewLoaded>(&state.bus);

        activate(&state, CollectionKey::Default, &entries[0]);
        activate(&state, CollectionKey::Default, &entries[1]);
        pump_until(&ui_loop, || !loaded.lock().unwrap().is_empty());
        ui_loop.run_pending();

        let loaded = loaded.lock().unwrap();
        assert_eq!(loaded.len(), 1);
        assert_eq!(loaded[0].path, PathBuf::from("/pics/b.png"));
    }

    #[test]
    fn changes_outside_focused_collection_are_ignored() {
        let (state, ui_loop, service, entries) = setup(&["a.png"]);
        let entry = entries[0].clone();
        {
            let mut registry = state.registry.lock().unwrap();
            registry.transfer(CollectionKey::Default, CollectionKey::Numbered(2), &entry);
        }
        activate(&state, CollectionKey::Numbered(2), &entry);
        ui_loop.run_next(std::time::Duration::from_millis(100));
        assert!(service.state().image().is_none());
    }
}
