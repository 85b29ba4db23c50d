//! Background thumbnail loading for a directory.
//!
//! `open_directory` runs on the UI loop: it scans the directory, refills the
//! focused collection with placeholder entries and publishes `LoadingStarted`.
//! A [`ThumbnailLoadSession`] then decodes the files on a rayon worker and hands
//! every result back through the [`UiDispatcher`].
//!
//! Opening another directory on the same collection advances its generation
//! marker; the older session notices at its next per-file check and stops.
//! Results it already queued are dropped on the UI loop by the same check.

use crate::config::{ConfigStore, THUMBNAIL_SIZE};
use crate::error::{AppError, Result};
use crate::events::{EventBus, LoadingAlert, LoadingFinished, LoadingProgress, LoadingStarted, SessionId};
use crate::file_utils::{self, PathExt};
use crate::image_loader::{self, ImageCodec};
use crate::state::{AppState, CollectionRegistry, EntryRef, GenerationMarker, ImageEntry};
use crate::ui::UiDispatcher;
use log::{debug, error, info, warn};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

/// Opens directories into the focused collection.
#[derive(Clone)]
pub struct LoadingService {
    registry: Arc<Mutex<CollectionRegistry>>,
    bus: EventBus,
    ui: UiDispatcher,
    codec: Arc<dyn ImageCodec>,
    config: Arc<ConfigStore>,
    thumbnail_size: u32,
}

impl LoadingService {
    pub fn new(state: &AppState) -> Self {
        Self {
            registry: state.registry.clone(),
            bus: state.bus.clone(),
            ui: state.ui.clone(),
            codec: state.codec.clone(),
            config: state.config.clone(),
            thumbnail_size: THUMBNAIL_SIZE,
        }
    }

    /// Replaces the focused collection's contents with the images in `dir` and
    /// starts decoding their thumbnails in the background.
    ///
    /// Fails without publishing anything if the directory cannot be listed or the
    /// focused collection does not accept directory loads.
    pub fn open_directory(&self, dir: &Path) -> Result<SessionId> {
        let files = file_utils::scan_directory(dir)?;
        info!("Opening directory {} ({} images)", dir.format_for_log(), files.len());

        let (session_id, entries, marker) = {
            let mut registry = self.registry.lock().unwrap_or_else(|e| e.into_inner());
            let collection = registry.current_mut();
            if !collection.is_loadable() {
                return Err(AppError::NotLoadable(collection.key()));
            }

            let generation = collection.begin_load(dir);
            let entries: Vec<EntryRef> = files.into_iter().map(ImageEntry::new).collect();
            for entry in &entries {
                collection.add(entry.clone(), false);
            }

            let id = SessionId {
                collection: collection.key(),
                generation,
            };
            (id, entries, collection.marker().clone())
        };

        self.config.remember_directory(dir);

        let session = ThumbnailLoadSession::new(session_id, dir, entries, marker, self.thumbnail_size);
        self.bus.publish(LoadingStarted {
            session: session_id,
            directory: dir.to_path_buf(),
        });

        let codec = self.codec.clone();
        let ui = self.ui.clone();
        let bus = self.bus.clone();
        rayon::spawn(move || session.run(codec.as_ref(), &ui, &bus));

        Ok(session_id)
    }

    /// Opens a drag-and-drop payload; only a single directory is accepted.
    pub fn open_dropped(&self, paths: &[PathBuf]) -> Result<SessionId> {
        let dir = file_utils::validate_dropped_paths(paths)?;
        self.open_directory(&dir)
    }

    /// Whether the focused collection would accept a dropped payload.
    pub fn accepts_drop(&self, paths: &[PathBuf]) -> bool {
        let loadable = {
            let registry = self.registry.lock().unwrap_or_else(|e| e.into_inner());
            registry.current().is_loadable()
        };
        loadable && file_utils::validate_dropped_paths(paths).is_ok()
    }
}

/// One background run over a directory's entries.
pub struct ThumbnailLoadSession {
    id: SessionId,
    directory: PathBuf,
    entries: Vec<EntryRef>,
    marker: GenerationMarker,
    processed: AtomicUsize,
    error_alerted: AtomicBool,
    thumbnail_size: u32,
}

impl ThumbnailLoadSession {
    fn new(
        id: SessionId,
        directory: &Path,
        entries: Vec<EntryRef>,
        marker: GenerationMarker,
        thumbnail_size: u32,
    ) -> Self {
        Self {
            id,
            directory: directory.to_path_buf(),
            entries,
            marker,
            processed: AtomicUsize::new(0),
            error_alerted: AtomicBool::new(false),
            thumbnail_size,
        }
    }

    pub fn id(&self) -> SessionId {
        self.id
    }

    pub fn total(&self) -> usize {
        self.entries.len()
    }

    pub fn processed(&self) -> usize {
        self.processed.load(Ordering::Acquire)
    }

    pub fn is_superseded(&self) -> bool {
        !self.marker.is_current(self.id.generation)
    }

    fn run(&self, codec: &dyn ImageCodec, ui: &UiDispatcher, bus: &EventBus) {
        let _finished = FinishedNotice {
            session: self.id(),
            ui: ui.clone(),
            bus: bus.clone(),
        };
        let total = self.total();

        for entry in &self.entries {
            if self.is_superseded() {
                debug!(
                    "Session {:?} for {} superseded after {} of {} images",
                    self.id,
                    self.directory.format_for_log(),
                    self.processed(),
                    total
                );
                return;
            }

            match image_loader::create_thumbnail(codec, entry.path(), self.thumbnail_size) {
                Ok(thumbnail) => {
                    let current = self.processed.fetch_add(1, Ordering::AcqRel) + 1;
                    let entry = entry.clone();
                    let marker = self.marker.clone();
                    let session = self.id;
                    let bus = bus.clone();
                    ui.invoke_from_ui_loop(move || {
                        // A newer open may have cleared the collection since this was queued.
                        if !marker.is_current(session.generation) {
                            return;
                        }
                        entry.set_thumbnail(Arc::new(thumbnail));
                        bus.publish(LoadingProgress {
                            session,
                            current,
                            total,
                        });
                    });
                }
                Err(e) => self.report_failure(entry.path(), e, ui, bus),
            }
        }

        info!(
            "Loaded {} of {} thumbnails from {}",
            self.processed(),
            total,
            self.directory.format_for_log()
        );
    }

    /// Logs every failure but alerts the user only for the first one.
    fn report_failure(&self, path: &Path, err: AppError, ui: &UiDispatcher, bus: &EventBus) {
        warn!("Thumbnail failed for {}: {}", path.format_for_log(), err);
        if self
            .error_alerted
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return;
        }

        error!("Image loading error, check that the image files are valid: {}", err);
        let alert = LoadingAlert {
            session: self.id(),
            path: path.to_path_buf(),
            message: err.to_string(),
        };
        let marker = self.marker.clone();
        let bus = bus.clone();
        ui.invoke_from_ui_loop(move || {
            if marker.is_current(alert.session.generation) {
                bus.publish(alert);
            }
        });
    }
}

/// Publishes `LoadingFinished` when the session ends, however it ends.
struct FinishedNotice {
    session: SessionId,
    ui: UiDispatcher,
    bus: EventBus,
}

impl Drop for FinishedNotice {
    fn drop(&mut self) {
        let session = self.session;
        let bus = self.bus.clone();
        self.ui
            .invoke_from_ui_loop(move || bus.publish(LoadingFinished { session }));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::image_loader::ImageCrateCodec;
    use crate::state::CollectionKey;
    use crate::state::testing::{FakeCodec, GatedCodec, app_state, pump_until, record, touch_all};
    use image::{Rgb, RgbImage};

    #[derive(Debug, Clone, PartialEq)]
    enum Seen {
        Started,
        Progress(usize, usize),
        Alert,
        Finished,
    }

    fn record_loading(bus: &EventBus) -> Arc<Mutex<Vec<Seen>>> {
        let log = Arc::new(Mutex::new(Vec::new()));
        {
            let log = log.clone();
            bus.subscribe(move |_: &LoadingStarted| log.lock().unwrap().push(Seen::Started));
        }
        {
            let log = log.clone();
            bus.subscribe(move |p: &LoadingProgress| {
                log.lock().unwrap().push(Seen::Progress(p.current, p.total))
            });
        }
        {
            let log = log.clone();
            bus.subscribe(move |_: &LoadingAlert| log.lock().unwrap().push(Seen::Alert));
        }
        {
            let log = log.clone();
            bus.subscribe(move |_: &LoadingFinished| log.lock().unwrap().push(Seen::Finished));
        }
        log
    }

    fn finished(log: &Arc<Mutex<Vec<Seen>>>) -> bool {
        log.lock().unwrap().contains(&Seen::Finished)
    }

    fn default_entries(state: &AppState) -> Vec<EntryRef> {
        let registry = state.registry.lock().unwrap();
        registry.get(CollectionKey::Default).unwrap().entries().to_vec()
    }

    #[test]
    fn mixed_directory_alerts_once_and_counts_successes() {
        let dir = tempfile::tempdir().unwrap();
        RgbImage::from_pixel(30, 20, Rgb([200, 0, 0]))
            .save(dir.path().join("a.jpg"))
            .unwrap();
        std::fs::write(dir.path().join("b.png"), b"this is not a png").unwrap();
        RgbImage::from_pixel(20, 30, Rgb([0, 200, 0]))
            .save(dir.path().join("c.gif"))
            .unwrap();

        let (state, ui_loop) = app_state(Arc::new(ImageCrateCodec));
        let log = record_loading(&state.bus);
        LoadingService::new(&state).open_directory(dir.path()).unwrap();
        pump_until(&ui_loop, || finished(&log));

        let log = log.lock().unwrap().clone();
        assert_eq!(log.first(), Some(&Seen::Started));
        assert_eq!(log.last(), Some(&Seen::Finished));
        assert_eq!(log.iter().filter(|s| **s == Seen::Alert).count(), 1);
        let progress: Vec<&Seen> = log
            .iter()
            .filter(|s| matches!(s, Seen::Progress(..)))
            .collect();
        assert_eq!(progress, vec![&Seen::Progress(1, 3), &Seen::Progress(2, 3)]);

        let entries = default_entries(&state);
        assert_eq!(entries.len(), 3);
        for entry in &entries {
            let corrupt = entry.path().ends_with("b.png");
            assert_eq!(entry.has_placeholder(), corrupt, "{:?}", entry.path());
        }
    }

    #[test]
    fn only_supported_files_become_entries() {
        let dir = tempfile::tempdir().unwrap();
        touch_all(dir.path(), &["1.png", "2.jpg", "3.webp", "read.me", "data.json"]);

        let (state, ui_loop) = app_state(Arc::new(FakeCodec));
        let log = record_loading(&state.bus);
        LoadingService::new(&state).open_directory(dir.path()).unwrap();
        pump_until(&ui_loop, || finished(&log));

        assert_eq!(default_entries(&state).len(), 3);
        let log = log.lock().unwrap();
        assert_eq!(log.last(), Some(&Seen::Finished));
        assert!(log.contains(&Seen::Progress(3, 3)));
        assert!(default_entries(&state).iter().all(|e| !e.has_placeholder()));
    }

    #[test]
    fn every_failure_after_the_first_is_silent() {
        let dir = tempfile::tempdir().unwrap();
        touch_all(dir.path(), &["corrupt1.png", "corrupt2.png", "corrupt3.png", "ok.png"]);

        let (state, ui_loop) = app_state(Arc::new(FakeCodec));
        let log = record_loading(&state.bus);
        let alerts = record::<LoadingAlert>(&state.bus);
        LoadingService::new(&state).open_directory(dir.path()).unwrap();
        pump_until(&ui_loop, || finished(&log));

        assert_eq!(alerts.lock().unwrap().len(), 1);
        assert!(log.lock().unwrap().contains(&Seen::Progress(1, 4)));
    }

    #[test]
    fn unreadable_directory_fails_without_events() {
        let dir = tempfile::tempdir().unwrap();
        let (state, ui_loop) = app_state(Arc::new(FakeCodec));
        let log = record_loading(&state.bus);

        let result = LoadingService::new(&state).open_directory(&dir.path().join("missing"));
        assert!(matches!(result, Err(AppError::DirectoryScan { .. })));

        ui_loop.run_next(std::time::Duration::from_millis(50));
        assert!(log.lock().unwrap().is_empty());
        assert_eq!(state.config.last_opened_dir(), None);
    }

    #[test]
    fn empty_directory_starts_and_finishes() {
        let dir = tempfile::tempdir().unwrap();
        let (state, ui_loop) = app_state(Arc::new(FakeCodec));
        let log = record_loading(&state.bus);

        LoadingService::new(&state).open_directory(dir.path()).unwrap();
        pump_until(&ui_loop, || finished(&log));
        assert_eq!(*log.lock().unwrap(), vec![Seen::Started, Seen::Finished]);
    }

    #[test]
    fn successful_open_is_remembered() {
        let dir = tempfile::tempdir().unwrap();
        let (state, ui_loop) = app_state(Arc::new(FakeCodec));
        let log = record_loading(&state.bus);
        LoadingService::new(&state).open_directory(dir.path()).unwrap();
        pump_until(&ui_loop, || finished(&log));
        assert_eq!(state.config.last_opened_dir().as_deref(), Some(dir.path()));
    }

    #[test]
    fn collections_created_by_transfer_cannot_load() {
        let dir = tempfile::tempdir().unwrap();
        let (state, _ui_loop) = app_state(Arc::new(FakeCodec));
        {
            let mut registry = state.registry.lock().unwrap();
            registry.get_or_create(CollectionKey::Numbered(2));
            registry.set_current(CollectionKey::Numbered(2)).unwrap();
        }
        let service = LoadingService::new(&state);
        assert!(matches!(
            service.open_directory(dir.path()),
            Err(AppError::NotLoadable(CollectionKey::Numbered(2)))
        ));
        assert!(!service.accepts_drop(&[dir.path().to_path_buf()]));
    }

    #[test]
    fn drop_of_single_directory_opens_it() {
        let dir = tempfile::tempdir().unwrap();
        touch_all(dir.path(), &["x.png"]);
        let (state, ui_loop) = app_state(Arc::new(FakeCodec));
        let log = record_loading(&state.bus);
        let service = LoadingService::new(&state);

        let file = dir.path().join("x.png");
        assert!(!service.accepts_drop(&[file.clone()]));
        assert!(service.open_dropped(&[file]).is_err());

        assert!(service.accepts_drop(&[dir.path().to_path_buf()]));
        service.open_dropped(&[dir.path().to_path_buf()]).unwrap();
        pump_until(&ui_loop, || finished(&log));
        assert_eq!(default_entries(&state).len(), 1);
    }

    #[derive(Debug, Clone, PartialEq)]
    enum Traced {
        Started(SessionId),
        Progress(SessionId, usize, usize),
        Finished(SessionId),
    }

    fn record_sessions(bus: &EventBus) -> Arc<Mutex<Vec<Traced>>> {
        let log = Arc::new(Mutex::new(Vec::new()));
        {
            let log = log.clone();
            bus.subscribe(move |e: &LoadingStarted| log.lock().unwrap().push(Traced::Started(e.session)));
        }
        {
            let log = log.clone();
            bus.subscribe(move |e: &LoadingProgress| {
                log.lock()
                    .unwrap()
                    .push(Traced::Progress(e.session, e.current, e.total))
            });
        }
        {
            let log = log.clone();
            bus.subscribe(move |e: &LoadingFinished| log.lock().unwrap().push(Traced::Finished(e.session)));
        }
        log
    }

    #[test]
    fn superseded_session_never_touches_its_entries() {
        let dir_a = tempfile::tempdir().unwrap();
        let dir_b = tempfile::tempdir().unwrap();
        touch_all(dir_a.path(), &["a1.png", "a2.png", "a3.png"]);
        touch_all(dir_b.path(), &["b1.png", "b2.png"]);

        let (entered_tx, entered_rx) = crossbeam_channel::unbounded();
        let (gate_tx, gate_rx) = crossbeam_channel::unbounded();
        let codec = GatedCodec {
            gated_dir: dir_a.path().to_path_buf(),
            entered: entered_tx,
            gate: gate_rx,
        };
        let (state, ui_loop) = app_state(Arc::new(codec));
        let log = record_sessions(&state.bus);
        let service = LoadingService::new(&state);

        let session_a = service.open_directory(dir_a.path()).unwrap();
        let entries_a = default_entries(&state);

        // Session A is now blocked inside its first decode.
        let first = entered_rx
            .recv_timeout(std::time::Duration::from_secs(10))
            .unwrap();
        assert!(first.starts_with(dir_a.path()));

        let session_b = service.open_directory(dir_b.path()).unwrap();
        assert_eq!(session_a.collection, session_b.collection);
        assert!(session_b.generation > session_a.generation);

        for _ in 0..3 {
            gate_tx.send(()).unwrap();
        }
        let finishes = |log: &Arc<Mutex<Vec<Traced>>>| {
            log.lock()
                .unwrap()
                .iter()
                .filter(|t| matches!(t, Traced::Finished(_)))
                .count()
        };
        pump_until(&ui_loop, || finishes(&log) == 2);

        let log = log.lock().unwrap().clone();
        let b_started = log
            .iter()
            .position(|t| *t == Traced::Started(session_b))
            .unwrap();
        let a_after_b: Vec<&Traced> = log[b_started..]
            .iter()
            .filter(|t| match t {
                Traced::Started(s) | Traced::Finished(s) | Traced::Progress(s, ..) => *s == session_a,
            })
            .collect();
        assert_eq!(a_after_b, vec![&Traced::Finished(session_a)]);
        assert!(!log.iter().any(|t| matches!(t, Traced::Progress(s, ..) if *s == session_a)));

        let progress_b: Vec<(usize, usize)> = log
            .iter()
            .filter_map(|t| match t {
                Traced::Progress(s, current, total) if *s == session_b => Some((*current, *total)),
                _ => None,
            })
            .collect();
        assert_eq!(progress_b, vec![(1, 2), (2, 2)]);
        assert_eq!(log.iter().filter(|t| **t == Traced::Finished(session_b)).count(), 1);

        assert!(entries_a.iter().all(|e| e.has_placeholder()));
        let entries_b = default_entries(&state);
        assert_eq!(entries_b.len(), 2);
        assert!(entries_b.iter().all(|e| !e.has_placeholder()));
        assert!(entries_b.iter().all(|e| e.path().starts_with(dir_b.path())));
    }
}
