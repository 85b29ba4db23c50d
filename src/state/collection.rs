//! Ordered group of image entries with a single active pointer.
//!
//! Methods that change the active entry return the [`ActiveEntryChanged`] event
//! instead of publishing it; callers publish once they have released any lock
//! guarding the collection.

use crate::config::DEFAULT_COLLECTION_NAME;
use crate::events::ActiveEntryChanged;
use crate::file_utils::PathExt;
use crate::state::EntryRef;
use log::{debug, warn};
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

/// Addresses a collection: the default one or a digit-addressed tab `1..=9`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum CollectionKey {
    Default,
    Numbered(u8),
}

impl CollectionKey {
    /// Key for a digit shortcut; `None` outside `1..=9`.
    pub fn numbered(digit: u8) -> Option<Self> {
        (1..=9).contains(&digit).then_some(Self::Numbered(digit))
    }

    pub fn is_default(&self) -> bool {
        matches!(self, Self::Default)
    }

    pub fn display_name(&self) -> String {
        match self {
            Self::Default => DEFAULT_COLLECTION_NAME.to_string(),
            Self::Numbered(n) => n.to_string(),
        }
    }
}

impl fmt::Display for CollectionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Default => write!(f, "default"),
            Self::Numbered(n) => write!(f, "#{}", n),
        }
    }
}

/// Epoch of the directory a collection currently reflects.
///
/// Written only from the UI loop when a directory is opened; read by loading
/// tasks to detect that their work has been superseded.
#[derive(Debug, Clone, Default)]
pub struct GenerationMarker(Arc<AtomicU64>);

impl GenerationMarker {
    pub fn current(&self) -> u64 {
        self.0.load(Ordering::Acquire)
    }

    pub fn is_current(&self, generation: u64) -> bool {
        self.current() == generation
    }

    fn advance(&self) -> u64 {
        self.0.fetch_add(1, Ordering::AcqRel) + 1
    }
}

pub struct Collection {
    key: CollectionKey,
    entries: Vec<EntryRef>,
    active: Option<EntryRef>,
    marker: GenerationMarker,
    loadable: bool,
    folder: Option<PathBuf>,
}

impl Collection {
    pub fn new(key: CollectionKey, loadable: bool) -> Self {
        Self {
            key,
            entries: Vec::new(),
            active: None,
            marker: GenerationMarker::default(),
            loadable,
            folder: None,
        }
    }

    pub fn key(&self) -> CollectionKey {
        self.key
    }

    pub fn name(&self) -> String {
        self.key.display_name()
    }

    pub fn entries(&self) -> &[EntryRef] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn active(&self) -> Option<&EntryRef> {
        self.active.as_ref()
    }

    pub fn active_index(&self) -> Option<usize> {
        self.active.as_ref().and_then(|active| self.index_of(active))
    }

    pub fn index_of(&self, entry: &EntryRef) -> Option<usize> {
        self.entries.iter().position(|e| Arc::ptr_eq(e, entry))
    }

    pub fn contains(&self, entry: &EntryRef) -> bool {
        self.index_of(entry).is_some()
    }

    pub fn is_loadable(&self) -> bool {
        self.loadable
    }

    /// Directory the collection was last filled from.
    pub fn folder(&self) -> Option<&Path> {
        self.folder.as_deref()
    }

    pub fn marker(&self) -> &GenerationMarker {
        &self.marker
    }

    /// Empties the collection for a new directory and returns the new generation.
    ///
    /// Any loading task holding an older generation stops at its next check.
    pub(crate) fn begin_load(&mut self, folder: &Path) -> u64 {
        let generation = self.marker.advance();
        for entry in &self.entries {
            entry.set_active(false);
        }
        self.entries.clear();
        self.active = None;
        self.folder = Some(folder.to_path_buf());
        debug!(
            "Collection {} now reflects {} (generation {})",
            self.key,
            folder.format_for_log(),
            generation
        );
        generation
    }

    fn activate_at(&mut self, index: usize) -> ActiveEntryChanged {
        if let Some(previous) = self.active.take() {
            previous.set_active(false);
        }
        let entry = self.entries[index].clone();
        entry.set_active(true);
        self.active = Some(entry.clone());
        ActiveEntryChanged {
            collection: self.key,
            index,
            entry,
        }
    }

    /// Makes `entry` the active entry.
    ///
    /// Returns `None` if it already is active or does not belong to this collection.
    pub fn set_active(&mut self, entry: &EntryRef) -> Option<ActiveEntryChanged> {
        let index = match self.index_of(entry) {
            Some(index) => index,
            None => {
                warn!(
                    "Cannot activate {} in collection {}: not a member",
                    entry.path().format_for_log(),
                    self.key
                );
                return None;
            }
        };

        if self.active_index() == Some(index) {
            return None;
        }
        Some(self.activate_at(index))
    }

    /// Moves the active pointer by `offset`, clamped to the collection bounds.
    ///
    /// With nothing active the current index counts as -1, so `+1` selects the
    /// first entry.
    pub fn move_active(&mut self, offset: isize) -> Option<ActiveEntryChanged> {
        if self.entries.is_empty() {
            return None;
        }

        let current = self.active_index().map_or(-1, |i| i as isize);
        let last = self.entries.len() as isize - 1;
        let target = current.saturating_add(offset).clamp(0, last);
        if target == current {
            return None;
        }
        Some(self.activate_at(target as usize))
    }

    /// Appends `entry`. With `auto_select` it becomes active, but only if
    /// nothing else is.
    pub fn add(&mut self, entry: EntryRef, auto_select: bool) -> Option<ActiveEntryChanged> {
        if self.contains(&entry) {
            warn!(
                "{} is already in collection {}",
                entry.path().format_for_log(),
                self.key
            );
            return None;
        }

        entry.set_active(false);
        self.entries.push(entry);
        if auto_select && self.active.is_none() {
            Some(self.activate_at(self.entries.len() - 1))
        } else {
            None
        }
    }

    /// Removes `entry` and returns it.
    ///
    /// Removing the active entry hands the active pointer to the first remaining
    /// entry; the resulting change is returned alongside the removed entry.
    pub fn remove(&mut self, entry: &EntryRef) -> Option<Removal> {
        let index = self.index_of(entry)?;
        let removed = self.entries.remove(index);
        removed.set_active(false);

        let was_active = self
            .active
            .as_ref()
            .is_some_and(|active| Arc::ptr_eq(active, &removed));

        let reassigned = if was_active {
            self.active = None;
            if self.entries.is_empty() {
                None
            } else {
                Some(self.activate_at(0))
            }
        } else {
            None
        };

        Some(Removal {
            entry: removed,
            reassigned,
        })
    }
}

/// Outcome of [`Collection::remove`].
#[derive(Debug)]
pub struct Removal {
    pub entry: EntryRef,
    pub reassigned: Option<ActiveEntryChanged>,
}

impl fmt::Debug for Collection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Collection")
            .field("key", &self.key)
            .field("len", &self.entries.len())
            .field("active_index", &self.active_index())
            .field("generation", &self.marker.current())
            .finish()
    }
}
