//! Cross-collection selection, navigation and transfer handling.
//!
//! The coordinator owns no state of its own beyond handles: the focused
//! collection lives in the registry and is changed through
//! [`SelectionCoordinator::set_current_collection`]. Every active-entry change
//! is published after the registry lock has been released.

use crate::error::Result;
use crate::events::{
    ActiveEntryChanged, EventBus, GotoEntry, NavigateNext, NavigatePrev, ScrollIntoView,
    TransferToCollection, TransferToDefault,
};
use crate::file_utils::PathExt;
use crate::state::{AppState, CollectionKey, CollectionRegistry, EntryRef, TransferOutcome};
use crate::ui::{ViewportGeometry, scroll_target};
use log::{debug, warn};
use std::sync::{Arc, Mutex, Weak};

pub struct SelectionCoordinator {
    registry: Arc<Mutex<CollectionRegistry>>,
    bus: EventBus,
    viewport: Arc<dyn ViewportGeometry>,
}

impl SelectionCoordinator {
    /// Creates the coordinator and subscribes it to navigation, selection and
    /// transfer events.
    pub fn install(state: &AppState) -> Arc<Self> {
        Self::with_viewport(state.registry.clone(), state.bus.clone(), state.viewport.clone())
    }

    pub fn with_viewport(
        registry: Arc<Mutex<CollectionRegistry>>,
        bus: EventBus,
        viewport: Arc<dyn ViewportGeometry>,
    ) -> Arc<Self> {
        let coordinator = Arc::new(Self {
            registry,
            bus,
            viewport,
        });
        coordinator.subscribe_handlers();
        coordinator
    }

    fn subscribe_handlers(self: &Arc<Self>) {
        let weak = Arc::downgrade(self);
        self.bus.subscribe(with(&weak, |c, _: &NavigatePrev| c.navigate(-1)));
        self.bus.subscribe(with(&weak, |c, _: &NavigateNext| c.navigate(1)));
        self.bus
            .subscribe(with(&weak, |c, event: &GotoEntry| c.goto(&event.entry)));
        self.bus.subscribe(with(&weak, |c, event: &ActiveEntryChanged| {
            c.scroll_to_active(event)
        }));
        self.bus.subscribe(with(&weak, |c, event: &TransferToCollection| {
            match CollectionKey::numbered(event.key) {
                Some(target) => {
                    c.transfer_to(target, &event.entry);
                }
                None => warn!("Ignoring transfer to invalid collection number {}", event.key),
            }
        }));
        self.bus.subscribe(with(&weak, |c, event: &TransferToDefault| {
            c.transfer_to(CollectionKey::Default, &event.entry);
        }));
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, CollectionRegistry> {
        self.registry.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn current_collection(&self) -> CollectionKey {
        self.lock().current_key()
    }

    /// Called by the view layer whenever the selected tab changes.
    pub fn set_current_collection(&self, key: CollectionKey) -> Result<()> {
        self.lock().set_current(key)
    }

    /// Active entry of the focused collection.
    pub fn active_entry(&self) -> Option<EntryRef> {
        self.lock().current().active().cloned()
    }

    /// Moves the focused collection's active pointer by `offset`.
    pub fn navigate(&self, offset: isize) {
        let change = self.lock().current_mut().move_active(offset);
        self.publish_change(change);
    }

    /// Activates `entry` in whichever collection holds it.
    pub fn goto(&self, entry: &EntryRef) {
        let change = {
            let mut registry = self.lock();
            let Some(owner) = registry.owner_of(entry) else {
                warn!("Cannot go to {}: not in any collection", entry.path().format_for_log());
                return;
            };
            registry
                .get_mut(owner)
                .and_then(|collection| collection.set_active(entry))
        };
        self.publish_change(change);
    }

    /// Moves `entry` from its collection into `target`, creating `target` if needed.
    pub fn transfer_to(&self, target: CollectionKey, entry: &EntryRef) -> Option<TransferOutcome> {
        let mut outcome = {
            let mut registry = self.lock();
            let Some(source) = registry.owner_of(entry) else {
                warn!(
                    "Cannot transfer {}: not in any collection",
                    entry.path().format_for_log()
                );
                return None;
            };
            registry.transfer(source, target, entry)?
        };

        debug!(
            "Transferred {} from {} to {}{}",
            entry.path().format_for_log(),
            outcome.source,
            outcome.target,
            if outcome.created { " (new)" } else { "" }
        );
        self.publish_change(outcome.source_reassigned.take());
        Some(outcome)
    }

    /// Closes a numbered collection; focus falls back to the default collection.
    pub fn close_collection(&self, key: CollectionKey) -> Result<()> {
        self.lock().close(key).map(|_| ())
    }

    fn publish_change(&self, change: Option<ActiveEntryChanged>) {
        if let Some(change) = change {
            self.bus.publish(change);
        }
    }

    fn scroll_to_active(&self, event: &ActiveEntryChanged) {
        let len = match self.lock().get(event.collection) {
            Some(collection) => collection.len(),
            None => return,
        };
        let Some(geometry) = self.viewport.geometry(event.collection, event.index, len) else {
            return;
        };
        if let Some((position, scroll_value)) = scroll_target(&geometry) {
            self.bus.publish(ScrollIntoView {
                collection: event.collection,
                position,
                scroll_value,
            });
        }
    }
}

/// Adapts a coordinator method into a bus handler that holds only a weak reference.
fn with<E, F>(weak: &Weak<SelectionCoordinator>, f: F) -> impl Fn(&E) + Send + Sync + 'static
where
    E: 'static,
    F: Fn(&SelectionCoordinator, &E) + Send + Sync + 'static,
{
    let weak = weak.clone();
    move |event: &E| {
        if let Some(coordinator) = weak.upgrade() {
            f(&coordinator, event);
        }
    }
}
