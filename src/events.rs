//! Typed publish/subscribe channel and the event catalog.
//!
//! Handlers run synchronously on the publishing thread, in registration order.
//! The subscriber list is copied before delivery, so a handler may publish
//! further events or subscribe new handlers without deadlocking.

use crate::state::{CollectionKey, EntryRef};
use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

type Handler = Arc<dyn Fn(&dyn Any) + Send + Sync>;

/// Handle returned by [`EventBus::subscribe`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

#[derive(Default)]
struct Registry {
    next_id: u64,
    handlers: HashMap<TypeId, Vec<(SubscriptionId, Handler)>>,
}

/// Process-wide event bus. Cloning yields another handle to the same bus.
#[derive(Clone, Default)]
pub struct EventBus {
    registry: Arc<Mutex<Registry>>,
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `handler` for events of type `E`.
    pub fn subscribe<E, F>(&self, handler: F) -> SubscriptionId
    where
        E: Any + Send + Sync,
        F: Fn(&E) + Send + Sync + 'static,
    {
        let mut registry = self.registry.lock().unwrap_or_else(|e| e.into_inner());
        registry.next_id += 1;
        let id = SubscriptionId(registry.next_id);

        let erased: Handler = Arc::new(move |event: &dyn Any| {
            if let Some(event) = event.downcast_ref::<E>() {
                handler(event);
            }
        });
        registry
            .handlers
            .entry(TypeId::of::<E>())
            .or_default()
            .push((id, erased));
        id
    }

    /// Removes a handler. Returns false if it was not registered.
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        let mut registry = self.registry.lock().unwrap_or_else(|e| e.into_inner());
        for handlers in registry.handlers.values_mut() {
            if let Some(pos) = handlers.iter().position(|(existing, _)| *existing == id) {
                handlers.remove(pos);
                return true;
            }
        }
        false
    }

    /// Delivers `event` to every handler currently subscribed to its type.
    pub fn publish<E: Any + Send + Sync>(&self, event: E) {
        let handlers: Vec<Handler> = {
            let registry = self.registry.lock().unwrap_or_else(|e| e.into_inner());
            match registry.handlers.get(&TypeId::of::<E>()) {
                Some(handlers) => handlers.iter().map(|(_, h)| h.clone()).collect(),
                None => return,
            }
        };

        for handler in handlers {
            handler(&event);
        }
    }

    pub fn subscriber_count<E: Any>(&self) -> usize {
        let registry = self.registry.lock().unwrap_or_else(|e| e.into_inner());
        registry
            .handlers
            .get(&TypeId::of::<E>())
            .map_or(0, Vec::len)
    }
}

/// Identifies one directory-load run: the collection it fills and its generation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SessionId {
    pub collection: CollectionKey,
    pub generation: u64,
}

// ── Loading ─────────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct LoadingStarted {
    pub session: SessionId,
    pub directory: PathBuf,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LoadingProgress {
    pub session: SessionId,
    pub current: usize,
    pub total: usize,
}

impl LoadingProgress {
    /// Fraction of completed files. An empty directory counts as complete.
    pub fn progress(&self) -> f64 {
        if self.total == 0 {
            1.0
        } else {
            self.current as f64 / self.total as f64
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoadingFinished {
    pub session: SessionId,
}

/// The one user-visible decode failure of a session.
#[derive(Debug, Clone)]
pub struct LoadingAlert {
    pub session: SessionId,
    pub path: PathBuf,
    pub message: String,
}

// ── Selection ───────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct ActiveEntryChanged {
    pub collection: CollectionKey,
    pub index: usize,
    pub entry: EntryRef,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct NavigatePrev;

#[derive(Debug, Clone, Copy, Default)]
pub struct NavigateNext;

#[derive(Debug, Clone)]
pub struct GotoEntry {
    pub entry: EntryRef,
}

/// Where the active entry sat relative to the visible window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScrollPosition {
    Above,
    Below,
}

/// Directive for the view layer to set the vertical scroll value.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScrollIntoView {
    pub collection: CollectionKey,
    pub position: ScrollPosition,
    pub scroll_value: f64,
}

// ── Transfer ────────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct TransferToCollection {
    pub key: u8,
    pub entry: EntryRef,
}

#[derive(Debug, Clone)]
pub struct TransferToDefault {
    pub entry: EntryRef,
}

// ── Preview ─────────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct PreviewLoaded {
    pub path: PathBuf,
    pub width: u32,
    pub height: u32,
}

#[derive(Debug, Clone)]
pub struct PreviewFailed {
    pub path: PathBuf,
    pub message: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Clone, PartialEq)]
    struct Ping(u32);

    #[derive(Debug, Clone, PartialEq)]
    struct Pong(u32);

    #[test]
    fn delivers_in_registration_order() {
        let bus = EventBus::new();
        let seen = Arc::new(Mutex::new(Vec::new()));
        for tag in ["first", "second", "third"] {
            let seen = seen.clone();
            bus.subscribe(move |ping: &Ping| seen.lock().unwrap().push((tag, ping.0)));
        }

        bus.publish(Ping(7));
        assert_eq!(
            *seen.lock().unwrap(),
            vec![("first", 7), ("second", 7), ("third", 7)]
        );
    }

    #[test]
    fn only_matching_type_is_delivered() {
        let bus = EventBus::new();
        let pings = Arc::new(Mutex::new(0));
        {
            let pings = pings.clone();
            bus.subscribe(move |_: &Ping| *pings.lock().unwrap() += 1);
        }
        bus.publish(Pong(1));
        bus.publish(Ping(1));
        assert_eq!(*pings.lock().unwrap(), 1);
    }

    #[test]
    fn publish_without_subscribers_is_noop() {
        EventBus::new().publish(Ping(1));
    }

    #[test]
    fn unsubscribe_stops_delivery() {
        let bus = EventBus::new();
        let count = Arc::new(Mutex::new(0));
        let id = {
            let count = count.clone();
            bus.subscribe(move |_: &Ping| *count.lock().unwrap() += 1)
        };
        bus.publish(Ping(1));
        assert!(bus.unsubscribe(id));
        assert!(!bus.unsubscribe(id));
        bus.publish(Ping(2));
        assert_eq!(*count.lock().unwrap(), 1);
        assert_eq!(bus.subscriber_count::<Ping>(), 0);
    }

    #[test]
    fn handlers_may_publish_reentrantly() {
        let bus = EventBus::new();
        let pongs = Arc::new(Mutex::new(Vec::new()));
        {
            let inner = bus.clone();
            bus.subscribe(move |ping: &Ping| inner.publish(Pong(ping.0 * 2)));
        }
        {
            let pongs = pongs.clone();
            bus.subscribe(move |pong: &Pong| pongs.lock().unwrap().push(pong.0));
        }
        bus.publish(Ping(21));
        assert_eq!(*pongs.lock().unwrap(), vec![42]);
    }

    fn session() -> SessionId {
        SessionId {
            collection: CollectionKey::Default,
            generation: 1,
        }
    }

    #[test]
    fn progress_fraction() {
        let half = LoadingProgress {
            session: session(),
            current: 1,
            total: 2,
        };
        assert_eq!(half.progress(), 0.5);
    }

    #[test]
    fn progress_of_empty_directory_is_complete() {
        let empty = LoadingProgress {
            session: session(),
            current: 0,
            total: 0,
        };
        assert_eq!(empty.progress(), 1.0);
    }
}
