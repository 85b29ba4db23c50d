//! Keyboard command surface.
//!
//! Translates key presses into bus events the same way in every front end.

use crate::events::{EventBus, NavigateNext, NavigatePrev, TransferToCollection, TransferToDefault};
use crate::state::EntryRef;
use log::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Key {
    Left,
    Right,
    PageUp,
    PageDown,
    Digit(u8),
    BackQuote,
}

impl Key {
    /// Parses a key name as typed in the console front end.
    pub fn parse(name: &str) -> Option<Self> {
        match name {
            "left" | "h" => Some(Key::Left),
            "right" | "l" => Some(Key::Right),
            "pgup" | "pageup" => Some(Key::PageUp),
            "pgdn" | "pagedown" => Some(Key::PageDown),
            "`" => Some(Key::BackQuote),
            _ => match name.as_bytes() {
                [d @ b'0'..=b'9'] => Some(Key::Digit(*d - b'0')),
                _ => None,
            },
        }
    }
}

/// Which widget has keyboard focus.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum KeyContext {
    #[default]
    Thumbnails,
    Preview,
}

/// Publishes the event bound to `key`. Returns true if the key was consumed.
///
/// Transfer shortcuts need an active entry and are ignored without one.
pub fn dispatch_key(bus: &EventBus, key: Key, context: KeyContext, active: Option<&EntryRef>) -> bool {
    match (context, key) {
        (KeyContext::Thumbnails, Key::Left) | (KeyContext::Preview, Key::PageUp) => {
            bus.publish(NavigatePrev);
            true
        }
        (KeyContext::Thumbnails, Key::Right) | (KeyContext::Preview, Key::PageDown) => {
            bus.publish(NavigateNext);
            true
        }
        (KeyContext::Thumbnails, Key::Digit(digit @ 1..=9)) => match active {
            Some(entry) => {
                debug!("Transfer image to collection {}: {:?}", digit, entry.path());
                bus.publish(TransferToCollection {
                    key: digit,
                    entry: entry.clone(),
                });
                true
            }
            None => false,
        },
        (KeyContext::Thumbnails, Key::BackQuote) => match active {
            Some(entry) => {
                debug!("Transfer image to default collection: {:?}", entry.path());
                bus.publish(TransferToDefault {
                    entry: entry.clone(),
                });
                true
            }
            None => false,
        },
        _ => false,
    }
}
