//! UI-facing plumbing: the UI loop, keyboard surface and scroll geometry.
//!
//! Threading model:
//! - the UI loop (`UiLoop`) owns collection mutation and event publishing for
//!   anything that originates in the front end
//! - `rayon::spawn`: CPU-heavy work (thumbnail and preview decoding)
//! - `UiDispatcher::invoke_from_ui_loop`: hands rayon results back to the UI loop

pub mod dispatcher;
pub mod handlers;
pub mod keymap;
pub mod scroll;

pub use dispatcher::{UiDispatcher, UiLoop, ui_channel};
pub use handlers::{ConsoleFrontEnd, setup_handlers};
pub use keymap::{Key, KeyContext, dispatch_key};
pub use scroll::{GridViewport, ViewportGeometry, scroll_target};

use crate::config::TITLE_PREFIX;
use std::path::Path;

/// Main window title, naming the folder loaded into the focused collection.
pub fn window_title(folder: Option<&Path>) -> String {
    match folder {
        Some(folder) => format!("{} [{}]", TITLE_PREFIX, folder.display()),
        None => TITLE_PREFIX.to_string(),
    }
}
