//! Console front end.
//!
//! Stands in for a graphical view layer: reads one command per line, feeds key
//! names through the keyboard surface and prints what the services publish.
//! Stdin is read on its own thread; the main thread multiplexes typed lines with
//! tasks queued for the UI loop.

use crate::events::{
    ActiveEntryChanged, GotoEntry, LoadingAlert, LoadingFinished, LoadingProgress, LoadingStarted,
    PreviewFailed, PreviewLoaded, ScrollIntoView, SessionId,
};
use crate::file_utils::PathExt;
use crate::services::{ScaleRatio, Services};
use crate::state::{AppState, CollectionKey, CollectionRegistry};
use crate::ui::{Key, KeyContext, UiLoop, dispatch_key, window_title};
use crossbeam_channel::{select, unbounded};
use log::{debug, error, info};
use std::io::{BufRead, Write};
use std::ops::ControlFlow;
use std::path::PathBuf;
use std::sync::Mutex;

const HELP: &str = "\
keys:      left right pgup pgdn 1-9 `
commands:  open <dir> | drop <path>... | pick | tab <default|1-9> | close <1-9>
           goto <index> | list | preview | thumbs | dblclick | zoom [percent]
           viewport <width> <height> | help | quit";

/// One line typed into the console.
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Key(Key),
    Open(PathBuf),
    Drop(Vec<PathBuf>),
    Pick,
    Tab(CollectionKey),
    Close(CollectionKey),
    Goto(usize),
    List,
    Focus(KeyContext),
    DoubleClick,
    Zoom(Option<ScaleRatio>),
    Viewport { width: f64, height: f64 },
    Help,
    Quit,
}

fn parse_collection_key(text: &str) -> Option<CollectionKey> {
    match text {
        "default" | "0" | "`" => Some(CollectionKey::Default),
        _ => match text.as_bytes() {
            [d @ b'1'..=b'9'] => CollectionKey::numbered(*d - b'0'),
            _ => None,
        },
    }
}

impl Command {
    /// Parses a console line. Returns `None` for blank or unrecognised input.
    pub fn parse(line: &str) -> Option<Self> {
        let line = line.trim();
        let (head, rest) = match line.split_once(char::is_whitespace) {
            Some((head, rest)) => (head, rest.trim()),
            None => (line, ""),
        };

        match head {
            "" => None,
            "open" if !rest.is_empty() => Some(Command::Open(PathBuf::from(rest))),
            "drop" if !rest.is_empty() => Some(Command::Drop(
                rest.split_whitespace().map(PathBuf::from).collect(),
            )),
            "pick" => Some(Command::Pick),
            "tab" => parse_collection_key(rest).map(Command::Tab),
            "close" => parse_collection_key(rest).map(Command::Close),
            "goto" => rest.parse().ok().map(Command::Goto),
            "list" | "ls" => Some(Command::List),
            "preview" => Some(Command::Focus(KeyContext::Preview)),
            "thumbs" => Some(Command::Focus(KeyContext::Thumbnails)),
            "dblclick" => Some(Command::DoubleClick),
            "zoom" if rest.is_empty() => Some(Command::Zoom(None)),
            "zoom" => ScaleRatio::from_percent(rest).map(|r| Command::Zoom(Some(r))),
            "viewport" => {
                let mut parts = rest.split_whitespace().map(str::parse::<f64>);
                match (parts.next(), parts.next(), parts.next()) {
                    (Some(Ok(width)), Some(Ok(height)), None) => {
                        Some(Command::Viewport { width, height })
                    }
                    _ => None,
                }
            }
            "help" | "?" => Some(Command::Help),
            "quit" | "exit" | "q" => Some(Command::Quit),
            _ if rest.is_empty() => Key::parse(head).map(Command::Key),
            _ => None,
        }
    }
}

/// Whether `session` is still the load filling its collection.
fn is_current_session(registry: &Mutex<CollectionRegistry>, session: SessionId) -> bool {
    let registry = registry.lock().unwrap_or_else(|e| e.into_inner());
    registry
        .get(session.collection)
        .is_some_and(|c| c.marker().is_current(session.generation))
}

/// Subscribes the console's printers to everything the services publish.
pub fn setup_handlers(state: &AppState) {
    state.bus.subscribe(|event: &LoadingStarted| {
        println!("{}", window_title(Some(&event.directory)));
        println!("Loading {} into {}", event.directory.format_for_log(), event.session.collection);
    });

    let registry = state.registry.clone();
    state.bus.subscribe(move |event: &LoadingProgress| {
        if !is_current_session(&registry, event.session) {
            return;
        }
        print!("\r  thumbnails {}/{} ({:.0}%)", event.current, event.total, event.progress() * 100.0);
        let _ = std::io::stdout().flush();
    });

    state.bus.subscribe(|event: &LoadingFinished| {
        println!();
        info!("Loading finished for {}", event.session.collection);
    });

    let registry = state.registry.clone();
    state.bus.subscribe(move |event: &LoadingAlert| {
        if !is_current_session(&registry, event.session) {
            return;
        }
        eprintln!("\nError loading {}: {}", event.path.format_for_log(), event.message);
    });

    state.bus.subscribe(|event: &ActiveEntryChanged| {
        println!("[{}] {}: {}", event.collection, event.index, event.entry.label());
    });

    // The view layer applies scroll directives to its own viewport.
    let viewport = state.viewport.clone();
    state.bus.subscribe(move |event: &ScrollIntoView| {
        debug!(
            "Scroll {} {:?} to {:.3}",
            event.collection, event.position, event.scroll_value
        );
        viewport.set_scroll_value(event.collection, event.scroll_value);
    });

    state.bus.subscribe(|event: &PreviewLoaded| {
        println!("  preview {} ({}x{})", event.path.format_for_log(), event.width, event.height);
    });

    state.bus.subscribe(|event: &PreviewFailed| {
        eprintln!("  preview failed for {}: {}", event.path.format_for_log(), event.message);
    });
}

/// Line-oriented stand-in for the gallery window.
pub struct ConsoleFrontEnd {
    state: AppState,
    services: Services,
    context: KeyContext,
    window: (f64, f64),
}

impl ConsoleFrontEnd {
    pub fn new(state: AppState, services: Services) -> Self {
        Self {
            state,
            services,
            context: KeyContext::default(),
            window: (800.0, 600.0),
        }
    }

    pub fn context(&self) -> KeyContext {
        self.context
    }

    /// Runs commands from stdin until `quit` or end of input.
    pub fn run(mut self, ui_loop: &UiLoop) {
        let (line_tx, line_rx) = unbounded::<String>();
        std::thread::spawn(move || {
            for line in std::io::stdin().lock().lines() {
                let Ok(line) = line else { break };
                if line_tx.send(line).is_err() {
                    break;
                }
            }
        });

        println!("{}", window_title(self.current_folder().as_deref()));
        println!("Type 'help' for commands.");

        loop {
            select! {
                recv(ui_loop.receiver()) -> task => match task {
                    Ok(task) => task(),
                    Err(_) => break,
                },
                recv(line_rx) -> line => {
                    let Ok(line) = line else { break };
                    match Command::parse(&line) {
                        Some(command) => {
                            if self.execute(command).is_break() {
                                break;
                            }
                        }
                        None if line.trim().is_empty() => {}
                        None => println!("Unknown command: {} (try 'help')", line.trim()),
                    }
                }
            }
        }
    }

    fn current_folder(&self) -> Option<PathBuf> {
        let registry = self.state.registry.lock().unwrap_or_else(|e| e.into_inner());
        registry.current().folder().map(|f| f.to_path_buf())
    }

    /// Applies one command. Breaks when the console should exit.
    pub fn execute(&mut self, command: Command) -> ControlFlow<()> {
        match command {
            Command::Key(key) => {
                let active = self.services.selection.active_entry();
                if !dispatch_key(&self.state.bus, key, self.context, active.as_ref()) {
                    debug!("Key {:?} ignored in {:?} context", key, self.context);
                }
            }
            Command::Open(dir) => {
                if let Err(e) = self.services.loading.open_directory(&dir) {
                    error!("Failed to open directory: {}", e);
                    eprintln!("Failed to open directory: {}", e);
                }
            }
            Command::Drop(paths) => {
                if !self.services.loading.accepts_drop(&paths) {
                    eprintln!("Drop rejected: expected a single directory");
                } else if let Err(e) = self.services.loading.open_dropped(&paths) {
                    eprintln!("Failed to open dropped directory: {}", e);
                }
            }
            Command::Pick => match rfd::FileDialog::new().pick_folder() {
                Some(dir) => return self.execute(Command::Open(dir)),
                None => println!("No folder selected"),
            },
            Command::Tab(key) => match self.services.selection.set_current_collection(key) {
                Ok(()) => println!("{}", window_title(self.current_folder().as_deref())),
                Err(e) => eprintln!("{}", e),
            },
            Command::Close(key) => {
                if let Err(e) = self.services.selection.close_collection(key) {
                    eprintln!("{}", e);
                }
            }
            Command::Goto(index) => {
                let entry = {
                    let registry = self.state.registry.lock().unwrap_or_else(|e| e.into_inner());
                    registry.current().entries().get(index).cloned()
                };
                match entry {
                    Some(entry) => self.state.bus.publish(GotoEntry { entry }),
                    None => eprintln!("No entry at index {}", index),
                }
            }
            Command::List => self.print_collections(),
            Command::Focus(context) => {
                self.context = context;
                println!("Focus: {:?}", self.context());
            }
            Command::DoubleClick => {
                self.services.preview.toggle_display_mode();
                self.print_preview();
            }
            Command::Zoom(Some(scale)) => {
                self.services.preview.set_scale(scale);
                self.print_preview();
            }
            Command::Zoom(None) => {
                self.services.preview.next_scale();
                self.print_preview();
            }
            Command::Viewport { width, height } => {
                let key = self.services.selection.current_collection();
                self.state.viewport.set_viewport(key, width, height);
                self.window = (width, height);
            }
            Command::Help => println!("{}", HELP),
            Command::Quit => return ControlFlow::Break(()),
        }
        ControlFlow::Continue(())
    }

    fn print_preview(&self) {
        let preview = self.services.preview.state();
        let (width, height) = self.window;
        match preview.displayed_size(width, height) {
            Some((w, h)) => println!(
                "Display mode: {:?} at {} ({:.0}x{:.0})",
                preview.mode(),
                preview.scale(),
                w,
                h
            ),
            None => println!("Display mode: {:?} at {}", preview.mode(), preview.scale()),
        }
    }

    fn print_collections(&self) {
        for line in self.collection_lines() {
            println!("{}", line);
        }
    }

    fn collection_lines(&self) -> Vec<String> {
        let registry = self.state.registry.lock().unwrap_or_else(|e| e.into_inner());
        let current = registry.current_key();
        let mut lines = Vec::new();
        for collection in registry.collections() {
            let marker = if collection.key() == current { '*' } else { ' ' };
            lines.push(format!("{} {} ({} images)", marker, collection.name(), collection.len()));
        }
        if let Some(scroll) = self.state.viewport.scroll_value(current) {
            lines.push(format!("  scroll {:.3}", scroll));
        }
        for (index, entry) in registry.current().entries().iter().enumerate() {
            let marker = if entry.is_active() { '>' } else { ' ' };
            let pending = if entry.has_placeholder() { " (loading)" } else { "" };
            lines.push(format!("  {}{:>4} {}{}", marker, index, entry.label(), pending));
        }
        lines
    }
}
