//! Service layer for business logic.
//!
//! Separates the loading pipeline, selection handling and preview model from
//! the front end so each can be driven and tested through the event bus.

pub mod loading_service;
pub mod preview_service;
pub mod selection_service;

pub use loading_service::LoadingService;
pub use preview_service::{PreviewService, ScaleRatio};
pub use selection_service::SelectionCoordinator;

use crate::state::AppState;
use std::sync::Arc;

/// Every service the front end talks to, wired to one [`AppState`].
#[derive(Clone)]
pub struct Services {
    pub loading: LoadingService,
    pub selection: Arc<SelectionCoordinator>,
    pub preview: Arc<PreviewService>,
}

impl Services {
    pub fn install(state: &AppState) -> Self {
        Self {
            loading: LoadingService::new(state),
            selection: SelectionCoordinator::install(state),
            preview: PreviewService::install(state),
        }
    }
}
