//! Scroll-into-view computation for the thumbnail grid.
//!
//! Scroll values follow the usual scroll-pane convention: `scroll_value` lies in
//! `[vmin, vmax]` (normally `[0, 1]`) and maps linearly onto
//! `[0, content_height - viewport_height]` pixels.

use crate::config::THUMBNAIL_SIZE;
use crate::events::ScrollPosition;
use crate::state::CollectionKey;
use std::collections::HashMap;
use std::sync::Mutex;

/// Extra space kept between the active thumbnail and the viewport edge.
pub const SCROLL_MARGIN: f64 = 10.0;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScrollGeometry {
    pub item_top: f64,
    pub item_height: f64,
    pub viewport_height: f64,
    pub content_height: f64,
    pub scroll_value: f64,
    pub vmin: f64,
    pub vmax: f64,
}

/// Decides whether the item must be scrolled into view and the new scroll value.
///
/// Returns `None` when the item is fully visible or the layout is not known yet.
pub fn scroll_target(g: &ScrollGeometry) -> Option<(ScrollPosition, f64)> {
    if g.content_height <= 0.0 {
        return None;
    }

    let scrollable = g.content_height - g.viewport_height;
    if scrollable <= 0.0 {
        return None;
    }
    let viewport_top = g.scroll_value * scrollable;

    let (position, target_top) = if g.item_top < viewport_top {
        (ScrollPosition::Above, g.item_top - SCROLL_MARGIN)
    } else if g.item_top + g.item_height > viewport_top + g.viewport_height {
        (
            ScrollPosition::Below,
            g.item_top + g.item_height - g.viewport_height + SCROLL_MARGIN,
        )
    } else {
        return None;
    };

    let value = (target_top / scrollable).clamp(g.vmin, g.vmax);
    Some((position, value))
}

/// Source of layout information for the view layer's thumbnail grids.
pub trait ViewportGeometry: Send + Sync {
    /// Geometry of the item at `index` in a grid of `len` items.
    fn geometry(&self, collection: CollectionKey, index: usize, len: usize) -> Option<ScrollGeometry>;
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct ViewportState {
    width: f64,
    height: f64,
    scroll_value: f64,
}

/// Flow layout of fixed-size thumbnail cells, as the view layer lays them out.
///
/// The view layer reports viewport sizes and scroll positions per collection.
#[derive(Debug)]
pub struct GridViewport {
    cell: f64,
    gap: f64,
    padding: f64,
    viewports: Mutex<HashMap<CollectionKey, ViewportState>>,
}

impl Default for GridViewport {
    fn default() -> Self {
        Self {
            cell: THUMBNAIL_SIZE as f64,
            gap: 10.0,
            padding: 10.0,
            viewports: Mutex::new(HashMap::new()),
        }
    }
}

impl GridViewport {
    pub fn set_viewport(&self, collection: CollectionKey, width: f64, height: f64) {
        let mut viewports = self.viewports.lock().unwrap_or_else(|e| e.into_inner());
        let state = viewports.entry(collection).or_insert(ViewportState {
            width,
            height,
            scroll_value: 0.0,
        });
        state.width = width;
        state.height = height;
    }

    pub fn set_scroll_value(&self, collection: CollectionKey, value: f64) {
        let mut viewports = self.viewports.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(state) = viewports.get_mut(&collection) {
            state.scroll_value = value.clamp(0.0, 1.0);
        }
    }

    pub fn scroll_value(&self, collection: CollectionKey) -> Option<f64> {
        let viewports = self.viewports.lock().unwrap_or_else(|e| e.into_inner());
        viewports.get(&collection).map(|s| s.scroll_value)
    }

    fn columns(&self, width: f64) -> usize {
        let usable = (width - 2.0 * self.padding + self.gap).max(0.0);
        ((usable / (self.cell + self.gap)).floor() as usize).max(1)
    }
}

impl ViewportGeometry for GridViewport {
    fn geometry(&self, collection: CollectionKey, index: usize, len: usize) -> Option<ScrollGeometry> {
        let state = {
            let viewports = self.viewports.lock().unwrap_or_else(|e| e.into_inner());
            *viewports.get(&collection)?
        };
        if len == 0 {
            return None;
        }

        let columns = self.columns(state.width);
        let rows = len.div_ceil(columns);
        let row = index / columns;
        let pitch = self.cell + self.gap;
        let content_height = 2.0 * self.padding + rows as f64 * pitch - self.gap;

        Some(ScrollGeometry {
            item_top: self.padding + row as f64 * pitch,
            item_height: self.cell,
            viewport_height: state.height,
            content_height,
            scroll_value: state.scroll_value,
            vmin: 0.0,
            vmax: 1.0,
        })
    }
}
