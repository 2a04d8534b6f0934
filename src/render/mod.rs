//! Render scheduling
//!
//! Screen mutations do not paint anything themselves. They report dirty
//! cells to a [`RenderScheduler`], which grows a single bounding rectangle
//! until a short debounce delay has passed and then hands out one
//! [`RenderFrame`] for the host to apply. The scheduler also owns the
//! viewport position used for paging and snapping.
//!
//! Like the rest of the core this is a pure data structure: timestamps are
//! passed in so the debounce can be tested without sleeping.

mod worker;

use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};

pub use worker::spawn_worker;

/// Default debounce applied to repaint requests
pub const DEFAULT_REPAINT_DELAY_MS: u64 = 25;

/// Default cursor blink half-period
pub const DEFAULT_BLINK_MS: u64 = 500;

/// Worker wake-up period
pub const WORKER_TICK_MS: u64 = 10;

/// Rows kept in view when paging
const PAGE_OVERLAP: usize = 3;

/// A rectangle of character cells in physical grid coordinates
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CellRect {
    pub x: usize,
    pub y: usize,
    pub width: usize,
    pub height: usize,
}

impl CellRect {
    pub fn new(x: usize, y: usize, width: usize, height: usize) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    pub fn cell(x: usize, y: usize) -> Self {
        Self::new(x, y, 1, 1)
    }

    /// Smallest rectangle covering both
    pub fn union(&self, other: &CellRect) -> CellRect {
        let x = self.x.min(other.x);
        let y = self.y.min(other.y);
        let right = (self.x + self.width).max(other.x + other.width);
        let bottom = (self.y + self.height).max(other.y + other.height);
        CellRect::new(x, y, right - x, bottom - y)
    }

    pub fn contains(&self, x: usize, y: usize) -> bool {
        x >= self.x && x < self.x + self.width && y >= self.y && y < self.y + self.height
    }
}

/// Pending viewport jump applied with the next frame
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ViewportSnap {
    Top,
    Bottom,
}

/// One coalesced batch of render work
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderFrame {
    /// Layout was invalidated (grid resized); the host should re-measure
    pub relayout: bool,
    /// Viewport to scroll to, if a snap was pending
    pub scroll_to: Option<CellRect>,
    /// Cells that need repainting
    pub dirty: Option<CellRect>,
}

impl RenderFrame {
    /// Apply the frame to a host in order: layout, scroll, repaint
    pub fn deliver(&self, host: &dyn RenderHost) {
        if self.relayout {
            host.relayout();
        }
        if let Some(viewport) = self.scroll_to {
            host.scroll_to(viewport);
        }
        if let Some(region) = self.dirty {
            host.repaint(region);
        }
    }
}

/// Callbacks into the windowing layer that displays the grid.
///
/// Calls are made without the screen lock held, so an implementation may
/// read the terminal while handling them. Implementations should return
/// quickly; they run on the render worker thread.
pub trait RenderHost: Send + Sync {
    /// Redraw the given cells
    fn repaint(&self, region: CellRect);

    /// Scroll so that the given cells are visible
    fn scroll_to(&self, viewport: CellRect);

    /// Grid dimensions changed
    fn relayout(&self) {}
}

/// Dirty-region accumulator with debounce and viewport tracking
#[derive(Debug, Clone)]
pub struct RenderScheduler {
    dirty: Option<CellRect>,
    snap_to_top: bool,
    snap_to_bottom: bool,
    /// Cleared by a resize until the next frame is taken
    layout_valid: bool,
    /// When the first request since the last frame arrived
    armed_at: Option<Instant>,
    delay: Duration,
    /// Physical row shown at the top of the viewport
    viewport_top: usize,
    blink_interval: Duration,
    next_blink: Instant,
}

impl RenderScheduler {
    pub fn new(delay: Duration, blink_interval: Duration) -> Self {
        Self {
            dirty: None,
            snap_to_top: false,
            snap_to_bottom: false,
            layout_valid: true,
            armed_at: None,
            delay,
            viewport_top: 0,
            blink_interval,
            next_blink: Instant::now() + blink_interval,
        }
    }

    /// Whether any work is waiting for the next frame
    pub fn is_pending(&self) -> bool {
        self.armed_at.is_some()
    }

    pub fn dirty_region(&self) -> Option<CellRect> {
        self.dirty
    }

    pub fn viewport_top(&self) -> usize {
        self.viewport_top
    }

    pub fn snap_to_top_pending(&self) -> bool {
        self.snap_to_top
    }

    pub fn snap_to_bottom_pending(&self) -> bool {
        self.snap_to_bottom
    }

    fn arm(&mut self) {
        if self.armed_at.is_none() {
            self.armed_at = Some(Instant::now());
        }
    }

    /// Add a rectangle to the dirty region
    pub fn mark(&mut self, rect: CellRect) {
        self.dirty = Some(match self.dirty {
            Some(existing) => existing.union(&rect),
            None => rect,
        });
        self.arm();
    }

    pub fn mark_cell(&mut self, x: usize, y: usize) {
        self.mark(CellRect::cell(x, y));
    }

    /// Mark a whole `columns` x `rows` grid dirty
    pub fn mark_all(&mut self, columns: usize, rows: usize) {
        self.mark(CellRect::new(0, 0, columns, rows));
    }

    pub fn request_snap_to_top(&mut self) {
        self.snap_to_top = true;
        self.arm();
    }

    pub fn request_snap_to_bottom(&mut self) {
        self.snap_to_bottom = true;
        self.arm();
    }

    /// The grid was reshaped; the host must lay out again
    pub fn invalidate_layout(&mut self) {
        self.layout_valid = false;
        self.arm();
    }

    /// Take the pending frame if its debounce delay has elapsed
    pub fn flush_ready(&mut self, now: Instant, columns: usize, total_rows: usize, visible_rows: usize) -> Option<RenderFrame> {
        let armed_at = self.armed_at?;
        if now.saturating_duration_since(armed_at) < self.delay {
            return None;
        }
        Some(self.flush(columns, total_rows, visible_rows))
    }

    /// Take the pending work immediately, ignoring the debounce
    pub fn flush(&mut self, columns: usize, total_rows: usize, visible_rows: usize) -> RenderFrame {
        let relayout = !self.layout_valid;
        let mut snap = None;

        // An invalid layout always ends up at the bottom, flag or not.
        if relayout || self.snap_to_bottom {
            snap = Some(ViewportSnap::Bottom);
            self.snap_to_bottom = false;
        }
        if self.snap_to_top {
            snap = Some(ViewportSnap::Top);
            self.snap_to_top = false;
        }

        let scroll_to = snap.map(|snap| {
            self.viewport_top = match snap {
                ViewportSnap::Top => 0,
                ViewportSnap::Bottom => total_rows.saturating_sub(visible_rows),
            };
            self.viewport(columns, visible_rows)
        });
        self.clamp_viewport(total_rows, visible_rows);

        self.layout_valid = true;
        self.armed_at = None;
        RenderFrame {
            relayout,
            scroll_to,
            dirty: self.dirty.take(),
        }
    }

    fn clamp_viewport(&mut self, total_rows: usize, visible_rows: usize) {
        self.viewport_top = self.viewport_top.min(total_rows.saturating_sub(visible_rows));
    }

    fn viewport(&self, columns: usize, visible_rows: usize) -> CellRect {
        CellRect::new(0, self.viewport_top, columns, visible_rows)
    }

    fn page_step(visible_rows: usize) -> usize {
        visible_rows.saturating_sub(PAGE_OVERLAP).max(1)
    }

    /// Scroll the viewport one page towards older rows
    pub fn page_up(&mut self, columns: usize, total_rows: usize, visible_rows: usize) -> CellRect {
        self.clamp_viewport(total_rows, visible_rows);
        self.viewport_top = self.viewport_top.saturating_sub(Self::page_step(visible_rows));
        self.viewport(columns, visible_rows)
    }

    /// Scroll the viewport one page towards newer rows
    pub fn page_down(&mut self, columns: usize, total_rows: usize, visible_rows: usize) -> CellRect {
        self.viewport_top += Self::page_step(visible_rows);
        self.clamp_viewport(total_rows, visible_rows);
        self.viewport(columns, visible_rows)
    }

    /// Scroll the minimum amount needed to show physical `row`; `None` if
    /// it is already visible
    pub fn ensure_visible(&mut self, row: usize, columns: usize, total_rows: usize, visible_rows: usize) -> Option<CellRect> {
        self.clamp_viewport(total_rows, visible_rows);
        if row < self.viewport_top {
            self.viewport_top = row;
        } else if row >= self.viewport_top + visible_rows {
            self.viewport_top = row + 1 - visible_rows;
        } else {
            return None;
        }
        self.clamp_viewport(total_rows, visible_rows);
        Some(self.viewport(columns, visible_rows))
    }

    /// Push the blink deadline one full interval away
    pub fn restart_blink(&mut self) {
        self.next_blink = Instant::now() + self.blink_interval;
    }

    /// True (and rearmed) when the blink deadline has passed
    pub fn blink_due(&mut self, now: Instant) -> bool {
        if now < self.next_blink {
            return false;
        }
        self.next_blink = now + self.blink_interval;
        true
    }
}

impl Default for RenderScheduler {
    fn default() -> Self {
        Self::new(
            Duration::from_millis(DEFAULT_REPAINT_DELAY_MS),
            Duration::from_millis(DEFAULT_BLINK_MS),
        )
    }
}
