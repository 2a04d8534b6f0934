//! Screen model implementation
//!
//! The screen bundles everything a terminal mutates under its lock: the
//! grid with its scrollback, the cursor, the style table and the render
//! scheduler. Every primitive here reports the cells it touched to the
//! scheduler; nothing is painted directly.
//!
//! Cursor rows are physical inside the screen. The `cursor_y` /
//! `set_cursor_position` pair and the other public coordinates that an
//! application sees are logical (relative to the top of the visible window).

use std::time::Instant;

use tracing::{debug, trace, warn};
use unicode_width::UnicodeWidthChar;

use super::cell::{Cell, Color, Style, StyleId, StyleTable};
use super::cursor::{Cursor, CursorShape};
use super::grid::{Grid, InsertOutcome, ResizeOutcome};
use super::snapshot::Snapshot;
use crate::error::{Error, Result};
use crate::render::{CellRect, RenderFrame, RenderScheduler};

/// Default number of columns
pub const DEFAULT_COLUMNS: usize = 80;
/// Default number of visible rows
pub const DEFAULT_ROWS: usize = 25;
/// Default number of rows remembered, visible rows included
pub const DEFAULT_SCROLLBACK: usize = 200;
/// Default tab width
pub const DEFAULT_TAB_WIDTH: usize = 4;

/// The main screen structure
#[derive(Debug, Clone)]
pub struct Screen {
    grid: Grid,
    cursor: Cursor,
    styles: StyleTable,
    /// Style given to newly written cells and newly created rows
    current: StyleId,
    tab_width: usize,
    render: RenderScheduler,
}

impl Screen {
    /// Create a screen with default colors and timing
    pub fn new(columns: usize, rows: usize, scrollback: usize) -> Result<Self> {
        Self::with_options(
            columns,
            rows,
            scrollback,
            Style::default(),
            DEFAULT_TAB_WIDTH,
            RenderScheduler::default(),
        )
    }

    /// Create a screen with an explicit default style, tab width and
    /// scheduler
    pub fn with_options(
        columns: usize,
        rows: usize,
        scrollback: usize,
        style: Style,
        tab_width: usize,
        render: RenderScheduler,
    ) -> Result<Self> {
        if columns == 0 || rows == 0 {
            return Err(Error::InvalidDimensions { columns, rows });
        }
        Ok(Self {
            grid: Grid::new(columns, rows, scrollback, StyleId::DEFAULT),
            cursor: Cursor::new(),
            styles: StyleTable::new(style),
            current: StyleId::DEFAULT,
            tab_width: tab_width.max(1),
            render,
        })
    }

    pub fn columns(&self) -> usize {
        self.grid.columns()
    }

    /// Number of visible rows
    pub fn rows(&self) -> usize {
        self.grid.visible_rows()
    }

    pub fn total_rows(&self) -> usize {
        self.grid.total_rows()
    }

    pub fn grid(&self) -> &Grid {
        &self.grid
    }

    pub fn cursor(&self) -> &Cursor {
        &self.cursor
    }

    pub fn styles(&self) -> &StyleTable {
        &self.styles
    }

    pub fn scheduler(&self) -> &RenderScheduler {
        &self.render
    }

    pub fn tab_width(&self) -> usize {
        self.tab_width
    }

    /// Cursor column
    pub fn cursor_x(&self) -> usize {
        self.cursor.col
    }

    /// Logical cursor row; negative while the cursor sits in scrollback
    pub fn cursor_y(&self) -> isize {
        self.cursor.logical_row(self.grid.viewport_offset())
    }

    /// Style used for subsequent writes
    pub fn text_color(&self) -> Style {
        self.styles.get(self.current)
    }

    pub fn set_text_color(&mut self, foreground: Color, background: Color) {
        self.current = self.styles.intern(Style::new(foreground, background));
        self.grid.set_fill_style(self.current);
    }

    pub fn cursor_shape(&self) -> CursorShape {
        self.cursor.shape
    }

    pub fn set_cursor_shape(&mut self, shape: CursorShape) {
        if self.cursor.shape != shape {
            self.cursor.shape = shape;
            self.mark_cursor();
        }
    }

    /// Write one character at the cursor and advance.
    ///
    /// `\n` starts a new row, `\r` is ignored and `\t` pads with spaces to
    /// the next tab stop. Other control and zero-width characters produce
    /// no cell.
    pub fn write_char(&mut self, c: char) {
        match c {
            '\n' => self.newline(),
            '\r' => {}
            '\t' => {
                let pad = self.tab_width - self.cursor.col % self.tab_width;
                for _ in 0..pad {
                    self.put(' ');
                }
            }
            c if c.is_control() => trace!(code = c as u32, "dropping control character"),
            c if c.width() == Some(0) => trace!(code = c as u32, "dropping zero-width character"),
            c => self.put(c),
        }
    }

    /// Write `chars[offset..offset + length]`, clamped to the slice
    pub fn write_slice(&mut self, chars: &[char], offset: usize, length: usize) {
        let start = offset.min(chars.len());
        let end = offset.saturating_add(length).min(chars.len());
        for &c in &chars[start..end] {
            self.write_char(c);
        }
    }

    pub fn write_str(&mut self, s: &str) {
        for c in s.chars() {
            self.write_char(c);
        }
    }

    /// Place a glyph at a logical position without moving the cursor
    pub fn write_at(&mut self, x: usize, y: isize, c: char) {
        if c.is_control() {
            return;
        }
        let col = x.min(self.columns() - 1);
        let row = self.clamp_logical(y);
        self.grid.set_cell(col, row, Cell::new(c, self.current));
        self.render.mark_cell(col, row);
    }

    /// Move to column 0 of the next row, scrolling if needed
    pub fn newline(&mut self) {
        let old = (self.cursor.col, self.cursor.row);
        self.cursor.col = 0;
        self.cursor.row += 1;
        if self.cursor.row >= self.grid.total_rows() {
            self.scroll_by_one_row();
        }
        self.cursor_moved(old);
    }

    /// Store `c` at the cursor and advance one column
    fn put(&mut self, c: char) {
        self.ensure_cursor_in_bounds();
        let (col, row) = (self.cursor.col, self.cursor.row);
        self.grid.set_cell(col, row, Cell::new(c, self.current));
        self.render.mark_cell(col, row);
        self.advance();
    }

    fn advance(&mut self) {
        let old = (self.cursor.col, self.cursor.row);
        self.cursor.col += 1;
        if self.cursor.col >= self.columns() {
            self.cursor.col = 0;
            self.cursor.row += 1;
            if self.cursor.row >= self.grid.total_rows() {
                self.scroll_by_one_row();
            }
        }
        self.cursor_moved(old);
    }

    /// Pull a drifted cursor back into the grid
    fn ensure_cursor_in_bounds(&mut self) {
        let (cols, rows) = (self.columns(), self.total_rows());
        if !self.cursor.in_bounds(cols, rows) {
            warn!(
                col = self.cursor.col,
                row = self.cursor.row,
                "cursor outside grid, clamping"
            );
            self.cursor.clamp(cols, rows);
        }
    }

    /// Open a blank row below the last one and request a snap to bottom.
    ///
    /// When the scrollback is full the oldest row is dropped, and the
    /// cursor moves up with the content it was on.
    pub fn scroll_by_one_row(&mut self) -> InsertOutcome {
        self.render.request_snap_to_bottom();
        let outcome = self.insert_row(self.grid.total_rows() - 1);
        if outcome == InsertOutcome::Evicted {
            self.cursor.row = self.cursor.row.saturating_sub(1);
        }
        outcome
    }

    /// Insert a blank row at a physical row index
    pub fn insert_row(&mut self, row: usize) -> InsertOutcome {
        let outcome = self.grid.insert_row(row);
        self.mark_all();
        outcome
    }

    /// Blank every cell in the current style and home the cursor to the
    /// first physical row
    pub fn clear(&mut self) {
        self.grid.set_fill_style(self.current);
        self.grid.clear();
        let old = (self.cursor.col, self.cursor.row);
        self.cursor.col = 0;
        self.cursor.row = 0;
        self.cursor_moved(old);
        self.render.request_snap_to_top();
        self.mark_all();
    }

    /// Grow the grid. Zero dimensions are an error; shrinking is refused
    /// and leaves the screen untouched.
    pub fn resize(&mut self, columns: usize, rows: usize) -> Result<ResizeOutcome> {
        if columns == 0 || rows == 0 {
            return Err(Error::InvalidDimensions { columns, rows });
        }
        let outcome = self.grid.resize(columns, rows);
        match outcome {
            ResizeOutcome::Unchanged => {}
            ResizeOutcome::Refused => debug!(
                from_columns = self.columns(),
                from_rows = self.rows(),
                columns,
                rows,
                "refusing to shrink grid"
            ),
            ResizeOutcome::Grown => {
                debug!(columns = self.columns(), rows = self.rows(), "grid resized");
                self.render.invalidate_layout();
                self.mark_all();
            }
        }
        Ok(outcome)
    }

    /// Move the cursor to a logical position, clamped into the grid
    pub fn set_cursor_position(&mut self, x: usize, y: isize) {
        let old = (self.cursor.col, self.cursor.row);
        let row = self.clamp_logical(y);
        let (cols, rows) = (self.columns(), self.total_rows());
        self.cursor.move_to(x, row, cols, rows);
        self.cursor_moved(old);
    }

    /// Move the cursor `delta` columns, wrapping across rows.
    ///
    /// Returns false (and leaves the cursor alone) if the target lies
    /// before the first cell. Moving past the last row opens new rows.
    pub fn move_relative(&mut self, delta: isize) -> bool {
        let cols = self.columns() as isize;
        let mut col = (self.cursor.col as isize).saturating_add(delta);
        let row = (self.cursor.row as isize).saturating_add(col.div_euclid(cols));
        col = col.rem_euclid(cols);
        if row < 0 {
            trace!(delta, "relative move before first cell refused");
            return false;
        }

        let mut row = row as usize;
        while row >= self.grid.total_rows() {
            if self.insert_row(self.grid.total_rows() - 1) == InsertOutcome::Evicted {
                row -= 1;
                self.cursor.row = self.cursor.row.saturating_sub(1);
            }
        }

        let old = (self.cursor.col, self.cursor.row);
        self.cursor.col = col as usize;
        self.cursor.row = row;
        self.cursor_moved(old);
        true
    }

    /// Erase the character left of the cursor, leaving the cursor on it
    pub fn erase_previous(&mut self) {
        if self.move_relative(-1) {
            self.write_char(' ');
            self.move_relative(-1);
        }
    }

    /// Highlight the inclusive block between two logical positions
    pub fn highlight_selection(&mut self, x1: usize, y1: isize, x2: usize, y2: isize) {
        let (r1, r2) = (self.clamp_logical(y1), self.clamp_logical(y2));
        self.grid.highlight_block(x1, r1, x2, r2);
        self.mark_all();
    }

    pub fn clear_highlight(&mut self) {
        if self.grid.highlighted_bounds().is_some() {
            self.grid.clear_highlight();
            self.mark_all();
        }
    }

    /// Text of the highlighted block, empty if nothing is highlighted
    pub fn selected_text(&self) -> String {
        match self.grid.highlighted_bounds() {
            Some((left, top, right, bottom)) => self.grid.block_text(left, top, right, bottom),
            None => String::new(),
        }
    }

    /// Text of the visible rows, trailing blanks trimmed
    pub fn visible_text(&self) -> Vec<String> {
        let offset = self.grid.viewport_offset();
        self.grid.rows().skip(offset).map(|row| row.text()).collect()
    }

    pub fn snapshot(&self) -> Snapshot {
        Snapshot::from_screen(self)
    }

    pub fn page_up(&mut self) -> CellRect {
        self.render.page_up(self.columns(), self.total_rows(), self.rows())
    }

    pub fn page_down(&mut self) -> CellRect {
        self.render.page_down(self.columns(), self.total_rows(), self.rows())
    }

    /// Scroll the viewport so the cursor row is shown, if it is not
    pub fn ensure_cursor_visible(&mut self) -> Option<CellRect> {
        self.render
            .ensure_visible(self.cursor.row, self.columns(), self.total_rows(), self.rows())
    }

    /// Advance the blink phase if due and take the frame if its delay has
    /// passed
    pub fn tick(&mut self, now: Instant) -> Option<RenderFrame> {
        if self.render.blink_due(now) {
            self.cursor.blink_on = !self.cursor.blink_on;
            self.mark_cursor();
        }
        self.render
            .flush_ready(now, self.columns(), self.total_rows(), self.rows())
    }

    /// Take pending render work regardless of the debounce delay
    pub fn flush(&mut self) -> Option<RenderFrame> {
        if !self.render.is_pending() {
            return None;
        }
        Some(self.render.flush(self.columns(), self.total_rows(), self.rows()))
    }

    fn clamp_logical(&self, y: isize) -> usize {
        let physical = Cursor::physical_from_logical(y, self.grid.viewport_offset());
        physical.clamp(0, self.total_rows() as isize - 1) as usize
    }

    fn mark_cursor(&mut self) {
        self.render.mark_cell(self.cursor.col, self.cursor.row);
    }

    fn mark_all(&mut self) {
        self.render.mark_all(self.columns(), self.total_rows());
    }

    /// Repaint both cursor cells and show the cursor for a full blink phase
    fn cursor_moved(&mut self, old: (usize, usize)) {
        self.render.mark_cell(old.0, old.1);
        self.mark_cursor();
        self.cursor.blink_on = true;
        self.render.restart_blink();
    }
}

impl Default for Screen {
    fn default() -> Self {
        Self {
            grid: Grid::new(DEFAULT_COLUMNS, DEFAULT_ROWS, DEFAULT_SCROLLBACK, StyleId::DEFAULT),
            cursor: Cursor::new(),
            styles: StyleTable::default(),
            current: StyleId::DEFAULT,
            tab_width: DEFAULT_TAB_WIDTH,
            render: RenderScheduler::default(),
        }
    }
}
