//! Terminal Grid
//!
//! A 2D grid of cells covering both the visible window and the scrollback
//! history above it. Rows are addressed physically: row 0 is the oldest
//! remembered row, row `total_rows() - 1` the newest. The visible window is
//! always the bottom `visible_rows()` rows.

use std::collections::VecDeque;

use serde::{Deserialize, Serialize};

use super::cell::{Cell, StyleId};

/// A row of cells in the terminal
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Row {
    /// The cells in this row
    pub cells: Vec<Cell>,
}

impl Row {
    pub fn new(cols: usize, fill: StyleId) -> Self {
        Self {
            cells: vec![Cell::blank(fill); cols],
        }
    }

    /// Grow the row to `cols` cells; never shrinks
    pub fn extend_to(&mut self, cols: usize, fill: StyleId) {
        if cols > self.cells.len() {
            self.cells.resize(cols, Cell::blank(fill));
        }
    }

    pub fn clear(&mut self, fill: StyleId) {
        for cell in &mut self.cells {
            cell.clear(fill);
        }
    }

    /// Row text with trailing blanks removed
    pub fn text(&self) -> String {
        let text: String = self.cells.iter().map(|c| c.ch).collect();
        text.trim_end_matches(' ').to_string()
    }
}

/// How an `insert_row` call reshaped the grid
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InsertOutcome {
    /// Spare scrollback capacity existed; the grid grew by one row
    Grew,
    /// Scrollback was full; the oldest row was evicted
    Evicted,
}

/// Result of a resize request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResizeOutcome {
    /// Requested size equals the current size
    Unchanged,
    /// Request would shrink a dimension and was refused
    Refused,
    /// Grid grew in at least one dimension
    Grown,
}

/// The terminal grid - visible rows plus scrollback
#[derive(Debug, Clone)]
pub struct Grid {
    rows: VecDeque<Row>,
    columns: usize,
    visible_rows: usize,
    scrollback_limit: usize,
    /// Style applied to cells created or cleared from now on
    fill: StyleId,
    /// Number of rows dropped off the top since creation
    evicted: u64,
}

impl Grid {
    /// Create a grid with `visible_rows` rows. The scrollback limit is
    /// raised to `visible_rows` if smaller. Dimensions are expected to be
    /// positive; callers validate them.
    pub fn new(columns: usize, visible_rows: usize, scrollback_limit: usize, fill: StyleId) -> Self {
        let columns = columns.max(1);
        let visible_rows = visible_rows.max(1);
        Self {
            rows: (0..visible_rows).map(|_| Row::new(columns, fill)).collect(),
            columns,
            visible_rows,
            scrollback_limit: scrollback_limit.max(visible_rows),
            fill,
            evicted: 0,
        }
    }

    pub fn columns(&self) -> usize {
        self.columns
    }

    pub fn visible_rows(&self) -> usize {
        self.visible_rows
    }

    /// Number of rows currently remembered (visible + scrollback)
    pub fn total_rows(&self) -> usize {
        self.rows.len()
    }

    pub fn scrollback_limit(&self) -> usize {
        self.scrollback_limit
    }

    /// Physical index of the first visible row
    pub fn viewport_offset(&self) -> usize {
        self.rows.len() - self.visible_rows
    }

    pub fn evicted_rows(&self) -> u64 {
        self.evicted
    }

    pub fn fill_style(&self) -> StyleId {
        self.fill
    }

    pub fn set_fill_style(&mut self, fill: StyleId) {
        self.fill = fill;
    }

    pub fn row(&self, row: usize) -> Option<&Row> {
        self.rows.get(row)
    }

    pub fn rows(&self) -> impl Iterator<Item = &Row> {
        self.rows.iter()
    }

    pub fn cell(&self, col: usize, row: usize) -> Option<&Cell> {
        self.rows.get(row).and_then(|r| r.cells.get(col))
    }

    pub fn cell_mut(&mut self, col: usize, row: usize) -> Option<&mut Cell> {
        self.rows.get_mut(row).and_then(|r| r.cells.get_mut(col))
    }

    /// Store a cell; returns false if the position is outside the grid
    pub fn set_cell(&mut self, col: usize, row: usize, cell: Cell) -> bool {
        match self.cell_mut(col, row) {
            Some(slot) => {
                *slot = cell;
                true
            }
            None => false,
        }
    }

    /// Insert a blank row at physical `row`.
    ///
    /// With spare capacity the grid grows and everything at or below `row`
    /// shifts down; a request for the last row appends after it. Once the
    /// scrollback limit is reached the oldest row is evicted and the rows
    /// above `row` shift up, so the blank lands at `row`.
    pub fn insert_row(&mut self, row: usize) -> InsertOutcome {
        let last = self.rows.len() - 1;
        let row = row.min(last);
        let blank = Row::new(self.columns, self.fill);

        if self.rows.len() < self.scrollback_limit {
            let at = if row == last { row + 1 } else { row };
            self.rows.insert(at, blank);
            InsertOutcome::Grew
        } else {
            self.rows.pop_front();
            self.evicted += 1;
            self.rows.insert(row, blank);
            InsertOutcome::Evicted
        }
    }

    /// Grow to `columns` x `visible_rows`. Shrinking either dimension is
    /// refused and leaves the grid untouched.
    pub fn resize(&mut self, columns: usize, visible_rows: usize) -> ResizeOutcome {
        if columns == self.columns && visible_rows == self.visible_rows {
            return ResizeOutcome::Unchanged;
        }
        if columns < self.columns || visible_rows < self.visible_rows {
            return ResizeOutcome::Refused;
        }

        if columns > self.columns {
            for row in &mut self.rows {
                row.extend_to(columns, self.fill);
            }
            self.columns = columns;
        }

        if visible_rows > self.visible_rows {
            self.scrollback_limit = self.scrollback_limit.max(visible_rows);
            while self.rows.len() < visible_rows {
                self.rows.push_back(Row::new(self.columns, self.fill));
            }
            self.visible_rows = visible_rows;
        }

        ResizeOutcome::Grown
    }

    /// Reset every cell, scrollback included, to a blank in the fill style
    pub fn clear(&mut self) {
        let fill = self.fill;
        for row in &mut self.rows {
            row.clear(fill);
        }
    }

    /// Mark the inclusive block `(x1, y1)..=(x2, y2)` as highlighted and
    /// every other cell as not highlighted. Coordinates are physical and
    /// may be given in any order; they are clamped to the grid.
    pub fn highlight_block(&mut self, x1: usize, y1: usize, x2: usize, y2: usize) {
        let (left, right, top, bottom) = self.normalize_block(x1, y1, x2, y2);
        for (y, row) in self.rows.iter_mut().enumerate() {
            for (x, cell) in row.cells.iter_mut().enumerate() {
                cell.highlighted = (top..=bottom).contains(&y) && (left..=right).contains(&x);
            }
        }
    }

    pub fn clear_highlight(&mut self) {
        for row in &mut self.rows {
            for cell in &mut row.cells {
                cell.highlighted = false;
            }
        }
    }

    /// Bounding box of highlighted cells, if any: `(left, top, right, bottom)`
    pub fn highlighted_bounds(&self) -> Option<(usize, usize, usize, usize)> {
        let mut bounds: Option<(usize, usize, usize, usize)> = None;
        for (y, row) in self.rows.iter().enumerate() {
            for (x, cell) in row.cells.iter().enumerate() {
                if !cell.highlighted {
                    continue;
                }
                bounds = Some(match bounds {
                    None => (x, y, x, y),
                    Some((l, t, r, b)) => (l.min(x), t.min(y), r.max(x), b.max(y)),
                });
            }
        }
        bounds
    }

    /// Text of the inclusive block; rows are joined with `\n` when the
    /// block spans more than one row.
    pub fn block_text(&self, x1: usize, y1: usize, x2: usize, y2: usize) -> String {
        let (left, right, top, bottom) = self.normalize_block(x1, y1, x2, y2);
        let mut text = String::new();
        for y in top..=bottom {
            if let Some(row) = self.rows.get(y) {
                text.extend(row.cells[left..=right].iter().map(|c| c.ch));
            }
            if top != bottom {
                text.push('\n');
            }
        }
        text
    }

    fn normalize_block(&self, x1: usize, y1: usize, x2: usize, y2: usize) -> (usize, usize, usize, usize) {
        let max_x = self.columns - 1;
        let max_y = self.rows.len() - 1;
        (
            x1.min(x2).min(max_x),
            x1.max(x2).min(max_x),
            y1.min(y2).min(max_y),
            y1.max(y2).min(max_y),
        )
    }
}
