//! Cursor state management
//!
//! The cursor stores its row physically (scrollback-inclusive) and exposes
//! logical, viewport-relative rows through [`Cursor::logical_row`] and
//! [`Cursor::physical_from_logical`]. Logical rows are signed: a cursor that
//! sits in scrollback above the viewport has a negative logical row.

use serde::{Deserialize, Serialize};

/// Cursor shape/style
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum CursorShape {
    /// Thin bar before the cell (shown while awaiting input)
    #[default]
    Insert,
    /// Bar drawn over the cell
    Overstrike,
    /// Nothing drawn (used while a key is being processed)
    Invisible,
}

impl CursorShape {
    pub fn name(self) -> &'static str {
        match self {
            CursorShape::Insert => "insert",
            CursorShape::Overstrike => "overstrike",
            CursorShape::Invisible => "invisible",
        }
    }
}

/// Cursor position and appearance
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cursor {
    /// Column position (0-indexed)
    pub col: usize,
    /// Physical row position (0-indexed from the oldest scrollback row)
    pub row: usize,
    /// Cursor shape
    pub shape: CursorShape,
    /// Current blink phase; `true` means drawn
    pub blink_on: bool,
}

impl Default for Cursor {
    fn default() -> Self {
        Self {
            col: 0,
            row: 0,
            shape: CursorShape::Insert,
            blink_on: true,
        }
    }
}

impl Cursor {
    /// Create a new cursor at the home position
    pub fn new() -> Self {
        Self::default()
    }

    /// Viewport-relative row for a grid whose first visible row is `offset`
    pub fn logical_row(&self, offset: usize) -> isize {
        self.row as isize - offset as isize
    }

    /// Physical row for a logical row, unclamped. Saturates at the
    /// `isize` bounds.
    pub fn physical_from_logical(logical: isize, offset: usize) -> isize {
        logical.saturating_add(offset as isize)
    }

    /// Whether the position lies inside a `cols` x `rows` grid
    pub fn in_bounds(&self, cols: usize, rows: usize) -> bool {
        self.col < cols && self.row < rows
    }

    /// Clamp into a `cols` x `rows` grid; returns true if anything changed
    pub fn clamp(&mut self, cols: usize, rows: usize) -> bool {
        let col = self.col.min(cols.saturating_sub(1));
        let row = self.row.min(rows.saturating_sub(1));
        let changed = col != self.col || row != self.row;
        self.col = col;
        self.row = row;
        changed
    }

    /// Move to an absolute physical position, clamping to bounds
    pub fn move_to(&mut self, col: usize, row: usize, cols: usize, rows: usize) {
        self.col = col.min(cols.saturating_sub(1));
        self.row = row.min(rows.saturating_sub(1));
    }
}
