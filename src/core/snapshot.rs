//! Deterministic snapshot generation
//!
//! Snapshots capture the grid (scrollback included), cursor and styles in a
//! serializable format for tests and the headless runner. The same sequence
//! of writes and keys always produces an identical snapshot.

use serde::{Deserialize, Serialize};

use super::cell::{Color, Style, StyleId};
use super::cursor::CursorShape;
use super::grid::Row;
use super::screen::Screen;

/// A complete snapshot of the screen state
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Snapshot {
    /// Screen dimensions
    pub cols: usize,
    pub rows: usize,
    /// Rows remembered, visible ones included
    pub total_rows: usize,
    pub scrollback_limit: usize,
    /// Physical index of the first visible row
    pub viewport_offset: usize,
    /// Every physical row, oldest first
    pub lines: Vec<LineSnapshot>,
    /// Interned styles, indexed by the ids used in `runs`
    pub styles: Vec<StyleSnapshot>,
    /// Cursor state
    pub cursor: CursorSnapshot,
}

/// Snapshot of one row
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineSnapshot {
    /// Row text with trailing blanks trimmed
    pub text: String,
    /// Maximal runs of cells not in the default style
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub runs: Vec<StyleRun>,
    /// Maximal runs of highlighted cells as `[start, end)` columns
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub highlighted: Vec<(usize, usize)>,
}

/// A run of same-styled cells within a row
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StyleRun {
    pub start: usize,
    pub len: usize,
    pub style: u32,
}

/// Snapshot of a color
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ColorSnapshot {
    Default,
    Indexed { index: u8 },
    Rgb { r: u8, g: u8, b: u8 },
}

/// Snapshot of a style
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StyleSnapshot {
    pub fg: ColorSnapshot,
    pub bg: ColorSnapshot,
}

/// Snapshot of cursor state
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CursorSnapshot {
    pub col: usize,
    /// Logical row (negative when above the viewport)
    pub row: isize,
    pub shape: String,
    pub visible: bool,
}

impl From<&Color> for ColorSnapshot {
    fn from(color: &Color) -> Self {
        match color {
            Color::Default => ColorSnapshot::Default,
            Color::Indexed(i) => ColorSnapshot::Indexed { index: *i },
            Color::Rgb(r, g, b) => ColorSnapshot::Rgb {
                r: *r,
                g: *g,
                b: *b,
            },
        }
    }
}

impl From<&Style> for StyleSnapshot {
    fn from(style: &Style) -> Self {
        StyleSnapshot {
            fg: ColorSnapshot::from(&style.foreground),
            bg: ColorSnapshot::from(&style.background),
        }
    }
}

impl From<&Row> for LineSnapshot {
    fn from(row: &Row) -> Self {
        let mut runs: Vec<StyleRun> = Vec::new();
        let mut highlighted: Vec<(usize, usize)> = Vec::new();

        for (col, cell) in row.cells.iter().enumerate() {
            if cell.style != StyleId::DEFAULT {
                match runs.last_mut() {
                    Some(run) if run.style == cell.style.0 && run.start + run.len == col => run.len += 1,
                    _ => runs.push(StyleRun {
                        start: col,
                        len: 1,
                        style: cell.style.0,
                    }),
                }
            }
            if cell.highlighted {
                match highlighted.last_mut() {
                    Some(span) if span.1 == col => span.1 += 1,
                    _ => highlighted.push((col, col + 1)),
                }
            }
        }

        LineSnapshot {
            text: row.text(),
            runs,
            highlighted,
        }
    }
}

impl Snapshot {
    /// Create a snapshot from the current screen state
    pub fn from_screen(screen: &Screen) -> Self {
        let grid = screen.grid();
        let cursor = screen.cursor();
        let styles = (0..screen.styles().len())
            .map(|id| StyleSnapshot::from(&screen.styles().get(StyleId(id as u32))))
            .collect();

        Snapshot {
            cols: grid.columns(),
            rows: grid.visible_rows(),
            total_rows: grid.total_rows(),
            scrollback_limit: grid.scrollback_limit(),
            viewport_offset: grid.viewport_offset(),
            lines: grid.rows().map(LineSnapshot::from).collect(),
            styles,
            cursor: CursorSnapshot {
                col: cursor.col,
                row: screen.cursor_y(),
                shape: cursor.shape.name().to_string(),
                visible: cursor.shape != CursorShape::Invisible,
            },
        }
    }

    /// Convert snapshot to JSON string
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Parse snapshot from JSON string
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    /// Visible rows only
    pub fn visible_lines(&self) -> &[LineSnapshot] {
        let start = self.viewport_offset.min(self.lines.len());
        &self.lines[start..]
    }

    /// Plain text of the visible rows, trailing empty rows removed
    pub fn to_text(&self) -> String {
        let mut result = String::new();
        for line in self.visible_lines() {
            result.push_str(&line.text);
            result.push('\n');
        }
        while result.ends_with("\n\n") {
            result.pop();
        }
        result
    }

    /// Compare grid content and dimensions, ignoring the cursor
    pub fn content_equals(&self, other: &Snapshot) -> bool {
        self.cols == other.cols
            && self.rows == other.rows
            && self.lines == other.lines
            && self.styles == other.styles
    }
}
