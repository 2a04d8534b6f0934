//! Terminal Cell
//!
//! Represents a single cell in the terminal grid: a character, a handle to
//! its style, and a highlight mark. Styles themselves live in a
//! [`StyleTable`] owned by the screen, so cells stay small `Copy` values and
//! cloning a row never aliases mutable style state.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// A single cell in the terminal grid
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cell {
    /// The character displayed in this cell
    pub ch: char,
    /// Interned style of this cell
    pub style: StyleId,
    /// Whether the cell is marked by a selection highlight
    pub highlighted: bool,
}

impl Default for Cell {
    fn default() -> Self {
        Self::blank(StyleId::DEFAULT)
    }
}

impl Cell {
    /// Create a new cell with a character in the given style
    pub fn new(ch: char, style: StyleId) -> Self {
        Self {
            ch,
            style,
            highlighted: false,
        }
    }

    /// A space in the given style
    pub fn blank(style: StyleId) -> Self {
        Self::new(' ', style)
    }

    /// Check if this cell shows nothing but whitespace
    pub fn is_blank(&self) -> bool {
        self.ch == ' '
    }

    /// Reset the cell to a space in the given style
    pub fn clear(&mut self, style: StyleId) {
        *self = Self::blank(style);
    }
}

/// Color representation supporting indexed and RGB colors
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Color {
    /// Host default color (foreground or background)
    #[default]
    Default,
    /// Palette index, resolved by the host
    Indexed(u8),
    /// 24-bit RGB color
    Rgb(u8, u8, u8),
}

impl Color {
    pub const BLACK: Color = Color::Rgb(0, 0, 0);
    pub const SILVER: Color = Color::Rgb(192, 192, 192);
    pub const WHITE: Color = Color::Rgb(255, 255, 255);
}

/// Foreground/background pair attached to cells
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Style {
    pub foreground: Color,
    pub background: Color,
}

impl Default for Style {
    fn default() -> Self {
        Self {
            foreground: Color::SILVER,
            background: Color::BLACK,
        }
    }
}

impl Style {
    pub fn new(foreground: Color, background: Color) -> Self {
        Self {
            foreground,
            background,
        }
    }
}

/// Handle to an interned [`Style`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct StyleId(pub u32);

impl StyleId {
    /// The style every table is created with
    pub const DEFAULT: StyleId = StyleId(0);
}

/// Interning table mapping styles to small handles.
///
/// Entries are never removed, so a `StyleId` stays valid for the lifetime
/// of the table.
#[derive(Debug, Clone)]
pub struct StyleTable {
    styles: Vec<Style>,
    index: HashMap<Style, StyleId>,
}

impl StyleTable {
    /// Create a table whose `StyleId::DEFAULT` entry is `default`
    pub fn new(default: Style) -> Self {
        let mut index = HashMap::new();
        index.insert(default, StyleId::DEFAULT);
        Self {
            styles: vec![default],
            index,
        }
    }

    /// Return the handle for `style`, adding it if unseen
    pub fn intern(&mut self, style: Style) -> StyleId {
        if let Some(&id) = self.index.get(&style) {
            return id;
        }
        let id = StyleId(self.styles.len() as u32);
        self.styles.push(style);
        self.index.insert(style, id);
        id
    }

    /// Resolve a handle; unknown handles resolve to the default style
    pub fn get(&self, id: StyleId) -> Style {
        self.styles
            .get(id.0 as usize)
            .copied()
            .unwrap_or(self.styles[0])
    }

    /// The style behind `StyleId::DEFAULT`
    pub fn default_style(&self) -> Style {
        self.styles[0]
    }

    pub fn len(&self) -> usize {
        self.styles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.styles.is_empty()
    }
}

impl Default for StyleTable {
    fn default() -> Self {
        Self::new(Style::default())
    }
}
