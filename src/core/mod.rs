//! Terminal Core Module
//!
//! Platform-independent terminal state. This module contains:
//! - Cell representation and the interned style table
//! - The grid with its bounded scrollback
//! - Cursor state and logical/physical row translation
//! - The screen, which owns all of the above plus render bookkeeping
//! - Deterministic snapshot generation
//!
//! Nothing here blocks or spawns threads; the terminal session wraps a
//! `Screen` in a mutex and drives it from the producer and reader threads.

mod cell;
mod cursor;
mod grid;
mod screen;
mod snapshot;

pub use cell::{Cell, Color, Style, StyleId, StyleTable};
pub use cursor::{Cursor, CursorShape};
pub use grid::{Grid, InsertOutcome, ResizeOutcome, Row};
pub use screen::{Screen, DEFAULT_COLUMNS, DEFAULT_ROWS, DEFAULT_SCROLLBACK, DEFAULT_TAB_WIDTH};
pub use snapshot::{ColorSnapshot, CursorSnapshot, LineSnapshot, Snapshot, StyleRun, StyleSnapshot};
