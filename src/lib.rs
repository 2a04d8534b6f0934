//! Softconsole
//!
//! An embeddable, emulated character terminal: a fixed-pitch grid with
//! scrollback, a blinking cursor, and a line-oriented keyboard front end
//! (`read_char`, `read_line`, `read_password`) over an asynchronous key
//! stream. The host window only forwards keys and paints cells.
//!
//! - `core`: cells, styles, grid with scrollback, cursor, screen, snapshots
//! - `input`: key normalization, key traps, the key queue
//! - `editor`: the line-editing state machine
//! - `render`: dirty-region debounce, viewport tracking, host callbacks
//! - `terminal`: the session object tying everything together
//! - `stream`: `io::Write`/`fmt::Write`/`io::Read` adapters over a terminal
//! - `app`: configuration

pub mod app;
pub mod core;
pub mod editor;
pub mod error;
pub mod input;
pub mod render;
pub mod stream;
pub mod terminal;

pub use app::Config;
pub use error::{Error, Result};
pub use input::{KeyEvent, Propagation, RawKey, SpecialKey};
pub use render::{CellRect, RenderHost};
pub use stream::InputStream;
pub use terminal::Terminal;
