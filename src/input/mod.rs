//! Keyboard Input Module
//!
//! Turns raw key notifications from the host window into typed
//! [`KeyEvent`]s and routes them: first through the priority and normal
//! key-trap tables, then into the FIFO queue the line editor reads from.
//!
//! # Normalization
//!
//! Hosts report keys in slightly different ways, so events are normalized
//! before trap lookup:
//! - A recognised virtual key code becomes a [`SpecialKey`] event
//! - With Ctrl held, control codes 1..=26 become their letter (`'c'` for
//!   Ctrl+C) and uppercase letters are lowercased
//! - `'\r'` becomes `'\n'`; a bare DEL becomes backspace

mod keyboard;
mod queue;
mod traps;

use std::hash::{Hash, Hasher};

use serde::{Deserialize, Serialize};

pub use keyboard::{Disposition, KeyboardAdapter};
pub use queue::{KeyQueue, ShutdownSignal};
pub use traps::{KeyTrapHandler, Propagation, TrapTable};

/// Enter, as delivered after normalization
pub const ENTER: char = '\n';
/// Escape
pub const ESCAPE: char = '\u{1b}';
/// Backspace, as delivered after normalization
pub const BACKSPACE: char = '\u{8}';
/// Delete character some hosts send for backspace
const DEL: char = '\u{7f}';

/// Virtual key codes accepted in [`RawKey::key_code`]
pub mod keycode {
    pub const PAGE_UP: u32 = 33;
    pub const PAGE_DOWN: u32 = 34;
    pub const END: u32 = 35;
    pub const HOME: u32 = 36;
    pub const LEFT: u32 = 37;
    pub const UP: u32 = 38;
    pub const RIGHT: u32 = 39;
    pub const DOWN: u32 = 40;
    pub const INSERT: u32 = 45;
    pub const DELETE: u32 = 46;
    pub const F1: u32 = 112;
    pub const F2: u32 = 113;
    pub const F12: u32 = 123;
}

/// Non-character keys
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SpecialKey {
    // Cursor keys
    Up,
    Down,
    Left,
    Right,

    // Navigation
    Home,
    End,
    PageUp,
    PageDown,
    Insert,
    Delete,

    // Function keys
    F1,
    F2,
    F3,
    F4,
    F5,
    F6,
    F7,
    F8,
    F9,
    F10,
    F11,
    F12,
}

impl SpecialKey {
    const FUNCTION_KEYS: [SpecialKey; 12] = [
        SpecialKey::F1,
        SpecialKey::F2,
        SpecialKey::F3,
        SpecialKey::F4,
        SpecialKey::F5,
        SpecialKey::F6,
        SpecialKey::F7,
        SpecialKey::F8,
        SpecialKey::F9,
        SpecialKey::F10,
        SpecialKey::F11,
        SpecialKey::F12,
    ];

    /// Map a virtual key code to a special key
    pub fn from_key_code(code: u32) -> Option<SpecialKey> {
        let key = match code {
            keycode::PAGE_UP => SpecialKey::PageUp,
            keycode::PAGE_DOWN => SpecialKey::PageDown,
            keycode::END => SpecialKey::End,
            keycode::HOME => SpecialKey::Home,
            keycode::LEFT => SpecialKey::Left,
            keycode::UP => SpecialKey::Up,
            keycode::RIGHT => SpecialKey::Right,
            keycode::DOWN => SpecialKey::Down,
            keycode::INSERT => SpecialKey::Insert,
            keycode::DELETE => SpecialKey::Delete,
            keycode::F1..=keycode::F12 => Self::FUNCTION_KEYS[(code - keycode::F1) as usize],
            _ => return None,
        };
        Some(key)
    }
}

/// Key notification as reported by the host window
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RawKey {
    pub ch: char,
    pub alt: bool,
    pub ctrl: bool,
    /// Virtual key code, when the host reports one
    pub key_code: Option<u32>,
}

impl RawKey {
    pub fn char(ch: char) -> Self {
        Self {
            ch,
            ..Self::default()
        }
    }

    pub fn ctrl(ch: char) -> Self {
        Self {
            ch,
            ctrl: true,
            ..Self::default()
        }
    }

    pub fn code(key_code: u32) -> Self {
        Self {
            key_code: Some(key_code),
            ..Self::default()
        }
    }
}

/// A normalized keystroke.
///
/// Events with a special key compare by that key alone; events without one
/// compare by character and modifiers. The two kinds never compare equal.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct KeyEvent {
    pub ch: char,
    pub alt: bool,
    pub ctrl: bool,
    pub special: Option<SpecialKey>,
}

impl KeyEvent {
    /// Plain character without modifiers
    pub fn char(ch: char) -> Self {
        Self {
            ch,
            alt: false,
            ctrl: false,
            special: None,
        }
    }

    /// Ctrl chord; `ch` is the letter (`'c'` for Ctrl+C)
    pub fn ctrl(ch: char) -> Self {
        Self {
            ctrl: true,
            ..Self::char(ch.to_ascii_lowercase())
        }
    }

    /// Alt chord
    pub fn alt(ch: char) -> Self {
        Self {
            alt: true,
            ..Self::char(ch)
        }
    }

    pub fn special(key: SpecialKey) -> Self {
        Self {
            special: Some(key),
            ..Self::char('\0')
        }
    }

    /// Normalize a host notification
    pub fn from_raw(raw: RawKey) -> Self {
        if let Some(key) = raw.key_code.and_then(SpecialKey::from_key_code) {
            return Self {
                ch: '\0',
                alt: raw.alt,
                ctrl: raw.ctrl,
                special: Some(key),
            };
        }

        let code = raw.ch as u32;
        let ch = if raw.ctrl {
            if (1..=26).contains(&code) {
                char::from(b'a' - 1 + code as u8)
            } else {
                raw.ch.to_ascii_lowercase()
            }
        } else {
            match raw.ch {
                '\r' => ENTER,
                DEL => BACKSPACE,
                c => c,
            }
        };

        Self {
            ch,
            alt: raw.alt,
            ctrl: raw.ctrl,
            special: None,
        }
    }

    pub fn is_special(&self) -> bool {
        self.special.is_some()
    }

    /// No special key and no character; such an event cannot be trapped
    pub fn is_empty(&self) -> bool {
        self.special.is_none() && self.ch == '\0'
    }

    pub fn has_modifiers(&self) -> bool {
        self.ctrl || self.alt
    }

    /// Plain character with no modifiers
    pub fn is_plain(&self, ch: char) -> bool {
        self.special.is_none() && !self.has_modifiers() && self.ch == ch
    }
}

impl PartialEq for KeyEvent {
    fn eq(&self, other: &Self) -> bool {
        match (self.special, other.special) {
            (Some(a), Some(b)) => a == b,
            (None, None) => self.ch == other.ch && self.ctrl == other.ctrl && self.alt == other.alt,
            _ => false,
        }
    }
}

impl Eq for KeyEvent {}

impl Hash for KeyEvent {
    fn hash<H: Hasher>(&self, state: &mut H) {
        match self.special {
            Some(key) => {
                0u8.hash(state);
                key.hash(state);
            }
            None => {
                1u8.hash(state);
                self.ch.hash(state);
                self.ctrl.hash(state);
                self.alt.hash(state);
            }
        }
    }
}

impl From<SpecialKey> for KeyEvent {
    fn from(key: SpecialKey) -> Self {
        KeyEvent::special(key)
    }
}

impl From<char> for KeyEvent {
    fn from(ch: char) -> Self {
        KeyEvent::char(ch)
    }
}
