//! Line editor
//!
//! Builds characters, lines and passwords out of the key queue. The editor
//! talks to the terminal through [`EditSurface`]: it never touches the grid
//! directly, so the same state machine drives a real terminal or a fake in
//! tests.
//!
//! Editing keys while a line is being read:
//! - Enter finishes the line (a newline is always echoed)
//! - Escape erases everything typed so far
//! - Backspace / Delete remove the character before / at the edit position
//! - Left / Right / Home / End move the edit position
//! - PageUp / PageDown page the viewport

use serde::{Deserialize, Serialize};

use crate::core::CursorShape;
use crate::input::{KeyEvent, SpecialKey, BACKSPACE, ENTER, ESCAPE};

/// What the terminal is currently reading
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum EditorState {
    #[default]
    Idle,
    ReadingChar,
    ReadingLine,
}

impl EditorState {
    pub fn as_u8(self) -> u8 {
        match self {
            EditorState::Idle => 0,
            EditorState::ReadingChar => 1,
            EditorState::ReadingLine => 2,
        }
    }

    pub fn from_u8(value: u8) -> Self {
        match value {
            1 => EditorState::ReadingChar,
            2 => EditorState::ReadingLine,
            _ => EditorState::Idle,
        }
    }
}

/// How typed characters appear on screen
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Echo {
    /// Nothing is drawn
    Off,
    /// The character itself
    Plain,
    /// A fixed glyph per character
    Masked(char),
}

impl Echo {
    /// `'\0'` means no masking
    pub fn mask(mask: char) -> Self {
        if mask == '\0' {
            Echo::Plain
        } else {
            Echo::Masked(mask)
        }
    }

    pub fn is_on(self) -> bool {
        self != Echo::Off
    }

    fn glyph(self, ch: char) -> Option<char> {
        match self {
            Echo::Off => None,
            Echo::Plain => Some(ch),
            Echo::Masked(mask) => Some(mask),
        }
    }
}

/// Operations the editor needs from a terminal
pub trait EditSurface {
    /// Block for the next key; `None` once the terminal is closing
    fn next_key(&self) -> Option<KeyEvent>;
    /// Write a glyph at the cursor and advance
    fn put_char(&self, ch: char);
    /// Move to the start of the next row
    fn newline(&self);
    /// Move the cursor by `delta` cells, wrapping across rows
    fn move_cursor(&self, delta: isize);
    /// Blank the cell left of the cursor and leave the cursor on it, as
    /// one step
    fn erase_previous(&self);
    fn page_up(&self);
    fn page_down(&self);
    fn set_cursor_shape(&self, shape: CursorShape);
    /// Scroll so the cursor row is visible
    fn reveal_cursor(&self);
}

/// Whether a read is finished after a key
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    Continue,
    Done,
}

/// Editable line buffer with an edit position
#[derive(Debug, Clone)]
pub struct LineEditor {
    buffer: Vec<char>,
    edit_pos: usize,
    echo: Echo,
}

impl LineEditor {
    pub fn new(echo: Echo) -> Self {
        Self {
            buffer: Vec::new(),
            edit_pos: 0,
            echo,
        }
    }

    pub fn buffer(&self) -> &[char] {
        &self.buffer
    }

    pub fn edit_position(&self) -> usize {
        self.edit_pos
    }

    /// Read keys until Enter or shutdown and return what was typed
    pub fn run<S: EditSurface + ?Sized>(mut self, surface: &S) -> Vec<char> {
        loop {
            surface.set_cursor_shape(CursorShape::Insert);
            let Some(key) = surface.next_key() else {
                break;
            };
            surface.set_cursor_shape(CursorShape::Invisible);
            let step = self.handle(&key, surface);
            surface.reveal_cursor();
            if step == Step::Done {
                break;
            }
        }
        surface.set_cursor_shape(CursorShape::Insert);
        self.buffer
    }

    /// Apply one key
    pub fn handle<S: EditSurface + ?Sized>(&mut self, key: &KeyEvent, surface: &S) -> Step {
        if let Some(special) = key.special {
            match special {
                SpecialKey::Left => self.move_left(surface),
                SpecialKey::Right => self.move_right(surface),
                SpecialKey::Home => self.move_to(0, surface),
                SpecialKey::End => self.move_to(self.buffer.len(), surface),
                SpecialKey::Delete => self.delete(surface),
                SpecialKey::PageUp => surface.page_up(),
                SpecialKey::PageDown => surface.page_down(),
                _ => {}
            }
            return Step::Continue;
        }
        if key.has_modifiers() {
            return Step::Continue;
        }

        match key.ch {
            ENTER => {
                surface.newline();
                return Step::Done;
            }
            ESCAPE => self.erase_all(surface),
            BACKSPACE => self.backspace(surface),
            ch if ch.is_control() => {}
            ch => self.insert(ch, surface),
        }
        Step::Continue
    }

    fn insert<S: EditSurface + ?Sized>(&mut self, ch: char, surface: &S) {
        self.buffer.insert(self.edit_pos, ch);
        self.edit_pos += 1;
        if let Some(glyph) = self.echo.glyph(ch) {
            surface.put_char(glyph);
            self.redraw_tail(0, surface);
        }
    }

    fn backspace<S: EditSurface + ?Sized>(&mut self, surface: &S) {
        if self.edit_pos == 0 {
            return;
        }
        self.edit_pos -= 1;
        self.buffer.remove(self.edit_pos);
        if self.echo.is_on() {
            surface.move_cursor(-1);
            self.redraw_tail(1, surface);
        }
    }

    fn delete<S: EditSurface + ?Sized>(&mut self, surface: &S) {
        if self.edit_pos == self.buffer.len() {
            return;
        }
        self.buffer.remove(self.edit_pos);
        if self.echo.is_on() {
            self.redraw_tail(1, surface);
        }
    }

    /// Rewrite everything after the edit position plus `blanks` spaces, then
    /// return the cursor to the edit position
    fn redraw_tail<S: EditSurface + ?Sized>(&self, blanks: usize, surface: &S) {
        let tail = &self.buffer[self.edit_pos..];
        for &ch in tail {
            if let Some(glyph) = self.echo.glyph(ch) {
                surface.put_char(glyph);
            }
        }
        for _ in 0..blanks {
            surface.put_char(' ');
        }
        let drawn = tail.len() + blanks;
        if drawn > 0 {
            surface.move_cursor(-(drawn as isize));
        }
    }

    fn erase_all<S: EditSurface + ?Sized>(&mut self, surface: &S) {
        if self.echo.is_on() {
            let to_end = self.buffer.len() - self.edit_pos;
            if to_end > 0 {
                surface.move_cursor(to_end as isize);
            }
            for _ in 0..self.buffer.len() {
                surface.erase_previous();
            }
        }
        self.buffer.clear();
        self.edit_pos = 0;
    }

    fn move_left<S: EditSurface + ?Sized>(&mut self, surface: &S) {
        if self.edit_pos > 0 {
            self.move_to(self.edit_pos - 1, surface);
        }
    }

    fn move_right<S: EditSurface + ?Sized>(&mut self, surface: &S) {
        if self.edit_pos < self.buffer.len() {
            self.move_to(self.edit_pos + 1, surface);
        }
    }

    fn move_to<S: EditSurface + ?Sized>(&mut self, pos: usize, surface: &S) {
        let delta = pos as isize - self.edit_pos as isize;
        self.edit_pos = pos;
        if delta != 0 && self.echo.is_on() {
            surface.move_cursor(delta);
        }
    }
}

/// Read a single key and echo it. Returns `'\0'` on shutdown.
pub fn read_char<S: EditSurface + ?Sized>(surface: &S) -> char {
    surface.set_cursor_shape(CursorShape::Insert);
    let Some(key) = surface.next_key() else {
        return '\0';
    };
    surface.set_cursor_shape(CursorShape::Invisible);
    if key.is_plain(ENTER) {
        surface.newline();
    } else if !key.is_special() && !key.ch.is_control() {
        surface.put_char(key.ch);
    }
    surface.reveal_cursor();
    surface.set_cursor_shape(CursorShape::Insert);
    key.ch
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::{Cell, RefCell};
    use std::collections::VecDeque;

    /// Single unbounded row with a cursor
    #[derive(Default)]
    struct FakeSurface {
        keys: RefCell<VecDeque<KeyEvent>>,
        line: RefCell<Vec<char>>,
        cursor: Cell<isize>,
        newlines: Cell<usize>,
        pages: RefCell<Vec<&'static str>>,
        erased: Cell<usize>,
        shapes: RefCell<Vec<CursorShape>>,
    }

    impl FakeSurface {
        fn with_keys(keys: impl IntoIterator<Item = KeyEvent>) -> Self {
            let surface = Self::default();
            surface.keys.borrow_mut().extend(keys);
            surface
        }

        fn typed(text: &str) -> Vec<KeyEvent> {
            text.chars().map(KeyEvent::char).collect()
        }

        fn text(&self) -> String {
            let line: String = self.line.borrow().iter().collect();
            line.trim_end().to_string()
        }
    }

    impl EditSurface for FakeSurface {
        fn next_key(&self) -> Option<KeyEvent> {
            self.keys.borrow_mut().pop_front()
        }

        fn put_char(&self, ch: char) {
            let pos = self.cursor.get() as usize;
            let mut line = self.line.borrow_mut();
            if line.len() <= pos {
                line.resize(pos + 1, ' ');
            }
            line[pos] = ch;
            self.cursor.set(self.cursor.get() + 1);
        }

        fn newline(&self) {
            self.newlines.set(self.newlines.get() + 1);
        }

        fn move_cursor(&self, delta: isize) {
            self.cursor.set((self.cursor.get() + delta).max(0));
        }

        fn erase_previous(&self) {
            if self.cursor.get() > 0 {
                self.move_cursor(-1);
                self.put_char(' ');
                self.move_cursor(-1);
                self.erased.set(self.erased.get() + 1);
            }
        }

        fn page_up(&self) {
            self.pages.borrow_mut().push("up");
        }

        fn page_down(&self) {
            self.pages.borrow_mut().push("down");
        }

        fn set_cursor_shape(&self, shape: CursorShape) {
            self.shapes.borrow_mut().push(shape);
        }

        fn reveal_cursor(&self) {}
    }

    #[test]
    fn test_read_line_plain() {
        let surface = FakeSurface::with_keys(FakeSurface::typed("hi\n"));
        let line = LineEditor::new(Echo::Plain).run(&surface);
        assert_eq!(line, vec!['h', 'i']);
        assert_eq!(surface.text(), "hi");
        assert_eq!(surface.newlines.get(), 1);
    }

    #[test]
    fn test_backspace_erases_last() {
        let mut keys = FakeSurface::typed("abc");
        keys.push(KeyEvent::char(BACKSPACE));
        keys.push(KeyEvent::char(ENTER));
        let surface = FakeSurface::with_keys(keys);

        let line = LineEditor::new(Echo::Plain).run(&surface);
        assert_eq!(line, vec!['a', 'b']);
        assert_eq!(surface.text(), "ab");
        assert_eq!(surface.cursor.get(), 2);
    }

    #[test]
    fn test_backspace_on_empty_buffer_ignored() {
        let surface = FakeSurface::with_keys([KeyEvent::char(BACKSPACE), KeyEvent::char(ENTER)]);
        surface.cursor.set(5);
        let line = LineEditor::new(Echo::Plain).run(&surface);
        assert!(line.is_empty());
        assert_eq!(surface.cursor.get(), 5);
    }

    #[test]
    fn test_escape_restores_prompt() {
        let surface = FakeSurface::default();
        surface.put_char('>');
        let mut keys = FakeSurface::typed("secret");
        keys.push(KeyEvent::special(SpecialKey::Left));
        keys.push(KeyEvent::special(SpecialKey::Left));
        keys.push(KeyEvent::char(ESCAPE));
        keys.push(KeyEvent::char(ENTER));
        surface.keys.borrow_mut().extend(keys);

        let line = LineEditor::new(Echo::Plain).run(&surface);
        assert!(line.is_empty());
        assert_eq!(surface.text(), ">");
        assert_eq!(surface.cursor.get(), 1);
        assert_eq!(surface.erased.get(), 6);
    }

    #[test]
    fn test_escape_without_echo_leaves_screen() {
        let mut keys = FakeSurface::typed("pw");
        keys.push(KeyEvent::char(ESCAPE));
        keys.push(KeyEvent::char(ENTER));
        let surface = FakeSurface::with_keys(keys);

        let line = LineEditor::new(Echo::Off).run(&surface);
        assert!(line.is_empty());
        assert_eq!(surface.erased.get(), 0);
    }

    #[test]
    fn test_insert_in_middle_redraws_tail() {
        let mut keys = FakeSurface::typed("ac");
        keys.push(KeyEvent::special(SpecialKey::Left));
        keys.push(KeyEvent::char('b'));
        keys.push(KeyEvent::char(ENTER));
        let surface = FakeSurface::with_keys(keys);

        let line = LineEditor::new(Echo::Plain).run(&surface);
        assert_eq!(line, vec!['a', 'b', 'c']);
        assert_eq!(surface.text(), "abc");
    }

    #[test]
    fn test_backspace_in_middle_shifts_tail() {
        let mut keys = FakeSurface::typed("abcd");
        keys.push(KeyEvent::special(SpecialKey::Left));
        keys.push(KeyEvent::special(SpecialKey::Left));
        keys.push(KeyEvent::char(BACKSPACE));
        keys.push(KeyEvent::char(ENTER));
        let surface = FakeSurface::with_keys(keys);

        let line = LineEditor::new(Echo::Plain).run(&surface);
        assert_eq!(line, vec!['a', 'c', 'd']);
        assert_eq!(surface.text(), "acd");
        assert_eq!(surface.cursor.get(), 1);
    }

    #[test]
    fn test_home_end_delete() {
        let mut keys = FakeSurface::typed("xyz");
        keys.push(KeyEvent::special(SpecialKey::Home));
        keys.push(KeyEvent::special(SpecialKey::Delete));
        keys.push(KeyEvent::special(SpecialKey::End));
        keys.push(KeyEvent::char('!'));
        keys.push(KeyEvent::char(ENTER));
        let surface = FakeSurface::with_keys(keys);

        let line = LineEditor::new(Echo::Plain).run(&surface);
        assert_eq!(line, vec!['y', 'z', '!']);
        assert_eq!(surface.text(), "yz!");
    }

    #[test]
    fn test_cursor_keys_clamped_to_buffer() {
        let mut keys = vec![KeyEvent::special(SpecialKey::Left)];
        keys.extend(FakeSurface::typed("a"));
        keys.push(KeyEvent::special(SpecialKey::Right));
        keys.push(KeyEvent::char(ENTER));
        let surface = FakeSurface::with_keys(keys);
        surface.cursor.set(3);

        LineEditor::new(Echo::Plain).run(&surface);
        assert_eq!(surface.cursor.get(), 4);
    }

    #[test]
    fn test_password_no_echo() {
        let surface = FakeSurface::with_keys(FakeSurface::typed("pw\n"));
        let line = LineEditor::new(Echo::Off).run(&surface);
        assert_eq!(line, vec!['p', 'w']);
        assert_eq!(surface.text(), "");
        assert_eq!(surface.newlines.get(), 1);
    }

    #[test]
    fn test_password_masked() {
        let surface = FakeSurface::with_keys(FakeSurface::typed("pw\n"));
        let line = LineEditor::new(Echo::mask('*')).run(&surface);
        assert_eq!(line, vec!['p', 'w']);
        assert_eq!(surface.text(), "**");
        assert_eq!(Echo::mask('\0'), Echo::Plain);
    }

    #[test]
    fn test_modified_and_control_keys_ignored() {
        let keys = vec![
            KeyEvent::ctrl('a'),
            KeyEvent::alt('b'),
            KeyEvent::char('\u{7}'),
            KeyEvent::special(SpecialKey::F3),
            KeyEvent::char('c'),
            KeyEvent::char(ENTER),
        ];
        let surface = FakeSurface::with_keys(keys);
        assert_eq!(LineEditor::new(Echo::Plain).run(&surface), vec!['c']);
    }

    #[test]
    fn test_paging_forwarded() {
        let keys = vec![
            KeyEvent::special(SpecialKey::PageUp),
            KeyEvent::special(SpecialKey::PageDown),
            KeyEvent::char(ENTER),
        ];
        let surface = FakeSurface::with_keys(keys);
        LineEditor::new(Echo::Plain).run(&surface);
        assert_eq!(*surface.pages.borrow(), vec!["up", "down"]);
    }

    #[test]
    fn test_shutdown_returns_partial_buffer() {
        let surface = FakeSurface::with_keys(FakeSurface::typed("par"));
        let line = LineEditor::new(Echo::Plain).run(&surface);
        assert_eq!(line, vec!['p', 'a', 'r']);
        assert_eq!(surface.newlines.get(), 0);
    }

    #[test]
    fn test_cursor_shape_cycle() {
        let surface = FakeSurface::with_keys(FakeSurface::typed("\n"));
        LineEditor::new(Echo::Plain).run(&surface);
        assert_eq!(
            *surface.shapes.borrow(),
            vec![CursorShape::Insert, CursorShape::Invisible, CursorShape::Insert]
        );
    }

    #[test]
    fn test_read_char() {
        let surface = FakeSurface::with_keys([KeyEvent::char('q'), KeyEvent::char(ENTER)]);
        assert_eq!(read_char(&surface), 'q');
        assert_eq!(surface.text(), "q");
        assert_eq!(read_char(&surface), '\n');
        assert_eq!(surface.newlines.get(), 1);
        assert_eq!(read_char(&surface), '\0');
    }

    #[test]
    fn test_state_roundtrip() {
        for state in [EditorState::Idle, EditorState::ReadingChar, EditorState::ReadingLine] {
            assert_eq!(EditorState::from_u8(state.as_u8()), state);
        }
    }
}
