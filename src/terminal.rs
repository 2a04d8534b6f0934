//! Terminal session
//!
//! Ties together the screen, the keyboard adapter, the line editor and the
//! render worker. A `Terminal` is shared between threads by reference (or
//! `Arc`): the host's event thread calls [`Terminal::key_pressed`], the
//! application thread writes output and blocks in the read methods, and
//! the optional worker thread delivers render frames to a [`RenderHost`].
//!
//! All screen state sits behind one mutex. Host callbacks and trap handlers
//! are always invoked with that mutex released.

use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

use tracing::{debug, warn};

use crate::app::Config;
use crate::core::{Color, CursorShape, InsertOutcome, Screen, Snapshot, Style};
use crate::editor::{self, EditSurface, EditorState, Echo, LineEditor};
use crate::error::{Error, Result};
use crate::input::{Disposition, KeyEvent, KeyTrapHandler, KeyboardAdapter, RawKey, ShutdownSignal};
use crate::render::{spawn_worker, CellRect, RenderFrame, RenderHost, RenderScheduler, WORKER_TICK_MS};
use crate::stream::{InputStream, Utf8Carry};

type ShutdownHook = Box<dyn FnOnce() + Send>;

/// An emulated character terminal
pub struct Terminal {
    screen: Arc<Mutex<Screen>>,
    keyboard: KeyboardAdapter,
    shutdown: ShutdownSignal,
    hooks: Mutex<Vec<ShutdownHook>>,
    /// Held for the duration of a read so reads never interleave
    reader: Mutex<()>,
    state: AtomicU8,
    host: Option<Arc<dyn RenderHost>>,
    worker: Mutex<Option<JoinHandle<()>>>,
    /// Undecoded tail of the last byte write
    output_utf8: Mutex<Utf8Carry>,
}

impl Terminal {
    /// Create a terminal without a render host. Render frames are
    /// collected with [`Terminal::pump`] or [`Terminal::flush_render`].
    pub fn new(config: &Config) -> Result<Self> {
        Self::build(config, None)
    }

    /// Create a terminal whose frames are delivered to `host` by a
    /// background worker
    pub fn with_host(config: &Config, host: Arc<dyn RenderHost>) -> Result<Self> {
        Self::build(config, Some(host))
    }

    fn build(config: &Config, host: Option<Arc<dyn RenderHost>>) -> Result<Self> {
        config.validate()?;
        let screen = Screen::with_options(
            config.columns,
            config.rows,
            config.scrollback,
            config.colors.style(),
            config.tab_width,
            RenderScheduler::new(config.repaint_delay(), config.cursor_blink()),
        )?;

        let terminal = Self {
            screen: Arc::new(Mutex::new(screen)),
            keyboard: KeyboardAdapter::new(),
            shutdown: ShutdownSignal::new(),
            hooks: Mutex::new(Vec::new()),
            reader: Mutex::new(()),
            state: AtomicU8::new(EditorState::Idle.as_u8()),
            host,
            worker: Mutex::new(None),
            output_utf8: Mutex::new(Utf8Carry::default()),
        };

        if let Some(host) = &terminal.host {
            let interval = config
                .repaint_delay()
                .min(Duration::from_millis(WORKER_TICK_MS))
                .max(Duration::from_millis(1));
            let handle = spawn_worker(
                Arc::clone(&terminal.screen),
                Arc::clone(host),
                terminal.shutdown.receiver().clone(),
                interval,
            )?;
            *terminal.worker.lock().unwrap_or_else(PoisonError::into_inner) = Some(handle);
        }

        debug!(
            columns = config.columns,
            rows = config.rows,
            scrollback = config.scrollback,
            "terminal created"
        );
        Ok(terminal)
    }

    fn screen(&self) -> MutexGuard<'_, Screen> {
        self.screen.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn scroll_host(&self, viewport: CellRect) {
        if let Some(host) = &self.host {
            host.scroll_to(viewport);
        }
    }

    // Output

    pub fn write_char(&self, c: char) {
        self.screen().write_char(c);
    }

    /// Write `chars[offset..offset + length]`, clamped to the slice
    pub fn write_slice(&self, chars: &[char], offset: usize, length: usize) {
        self.screen().write_slice(chars, offset, length);
    }

    pub fn write_str(&self, s: &str) {
        self.screen().write_str(s);
    }

    /// Write `s` followed by a newline
    pub fn println(&self, s: &str) {
        let mut screen = self.screen();
        screen.write_str(s);
        screen.newline();
    }

    /// Place a glyph at a logical position without moving the cursor
    pub fn write_at(&self, x: usize, y: isize, c: char) {
        self.screen().write_at(x, y, c);
    }

    pub fn clear_screen(&self) {
        self.screen().clear();
    }

    pub fn set_text_color(&self, foreground: Color, background: Color) {
        self.screen().set_text_color(foreground, background);
    }

    pub fn text_color(&self) -> Style {
        self.screen().text_color()
    }

    /// Decode bytes written through `io::Write`, carrying a split UTF-8
    /// sequence over to the next write
    pub(crate) fn decode_output(&self, bytes: &[u8]) -> String {
        self.output_utf8
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .feed(bytes)
    }

    // Geometry and cursor

    pub fn columns(&self) -> usize {
        self.screen().columns()
    }

    /// Visible rows
    pub fn rows(&self) -> usize {
        self.screen().rows()
    }

    /// Rows remembered, visible rows included
    pub fn total_rows(&self) -> usize {
        self.screen().total_rows()
    }

    pub fn cursor_x(&self) -> usize {
        self.screen().cursor_x()
    }

    /// Logical cursor row; negative while the cursor sits in scrollback
    pub fn cursor_y(&self) -> isize {
        self.screen().cursor_y()
    }

    pub fn set_cursor_position(&self, x: usize, y: isize) {
        self.screen().set_cursor_position(x, y);
    }

    pub fn cursor_shape(&self) -> CursorShape {
        self.screen().cursor_shape()
    }

    pub fn set_cursor_shape(&self, shape: CursorShape) {
        self.screen().set_cursor_shape(shape);
    }

    /// Grow the grid. Shrinking either dimension is ignored.
    pub fn resize(&self, columns: usize, rows: usize) -> Result<()> {
        self.screen().resize(columns, rows).map(|_| ())
    }

    /// Insert a blank row at a physical row index
    pub fn insert_row(&self, row: usize) -> InsertOutcome {
        self.screen().insert_row(row)
    }

    /// Physical row shown at the top of the viewport
    pub fn viewport_top(&self) -> usize {
        self.screen().scheduler().viewport_top()
    }

    pub fn page_up(&self) {
        let viewport = self.screen().page_up();
        self.scroll_host(viewport);
    }

    pub fn page_down(&self) {
        let viewport = self.screen().page_down();
        self.scroll_host(viewport);
    }

    // Selection

    /// Highlight the inclusive block between two logical positions
    pub fn highlight_selection(&self, x1: usize, y1: isize, x2: usize, y2: isize) {
        self.screen().highlight_selection(x1, y1, x2, y2);
    }

    pub fn clear_highlight(&self) {
        self.screen().clear_highlight();
    }

    pub fn selected_text(&self) -> String {
        self.screen().selected_text()
    }

    // Rendering

    pub fn snapshot(&self) -> Snapshot {
        self.screen().snapshot()
    }

    /// Advance blink and take the pending frame if its delay has passed.
    /// A frame is also delivered to the host, if there is one.
    pub fn pump(&self, now: Instant) -> Option<RenderFrame> {
        let frame = self.screen().tick(now);
        self.deliver(frame)
    }

    /// Take pending render work immediately
    pub fn flush_render(&self) -> Option<RenderFrame> {
        let frame = self.screen().flush();
        self.deliver(frame)
    }

    fn deliver(&self, frame: Option<RenderFrame>) -> Option<RenderFrame> {
        if let (Some(frame), Some(host)) = (&frame, &self.host) {
            frame.deliver(host.as_ref());
        }
        frame
    }

    // Keyboard

    /// Producer entry point: route a key from the host window
    pub fn key_pressed(&self, raw: RawKey) -> Disposition {
        self.keyboard.key_pressed(raw)
    }

    /// Queue text as typed keys, bypassing traps; returns keys queued
    pub fn paste(&self, text: &str) -> usize {
        self.keyboard.paste(text)
    }

    pub fn try_read_key(&self) -> Option<KeyEvent> {
        self.keyboard.try_read()
    }

    pub fn pending_keys(&self) -> usize {
        self.keyboard.pending()
    }

    pub fn add_key_trap<H: KeyTrapHandler + 'static>(&self, key: KeyEvent, handler: H) -> Result<()> {
        self.keyboard.add_trap(key, Arc::new(handler))
    }

    /// Register a trap that runs before all normal traps
    pub fn add_priority_key_trap<H: KeyTrapHandler + 'static>(&self, key: KeyEvent, handler: H) -> Result<()> {
        self.keyboard.add_priority_trap(key, Arc::new(handler))
    }

    // Reading

    pub fn editor_state(&self) -> EditorState {
        EditorState::from_u8(self.state.load(Ordering::SeqCst))
    }

    /// Block for one key and echo it. Returns `'\0'` once closed.
    pub fn read_char(&self) -> char {
        let _reader = self.reader.lock().unwrap_or_else(PoisonError::into_inner);
        self.state.store(EditorState::ReadingChar.as_u8(), Ordering::SeqCst);
        let ch = editor::read_char(self);
        self.state.store(EditorState::Idle.as_u8(), Ordering::SeqCst);
        ch
    }

    /// Read an edited line with echo. Returns what was typed so far if the
    /// terminal closes first.
    pub fn read_line(&self) -> String {
        self.read_with(Echo::Plain).into_iter().collect()
    }

    /// Read a line without echo
    pub fn read_password(&self) -> Vec<char> {
        self.read_with(Echo::Off)
    }

    /// Read a line echoing `mask` per character; `'\0'` echoes normally
    pub fn read_password_masked(&self, mask: char) -> Vec<char> {
        self.read_with(Echo::mask(mask))
    }

    fn read_with(&self, echo: Echo) -> Vec<char> {
        let _reader = self.reader.lock().unwrap_or_else(PoisonError::into_inner);
        self.state.store(EditorState::ReadingLine.as_u8(), Ordering::SeqCst);
        let line = LineEditor::new(echo).run(self);
        self.state.store(EditorState::Idle.as_u8(), Ordering::SeqCst);
        line
    }

    /// Byte source reading one line of keys per end-of-stream
    pub fn input_stream(&self) -> InputStream<'_> {
        InputStream::new(self)
    }

    // Lifecycle

    pub fn is_closing(&self) -> bool {
        self.shutdown.is_closing()
    }

    /// Run `hook` once when the terminal closes
    pub fn add_shutdown_hook<F: FnOnce() + Send + 'static>(&self, hook: F) -> Result<()> {
        let mut hooks = self.hooks.lock().unwrap_or_else(PoisonError::into_inner);
        if self.shutdown.is_closing() {
            return Err(Error::Closed);
        }
        hooks.push(Box::new(hook));
        Ok(())
    }

    /// Wake blocked readers, run shutdown hooks in registration order and
    /// stop the render worker. Later calls do nothing.
    pub fn close(&self) {
        let hooks = {
            let mut hooks = self.hooks.lock().unwrap_or_else(PoisonError::into_inner);
            if !self.shutdown.trigger() {
                return;
            }
            std::mem::take(&mut *hooks)
        };
        debug!(hooks = hooks.len(), "terminal closing");

        for hook in hooks {
            hook();
        }

        let worker = self.worker.lock().unwrap_or_else(PoisonError::into_inner).take();
        if let Some(worker) = worker {
            if worker.join().is_err() {
                warn!("render worker panicked");
            }
        }
    }
}

impl Drop for Terminal {
    fn drop(&mut self) {
        self.close();
    }
}

impl std::fmt::Debug for Terminal {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Terminal")
            .field("state", &self.editor_state())
            .field("closing", &self.is_closing())
            .field("has_host", &self.host.is_some())
            .finish()
    }
}

impl EditSurface for Terminal {
    fn next_key(&self) -> Option<KeyEvent> {
        self.keyboard.read(&self.shutdown)
    }

    fn put_char(&self, ch: char) {
        self.write_char(ch);
    }

    fn newline(&self) {
        self.screen().newline();
    }

    fn move_cursor(&self, delta: isize) {
        self.screen().move_relative(delta);
    }

    fn erase_previous(&self) {
        self.screen().erase_previous();
    }

    fn page_up(&self) {
        Terminal::page_up(self);
    }

    fn page_down(&self) {
        Terminal::page_down(self);
    }

    fn set_cursor_shape(&self, shape: CursorShape) {
        Terminal::set_cursor_shape(self, shape);
    }

    fn reveal_cursor(&self) {
        let viewport = self.screen().ensure_cursor_visible();
        if let Some(viewport) = viewport {
            self.scroll_host(viewport);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::input::{keycode, Propagation};
    use std::sync::atomic::AtomicUsize;
    use std::thread;

    fn terminal() -> Terminal {
        Terminal::new(&Config::default()).unwrap()
    }

    fn type_text(terminal: &Terminal, text: &str) {
        for ch in text.chars() {
            terminal.key_pressed(RawKey::char(ch));
        }
    }

    #[test]
    fn test_new_rejects_bad_config() {
        let config = Config {
            columns: 0,
            ..Config::default()
        };
        assert!(matches!(Terminal::new(&config), Err(Error::InvalidDimensions { .. })));
    }

    #[test]
    fn test_read_line_echoes() {
        let terminal = terminal();
        terminal.write_str("> ");
        type_text(&terminal, "hello\r");
        assert_eq!(terminal.read_line(), "hello");
        assert_eq!(terminal.snapshot().lines[0].text, "> hello");
        assert_eq!((terminal.cursor_x(), terminal.cursor_y()), (0, 1));
        assert_eq!(terminal.editor_state(), EditorState::Idle);
        assert_eq!(terminal.cursor_shape(), CursorShape::Insert);
    }

    #[test]
    fn test_read_password_masked() {
        let terminal = terminal();
        type_text(&terminal, "abc\n");
        assert_eq!(terminal.read_password_masked('*'), vec!['a', 'b', 'c']);
        assert_eq!(terminal.snapshot().lines[0].text, "***");

        type_text(&terminal, "xy\n");
        assert_eq!(terminal.read_password(), vec!['x', 'y']);
        assert_eq!(terminal.snapshot().lines[1].text, "");
    }

    #[test]
    fn test_read_char() {
        let terminal = terminal();
        terminal.key_pressed(RawKey::char('y'));
        assert_eq!(terminal.read_char(), 'y');
        assert_eq!(terminal.cursor_x(), 1);
    }

    #[test]
    fn test_arrow_keys_by_code() {
        let terminal = terminal();
        type_text(&terminal, "ac");
        terminal.key_pressed(RawKey::code(keycode::LEFT));
        type_text(&terminal, "b\n");
        assert_eq!(terminal.read_line(), "abc");
    }

    #[test]
    fn test_close_wakes_reader() {
        let terminal = Arc::new(terminal());
        let reader = {
            let terminal = Arc::clone(&terminal);
            thread::spawn(move || terminal.read_line())
        };
        type_text(&terminal, "par");
        thread::sleep(Duration::from_millis(50));
        terminal.close();
        assert_eq!(reader.join().unwrap(), "par");
        assert_eq!(terminal.read_line(), "");
        assert_eq!(terminal.read_char(), '\0');
    }

    #[test]
    fn test_shutdown_hooks_run_once_in_order() {
        let terminal = terminal();
        let order = Arc::new(Mutex::new(Vec::new()));
        for i in 0..3 {
            let order = Arc::clone(&order);
            terminal.add_shutdown_hook(move || order.lock().unwrap().push(i)).unwrap();
        }

        terminal.close();
        terminal.close();
        assert_eq!(*order.lock().unwrap(), vec![0, 1, 2]);
        assert!(matches!(terminal.add_shutdown_hook(|| {}), Err(Error::Closed)));
    }

    #[test]
    fn test_drop_runs_hooks() {
        let ran = Arc::new(AtomicUsize::new(0));
        {
            let terminal = terminal();
            let ran = Arc::clone(&ran);
            terminal
                .add_shutdown_hook(move || {
                    ran.fetch_add(1, Ordering::SeqCst);
                })
                .unwrap();
        }
        assert_eq!(ran.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_trap_consumes_before_reader() {
        let terminal = terminal();
        let hits = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&hits);
        terminal
            .add_key_trap(KeyEvent::special(crate::input::SpecialKey::F1), move |_: &KeyEvent| {
                counter.fetch_add(1, Ordering::SeqCst);
                Propagation::Stop
            })
            .unwrap();

        assert_eq!(terminal.key_pressed(RawKey::code(keycode::F1)), Disposition::Trapped);
        assert_eq!(hits.load(Ordering::SeqCst), 1);
        assert_eq!(terminal.pending_keys(), 0);
    }

    #[test]
    fn test_paging_moves_viewport() {
        let terminal = terminal();
        for i in 0..100 {
            terminal.println(&i.to_string());
        }
        terminal.flush_render();
        let bottom = terminal.viewport_top();
        assert_eq!(bottom, terminal.total_rows() - terminal.rows());

        terminal.page_up();
        assert_eq!(terminal.viewport_top(), bottom - 22);
        terminal.page_down();
        assert_eq!(terminal.viewport_top(), bottom);
    }
}
