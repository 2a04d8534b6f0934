//! End-to-end tests for the terminal session
//!
//! These drive a `Terminal` the way an embedding application does: output
//! through the write methods, keystrokes through `key_pressed` on another
//! thread, and reads blocking on the application thread.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::{Duration, Instant};

use softconsole::core::InsertOutcome;
use softconsole::editor::EditorState;
use softconsole::input::{keycode, Disposition};
use softconsole::{CellRect, Config, KeyEvent, Propagation, RawKey, RenderHost, Terminal};

fn terminal(columns: usize, rows: usize, scrollback: usize) -> Terminal {
    let config = Config {
        columns,
        rows,
        scrollback,
        ..Config::default()
    };
    Terminal::new(&config).unwrap()
}

fn type_text(terminal: &Terminal, text: &str) {
    for ch in text.chars() {
        terminal.key_pressed(RawKey::char(ch));
    }
}

/// Wait until the terminal is blocked in a read
fn wait_for_state(terminal: &Terminal, state: EditorState) {
    let deadline = Instant::now() + Duration::from_secs(5);
    while terminal.editor_state() != state {
        assert!(Instant::now() < deadline, "terminal never reached {:?}", state);
        thread::sleep(Duration::from_millis(1));
    }
}

#[test]
fn test_wrap_scenario_80x25() {
    let terminal = terminal(80, 25, 200);
    let mut text = "x".repeat(80);
    text.push('y');
    terminal.write_str(&text);

    let snapshot = terminal.snapshot();
    assert_eq!(snapshot.lines[0].text, "x".repeat(80));
    assert_eq!(snapshot.lines[1].text, "y");
    assert_eq!((terminal.cursor_x(), terminal.cursor_y()), (1, 1));
}

#[test]
fn test_insert_row_evicts_oldest_when_full() {
    let terminal = terminal(80, 25, 25);
    for row in 0..25 {
        terminal.write_at(0, row, char::from(b'a' + row as u8));
    }

    assert_eq!(terminal.insert_row(24), InsertOutcome::Evicted);
    let snapshot = terminal.snapshot();
    assert_eq!(snapshot.total_rows, 25);
    assert_eq!(snapshot.lines[0].text, "b");
    assert_eq!(snapshot.lines[23].text, "y");
    assert_eq!(snapshot.lines[24].text, "");
}

#[test]
fn test_priority_ctrl_c_trap_during_read_line() {
    let terminal = Arc::new(terminal(80, 25, 200));
    let calls = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&calls);
    terminal
        .add_priority_key_trap(KeyEvent::ctrl('c'), move |_: &KeyEvent| {
            counter.fetch_add(1, Ordering::SeqCst);
            Propagation::Stop
        })
        .unwrap();

    let reader = {
        let terminal = Arc::clone(&terminal);
        thread::spawn(move || terminal.read_line())
    };
    wait_for_state(&terminal, EditorState::ReadingLine);

    type_text(&terminal, "ab");
    assert_eq!(terminal.key_pressed(RawKey::ctrl('\u{3}')), Disposition::Trapped);
    type_text(&terminal, "c\n");

    assert_eq!(reader.join().unwrap(), "abc");
    assert_eq!(calls.load(Ordering::SeqCst), 1);
    assert_eq!(terminal.pending_keys(), 0);
}

#[test]
fn test_password_mask_never_shows_plaintext() {
    let terminal = terminal(20, 3, 3);
    type_text(&terminal, "abc\n");

    assert_eq!(terminal.read_password_masked('*'), vec!['a', 'b', 'c']);
    let snapshot = terminal.snapshot();
    assert_eq!(snapshot.lines[0].text, "***");
    assert!(!snapshot.lines.iter().any(|line| line.text.contains(&['a', 'b', 'c'][..])));
}

#[test]
fn test_escape_returns_cursor_to_prompt() {
    let terminal = terminal(10, 3, 10);
    terminal.write_str("name: ");
    let start = (terminal.cursor_x(), terminal.cursor_y());

    // Long enough to wrap onto the next row
    type_text(&terminal, "abcdefghij\u{1b}done\n");
    assert_eq!(terminal.read_line(), "done");

    let snapshot = terminal.snapshot();
    assert_eq!(snapshot.lines[0].text, "name: done");
    assert_eq!(snapshot.lines[1].text, "");
    assert_eq!(start, (6, 0));
}

#[test]
fn test_backspace_in_read_line() {
    let terminal = terminal(80, 25, 200);
    terminal.write_str("$ ");
    type_text(&terminal, "lx\u{7f}s\n");
    assert_eq!(terminal.read_line(), "ls");
    assert_eq!(terminal.snapshot().lines[0].text, "$ ls");
}

#[test]
fn test_clear_then_write_starts_at_top() {
    let terminal = terminal(10, 3, 10);
    for i in 0..6 {
        terminal.println(&i.to_string());
    }
    terminal.clear_screen();
    terminal.write_str("top");

    let frame = terminal.flush_render().unwrap();
    assert_eq!(frame.scroll_to.map(|r| r.y), Some(0));
    assert_eq!(terminal.snapshot().lines[0].text, "top");
    assert!(terminal.cursor_y() < 0);
}

#[test]
fn test_resize_grow_and_refuse_shrink() {
    let terminal = terminal(10, 3, 3);
    terminal.write_str("keep");

    terminal.resize(8, 2).unwrap();
    assert_eq!((terminal.columns(), terminal.rows()), (10, 3));

    terminal.resize(12, 5).unwrap();
    assert_eq!((terminal.columns(), terminal.rows()), (12, 5));
    assert_eq!(terminal.snapshot().scrollback_limit, 5);
    assert_eq!(terminal.snapshot().lines[0].text, "keep");
    assert!(terminal.resize(0, 5).is_err());

    let frame = terminal.flush_render().unwrap();
    assert!(frame.relayout);
}

#[test]
fn test_selection_roundtrip() {
    let terminal = terminal(10, 3, 3);
    terminal.write_str("alpha\nbeta");
    terminal.highlight_selection(0, 1, 3, 1);
    assert_eq!(terminal.selected_text(), "beta");
    terminal.clear_highlight();
    assert_eq!(terminal.selected_text(), "");
}

#[test]
fn test_paste_feeds_reader() {
    let terminal = terminal(20, 3, 3);
    assert_eq!(terminal.paste("pasted\r\n"), 7);
    assert_eq!(terminal.read_line(), "pasted");
}

#[test]
fn test_read_char_special_key() {
    let terminal = terminal(20, 3, 3);
    terminal.key_pressed(RawKey::code(keycode::F2));
    assert_eq!(terminal.read_char(), '\0');
    assert_eq!(terminal.cursor_x(), 0);
}

#[test]
fn test_close_unblocks_reader_and_runs_hooks() {
    let terminal = Arc::new(terminal(20, 3, 3));
    let hook_ran = Arc::new(AtomicUsize::new(0));
    let flag = Arc::clone(&hook_ran);
    terminal
        .add_shutdown_hook(move || {
            flag.fetch_add(1, Ordering::SeqCst);
        })
        .unwrap();

    let reader = {
        let terminal = Arc::clone(&terminal);
        thread::spawn(move || terminal.read_line())
    };
    wait_for_state(&terminal, EditorState::ReadingLine);
    terminal.close();

    assert_eq!(reader.join().unwrap(), "");
    assert_eq!(hook_ran.load(Ordering::SeqCst), 1);
    assert!(terminal.is_closing());
}

#[derive(Default)]
struct RecordingHost {
    repaints: Mutex<Vec<CellRect>>,
    scrolls: Mutex<Vec<CellRect>>,
}

impl RenderHost for RecordingHost {
    fn repaint(&self, region: CellRect) {
        self.repaints.lock().unwrap().push(region);
    }

    fn scroll_to(&self, viewport: CellRect) {
        self.scrolls.lock().unwrap().push(viewport);
    }
}

#[test]
fn test_worker_delivers_coalesced_frames() {
    let host = Arc::new(RecordingHost::default());
    let config = Config {
        columns: 20,
        rows: 3,
        scrollback: 10,
        ..Config::default()
    };
    let terminal = Terminal::with_host(&config, host.clone()).unwrap();
    terminal.write_str("hello");

    let deadline = Instant::now() + Duration::from_secs(5);
    while host.repaints.lock().unwrap().is_empty() {
        assert!(Instant::now() < deadline, "no frame delivered");
        thread::sleep(Duration::from_millis(5));
    }
    let first = host.repaints.lock().unwrap()[0];
    assert!(first.contains(0, 0) && first.contains(4, 0));

    terminal.page_up();
    assert_eq!(host.scrolls.lock().unwrap().last().map(|r| r.y), Some(0));
    terminal.close();
}

#[test]
fn test_pump_respects_debounce() {
    let terminal = terminal(20, 3, 3);
    terminal.write_char('a');
    assert!(terminal.pump(Instant::now()).is_none());
    assert!(terminal.pump(Instant::now() + Duration::from_secs(1)).is_some());
}

#[test]
fn test_io_write_decodes_split_utf8() {
    use std::io::Write;

    let terminal = terminal(20, 3, 3);
    let bytes = "né\n".as_bytes();
    let mut out = &terminal;
    out.write_all(&bytes[..2]).unwrap();
    out.write_all(&bytes[2..]).unwrap();
    write!(out, "n={}", 5).unwrap();
    out.flush().unwrap();

    let snapshot = terminal.snapshot();
    assert_eq!(snapshot.lines[0].text, "né");
    assert_eq!(snapshot.lines[1].text, "n=5");
    assert!(terminal.flush_render().is_none());
}

#[test]
fn test_writes_dropped_after_close() {
    use std::io::Write;

    let terminal = terminal(20, 3, 3);
    let mut out = &terminal;
    out.write_all(b"kept").unwrap();
    terminal.close();
    assert_eq!(out.write(b"lost").unwrap(), 4);
    std::fmt::Write::write_str(&mut &terminal, "lost").unwrap();

    assert_eq!(terminal.snapshot().lines[0].text, "kept");
}

#[test]
fn test_fmt_write() {
    use std::fmt::Write;

    let mut terminal = terminal(20, 3, 3);
    write!(terminal, "{}-{}", "a", 1).unwrap();
    writeln!(&terminal, "!").unwrap();
    assert_eq!(terminal.snapshot().lines[0].text, "a-1!");
    assert_eq!(terminal.cursor_y(), 1);
}

#[test]
fn test_input_stream_ends_at_newline() {
    use std::io::Read;

    let terminal = terminal(20, 3, 10);
    type_text(&terminal, "hé");
    terminal.key_pressed(RawKey::code(keycode::F2));
    type_text(&terminal, "!\nyo\r");

    let mut first = String::new();
    terminal.input_stream().read_to_string(&mut first).unwrap();
    assert_eq!(first, "hé!");

    let mut second = String::new();
    terminal.input_stream().read_to_string(&mut second).unwrap();
    assert_eq!(second, "yo");

    let snapshot = terminal.snapshot();
    assert_eq!(snapshot.lines[0].text, "hé!");
    assert_eq!(snapshot.lines[1].text, "yo");
    assert_eq!((terminal.cursor_x(), terminal.cursor_y()), (0, 2));
}

#[test]
fn test_input_stream_small_buffer_and_close() {
    use std::io::Read;

    let terminal = terminal(20, 3, 3);
    type_text(&terminal, "€");
    let mut stream = terminal.input_stream();
    let mut buf = [0u8; 1];
    let mut bytes = Vec::new();
    for _ in 0..3 {
        assert_eq!(stream.read(&mut buf).unwrap(), 1);
        bytes.push(buf[0]);
    }
    assert_eq!(bytes, "€".as_bytes());

    terminal.close();
    assert_eq!(stream.read(&mut buf).unwrap(), 0);
}

#[test]
fn test_extreme_cursor_rows_clamp() {
    let terminal = terminal(80, 25, 200);
    for i in 0..30 {
        terminal.println(&i.to_string());
    }
    let last_logical = terminal.rows() as isize - 1;

    terminal.set_cursor_position(0, isize::MAX);
    assert_eq!(terminal.cursor_y(), last_logical);
    terminal.write_at(0, isize::MAX, '#');
    assert_eq!(terminal.snapshot().lines[terminal.total_rows() - 1].text, "#");

    terminal.set_cursor_position(0, isize::MIN);
    assert_eq!(terminal.cursor_y(), -((terminal.total_rows() - terminal.rows()) as isize));
    terminal.highlight_selection(0, isize::MIN, 0, isize::MAX);
    assert!(!terminal.selected_text().is_empty());
}
