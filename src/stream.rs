//! Stream adapters
//!
//! A terminal doubles as a byte/character sink and as a line-at-a-time
//! byte source:
//!
//! - `io::Write` and `fmt::Write` on `Terminal` and `&Terminal` write text
//!   at the cursor. Bytes are decoded as UTF-8 across calls; invalid
//!   sequences become U+FFFD. `flush` takes pending render work. Writes
//!   after `close()` are dropped.
//! - [`InputStream`] implements `io::Read` over `read_char`: each key is
//!   echoed and returned as UTF-8, and Enter ends the stream with the
//!   newline echoed but not returned. The next read starts a new line.

use std::fmt;
use std::io;

use crate::terminal::Terminal;

/// Incremental UTF-8 decoder holding back an incomplete trailing sequence
#[derive(Debug, Default)]
pub(crate) struct Utf8Carry {
    pending: Vec<u8>,
}

impl Utf8Carry {
    /// Append `bytes` and return everything that now decodes
    pub(crate) fn feed(&mut self, bytes: &[u8]) -> String {
        self.pending.extend_from_slice(bytes);
        let mut out = String::new();
        let mut consumed = 0;
        loop {
            let rest = &self.pending[consumed..];
            match std::str::from_utf8(rest) {
                Ok(text) => {
                    out.push_str(text);
                    consumed = self.pending.len();
                    break;
                }
                Err(err) => {
                    let valid = err.valid_up_to();
                    out.push_str(&String::from_utf8_lossy(&rest[..valid]));
                    match err.error_len() {
                        Some(bad) => {
                            out.push(char::REPLACEMENT_CHARACTER);
                            consumed += valid + bad;
                        }
                        None => {
                            consumed += valid;
                            break;
                        }
                    }
                }
            }
        }
        self.pending.drain(..consumed);
        out
    }
}

impl io::Write for &Terminal {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        if self.is_closing() {
            return Ok(buf.len());
        }
        let text = self.decode_output(buf);
        if !text.is_empty() {
            Terminal::write_str(*self, &text);
        }
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        self.flush_render();
        Ok(())
    }
}

impl io::Write for Terminal {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        io::Write::write(&mut &*self, buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        io::Write::flush(&mut &*self)
    }
}

impl fmt::Write for &Terminal {
    fn write_str(&mut self, s: &str) -> fmt::Result {
        if !self.is_closing() {
            Terminal::write_str(*self, s);
        }
        Ok(())
    }
}

impl fmt::Write for Terminal {
    fn write_str(&mut self, s: &str) -> fmt::Result {
        fmt::Write::write_str(&mut &*self, s)
    }
}

/// Line-at-a-time byte source over a terminal's keyboard
#[derive(Debug)]
pub struct InputStream<'a> {
    terminal: &'a Terminal,
    /// Encoded bytes of the last key not yet handed out
    pending: Vec<u8>,
}

impl<'a> InputStream<'a> {
    pub(crate) fn new(terminal: &'a Terminal) -> Self {
        Self {
            terminal,
            pending: Vec::new(),
        }
    }

    /// Next key's character, skipping keys with no character; `None` at end
    /// of line or once the terminal closes
    fn next_char(&self) -> Option<char> {
        loop {
            match self.terminal.read_char() {
                '\n' | '\r' => return None,
                '\0' if self.terminal.is_closing() => return None,
                '\0' => continue,
                ch => return Some(ch),
            }
        }
    }
}

impl io::Read for InputStream<'_> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if buf.is_empty() {
            return Ok(0);
        }
        if self.pending.is_empty() {
            let Some(ch) = self.next_char() else {
                return Ok(0);
            };
            let mut encoded = [0u8; 4];
            self.pending.extend_from_slice(ch.encode_utf8(&mut encoded).as_bytes());
        }
        let n = self.pending.len().min(buf.len());
        buf[..n].copy_from_slice(&self.pending[..n]);
        self.pending.drain(..n);
        Ok(n)
    }
}
