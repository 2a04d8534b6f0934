//! Keyboard adapter
//!
//! Bridges the asynchronous key stream from the host to the synchronous
//! reads of the line editor: priority traps first, then normal traps, then
//! the queue.

use std::sync::Arc;

use tracing::trace;

use super::queue::{KeyQueue, ShutdownSignal};
use super::traps::{KeyTrapHandler, Propagation, TrapTable};
use super::{KeyEvent, RawKey};
use crate::error::Result;

/// Where a key ended up
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Disposition {
    /// A trap consumed it
    Trapped,
    /// It is waiting in the queue
    Queued,
}

#[derive(Debug, Default)]
pub struct KeyboardAdapter {
    priority: TrapTable,
    normal: TrapTable,
    queue: KeyQueue,
}

impl KeyboardAdapter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_trap(&self, key: KeyEvent, handler: Arc<dyn KeyTrapHandler>) -> Result<()> {
        self.normal.add(key, handler)
    }

    /// Register a trap that runs before every normal trap
    pub fn add_priority_trap(&self, key: KeyEvent, handler: Arc<dyn KeyTrapHandler>) -> Result<()> {
        self.priority.add(key, handler)
    }

    /// Producer entry point for host key notifications
    pub fn key_pressed(&self, raw: RawKey) -> Disposition {
        self.dispatch(KeyEvent::from_raw(raw))
    }

    /// Route an already normalized event
    pub fn dispatch(&self, key: KeyEvent) -> Disposition {
        if self.priority.dispatch(&key) == Propagation::Stop || self.normal.dispatch(&key) == Propagation::Stop {
            return Disposition::Trapped;
        }
        trace!(?key, "key queued");
        self.queue.push(key);
        Disposition::Queued
    }

    /// Queue every character of `text` as a plain key, skipping traps
    pub fn paste(&self, text: &str) -> usize {
        let mut queued = 0;
        for ch in text.chars().filter(|&c| c != '\r') {
            self.queue.push(KeyEvent::char(ch));
            queued += 1;
        }
        queued
    }

    /// Block for the next key; `None` once `shutdown` fires
    pub fn read(&self, shutdown: &ShutdownSignal) -> Option<KeyEvent> {
        self.queue.pop(shutdown)
    }

    pub fn try_read(&self) -> Option<KeyEvent> {
        self.queue.try_pop()
    }

    pub fn pending(&self) -> usize {
        self.queue.len()
    }
}
