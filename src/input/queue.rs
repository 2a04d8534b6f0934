//! Key queue and shutdown signalling
//!
//! Keys that no trap consumed wait in an unbounded FIFO channel until a
//! reader takes them. A blocked reader also watches a shutdown channel that
//! never carries a message: closing the terminal drops its sender, which
//! disconnects the channel and wakes every waiter at once.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, PoisonError};

use crossbeam_channel::{bounded, select, unbounded, Receiver, Sender};

use super::KeyEvent;

/// One-shot, broadcast shutdown notification
#[derive(Debug)]
pub struct ShutdownSignal {
    closing: AtomicBool,
    trigger: Mutex<Option<Sender<()>>>,
    receiver: Receiver<()>,
}

impl ShutdownSignal {
    pub fn new() -> Self {
        let (tx, rx) = bounded(0);
        Self {
            closing: AtomicBool::new(false),
            trigger: Mutex::new(Some(tx)),
            receiver: rx,
        }
    }

    pub fn is_closing(&self) -> bool {
        self.closing.load(Ordering::SeqCst)
    }

    /// Fire the signal; true only for the call that actually fired it
    pub fn trigger(&self) -> bool {
        if self.closing.swap(true, Ordering::SeqCst) {
            return false;
        }
        self.trigger
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        true
    }

    /// Channel that becomes disconnected once the signal fires
    pub fn receiver(&self) -> &Receiver<()> {
        &self.receiver
    }
}

impl Default for ShutdownSignal {
    fn default() -> Self {
        Self::new()
    }
}

/// FIFO of keys waiting for a reader
#[derive(Debug, Clone)]
pub struct KeyQueue {
    tx: Sender<KeyEvent>,
    rx: Receiver<KeyEvent>,
}

impl KeyQueue {
    pub fn new() -> Self {
        let (tx, rx) = unbounded();
        Self { tx, rx }
    }

    pub fn push(&self, key: KeyEvent) {
        // Both halves live in `self`, so the channel cannot be disconnected.
        let _ = self.tx.send(key);
    }

    pub fn try_pop(&self) -> Option<KeyEvent> {
        self.rx.try_recv().ok()
    }

    /// Block until a key arrives or `shutdown` fires. Returns `None` on
    /// shutdown, even if keys are still queued.
    pub fn pop(&self, shutdown: &ShutdownSignal) -> Option<KeyEvent> {
        if shutdown.is_closing() {
            return None;
        }
        select! {
            recv(self.rx) -> key => key.ok(),
            recv(shutdown.receiver()) -> _ => None,
        }
    }

    pub fn len(&self) -> usize {
        self.rx.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rx.is_empty()
    }
}

impl Default for KeyQueue {
    fn default() -> Self {
        Self::new()
    }
}
