//! Key trap tables
//!
//! A trap intercepts a key before it reaches the input queue. Each table
//! maps a [`KeyEvent`] to the handlers registered for it, kept in
//! registration order.

use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};

use tracing::trace;

use super::KeyEvent;
use crate::error::{Error, Result};

/// What a trap handler wants done with the key afterwards
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Propagation {
    /// Offer the key to the next handler, and eventually the queue
    Continue,
    /// The key is consumed
    Stop,
}

/// Handler invoked on the producer thread when its key is pressed.
///
/// Handlers must return promptly; the next keystroke is not dispatched
/// until they do.
pub trait KeyTrapHandler: Send + Sync {
    fn on_key(&self, key: &KeyEvent) -> Propagation;
}

impl<F> KeyTrapHandler for F
where
    F: Fn(&KeyEvent) -> Propagation + Send + Sync,
{
    fn on_key(&self, key: &KeyEvent) -> Propagation {
        self(key)
    }
}

type Handlers = Vec<Arc<dyn KeyTrapHandler>>;

/// One table of key traps
#[derive(Default)]
pub struct TrapTable {
    traps: RwLock<HashMap<KeyEvent, Handlers>>,
}

impl TrapTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `handler` for `key`, after any handlers already present
    pub fn add(&self, key: KeyEvent, handler: Arc<dyn KeyTrapHandler>) -> Result<()> {
        if key.is_empty() {
            return Err(Error::InvalidKeyTrap(
                "key has neither a character nor a special key".to_string(),
            ));
        }
        let mut traps = self.traps.write().unwrap_or_else(PoisonError::into_inner);
        traps.entry(key).or_default().push(handler);
        Ok(())
    }

    /// Run the handlers for `key` in order until one stops propagation.
    ///
    /// The handler list is copied out first, so a handler may register
    /// more traps without deadlocking.
    pub fn dispatch(&self, key: &KeyEvent) -> Propagation {
        let handlers: Handlers = {
            let traps = self.traps.read().unwrap_or_else(PoisonError::into_inner);
            match traps.get(key) {
                Some(handlers) => handlers.clone(),
                None => return Propagation::Continue,
            }
        };

        for (index, handler) in handlers.iter().enumerate() {
            if handler.on_key(key) == Propagation::Stop {
                trace!(?key, index, "key consumed by trap");
                return Propagation::Stop;
            }
        }
        Propagation::Continue
    }

    /// Number of keys with at least one handler
    pub fn len(&self) -> usize {
        self.traps.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl std::fmt::Debug for TrapTable {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TrapTable").field("keys", &self.len()).finish()
    }
}
