//! Background render worker
//!
//! Wakes on a fixed tick, lets the screen advance its blink phase and take
//! a frame once the debounce delay has passed, then hands the frame to the
//! host with the screen lock released.

use std::io;
use std::sync::{Arc, Mutex, PoisonError};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use crossbeam_channel::{select, tick, Receiver};
use tracing::{debug, trace};

use super::RenderHost;
use crate::core::Screen;

/// Spawn the worker. It exits when `shutdown` becomes disconnected.
pub fn spawn_worker(
    screen: Arc<Mutex<Screen>>,
    host: Arc<dyn RenderHost>,
    shutdown: Receiver<()>,
    interval: Duration,
) -> io::Result<JoinHandle<()>> {
    thread::Builder::new()
        .name("softconsole-render".to_string())
        .spawn(move || {
            debug!(?interval, "render worker started");
            let ticker = tick(interval);
            loop {
                select! {
                    recv(ticker) -> _ => {
                        let frame = screen
                            .lock()
                            .unwrap_or_else(PoisonError::into_inner)
                            .tick(Instant::now());
                        if let Some(frame) = frame {
                            trace!(?frame, "delivering frame");
                            frame.deliver(host.as_ref());
                        }
                    }
                    recv(shutdown) -> _ => break,
                }
            }
            debug!("render worker stopped");
        })
}
