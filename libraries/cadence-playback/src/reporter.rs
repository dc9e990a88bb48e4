//! Position reporter
//!
//! While playing, a background thread feeds a tick into the controller
//! channel every interval. Ticks carry the reporter generation; stopping
//! bumps the generation so ticks already queued are ignored.

use crossbeam_channel::{bounded, RecvTimeoutError, Sender};
use std::thread::{self, JoinHandle};
use std::time::Duration;
use tracing::{debug, warn};

use crate::command::Command;

struct Worker {
    stop_tx: Sender<()>,
    handle: JoinHandle<()>,
}

/// Cancellable periodic position sampler
pub(crate) struct PositionReporter {
    interval: Duration,
    generation: u64,
    worker: Option<Worker>,
}

impl PositionReporter {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            generation: 0,
            worker: None,
        }
    }

    /// Start ticking into `commands`; no-op if already running
    pub fn start(&mut self, commands: &Sender<Command>) {
        if self.worker.is_some() {
            return;
        }

        let (stop_tx, stop_rx) = bounded::<()>(0);
        let commands = commands.clone();
        let interval = self.interval;
        let generation = self.generation;

        let spawned = thread::Builder::new()
            .name("position-reporter".to_string())
            .spawn(move || loop {
                match stop_rx.recv_timeout(interval) {
                    Err(RecvTimeoutError::Timeout) => {
                        if commands.send(Command::Tick(generation)).is_err() {
                            break;
                        }
                    }
                    // Stop signal or handle dropped
                    _ => break,
                }
            });

        match spawned {
            Ok(handle) => {
                debug!("Position reporter started (generation {})", generation);
                self.worker = Some(Worker { stop_tx, handle });
            }
            Err(e) => warn!("Failed to spawn position reporter: {}", e),
        }
    }

    /// Stop ticking and wait for the thread to exit
    pub fn stop(&mut self) {
        self.generation += 1;

        if let Some(Worker { stop_tx, handle }) = self.worker.take() {
            drop(stop_tx);
            if handle.join().is_err() {
                warn!("Position reporter thread panicked");
            }
            debug!("Position reporter stopped");
        }
    }

    pub fn is_running(&self) -> bool {
        self.worker.is_some()
    }

    /// True if a tick stamped `generation` comes from the live reporter
    pub fn is_current(&self, generation: u64) -> bool {
        self.worker.is_some() && generation == self.generation
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }
}

impl Drop for PositionReporter {
    fn drop(&mut self) {
        self.stop();
    }
}
