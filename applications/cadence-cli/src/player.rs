//! Simulated audio engine
//!
//! Keeps a wall-clock position for the loaded track instead of decoding
//! audio. Prepare finishes after a configurable delay on a helper thread,
//! which then watches for the end of the track and reports completion.

use cadence_core::Track;
use cadence_playback::{PlaybackError, Player, PlayerEvents, Result};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::thread;
use std::time::{Duration, Instant};
use tracing::{debug, trace};

const COMPLETION_POLL: Duration = Duration::from_millis(25);

/// Position clock for one loaded track
#[derive(Debug, Default)]
struct Clock {
    duration_ms: u64,
    base_ms: u64,
    running_since: Option<Instant>,
}

impl Clock {
    fn new(duration_ms: u64) -> Self {
        Self {
            duration_ms,
            ..Self::default()
        }
    }

    fn position_at(&self, now: Instant) -> u64 {
        let elapsed = self
            .running_since
            .map(|since| now.saturating_duration_since(since).as_millis() as u64)
            .unwrap_or(0);
        let position = self.base_ms.saturating_add(elapsed);
        if self.duration_ms > 0 {
            position.min(self.duration_ms)
        } else {
            position
        }
    }

    fn start(&mut self, now: Instant) {
        if self.running_since.is_none() {
            self.running_since = Some(now);
        }
    }

    fn halt(&mut self, now: Instant) {
        self.base_ms = self.position_at(now);
        self.running_since = None;
    }

    fn seek(&mut self, position_ms: u64, now: Instant) {
        self.base_ms = if self.duration_ms > 0 {
            position_ms.min(self.duration_ms)
        } else {
            position_ms
        };
        if self.running_since.is_some() {
            self.running_since = Some(now);
        }
    }

    fn is_finished(&self, now: Instant) -> bool {
        self.running_since.is_some()
            && self.duration_ms > 0
            && self.position_at(now) >= self.duration_ms
    }
}

/// Edge detector for end-of-track
///
/// Fires once each time the clock reaches the end while running. Pausing at
/// the end re-arms it, so a later resume reports completion again.
#[derive(Debug, Default)]
struct CompletionEdge {
    reported: bool,
}

impl CompletionEdge {
    fn observe(&mut self, finished: bool) -> bool {
        let fire = finished && !self.reported;
        self.reported = finished;
        fire
    }
}

/// [`Player`] that simulates playback with a clock
pub struct SimulatedPlayer {
    prepare_delay: Duration,
    clock: Arc<Mutex<Clock>>,
    generation: Arc<AtomicU64>,
    gain: f32,
}

impl SimulatedPlayer {
    pub fn new(prepare_delay: Duration) -> Self {
        Self {
            prepare_delay,
            clock: Arc::new(Mutex::new(Clock::default())),
            generation: Arc::new(AtomicU64::new(0)),
            gain: 1.0,
        }
    }

    /// Last gain applied by the controller
    pub fn gain(&self) -> f32 {
        self.gain
    }

    fn with_clock<T>(&self, f: impl FnOnce(&mut Clock) -> T) -> T {
        let mut clock = self.clock.lock().unwrap_or_else(PoisonError::into_inner);
        f(&mut clock)
    }
}

impl Player for SimulatedPlayer {
    fn load(&mut self, track: &Track, events: PlayerEvents) -> Result<()> {
        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;

        if track.source_locator.trim().is_empty() {
            return Err(PlaybackError::load(format!(
                "track '{}' has no source",
                track.title
            )));
        }

        self.with_clock(|clock| *clock = Clock::new(track.duration_ms));
        debug!("Simulating prepare of '{}' ({}ms)", track.title, track.duration_ms);

        let clock = Arc::clone(&self.clock);
        let current = Arc::clone(&self.generation);
        let delay = self.prepare_delay;

        thread::Builder::new()
            .name("simulated-player".to_string())
            .spawn(move || watch(generation, current, clock, delay, events))?;

        Ok(())
    }

    fn play(&mut self) -> Result<()> {
        self.with_clock(|clock| clock.start(Instant::now()));
        Ok(())
    }

    fn pause(&mut self) -> Result<()> {
        self.with_clock(|clock| clock.halt(Instant::now()));
        Ok(())
    }

    fn seek(&mut self, position_ms: u64) -> Result<()> {
        self.with_clock(|clock| clock.seek(position_ms, Instant::now()));
        Ok(())
    }

    fn stop(&mut self) {
        self.generation.fetch_add(1, Ordering::SeqCst);
        self.with_clock(|clock| *clock = Clock::default());
    }

    fn position_ms(&self) -> u64 {
        self.with_clock(|clock| clock.position_at(Instant::now()))
    }

    fn duration_ms(&self) -> Option<u64> {
        self.with_clock(|clock| (clock.duration_ms > 0).then_some(clock.duration_ms))
    }

    fn set_volume(&mut self, gain: f32) {
        trace!("Simulated gain set to {:.3}", gain);
        self.gain = gain;
    }
}

impl Drop for SimulatedPlayer {
    fn drop(&mut self) {
        // Release any watcher still tracking the last load
        self.generation.fetch_add(1, Ordering::SeqCst);
    }
}

/// Finish the prepare, then report completion whenever the clock runs out
///
/// Exits only when another load or a stop bumps the generation.
fn watch(
    generation: u64,
    current: Arc<AtomicU64>,
    clock: Arc<Mutex<Clock>>,
    delay: Duration,
    events: PlayerEvents,
) {
    thread::sleep(delay);
    if current.load(Ordering::SeqCst) != generation {
        return;
    }
    events.prepared();

    let mut edge = CompletionEdge::default();
    loop {
        thread::sleep(COMPLETION_POLL);
        if current.load(Ordering::SeqCst) != generation {
            return;
        }
        let finished = clock
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .is_finished(Instant::now());
        if edge.observe(finished) {
            events.completed();
        }
    }
}
