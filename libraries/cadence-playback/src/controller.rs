//! Playback controller
//!
//! Runs the transport on a dedicated thread behind a command handle.
//! Commands, player callbacks, and position ticks all go
//! through one channel, so they are applied strictly in arrival order.
//!
//! ## Architecture
//!
//! ```text
//!  UI / host thread            Controller thread           Player threads
//!        │                            │                          │
//!        │  play / pause / seek ...   │                          │
//!        │───────────────────────────>│ Transport::handle        │
//!        │                            │                          │
//!        │                            │<──── prepared/completed ─│
//!        │                            │<──── tick (reporter) ────│
//!        │  PlaybackSnapshot          │                          │
//!        │<───────────────────────────│                          │
//! ```

use cadence_core::{LibraryProvider, PlaylistId, PlaylistStore, Track, TrackId};
use crossbeam_channel::{bounded, unbounded, Receiver, Sender};
use std::thread::{self, JoinHandle};
use tracing::{error, info};

use crate::command::Command;
use crate::error::{PlaybackError, Result};
use crate::focus::{AlwaysGranted, AudioFocus, FocusChange};
use crate::player::Player;
use crate::session::{MemorySessionStore, SessionStore};
use crate::snapshot::{PlaybackSnapshot, SnapshotBus};
use crate::transport::{Transport, TransportParts};
use crate::types::{ControllerStatus, PlaybackConfig, RepeatMode};

/// Builder for [`PlaybackController`]
///
/// Focus defaults to [`AlwaysGranted`] and the session to an in-memory
/// store.
pub struct ControllerBuilder {
    config: PlaybackConfig,
    player: Box<dyn Player>,
    focus: Box<dyn AudioFocus>,
    session: Box<dyn SessionStore>,
}

impl ControllerBuilder {
    pub fn config(mut self, config: PlaybackConfig) -> Self {
        self.config = config;
        self
    }

    pub fn focus(mut self, focus: impl AudioFocus + 'static) -> Self {
        self.focus = Box::new(focus);
        self
    }

    pub fn session(mut self, session: impl SessionStore + 'static) -> Self {
        self.session = Box::new(session);
        self
    }

    /// Start the controller thread
    ///
    /// # Errors
    /// Returns an IO error if the thread cannot be spawned
    pub fn spawn(self) -> Result<PlaybackController> {
        // Unbounded: the controller thread sends to itself (player callbacks
        // raised inside `load`) and must never block on its own queue
        let (commands, inbox) = unbounded();
        let bus = SnapshotBus::new();

        let parts = TransportParts {
            player: self.player,
            focus: self.focus,
            session: self.session,
            bus: bus.clone(),
        };
        let transport = Transport::new(&self.config, parts, commands.clone());

        let worker = thread::Builder::new()
            .name("playback-controller".to_string())
            .spawn(move || run(transport, inbox))?;

        Ok(PlaybackController {
            commands,
            bus,
            worker: Some(worker),
        })
    }
}

fn run(mut transport: Transport, inbox: Receiver<Command>) {
    info!("Playback controller started");

    while let Ok(command) = inbox.recv() {
        if transport.handle(command).is_break() {
            break;
        }
    }
}

/// Handle to the playback controller thread
///
/// Dropping the handle shuts the controller down, persisting the session.
pub struct PlaybackController {
    commands: Sender<Command>,
    bus: SnapshotBus,
    worker: Option<JoinHandle<()>>,
}

impl PlaybackController {
    /// Start configuring a controller around `player`
    pub fn builder(player: impl Player + 'static) -> ControllerBuilder {
        ControllerBuilder {
            config: PlaybackConfig::default(),
            player: Box::new(player),
            focus: Box::new(AlwaysGranted),
            session: Box::new(MemorySessionStore::new()),
        }
    }

    /// Receive every snapshot published from now on
    pub fn subscribe(&self) -> Receiver<PlaybackSnapshot> {
        self.bus.subscribe()
    }

    // ===== Transport =====

    /// Play the queue entry at `index`
    pub fn play(&self, index: usize) -> Result<()> {
        self.send(Command::Play(index))
    }

    pub fn pause(&self) -> Result<()> {
        self.send(Command::Pause)
    }

    pub fn resume(&self) -> Result<()> {
        self.send(Command::Resume)
    }

    /// Stop and release the player
    pub fn stop(&self) -> Result<()> {
        self.send(Command::Stop)
    }

    /// Skip forward, wrapping at the end
    pub fn next(&self) -> Result<()> {
        self.send(Command::Next)
    }

    /// Restart the track, or skip back if near its start
    pub fn previous(&self) -> Result<()> {
        self.send(Command::Previous)
    }

    pub fn seek(&self, position_ms: u64) -> Result<()> {
        self.send(Command::Seek(position_ms))
    }

    pub fn toggle_shuffle(&self) -> Result<()> {
        self.send(Command::ToggleShuffle)
    }

    /// Advance the repeat mode and return the new one
    pub fn cycle_repeat_mode(&self) -> Result<RepeatMode> {
        let (tx, rx) = bounded(1);
        self.send(Command::CycleRepeat(Some(tx)))?;
        rx.recv().map_err(|_| PlaybackError::ControllerStopped)
    }

    /// Set volume (0-100)
    pub fn set_volume(&self, level: u8) -> Result<()> {
        self.send(Command::SetVolume(level))
    }

    /// Forward a focus change from the host
    pub fn focus_changed(&self, change: FocusChange) -> Result<()> {
        self.send(Command::Focus(change))
    }

    // ===== Queue and library =====

    /// Replace the library snapshot; seeds the queue if none is set
    pub fn set_library(&self, tracks: Vec<Track>) -> Result<()> {
        self.send(Command::SetLibrary(tracks))
    }

    /// Enumerate `provider` and hand the result to the controller
    pub fn load_library(&self, provider: &dyn LibraryProvider) -> Result<()> {
        let tracks = provider.load_tracks()?;
        self.set_library(tracks)
    }

    /// Replace the queue with `tracks` and play from `start_index`
    ///
    /// An out-of-range start index plays from the first track.
    pub fn play_queue(&self, tracks: Vec<Track>, start_index: usize) -> Result<()> {
        self.send(Command::PlayQueue {
            tracks,
            start_index,
        })
    }

    /// Like [`play_queue`](Self::play_queue), resolving ids against the library
    pub fn play_tracks(&self, ids: Vec<TrackId>, start_index: usize) -> Result<()> {
        self.send(Command::PlayTracks { ids, start_index })
    }

    /// Play the given playlist membership from the top
    ///
    /// Ids missing from the library are skipped; if none resolve, nothing
    /// happens.
    pub fn play_playlist(&self, ids: Vec<TrackId>) -> Result<()> {
        self.send(Command::PlayPlaylist(ids))
    }

    /// Look up `playlist` in `store` and play it
    pub fn play_playlist_from(&self, store: &dyn PlaylistStore, playlist: &PlaylistId) -> Result<()> {
        let ids = store.membership_ids(playlist)?;
        self.play_playlist(ids)
    }

    // ===== Session and queries =====

    /// Load the saved session, if any, into a paused player
    pub fn restore_session(&self) -> Result<()> {
        self.send(Command::RestoreSession)
    }

    /// Republish the current snapshot
    pub fn sync(&self) -> Result<()> {
        self.send(Command::Sync)
    }

    /// Current state, answered after all previously sent commands
    pub fn status(&self) -> Result<ControllerStatus> {
        let (tx, rx) = bounded(1);
        self.send(Command::Status(tx))?;
        rx.recv().map_err(|_| PlaybackError::ControllerStopped)
    }

    /// Persist the session, release the player, and join the thread
    pub fn shutdown(mut self) -> Result<()> {
        self.join()
    }

    fn join(&mut self) -> Result<()> {
        let Some(worker) = self.worker.take() else {
            return Ok(());
        };

        self.commands.send(Command::Shutdown).ok();
        worker.join().map_err(|_| {
            error!("Playback controller thread panicked");
            PlaybackError::ControllerStopped
        })
    }

    fn send(&self, command: Command) -> Result<()> {
        if self.worker.is_none() {
            return Err(PlaybackError::ControllerStopped);
        }
        self.commands
            .send(command)
            .map_err(|_| PlaybackError::ControllerStopped)
    }
}

impl Drop for PlaybackController {
    fn drop(&mut self) {
        self.join().ok();
    }
}
