//! Cadence - Playback Session Controller
//!
//! Platform-agnostic playback management: what plays, in what order, and how
//! playback reacts to interruptions, with a live snapshot stream for
//! observers.
//!
//! This crate provides:
//! - Queue with circular navigation and reversible shuffle
//! - Repeat modes (Off, One, All)
//! - Transport state machine over an async-prepare player
//! - Audio focus interruption policy (pause, resume, duck)
//! - Position reporting while playing
//! - Session persistence (queue index + position)
//!
//! # Architecture
//!
//! `cadence-playback` does no audio I/O itself. The host supplies:
//! - a [`Player`] that decodes and renders one track at a time
//! - an [`AudioFocus`] arbiter (or [`AlwaysGranted`])
//! - a [`SessionStore`] ([`JsonSessionStore`], [`MemorySessionStore`])
//!
//! All commands, player callbacks, and position ticks are serialized
//! through one channel into the controller thread.
//!
//! # Example
//!
//! ```rust,no_run
//! use cadence_core::Track;
//! use cadence_playback::{PlaybackController, Player, PlayerEvents, Result};
//!
//! struct NullPlayer;
//!
//! impl Player for NullPlayer {
//!     fn load(&mut self, _track: &Track, events: PlayerEvents) -> Result<()> {
//!         events.prepared();
//!         Ok(())
//!     }
//!     fn play(&mut self) -> Result<()> { Ok(()) }
//!     fn pause(&mut self) -> Result<()> { Ok(()) }
//!     fn seek(&mut self, _position_ms: u64) -> Result<()> { Ok(()) }
//!     fn stop(&mut self) {}
//!     fn position_ms(&self) -> u64 { 0 }
//!     fn set_volume(&mut self, _gain: f32) {}
//! }
//!
//! let controller = PlaybackController::builder(NullPlayer).spawn()?;
//! let snapshots = controller.subscribe();
//!
//! controller.play_queue(vec![Track::new("1", "Song", "Artist", "/music/song.flac", 180_000)], 0)?;
//! let snapshot = snapshots.recv().unwrap();
//! assert!(snapshot.is_playing);
//!
//! controller.shutdown()?;
//! # Ok::<(), cadence_playback::PlaybackError>(())
//! ```

mod command;
mod controller;
mod error;
mod focus;
mod player;
mod queue;
mod reporter;
mod session;
mod shuffle;
mod snapshot;
mod transport;
pub mod types;
mod volume;

// Public exports
pub use controller::{ControllerBuilder, PlaybackController};
pub use error::{PlaybackError, Result};
pub use focus::{
    AlwaysGranted, AudioFocus, FocusChange, FocusDecision, InterruptionPolicy, TransportAction,
    VolumeAction,
};
pub use player::{LoadId, Player, PlayerEventKind, PlayerEvents};
pub use queue::Queue;
pub use session::{JsonSessionStore, MemorySessionStore, PersistedSession, SessionStore};
pub use shuffle::shuffle_keeping_current;
pub use snapshot::{PlaybackSnapshot, SnapshotBus};
pub use types::{
    ControllerStatus, Direction, PlaybackConfig, RepeatMode, TransportKind, TransportState,
};
pub use volume::Volume;
