//! Player capability
//!
//! The controller drives a single-track audio engine through this trait.
//! Prepare is asynchronous: the engine reports back through the
//! [`PlayerEvents`] handle it receives with each load.

use cadence_core::Track;
use crossbeam_channel::Sender;
use tracing::debug;

use crate::command::Command;
use crate::error::Result;

/// Generation number of a `load` call
///
/// Callbacks stamped with an older id than the transport's current one are
/// discarded.
pub type LoadId = u64;

/// Opaque single-track audio engine
///
/// Only the transport calls these methods, always from the controller
/// thread.
pub trait Player: Send {
    /// Begin preparing `track`, replacing whatever was loaded
    ///
    /// Completion of the prepare is signalled with [`PlayerEvents::prepared`]
    /// (or [`PlayerEvents::failed`]). Implementations may signal before
    /// returning.
    ///
    /// # Errors
    /// Returns an error if the load cannot even be started
    fn load(&mut self, track: &Track, events: PlayerEvents) -> Result<()>;

    /// Start or resume output of the prepared track
    fn play(&mut self) -> Result<()>;

    /// Pause output
    fn pause(&mut self) -> Result<()>;

    /// Seek within the prepared track
    fn seek(&mut self, position_ms: u64) -> Result<()>;

    /// Release the loaded track
    fn stop(&mut self);

    /// Current position in milliseconds (0 when nothing is loaded)
    fn position_ms(&self) -> u64;

    /// Duration reported by the engine, once known
    fn duration_ms(&self) -> Option<u64> {
        None
    }

    /// Apply a linear output gain
    fn set_volume(&mut self, gain: f32);
}

/// Kind of player callback
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlayerEventKind {
    /// Prepare finished successfully
    Prepared,

    /// Track reached its natural end
    Completed,

    /// Prepare or playback failed
    Failed { code: i32, message: String },
}

/// Player callback tagged with the load that produced it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlayerEvent {
    pub load_id: LoadId,
    pub kind: PlayerEventKind,
}

/// Callback handle given to the player with each load
///
/// Cloneable and `Send`; may be moved to any thread the engine uses.
#[derive(Debug, Clone)]
pub struct PlayerEvents {
    load_id: LoadId,
    tx: Sender<Command>,
}

impl PlayerEvents {
    pub(crate) fn new(load_id: LoadId, tx: Sender<Command>) -> Self {
        Self { load_id, tx }
    }

    /// Load this handle belongs to
    pub fn load_id(&self) -> LoadId {
        self.load_id
    }

    /// Report that prepare finished
    pub fn prepared(&self) {
        self.send(PlayerEventKind::Prepared);
    }

    /// Report natural end of track
    pub fn completed(&self) {
        self.send(PlayerEventKind::Completed);
    }

    /// Report an engine failure
    pub fn failed(&self, code: i32, message: impl Into<String>) {
        self.send(PlayerEventKind::Failed {
            code,
            message: message.into(),
        });
    }

    fn send(&self, kind: PlayerEventKind) {
        let event = PlayerEvent {
            load_id: self.load_id,
            kind,
        };
        if self.tx.send(Command::Player(event)).is_err() {
            debug!("Controller gone, dropping player event for load {}", self.load_id);
        }
    }
}
